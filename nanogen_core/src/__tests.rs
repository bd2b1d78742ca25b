use std::path::PathBuf;

use rstest::rstest;
use similar_asserts::assert_eq;
use tracing_test::traced_test;

use super::__fixtures::*;
use super::*;
use crate::lexer::tokenize;
use crate::project::collect_component_files;
use crate::project::discover_components_dir;
use crate::text::aggregate;
use crate::text::find_matching_brace;
use crate::text::first_char_to_upper;
use crate::text::new_line;
use crate::text::variate_first_char;
use crate::tokens::TokenKind;

// --- Text helpers ---

#[rstest]
#[case::flat("{}", 0, 1)]
#[case::nested("{a{b}c}", 0, 6)]
#[case::inner("{a{b}c}", 2, 4)]
#[case::offset("class A { int x; }", 8, 17)]
fn matching_brace(#[case] text: &str, #[case] index: usize, #[case] expected: usize) -> NanogenResult<()> {
	assert_eq!(find_matching_brace(text, index)?, expected);
	Ok(())
}

#[test]
fn matching_brace_rejects_non_brace_start() {
	let result = find_matching_brace("a{b}", 0);
	assert!(matches!(result, Err(NanogenError::NotAnOpeningBrace { offset: 0 })));
}

#[test]
fn matching_brace_reports_unbalanced_text() {
	let result = find_matching_brace("{{}", 0);
	assert!(matches!(result, Err(NanogenError::UnmatchedBrace { offset: 0 })));
}

#[rstest]
#[case::lower("health", "Health")]
#[case::upper("Health", "health")]
#[case::underscore_lower("_x", "_X")]
#[case::underscore_upper("_Value", "_value")]
#[case::empty("", "")]
fn variates_first_char(#[case] input: &str, #[case] expected: &str) {
	assert_eq!(variate_first_char(input), expected);
}

#[rstest]
#[case::lower("value", "Value")]
#[case::already_upper("Value", "Value")]
#[case::underscore("_value", "_value")]
fn uppercases_first_char(#[case] input: &str, #[case] expected: &str) {
	assert_eq!(first_char_to_upper(input), expected);
}

#[test]
fn new_line_indents_by_levels() {
	assert_eq!(new_line(0), "\n");
	assert_eq!(new_line(2), "\n        ");
}

#[test]
fn aggregate_rejects_empty_sequences() -> NanogenResult<()> {
	assert_eq!(aggregate(["a", "b", "c"], ", ", "letters")?, "a, b, c");

	let empty: [&str; 0] = [];
	let result = aggregate(empty, ", ", "letters");
	assert!(matches!(result, Err(NanogenError::EmptyAggregate(what)) if what == "letters"));

	Ok(())
}

// --- Lexer ---

#[test]
fn tokenize_drops_comments_and_access_modifiers() {
	let source = "// comment\n/* block */ public class A { #if DEBUG\n private int x; }";
	let kinds: Vec<TokenKind> = tokenize(source).iter().map(|t| t.kind).collect();

	assert_eq!(
		kinds,
		vec![
			TokenKind::TypeKeyword,
			TokenKind::Ident,
			TokenKind::BraceOpen,
			TokenKind::Ident,
			TokenKind::Ident,
			TokenKind::Semicolon,
			TokenKind::BraceClose,
		]
	);
}

#[test]
fn tokenize_splits_nested_generic_closers() {
	let kinds: Vec<TokenKind> = tokenize("List<List<int>>").iter().map(|t| t.kind).collect();
	assert_eq!(
		kinds.iter().filter(|k| **k == TokenKind::AngleClose).count(),
		2
	);
}

#[test]
fn tokenize_skips_comments_and_directives_at_end_of_input() {
	let source = "#region Fields\nclass A { }\n#endregion\n// trailing";
	let kinds: Vec<TokenKind> = tokenize(source).iter().map(|t| t.kind).collect();

	assert_eq!(
		kinds,
		vec![
			TokenKind::TypeKeyword,
			TokenKind::Ident,
			TokenKind::BraceOpen,
			TokenKind::BraceClose,
		]
	);
}

// --- Parser ---

#[test]
fn parse_simple_component() -> NanogenResult<()> {
	let declaration = parse_declaration(HEALTH_SOURCE, &game_contexts(), false)?;
	assert_eq!(declaration, health_declaration());

	Ok(())
}

#[test]
fn parse_force_reactive_marks_every_component() -> NanogenResult<()> {
	let declaration = parse_declaration(HEALTH_SOURCE, &game_contexts(), true)?;

	assert!(declaration.force_reactive);
	assert!(declaration.is_reactive());
	assert!(!declaration.attributes.iter().any(|a| a == REACTIVE_ATTRIBUTE));
	assert!(!parse_declaration(HEALTH_SOURCE, &game_contexts(), false)?.is_reactive());
	Ok(())
}

#[test]
fn parse_component_in_namespace_with_members() -> NanogenResult<()> {
	let declaration = parse_declaration(POSITION_SOURCE, &game_contexts(), false)?;

	assert_eq!(declaration.name, "Position");
	assert_eq!(declaration.attributes, vec!["Game", "Input", "Reactive"]);
	assert_eq!(declaration.contexts, vec!["Game", "Input"]);
	assert_eq!(
		declaration.fields,
		vec![
			FieldDeclaration::new("x", "float", 0),
			FieldDeclaration::new("y", "float", 1),
			FieldDeclaration::new("path", "List<Vector3>", 2),
		]
	);
	assert_eq!(
		declaration.usings,
		"using UnityEngine;\nusing System.Collections.Generic;"
	);
	assert!(declaration.is_reactive());
	assert!(!declaration.is_unique);

	Ok(())
}

#[test]
fn parse_unique_component() -> NanogenResult<()> {
	let declaration = parse_declaration(PLAYER_SOURCE, &game_contexts(), false)?;

	assert!(declaration.is_unique);
	assert_eq!(declaration.attributes, vec!["Game"]);
	assert_eq!(declaration.contexts, vec!["Game"]);
	assert!(!declaration.has_fields());

	Ok(())
}

#[rstest]
#[case::no_attributes("public class Tag { }", vec!["Game"], vec!["Game"])]
#[case::unknown_attribute("[System.Serializable] class Tag { }", vec!["Serializable"], vec!["Game"])]
#[case::qualified_context("[Demo.Input] class Tag { }", vec!["Input"], vec!["Input"])]
#[case::attribute_arguments("[Input, Obsolete(\"old\")] class Tag { }", vec!["Input", "Obsolete"], vec!["Input"])]
#[case::split_lists("[Input]\n[Game]\nclass Tag { }", vec!["Input", "Game"], vec!["Input", "Game"])]
#[case::duplicate_context("[Game, Game] class Tag { }", vec!["Game", "Game"], vec!["Game"])]
fn parse_resolves_contexts(
	#[case] source: &str,
	#[case] attributes: Vec<&str>,
	#[case] contexts: Vec<&str>,
) -> NanogenResult<()> {
	let declaration = parse_declaration(source, &game_contexts(), false)?;
	assert_eq!(declaration.attributes, attributes);
	assert_eq!(declaration.contexts, contexts);

	Ok(())
}

#[rstest]
#[case::generic_pair("Dictionary<int, string>")]
#[case::nested_generic("List<List<int>>")]
#[case::nullable("int?")]
#[case::array("float[]")]
#[case::jagged("int[][,]")]
#[case::qualified("UnityEngine.Vector3")]
fn parse_field_types(#[case] r#type: &str) -> NanogenResult<()> {
	let source = format!("class Field {{ {} item; }}", r#type);
	let declaration = parse_declaration(&source, &game_contexts(), false)?;
	assert_eq!(declaration.fields, vec![FieldDeclaration::new("item", r#type, 0)]);

	Ok(())
}

#[test]
fn parse_skips_non_field_members() -> NanogenResult<()> {
	let source = r#"
class Stats
{
    public const int Max = 10;
    public static readonly string Name = "stats";
    public int current = Max, previous;
    public Stats() { current = 0; }
    public int Double() => current * 2;
    public int Half { get { return current / 2; } }
    public int Level { get; set; } = 1;
    [SerializeField] private float ratio;
    class Nested { int hidden; }
}
"#;
	let declaration = parse_declaration(source, &game_contexts(), false)?;
	let names: Vec<&str> = declaration.fields.iter().map(|f| f.name.as_str()).collect();
	assert_eq!(names, vec!["Max", "Name", "current", "previous", "ratio"]);
	assert_eq!(declaration.fields[4].index, 4);

	Ok(())
}

#[test]
fn parse_file_scoped_namespace() -> NanogenResult<()> {
	let source = "using A;\nnamespace Demo;\n[Input]\nstruct Axis { float value; }";
	let declaration = parse_declaration(source, &game_contexts(), true)?;

	assert_eq!(declaration.name, "Axis");
	assert_eq!(declaration.contexts, vec!["Input"]);
	assert_eq!(declaration.usings, "using A;");
	assert!(declaration.force_reactive);
	assert!(declaration.is_reactive());

	Ok(())
}

#[rstest]
#[case::no_type("int x;", 1)]
#[case::unclosed_body("class A {\n int x;\n", 1)]
#[case::tuple_field("class A\n{\n (int, int) pair;\n}", 3)]
#[case::missing_semicolon("class A\n{\n int x\n}", 4)]
#[case::unexpected_token("class A\n{\n int x;\n = 3;\n}", 4)]
fn parse_rejects_malformed_declarations(#[case] source: &str, #[case] expected_line: usize) {
	let result = parse_declaration(source, &game_contexts(), false);
	match result {
		Err(NanogenError::MalformedDeclaration { line, .. }) => assert_eq!(line, expected_line),
		other => panic!("expected a malformed declaration error, got {other:?}"),
	}
}

#[test]
fn parse_requires_contexts() {
	let result = parse_declaration(HEALTH_SOURCE, &[], false);
	assert!(matches!(result, Err(NanogenError::MissingContexts)));
}

#[test]
fn precheck_reports_each_file() {
	let contexts = game_contexts();
	let (passed, declaration) =
		precheck_declaration(&PathBuf::from("Components/Health.cs"), HEALTH_SOURCE, &contexts, false);
	assert!(passed.passed);
	assert_eq!(passed.message, "Health.cs is valid");
	assert!(declaration.is_some());

	let (failed, declaration) =
		precheck_declaration(&PathBuf::from("Components/Broken.cs"), "int x;", &contexts, false);
	assert!(!failed.passed);
	assert!(declaration.is_none());
	insta::assert_snapshot!(
		failed.message,
		@"Failed! Error in file Broken.cs: malformed component declaration at line 1: no `class` or `struct` declaration found"
	);
}

// --- Resolver ---

#[test]
#[traced_test]
fn resolve_synthesizes_placeholder_for_empty_context() {
	let contexts = contexts(&["Game", "UI", "UI"]);
	let resolved = resolve(vec![health_declaration()], &contexts);

	assert_eq!(resolved.len(), 2);
	assert_eq!(resolved[0].name, "Health");
	assert_eq!(resolved[1], ComponentDeclaration::none("UI"));
	assert!(resolved[1].synthesized);
	assert!(logs_contain("synthesizing placeholder component"));
}

#[test]
fn resolve_keeps_covered_contexts() {
	let resolved = resolve(vec![health_declaration()], &contexts(&["Game"]));
	assert_eq!(resolved, vec![health_declaration()]);
}

#[test]
fn resolve_without_declarations_synthesizes_one_placeholder_per_context() {
	let resolved = resolve(vec![], &contexts(&["Game", "UI"]));

	let names: Vec<&str> = resolved.iter().map(|d| d.name.as_str()).collect();
	let owners: Vec<&[String]> = resolved.iter().map(|d| d.contexts.as_slice()).collect();
	assert_eq!(names, vec!["None", "None"]);
	assert_eq!(owners, vec![&["Game".to_string()][..], &["UI".to_string()][..]]);
	assert!(resolved.iter().all(|d| !d.has_fields() && d.synthesized));
}

#[rstest]
#[case::plain("List<int>", Some("NanoList<int>"))]
#[case::qualified("System.Collections.Generic.List<Vector3>", Some("NanoList<Vector3>"))]
#[case::nested("List<List<int>>", Some("NanoList<List<int>>"))]
#[case::already_wrapped("NanoList<int>", None)]
#[case::not_generic("int", None)]
#[case::other_generic("Dictionary<int, string>", None)]
#[case::array_of_lists("List<int>[]", None)]
fn normalizes_list_types(#[case] input: &str, #[case] expected: Option<&str>) {
	assert_eq!(normalize_list_type(input).as_deref(), expected);
}

#[test]
fn normalize_rewrites_only_list_fields() {
	let mut declaration = reactive_declaration(&[("speed", "float"), ("path", "List<Vector3>")]);
	normalize_field_types(&mut declaration);

	assert_eq!(declaration.fields[0].r#type, "float");
	assert_eq!(declaration.fields[1].r#type, "NanoList<Vector3>");
	assert!(declaration.fields[1].is_list());
}

// --- Templates ---

#[test]
fn template_render_does_not_rescan_values() -> NanogenResult<()> {
	let template = Template::parse("test", "Hello *ComponentName* in *Context*!")?;
	let bindings = Bindings::new()
		.with(Placeholder::ComponentName, "*Context*")
		.with(Placeholder::Context, "Game");

	assert_eq!(template.render(&bindings), "Hello *Context* in Game!");
	Ok(())
}

#[rstest]
#[case::unknown_tag("*Unknown* stays")]
#[case::lone_star("a * b")]
#[case::email("user@example.com")]
#[case::wrong_delimiter("@ComponentName@")]
fn template_keeps_unrecognized_text(#[case] source: &str) -> NanogenResult<()> {
	let template = Template::parse("test", source)?;
	assert_eq!(template.render(&Bindings::new()), source);
	Ok(())
}

#[test]
fn template_renders_unbound_placeholder_as_tag() -> NanogenResult<()> {
	let template = Template::parse("test", "Add*ComponentName*()")?;
	assert_eq!(template.render(&Bindings::new()), "Add*ComponentName*()");
	Ok(())
}

#[rstest]
#[case::field_outside_block("*FieldType* value;")]
#[case::unterminated_block("@ReactiveProperty@ *FieldType*")]
#[case::two_blocks("@ReactiveProperty@a@ReactiveProperty@ @ReactiveProperty@b@ReactiveProperty@")]
fn template_rejects_invalid_snippets(#[case] source: &str) {
	let result = Template::parse("Broken.txt", source);
	assert!(matches!(
		result,
		Err(NanogenError::TemplateParse { template, .. }) if template == "Broken.txt"
	));
}

#[test]
fn template_field_block_is_replaced_by_bound_content() -> NanogenResult<()> {
	let template = Template::parse("test", "{ @ReactiveProperty@*FieldType*@ReactiveProperty@ }")?;

	assert!(template.field_block().is_some());
	assert!(template.has_placeholder(Placeholder::FieldType));
	assert_eq!(template.render(&Bindings::new().with_block("int x;")), "{ int x; }");
	Ok(())
}

#[test]
fn builtin_templates_parse() -> NanogenResult<()> {
	let set = TemplateSet::builtin()?;
	for kind in TemplateKind::ALL {
		assert!(!set.get(kind).segments().is_empty(), "{kind} is empty");
	}

	assert!(set.get(TemplateKind::ComponentReactive).field_block().is_some());
	Ok(())
}

#[test]
fn template_directory_overrides_single_snippet() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("Group.txt"), "group *Context*")?;

	let set = TemplateSet::load(tmp.path())?;
	let bindings = Bindings::new().with(Placeholder::Context, "Game");

	assert_eq!(set.get(TemplateKind::Group).render(&bindings), "group Game");
	assert_eq!(
		set.get(TemplateKind::Attribute),
		TemplateSet::builtin()?.get(TemplateKind::Attribute)
	);
	Ok(())
}

// --- Expansion ---

#[test]
fn component_extensions_for_field_component() -> NanogenResult<()> {
	let templates = TemplateSet::builtin()?;
	let expander = Expander::new(&templates, TagKey::Context);
	let fragment = expander.component_extensions(&health_declaration(), "Game")?;

	assert!(fragment.content.contains("// Health (Game)"));
	assert!(fragment.content.contains("public HealthComponent Health { get"));
	assert!(fragment.content.contains("public GameEntity AddHealth(int value)"));
	assert!(fragment.content.contains("c.Value = value;"));
	assert!(!fragment.content.contains("using UnityEngine;"));
	assert_eq!(fragment.tags.generation_type, Some(GenerationType::AddRemove));
	assert_eq!(fragment.tags.context.as_deref(), Some("Game"));
	assert_eq!(fragment.tags.component.as_deref(), Some("Health"));

	Ok(())
}

#[test]
fn component_extensions_for_fieldless_component() -> NanogenResult<()> {
	let templates = TemplateSet::builtin()?;
	let expander = Expander::new(&templates, TagKey::Component);
	let player = parse_declaration(PLAYER_SOURCE, &game_contexts(), false)?;
	let fragment = expander.component_extensions(&player, "Game")?;

	assert!(fragment.content.contains("public bool IsPlayer"));
	assert!(!fragment.content.contains("AddPlayer"));
	Ok(())
}

#[test]
fn component_extensions_include_usings_when_grouped_by_component() -> NanogenResult<()> {
	let templates = TemplateSet::builtin()?;
	let expander = Expander::new(&templates, TagKey::Component);
	let fragment = expander.component_extensions(&health_declaration(), "Game")?;

	assert!(fragment.content.contains("</auto-generated>"));
	assert!(fragment.content.contains("using UnityEngine;"));
	Ok(())
}

#[test]
fn reactive_component_renders_field_block_per_field() -> NanogenResult<()> {
	let templates = TemplateSet::builtin()?;
	let expander = Expander::new(&templates, TagKey::Context);
	let declaration = reactive_declaration(&[("speed", "float"), ("value", "int")]);
	let Some(fragment) = expander.reactive(&declaration)? else {
		panic!("expected a reactive fragment");
	};

	assert!(fragment.content.contains("public partial class SpeedComponent : ComponentEcs"));
	assert!(fragment.content.contains("public System.Action<float> OnSpeedChange;"));
	assert!(fragment.content.contains("_InternalOnValueChange(0);"));
	assert!(fragment.content.contains("public int Value"));
	assert!(fragment.content.contains("this.value = value;"));
	assert!(fragment.content.contains("_InternalOnValueChange(1);"));
	assert!(!fragment.content.contains("@ReactiveProperty@"));
	assert_eq!(fragment.tags.context, None);

	Ok(())
}

#[test]
fn non_reactive_component_renders_plain_fields() -> NanogenResult<()> {
	let templates = TemplateSet::builtin()?;
	let expander = Expander::new(&templates, TagKey::Context);
	let Some(fragment) = expander.reactive(&health_declaration())? else {
		panic!("expected a component fragment");
	};

	assert!(fragment.content.contains("public int Value;"));
	assert!(!fragment.content.contains("System.Action"));

	let player = parse_declaration(PLAYER_SOURCE, &game_contexts(), false)?;
	assert!(expander.reactive(&player)?.is_none());
	Ok(())
}

#[rstest]
#[case::single_field(&[("speed", "float")], "SpeedChanged()")]
#[case::many_fields(&[("speed", "float"), ("angle", "float")], "speed,\n        angle")]
fn collector_kind_depends_on_field_count(
	#[case] fields: &[(&str, &str)],
	#[case] expected: &str,
) -> NanogenResult<()> {
	let templates = TemplateSet::builtin()?;
	let expander = Expander::new(&templates, TagKey::Context);
	let Some(fragment) = expander.collector(&reactive_declaration(fields), "Game")? else {
		panic!("expected a collector fragment");
	};

	assert!(fragment.content.contains(expected), "{}", fragment.content);
	assert!(expander.collector(&health_declaration(), "Game")?.is_none());
	Ok(())
}

#[test]
fn list_fields_are_initialized_before_return() -> NanogenResult<()> {
	let templates = TemplateSet::builtin()?;
	let expander = Expander::new(&templates, TagKey::Context);
	let mut declaration = reactive_declaration(&[("speed", "float"), ("path", "List<Vector3>")]);
	normalize_field_types(&mut declaration);

	let fragment = expander.component_extensions(&declaration, "Game")?;
	let content = &fragment.content;
	let add = content
		.find("public GameEntity AddSpeed(")
		.unwrap_or_else(|| panic!("missing add method in {content}"));
	let initialize = content
		.find("c.Path.Initialize(c._InternalOnValueChange, 1);")
		.unwrap_or_else(|| panic!("missing list initializer in {content}"));
	let returns = content[add..]
		.find(RETURN_MARKER)
		.map(|offset| add + offset)
		.unwrap_or_else(|| panic!("missing return in {content}"));

	assert!(add < initialize && initialize < returns);
	assert!(content.contains("Speed.OnSpeedChange = null;"));
	Ok(())
}

#[test]
fn list_fields_require_return_marker() -> NanogenResult<()> {
	let mut templates = TemplateSet::builtin()?;
	templates.set(TemplateKind::ComponentAdd, "Add*ComponentName*(*ComponentFields*) {}")?;
	let expander = Expander::new(&templates, TagKey::Context);
	let mut declaration = reactive_declaration(&[("path", "List<int>")]);
	normalize_field_types(&mut declaration);

	let result = expander.component_extensions(&declaration, "Game");
	assert!(matches!(result, Err(NanogenError::MissingMarker { .. })));
	Ok(())
}

#[test]
fn component_map_lists_members_in_order() -> NanogenResult<()> {
	let templates = TemplateSet::builtin()?;
	let expander = Expander::new(&templates, TagKey::Context);
	let health = health_declaration();
	let none = ComponentDeclaration::none("Game");
	let fragment = expander.component_map("Game", &[&health, &none])?;

	assert!(fragment.content.contains("public static class GameComponentsMap"));
	assert!(fragment.content.contains("public const int Health = 0;\n    public const int None = 1;"));
	assert!(fragment.content.contains("\"Health\",\n        \"None\""));
	assert!(fragment.content.contains("typeof(HealthComponent)"));
	assert_eq!(fragment.tags.generation_type, Some(GenerationType::ComponentMap));
	Ok(())
}

#[test]
fn context_files_include_unique_components() -> NanogenResult<()> {
	let templates = TemplateSet::builtin()?;
	let expander = Expander::new(&templates, TagKey::Context);
	let player = parse_declaration(PLAYER_SOURCE, &game_contexts(), false)?;
	let fragments = expander.context_files(&[player, health_declaration()], &game_contexts())?;

	// Accumulator plus four per context.
	assert_eq!(fragments.len(), 9);
	assert!(fragments[0].content.contains("new IContext[] { Game, Input }"));
	assert_eq!(fragments[0].tags.context, None);

	let game_context = &fragments[2].content;
	assert!(game_context.contains("public partial class GameContext"));
	assert!(game_context.contains("public PlayerComponent Player;"));
	assert!(game_context.contains("public GameContext AddPlayer()"));
	assert!(!game_context.contains("Health"));

	let input_context = &fragments[6].content;
	assert!(!input_context.contains("@ContextUniqueComponentsSequence@"));
	assert!(!input_context.contains("Player"));
	Ok(())
}

#[test]
fn expand_all_is_deterministic() -> NanogenResult<()> {
	let templates = TemplateSet::builtin()?;
	let expander = Expander::new(&templates, TagKey::Context);
	let contexts = game_contexts();
	let declarations = resolve(vec![health_declaration()], &contexts);

	let first = expander.expand_all(&declarations, &contexts)?;
	let second = expander.expand_all(&declarations, &contexts)?;
	assert_eq!(first, second);

	let types: Vec<GenerationType> = first
		.iter()
		.filter_map(|f| f.tags.generation_type)
		.collect();
	assert_eq!(types.first(), Some(&GenerationType::AddRemove));
	assert_eq!(types.last(), Some(&GenerationType::Attribute));
	Ok(())
}

// --- Output ---

#[test]
fn aggregate_groups_by_tag_with_fallback() {
	let fragments = vec![
		Fragment::new("a", Tags::new(GenerationType::Group).context("Game")),
		Fragment::new("b", Tags::new(GenerationType::Reactive).component("Health")),
		Fragment::new("c", Tags::new(GenerationType::Group).context("Input")),
		Fragment::new("d", Tags::new(GenerationType::Entity).context("Game")),
	];

	let documents = aggregate_documents(&fragments, TagKey::Context, "// header", "using NanoEcs;");
	let titles: Vec<&str> = documents.iter().map(|d| d.title.as_str()).collect();

	assert_eq!(titles, vec!["Game", FALLBACK_TITLE, "Input"]);
	assert_eq!(documents[0].body, "using NanoEcs;\n// header\na\nd");

	let by_type = aggregate_documents(&fragments, TagKey::GenerationType, "// header", "");
	assert_eq!(by_type[0].title, "Group");
	assert_eq!(by_type[0].body, "// header\na\nc");
}

#[test]
fn usings_are_collected_once_with_runtime_first() {
	let mut state = GenerationState::new(game_contexts());
	let mut other = health_declaration();
	other.usings = "using System;\nusing UnityEngine;".to_string();
	state.declarations = vec![health_declaration(), other];
	state.collect_usings("NanoEcs");

	assert_eq!(
		state.usings,
		vec!["using NanoEcs;", "using UnityEngine;", "using System;"]
	);
	assert_eq!(state.usings_block(), "using NanoEcs;\nusing UnityEngine;\nusing System;");
}

#[test]
fn writer_replaces_output_directory() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	let dir = tmp.path().join("Generated");
	std::fs::create_dir_all(dir.join("Stale"))?;
	std::fs::write(dir.join("Old.cs"), "old")?;
	std::fs::write(dir.join("Stale").join("Inner.cs"), "old")?;

	let writer = OutputWriter::new(&dir, "cs");
	let documents = vec![OutputDocument {
		title: "Game".to_string(),
		body: "body".to_string(),
	}];
	let paths = writer.write(&documents, None)?;

	assert_eq!(paths, vec![dir.join("Game.cs")]);
	assert_eq!(std::fs::read_to_string(dir.join("Game.cs"))?, "body");
	assert!(!dir.join("Old.cs").exists());
	assert!(!dir.join("Stale").exists());
	Ok(())
}

#[test]
fn writer_creates_missing_output_directory() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	let dir = tmp.path().join("Nested").join("Generated");
	let writer = OutputWriter::new(&dir, "txt");
	let documents = vec![OutputDocument {
		title: "Common".to_string(),
		body: String::new(),
	}];

	writer.write(&documents, None)?;
	assert!(dir.join("Common.txt").is_file());
	Ok(())
}

#[test]
fn writer_refuses_locked_output() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	let dir = tmp.path().join("Generated");
	std::fs::create_dir_all(&dir)?;
	let locked_path = dir.join("Game.cs");
	std::fs::write(&locked_path, "locked")?;
	std::fs::write(dir.join("Input.cs"), "kept")?;

	let handle = std::fs::File::options()
		.read(true)
		.write(true)
		.open(&locked_path)?;
	handle.lock()?;

	let writer = OutputWriter::new(&dir, "cs");
	let documents = vec![OutputDocument {
		title: "Game".to_string(),
		body: "new".to_string(),
	}];
	let result = writer.write(&documents, None);

	assert!(matches!(result, Err(NanogenError::LockedOutput { .. })));
	assert_eq!(std::fs::read_to_string(&locked_path)?, "locked");
	assert_eq!(std::fs::read_to_string(dir.join("Input.cs"))?, "kept");

	handle.unlock()?;
	Ok(())
}

#[test]
fn writer_restores_previous_files_on_failure() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	let dir = tmp.path().join("Generated");
	std::fs::create_dir_all(dir.join("Sub"))?;
	std::fs::write(dir.join("Old.cs"), "old")?;
	std::fs::write(dir.join("Sub").join("Deep.cs"), "deep")?;

	let writer = OutputWriter::new(&dir, "cs");
	let documents = vec![
		OutputDocument {
			title: "Game".to_string(),
			body: "new".to_string(),
		},
		OutputDocument {
			title: "missing/Nested".to_string(),
			body: "unwritable".to_string(),
		},
	];
	let result = writer.write(&documents, None);

	assert!(matches!(result, Err(NanogenError::Io(_))));
	assert_eq!(std::fs::read_to_string(dir.join("Old.cs"))?, "old");
	assert_eq!(std::fs::read_to_string(dir.join("Sub").join("Deep.cs"))?, "deep");
	assert!(!dir.join("Game.cs").exists());
	Ok(())
}

#[test]
fn output_cache_captures_nested_files() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	assert!(OutputCache::capture(&tmp.path().join("absent"))?.is_empty());

	std::fs::create_dir_all(tmp.path().join("a").join("b"))?;
	std::fs::write(tmp.path().join("top.cs"), "1")?;
	std::fs::write(tmp.path().join("a").join("b").join("deep.cs"), "2")?;

	let cache = OutputCache::capture(tmp.path())?;
	assert_eq!(cache.len(), 2);

	clean_dir(tmp.path())?;
	assert!(!tmp.path().join("top.cs").exists());

	cache.restore()?;
	assert_eq!(std::fs::read_to_string(tmp.path().join("a").join("b").join("deep.cs"))?, "2");
	Ok(())
}

#[test]
fn snapshot_excludes_fragments() -> NanogenResult<()> {
	let mut state = GenerationState::new(game_contexts());
	state.declarations = vec![health_declaration()];
	state.fragments = vec![Fragment::new("body", Tags::new(GenerationType::Group))];

	let json = state
		.snapshot()
		.map_err(|e| NanogenError::Snapshot(e.to_string()))?;
	assert!(json.contains("\"Health\""));
	assert!(!json.contains("fragments"));

	let restored: GenerationState =
		serde_json::from_str(&json).map_err(|e| NanogenError::Snapshot(e.to_string()))?;
	assert_eq!(restored.declarations, state.declarations);
	assert!(restored.fragments.is_empty());
	Ok(())
}

// --- Single flight ---

#[test]
fn single_flight_coalesces_requests() {
	let flight = SingleFlight::new();
	let Some(mut guard) = flight.try_begin() else {
		panic!("first request should start a run");
	};

	assert!(flight.try_begin().is_none());
	assert!(flight.try_begin().is_none());
	assert!(flight.is_running());

	// Two requests collapse into a single rerun.
	assert!(guard.finish_pass());
	assert!(!guard.finish_pass());
	assert!(!flight.is_running());

	drop(guard);
	assert!(flight.try_begin().is_some());
}

#[test]
fn single_flight_releases_on_drop() {
	let flight = SingleFlight::new();
	{
		let _guard = flight.try_begin();
		assert!(flight.is_running());
	}

	assert!(!flight.is_running());
}

// --- Config and project discovery ---

#[test]
fn config_resolves_settings() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("Assets").join("Source").join("Core").join("MyComponents"))?;
	std::fs::write(
		tmp.path().join("nanogen.toml"),
		r#"
contexts = ["Game", "Input"]
serialize_state = true

[components]
source = "Assets/Source"

[output]
path = "Assets/Generated"
grouping = "component"
"#,
	)?;

	let Some(config) = NanogenConfig::load(tmp.path())? else {
		panic!("expected a config file");
	};
	let settings = GenerationSettings::from_config(tmp.path(), &config);

	assert_eq!(settings.contexts, vec!["Game", "Input"]);
	assert_eq!(
		settings.components_dir,
		Some(tmp.path().join("Assets").join("Source").join("Core").join("MyComponents"))
	);
	assert_eq!(settings.output_dir, tmp.path().join("Assets").join("Generated"));
	assert_eq!(settings.grouping, TagKey::Component);
	assert_eq!(settings.component_extension, "cs");
	assert_eq!(settings.runtime_namespace, DEFAULT_RUNTIME_NAMESPACE);
	assert!(settings.serialize_state);
	Ok(())
}

#[test]
fn config_missing_file_is_none() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	assert!(NanogenConfig::load(tmp.path())?.is_none());
	Ok(())
}

#[test]
fn config_invalid_toml_is_reported() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join(".nanogen.toml"), "contexts = Game")?;

	let result = NanogenConfig::load(tmp.path());
	assert!(matches!(result, Err(NanogenError::ConfigParse(_))));
	Ok(())
}

#[test]
fn discovery_prefers_shallow_directories() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("a").join("Components"))?;
	std::fs::create_dir_all(tmp.path().join("b").join("deep").join("comp"))?;
	std::fs::create_dir_all(tmp.path().join(".hidden_comp"))?;

	assert_eq!(
		discover_components_dir(tmp.path()),
		Some(tmp.path().join("a").join("Components"))
	);
	assert_eq!(discover_components_dir(&tmp.path().join("b").join("deep").join("comp")), None);
	Ok(())
}

#[test]
fn collect_component_files_applies_excludes() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();
	std::fs::create_dir_all(root.join("Legacy"))?;
	std::fs::create_dir_all(root.join(".git"))?;
	std::fs::create_dir_all(root.join("Sub"))?;
	std::fs::write(root.join("B.cs"), "")?;
	std::fs::write(root.join("A.cs"), "")?;
	std::fs::write(root.join("notes.txt"), "")?;
	std::fs::write(root.join("Legacy").join("Old.cs"), "")?;
	std::fs::write(root.join(".git").join("Hidden.cs"), "")?;
	std::fs::write(root.join("Sub").join("C.cs"), "")?;

	let files = collect_component_files(root, "cs", &["Legacy/".to_string()])?;
	assert_eq!(
		files,
		vec![root.join("A.cs"), root.join("B.cs"), root.join("Sub").join("C.cs")]
	);
	Ok(())
}

#[cfg(unix)]
#[test]
fn collect_component_files_rejects_symlink_cycles() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	let components = tmp.path().join("Components");
	std::fs::create_dir_all(components.join("Sub"))?;
	std::fs::write(components.join("Health.cs"), HEALTH_SOURCE)?;
	std::os::unix::fs::symlink(&components, components.join("Sub").join("loop"))?;

	let result = collect_component_files(&components, "cs", &[]);
	assert!(
		matches!(&result, Err(NanogenError::SymlinkCycle { path }) if path.ends_with("loop")),
		"{result:?}"
	);

	let files = collect_component_files(&components, "cs", &["Sub/loop".to_string()])?;
	assert_eq!(files, vec![components.join("Health.cs")]);
	Ok(())
}

#[cfg(unix)]
#[test]
fn output_cache_rejects_symlink_cycles() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	let output = tmp.path().join("Generated");
	std::fs::create_dir_all(&output)?;
	std::fs::write(output.join("Game.cs"), "old")?;
	std::os::unix::fs::symlink(&output, output.join("loop"))?;

	let result = OutputCache::capture(&output);
	assert!(matches!(result, Err(NanogenError::SymlinkCycle { .. })));
	Ok(())
}

#[test]
fn error_symlink_cycle_display_format() {
	let error = NanogenError::SymlinkCycle {
		path: "Components/Sub/loop".to_string(),
	};
	let message = error.to_string();
	assert!(message.contains("symlink cycle"));
	assert!(message.contains("Components/Sub/loop"));
}

// --- Generator ---

#[test]
fn generate_writes_documents_per_context() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	write_components(
		tmp.path(),
		&[
			("Health.cs", HEALTH_SOURCE),
			("Position.cs", POSITION_SOURCE),
			("Player.cs", PLAYER_SOURCE),
		],
	);

	let generator = Generator::new(settings_for(tmp.path()), TemplateSet::builtin()?);
	let report = generator.generate()?;
	let output = tmp.path().join("Generated");

	assert_eq!(report.components, 3);
	assert_eq!(report.extensions(), 12);
	assert_eq!(report.passes, 1);
	assert_eq!(report.prechecks.len(), 3);
	assert!(report.summary().starts_with("12 extensions (from 3 components) generated in"));
	assert_eq!(
		report.documents,
		vec![output.join("Game.cs"), output.join("Common.cs"), output.join("Input.cs")]
	);

	let game = std::fs::read_to_string(output.join("Game.cs"))?;
	assert!(game.starts_with("using NanoEcs;\nusing UnityEngine;\nusing System.Collections.Generic;\n"));
	assert!(game.contains("public GameEntity AddHealth(int value)"));
	assert!(game.contains("NanoList<Vector3> path"));
	assert!(game.contains("public PlayerComponent Player;"));

	let input = std::fs::read_to_string(output.join("Input.cs"))?;
	assert!(input.contains("public InputEntity AddPosition("));
	assert!(!input.contains("Health"));
	Ok(())
}

#[test]
fn generate_is_deterministic() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	write_components(
		tmp.path(),
		&[("Health.cs", HEALTH_SOURCE), ("Position.cs", POSITION_SOURCE)],
	);
	let generator = Generator::new(settings_for(tmp.path()), TemplateSet::builtin()?);
	let output = tmp.path().join("Generated");

	generator.generate()?;
	let first = std::fs::read_to_string(output.join("Game.cs"))?;
	generator.generate()?;
	let second = std::fs::read_to_string(output.join("Game.cs"))?;

	assert_eq!(first, second);
	Ok(())
}

#[test]
fn generate_synthesizes_placeholder_documents() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	write_components(tmp.path(), &[("Health.cs", HEALTH_SOURCE)]);

	let generator = Generator::new(settings_for(tmp.path()), TemplateSet::builtin()?);
	let plan = generator.plan()?;

	assert_eq!(plan.component_count(), 1);
	assert_eq!(plan.state.declarations.len(), 2);
	let input = plan
		.documents
		.iter()
		.find(|d| d.title == "Input")
		.unwrap_or_else(|| panic!("missing Input document"));
	assert!(input.body.contains("public const int None = 0;"));

	let report = generator.generate()?;
	assert_eq!(report.components, 1);
	assert!(report.summary().starts_with("4 extensions (from 1 components)"));
	Ok(())
}

#[test]
fn generate_aborts_on_failed_precheck() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	write_components(
		tmp.path(),
		&[("Health.cs", HEALTH_SOURCE), ("Broken.cs", "public int broken;")],
	);
	let output = tmp.path().join("Generated");
	std::fs::create_dir_all(&output)?;
	std::fs::write(output.join("Game.cs"), "previous")?;

	let generator = Generator::new(settings_for(tmp.path()), TemplateSet::builtin()?);
	let result = generator.generate();

	match result {
		Err(NanogenError::PrecheckFailed {
			failed,
			total,
			records,
		}) => {
			assert_eq!((failed, total), (1, 2));
			assert!(records.iter().any(|r| !r.passed && r.message.contains("Broken.cs")));
		}
		other => panic!("expected a precheck failure, got {other:?}"),
	}
	assert_eq!(std::fs::read_to_string(output.join("Game.cs"))?, "previous");
	Ok(())
}

#[rstest]
#[case::no_contexts(vec![], true)]
#[case::no_components_dir(vec!["Game"], false)]
fn generate_validates_settings(#[case] names: Vec<&str>, #[case] missing_contexts: bool) -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	let mut settings = settings_for(tmp.path());
	settings.contexts = contexts(&names);

	let result = Generator::new(settings, TemplateSet::builtin()?).generate();
	let Err(error) = result else {
		panic!("expected a configuration error");
	};

	assert!(error.is_configuration_missing());
	assert_eq!(matches!(error, NanogenError::MissingContexts), missing_contexts);
	assert!(!tmp.path().join("Generated").exists());
	Ok(())
}

#[test]
fn generate_writes_state_snapshot() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	write_components(tmp.path(), &[("Health.cs", HEALTH_SOURCE)]);
	let mut settings = settings_for(tmp.path());
	settings.serialize_state = true;

	let report = Generator::new(settings, TemplateSet::builtin()?).generate()?;
	let snapshot_path = tmp.path().join("Generated").join(STATE_FILE_NAME);
	assert_eq!(report.documents.last(), Some(&snapshot_path));

	let json = std::fs::read_to_string(&snapshot_path)?;
	let state: GenerationState =
		serde_json::from_str(&json).map_err(|e| NanogenError::Snapshot(e.to_string()))?;
	assert_eq!(state.contexts, game_contexts());
	assert_eq!(state.usings[0], "using NanoEcs;");
	Ok(())
}

#[test]
fn check_detects_stale_missing_and_extra_documents() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	write_components(tmp.path(), &[("Health.cs", HEALTH_SOURCE)]);
	let generator = Generator::new(settings_for(tmp.path()), TemplateSet::builtin()?);
	let output = tmp.path().join("Generated");

	assert_eq!(generator.check()?.missing.len(), 3);

	generator.generate()?;
	assert!(generator.check()?.is_ok());

	std::fs::write(output.join("Game.cs"), "edited")?;
	std::fs::remove_file(output.join("Input.cs"))?;
	std::fs::write(output.join("Extra.cs"), "")?;

	let result = generator.check()?;
	assert_eq!(result.stale.len(), 1);
	assert_eq!(result.stale[0].current, "edited");
	assert_eq!(result.missing, vec![output.join("Input.cs")]);
	assert_eq!(result.extra, vec![output.join("Extra.cs")]);
	Ok(())
}

#[test]
fn generator_loads_project_from_root() -> NanogenResult<()> {
	let tmp = tempfile::tempdir()?;
	write_components(tmp.path(), &[("Health.cs", HEALTH_SOURCE)]);
	std::fs::create_dir_all(tmp.path().join("Snippets"))?;
	std::fs::write(tmp.path().join("Snippets").join("Group.txt"), "// group *Context*")?;
	std::fs::write(
		tmp.path().join("nanogen.toml"),
		"contexts = [\"Game\"]\nruntime_namespace = \"MyEcs\"\n\n[components]\npath = \
		 \"Components\"\n\n[templates]\npath = \"Snippets\"\n",
	)?;

	let generator = Generator::from_root(tmp.path())?;
	let plan = generator.plan()?;
	let game = &plan.documents[0];

	assert_eq!(game.title, "Game");
	assert!(game.body.starts_with("using MyEcs;"));
	assert!(game.body.contains("// group Game"));
	Ok(())
}

#[test]
fn plan_sources_uses_replaced_snippets() -> NanogenResult<()> {
	let mut templates = TemplateSet::builtin()?;
	templates.set(TemplateKind::GeneratedHeader, "// custom header")?;
	let generator = Generator::new(settings_for(&PathBuf::from("project")), templates);

	let plan = generator.plan_sources(&[(PathBuf::from("Health.cs"), HEALTH_SOURCE.to_string())])?;
	assert_eq!(plan.component_count(), 1);
	for document in &plan.documents {
		assert!(
			document.body.contains("\n// custom header\n"),
			"{} is missing the header",
			document.title
		);
	}
	Ok(())
}

#[test]
fn plan_renders_health_in_game_document() -> NanogenResult<()> {
	let source = "[Game]\npublic class Health\n{\n    public int current;\n    public int max;\n}\n";
	let generator = Generator::new(settings_for(&PathBuf::from("project")), TemplateSet::builtin()?);

	let plan = generator.plan_sources(&[(PathBuf::from("Health.cs"), source.to_string())])?;
	let game = plan
		.documents
		.iter()
		.find(|document| document.title == "Game")
		.ok_or_else(|| NanogenError::Snapshot("no Game document".to_string()))?;

	assert!(game.body.contains("This code was generated by nanogen."));
	assert!(game.body.contains("public HealthComponent Health { get"));
	assert!(game.body.contains("public GameEntity AddHealth(int current, int max)"));
	Ok(())
}
