use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;

use derive_more::Deref;
use derive_more::DerefMut;

use crate::NanogenError;
use crate::NanogenResult;

/// Delimiter that opens and closes the per-field block of a template.
pub const FIELD_BLOCK_DELIMITER: &str = "@ReactiveProperty@";

/// The snippet kinds consumed by the expansion engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateKind {
	GeneratedHeader,
	ComponentHeader,
	ComponentGet,
	ComponentFieldless,
	ComponentAdd,
	ComponentReactive,
	Attribute,
	Contexts,
	Context,
	ContextAddExtension,
	EntityContextChild,
	Collector,
	CollectorFieldless,
	Group,
	GroupBuilder,
	ComponentMap,
	ContextsAccumulator,
}

impl TemplateKind {
	pub const ALL: [TemplateKind; 17] = [
		Self::GeneratedHeader,
		Self::ComponentHeader,
		Self::ComponentGet,
		Self::ComponentFieldless,
		Self::ComponentAdd,
		Self::ComponentReactive,
		Self::Attribute,
		Self::Contexts,
		Self::Context,
		Self::ContextAddExtension,
		Self::EntityContextChild,
		Self::Collector,
		Self::CollectorFieldless,
		Self::Group,
		Self::GroupBuilder,
		Self::ComponentMap,
		Self::ContextsAccumulator,
	];

	/// Snippet file name inside a templates directory.
	pub fn file_name(self) -> &'static str {
		match self {
			Self::GeneratedHeader => "GeneratedHeader.txt",
			Self::ComponentHeader => "ComponentHeader.txt",
			Self::ComponentGet => "ComponentExtensions_Get_Property.txt",
			Self::ComponentFieldless => "ComponentExtensions_Fieldless.txt",
			Self::ComponentAdd => "ComponentExtensions_Add_Method.txt",
			Self::ComponentReactive => "ComponentReactive.txt",
			Self::Attribute => "Attribute.txt",
			Self::Contexts => "Contexts.txt",
			Self::Context => "Context.txt",
			Self::ContextAddExtension => "ContextAddExtension.txt",
			Self::EntityContextChild => "Entity_ContextChild.txt",
			Self::Collector => "Collector.txt",
			Self::CollectorFieldless => "CollectorFieldless.txt",
			Self::Group => "Group.txt",
			Self::GroupBuilder => "Group_Builder.txt",
			Self::ComponentMap => "ComponentMap.txt",
			Self::ContextsAccumulator => "ContextsAccumulator.txt",
		}
	}

	/// The snippet shipped with the library.
	pub fn builtin_source(self) -> &'static str {
		match self {
			Self::GeneratedHeader => include_str!("../snippets/GeneratedHeader.txt"),
			Self::ComponentHeader => include_str!("../snippets/ComponentHeader.txt"),
			Self::ComponentGet => include_str!("../snippets/ComponentExtensions_Get_Property.txt"),
			Self::ComponentFieldless => include_str!("../snippets/ComponentExtensions_Fieldless.txt"),
			Self::ComponentAdd => include_str!("../snippets/ComponentExtensions_Add_Method.txt"),
			Self::ComponentReactive => include_str!("../snippets/ComponentReactive.txt"),
			Self::Attribute => include_str!("../snippets/Attribute.txt"),
			Self::Contexts => include_str!("../snippets/Contexts.txt"),
			Self::Context => include_str!("../snippets/Context.txt"),
			Self::ContextAddExtension => include_str!("../snippets/ContextAddExtension.txt"),
			Self::EntityContextChild => include_str!("../snippets/Entity_ContextChild.txt"),
			Self::Collector => include_str!("../snippets/Collector.txt"),
			Self::CollectorFieldless => include_str!("../snippets/CollectorFieldless.txt"),
			Self::Group => include_str!("../snippets/Group.txt"),
			Self::GroupBuilder => include_str!("../snippets/Group_Builder.txt"),
			Self::ComponentMap => include_str!("../snippets/ComponentMap.txt"),
			Self::ContextsAccumulator => include_str!("../snippets/ContextsAccumulator.txt"),
		}
	}
}

impl Display for TemplateKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.file_name())
	}
}

/// Which part of a run a placeholder draws its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderScope {
	/// One field of a component. Only valid inside the field block.
	Field,
	/// One component.
	Component,
	/// One context, or the whole run.
	Context,
	/// A pre-joined sequence of renders.
	Sequence,
}

/// A recognized placeholder. Text between delimiters that does not name one
/// of these stays literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
	/// `*ComponentName*`
	ComponentName,
	/// `*Context*`
	Context,
	/// `*Contexts*`
	Contexts,
	/// `*ComponentFields*`
	ComponentFields,
	/// `*AddingComponentsSequence*`
	AddingComponentsSequence,
	/// `*ClearingActionsSequence*`
	ClearingActionsSequence,
	/// `*ComponentEnumValues*`
	ComponentEnumValues,
	/// `*FieldPascalCase*`
	FieldPascalCase,
	/// `*FieldCamelCase*`
	FieldCamelCase,
	/// `*FieldCamelCase_Set*`
	FieldCamelCaseSet,
	/// `*FieldType*`
	FieldType,
	/// `*FieldId*`
	FieldId,
	/// `@ComponentIndexesSequence@`
	ComponentIndexesSequence,
	/// `@ComponentNamesSequence@`
	ComponentNamesSequence,
	/// `@ComponentTypesSequence@`
	ComponentTypesSequence,
	/// `@ContextUniqueComponentsSequence@`
	ContextUniqueComponentsSequence,
}

impl Placeholder {
	/// Look up a placeholder by delimiter and name.
	pub fn from_tag(delimiter: char, name: &str) -> Option<Self> {
		let placeholder = match (delimiter, name) {
			('*', "ComponentName") => Self::ComponentName,
			('*', "Context") => Self::Context,
			('*', "Contexts") => Self::Contexts,
			('*', "ComponentFields") => Self::ComponentFields,
			('*', "AddingComponentsSequence") => Self::AddingComponentsSequence,
			('*', "ClearingActionsSequence") => Self::ClearingActionsSequence,
			('*', "ComponentEnumValues") => Self::ComponentEnumValues,
			('*', "FieldPascalCase") => Self::FieldPascalCase,
			('*', "FieldCamelCase") => Self::FieldCamelCase,
			('*', "FieldCamelCase_Set") => Self::FieldCamelCaseSet,
			('*', "FieldType") => Self::FieldType,
			('*', "FieldId") => Self::FieldId,
			('@', "ComponentIndexesSequence") => Self::ComponentIndexesSequence,
			('@', "ComponentNamesSequence") => Self::ComponentNamesSequence,
			('@', "ComponentTypesSequence") => Self::ComponentTypesSequence,
			('@', "ContextUniqueComponentsSequence") => Self::ContextUniqueComponentsSequence,
			_ => return None,
		};

		Some(placeholder)
	}

	/// The text of the tag as it appears in a snippet.
	pub fn tag(self) -> &'static str {
		match self {
			Self::ComponentName => "*ComponentName*",
			Self::Context => "*Context*",
			Self::Contexts => "*Contexts*",
			Self::ComponentFields => "*ComponentFields*",
			Self::AddingComponentsSequence => "*AddingComponentsSequence*",
			Self::ClearingActionsSequence => "*ClearingActionsSequence*",
			Self::ComponentEnumValues => "*ComponentEnumValues*",
			Self::FieldPascalCase => "*FieldPascalCase*",
			Self::FieldCamelCase => "*FieldCamelCase*",
			Self::FieldCamelCaseSet => "*FieldCamelCase_Set*",
			Self::FieldType => "*FieldType*",
			Self::FieldId => "*FieldId*",
			Self::ComponentIndexesSequence => "@ComponentIndexesSequence@",
			Self::ComponentNamesSequence => "@ComponentNamesSequence@",
			Self::ComponentTypesSequence => "@ComponentTypesSequence@",
			Self::ContextUniqueComponentsSequence => "@ContextUniqueComponentsSequence@",
		}
	}

	pub fn scope(self) -> PlaceholderScope {
		match self {
			Self::FieldPascalCase
			| Self::FieldCamelCase
			| Self::FieldCamelCaseSet
			| Self::FieldType
			| Self::FieldId => PlaceholderScope::Field,
			Self::ComponentName
			| Self::ComponentFields
			| Self::AddingComponentsSequence
			| Self::ClearingActionsSequence
			| Self::ComponentEnumValues => PlaceholderScope::Component,
			Self::Context | Self::Contexts => PlaceholderScope::Context,
			Self::ComponentIndexesSequence
			| Self::ComponentNamesSequence
			| Self::ComponentTypesSequence
			| Self::ContextUniqueComponentsSequence => PlaceholderScope::Sequence,
		}
	}
}

impl Display for Placeholder {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.tag())
	}
}

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
	Literal(String),
	Placeholder(Placeholder),
	/// The segments between the two field block delimiters.
	FieldBlock(Vec<Segment>),
}

/// Values substituted into a template during one render.
#[derive(Debug, Clone, Default, Deref, DerefMut)]
pub struct Bindings {
	#[deref]
	#[deref_mut]
	values: HashMap<Placeholder, String>,
	/// Pre-rendered content replacing the field block.
	block: Option<String>,
}

impl Bindings {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with(mut self, placeholder: Placeholder, value: impl Into<String>) -> Self {
		self.values.insert(placeholder, value.into());
		self
	}

	#[must_use]
	pub fn with_block(mut self, content: impl Into<String>) -> Self {
		self.block = Some(content.into());
		self
	}
}

/// A snippet parsed into literal spans and typed placeholders.
///
/// Rendering walks the segments once, so substituted values are never scanned
/// for placeholders again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
	segments: Vec<Segment>,
}

impl Template {
	/// Parse snippet text. `name` is only used in error messages.
	pub fn parse(name: &str, source: &str) -> NanogenResult<Self> {
		let error = |reason: &str| {
			NanogenError::TemplateParse {
				template: name.to_string(),
				reason: reason.to_string(),
			}
		};

		let mut segments: Vec<Segment> = vec![];
		let mut block: Option<Vec<Segment>> = None;
		let mut block_count = 0usize;
		let mut literal = String::new();
		let mut rest = source;

		while let Some(position) = rest.find(['*', '@']) {
			literal.push_str(&rest[..position]);
			let tail = &rest[position..];

			if let Some(after) = tail.strip_prefix(FIELD_BLOCK_DELIMITER) {
				let target = block.as_mut().unwrap_or(&mut segments);
				flush_literal(target, &mut literal);

				match block.take() {
					Some(inner) => segments.push(Segment::FieldBlock(inner)),
					None => {
						block_count += 1;
						if block_count > 1 {
							return Err(error("only one field block is allowed"));
						}
						block = Some(vec![]);
					}
				}

				rest = after;
				continue;
			}

			let Some((placeholder, length)) = read_tag(tail) else {
				// A lone delimiter character.
				let delimiter_len = tail.chars().next().map_or(1, char::len_utf8);
				literal.push_str(&tail[..delimiter_len]);
				rest = &tail[delimiter_len..];
				continue;
			};

			if placeholder.scope() == PlaceholderScope::Field && block.is_none() {
				return Err(error(&format!(
					"field placeholder `{placeholder}` used outside a `{FIELD_BLOCK_DELIMITER}` block"
				)));
			}

			let target = block.as_mut().unwrap_or(&mut segments);
			flush_literal(target, &mut literal);
			target.push(Segment::Placeholder(placeholder));
			rest = &tail[length..];
		}

		literal.push_str(rest);

		if block.is_some() {
			return Err(error(&format!("unterminated `{FIELD_BLOCK_DELIMITER}` block")));
		}

		flush_literal(&mut segments, &mut literal);
		Ok(Self { segments })
	}

	pub fn segments(&self) -> &[Segment] {
		&self.segments
	}

	/// The field block of this template, if it has one.
	pub fn field_block(&self) -> Option<&[Segment]> {
		self.segments.iter().find_map(|segment| {
			match segment {
				Segment::FieldBlock(inner) => Some(inner.as_slice()),
				_ => None,
			}
		})
	}

	pub fn has_placeholder(&self, placeholder: Placeholder) -> bool {
		fn contains(segments: &[Segment], placeholder: Placeholder) -> bool {
			segments.iter().any(|segment| {
				match segment {
					Segment::Placeholder(found) => *found == placeholder,
					Segment::FieldBlock(inner) => contains(inner, placeholder),
					Segment::Literal(_) => false,
				}
			})
		}

		contains(&self.segments, placeholder)
	}

	pub fn render(&self, bindings: &Bindings) -> String {
		let mut output = String::new();
		render_segments(&self.segments, bindings, &mut output);
		output
	}
}

/// Render a list of segments, typically a field block, with `bindings`.
pub fn render_segments(segments: &[Segment], bindings: &Bindings, output: &mut String) {
	for segment in segments {
		match segment {
			Segment::Literal(text) => output.push_str(text),
			Segment::Placeholder(placeholder) => {
				match bindings.values.get(placeholder) {
					Some(value) => output.push_str(value),
					None => output.push_str(placeholder.tag()),
				}
			}
			Segment::FieldBlock(inner) => {
				match &bindings.block {
					Some(content) => output.push_str(content),
					None => render_segments(inner, bindings, output),
				}
			}
		}
	}
}

fn flush_literal(target: &mut Vec<Segment>, literal: &mut String) {
	if !literal.is_empty() {
		target.push(Segment::Literal(std::mem::take(literal)));
	}
}

/// Read a `*Name*` or `@Name@` tag at the start of `text`, returning the
/// placeholder and the byte length of the tag.
fn read_tag(text: &str) -> Option<(Placeholder, usize)> {
	let delimiter = text.chars().next()?;
	let body = &text[1..];
	let name_len = body
		.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
		.unwrap_or(body.len());

	if name_len == 0 || !body[name_len..].starts_with(delimiter) {
		return None;
	}

	let placeholder = Placeholder::from_tag(delimiter, &body[..name_len])?;
	Some((placeholder, name_len + 2))
}

/// Every snippet kind, parsed.
#[derive(Debug, Clone)]
pub struct TemplateSet {
	templates: HashMap<TemplateKind, Template>,
}

impl TemplateSet {
	/// The snippets shipped with the library.
	pub fn builtin() -> NanogenResult<Self> {
		let mut templates = HashMap::new();
		for kind in TemplateKind::ALL {
			templates.insert(kind, Template::parse(kind.file_name(), kind.builtin_source())?);
		}

		Ok(Self { templates })
	}

	/// Load snippets from `dir`, falling back to the built-in snippet for every
	/// kind without a file.
	pub fn load(dir: &Path) -> NanogenResult<Self> {
		let mut set = Self::builtin()?;

		for kind in TemplateKind::ALL {
			let path = dir.join(kind.file_name());
			if !path.is_file() {
				tracing::debug!(path = %path.display(), "snippet not found, using built-in");
				continue;
			}

			let source = std::fs::read_to_string(&path)?;
			set.templates
				.insert(kind, Template::parse(kind.file_name(), &source)?);
		}

		Ok(set)
	}

	/// Replace one snippet.
	pub fn set(&mut self, kind: TemplateKind, source: &str) -> NanogenResult<()> {
		self.templates
			.insert(kind, Template::parse(kind.file_name(), source)?);
		Ok(())
	}

	pub fn get(&self, kind: TemplateKind) -> &Template {
		// Every constructor fills all kinds.
		&self.templates[&kind]
	}
}
