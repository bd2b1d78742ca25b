use crate::Bindings;
use crate::ComponentDeclaration;
use crate::FieldDeclaration;
use crate::Fragment;
use crate::GenerationType;
use crate::NanogenError;
use crate::NanogenResult;
use crate::Placeholder;
use crate::TagKey;
use crate::Tags;
use crate::TemplateKind;
use crate::TemplateSet;
use crate::template::render_segments;
use crate::text::aggregate;
use crate::text::first_char_to_upper;
use crate::text::new_line;
use crate::text::variate_first_char;

/// List initialization is inserted before the first occurrence of this text
/// in a rendered add method.
pub const RETURN_MARKER: &str = "return this;";

/// Expands snippets against component declarations and contexts.
///
/// Every method is pure: the same declarations and templates always produce
/// the same fragments in the same order.
pub struct Expander<'a> {
	templates: &'a TemplateSet,
	grouping: TagKey,
}

impl<'a> Expander<'a> {
	pub fn new(templates: &'a TemplateSet, grouping: TagKey) -> Self {
		Self {
			templates,
			grouping,
		}
	}

	/// Expand every snippet for a resolved run.
	///
	/// Order: per declaration its extensions, reactive block, group builders
	/// and collectors; then groups per context; then component maps; then the
	/// context files.
	pub fn expand_all(
		&self,
		declarations: &[ComponentDeclaration],
		contexts: &[String],
	) -> NanogenResult<Vec<Fragment>> {
		let mut fragments = vec![];

		for declaration in declarations {
			for context in &declaration.contexts {
				fragments.push(self.component_extensions(declaration, context)?);
			}

			if let Some(reactive) = self.reactive(declaration)? {
				fragments.push(reactive);
			}

			for context in &declaration.contexts {
				fragments.push(self.group_builder(declaration, context));
				if let Some(collector) = self.collector(declaration, context)? {
					fragments.push(collector);
				}
			}
		}

		for context in contexts {
			fragments.push(self.group(context));
		}

		for context in contexts_in_use(declarations) {
			let members: Vec<&ComponentDeclaration> = declarations
				.iter()
				.filter(|d| d.belongs_to(context))
				.collect();
			fragments.push(self.component_map(context, &members)?);
		}

		fragments.extend(self.context_files(declarations, contexts)?);

		tracing::debug!(fragments = fragments.len(), "expanded templates");
		Ok(fragments)
	}

	/// Entity accessors for one component in one context.
	pub fn component_extensions(
		&self,
		declaration: &ComponentDeclaration,
		context: &str,
	) -> NanogenResult<Fragment> {
		let bindings = component_bindings(declaration, context);
		let mut content = self.preamble(declaration);

		content.push('\n');
		content.push_str(&self.render(TemplateKind::ComponentHeader, &bindings));
		content.push('\n');

		if declaration.has_fields() {
			content.push_str(&self.render(TemplateKind::ComponentGet, &bindings));
			content.push('\n');
			content.push_str(&self.add_method(TemplateKind::ComponentAdd, declaration, context)?);
		} else {
			content.push_str(&self.render(TemplateKind::ComponentFieldless, &bindings));
		}

		let tags = Tags::new(GenerationType::AddRemove)
			.context(context)
			.component(&declaration.name);

		Ok(Fragment::new(content, tags))
	}

	/// The component class body. Fieldless components have none.
	pub fn reactive(&self, declaration: &ComponentDeclaration) -> NanogenResult<Option<Fragment>> {
		if !declaration.has_fields() {
			return Ok(None);
		}

		let template = self.templates.get(TemplateKind::ComponentReactive);
		let bindings = Bindings::new().with(Placeholder::ComponentName, &declaration.name);

		let members: Vec<String> = match template.field_block() {
			Some(block) if declaration.is_reactive() => {
				declaration
					.fields
					.iter()
					.map(|field| {
						let mut rendered = String::new();
						render_segments(block, &field_bindings(&bindings, field), &mut rendered);
						rendered
					})
					.collect()
			}
			_ => {
				declaration
					.fields
					.iter()
					.map(|field| {
						format!(
							"public {} {};",
							field.r#type,
							first_char_to_upper(&field.name)
						)
					})
					.collect()
			}
		};

		let members = aggregate(&members, &new_line(1), "reactive members")?;
		let mut content = self.preamble(declaration);
		content.push('\n');
		content.push_str(&template.render(&bindings.with_block(members)));

		let tags = Tags::new(GenerationType::Reactive).component(&declaration.name);
		Ok(Some(Fragment::new(content, tags)))
	}

	pub fn group_builder(&self, declaration: &ComponentDeclaration, context: &str) -> Fragment {
		let content = self.render(
			TemplateKind::GroupBuilder,
			&component_bindings(declaration, context),
		);
		let tags = Tags::new(GenerationType::GroupBuilder)
			.context(context)
			.component(&declaration.name);

		Fragment::new(content, tags)
	}

	/// Change collector, only for reactive components with fields.
	pub fn collector(
		&self,
		declaration: &ComponentDeclaration,
		context: &str,
	) -> NanogenResult<Option<Fragment>> {
		if !declaration.has_fields() || !declaration.is_reactive() {
			return Ok(None);
		}

		let kind = if declaration.fields.len() > 1 {
			TemplateKind::Collector
		} else {
			TemplateKind::CollectorFieldless
		};
		let separator = format!(",{}", new_line(2));
		let values = aggregate(
			declaration.fields.iter().map(|f| f.name.as_str()),
			&separator,
			"collector fields",
		)?;
		let bindings = component_bindings(declaration, context)
			.with(Placeholder::ComponentEnumValues, values);
		let tags = Tags::new(GenerationType::Collector)
			.context(context)
			.component(&declaration.name);

		Ok(Some(Fragment::new(self.render(kind, &bindings), tags)))
	}

	pub fn group(&self, context: &str) -> Fragment {
		let bindings = Bindings::new().with(Placeholder::Context, context);
		let tags = Tags::new(GenerationType::Group).context(context);

		Fragment::new(self.render(TemplateKind::Group, &bindings), tags)
	}

	/// Index, name and type tables for the components of one context.
	pub fn component_map(
		&self,
		context: &str,
		members: &[&ComponentDeclaration],
	) -> NanogenResult<Fragment> {
		let listed = format!(",{}", new_line(2));
		let indexes = aggregate(
			members
				.iter()
				.enumerate()
				.map(|(i, d)| format!("public const int {} = {i};", d.name)),
			&new_line(1),
			"component indexes",
		)?;
		let names = aggregate(
			members.iter().map(|d| format!("\"{}\"", d.name)),
			&listed,
			"component names",
		)?;
		let types = aggregate(
			members.iter().map(|d| format!("typeof({}Component)", d.name)),
			&listed,
			"component types",
		)?;

		let bindings = Bindings::new()
			.with(Placeholder::ComponentName, context)
			.with(Placeholder::Context, context)
			.with(Placeholder::ComponentIndexesSequence, indexes)
			.with(Placeholder::ComponentNamesSequence, names)
			.with(Placeholder::ComponentTypesSequence, types);
		let tags = Tags::new(GenerationType::ComponentMap).context(context);

		Ok(Fragment::new(self.render(TemplateKind::ComponentMap, &bindings), tags))
	}

	/// The run wide contexts accumulator followed by each context's context,
	/// entity and attribute classes.
	pub fn context_files(
		&self,
		declarations: &[ComponentDeclaration],
		contexts: &[String],
	) -> NanogenResult<Vec<Fragment>> {
		let mut fragments = vec![];

		let all = aggregate(contexts, ", ", "contexts")?;
		let bindings = Bindings::new().with(Placeholder::Contexts, all);
		fragments.push(Fragment::new(
			self.render(TemplateKind::ContextsAccumulator, &bindings),
			Tags::new(GenerationType::Contexts),
		));

		for context in contexts {
			let mut bindings = Bindings::new().with(Placeholder::Context, context);

			fragments.push(Fragment::new(
				self.render(TemplateKind::Contexts, &bindings),
				Tags::new(GenerationType::Contexts).context(context),
			));

			bindings.insert(
				Placeholder::ContextUniqueComponentsSequence,
				self.unique_components(declarations, context)?,
			);
			fragments.push(Fragment::new(
				self.render(TemplateKind::Context, &bindings),
				Tags::new(GenerationType::Contexts).context(context),
			));

			fragments.push(Fragment::new(
				self.render(TemplateKind::EntityContextChild, &bindings),
				Tags::new(GenerationType::Entity).context(context),
			));

			fragments.push(Fragment::new(
				self.render(TemplateKind::Attribute, &bindings),
				Tags::new(GenerationType::Attribute).context(context),
			));
		}

		Ok(fragments)
	}

	/// Context level accessors for unique components. Empty when the context
	/// has none.
	fn unique_components(
		&self,
		declarations: &[ComponentDeclaration],
		context: &str,
	) -> NanogenResult<String> {
		let mut entries = vec![];
		for declaration in declarations
			.iter()
			.filter(|d| d.is_unique && d.belongs_to(context))
		{
			let name = &declaration.name;
			let add = self.add_method(TemplateKind::ContextAddExtension, declaration, context)?;
			entries.push(format!("public {name}Component {name};{}{add}", new_line(1)));
		}

		if entries.is_empty() {
			return Ok(String::new());
		}

		aggregate(&entries, &new_line(1), "unique components")
	}

	/// Render an add method and wire list fields into change notification.
	fn add_method(
		&self,
		kind: TemplateKind,
		declaration: &ComponentDeclaration,
		context: &str,
	) -> NanogenResult<String> {
		let bindings = add_bindings(declaration, context)?;
		let mut rendered = self.render(kind, &bindings);

		let initializers: String = declaration
			.fields
			.iter()
			.filter(|field| field.is_list())
			.map(|field| {
				let property = property_name(declaration, field);
				let index = field.index;
				format!(
					"\nc.{property}.Initialize(c._InternalOnValueChange, {index});\nif \
					 (c.{property}.Count > 0) {{ c._InternalOnValueChange({index}); }}\n"
				)
			})
			.collect();

		if !initializers.is_empty() {
			let Some(position) = rendered.find(RETURN_MARKER) else {
				return Err(NanogenError::MissingMarker {
					template: kind.to_string(),
					marker: RETURN_MARKER.to_string(),
				});
			};
			rendered.insert_str(position, &initializers);
		}

		Ok(rendered)
	}

	/// The generated header, followed by the component's usings when
	/// documents are grouped per component.
	fn preamble(&self, declaration: &ComponentDeclaration) -> String {
		let mut preamble = self.render(TemplateKind::GeneratedHeader, &Bindings::new());
		if self.grouping == TagKey::Component && !declaration.usings.is_empty() {
			preamble.push('\n');
			preamble.push_str(&declaration.usings);
		}
		preamble
	}

	fn render(&self, kind: TemplateKind, bindings: &Bindings) -> String {
		self.templates.get(kind).render(bindings)
	}
}

/// Contexts in order of first appearance across the declarations.
fn contexts_in_use(declarations: &[ComponentDeclaration]) -> Vec<&str> {
	let mut contexts: Vec<&str> = vec![];
	for context in declarations.iter().flat_map(|d| &d.contexts) {
		if !contexts.contains(&context.as_str()) {
			contexts.push(context);
		}
	}
	contexts
}

fn component_bindings(declaration: &ComponentDeclaration, context: &str) -> Bindings {
	Bindings::new()
		.with(Placeholder::ComponentName, &declaration.name)
		.with(Placeholder::Context, context)
}

/// Accessor name used for a field in generated code.
fn property_name(declaration: &ComponentDeclaration, field: &FieldDeclaration) -> String {
	if declaration.is_reactive() {
		variate_first_char(&field.name)
	} else {
		first_char_to_upper(&field.name)
	}
}

fn add_bindings(declaration: &ComponentDeclaration, context: &str) -> NanogenResult<Bindings> {
	let mut bindings = component_bindings(declaration, context);
	if !declaration.has_fields() {
		return Ok(bindings
			.with(Placeholder::ComponentFields, "")
			.with(Placeholder::AddingComponentsSequence, "")
			.with(Placeholder::ClearingActionsSequence, ""));
	}

	let fields = &declaration.fields;
	let parameters = aggregate(
		fields.iter().map(|f| format!("{} {}", f.r#type, f.name)),
		", ",
		"add method parameters",
	)?;
	let assignments = aggregate(
		fields
			.iter()
			.map(|f| format!("c.{} = {};", property_name(declaration, f), f.name)),
		&new_line(2),
		"add method assignments",
	)?;
	let clearing = if declaration.is_reactive() {
		aggregate(
			fields.iter().map(|f| {
				format!(
					"{}.On{}Change = null;",
					declaration.name,
					variate_first_char(&f.name)
				)
			}),
			&new_line(2),
			"clearing actions",
		)?
	} else {
		String::new()
	};

	bindings.insert(Placeholder::ComponentFields, parameters);
	bindings.insert(Placeholder::AddingComponentsSequence, assignments);
	bindings.insert(Placeholder::ClearingActionsSequence, clearing);
	Ok(bindings)
}

fn field_bindings(base: &Bindings, field: &FieldDeclaration) -> Bindings {
	let setter = if field.name == "value" {
		"this.value".to_string()
	} else {
		field.name.clone()
	};

	base.clone()
		.with(Placeholder::FieldPascalCase, variate_first_char(&field.name))
		.with(Placeholder::FieldCamelCase, &field.name)
		.with(Placeholder::FieldCamelCaseSet, setter)
		.with(Placeholder::FieldType, &field.r#type)
		.with(Placeholder::FieldId, field.index.to_string())
}
