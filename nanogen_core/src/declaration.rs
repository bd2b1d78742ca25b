use serde::Deserialize;
use serde::Serialize;

/// Name given to placeholder declarations created for contexts without any
/// real component.
pub const NONE_COMPONENT: &str = "None";
/// Attribute marking a component as attached to its context.
pub const UNIQUE_ATTRIBUTE: &str = "Unique";
/// Attribute marking a component as reactive.
pub const REACTIVE_ATTRIBUTE: &str = "Reactive";

/// A structured description of one annotated component type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDeclaration {
	/// The declared type name, e.g. `Health`.
	pub name: String,
	/// Attribute tokens in declaration order with `Unique` removed.
	pub attributes: Vec<String>,
	/// The known contexts this component belongs to. Never empty after
	/// parsing.
	pub contexts: Vec<String>,
	/// Fields in declaration order.
	pub fields: Vec<FieldDeclaration>,
	/// `true` when the `Unique` attribute was present.
	pub is_unique: bool,
	/// `true` when reactivity is forced for every component by the settings.
	pub force_reactive: bool,
	/// Verbatim `using` directives found in the declaration file.
	pub usings: String,
	/// `true` for placeholder declarations created by the resolver.
	#[serde(default)]
	pub synthesized: bool,
}

impl ComponentDeclaration {
	/// A placeholder declaration scoped to `context`.
	pub fn none(context: &str) -> Self {
		Self {
			name: NONE_COMPONENT.to_string(),
			attributes: vec![context.to_string()],
			contexts: vec![context.to_string()],
			fields: vec![],
			is_unique: false,
			force_reactive: false,
			usings: String::new(),
			synthesized: true,
		}
	}

	pub fn is_reactive(&self) -> bool {
		self.force_reactive || self.attributes.iter().any(|a| a == REACTIVE_ATTRIBUTE)
	}

	pub fn has_fields(&self) -> bool {
		!self.fields.is_empty()
	}

	pub fn belongs_to(&self, context: &str) -> bool {
		self.contexts.iter().any(|c| c == context)
	}
}

/// One field of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDeclaration {
	pub name: String,
	/// The declared type, rendered canonically, e.g. `Dictionary<int, string>`.
	pub r#type: String,
	/// Zero-based declaration position.
	pub index: usize,
}

impl FieldDeclaration {
	pub fn new(name: impl Into<String>, r#type: impl Into<String>, index: usize) -> Self {
		Self {
			name: name.into(),
			r#type: r#type.into(),
			index,
		}
	}

	/// `true` once normalization has wrapped a list type.
	pub fn is_list(&self) -> bool {
		self.r#type.starts_with("NanoList<")
	}
}
