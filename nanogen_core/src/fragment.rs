use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

/// The tag dimensions a fragment can carry. Exactly one of them groups
/// fragments into documents during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKey {
	#[default]
	Context,
	Component,
	GenerationType,
}

/// The category of generated code a fragment holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenerationType {
	Reactive,
	AddRemove,
	Group,
	GroupBuilder,
	Collector,
	Contexts,
	Attribute,
	Entity,
	ComponentMap,
}

impl Display for GenerationType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::Reactive => "Reactive",
			Self::AddRemove => "AddRemove",
			Self::Group => "Group",
			Self::GroupBuilder => "GroupBuilder",
			Self::Collector => "Collector",
			Self::Contexts => "Contexts",
			Self::Attribute => "Attribute",
			Self::Entity => "Entity",
			Self::ComponentMap => "ComponentMap",
		};

		write!(f, "{name}")
	}
}

/// At most one value per [`TagKey`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
	pub context: Option<String>,
	pub component: Option<String>,
	pub generation_type: Option<GenerationType>,
}

impl Tags {
	pub fn new(generation_type: GenerationType) -> Self {
		Self {
			generation_type: Some(generation_type),
			..Self::default()
		}
	}

	#[must_use]
	pub fn context(mut self, context: impl Into<String>) -> Self {
		self.context = Some(context.into());
		self
	}

	#[must_use]
	pub fn component(mut self, component: impl Into<String>) -> Self {
		self.component = Some(component.into());
		self
	}

	/// The value stored under `key`, rendered as text.
	pub fn get(&self, key: TagKey) -> Option<String> {
		match key {
			TagKey::Context => self.context.clone(),
			TagKey::Component => self.component.clone(),
			TagKey::GenerationType => self.generation_type.map(|t| t.to_string()),
		}
	}
}

/// One tagged unit of generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
	pub content: String,
	pub tags: Tags,
}

impl Fragment {
	pub fn new(content: impl Into<String>, tags: Tags) -> Self {
		Self {
			content: content.into(),
			tags,
		}
	}
}
