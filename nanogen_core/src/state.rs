use serde::Deserialize;
use serde::Serialize;

use crate::ComponentDeclaration;
use crate::Fragment;

/// Everything one generation run knows. Created fresh for each run and
/// threaded through the pipeline explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationState {
	/// Contexts in configured order.
	pub contexts: Vec<String>,
	/// `using` lines shared by every document, deduplicated in order of first
	/// appearance.
	pub usings: Vec<String>,
	/// Parsed and resolved declarations in file enumeration order.
	pub declarations: Vec<ComponentDeclaration>,
	/// Expanded fragments. Not part of the snapshot.
	#[serde(skip)]
	pub fragments: Vec<Fragment>,
}

impl GenerationState {
	pub fn new(contexts: Vec<String>) -> Self {
		Self {
			contexts,
			..Self::default()
		}
	}

	/// Gather the runtime namespace import and every declaration's `using`
	/// lines.
	pub fn collect_usings(&mut self, runtime_namespace: &str) {
		let mut usings = vec![format!("using {runtime_namespace};")];

		for declaration in &self.declarations {
			for line in declaration.usings.lines() {
				let line = line.trim();
				if !line.is_empty() && !usings.iter().any(|u| u == line) {
					usings.push(line.to_string());
				}
			}
		}

		self.usings = usings;
	}

	/// The usings block placed at the top of every document.
	pub fn usings_block(&self) -> String {
		self.usings.join("\n")
	}

	/// Pretty JSON of the run without its fragments.
	pub fn snapshot(&self) -> serde_json::Result<String> {
		serde_json::to_string_pretty(self)
	}
}
