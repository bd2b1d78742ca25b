use std::path::Path;
use std::path::PathBuf;

use crate::ComponentDeclaration;
use crate::FieldDeclaration;
use crate::GenerationSettings;
use crate::TagKey;

pub const HEALTH_SOURCE: &str = r"using UnityEngine;

[Game]
public class Health
{
    public int value;
}
";

pub const POSITION_SOURCE: &str = r"using UnityEngine;
using System.Collections.Generic;

namespace Demo.Components
{
    [Game, Input, Reactive]
    public struct Position
    {
        public float x, y;
        public List<Vector3> path = new List<Vector3>();

        public float Length() { return x + y; }
        public int Count { get; set; } = 0;
    }
}
";

pub const PLAYER_SOURCE: &str = r"[Game, Unique]
public class Player
{
}
";

pub fn contexts(names: &[&str]) -> Vec<String> {
	names.iter().map(ToString::to_string).collect()
}

pub fn game_contexts() -> Vec<String> {
	contexts(&["Game", "Input"])
}

/// `Health` with a single `int value` field in the `Game` context.
pub fn health_declaration() -> ComponentDeclaration {
	ComponentDeclaration {
		name: "Health".to_string(),
		attributes: vec!["Game".to_string()],
		contexts: vec!["Game".to_string()],
		fields: vec![FieldDeclaration::new("value", "int", 0)],
		is_unique: false,
		force_reactive: false,
		usings: "using UnityEngine;".to_string(),
		synthesized: false,
	}
}

pub fn reactive_declaration(fields: &[(&str, &str)]) -> ComponentDeclaration {
	ComponentDeclaration {
		name: "Speed".to_string(),
		attributes: vec!["Game".to_string(), "Reactive".to_string()],
		contexts: vec!["Game".to_string()],
		fields: fields
			.iter()
			.enumerate()
			.map(|(index, (name, r#type))| FieldDeclaration::new(*name, *r#type, index))
			.collect(),
		is_unique: false,
		force_reactive: false,
		usings: String::new(),
		synthesized: false,
	}
}

/// Settings for a project at `root` with declarations in `root/Components`.
pub fn settings_for(root: &Path) -> GenerationSettings {
	GenerationSettings {
		contexts: game_contexts(),
		components_dir: Some(root.join("Components")),
		component_extension: "cs".to_string(),
		exclude_patterns: vec![],
		output_dir: root.join("Generated"),
		output_extension: "cs".to_string(),
		templates_dir: None,
		grouping: TagKey::Context,
		force_reactive: false,
		regenerate_on_change: false,
		serialize_state: false,
		runtime_namespace: "NanoEcs".to_string(),
	}
}

/// Write declaration files into `root/Components` and return their paths.
pub fn write_components(root: &Path, files: &[(&str, &str)]) -> Vec<PathBuf> {
	let dir = root.join("Components");
	std::fs::create_dir_all(&dir).unwrap_or_else(|e| panic!("create components dir: {e}"));

	files
		.iter()
		.map(|(name, source)| {
			let path = dir.join(name);
			std::fs::write(&path, source).unwrap_or_else(|e| panic!("write {name}: {e}"));
			path
		})
		.collect()
}
