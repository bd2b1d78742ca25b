#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub const HEALTH: &str = "using UnityEngine;\n\n[Game]\npublic class Health\n{\n    public int value;\n}\n";

pub const POSITION: &str =
	"[Game, Input, Reactive]\npublic struct Position\n{\n    public float x, y;\n}\n";

pub const CONFIG: &str = "contexts = [\"Game\", \"Input\"]\n\n[components]\nsource = \"Assets\"\n\n[output]\npath = \"Generated\"\n";

pub fn nanogen_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("nanogen"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("NANOGEN_LOG");
	cmd
}

/// A project with `Assets/Components/{Health,Position}.cs`.
pub fn write_project(root: &Path) -> std::io::Result<()> {
	let components = root.join("Assets").join("Components");
	std::fs::create_dir_all(&components)?;
	std::fs::write(root.join("nanogen.toml"), CONFIG)?;
	std::fs::write(components.join("Health.cs"), HEALTH)?;
	std::fs::write(components.join("Position.cs"), POSITION)?;
	Ok(())
}
