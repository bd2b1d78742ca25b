use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::NanogenError;
use crate::NanogenResult;
use crate::TagKey;
use crate::project::discover_components_dir;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["nanogen.toml", ".nanogen.toml", ".config/nanogen.toml"];

/// Namespace imported by every generated document unless configured
/// otherwise.
pub const DEFAULT_RUNTIME_NAMESPACE: &str = "NanoEcs";

/// Configuration loaded from a `nanogen.toml` file.
///
/// ```toml
/// contexts = ["Game", "Input"]
/// force_reactive = false
/// regenerate_on_change = true
/// serialize_state = false
///
/// [components]
/// source = "Assets/Source"
/// exclude = ["Legacy/"]
///
/// [output]
/// path = "Assets/Generated"
/// grouping = "context"
///
/// [templates]
/// path = "Generator/Snippets"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NanogenConfig {
	/// Context names in order. The first one is the default context.
	#[serde(default)]
	pub contexts: Vec<String>,
	/// Treat every component as reactive.
	#[serde(default)]
	pub force_reactive: bool,
	/// Regenerate whenever a component declaration changes.
	#[serde(default)]
	pub regenerate_on_change: bool,
	/// Write `GenerationState.json` next to the generated documents.
	#[serde(default)]
	pub serialize_state: bool,
	/// Namespace imported at the top of every document.
	#[serde(default)]
	pub runtime_namespace: Option<String>,
	#[serde(default)]
	pub components: ComponentsConfig,
	#[serde(default)]
	pub output: OutputConfig,
	#[serde(default)]
	pub templates: TemplatesConfig,
}

/// Where component declarations are read from.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentsConfig {
	/// Directory holding the declarations, relative to the project root.
	#[serde(default)]
	pub path: Option<PathBuf>,
	/// Searched for a directory whose name contains `comp` when `path` is not
	/// set.
	#[serde(default)]
	pub source: Option<PathBuf>,
	/// Declaration file extension. Defaults to `cs`.
	#[serde(default)]
	pub extension: Option<String>,
	/// Gitignore-style patterns, relative to the components directory.
	#[serde(default)]
	pub exclude: Vec<String>,
}

/// Where and how generated documents are written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
	/// Output directory, relative to the project root. Defaults to
	/// `Generated`.
	#[serde(default)]
	pub path: Option<PathBuf>,
	/// Generated file extension. Defaults to `cs`.
	#[serde(default)]
	pub extension: Option<String>,
	/// The tag that groups fragments into documents.
	#[serde(default)]
	pub grouping: TagKey,
}

/// Snippet overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplatesConfig {
	/// Directory holding snippet files. Missing snippets use the built-in
	/// ones.
	#[serde(default)]
	pub path: Option<PathBuf>,
}

impl NanogenConfig {
	/// Return the first existing config file path at `root`, using the
	/// supported lookup order.
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if the file does not exist.
	pub fn load(root: &Path) -> NanogenResult<Option<NanogenConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config: NanogenConfig =
			toml::from_str(&content).map_err(|e| NanogenError::ConfigParse(e.to_string()))?;

		Ok(Some(config))
	}
}

/// The plain settings record consumed by the generator. All paths are
/// absolute or relative to the working directory.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
	pub contexts: Vec<String>,
	/// `None` when neither configured nor discoverable.
	pub components_dir: Option<PathBuf>,
	pub component_extension: String,
	pub exclude_patterns: Vec<String>,
	pub output_dir: PathBuf,
	pub output_extension: String,
	pub templates_dir: Option<PathBuf>,
	pub grouping: TagKey,
	pub force_reactive: bool,
	pub regenerate_on_change: bool,
	pub serialize_state: bool,
	pub runtime_namespace: String,
}

impl GenerationSettings {
	/// Resolve every configured path against `root`.
	pub fn from_config(root: &Path, config: &NanogenConfig) -> Self {
		let components_dir = match (&config.components.path, &config.components.source) {
			(Some(path), _) => Some(root.join(path)),
			(None, Some(source)) => discover_components_dir(&root.join(source)),
			(None, None) => None,
		};

		Self {
			contexts: config.contexts.clone(),
			components_dir,
			component_extension: config
				.components
				.extension
				.clone()
				.unwrap_or_else(|| "cs".to_string()),
			exclude_patterns: config.components.exclude.clone(),
			output_dir: root.join(
				config
					.output
					.path
					.clone()
					.unwrap_or_else(|| PathBuf::from("Generated")),
			),
			output_extension: config
				.output
				.extension
				.clone()
				.unwrap_or_else(|| "cs".to_string()),
			templates_dir: config.templates.path.as_ref().map(|p| root.join(p)),
			grouping: config.output.grouping,
			force_reactive: config.force_reactive,
			regenerate_on_change: config.regenerate_on_change,
			serialize_state: config.serialize_state,
			runtime_namespace: config
				.runtime_namespace
				.clone()
				.unwrap_or_else(|| DEFAULT_RUNTIME_NAMESPACE.to_string()),
		}
	}
}
