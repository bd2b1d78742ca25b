use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use nanogen_core::GenerationSettings;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Generate entity component system boilerplate from component declarations.",
	long_about = "nanogen reads annotated component declarations and generates the code an \
	              entity component system needs around them: entity accessors, reactive \
	              component classes, groups, collectors, component maps and context \
	              classes.\n\nQuick start:\n  nanogen init      Create a nanogen.toml\n  nanogen \
	              generate  Regenerate the output directory\n  nanogen check     Verify the \
	              output is up to date\n  nanogen list      Show the parsed components"
)]
pub struct NanogenCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Initialize nanogen in a project by creating a sample `nanogen.toml`.
	///
	/// If a config file already exists it is left untouched.
	Init {
		/// Also export the built-in snippets into this directory so they can
		/// be customized. Existing snippet files are never overwritten.
		#[arg(long)]
		templates: Option<PathBuf>,
	},
	/// Parse every component declaration and regenerate the output directory.
	///
	/// All declarations are validated first. When any of them fails, nothing
	/// is written and each failure is reported.
	Generate {
		/// Preview the documents that would be written without touching the
		/// output directory.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// Watch the components directory and the config file and regenerate
		/// on every change. Implied by `regenerate_on_change = true`.
		#[arg(long, default_value_t = false)]
		watch: bool,
	},
	/// Check that the output directory matches what generation would write.
	///
	/// Exits with a non-zero status code when any document is missing, stale
	/// or unexpected.
	Check {
		/// Show a unified diff for each stale document.
		#[arg(long, default_value_t = false)]
		diff: bool,
	},
	/// List the parsed components with their contexts and fields.
	List {
		/// Output format. Use `text` for human-readable output or `json` for
		/// programmatic consumption.
		#[arg(long, value_enum, default_value_t = ListOutputFormat::Text)]
		format: ListOutputFormat,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListOutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}

/// Directories watched recursively in watch mode: the components directory
/// and the templates directory, when they exist.
pub fn watched_dirs(settings: &GenerationSettings) -> Vec<PathBuf> {
	settings
		.components_dir
		.iter()
		.chain(settings.templates_dir.iter())
		.filter(|dir| dir.is_dir())
		.cloned()
		.collect()
}

/// Split a change of watched directories into `(removed, added)`.
pub fn watch_changes(previous: &[PathBuf], next: &[PathBuf]) -> (Vec<PathBuf>, Vec<PathBuf>) {
	let removed = previous
		.iter()
		.filter(|dir| !next.contains(dir))
		.cloned()
		.collect();
	let added = next
		.iter()
		.filter(|dir| !previous.contains(dir))
		.cloned()
		.collect();

	(removed, added)
}
