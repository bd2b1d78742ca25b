use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use nanogen_cli::Commands;
use nanogen_cli::ListOutputFormat;
use nanogen_cli::NanogenCli;
use nanogen_cli::watch_changes;
use nanogen_cli::watched_dirs;
use nanogen_core::CONFIG_FILE_CANDIDATES;
use nanogen_core::ComponentDeclaration;
use nanogen_core::Generator;
use nanogen_core::NanogenConfig;
use nanogen_core::NanogenError;
use nanogen_core::PrecheckRecord;
use nanogen_core::TemplateKind;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

const SAMPLE_CONFIG: &str = r#"# nanogen configuration

# Context names in order. The first one is used for components without a
# context attribute.
contexts = ["Game"]

# Treat every component as reactive.
# force_reactive = false

# Regenerate whenever a declaration changes while `nanogen generate` runs.
# regenerate_on_change = false

# Write GenerationState.json next to the generated documents.
# serialize_state = false

# runtime_namespace = "NanoEcs"

[components]
# Directory holding the component declarations. When absent, the first
# directory whose name contains "comp" under `source` is used.
# path = "Assets/Source/Components"
source = "."
# extension = "cs"
# exclude = ["Legacy/"]

[output]
path = "Generated"
# extension = "cs"
# grouping = "context"   # context | component | generation_type

# [templates]
# path = "Snippets"
"#;

fn main() {
	let args = NanogenCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_tracing(args.verbose);

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Init { templates }) => run_init(&args, templates.as_deref()),
		Some(Commands::Generate { dry_run, watch }) => run_generate(&args, *dry_run, *watch),
		Some(Commands::Check { diff }) => run_check(&args, *diff),
		Some(Commands::List { format }) => run_list(&args, *format),
		None => {
			eprintln!("No subcommand specified. Run `nanogen --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<NanogenError>() {
			Ok(nanogen_err) => {
				let report: miette::Report = (*nanogen_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `NANOGEN_LOG` takes precedence over `--verbose`.
fn init_tracing(verbose: bool) {
	let default_level = if verbose { "debug" } else { "warn" };
	let filter = tracing_subscriber::EnvFilter::try_from_env("NANOGEN_LOG")
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(color_enabled())
		.with_target(false)
		.try_init();
}

fn resolve_root(args: &NanogenCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn run_init(args: &NanogenCli, templates: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let config_path = root.join("nanogen.toml");

	match NanogenConfig::resolve_path(&root) {
		Some(existing) => println!("Config file already exists: {}", existing.display()),
		None => {
			std::fs::write(&config_path, SAMPLE_CONFIG)?;
			println!("Created {}", config_path.display());
		}
	}

	if let Some(templates) = templates {
		let dir = root.join(templates);
		std::fs::create_dir_all(&dir)?;

		let mut exported = 0;
		for kind in TemplateKind::ALL {
			let path = dir.join(kind.file_name());
			if path.exists() {
				continue;
			}
			std::fs::write(&path, kind.builtin_source())?;
			exported += 1;
		}

		println!("Exported {exported} snippet(s) to {}", dir.display());
		println!("Set `[templates] path` in nanogen.toml to use them.");
	}

	println!();
	println!("Next steps:");
	println!("  1. List your contexts in nanogen.toml");
	println!("  2. Annotate component declarations with a context, e.g. `[Game]`");
	println!("  3. Run `nanogen generate`");

	Ok(())
}

fn run_generate(args: &NanogenCli, dry_run: bool, watch: bool) -> Result<(), Box<dyn std::error::Error>> {
	// Watcher events carry absolute paths.
	let root = resolve_root(args);
	let root = root.canonicalize().unwrap_or(root);
	let mut generator = Generator::from_root(&root)?;

	// Run the initial generation.
	run_generate_once(args, &root, &generator, dry_run)?;

	let watch = watch || generator.settings().regenerate_on_change;
	if !watch || dry_run {
		return Ok(());
	}

	// Watch mode
	println!("\nWatching for declaration changes... (press Ctrl+C to stop)");

	let output_dir = generator.settings().output_dir.clone();
	let (tx, rx) = mpsc::channel();

	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				if matches!(
					event.kind,
					notify::EventKind::Modify(_)
						| notify::EventKind::Create(_)
						| notify::EventKind::Remove(_)
				) && !event.paths.iter().all(|p| p.starts_with(&output_dir))
				{
					let _ = tx.send(event.paths);
				}
			}
		})?;

	use notify::Watcher;
	// The root itself only for the config file.
	watcher.watch(&root, notify::RecursiveMode::NonRecursive)?;
	let mut watched = watched_dirs(generator.settings());
	for dir in &watched {
		watcher.watch(dir, notify::RecursiveMode::Recursive)?;
	}

	loop {
		let mut changed = rx.recv()?;
		// Debounce: drain additional events within 200ms.
		while let Ok(paths) = rx.recv_timeout(Duration::from_millis(200)) {
			changed.extend(paths);
		}

		if changed.iter().any(|path| is_config_file(path)) {
			println!("\nConfig change detected, reloading...");
			match Generator::from_root(&root) {
				Ok(reloaded) => {
					generator = reloaded;
					let next = watched_dirs(generator.settings());
					let (removed, added) = watch_changes(&watched, &next);
					for dir in &removed {
						if let Err(e) = watcher.unwatch(dir) {
							tracing::debug!(dir = %dir.display(), %e, "failed to unwatch directory");
						}
					}
					for dir in &added {
						watcher.watch(dir, notify::RecursiveMode::Recursive)?;
					}
					watched = next;
				}
				Err(e) => {
					eprintln!("{} {e}", colored!("error:", red));
					continue;
				}
			}
		} else {
			println!("\nDeclaration change detected, regenerating...");
		}

		if let Err(e) = run_generate_once(args, &root, &generator, false) {
			eprintln!("{} {e}", colored!("error:", red));
		}
	}
}

fn is_config_file(path: &Path) -> bool {
	CONFIG_FILE_CANDIDATES
		.iter()
		.any(|candidate| path.ends_with(candidate))
}

fn run_generate_once(
	args: &NanogenCli,
	root: &Path,
	generator: &Generator,
	dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	if dry_run {
		let plan = generator.plan().inspect_err(print_failed_prechecks)?;
		print_prechecks(&plan.prechecks, args.verbose);

		let writer = generator.writer();
		println!(
			"Dry run: would write {} document(s) for {} component(s):",
			plan.documents.len(),
			plan.component_count()
		);
		for document in &plan.documents {
			let rel = make_relative(&writer.document_path(document), root);
			println!("  {rel}");
		}

		return Ok(());
	}

	let report = generator.generate().inspect_err(print_failed_prechecks)?;
	print_prechecks(&report.prechecks, args.verbose);
	println!("{}", colored!(report.summary(), green));

	if args.verbose {
		for path in &report.documents {
			println!("  {}", make_relative(path, root));
		}
	}

	Ok(())
}

fn print_failed_prechecks(error: &NanogenError) {
	if let NanogenError::PrecheckFailed { records, .. } = error {
		print_prechecks(records, true);
	}
}

/// Passing records are only shown in verbose mode, failures always.
fn print_prechecks(records: &[PrecheckRecord], verbose: bool) {
	for record in records {
		if record.passed {
			if verbose {
				println!("{}", colored!(record.message, green));
			}
		} else {
			println!("{}", colored!(record.message, red));
		}
	}
}

fn run_check(args: &NanogenCli, show_diff: bool) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let generator = Generator::from_root(&root)?;
	let result = generator.check().inspect_err(print_failed_prechecks)?;

	if result.is_ok() {
		println!("Generated output is up to date.");
		return Ok(());
	}

	for path in &result.missing {
		eprintln!("{} {}", colored!("missing:", red), make_relative(path, &root));
	}

	for stale in &result.stale {
		eprintln!("{} {}", colored!("stale:", red), make_relative(&stale.path, &root));
		if show_diff {
			print_diff(&stale.current, &stale.expected);
		}
	}

	for path in &result.extra {
		eprintln!("{} {}", colored!("extra:", yellow), make_relative(path, &root));
	}

	let count = result.missing.len() + result.stale.len() + result.extra.len();
	eprintln!(
		"\n{count} file(s) out of date. Run `{}` to update them.",
		colored!("nanogen generate", bold)
	);
	process::exit(1);
}

fn run_list(args: &NanogenCli, format: ListOutputFormat) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let generator = Generator::from_root(&root)?;
	let plan = generator.plan().inspect_err(print_failed_prechecks)?;
	let declarations = &plan.state.declarations;

	if format == ListOutputFormat::Json {
		println!("{}", serde_json::to_string_pretty(declarations)?);
		return Ok(());
	}

	if declarations.is_empty() {
		println!("No components found.");
		return Ok(());
	}

	println!("{}", colored!("Components:", bold));
	for declaration in declarations {
		println!("  {}", describe(declaration));
		for field in &declaration.fields {
			println!("    {} {}", field.r#type, field.name);
		}
	}

	println!(
		"\n{} component(s) in {} context(s)",
		plan.component_count(),
		plan.state.contexts.len()
	);

	Ok(())
}

/// `Name [Context, ...] (flags)`
fn describe(declaration: &ComponentDeclaration) -> String {
	let mut flags = vec![];
	if declaration.is_unique {
		flags.push("unique");
	}
	if declaration.is_reactive() {
		flags.push("reactive");
	}
	if declaration.synthesized {
		flags.push("placeholder");
	}

	let mut line = format!("{} [{}]", declaration.name, declaration.contexts.join(", "));
	if !flags.is_empty() {
		line.push_str(&format!(" ({})", flags.join(", ")));
	}
	line
}

/// Print a unified diff between two strings, colorized.
fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
	eprintln!();
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
