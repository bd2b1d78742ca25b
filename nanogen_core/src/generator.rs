use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::Instant;

use crate::Bindings;
use crate::Expander;
use crate::GenerationSettings;
use crate::GenerationState;
use crate::NanogenConfig;
use crate::NanogenError;
use crate::NanogenResult;
use crate::OutputDocument;
use crate::OutputWriter;
use crate::PrecheckRecord;
use crate::STATE_FILE_NAME;
use crate::SingleFlight;
use crate::TemplateKind;
use crate::TemplateSet;
use crate::aggregate_documents;
use crate::normalize_field_types;
use crate::output::list_files;
use crate::precheck_declaration;
use crate::project::collect_component_files;
use crate::resolve;

/// Everything a run would write, computed without touching the output
/// directory.
#[derive(Debug, Clone)]
pub struct GenerationPlan {
	pub state: GenerationState,
	pub documents: Vec<OutputDocument>,
	pub prechecks: Vec<PrecheckRecord>,
}

impl GenerationPlan {
	/// Number of declarations read from files, excluding placeholders.
	pub fn component_count(&self) -> usize {
		self.state
			.declarations
			.iter()
			.filter(|d| !d.synthesized)
			.count()
	}
}

/// The outcome of a completed generation.
#[derive(Debug, Clone)]
pub struct GenerationReport {
	pub components: usize,
	/// Paths written, including the state snapshot when enabled.
	pub documents: Vec<PathBuf>,
	pub prechecks: Vec<PrecheckRecord>,
	pub elapsed: Duration,
	/// Number of passes, more than one when requests arrived mid-run.
	pub passes: usize,
}

impl GenerationReport {
	/// Each component contributes four kinds of extensions.
	pub fn extensions(&self) -> usize {
		self.components * 4
	}

	pub fn summary(&self) -> String {
		format!(
			"{} extensions (from {} components) generated in {} ms",
			self.extensions(),
			self.components,
			self.elapsed.as_millis()
		)
	}
}

/// A generated document whose file content differs from the plan.
#[derive(Debug, Clone)]
pub struct StaleDocument {
	pub path: PathBuf,
	pub current: String,
	pub expected: String,
}

/// Result of comparing the output directory against a fresh plan.
#[derive(Debug, Clone, Default)]
pub struct CheckResult {
	pub missing: Vec<PathBuf>,
	pub stale: Vec<StaleDocument>,
	/// Files in the output directory that generation would delete.
	pub extra: Vec<PathBuf>,
}

impl CheckResult {
	pub fn is_ok(&self) -> bool {
		self.missing.is_empty() && self.stale.is_empty() && self.extra.is_empty()
	}
}

/// Runs the declaration to document pipeline for one project.
#[derive(Debug)]
pub struct Generator {
	settings: GenerationSettings,
	templates: TemplateSet,
	flight: SingleFlight,
}

impl Generator {
	pub fn new(settings: GenerationSettings, templates: TemplateSet) -> Self {
		Self {
			settings,
			templates,
			flight: SingleFlight::new(),
		}
	}

	/// Load `nanogen.toml` and the snippets it points at. A project without a
	/// config file gets the defaults, which fail validation on the first run
	/// since no contexts are configured.
	pub fn from_root(root: &Path) -> NanogenResult<Self> {
		let config = NanogenConfig::load(root)?.unwrap_or_default();
		let settings = GenerationSettings::from_config(root, &config);
		let templates = match &settings.templates_dir {
			Some(dir) => {
				if !dir.is_dir() {
					tracing::warn!(dir = %dir.display(), "templates directory not found, using built-in snippets");
				}
				TemplateSet::load(dir)?
			}
			None => TemplateSet::builtin()?,
		};

		Ok(Self::new(settings, templates))
	}

	pub fn settings(&self) -> &GenerationSettings {
		&self.settings
	}

	pub fn templates(&self) -> &TemplateSet {
		&self.templates
	}

	pub fn writer(&self) -> OutputWriter {
		OutputWriter::new(&self.settings.output_dir, &self.settings.output_extension)
	}

	/// Validate the settings and read every declaration file, then plan.
	pub fn plan(&self) -> NanogenResult<GenerationPlan> {
		let settings = &self.settings;
		if settings.contexts.is_empty() {
			return Err(NanogenError::MissingContexts);
		}

		let components_dir = match &settings.components_dir {
			Some(dir) if dir.is_dir() => dir,
			Some(dir) => return Err(NanogenError::MissingComponentsDir(dir.display().to_string())),
			None => {
				return Err(NanogenError::MissingComponentsDir(
					"<not configured>".to_string(),
				));
			}
		};

		let files = collect_component_files(
			components_dir,
			&settings.component_extension,
			&settings.exclude_patterns,
		)?;
		if files.is_empty() {
			tracing::warn!(dir = %components_dir.display(), "no component declarations found");
		}

		let mut sources = Vec::with_capacity(files.len());
		for file in files {
			let source = std::fs::read_to_string(&file)?;
			sources.push((file, source));
		}

		self.plan_sources(&sources)
	}

	/// Plan from declaration texts that were already read.
	pub fn plan_sources(&self, sources: &[(PathBuf, String)]) -> NanogenResult<GenerationPlan> {
		let settings = &self.settings;
		if settings.contexts.is_empty() {
			return Err(NanogenError::MissingContexts);
		}

		let mut prechecks = Vec::with_capacity(sources.len());
		let mut declarations = vec![];
		for (file, source) in sources {
			let (record, declaration) =
				precheck_declaration(file, source, &settings.contexts, settings.force_reactive);
			if record.passed {
				tracing::debug!("{}", record.message);
			} else {
				tracing::warn!("{}", record.message);
			}
			prechecks.push(record);
			declarations.extend(declaration);
		}

		let failed = prechecks.iter().filter(|r| !r.passed).count();
		if failed > 0 {
			return Err(NanogenError::PrecheckFailed {
				failed,
				total: prechecks.len(),
				records: prechecks,
			});
		}

		let mut state = GenerationState::new(settings.contexts.clone());
		state.declarations = resolve(declarations, &settings.contexts);
		for declaration in &mut state.declarations {
			normalize_field_types(declaration);
		}
		state.collect_usings(&settings.runtime_namespace);

		let expander = Expander::new(&self.templates, settings.grouping);
		state.fragments = expander.expand_all(&state.declarations, &state.contexts)?;

		let header = self
			.templates
			.get(TemplateKind::GeneratedHeader)
			.render(&Bindings::new());
		let documents = aggregate_documents(
			&state.fragments,
			settings.grouping,
			&header,
			&state.usings_block(),
		);

		Ok(GenerationPlan {
			state,
			documents,
			prechecks,
		})
	}

	/// Plan and write. Only one generation runs at a time: a call made while
	/// another is active returns [`NanogenError::RunInProgress`] and the
	/// active run performs one more pass before returning.
	pub fn generate(&self) -> NanogenResult<GenerationReport> {
		let Some(mut guard) = self.flight.try_begin() else {
			tracing::info!("generation already running, queued a rerun");
			return Err(NanogenError::RunInProgress);
		};

		let mut passes = 0;
		loop {
			passes += 1;
			let result = self.run_once();
			if !guard.finish_pass() {
				return result.map(|report| GenerationReport { passes, ..report });
			}

			if let Err(error) = &result {
				tracing::warn!(%error, "generation failed, running queued request");
			}
		}
	}

	fn run_once(&self) -> NanogenResult<GenerationReport> {
		let started = Instant::now();
		let plan = self.plan()?;
		let state = self.settings.serialize_state.then_some(&plan.state);
		let documents = self.writer().write(&plan.documents, state)?;

		let report = GenerationReport {
			components: plan.component_count(),
			documents,
			prechecks: plan.prechecks,
			elapsed: started.elapsed(),
			passes: 1,
		};

		tracing::info!("{}", report.summary());
		Ok(report)
	}

	/// Compare the output directory with what generation would write.
	pub fn check(&self) -> NanogenResult<CheckResult> {
		let plan = self.plan()?;
		let writer = self.writer();
		let mut result = CheckResult::default();
		let mut expected_paths = vec![];

		for document in &plan.documents {
			let path = writer.document_path(document);
			match std::fs::read_to_string(&path) {
				Ok(current) if current == document.body => {}
				Ok(current) => {
					result.stale.push(StaleDocument {
						path: path.clone(),
						current,
						expected: document.body.clone(),
					});
				}
				Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
					result.missing.push(path.clone());
				}
				Err(error) => return Err(error.into()),
			}
			expected_paths.push(path);
		}

		if self.settings.serialize_state {
			expected_paths.push(writer.dir().join(STATE_FILE_NAME));
		}

		if writer.dir().is_dir() {
			result.extra = list_files(writer.dir())?
				.into_iter()
				.filter(|path| !expected_paths.contains(path))
				.collect();
		}

		Ok(result)
	}
}
