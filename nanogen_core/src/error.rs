use miette::Diagnostic;
use thiserror::Error;

use crate::PrecheckRecord;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum NanogenError {
	#[error(transparent)]
	#[diagnostic(code(nanogen::io_error))]
	Io(#[from] std::io::Error),

	#[error("no contexts configured")]
	#[diagnostic(
		code(nanogen::missing_contexts),
		help("add at least one name to `contexts` in nanogen.toml, e.g. `contexts = [\"Game\"]`")
	)]
	MissingContexts,

	#[error("components directory not found: `{0}`")]
	#[diagnostic(
		code(nanogen::missing_components_dir),
		help(
			"set `[components] path` in nanogen.toml, or set `[components] source` to a directory \
			 containing a folder whose name includes `comp`"
		)
	)]
	MissingComponentsDir(String),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(nanogen::config_parse),
		help("check that nanogen.toml is valid TOML with a top-level `contexts` list")
	)]
	ConfigParse(String),

	#[error("malformed component declaration at line {line}: {reason}")]
	#[diagnostic(code(nanogen::malformed_declaration))]
	MalformedDeclaration { line: usize, reason: String },

	#[error("{failed} of {total} component declaration(s) failed precheck")]
	#[diagnostic(
		code(nanogen::precheck_failed),
		help("fix the reported declarations and run generation again; no files were changed")
	)]
	PrecheckFailed {
		failed: usize,
		total: usize,
		records: Vec<PrecheckRecord>,
	},

	#[error("expected `{{` at offset {offset}")]
	#[diagnostic(code(nanogen::not_an_opening_brace))]
	NotAnOpeningBrace { offset: usize },

	#[error("no matching `}}` for the brace at offset {offset}")]
	#[diagnostic(code(nanogen::unmatched_brace))]
	UnmatchedBrace { offset: usize },

	#[error("output file is locked by another process: `{path}`")]
	#[diagnostic(
		code(nanogen::locked_output),
		help("close the program holding the file and run generation again; no files were changed")
	)]
	LockedOutput { path: String },

	#[error("cannot join an empty sequence of {0}")]
	#[diagnostic(code(nanogen::empty_aggregate))]
	EmptyAggregate(String),

	#[error("invalid template `{template}`: {reason}")]
	#[diagnostic(code(nanogen::template_parse))]
	TemplateParse { template: String, reason: String },

	#[error("template `{template}` has no `{marker}` marker")]
	#[diagnostic(
		code(nanogen::missing_marker),
		help("list field initialization is inserted before this marker; add it to the snippet")
	)]
	MissingMarker { template: String, marker: String },

	#[error("failed to serialize generation state: {0}")]
	#[diagnostic(code(nanogen::snapshot))]
	Snapshot(String),

	#[error("symlink cycle detected at `{path}`")]
	#[diagnostic(
		code(nanogen::symlink_cycle),
		help("remove the circular symlink or exclude this path")
	)]
	SymlinkCycle { path: String },

	#[error("a generation run is already in progress")]
	#[diagnostic(
		code(nanogen::run_in_progress),
		help("the request was queued and will run once the current generation finishes")
	)]
	RunInProgress,
}

impl NanogenError {
	/// Returns `true` for the configuration errors that abort a run before any
	/// file is read.
	pub fn is_configuration_missing(&self) -> bool {
		matches!(self, Self::MissingContexts | Self::MissingComponentsDir(_))
	}
}

pub type NanogenResult<T> = Result<T, NanogenError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
