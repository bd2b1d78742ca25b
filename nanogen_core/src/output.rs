use std::collections::HashSet;
use std::fs::File;
use std::fs::OpenOptions;
use std::fs::TryLockError;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;

use crate::Fragment;
use crate::GenerationState;
use crate::NanogenError;
use crate::NanogenResult;
use crate::TagKey;

/// Title of the document collecting fragments without a grouping tag.
pub const FALLBACK_TITLE: &str = "Common";
/// File name of the optional run snapshot inside the output directory.
pub const STATE_FILE_NAME: &str = "GenerationState.json";

/// A final generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputDocument {
	pub title: String,
	pub body: String,
}

/// Group fragments into documents by the value of `key`.
///
/// Documents appear in order of their first fragment and keep fragment
/// emission order inside. Each body starts with `usings` and `header`.
pub fn aggregate_documents(
	fragments: &[Fragment],
	key: TagKey,
	header: &str,
	usings: &str,
) -> Vec<OutputDocument> {
	let mut groups: Vec<(String, Vec<&str>)> = vec![];

	for fragment in fragments {
		let title = fragment
			.tags
			.get(key)
			.unwrap_or_else(|| FALLBACK_TITLE.to_string());

		match groups.iter_mut().find(|(existing, _)| *existing == title) {
			Some((_, contents)) => contents.push(&fragment.content),
			None => groups.push((title, vec![&fragment.content])),
		}
	}

	groups
		.into_iter()
		.map(|(title, contents)| {
			let mut body = String::new();
			if !usings.is_empty() {
				body.push_str(usings);
				body.push('\n');
			}
			body.push_str(header);
			body.push('\n');
			body.push_str(&contents.join("\n"));

			OutputDocument { title, body }
		})
		.collect()
}

/// In-memory copy of an output directory taken before it is cleaned.
#[derive(Debug, Default)]
pub struct OutputCache {
	root: PathBuf,
	files: Vec<(PathBuf, Vec<u8>)>,
}

impl OutputCache {
	/// Read every file under `root`. A missing directory gives an empty cache.
	pub fn capture(root: &Path) -> NanogenResult<Self> {
		let mut files = vec![];
		if root.is_dir() {
			for path in list_files(root)? {
				let content = std::fs::read(&path)?;
				files.push((path, content));
			}
		}

		Ok(Self {
			root: root.to_path_buf(),
			files,
		})
	}

	pub fn is_empty(&self) -> bool {
		self.files.is_empty()
	}

	pub fn len(&self) -> usize {
		self.files.len()
	}

	/// Replace whatever is in the directory now with the captured files.
	pub fn restore(&self) -> NanogenResult<()> {
		if self.root.is_dir() {
			clean_dir(&self.root)?;
		}

		for (path, content) in &self.files {
			if let Some(parent) = path.parent() {
				std::fs::create_dir_all(parent)?;
			}
			std::fs::write(path, content)?;
		}

		tracing::info!(files = self.files.len(), root = %self.root.display(), "restored output");
		Ok(())
	}
}

/// Writes documents into the output directory, which it owns for the
/// duration of a run.
#[derive(Debug, Clone)]
pub struct OutputWriter {
	dir: PathBuf,
	extension: String,
}

impl OutputWriter {
	pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
		Self {
			dir: dir.into(),
			extension: extension.into(),
		}
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	pub fn document_path(&self, document: &OutputDocument) -> PathBuf {
		self.dir
			.join(format!("{}.{}", document.title, self.extension))
	}

	/// Replace the contents of the output directory with `documents`.
	///
	/// Nothing is deleted when any existing file is locked. When a step fails
	/// after the directory was cleaned, its previous contents are restored
	/// before the error is returned.
	pub fn write(
		&self,
		documents: &[OutputDocument],
		state: Option<&GenerationState>,
	) -> NanogenResult<Vec<PathBuf>> {
		let snapshot = state
			.map(GenerationState::snapshot)
			.transpose()
			.map_err(|e| NanogenError::Snapshot(e.to_string()))?;

		let cache = OutputCache::capture(&self.dir)?;
		ensure_unlocked(&self.dir)?;
		std::fs::create_dir_all(&self.dir)?;

		match self.replace_contents(documents, snapshot.as_deref()) {
			Ok(paths) => Ok(paths),
			Err(error) => {
				tracing::warn!(%error, "writing output failed, restoring previous files");
				if let Err(restore_error) = cache.restore() {
					tracing::error!(%restore_error, "failed to restore output directory");
				}
				Err(error)
			}
		}
	}

	fn replace_contents(
		&self,
		documents: &[OutputDocument],
		snapshot: Option<&str>,
	) -> NanogenResult<Vec<PathBuf>> {
		clean_dir(&self.dir)?;

		let mut paths = vec![];
		for document in documents {
			let path = self.document_path(document);
			std::fs::write(&path, &document.body)?;
			tracing::debug!(path = %path.display(), "wrote document");
			paths.push(path);
		}

		if let Some(snapshot) = snapshot {
			let path = self.dir.join(STATE_FILE_NAME);
			std::fs::write(&path, snapshot)?;
			paths.push(path);
		}

		Ok(paths)
	}
}

/// Fail with [`NanogenError::LockedOutput`] when any file under `root` is held
/// by another handle.
pub fn ensure_unlocked(root: &Path) -> NanogenResult<()> {
	if !root.is_dir() {
		return Ok(());
	}

	for path in list_files(root)? {
		if is_locked(&path) {
			return Err(NanogenError::LockedOutput {
				path: path.display().to_string(),
			});
		}
	}

	Ok(())
}

/// Probe a file with an exclusive, non-blocking lock.
fn is_locked(path: &Path) -> bool {
	let mut options = OpenOptions::new();
	options.read(true);
	#[cfg(windows)]
	{
		use std::os::windows::fs::OpenOptionsExt;
		options.share_mode(0);
	}

	let file: File = match options.open(path) {
		Ok(file) => file,
		Err(_) => return true,
	};

	match file.try_lock() {
		Ok(()) => false,
		Err(TryLockError::WouldBlock) => true,
		Err(TryLockError::Error(error)) => error.kind() != ErrorKind::Unsupported,
	}
}

/// Delete every file and subdirectory inside `root`, keeping `root` itself.
pub fn clean_dir(root: &Path) -> NanogenResult<()> {
	for entry in std::fs::read_dir(root)? {
		let path = entry?.path();
		if path.is_dir() {
			std::fs::remove_dir_all(&path)?;
		} else {
			std::fs::remove_file(&path)?;
		}
	}

	Ok(())
}

/// Every file under `root`, sorted. A directory reached twice through
/// symlinks is a [`NanogenError::SymlinkCycle`].
pub(crate) fn list_files(root: &Path) -> NanogenResult<Vec<PathBuf>> {
	let mut files = vec![];
	let mut pending = vec![root.to_path_buf()];
	let mut visited_dirs = HashSet::new();

	while let Some(dir) = pending.pop() {
		let canonical = dir.canonicalize().unwrap_or_else(|_| dir.clone());
		if !visited_dirs.insert(canonical) {
			return Err(NanogenError::SymlinkCycle {
				path: dir.display().to_string(),
			});
		}

		for entry in std::fs::read_dir(&dir)? {
			let path = entry?.path();
			if path.is_dir() {
				pending.push(path);
			} else {
				files.push(path);
			}
		}
	}

	files.sort();
	Ok(files)
}
