use std::collections::HashSet;
use std::collections::VecDeque;
use std::path::Path;
use std::path::PathBuf;

use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;

use crate::NanogenError;
use crate::NanogenResult;

/// Collect every declaration file under `root` with the given extension.
///
/// Exclude patterns follow gitignore syntax relative to `root`. Hidden
/// directories are skipped. Paths are sorted so declarations are always read
/// in the same order.
pub fn collect_component_files(
	root: &Path,
	extension: &str,
	exclude_patterns: &[String],
) -> NanogenResult<Vec<PathBuf>> {
	let exclude = build_exclude_matcher(root, exclude_patterns)?;
	let mut files = Vec::new();
	let mut visited_dirs = HashSet::new();

	walk_dir(root, extension, &exclude, &mut files, &mut visited_dirs)?;
	// Sort for deterministic ordering.
	files.sort();

	tracing::debug!(root = %root.display(), files = files.len(), "collected component files");
	Ok(files)
}

/// Find the first directory under `source` whose name contains `comp`,
/// ignoring case. Directories closer to `source` win; siblings are visited in
/// name order.
pub fn discover_components_dir(source: &Path) -> Option<PathBuf> {
	let mut queue = VecDeque::from([source.to_path_buf()]);

	while let Some(dir) = queue.pop_front() {
		let Ok(entries) = std::fs::read_dir(&dir) else {
			continue;
		};

		let mut children: Vec<PathBuf> = entries
			.filter_map(Result::ok)
			.map(|entry| entry.path())
			.filter(|path| path.is_dir())
			.collect();
		children.sort();

		for child in children {
			let Some(name) = child.file_name().and_then(|n| n.to_str()) else {
				continue;
			};
			if is_ignored_directory_name(name) {
				continue;
			}
			if name.to_lowercase().contains("comp") {
				return Some(child);
			}
			queue.push_back(child);
		}
	}

	None
}

/// Build a `Gitignore` matcher from the configured exclude patterns.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> NanogenResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			NanogenError::ConfigParse(format!("invalid exclude pattern `{pattern}`: {e}"))
		})?;
	}
	builder
		.build()
		.map_err(|e| NanogenError::ConfigParse(format!("failed to build exclude rules: {e}")))
}

fn is_ignored_directory_name(name: &str) -> bool {
	name.starts_with('.')
}

fn walk_dir(
	dir: &Path,
	extension: &str,
	exclude: &Gitignore,
	files: &mut Vec<PathBuf>,
	visited_dirs: &mut HashSet<PathBuf>,
) -> NanogenResult<()> {
	if !dir.is_dir() {
		return Ok(());
	}

	let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
	if !visited_dirs.insert(canonical) {
		return Err(NanogenError::SymlinkCycle {
			path: dir.display().to_string(),
		});
	}

	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();
		let is_dir = path.is_dir();

		if is_dir
			&& path
				.file_name()
				.and_then(|n| n.to_str())
				.is_some_and(is_ignored_directory_name)
		{
			continue;
		}

		if exclude.matched(&path, is_dir).is_ignore() {
			continue;
		}

		if is_dir {
			walk_dir(&path, extension, exclude, files, visited_dirs)?;
		} else if has_extension(&path, extension) {
			files.push(path);
		}
	}

	Ok(())
}

fn has_extension(path: &Path, extension: &str) -> bool {
	path.extension()
		.and_then(|e| e.to_str())
		.is_some_and(|e| e.eq_ignore_ascii_case(extension))
}
