use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use tracing::debug;
use tracing::warn;

use crate::DocgenConfig;
use crate::DocgenError;
use crate::DocgenResult;
use crate::config::DEFAULT_INCLUDE_PATTERN;

/// Options controlling which files are discovered below a root.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
	/// Glob patterns of files to include, relative to the root.
	pub include: Vec<String>,
	/// Gitignore-style patterns of files and directories to skip.
	pub exclude: Vec<String>,
	/// When true, `.gitignore` files are not used for filtering.
	pub disable_gitignore: bool,
}

impl Default for DiscoveryOptions {
	fn default() -> Self {
		Self {
			include: vec![DEFAULT_INCLUDE_PATTERN.to_string()],
			exclude: Vec::new(),
			disable_gitignore: false,
		}
	}
}

impl DiscoveryOptions {
	pub fn from_config(config: &DocgenConfig) -> Self {
		Self {
			include: config.files.clone(),
			exclude: config.exclude.patterns.clone(),
			disable_gitignore: config.disable_gitignore,
		}
	}
}

/// Collect the files below `root` matching the include globs.
///
/// Hidden directories, `node_modules` and `target` are never entered. Files
/// matched by the root `.gitignore` (unless disabled) or by the exclude
/// patterns are skipped. The returned paths are absolute, sorted and free
/// of duplicates.
pub fn collect_files(root: &Path, options: &DiscoveryOptions) -> DocgenResult<Vec<PathBuf>> {
	let root = root.canonicalize()?;
	let walker = Walker::new(&root, options)?;

	let mut files = Vec::new();
	let mut visited_dirs = HashSet::new();
	walker.walk_dir(&root, &mut files, &mut visited_dirs)?;

	files.sort();
	files.dedup();
	debug!(root = %root.display(), count = files.len(), "collected files");

	Ok(files)
}

struct Walker<'a> {
	root: &'a Path,
	include: GlobSet,
	/// The root `.gitignore` followed by the configured exclude patterns, so
	/// an exclude line can also re-include with `!`.
	ignored: Gitignore,
}

impl<'a> Walker<'a> {
	fn new(root: &'a Path, options: &DiscoveryOptions) -> DocgenResult<Self> {
		let mut include = GlobSetBuilder::new();
		for pattern in &options.include {
			include.add(Glob::new(pattern).map_err(|e| invalid_pattern(pattern, &e))?);
		}
		let include = include
			.build()
			.map_err(|e| invalid_pattern(&options.include.join(", "), &e))?;

		let mut ignored = GitignoreBuilder::new(root);
		let gitignore_path = root.join(".gitignore");
		if !options.disable_gitignore && gitignore_path.is_file() {
			if let Some(error) = ignored.add(&gitignore_path) {
				warn!(path = %gitignore_path.display(), %error, "skipping unreadable .gitignore lines");
			}
		}
		for pattern in &options.exclude {
			ignored
				.add_line(None, pattern)
				.map_err(|e| invalid_pattern(pattern, &e))?;
		}
		let ignored = ignored
			.build()
			.map_err(|e| invalid_pattern(&options.exclude.join(", "), &e))?;

		Ok(Self {
			root,
			include,
			ignored,
		})
	}

	fn walk_dir(
		&self,
		dir: &Path,
		files: &mut Vec<PathBuf>,
		visited_dirs: &mut HashSet<PathBuf>,
	) -> DocgenResult<()> {
		// Detect symlink cycles by tracking canonical paths.
		let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
		if !visited_dirs.insert(canonical) {
			return Err(DocgenError::SymlinkCycle {
				path: dir.display().to_string(),
			});
		}

		let mut entries = std::fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
		entries.sort_by_key(std::fs::DirEntry::file_name);

		for entry in entries {
			let path = entry.path();
			let is_dir = path.is_dir();

			if is_dir
				&& path
					.file_name()
					.and_then(|name| name.to_str())
					.is_some_and(is_ignored_directory_name)
			{
				continue;
			}

			if self.ignored.matched(&path, is_dir).is_ignore() {
				continue;
			}

			if is_dir {
				self.walk_dir(&path, files, visited_dirs)?;
			} else if path
				.strip_prefix(self.root)
				.is_ok_and(|relative| self.include.is_match(relative))
			{
				files.push(path);
			}
		}

		Ok(())
	}
}

fn invalid_pattern(pattern: &str, error: &impl std::fmt::Display) -> DocgenError {
	DocgenError::InvalidPattern {
		pattern: pattern.to_string(),
		reason: error.to_string(),
	}
}

fn is_ignored_directory_name(name: &str) -> bool {
	name.starts_with('.') || name == "node_modules" || name == "target"
}
