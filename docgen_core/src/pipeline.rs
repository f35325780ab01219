use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::hash_map::Entry;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::Block;
use crate::BlockScanner;
use crate::DocgenConfig;
use crate::DocgenError;
use crate::DocgenResult;
use crate::ExecutorInput;
use crate::FileItem;
use crate::Middleware;
use crate::MissingTransform;
use crate::TagSyntax;
use crate::TransformExecutor;
use crate::TransformRegistry;
use crate::build_graph;
use crate::execution_order;

/// A file read from disk, ready to be scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
	pub path: PathBuf,
	pub contents: String,
}

/// Read `paths`, rejecting files larger than `max_file_size` bytes.
pub fn load_sources(paths: &[PathBuf], max_file_size: u64) -> DocgenResult<Vec<SourceFile>> {
	paths
		.iter()
		.map(|path| {
			let size = std::fs::metadata(path)?.len();
			if size > max_file_size {
				return Err(DocgenError::FileTooLarge {
					path: path.display().to_string(),
					size,
					limit: max_file_size,
				});
			}

			Ok(SourceFile {
				path: path.clone(),
				contents: std::fs::read_to_string(path)?,
			})
		})
		.collect()
}

/// The outcome of processing one file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
	pub path: PathBuf,
	pub output_path: PathBuf,
	#[serde(skip)]
	pub original_contents: String,
	#[serde(skip)]
	pub updated_contents: String,
	/// The scanned blocks, with `context.is_missing` set for blocks whose
	/// transform is not registered.
	pub blocks: Vec<Block>,
	pub dependencies: Vec<PathBuf>,
	pub transforms_run: Vec<String>,
	pub is_changed: bool,
}

/// How far a run got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
	/// No blocks were found in any file.
	NothingToDo,
	/// Every block was rendered.
	Complete,
	/// Some files failed to parse or some transforms are missing.
	Partial,
}

/// Everything a pipeline run produced. Nothing is written to disk until
/// [`write_updates`] is called.
#[derive(Debug, Default)]
pub struct PipelineResult {
	/// Processed files in execution order.
	pub files: Vec<FileResult>,
	/// Files that were skipped because they failed to parse.
	pub errors: Vec<DocgenError>,
	pub missing_transforms: Vec<MissingTransform>,
	/// The execution order, dependencies first.
	pub order: Vec<PathBuf>,
}

impl PipelineResult {
	pub fn status(&self) -> RunStatus {
		if !self.errors.is_empty() || !self.missing_transforms.is_empty() {
			RunStatus::Partial
		} else if self.files.is_empty() {
			RunStatus::NothingToDo
		} else {
			RunStatus::Complete
		}
	}

	pub fn changed_files(&self) -> impl Iterator<Item = &FileResult> {
		self.files.iter().filter(|file| file.is_changed)
	}
}

/// The files found by [`Pipeline::scan`].
#[derive(Debug, Default)]
pub struct ScanOutcome {
	pub items: Vec<FileItem>,
	/// Files that were skipped because they failed to parse.
	pub errors: Vec<DocgenError>,
}

/// Sequences scanning, dependency ordering and transform execution for a
/// set of files.
pub struct Pipeline {
	root: PathBuf,
	config: DocgenConfig,
	registry: TransformRegistry,
	middleware: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
	pub fn new(root: impl Into<PathBuf>, config: DocgenConfig, registry: TransformRegistry) -> Self {
		Self {
			root: root.into(),
			config,
			registry,
			middleware: Vec::new(),
		}
	}

	#[must_use]
	pub fn with_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
		self.middleware.push(Arc::new(middleware));
		self
	}

	pub fn config(&self) -> &DocgenConfig {
		&self.config
	}

	pub fn registry(&self) -> &TransformRegistry {
		&self.registry
	}

	/// Where the transformed version of `path` is written.
	pub fn output_path(&self, path: &Path) -> PathBuf {
		let Some(output_dir) = &self.config.output_dir else {
			return path.to_path_buf();
		};

		let relative = path
			.strip_prefix(&self.root)
			.map(Path::to_path_buf)
			.unwrap_or_else(|_| path.file_name().map(PathBuf::from).unwrap_or_default());
		self.root.join(output_dir).join(relative)
	}

	/// Scan every source for blocks and resolve their dependencies.
	///
	/// Parse errors skip the offending file unless `fail_fast` is set.
	pub fn scan(&self, sources: &[SourceFile]) -> DocgenResult<ScanOutcome> {
		let mut scanners: HashMap<TagSyntax, BlockScanner> = HashMap::new();
		let mut outcome = ScanOutcome::default();

		for source in sources {
			let scanner = scanner_for(&mut scanners, self.config.syntax_for(&source.path))?;

			match scanner.scan(&source.contents) {
				Ok(blocks) => {
					debug!(file = %source.path.display(), blocks = blocks.len(), "scanned file");
					outcome.items.push(FileItem::new(source.path.clone(), blocks));
				}
				Err(error) if error.is_parse_error() && !self.config.fail_fast => {
					let error = error.in_file(&source.path);
					warn!(file = %source.path.display(), %error, "skipping file that failed to parse");
					outcome.errors.push(error);
				}
				Err(error) => return Err(error.in_file(&source.path)),
			}
		}

		let known: HashSet<PathBuf> = outcome.items.iter().map(|item| item.id.clone()).collect();
		for item in &mut outcome.items {
			item.retain_known(&known);
		}

		Ok(outcome)
	}

	/// Scan, order and transform `sources`.
	///
	/// Files are processed one at a time, dependencies first, so a transform
	/// reading another file sees its final contents. A dependency cycle
	/// aborts the run before any transform executes.
	pub async fn run(&self, sources: Vec<SourceFile>) -> DocgenResult<PipelineResult> {
		let settings = self.config.settings_json()?;
		let ScanOutcome { items, errors } = self.scan(&sources)?;

		let ids: Vec<PathBuf> = items.iter().map(|item| item.id.clone()).collect();
		let edges = build_graph(&items);
		let order = execution_order(&ids, &edges)?;

		let contents: HashMap<PathBuf, String> = sources
			.into_iter()
			.map(|source| (source.path, source.contents))
			.collect();
		let mut items: HashMap<PathBuf, FileItem> =
			items.into_iter().map(|item| (item.id.clone(), item)).collect();

		let executor = TransformExecutor::new(&self.registry, &self.middleware, &settings);
		let mut scanners: HashMap<TagSyntax, BlockScanner> = HashMap::new();
		let mut processed: HashMap<PathBuf, String> = HashMap::new();
		let mut result = PipelineResult {
			errors,
			..PipelineResult::default()
		};

		for path in order {
			let Some(mut item) = items.remove(&path) else {
				continue;
			};
			if item.blocks.is_empty() {
				continue;
			}
			let Some(original) = contents.get(&path) else {
				continue;
			};

			let scanner = scanner_for(&mut scanners, self.config.syntax_for(&path))?;
			let output_path = self.output_path(&path);

			let outcome = executor
				.run(ExecutorInput {
					src_path: &path,
					output_path: &output_path,
					contents: original,
					blocks: &item.blocks,
					scanner,
					processed: &processed,
				})
				.await?;

			for missing in &outcome.missing_transforms {
				if let Some(block) = item.blocks.get_mut(missing.index) {
					block.context.is_missing = true;
				}
			}

			processed.insert(path.clone(), outcome.updated_contents.clone());
			result.missing_transforms.extend(outcome.missing_transforms);
			result.order.push(path.clone());
			result.files.push(FileResult {
				path,
				output_path,
				original_contents: original.clone(),
				updated_contents: outcome.updated_contents,
				blocks: item.blocks,
				dependencies: item.dependencies,
				transforms_run: outcome.transforms_run,
				is_changed: outcome.is_changed,
			});
		}

		if self.config.fail_on_missing_transforms && !result.missing_transforms.is_empty() {
			let details = result
				.missing_transforms
				.iter()
				.map(|missing| format!("  - {missing}"))
				.collect::<Vec<_>>()
				.join("\n");

			return Err(DocgenError::MissingTransforms {
				count: result.missing_transforms.len(),
				details,
			});
		}

		Ok(result)
	}
}

/// Compile each distinct tag vocabulary once per run.
fn scanner_for(
	scanners: &mut HashMap<TagSyntax, BlockScanner>,
	syntax: TagSyntax,
) -> DocgenResult<&BlockScanner> {
	match scanners.entry(syntax) {
		Entry::Occupied(entry) => Ok(entry.into_mut()),
		Entry::Vacant(entry) => {
			let scanner = BlockScanner::new(entry.key())?;
			Ok(entry.insert(scanner))
		}
	}
}

/// Write every changed file to its output path, creating parent
/// directories as needed. Returns the number of files written.
pub fn write_updates(result: &PipelineResult) -> DocgenResult<usize> {
	let mut written = 0;

	for file in result.changed_files() {
		if let Some(parent) = file.output_path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(&file.output_path, &file.updated_contents)?;
		written += 1;
	}

	Ok(written)
}
