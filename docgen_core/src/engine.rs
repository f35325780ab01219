use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::Block;
use crate::BlockScanner;
use crate::DocgenError;
use crate::DocgenResult;
use crate::arguments::Options;

/// The future returned by [`Transform::run`]. `None` leaves the block
/// content unchanged.
pub type TransformFuture<'a> =
	Pin<Box<dyn Future<Output = DocgenResult<Option<String>>> + Send + 'a>>;

/// Everything a transform can see while rendering one block.
#[derive(Debug)]
pub struct TransformContext<'a> {
	/// The transform name as written in the open tag.
	pub transform: &'a str,
	/// The block content with the block indentation removed.
	pub content: String,
	pub options: &'a Options,
	pub block: &'a Block,
	/// The file being transformed.
	pub src_path: &'a Path,
	/// Where the transformed file will be written.
	pub output_path: &'a Path,
	/// The `[settings]` table from the configuration.
	pub settings: &'a Value,
	/// The file text with every earlier block of this file already
	/// rendered.
	pub current_contents: String,
	pub original_contents: &'a str,
	/// Final contents of files that were transformed earlier in this run.
	pub processed: &'a HashMap<PathBuf, String>,
}

/// A named content generator.
pub trait Transform: Send + Sync {
	fn name(&self) -> &str;

	fn run<'a>(&'a self, ctx: &'a TransformContext<'a>) -> TransformFuture<'a>;
}

/// A [`Transform`] backed by a synchronous closure.
pub struct FnTransform<F> {
	name: String,
	func: F,
}

impl<F> Transform for FnTransform<F>
where
	F: Fn(&TransformContext<'_>) -> DocgenResult<Option<String>> + Send + Sync,
{
	fn name(&self) -> &str {
		&self.name
	}

	fn run<'a>(&'a self, ctx: &'a TransformContext<'a>) -> TransformFuture<'a> {
		Box::pin(std::future::ready((self.func)(ctx)))
	}
}

/// Create a transform from a closure.
///
/// ```rust
/// use docgen_core::TransformRegistry;
/// use docgen_core::transform_fn;
///
/// let mut registry = TransformRegistry::new();
/// registry.register(transform_fn("uppercase", |ctx| {
/// 	Ok(Some(ctx.content.to_uppercase()))
/// }));
/// assert!(registry.get("UPPERCASE").is_some());
/// ```
pub fn transform_fn<F>(name: impl Into<String>, func: F) -> FnTransform<F>
where
	F: Fn(&TransformContext<'_>) -> DocgenResult<Option<String>> + Send + Sync,
{
	FnTransform {
		name: name.into(),
		func,
	}
}

/// Ordered set of transforms. Lookups try the exact name first and then an
/// ASCII case-insensitive match.
#[derive(Clone, Default)]
pub struct TransformRegistry {
	transforms: Vec<Arc<dyn Transform>>,
}

impl fmt::Debug for TransformRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.names()).finish()
	}
}

impl TransformRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a transform, replacing any existing transform with the same
	/// name.
	pub fn register(&mut self, transform: impl Transform + 'static) -> &mut Self {
		self.register_arc(Arc::new(transform))
	}

	pub fn register_arc(&mut self, transform: Arc<dyn Transform>) -> &mut Self {
		match self
			.transforms
			.iter()
			.position(|existing| existing.name() == transform.name())
		{
			Some(index) => self.transforms[index] = transform,
			None => self.transforms.push(transform),
		}
		self
	}

	#[must_use]
	pub fn with(mut self, transform: impl Transform + 'static) -> Self {
		self.register(transform);
		self
	}

	pub fn get(&self, name: &str) -> Option<&Arc<dyn Transform>> {
		self.transforms
			.iter()
			.find(|transform| transform.name() == name)
			.or_else(|| {
				self.transforms
					.iter()
					.find(|transform| transform.name().eq_ignore_ascii_case(name))
			})
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.transforms.iter().map(|transform| transform.name())
	}

	pub fn len(&self) -> usize {
		self.transforms.len()
	}

	pub fn is_empty(&self) -> bool {
		self.transforms.is_empty()
	}
}

/// Hooks around every transform invocation. Middleware runs in registration
/// order.
pub trait Middleware: Send + Sync {
	/// Rewrite the block content before the transform sees it.
	fn before(&self, _block: &Block, content: String) -> String {
		content
	}

	/// Rewrite the transform output before it is inserted.
	fn after(&self, _block: &Block, rendered: String) -> String {
		rendered
	}
}

/// A block whose transform name is not registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingTransform {
	pub transform: String,
	pub file: PathBuf,
	pub line: usize,
	/// Index of the block within its file.
	pub index: usize,
}

impl fmt::Display for MissingTransform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "`{}` at {}:{}", self.transform, self.file.display(), self.line)
	}
}

/// Result of running all blocks of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
	pub updated_contents: String,
	/// Names of the transforms that ran, in block order.
	pub transforms_run: Vec<String>,
	pub missing_transforms: Vec<MissingTransform>,
	/// Whether `updated_contents` differs from the input text.
	pub is_changed: bool,
}

/// One file handed to [`TransformExecutor::run`].
#[derive(Debug, Clone, Copy)]
pub struct ExecutorInput<'a> {
	pub src_path: &'a Path,
	pub output_path: &'a Path,
	pub contents: &'a str,
	pub blocks: &'a [Block],
	/// The scanner the blocks were found with.
	pub scanner: &'a BlockScanner,
	pub processed: &'a HashMap<PathBuf, String>,
}

/// Renders the blocks of a file one after another.
#[derive(Clone, Copy)]
pub struct TransformExecutor<'a> {
	registry: &'a TransformRegistry,
	middleware: &'a [Arc<dyn Middleware>],
	settings: &'a Value,
}

impl<'a> TransformExecutor<'a> {
	pub fn new(
		registry: &'a TransformRegistry,
		middleware: &'a [Arc<dyn Middleware>],
		settings: &'a Value,
	) -> Self {
		Self {
			registry,
			middleware,
			settings,
		}
	}

	/// Render every block of `input` in document order.
	///
	/// Each transform is awaited before the next one starts so that it sees
	/// the output of the blocks above it in `current_contents`. The new text
	/// is assembled from the untouched segments between blocks and the
	/// rendered block contents, so blocks with identical text never replace
	/// each other.
	#[tracing::instrument(skip_all, fields(file = %input.src_path.display()))]
	pub async fn run(&self, input: ExecutorInput<'_>) -> DocgenResult<FileOutcome> {
		let text = input.contents;
		let mut output = String::with_capacity(text.len());
		let mut cursor = 0;
		let mut transforms_run = Vec::new();
		let mut missing_transforms = Vec::new();

		for block in input.blocks {
			output.push_str(&text[cursor..block.content.start]);
			cursor = block.content.start;

			let Some(name) = block.transform.as_deref() else {
				continue;
			};

			let Some(transform) = self.registry.get(name) else {
				warn!(
					transform = name,
					line = block.line(),
					"no transform registered for block"
				);
				missing_transforms.push(MissingTransform {
					transform: name.to_string(),
					file: input.src_path.to_path_buf(),
					line: block.line(),
					index: block.index,
				});
				continue;
			};

			let content = self
				.middleware
				.iter()
				.fold(dedent(&block.content.value, &block.span.indentation), |content, middleware| {
					middleware.before(block, content)
				});

			let ctx = TransformContext {
				transform: name,
				content,
				options: &block.options,
				block,
				src_path: input.src_path,
				output_path: input.output_path,
				settings: self.settings,
				current_contents: format!("{output}{}", &text[cursor..]),
				original_contents: text,
				processed: input.processed,
			};

			debug!(transform = name, line = block.line(), "running transform");
			let rendered = transform.run(&ctx).await.map_err(|error| {
				match error {
					DocgenError::TransformFailed { .. } => error,
					other => {
						DocgenError::TransformFailed {
							transform: name.to_string(),
							file: input.src_path.display().to_string(),
							line: block.line(),
							reason: other.to_string(),
						}
					}
				}
			})?;
			transforms_run.push(name.to_string());

			let Some(rendered) = rendered else {
				continue;
			};

			let rendered = self
				.middleware
				.iter()
				.fold(rendered, |rendered, middleware| middleware.after(block, rendered));

			output.push_str(&format_insertion(&rendered, block, input.scanner));
			cursor = block.content.end;
		}

		output.push_str(&text[cursor..]);
		let is_changed = output != text;

		Ok(FileOutcome {
			updated_contents: output,
			transforms_run,
			missing_transforms,
			is_changed,
		})
	}
}

/// Prepare transform output for insertion between the block tags.
fn format_insertion(rendered: &str, block: &Block, scanner: &BlockScanner) -> String {
	let stripped = scanner.strip_tags(rendered);
	let body = if block.flag("noTrim") {
		stripped.as_ref()
	} else {
		stripped.trim()
	};

	let leading_newline = block.context.is_multiline && !block.open.value.ends_with('\n');
	let trailing_newline = block.context.is_multiline
		&& !block.close.value.starts_with('\n')
		&& !block.close.value.starts_with("\r\n");
	let starts_at_line = leading_newline || block.open.value.ends_with('\n');

	let mut result = String::with_capacity(body.len() + 2);
	if leading_newline {
		result.push('\n');
	}
	result.push_str(&indent(body, &block.span.indentation, starts_at_line));
	// An empty body under an open tag that already ends its line needs nothing.
	if trailing_newline && !result.is_empty() && !result.ends_with('\n') {
		result.push('\n');
	}

	result
}

/// Remove `indentation` from the start of every line that has it.
fn dedent(content: &str, indentation: &str) -> String {
	if indentation.is_empty() {
		return content.to_string();
	}

	content
		.split('\n')
		.map(|line| line.strip_prefix(indentation).unwrap_or(line))
		.collect::<Vec<_>>()
		.join("\n")
}

/// Prefix every non-empty line that starts at a line start with
/// `indentation`. The first line only counts when `first_at_line_start`.
fn indent(content: &str, indentation: &str, first_at_line_start: bool) -> String {
	if indentation.is_empty() {
		return content.to_string();
	}

	content
		.split('\n')
		.enumerate()
		.map(|(index, line)| {
			if line.trim().is_empty() || (index == 0 && !first_at_line_start) {
				line.to_string()
			} else {
				format!("{indentation}{line}")
			}
		})
		.collect::<Vec<_>>()
		.join("\n")
}
