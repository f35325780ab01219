use serde_json::Value;
use tracing::debug;

use crate::DocgenError;
use crate::DocgenResult;
use crate::Transform;
use crate::TransformContext;
use crate::TransformFuture;
use crate::TransformRegistry;
use crate::normalize_path;

/// Inlines the contents of another file.
///
/// `src` is resolved relative to the file containing the block. When the
/// referenced file was transformed earlier in the same run its new contents
/// are used. `lines="3-7"` keeps an inclusive, 1-based range of lines;
/// `"3-"` runs to the end of the file.
///
/// ```markdown
/// <!-- doc-gen FILE src="./usage.md" lines="1-20" -->
/// <!-- end-doc-gen -->
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransform;

impl FileTransform {
	pub const NAME: &'static str = "FILE";
}

impl Transform for FileTransform {
	fn name(&self) -> &str {
		Self::NAME
	}

	fn run<'a>(&'a self, ctx: &'a TransformContext<'a>) -> TransformFuture<'a> {
		Box::pin(async move { read_source(ctx) })
	}
}

fn read_source(ctx: &TransformContext<'_>) -> DocgenResult<Option<String>> {
	let Some(src) = ctx.block.src() else {
		return Err(invalid_option(ctx, "the `src` option is required"));
	};

	let base = ctx.src_path.parent().unwrap_or(ctx.src_path);
	let path = normalize_path(&base.join(src));

	let contents = match ctx.processed.get(&path) {
		Some(contents) => contents.clone(),
		None => std::fs::read_to_string(&path)?,
	};
	debug!(src = %path.display(), "inlining file");

	let Some(range) = ctx.options.get("lines") else {
		return Ok(Some(contents));
	};

	let (start, end) = parse_line_range(range)
		.ok_or_else(|| invalid_option(ctx, &format!("invalid `lines` range: {range}")))?;

	let selected = contents
		.lines()
		.skip(start.saturating_sub(1))
		.take(end.map_or(usize::MAX, |end| end.saturating_sub(start) + 1))
		.collect::<Vec<_>>()
		.join("\n");

	Ok(Some(selected))
}

/// Parse `3`, `"3"`, `"3-7"` or `"3-"` into a 1-based inclusive range.
fn parse_line_range(value: &Value) -> Option<(usize, Option<usize>)> {
	let (start, end) = match value {
		Value::Number(number) => {
			let line = usize::try_from(number.as_u64()?).ok()?;
			(line, Some(line))
		}
		Value::String(text) => {
			match text.trim().split_once('-') {
				Some((start, end)) => {
					let end = match end.trim() {
						"" => None,
						end => Some(end.parse().ok()?),
					};
					(start.trim().parse().ok()?, end)
				}
				None => {
					let line = text.trim().parse().ok()?;
					(line, Some(line))
				}
			}
		}
		_ => return None,
	};

	match end {
		_ if start == 0 => None,
		Some(end) if end < start => None,
		_ => Some((start, end)),
	}
}

fn invalid_option(ctx: &TransformContext<'_>, reason: &str) -> DocgenError {
	DocgenError::InvalidArguments {
		file: ctx.src_path.display().to_string(),
		line: ctx.block.line(),
		reason: reason.to_string(),
	}
}

/// A registry holding every built-in transform.
pub fn builtin_registry() -> TransformRegistry {
	TransformRegistry::new().with(FileTransform)
}

#[cfg(test)]
mod tests {
	use rstest::rstest;
	use serde_json::json;

	use super::*;

	#[rstest]
	#[case::single_number(json!(3), Some((3, Some(3))))]
	#[case::single_string(json!("3"), Some((3, Some(3))))]
	#[case::range(json!("3-7"), Some((3, Some(7))))]
	#[case::open_ended(json!("3-"), Some((3, None)))]
	#[case::reversed(json!("7-3"), None)]
	#[case::zero(json!("0-2"), None)]
	#[case::zero_number(json!(0), None)]
	#[case::garbage(json!("a-b"), None)]
	fn line_ranges(#[case] value: Value, #[case] expected: Option<(usize, Option<usize>)>) {
		assert_eq!(parse_line_range(&value), expected);
	}
}
