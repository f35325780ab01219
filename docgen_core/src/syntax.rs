use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

pub const DEFAULT_OPEN_WORD: &str = "doc-gen";
pub const DEFAULT_CLOSE_WORD: &str = "end-doc-gen";

/// Comment delimiters wrapping a block tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentDelimiters {
	pub open: String,
	/// An empty close delimiter means the tag runs to the end of its line.
	#[serde(default)]
	pub close: String,
}

impl CommentDelimiters {
	pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
		Self {
			open: open.into(),
			close: close.into(),
		}
	}

	pub fn markdown() -> Self {
		Self::new("<!--", "-->")
	}

	pub fn c_style() -> Self {
		Self::new("/*", "*/")
	}

	pub fn hash() -> Self {
		Self::new("#", "")
	}

	/// Pick delimiters from a file extension. Unknown extensions fall back
	/// to markdown comments.
	pub fn for_extension(extension: &str) -> Self {
		match extension.to_ascii_lowercase().as_str() {
			"js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" | "rs" | "c" | "h" | "cpp" | "hpp" | "cs"
			| "java" | "kt" | "go" | "swift" | "css" | "scss" | "less" | "php" => Self::c_style(),
			"yml" | "yaml" | "toml" | "sh" | "bash" | "zsh" | "py" | "rb" | "pl" | "r"
			| "dockerfile" | "mk" => Self::hash(),
			_ => Self::markdown(),
		}
	}
}

/// The vocabulary used to recognise blocks in one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagSyntax {
	pub open_word: String,
	pub close_word: String,
	pub comment_open: String,
	pub comment_close: String,
}

impl Default for TagSyntax {
	fn default() -> Self {
		Self::markdown(DEFAULT_OPEN_WORD, DEFAULT_CLOSE_WORD)
	}
}

impl TagSyntax {
	pub fn new(
		open_word: impl Into<String>,
		close_word: impl Into<String>,
		delimiters: CommentDelimiters,
	) -> Self {
		Self {
			open_word: open_word.into(),
			close_word: close_word.into(),
			comment_open: delimiters.open,
			comment_close: delimiters.close,
		}
	}

	pub fn markdown(open_word: impl Into<String>, close_word: impl Into<String>) -> Self {
		Self::new(open_word, close_word, CommentDelimiters::markdown())
	}

	/// Build the syntax for `path`, consulting `overrides` (keyed by
	/// extension, without the dot) before the built-in table.
	pub fn for_path(
		path: &Path,
		open_word: &str,
		close_word: &str,
		overrides: &BTreeMap<String, CommentDelimiters>,
	) -> Self {
		let extension = path
			.extension()
			.and_then(|ext| ext.to_str())
			.map(str::to_ascii_lowercase)
			.or_else(|| {
				// Extensionless files such as `Dockerfile` and `Makefile`.
				path.file_name()
					.and_then(|name| name.to_str())
					.map(str::to_ascii_lowercase)
			})
			.unwrap_or_default();

		let delimiters = overrides
			.get(&extension)
			.cloned()
			.unwrap_or_else(|| {
				match extension.as_str() {
					"makefile" => CommentDelimiters::hash(),
					ext => CommentDelimiters::for_extension(ext),
				}
			});

		Self::new(open_word, close_word, delimiters)
	}
}
