use std::path::Path;

use miette::Diagnostic;
use thiserror::Error;

/// Placeholder file name used by the pure scanner before a parse error has
/// been attached to a real path.
pub const UNKNOWN_FILE: &str = "<input>";

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum DocgenError {
	#[error(transparent)]
	#[diagnostic(code(docgen::io_error))]
	Io(#[from] std::io::Error),

	#[error("missing closing tag for block opened at {file}:{line}: `{tag}`")]
	#[diagnostic(
		code(docgen::unclosed_block),
		help("add the matching close tag after the block content")
	)]
	UnclosedBlock {
		file: String,
		line: usize,
		tag: String,
	},

	#[error("invalid block arguments at {file}:{line}: {reason}")]
	#[diagnostic(
		code(docgen::invalid_arguments),
		help("check that every quote is closed and every `{{`, `[` and `(` is balanced")
	)]
	InvalidArguments {
		file: String,
		line: usize,
		reason: String,
	},

	#[error("invalid argument literal: {0}")]
	#[diagnostic(code(docgen::argument_syntax))]
	ArgumentSyntax(String),

	#[error("dependency cycle detected between files: {}", .files.join(" -> "))]
	#[diagnostic(
		code(docgen::dependency_cycle),
		help("remove one of the `src` references so the files no longer depend on each other")
	)]
	DependencyCycle { files: Vec<String> },

	#[error("{count} block(s) reference transforms that are not registered:\n{details}")]
	#[diagnostic(
		code(docgen::missing_transforms),
		help("register the transforms or disable `fail_on_missing_transforms`")
	)]
	MissingTransforms { count: usize, details: String },

	#[error("transform `{transform}` failed at {file}:{line}: {reason}")]
	#[diagnostic(code(docgen::transform_failed))]
	TransformFailed {
		transform: String,
		file: String,
		line: usize,
		reason: String,
	},

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(docgen::config_parse),
		help("check that docgen.toml is valid TOML")
	)]
	ConfigParse(String),

	#[error("invalid pattern `{pattern}`: {reason}")]
	#[diagnostic(code(docgen::invalid_pattern))]
	InvalidPattern { pattern: String, reason: String },

	#[error("file too large: `{path}` is {size} bytes (limit: {limit} bytes)")]
	#[diagnostic(
		code(docgen::file_too_large),
		help("increase `max_file_size` in docgen.toml or exclude this file")
	)]
	FileTooLarge { path: String, size: u64, limit: u64 },

	#[error("symlink cycle detected at: `{path}`")]
	#[diagnostic(
		code(docgen::symlink_cycle),
		help("remove the circular symlink or exclude this path")
	)]
	SymlinkCycle { path: String },

	#[error("unconvertible float value in `{path}`: {value}")]
	#[diagnostic(
		code(docgen::unconvertible_float),
		help("NaN and Infinity are not valid JSON numbers")
	)]
	UnconvertibleFloat { path: String, value: String },
}

impl DocgenError {
	/// Attach a file path to parse errors produced by the path-agnostic
	/// scanner. Other variants are returned unchanged.
	#[must_use]
	pub fn in_file(self, path: &Path) -> Self {
		let display = path.display().to_string();

		match self {
			Self::UnclosedBlock { line, tag, .. } => {
				Self::UnclosedBlock {
					file: display,
					line,
					tag,
				}
			}
			Self::InvalidArguments { line, reason, .. } => {
				Self::InvalidArguments {
					file: display,
					line,
					reason,
				}
			}
			other => other,
		}
	}

	/// Whether this error is a block or argument parse failure that only
	/// affects the file it was found in.
	pub fn is_parse_error(&self) -> bool {
		matches!(
			self,
			Self::UnclosedBlock { .. } | Self::InvalidArguments { .. } | Self::ArgumentSyntax(_)
		)
	}
}

pub type DocgenResult<T> = Result<T, DocgenError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
