use std::borrow::Cow;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::DocgenError;
use crate::DocgenResult;
use crate::TagSyntax;
use crate::UNKNOWN_FILE;
use crate::arguments::Options;
use crate::arguments::parse_arguments;
use crate::arguments::parse_legacy_arguments;

/// One open tag, its content and the matching close tag.
///
/// All offsets are byte offsets into the scanned text and satisfy
/// `open.start < open.end <= content.start <= content.end <= close.start <
/// close.end == span.end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
	/// Position of this block within its file, starting at zero.
	pub index: usize,
	/// The transform name with any wrapper characters removed. `None` when
	/// the open tag carries no name.
	pub transform: Option<String>,
	/// The unparsed argument text of the open tag.
	pub raw_args: String,
	/// The parsed arguments.
	pub options: Options,
	pub open: TagSpan,
	pub close: TagSpan,
	pub content: ContentSpan,
	#[serde(rename = "block")]
	pub span: BlockSpan,
	pub context: BlockContext,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSpan {
	pub value: String,
	pub start: usize,
	pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSpan {
	pub value: String,
	pub start: usize,
	pub end: usize,
	/// Width of the open tag's indentation, restored when new content is
	/// inserted.
	pub indentation: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpan {
	pub indentation: String,
	/// 1-based line of the open tag and of the end of the close tag.
	pub lines: (usize, usize),
	pub start: usize,
	pub end: usize,
	pub value: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockContext {
	pub is_multiline: bool,
	pub is_legacy: bool,
	pub is_missing: bool,
}

impl Block {
	/// The 1-based line of the open tag.
	pub fn line(&self) -> usize {
		self.span.lines.0
	}

	/// The `src` option as a string, when present.
	pub fn src(&self) -> Option<&str> {
		self.options.get("src").and_then(Value::as_str)
	}

	/// Whether a boolean-ish option is set, e.g. `noTrim`.
	pub fn flag(&self, key: &str) -> bool {
		match self.options.get(key) {
			Some(Value::Bool(value)) => *value,
			Some(Value::String(value)) => value == "true",
			Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
			_ => false,
		}
	}
}

/// Finds blocks for one [`TagSyntax`]. The patterns are compiled once and
/// the scanner can be reused for any number of files.
#[derive(Debug, Clone)]
pub struct BlockScanner {
	syntax: TagSyntax,
	open_pattern: Regex,
	close_pattern: Regex,
}

impl BlockScanner {
	pub fn new(syntax: &TagSyntax) -> DocgenResult<Self> {
		let open_pattern = compile_tag_pattern(syntax, &syntax.open_word, true)?;
		let close_pattern = compile_tag_pattern(syntax, &syntax.close_word, false)?;

		Ok(Self {
			syntax: syntax.clone(),
			open_pattern,
			close_pattern,
		})
	}

	pub fn syntax(&self) -> &TagSyntax {
		&self.syntax
	}

	/// Scan `text` and return every block in document order.
	///
	/// Parse errors name the file as `<input>`; use
	/// [`DocgenError::in_file`] to attach the real path.
	pub fn scan(&self, text: &str) -> DocgenResult<Vec<Block>> {
		let lines = LineTable::new(text);
		let mut blocks = Vec::new();
		let mut cursor = 0;

		while let Some(open_match) = self.open_pattern.captures_at(text, cursor) {
			let Some(tag) = open_match.get(0) else {
				break;
			};
			let open_line = lines.line_of(tag.start());
			let rest = open_match.name("rest").map_or("", |rest| rest.as_str());

			let (open_start, indentation) = leading_indentation(text, tag.start());
			let open_end = consume_line_end(text, tag.end());

			let Some(close_tag) = self.close_pattern.find_at(text, open_end) else {
				return Err(DocgenError::UnclosedBlock {
					file: UNKNOWN_FILE.to_string(),
					line: open_line,
					tag: tag.as_str().trim().to_string(),
				});
			};

			// A close tag on its own line also owns the preceding line break.
			let (close_line_start, _) = leading_indentation(text, close_tag.start());
			let close_start = if at_line_start(text, close_line_start) {
				preceding_line_break(text, close_line_start).max(open_end)
			} else {
				close_tag.start()
			};
			let close_end = close_tag.end();

			let header = self.parse_header(rest, open_line)?;
			let close_line = lines.line_of(close_end.saturating_sub(1).max(close_start));

			blocks.push(Block {
				index: blocks.len(),
				transform: header.transform,
				raw_args: header.raw_args,
				options: header.options,
				open: TagSpan {
					value: text[open_start..open_end].to_string(),
					start: open_start,
					end: open_end,
				},
				close: TagSpan {
					value: text[close_start..close_end].to_string(),
					start: close_start,
					end: close_end,
				},
				content: ContentSpan {
					value: text[open_end..close_start].to_string(),
					start: open_end,
					end: close_start,
					indentation: indentation.chars().count(),
				},
				span: BlockSpan {
					indentation: indentation.to_string(),
					lines: (open_line, close_line),
					start: open_start,
					end: close_end,
					value: text[open_start..close_end].to_string(),
				},
				context: BlockContext {
					is_multiline: open_line != close_line,
					is_legacy: header.is_legacy,
					is_missing: false,
				},
			});

			cursor = close_end;
		}

		Ok(blocks)
	}

	/// Remove every complete open or close tag of this vocabulary from
	/// `text`. Used to keep rendered content from introducing new blocks.
	pub fn strip_tags<'a>(&self, text: &'a str) -> Cow<'a, str> {
		match self.open_pattern.replace_all(text, "") {
			Cow::Borrowed(text) => self.close_pattern.replace_all(text, ""),
			Cow::Owned(text) => Cow::Owned(self.close_pattern.replace_all(&text, "").into_owned()),
		}
	}

	fn parse_header(&self, rest: &str, line: usize) -> DocgenResult<OpenTagHeader> {
		// Only a run touching the comment close is debris, as in `------>`.
		let rest = match self.syntax.comment_close.chars().next() {
			Some(first) => rest.trim_end_matches(first).trim_end(),
			None => rest.trim_end(),
		};

		let header = parse_open_tag(rest);
		let mut options = if header.is_legacy {
			parse_legacy_arguments(&header.raw_args)
		} else {
			parse_arguments(&header.raw_args).map_err(|error| {
				DocgenError::InvalidArguments {
					file: UNKNOWN_FILE.to_string(),
					line,
					reason: argument_reason(error),
				}
			})?
		};

		// Modern arguments may follow a legacy wrapper, e.g. `(TOC:a=1) b=2`.
		if header.is_legacy && !header.trailing.is_empty() {
			let trailing = parse_arguments(header.trailing).map_err(|error| {
				DocgenError::InvalidArguments {
					file: UNKNOWN_FILE.to_string(),
					line,
					reason: argument_reason(error),
				}
			})?;
			options.extend(trailing);
		}

		Ok(OpenTagHeader {
			transform: header.transform.map(str::to_string),
			raw_args: header.raw_args,
			options,
			is_legacy: header.is_legacy,
		})
	}
}

/// Scan `text` with a one-off scanner for `syntax`.
pub fn scan(text: &str, syntax: &TagSyntax) -> DocgenResult<Vec<Block>> {
	BlockScanner::new(syntax)?.scan(text)
}

fn argument_reason(error: DocgenError) -> String {
	match error {
		DocgenError::ArgumentSyntax(reason) => reason,
		other => other.to_string(),
	}
}

/// Build `comment_open <word> [rest] comment_close`. The word matches as
/// written or fully lower-cased and must not run into further word
/// characters.
fn compile_tag_pattern(syntax: &TagSyntax, word: &str, capture_rest: bool) -> DocgenResult<Regex> {
	let words = if word.to_lowercase() == word {
		regex::escape(word)
	} else {
		format!("{}|{}", regex::escape(word), regex::escape(&word.to_lowercase()))
	};
	let rest_name = if capture_rest { "?P<rest>" } else { "?:" };

	let pattern = if syntax.comment_close.is_empty() {
		format!(
			r"{}[ \t]*(?:{words})({rest_name}(?:[^\w\-\n][^\n]*)?)",
			regex::escape(&syntax.comment_open)
		)
	} else {
		format!(
			r"{}[ \t]*(?:{words})({rest_name}(?:[^\w\-](?s:.*?))?){}",
			regex::escape(&syntax.comment_open),
			regex::escape(&syntax.comment_close)
		)
	};

	Regex::new(&pattern).map_err(|error| {
		DocgenError::InvalidPattern {
			pattern,
			reason: error.to_string(),
		}
	})
}

/// When only spaces or tabs precede `offset` on its line, the tag starts
/// at the beginning of the line and that whitespace is its indentation.
fn leading_indentation(text: &str, offset: usize) -> (usize, &str) {
	let line_start = text[..offset].rfind('\n').map_or(0, |index| index + 1);
	let prefix = &text[line_start..offset];

	if prefix.chars().all(|ch| ch == ' ' || ch == '\t') {
		(line_start, prefix)
	} else {
		(offset, "")
	}
}

fn at_line_start(text: &str, offset: usize) -> bool {
	offset == 0 || text[..offset].ends_with('\n')
}

/// The offset of the line break that ends the previous line, or `offset`
/// itself when it is the start of the text.
fn preceding_line_break(text: &str, offset: usize) -> usize {
	if text[..offset].ends_with("\r\n") {
		offset - 2
	} else if text[..offset].ends_with('\n') {
		offset - 1
	} else {
		offset
	}
}

/// The open tag owns trailing spaces and one line break, but only when the
/// line break follows directly.
fn consume_line_end(text: &str, offset: usize) -> usize {
	let rest = &text[offset..];
	let after_spaces = rest.trim_start_matches([' ', '\t']);
	let spaces = rest.len() - after_spaces.len();

	if after_spaces.starts_with("\r\n") {
		offset + spaces + 2
	} else if after_spaces.starts_with('\n') {
		offset + spaces + 1
	} else {
		offset
	}
}

struct OpenTagHeader {
	transform: Option<String>,
	raw_args: String,
	options: Options,
	is_legacy: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct RawHeader<'a> {
	transform: Option<&'a str>,
	raw_args: String,
	/// Text after a legacy wrapper, parsed with the modern syntax.
	trailing: &'a str,
	is_legacy: bool,
}

const WRAPPERS: [(&str, &str); 5] = [("((", "))"), ("{{", "}}"), ("(", ")"), ("[", "]"), ("{", "}")];

/// Split the text following the open word into a transform name and its
/// arguments.
fn parse_open_tag(rest: &str) -> RawHeader<'_> {
	let text = rest.trim_start();

	for (open, close) in WRAPPERS {
		let Some(inner) = text.strip_prefix(open) else {
			continue;
		};
		let Some(end) = inner.find(close) else {
			continue;
		};

		let body = inner[..end].trim();
		let trailing = inner[end + close.len()..].trim();
		let name_len = identifier_len(body);
		if name_len == 0 {
			continue;
		}

		let (name, after_name) = body.split_at(name_len);
		if let Some(legacy) = legacy_arguments(after_name) {
			return RawHeader {
				transform: Some(name),
				raw_args: legacy.to_string(),
				trailing,
				is_legacy: true,
			};
		}

		if after_name.trim().is_empty() {
			return RawHeader {
				transform: Some(name),
				raw_args: trailing.to_string(),
				trailing: "",
				is_legacy: false,
			};
		}
	}

	let name_len = identifier_len(text);
	if name_len > 0 {
		let (name, after_name) = text.split_at(name_len);

		if let Some(legacy) = legacy_arguments(after_name) {
			return RawHeader {
				transform: Some(name),
				raw_args: legacy.to_string(),
				trailing: "",
				is_legacy: true,
			};
		}

		// `key=value` is an argument, not a transform name.
		let is_argument = after_name.trim_start().starts_with('=');
		let is_separated = after_name.is_empty() || after_name.starts_with(char::is_whitespace);
		if !is_argument && is_separated {
			return RawHeader {
				transform: Some(name),
				raw_args: after_name.trim().to_string(),
				trailing: "",
				is_legacy: false,
			};
		}
	}

	RawHeader {
		transform: None,
		raw_args: text.trim().to_string(),
		trailing: "",
		is_legacy: false,
	}
}

/// `:key=val&key2=val2`, with at most one space before the colon.
fn legacy_arguments(after_name: &str) -> Option<&str> {
	let after_name = after_name.strip_prefix(' ').unwrap_or(after_name);
	after_name.strip_prefix(':').map(str::trim)
}

/// Length in bytes of the transform identifier at the start of `text`.
fn identifier_len(text: &str) -> usize {
	let mut chars = text.char_indices();
	match chars.next() {
		Some((_, ch)) if ch.is_alphabetic() || ch == '_' || ch == '$' => {}
		_ => return 0,
	}

	chars
		.find(|(_, ch)| !(ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | '$')))
		.map_or(text.len(), |(index, _)| index)
}

/// Byte offsets of line starts, used to turn offsets into 1-based lines
/// with a binary search.
struct LineTable {
	line_starts: Vec<usize>,
}

impl LineTable {
	fn new(content: &str) -> Self {
		let mut line_starts = vec![0];
		for (index, byte) in content.bytes().enumerate() {
			if byte == b'\n' {
				line_starts.push(index + 1);
			}
		}
		Self { line_starts }
	}

	fn line_of(&self, offset: usize) -> usize {
		match self.line_starts.binary_search(&offset) {
			Ok(exact) => exact + 1,
			Err(insert) => insert,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn open_tag_wrappers() {
		let header = parse_open_tag("(TOC) depth=2");
		assert_eq!(header.transform, Some("TOC"));
		assert_eq!(header.raw_args, "depth=2");

		let header = parse_open_tag(" ((CODE)) src=\"./a.js\"");
		assert_eq!(header.transform, Some("CODE"));
		assert_eq!(header.raw_args, "src=\"./a.js\"");

		let header = parse_open_tag("[FILE]");
		assert_eq!(header.transform, Some("FILE"));
		assert_eq!(header.raw_args, "");
	}

	#[test]
	fn open_tag_legacy() {
		let header = parse_open_tag(" (TOC:collapse=true&depth=2)");
		assert_eq!(header.transform, Some("TOC"));
		assert_eq!(header.raw_args, "collapse=true&depth=2");
		assert!(header.is_legacy);

		let header = parse_open_tag(" TOC :depth=2");
		assert!(header.is_legacy);
		assert_eq!(header.raw_args, "depth=2");
	}

	#[test]
	fn open_tag_without_name() {
		let header = parse_open_tag(" src=./a.md");
		assert_eq!(header.transform, None);
		assert_eq!(header.raw_args, "src=./a.md");

		let header = parse_open_tag("");
		assert_eq!(header.transform, None);
	}

	#[test]
	fn line_table_is_one_based() {
		let table = LineTable::new("a\nb\nc");
		assert_eq!(table.line_of(0), 1);
		assert_eq!(table.line_of(1), 1);
		assert_eq!(table.line_of(2), 2);
		assert_eq!(table.line_of(4), 3);
	}
}
