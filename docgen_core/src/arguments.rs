use std::sync::LazyLock;

use regex::Regex;
use serde_json::Map;
use serde_json::Value;

use crate::DocgenError;
use crate::DocgenResult;
use crate::literal::parse_literal;
use crate::literal::parse_number;

/// Parsed block arguments. Keys are unique; when a key is repeated the later
/// value wins.
pub type Options = Map<String, Value>;

/// Maximum nesting of quotes and brackets inside a single argument value.
const MAX_NESTING: usize = 64;

static KEY_VALUE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"^\s*(?:"[^"]*"|'[^']*'|[A-Za-z0-9_$\-]+)\s*:"#)
		.unwrap_or_else(|e| panic!("invalid key/value regex: {e}"))
});

/// Parse the free-form argument text of a block opening tag.
///
/// The text is a whitespace separated list of `key=value` pairs and bare
/// flags. Values may be quoted strings, numbers, booleans or JS-like object
/// and array literals spanning several lines. `//`, `/* */` and `#` comments
/// are ignored.
///
/// ```rust
/// use docgen_core::parse_arguments;
/// use serde_json::json;
///
/// let options = parse_arguments(r#"title="Hello world" depth=2 isCool"#).unwrap();
/// assert_eq!(options["title"], json!("Hello world"));
/// assert_eq!(options["depth"], json!(2));
/// assert_eq!(options["isCool"], json!(true));
/// ```
pub fn parse_arguments(raw: &str) -> DocgenResult<Options> {
	let tokens = Lexer::new(raw).tokenize()?;
	let mut accumulator = Accumulator::default();

	for token in tokens {
		accumulator.push(token);
	}

	Ok(accumulator.finish())
}

/// Parse the legacy `key=value&key2=value2` argument syntax.
pub fn parse_legacy_arguments(raw: &str) -> Options {
	let mut options = Options::new();

	for pair in raw.split('&').map(str::trim).filter(|pair| !pair.is_empty()) {
		let (key, value) = match pair.split_once('=') {
			Some((key, value)) => (key.trim(), convert(value)),
			None => (pair, Value::Bool(true)),
		};

		if is_valid_key(key) {
			options.insert(key.to_string(), value);
		}
	}

	options
}

/// Serialize options back into argument text. Every value is written as
/// JSON so that [`parse_arguments`] reproduces an equal mapping.
pub fn to_argument_string(options: &Options) -> String {
	options
		.iter()
		.map(|(key, value)| format!("{key}={}", value_text(value)))
		.collect::<Vec<_>>()
		.join(" ")
}

/// JSON text for a single value. An array that opens with a nested array is
/// written as `[ [...] ]` so [`convert`] never mistakes it for a doubled
/// wrapper.
fn value_text(value: &Value) -> String {
	let text = value.to_string();
	match text.strip_prefix("[[") {
		Some(rest) => format!("[ [{rest}"),
		None => text,
	}
}

/// Coerce a raw argument value into a typed value.
///
/// `true`/`false`/`null` and finite numbers are converted directly. Doubled
/// wrappers like `{{ ... }}` are collapsed, a redundant `{...}` around a
/// scalar is removed, and object or array literals are parsed leniently.
/// Anything else becomes a string, with one layer of matching quotes
/// stripped.
pub fn convert(raw: &str) -> Value {
	let trimmed = raw.trim();
	let value = trimmed.strip_suffix(',').map_or(trimmed, str::trim_end);

	match value {
		"true" => return Value::Bool(true),
		"false" => return Value::Bool(false),
		"null" => return Value::Null,
		_ => {}
	}

	if let Some(number) = parse_number(value) {
		return number;
	}

	if let Some(inner) = collapse_double_wrapper(value) {
		return convert(inner);
	}

	if let Some(inner) = strip_redundant_braces(value) {
		return convert(inner);
	}

	if let Some(literal) = parse_literal(value) {
		return literal;
	}

	if let Some(inner) = strip_matching_quotes(value) {
		return Value::String(inner.to_string());
	}

	if let Some(items) = split_bracket_list(value) {
		return Value::Array(items);
	}

	Value::String(value.to_string())
}

/// Returns true when every `(`, `[` and `{` outside of quotes has a matching
/// closing character, in order.
pub fn is_balanced(text: &str) -> bool {
	let mut stack = Vec::new();
	let mut quote: Option<char> = None;
	let mut escaped = false;

	for ch in text.chars() {
		if let Some(open) = quote {
			if escaped {
				escaped = false;
			} else if ch == '\\' {
				escaped = true;
			} else if ch == open {
				quote = None;
			}
			continue;
		}

		match ch {
			'"' | '\'' | '`' => quote = Some(ch),
			'(' | '[' | '{' => stack.push(ch),
			')' | ']' | '}' => {
				if stack.pop() != Some(opening_for(ch)) {
					return false;
				}
			}
			_ => {}
		}
	}

	stack.is_empty()
}

fn opening_for(close: char) -> char {
	match close {
		')' => '(',
		']' => '[',
		_ => '{',
	}
}

/// Find the byte index of the character that closes the bracket at `open`,
/// skipping over quoted text.
fn matching_close(text: &str, open: usize) -> Option<usize> {
	let mut depth = 0usize;
	let mut quote: Option<char> = None;
	let mut escaped = false;

	for (index, ch) in text[open..].char_indices() {
		if let Some(current) = quote {
			if escaped {
				escaped = false;
			} else if ch == '\\' {
				escaped = true;
			} else if ch == current {
				quote = None;
			}
			continue;
		}

		match ch {
			'"' | '\'' | '`' => quote = Some(ch),
			'(' | '[' | '{' => depth += 1,
			')' | ']' | '}' => {
				depth = depth.checked_sub(1)?;
				if depth == 0 {
					return Some(open + index);
				}
			}
			_ => {}
		}
	}

	None
}

/// `{{ x }}` becomes `{ x }` and `[[ x ]]` becomes `[ x ]`, but only when the
/// inner pair really encloses the whole value, so `[[1, 2], [3, 4]]` is left
/// intact.
fn collapse_double_wrapper(value: &str) -> Option<&str> {
	let doubled = (value.starts_with("{{") && value.ends_with("}}"))
		|| (value.starts_with("[[") && value.ends_with("]]"));
	if !doubled || value.len() < 4 {
		return None;
	}

	let last = value.len() - 1;
	if matching_close(value, 0)? != last || matching_close(value, 1)? != last - 1 {
		return None;
	}

	Some(&value[1..last])
}

/// `{true}` becomes `true` and `{"text"}` becomes `"text"`, while
/// `{ key: value }` stays an object.
fn strip_redundant_braces(value: &str) -> Option<&str> {
	if !value.starts_with('{') || matching_close(value, 0)? != value.len() - 1 {
		return None;
	}

	let inner = value[1..value.len() - 1].trim();
	if inner.is_empty() || KEY_VALUE_SHAPE.is_match(inner) || !is_balanced(inner) {
		return None;
	}

	Some(inner)
}

fn strip_matching_quotes(value: &str) -> Option<&str> {
	['"', '\'', '`'].into_iter().find_map(|quote| {
		value
			.strip_prefix(quote)
			.and_then(|rest| rest.strip_suffix(quote))
	})
}

/// Fallback for lists of bare words that the literal parser rejects, e.g.
/// `[first item, second item]`.
fn split_bracket_list(value: &str) -> Option<Vec<Value>> {
	let inner = value.strip_prefix('[')?.strip_suffix(']')?;
	let items = inner
		.split(',')
		.map(str::trim)
		.filter(|item| !item.is_empty())
		.map(convert)
		.collect();

	Some(items)
}

/// Keys must be non-empty and must not look like a stray CLI flag or an
/// emoji decoration.
fn is_valid_key(key: &str) -> bool {
	let Some(first) = key.chars().next() else {
		return false;
	};

	first != '-' && !is_emoji(first)
}

fn is_emoji(ch: char) -> bool {
	matches!(
		ch as u32,
		0x1F000..=0x1FAFF | 0x2600..=0x27BF | 0x2B00..=0x2BFF | 0xFE0F
	)
}

/// Tokenizer nesting frames. The top of the stack is the current state and
/// `Default` is implied when the stack is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
	Default,
	InSingleQuote,
	InDoubleQuote,
	InBacktick,
	InBraces(usize),
	InBrackets(usize),
	InParens(usize),
}

impl LexState {
	fn closing_quote(self) -> Option<char> {
		match self {
			Self::InSingleQuote => Some('\''),
			Self::InDoubleQuote => Some('"'),
			Self::InBacktick => Some('`'),
			_ => None,
		}
	}

	fn closes_with(self, ch: char) -> bool {
		matches!(
			(self, ch),
			(Self::InBraces(_), '}') | (Self::InBrackets(_), ']') | (Self::InParens(_), ')')
		)
	}

	fn describe(self) -> String {
		match self {
			Self::Default => "argument".to_string(),
			Self::InSingleQuote => "single quoted string".to_string(),
			Self::InDoubleQuote => "double quoted string".to_string(),
			Self::InBacktick => "backtick string".to_string(),
			Self::InBraces(depth) => format!("`{{` block (depth {depth})"),
			Self::InBrackets(depth) => format!("`[` list (depth {depth})"),
			Self::InParens(depth) => format!("`(` group (depth {depth})"),
		}
	}
}

/// A whitespace separated chunk of argument text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawToken {
	text: String,
	/// Byte offset of the first `=` outside of quotes and brackets.
	equals: Option<usize>,
}

struct Lexer {
	chars: Vec<char>,
	cursor: usize,
	stack: Vec<LexState>,
	current: String,
	equals: Option<usize>,
	line_is_blank: bool,
	tokens: Vec<RawToken>,
}

impl Lexer {
	fn new(raw: &str) -> Self {
		Self {
			chars: raw.chars().collect(),
			cursor: 0,
			stack: Vec::new(),
			current: String::new(),
			equals: None,
			line_is_blank: true,
			tokens: Vec::new(),
		}
	}

	fn state(&self) -> LexState {
		self.stack.last().copied().unwrap_or(LexState::Default)
	}

	fn peek_next(&self) -> Option<char> {
		self.chars.get(self.cursor + 1).copied()
	}

	/// Quotes and comments only start at the beginning of a value or right
	/// after a delimiter.
	fn at_boundary(&self) -> bool {
		self.current
			.chars()
			.last()
			.is_none_or(|ch| ch.is_whitespace() || "=:{[(,".contains(ch))
	}

	/// Comments must be separated from the preceding text by whitespace so
	/// that values like `https://example.com` survive.
	fn at_comment_boundary(&self) -> bool {
		self.current.chars().last().is_none_or(char::is_whitespace)
	}

	fn finish_token(&mut self) {
		if self.current.is_empty() {
			return;
		}

		self.tokens.push(RawToken {
			text: std::mem::take(&mut self.current),
			equals: self.equals.take(),
		});
	}

	fn skip_line_comment(&mut self) {
		while self.chars.get(self.cursor).is_some_and(|ch| *ch != '\n') {
			self.cursor += 1;
		}
	}

	fn skip_block_comment(&mut self) {
		self.cursor += 2;
		while self.cursor < self.chars.len() {
			if self.chars[self.cursor] == '*' && self.peek_next() == Some('/') {
				self.cursor += 2;
				return;
			}
			self.cursor += 1;
		}
	}

	fn open(&mut self, state: LexState) -> DocgenResult<()> {
		if self.stack.len() >= MAX_NESTING {
			return Err(DocgenError::ArgumentSyntax(format!(
				"values nested deeper than {MAX_NESTING} levels"
			)));
		}

		self.stack.push(state);
		Ok(())
	}

	fn tokenize(mut self) -> DocgenResult<Vec<RawToken>> {
		while let Some(&ch) = self.chars.get(self.cursor) {
			let state = self.state();

			if let Some(quote) = state.closing_quote() {
				self.current.push(ch);
				if ch == '\\' {
					if let Some(next) = self.peek_next() {
						self.current.push(next);
						self.cursor += 1;
					}
				} else if ch == quote {
					self.stack.pop();
				}
				self.cursor += 1;
				continue;
			}

			if ch == '/' && self.at_comment_boundary() {
				match self.peek_next() {
					Some('/') => {
						self.skip_line_comment();
						continue;
					}
					Some('*') => {
						self.skip_block_comment();
						continue;
					}
					_ => {}
				}
			}

			if ch == '#' && self.line_is_blank {
				self.skip_line_comment();
				continue;
			}

			if ch == '\n' {
				self.line_is_blank = true;
			} else if !ch.is_whitespace() {
				self.line_is_blank = false;
			}

			let depth = self.stack.len() + 1;
			match ch {
				c if c.is_whitespace() && self.stack.is_empty() => self.finish_token(),
				'"' if self.at_boundary() => {
					self.current.push(ch);
					self.open(LexState::InDoubleQuote)?;
				}
				'\'' if self.at_boundary() => {
					self.current.push(ch);
					self.open(LexState::InSingleQuote)?;
				}
				'`' if self.at_boundary() => {
					self.current.push(ch);
					self.open(LexState::InBacktick)?;
				}
				'{' => {
					self.current.push(ch);
					self.open(LexState::InBraces(depth))?;
				}
				'[' => {
					self.current.push(ch);
					self.open(LexState::InBrackets(depth))?;
				}
				'(' => {
					self.current.push(ch);
					self.open(LexState::InParens(depth))?;
				}
				'}' | ']' | ')' => {
					if !state.closes_with(ch) {
						return Err(DocgenError::ArgumentSyntax(format!(
							"unexpected `{ch}` in {}",
							state.describe()
						)));
					}
					self.stack.pop();
					self.current.push(ch);
				}
				'=' if self.stack.is_empty() && self.equals.is_none() => {
					self.equals = Some(self.current.len());
					self.current.push(ch);
				}
				_ => self.current.push(ch),
			}

			self.cursor += 1;
		}

		if let Some(state) = self.stack.last() {
			return Err(DocgenError::ArgumentSyntax(format!(
				"unterminated {}",
				state.describe()
			)));
		}

		self.finish_token();
		Ok(self.tokens)
	}
}

/// A key that is still waiting for either `=` or its value.
#[derive(Debug)]
struct Pending {
	key: String,
	awaiting_value: bool,
}

/// Fold state threaded through the token stream. The pending key never ends
/// up in the returned mapping unless it is committed.
#[derive(Debug, Default)]
struct Accumulator {
	pairs: Options,
	pending: Option<Pending>,
}

impl Accumulator {
	fn push(&mut self, token: RawToken) {
		let RawToken { text, equals } = token;
		if text.chars().all(|ch| ch == ',') {
			return;
		}

		match equals {
			Some(0) => {
				let rest = &text[1..];
				match self.pending.take() {
					Some(pending) if rest.is_empty() => {
						self.pending = Some(Pending {
							key: pending.key,
							awaiting_value: true,
						});
					}
					Some(pending) => self.commit(&pending.key, Some(rest)),
					None => {}
				}
			}
			Some(index) => {
				self.flush_pending();
				let (key, value) = (&text[..index], &text[index + 1..]);
				if value.is_empty() {
					self.pending = Some(Pending {
						key: key.to_string(),
						awaiting_value: true,
					});
				} else {
					self.commit(key, Some(value));
				}
			}
			None => {
				match self.pending.take() {
					Some(pending) if pending.awaiting_value => {
						self.commit(&pending.key, Some(&text));
					}
					Some(pending) => {
						self.commit(&pending.key, None);
						self.pending = Some(Pending {
							key: text,
							awaiting_value: false,
						});
					}
					None => {
						self.pending = Some(Pending {
							key: text,
							awaiting_value: false,
						});
					}
				}
			}
		}
	}

	/// A key without a value is a boolean flag.
	fn flush_pending(&mut self) {
		if let Some(pending) = self.pending.take() {
			self.commit(&pending.key, None);
		}
	}

	fn commit(&mut self, key: &str, raw_value: Option<&str>) {
		let key = key.trim().trim_end_matches(',');
		if !is_valid_key(key) {
			return;
		}

		let value = raw_value.map_or(Value::Bool(true), convert);
		self.pairs.insert(key.to_string(), value);
	}

	fn finish(mut self) -> Options {
		self.flush_pending();
		self.pairs
	}
}
