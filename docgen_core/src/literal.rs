use serde_json::Map;
use serde_json::Number;
use serde_json::Value;

/// Parse a relaxed JavaScript-style object, array or string literal into a
/// JSON value.
///
/// Compared to strict JSON this accepts unquoted object keys, bare-word array
/// elements and object values, single quoted and backtick quoted strings, and
/// trailing commas. Returns `None` when the input is not a single complete
/// literal.
pub(crate) fn parse_literal(input: &str) -> Option<Value> {
	let mut parser = LiteralParser::new(input);
	parser.skip_whitespace();

	let value = match parser.peek()? {
		'{' => parser.parse_object()?,
		'[' => parser.parse_array()?,
		'"' | '\'' | '`' => Value::String(parser.parse_string()?),
		_ => return None,
	};

	parser.skip_whitespace();
	parser.is_done().then_some(value)
}

/// Parse a finite numeric literal. Integral values become JSON integers.
pub(crate) fn parse_number(text: &str) -> Option<Value> {
	let text = text.trim();
	if !is_numeric_literal(text) {
		return None;
	}

	if let Ok(integer) = text.parse::<i64>() {
		return Some(Value::from(integer));
	}

	let float = text.parse::<f64>().ok()?;
	if !float.is_finite() {
		return None;
	}

	Number::from_f64(float).map(Value::Number)
}

fn is_numeric_literal(text: &str) -> bool {
	let unsigned = text
		.strip_prefix('-')
		.or_else(|| text.strip_prefix('+'))
		.unwrap_or(text);
	let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
		Some(index) => (&unsigned[..index], Some(&unsigned[index + 1..])),
		None => (unsigned, None),
	};

	let mut digits = 0;
	let mut dots = 0;
	for ch in mantissa.chars() {
		match ch {
			'0'..='9' => digits += 1,
			'.' => dots += 1,
			_ => return false,
		}
	}

	if digits == 0 || dots > 1 {
		return false;
	}

	match exponent {
		None => true,
		Some(exponent) => {
			let exponent = exponent
				.strip_prefix('-')
				.or_else(|| exponent.strip_prefix('+'))
				.unwrap_or(exponent);
			!exponent.is_empty() && exponent.chars().all(|ch| ch.is_ascii_digit())
		}
	}
}

/// Classify a bare word found inside an array or object.
fn atom_to_value(atom: &str) -> Value {
	match atom {
		"true" => Value::Bool(true),
		"false" => Value::Bool(false),
		"null" | "undefined" => Value::Null,
		_ => parse_number(atom).unwrap_or_else(|| Value::String(atom.to_string())),
	}
}

/// Characters that terminate a bare word, depending on the enclosing literal.
#[derive(Clone, Copy)]
enum Container {
	Array,
	Object,
}

impl Container {
	fn terminates(self, ch: char) -> bool {
		match self {
			Self::Array => ch == ',' || ch == ']',
			Self::Object => ch == ',' || ch == '}',
		}
	}
}

struct LiteralParser {
	chars: Vec<char>,
	cursor: usize,
}

impl LiteralParser {
	fn new(input: &str) -> Self {
		Self {
			chars: input.chars().collect(),
			cursor: 0,
		}
	}

	fn peek(&self) -> Option<char> {
		self.chars.get(self.cursor).copied()
	}

	fn bump(&mut self) -> Option<char> {
		let ch = self.peek()?;
		self.cursor += 1;
		Some(ch)
	}

	fn is_done(&self) -> bool {
		self.cursor >= self.chars.len()
	}

	fn skip_whitespace(&mut self) {
		while self.peek().is_some_and(char::is_whitespace) {
			self.cursor += 1;
		}
	}

	fn expect(&mut self, expected: char) -> Option<()> {
		(self.bump()? == expected).then_some(())
	}

	fn parse_value(&mut self, container: Container) -> Option<Value> {
		self.skip_whitespace();

		match self.peek()? {
			'{' => self.parse_object(),
			'[' => self.parse_array(),
			'"' | '\'' | '`' => self.parse_string().map(Value::String),
			_ => {
				let atom = self.parse_atom(container)?;
				Some(atom_to_value(&atom))
			}
		}
	}

	fn parse_object(&mut self) -> Option<Value> {
		self.expect('{')?;
		let mut map = Map::new();

		loop {
			self.skip_whitespace();
			if self.peek()? == '}' {
				self.cursor += 1;
				return Some(Value::Object(map));
			}

			let key = self.parse_key()?;
			self.skip_whitespace();
			self.expect(':')?;
			let value = self.parse_value(Container::Object)?;
			map.insert(key, value);

			self.skip_whitespace();
			match self.bump()? {
				',' => {}
				'}' => return Some(Value::Object(map)),
				_ => return None,
			}
		}
	}

	fn parse_array(&mut self) -> Option<Value> {
		self.expect('[')?;
		let mut items = Vec::new();

		loop {
			self.skip_whitespace();
			if self.peek()? == ']' {
				self.cursor += 1;
				return Some(Value::Array(items));
			}

			items.push(self.parse_value(Container::Array)?);

			self.skip_whitespace();
			match self.bump()? {
				',' => {}
				']' => return Some(Value::Array(items)),
				_ => return None,
			}
		}
	}

	fn parse_key(&mut self) -> Option<String> {
		if matches!(self.peek()?, '"' | '\'' | '`') {
			return self.parse_string();
		}

		let start = self.cursor;
		while let Some(ch) = self.peek() {
			if ch == ':' || ch.is_whitespace() || "{}[],\"'`".contains(ch) {
				break;
			}
			self.cursor += 1;
		}

		(self.cursor > start).then(|| self.chars[start..self.cursor].iter().collect())
	}

	fn parse_atom(&mut self, container: Container) -> Option<String> {
		let start = self.cursor;
		while let Some(ch) = self.peek() {
			if container.terminates(ch) || "{[".contains(ch) {
				break;
			}
			self.cursor += 1;
		}

		let atom: String = self.chars[start..self.cursor].iter().collect();
		let atom = atom.trim();
		(!atom.is_empty()).then(|| atom.to_string())
	}

	fn parse_string(&mut self) -> Option<String> {
		let quote = self.bump()?;
		let mut value = String::new();

		loop {
			let ch = self.bump()?;
			if ch == quote {
				return Some(value);
			}

			if ch != '\\' {
				value.push(ch);
				continue;
			}

			match self.bump()? {
				'n' => value.push('\n'),
				't' => value.push('\t'),
				'r' => value.push('\r'),
				'b' => value.push('\u{8}'),
				'f' => value.push('\u{c}'),
				'0' => value.push('\0'),
				'u' => value.push(self.parse_unicode_escape()?),
				other => value.push(other),
			}
		}
	}

	fn parse_unicode_escape(&mut self) -> Option<char> {
		let mut code = 0u32;
		for _ in 0..4 {
			code = code * 16 + self.bump()?.to_digit(16)?;
		}
		char::from_u32(code)
	}
}
