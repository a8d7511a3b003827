//! Reader for data literals embedded in static JavaScript assets.
//!
//! The structured-data source ships its records as `const vacancies = [ ... ];`.
//! Nothing here executes code: the initializer of the requested binding is decoded as
//! a literal (arrays, objects, strings, numbers, booleans, null/undefined) into a
//! `serde_json::Value`. Any other expression is rejected.

use std::time::Instant;

use regex::Regex;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Maximum array/object nesting accepted before giving up.
pub const MAX_DEPTH: usize = 128;

/// How many values are decoded between two deadline checks.
const DEADLINE_CHECK_INTERVAL: u32 = 256;

#[derive(Debug, Error, PartialEq)]
pub enum LiteralError {
    #[error("binding `{0}` not found in script")]
    BindingNotFound(String),

    #[error("unexpected {found} at offset {offset}")]
    Unexpected { found: String, offset: usize },

    #[error("unexpected end of script")]
    UnexpectedEnd,

    #[error("literal nested deeper than {MAX_DEPTH} levels")]
    TooDeep,

    #[error("evaluation budget exceeded")]
    Deadline,

    #[error("template interpolation at offset {0} is not supported")]
    Interpolation(usize),

    #[error("invalid number literal `{0}`")]
    InvalidNumber(String),

    #[error("invalid escape sequence at offset {0}")]
    InvalidEscape(usize),
}

/// Finds `const|let|var <binding> =` (or `window.<binding> =`) and decodes its initializer.
pub fn read_binding(source: &str, binding: &str, deadline: Instant) -> Result<Value, LiteralError> {
    let start = locate_binding(source, binding)
        .ok_or_else(|| LiteralError::BindingNotFound(binding.to_string()))?;

    let mut reader = Reader::new(source, start, deadline);
    reader.skip_trivia()?;
    reader.value(0)
}

/// Byte offset just past the `=` of the first assignment to `binding`.
fn locate_binding(source: &str, binding: &str) -> Option<usize> {
    let pattern = format!(
        r"(?:\b(?:const|let|var)\s+|\bwindow\s*\.\s*){}\s*=",
        regex::escape(binding)
    );
    let re = Regex::new(&pattern).ok()?;

    let found = re
        .find_iter(source)
        .map(|m| m.end())
        // `==`, `===` and `=>` are not assignments
        .find(|&end| !matches!(source[end..].chars().next(), Some('=') | Some('>')));
    found
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
    deadline: Instant,
    steps: u32,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str, pos: usize, deadline: Instant) -> Self {
        Self {
            src,
            pos,
            deadline,
            steps: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn unexpected(&self) -> LiteralError {
        match self.peek() {
            Some(c) => LiteralError::Unexpected {
                found: format!("`{c}`"),
                offset: self.pos,
            },
            None => LiteralError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        if self.peek() == Some(expected) {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn check_budget(&mut self) -> Result<(), LiteralError> {
        self.steps = self.steps.wrapping_add(1);
        if self.steps % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= self.deadline {
            return Err(LiteralError::Deadline);
        }
        Ok(())
    }

    /// Skips whitespace, line comments and block comments.
    fn skip_trivia(&mut self) -> Result<(), LiteralError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() || c == '\u{feff}' => {
                    self.bump();
                }
                Some('/') if self.peek_second() == Some('/') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.peek_second() == Some('*') => {
                    self.pos += 2;
                    match self.src[self.pos..].find("*/") {
                        Some(end) => self.pos += end + 2,
                        None => return Err(LiteralError::UnexpectedEnd),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn value(&mut self, depth: usize) -> Result<Value, LiteralError> {
        if depth > MAX_DEPTH {
            return Err(LiteralError::TooDeep);
        }
        if self.steps == 0 && Instant::now() >= self.deadline {
            return Err(LiteralError::Deadline);
        }
        self.check_budget()?;

        match self.peek() {
            Some('[') => self.array(depth),
            Some('{') => self.object(depth),
            Some('"') | Some('\'') | Some('`') => self.string().map(Value::String),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if is_ident_start(c) => match self.identifier().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                // JSON has no representation for these; serialisation would emit null too
                "null" | "undefined" | "NaN" | "Infinity" => Ok(Value::Null),
                other => Err(LiteralError::Unexpected {
                    found: format!("identifier `{other}`"),
                    offset: self.pos - other.len(),
                }),
            },
            _ => Err(self.unexpected()),
        }
    }

    fn array(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.expect('[')?;
        let mut items = Vec::new();

        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some(']') => {
                    self.bump();
                    return Ok(Value::Array(items));
                }
                // elision: `[a, , b]`
                Some(',') => {
                    self.bump();
                    items.push(Value::Null);
                    continue;
                }
                None => return Err(LiteralError::UnexpectedEnd),
                _ => {}
            }

            items.push(self.value(depth + 1)?);
            self.skip_trivia()?;

            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(']') => {}
                _ => return Err(self.unexpected()),
            }
        }
    }

    fn object(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.expect('{')?;
        let mut map = Map::new();

        loop {
            self.skip_trivia()?;
            let key = match self.peek() {
                Some('}') => {
                    self.bump();
                    return Ok(Value::Object(map));
                }
                Some('"') | Some('\'') => self.string()?,
                Some(c) if c.is_ascii_digit() => match self.number()? {
                    Value::Number(n) => n.to_string(),
                    _ => return Err(self.unexpected()),
                },
                Some(c) if is_ident_start(c) => self.identifier(),
                _ => return Err(self.unexpected()),
            };

            self.skip_trivia()?;
            self.expect(':')?;
            self.skip_trivia()?;
            let value = self.value(depth + 1)?;
            map.insert(key, value);
            self.skip_trivia()?;

            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {}
                _ => return Err(self.unexpected()),
            }
        }
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                self.bump();
            } else {
                break;
            }
        }
        self.src[start..self.pos].to_string()
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let quote = self.bump().ok_or(LiteralError::UnexpectedEnd)?;
        let mut out = String::new();

        loop {
            let offset = self.pos;
            let c = self.bump().ok_or(LiteralError::UnexpectedEnd)?;
            match c {
                c if c == quote => return Ok(out),
                '\\' => self.escape(&mut out, offset)?,
                '$' if quote == '`' && self.peek() == Some('{') => {
                    return Err(LiteralError::Interpolation(offset));
                }
                '\n' | '\r' if quote != '`' => {
                    return Err(LiteralError::Unexpected {
                        found: "line break in string".to_string(),
                        offset,
                    });
                }
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String, offset: usize) -> Result<(), LiteralError> {
        let c = self.bump().ok_or(LiteralError::UnexpectedEnd)?;
        match c {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !self.peek().is_some_and(|d| d.is_ascii_digit()) => out.push('\0'),
            'x' => {
                let code = self.hex_digits(2, offset)?;
                out.push(char::from_u32(code).ok_or(LiteralError::InvalidEscape(offset))?);
            }
            'u' => {
                let code = self.unicode_escape(offset)?;
                // surrogate pair spelled as two `\u` escapes
                if (0xD800..0xDC00).contains(&code)
                    && self.src[self.pos..].starts_with("\\u")
                {
                    let save = self.pos;
                    self.pos += 2;
                    let low = self.unicode_escape(offset)?;
                    if (0xDC00..0xE000).contains(&low) {
                        let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                        out.push(char::from_u32(combined).unwrap_or('\u{fffd}'));
                        return Ok(());
                    }
                    self.pos = save;
                }
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            // line continuation
            '\n' | '\u{2028}' | '\u{2029}' => {}
            '\r' => {
                if self.peek() == Some('\n') {
                    self.bump();
                }
            }
            c if c.is_ascii_digit() => return Err(LiteralError::InvalidEscape(offset)),
            other => out.push(other),
        }
        Ok(())
    }

    fn unicode_escape(&mut self, offset: usize) -> Result<u32, LiteralError> {
        if self.peek() == Some('{') {
            self.bump();
            let start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
            }
            let digits = &self.src[start..self.pos];
            self.expect('}')
                .map_err(|_| LiteralError::InvalidEscape(offset))?;
            return u32::from_str_radix(digits, 16)
                .ok()
                .filter(|&code| code <= 0x10FFFF)
                .ok_or(LiteralError::InvalidEscape(offset));
        }
        self.hex_digits(4, offset)
    }

    fn hex_digits(&mut self, count: usize, offset: usize) -> Result<u32, LiteralError> {
        let digits = self
            .src
            .get(self.pos..self.pos + count)
            .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or(LiteralError::InvalidEscape(offset))?;
        self.pos += count;
        u32::from_str_radix(digits, 16).map_err(|_| LiteralError::InvalidEscape(offset))
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.bump();
                true
            }
            Some('+') => {
                self.bump();
                false
            }
            _ => false,
        };

        if self.peek().is_some_and(is_ident_start) {
            return match self.identifier().as_str() {
                "Infinity" => Ok(Value::Null),
                _ => Err(LiteralError::InvalidNumber(
                    self.src[start..self.pos].to_string(),
                )),
            };
        }

        let radix = match (self.peek(), self.peek_second()) {
            (Some('0'), Some('x' | 'X')) => Some(16),
            (Some('0'), Some('o' | 'O')) => Some(8),
            (Some('0'), Some('b' | 'B')) => Some(2),
            _ => None,
        };

        if let Some(radix) = radix {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
                self.bump();
            }
            let digits = self.src[digits_start..self.pos].replace('_', "");
            let magnitude = i64::from_str_radix(&digits, radix)
                .map_err(|_| LiteralError::InvalidNumber(self.src[start..self.pos].to_string()))?;
            return Ok(Value::Number(Number::from(if negative {
                -magnitude
            } else {
                magnitude
            })));
        }

        let body_start = self.pos;
        let mut prev = '\0';
        while let Some(c) = self.peek() {
            let accepted = c.is_ascii_digit()
                || c == '.'
                || c == '_'
                || matches!(c, 'e' | 'E')
                || (matches!(c, '+' | '-') && matches!(prev, 'e' | 'E'));
            if !accepted {
                break;
            }
            prev = c;
            self.bump();
        }

        let literal = self.src[start..self.pos].to_string();
        let body = self.src[body_start..self.pos].replace('_', "");
        let parsed: f64 = body
            .parse()
            .map_err(|_| LiteralError::InvalidNumber(literal.clone()))?;
        let parsed = if negative { -parsed } else { parsed };

        Ok(js_number(parsed))
    }
}

/// Integral values become JSON integers so they stringify the way the source would.
fn js_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        return Value::Number(Number::from(value as i64));
    }
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || c.is_alphanumeric()
}
