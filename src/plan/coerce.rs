//! Duck-typed coercion of model output into a JSON object.
//!
//! Generation services are asked for bare JSON but occasionally return it
//! fenced in a Markdown code block, or as a Python-style literal (single
//! quotes, `True`/`None`, trailing commas). The pipeline here is:
//! strip fences → strict JSON parse → permissive literal parse → typed
//! [`ParseFailure`]. Nothing in this module panics on untrusted input.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Errors from coercing raw model output into a JSON object.
#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error("response was empty")]
    Empty,

    #[error("response is not valid JSON ({json}) nor a literal object ({literal})")]
    Invalid { json: String, literal: String },

    #[error("response parsed but is not an object (got {got})")]
    NotAnObject { got: &'static str },
}

/// Strip a surrounding Markdown code fence, including a language tag on the
/// opening line. Text that is not fenced is returned trimmed but otherwise
/// untouched.
pub fn strip_code_fences(s: &str) -> &str {
    let s = s.trim();
    if !s.starts_with("```") {
        return s;
    }
    let lines: Vec<&str> = s.lines().collect();
    if lines.len() >= 2 && lines[lines.len() - 1].trim_start().starts_with("```") {
        let inner_start = s.find('\n').map(|i| i + 1).unwrap_or(s.len());
        let inner_end = s.rfind('\n').unwrap_or(s.len());
        if inner_start <= inner_end {
            return s[inner_start..inner_end].trim();
        }
        // Opening and closing fence with nothing between them.
        return "";
    }
    s
}

/// Coerce raw model output into a JSON object.
///
/// Accepts strict JSON or a Python-style literal, optionally fenced. The
/// top-level value must be an object; anything else is a [`ParseFailure`].
pub fn coerce_object(raw: &str) -> Result<Map<String, Value>, ParseFailure> {
    let txt = strip_code_fences(raw);
    if txt.is_empty() {
        return Err(ParseFailure::Empty);
    }

    let json_err = match serde_json::from_str::<Value>(txt) {
        Ok(v) => return into_object(v),
        Err(e) => e.to_string(),
    };

    match parse_literal(txt) {
        Ok(v) => into_object(v),
        Err(literal) => Err(ParseFailure::Invalid {
            json: json_err,
            literal,
        }),
    }
}

fn into_object(v: Value) -> Result<Map<String, Value>, ParseFailure> {
    match v {
        Value::Object(m) => Ok(m),
        Value::Null => Err(ParseFailure::NotAnObject { got: "null" }),
        Value::Bool(_) => Err(ParseFailure::NotAnObject { got: "bool" }),
        Value::Number(_) => Err(ParseFailure::NotAnObject { got: "number" }),
        Value::String(_) => Err(ParseFailure::NotAnObject { got: "string" }),
        Value::Array(_) => Err(ParseFailure::NotAnObject { got: "array" }),
    }
}

// ---------------------------------------------------------------------------
// Permissive literal parser
// ---------------------------------------------------------------------------

/// Parse a Python-style literal (dict/list/str/number/bool/None) into a
/// [`Value`]. Tolerates single-quoted strings and trailing commas.
fn parse_literal(s: &str) -> Result<Value, String> {
    let chars: Vec<char> = s.chars().collect();
    let mut p = Lit { chars, pos: 0 };
    p.skip_ws();
    let v = p.value()?;
    p.skip_ws();
    if p.pos != p.chars.len() {
        return Err(format!("trailing characters at offset {}", p.pos));
    }
    Ok(v)
}

struct Lit {
    chars: Vec<char>,
    pos: usize,
}

impl Lit {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        match self.bump() {
            Some(got) if got == c => Ok(()),
            Some(got) => Err(format!("expected {c:?}, got {got:?} at offset {}", self.pos)),
            None => Err(format!("expected {c:?}, got end of input")),
        }
    }

    fn value(&mut self) -> Result<Value, String> {
        self.skip_ws();
        match self.peek() {
            Some('{') => self.object(),
            Some('[') => self.array(),
            Some('\'') | Some('"') => Ok(Value::String(self.string()?)),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            Some(_) => self.keyword(),
            None => Err("unexpected end of input".to_string()),
        }
    }

    fn object(&mut self) -> Result<Value, String> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key = match self.peek() {
                Some('\'') | Some('"') => self.string()?,
                other => return Err(format!("expected string key, got {other:?}")),
            };
            self.skip_ws();
            self.expect(':')?;
            let val = self.value()?;
            map.insert(key, val);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some('}') => {}
                other => return Err(format!("expected ',' or '}}', got {other:?}")),
            }
        }
    }

    fn array(&mut self) -> Result<Value, String> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(']') {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some(']') => {}
                other => return Err(format!("expected ',' or ']', got {other:?}")),
            }
        }
    }

    fn string(&mut self) -> Result<String, String> {
        let quote = self.bump().expect("caller checked quote");
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(c) => out.push(c),
                    None => return Err("unterminated escape".to_string()),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => return Err("unterminated string".to_string()),
            }
        }
    }

    fn number(&mut self) -> Result<Value, String> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else if c == '.' || c == 'e' || c == 'E' || c == '+' || c == '-' {
                // exponent signs only make sense after 'e'; accept loosely
                if c == '.' || c == 'e' || c == 'E' {
                    is_float = true;
                }
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            let f: f64 = text.parse().map_err(|e| format!("bad number {text:?}: {e}"))?;
            Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| format!("non-finite number {text:?}"))
        } else {
            let i: i64 = text.parse().map_err(|e| format!("bad number {text:?}: {e}"))?;
            Ok(Value::Number(Number::from(i)))
        }
    }

    fn keyword(&mut self) -> Result<Value, String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            _ => Err(format!("unknown keyword {word:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_plain_fence() {
        let s = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(s), "{\"a\": 1}");
    }

    #[test]
    fn strips_fence_with_language_tag() {
        let s = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(s), "{\"a\": 1}");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn coerces_strict_json() {
        let obj = coerce_object(r#"{"title": "x", "outcomes": []}"#).unwrap();
        assert_eq!(obj["title"], "x");
    }

    #[test]
    fn coerces_fenced_json() {
        let obj = coerce_object("```json\n{\"title\": \"x\"}\n```").unwrap();
        assert_eq!(obj["title"], "x");
    }

    #[test]
    fn coerces_python_literal() {
        let obj = coerce_object("{'title': 'x', 'done': True, 'n': None, 'items': [1, 2,]}")
            .unwrap();
        assert_eq!(obj["title"], "x");
        assert_eq!(obj["done"], true);
        assert_eq!(obj["n"], Value::Null);
        assert_eq!(obj["items"], serde_json::json!([1, 2]));
    }

    #[test]
    fn literal_handles_escapes_and_floats() {
        let obj = coerce_object(r#"{'s': 'a\'b', 'f': -1.5}"#).unwrap();
        assert_eq!(obj["s"], "a'b");
        assert_eq!(obj["f"], -1.5);
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(coerce_object("   "), Err(ParseFailure::Empty)));
        assert!(matches!(
            coerce_object("```\n```"),
            Err(ParseFailure::Empty)
        ));
    }

    #[test]
    fn rejects_non_object_top_level() {
        assert!(matches!(
            coerce_object("[1, 2, 3]"),
            Err(ParseFailure::NotAnObject { got: "array" })
        ));
        assert!(matches!(
            coerce_object("\"just a string\""),
            Err(ParseFailure::NotAnObject { got: "string" })
        ));
    }

    #[test]
    fn rejects_garbage_with_both_errors() {
        let err = coerce_object("this is not anything {{{").unwrap_err();
        match err {
            ParseFailure::Invalid { json, literal } => {
                assert!(!json.is_empty());
                assert!(!literal.is_empty());
            }
            other => panic!("expected Invalid, got: {other}"),
        }
    }
}
