//! mongo shell literals to JSON
//!
//! Documentation examples are written in shell syntax: unquoted keys,
//! single-quoted strings, trailing commas, comments and constructor calls
//! such as `ObjectId("...")` or `ISODate("...")`. This module turns them
//! into canonical extended JSON values that `bson` can read back.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Malformed shell input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct ShellError {
    /// Byte offset into the source
    pub offset: usize,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, ShellError>;

/// Converts exactly one shell value
pub fn to_json(src: &str) -> Result<Value> {
    let mut parser = Parser::new(src);
    parser.skip_ws()?;
    let value = parser.value()?;
    parser.skip_ws()?;
    parser.expect_end()?;
    Ok(value)
}

/// Converts a comma separated argument list, as found between call parentheses
pub fn to_json_list(src: &str) -> Result<Vec<Value>> {
    let mut parser = Parser::new(src);
    let mut values = Vec::new();
    parser.skip_ws()?;
    while !parser.at_end() {
        values.push(parser.value()?);
        parser.skip_ws()?;
        if !parser.eat(b',') {
            break;
        }
        parser.skip_ws()?;
    }
    parser.expect_end()?;
    Ok(values)
}

/// Converts printed results: documents separated by whitespace or commas,
/// with top-level arrays flattened
pub fn documents(src: &str) -> Result<Vec<Value>> {
    let mut parser = Parser::new(src);
    let mut values = Vec::new();
    parser.skip_ws()?;
    while !parser.at_end() {
        match parser.value()? {
            Value::Array(items) => values.extend(items),
            other => values.push(other),
        }
        parser.skip_ws()?;
        if parser.eat(b',') {
            parser.skip_ws()?;
        }
    }
    Ok(values)
}

/// Argument text of every `method(...)` call in `src`, in order
///
/// Parentheses inside strings and comments are ignored. An unbalanced call
/// ends the scan.
pub fn calls<'a>(src: &'a str, method: &str) -> Vec<&'a str> {
    let needle = format!("{}(", method);
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(rel) = src[from..].find(&needle) {
        let start = from + rel;
        let preceded_by_ident = src[..start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$');
        let open = start + needle.len();
        if preceded_by_ident {
            from = open;
            continue;
        }
        match matching_paren(src, open) {
            Some(close) => {
                found.push(&src[open..close]);
                from = close + 1;
            }
            None => break,
        }
    }
    found
}

/// Index of the `)` closing a call whose arguments start at `open`
fn matching_paren(src: &str, open: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut depth = 1usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T> {
        Err(ShellError {
            offset: self.pos,
            message: message.into(),
        })
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, b: u8) -> Result<()> {
        if self.eat(b) {
            Ok(())
        } else {
            self.error(format!("expected '{}'", b as char))
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            self.error("unexpected trailing input")
        }
    }

    /// Skips whitespace and both comment styles
    fn skip_ws(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if self.bytes.get(self.pos + 1) == Some(&b'/') => {
                    while !self.at_end() && self.peek() != Some(b'\n') {
                        self.pos += 1;
                    }
                }
                Some(b'/') if self.bytes.get(self.pos + 1) == Some(&b'*') => {
                    match self.src[self.pos + 2..].find("*/") {
                        Some(end) => self.pos += end + 4,
                        None => return self.error("unterminated comment"),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn value(&mut self) -> Result<Value> {
        match self.peek() {
            Some(b'{') => self.object(),
            Some(b'[') => self.array(),
            Some(b'"') | Some(b'\'') => self.string().map(Value::String),
            Some(b'/') => self.regex(),
            Some(b) if b == b'-' || b == b'+' || b == b'.' || b.is_ascii_digit() => self.number(),
            Some(b) if b.is_ascii_alphabetic() || b == b'_' || b == b'$' => self.word(),
            Some(_) => self.error("unexpected character"),
            None => self.error("unexpected end of input"),
        }
    }

    fn object(&mut self) -> Result<Value> {
        self.expect(b'{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws()?;
            if self.eat(b'}') {
                return Ok(Value::Object(map));
            }
            let key = self.key()?;
            self.skip_ws()?;
            self.expect(b':')?;
            self.skip_ws()?;
            let value = self.value()?;
            map.insert(key, value);
            self.skip_ws()?;
            if !self.eat(b',') {
                self.skip_ws()?;
                self.expect(b'}')?;
                return Ok(Value::Object(map));
            }
        }
    }

    fn key(&mut self) -> Result<String> {
        match self.peek() {
            Some(b'"') | Some(b'\'') => self.string(),
            Some(b) if b.is_ascii_alphanumeric() || b == b'_' || b == b'$' => {
                let start = self.pos;
                while let Some(b) = self.peek() {
                    if b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'.' {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                Ok(self.src[start..self.pos].to_string())
            }
            _ => self.error("expected a field name"),
        }
    }

    fn array(&mut self) -> Result<Value> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        loop {
            self.skip_ws()?;
            if self.eat(b']') {
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            self.skip_ws()?;
            if !self.eat(b',') {
                self.skip_ws()?;
                self.expect(b']')?;
                return Ok(Value::Array(items));
            }
        }
    }

    fn string(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q as char,
            _ => return self.error("expected a string"),
        };
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        let mut chars = self.src[self.pos..].char_indices();
        while let Some((offset, c)) = chars.next() {
            match c {
                c if c == quote => {
                    self.pos += offset + 1;
                    return Ok(out);
                }
                '\\' => {
                    let Some((_, escaped)) = chars.next() else {
                        break;
                    };
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        'u' => {
                            let hex: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
                            match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                                Some(c) => out.push(c),
                                None => {
                                    self.pos += offset;
                                    return self.error("invalid unicode escape");
                                }
                            }
                        }
                        other => out.push(other),
                    }
                }
                c => out.push(c),
            }
        }
        self.pos = start;
        self.error("unterminated string")
    }

    fn number(&mut self) -> Result<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-') | Some(b'+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => self.pos += 1,
                b'.' | b'e' | b'E' => {
                    is_float = true;
                    self.pos += 1;
                    if matches!(b, b'e' | b'E') && matches!(self.peek(), Some(b'-') | Some(b'+')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
        let text = self.src[start..self.pos].trim_start_matches('+');
        if !is_float {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Value::from(n));
            }
        }
        match text.parse::<f64>().ok().and_then(Number::from_f64) {
            Some(n) => Ok(Value::Number(n)),
            None => {
                self.pos = start;
                self.error(format!("invalid number '{}'", text))
            }
        }
    }

    fn regex(&mut self) -> Result<Value> {
        let start = self.pos;
        self.expect(b'/')?;
        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            let Some(c) = self.src[self.pos..].chars().next() else {
                self.pos = start;
                return self.error("unterminated regular expression");
            };
            self.pos += c.len_utf8();
            match c {
                '\\' => {
                    pattern.push(c);
                    if let Some(next) = self.src[self.pos..].chars().next() {
                        pattern.push(next);
                        self.pos += next.len_utf8();
                    }
                }
                '[' => {
                    in_class = true;
                    pattern.push(c);
                }
                ']' => {
                    in_class = false;
                    pattern.push(c);
                }
                '/' if !in_class => break,
                '\n' => {
                    self.pos = start;
                    return self.error("unterminated regular expression");
                }
                c => pattern.push(c),
            }
        }
        let mut options: Vec<char> = Vec::new();
        while let Some(b) = self.peek().filter(u8::is_ascii_alphabetic) {
            options.push(b as char);
            self.pos += 1;
        }
        options.sort_unstable();
        Ok(serde_json::json!({
            "$regularExpression": {
                "pattern": pattern,
                "options": options.into_iter().collect::<String>(),
            }
        }))
    }

    /// Keywords and constructor calls
    fn word(&mut self) -> Result<Value> {
        let start = self.pos;
        let mut name = self.identifier();
        if name == "new" {
            self.skip_ws()?;
            name = self.identifier();
        }
        match name {
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            "null" | "undefined" => return Ok(Value::Null),
            _ => {}
        }

        self.skip_ws()?;
        if self.peek() != Some(b'(') {
            self.pos = start;
            return self.error(format!("unknown identifier '{}'", name));
        }
        let args = self.arguments()?;
        let constructed = match (name, args.as_slice()) {
            ("ObjectId", [Value::String(hex)]) => Some(serde_json::json!({ "$oid": hex })),
            ("ISODate" | "Date", [Value::String(date)]) => Some(serde_json::json!({ "$date": date })),
            ("ISODate" | "Date", [Value::Number(millis)]) => millis
                .as_i64()
                .map(|ms| serde_json::json!({ "$date": { "$numberLong": ms.to_string() } })),
            ("NumberLong", [value]) => {
                number_text(value).map(|n| serde_json::json!({ "$numberLong": n }))
            }
            ("NumberInt", [value]) => number_text(value)
                .and_then(|n| n.parse::<i32>().ok())
                .map(Value::from),
            ("NumberDecimal", [value]) => {
                number_text(value).map(|n| serde_json::json!({ "$numberDecimal": n }))
            }
            ("Timestamp", [Value::Number(t), Value::Number(i)]) => {
                Some(serde_json::json!({ "$timestamp": { "t": t, "i": i } }))
            }
            _ => None,
        };
        match constructed {
            Some(value) => Ok(value),
            None => {
                self.pos = start;
                self.error(format!("unsupported call {}({} arguments)", name, args.len()))
            }
        }
    }

    fn identifier(&mut self) -> &'a str {
        let src = self.src;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'$' {
                self.pos += 1;
            } else {
                break;
            }
        }
        &src[start..self.pos]
    }

    fn arguments(&mut self) -> Result<Vec<Value>> {
        self.expect(b'(')?;
        let mut args = Vec::new();
        loop {
            self.skip_ws()?;
            if self.eat(b')') {
                return Ok(args);
            }
            args.push(self.value()?);
            self.skip_ws()?;
            if !self.eat(b',') {
                self.skip_ws()?;
                self.expect(b')')?;
                return Ok(args);
            }
        }
    }
}

/// Digits of a numeric constructor argument, given as a number or a string
fn number_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_relaxed_object_syntax() {
        let value = to_json(
            "{ _id: 'G1', \"score\": 31, nested: { a.b: [1, 2.5, -3,], }, // trailing\n ok: true, gone: null }",
        )
        .unwrap();
        assert_eq!(
            value,
            json!({ "_id": "G1", "score": 31, "nested": { "a.b": [1, 2.5, -3] }, "ok": true, "gone": null })
        );
    }

    #[test]
    fn test_constructors() {
        let value = to_json(
            "{ id: ObjectId(\"5ad88534e3632e1a35a58d00\"), at: ISODate('2021-01-01T00:00:00Z'), \
             born: new Date(\"2020-05-01\"), qty: NumberLong(5), small: NumberInt('7'), \
             price: NumberDecimal(\"12.50\"), ts: Timestamp(1, 2) }",
        )
        .unwrap();
        assert_eq!(
            value,
            json!({
                "id": { "$oid": "5ad88534e3632e1a35a58d00" },
                "at": { "$date": "2021-01-01T00:00:00Z" },
                "born": { "$date": "2020-05-01" },
                "qty": { "$numberLong": "5" },
                "small": 7,
                "price": { "$numberDecimal": "12.50" },
                "ts": { "$timestamp": { "t": 1, "i": 2 } },
            })
        );
    }

    #[test]
    fn test_regex_literal() {
        let value = to_json("{ name: /^pep[é]/mi }").unwrap();
        assert_eq!(
            value,
            json!({ "name": { "$regularExpression": { "pattern": "^pep[é]", "options": "im" } } })
        );
    }

    #[test]
    fn test_strings_keep_unicode_and_escapes() {
        assert_eq!(to_json("'Pepé Le Pew'").unwrap(), json!("Pepé Le Pew"));
        assert_eq!(to_json(r#""a\"b\nA""#).unwrap(), json!("a\"b\nA"));
    }

    #[test]
    fn test_documents_sequence() {
        let docs = documents("{ _id: 'G1' }\n{ _id: 'G2' },\n[ { _id: 'G3' } ]").unwrap();
        assert_eq!(docs, vec![json!({"_id": "G1"}), json!({"_id": "G2"}), json!({"_id": "G3"})]);
    }

    #[test]
    fn test_argument_list() {
        let args = to_json_list("[ { $match: {} } ], { allowDiskUse: true }").unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args[1], json!({ "allowDiskUse": true }));
        assert!(to_json_list("  ").unwrap().is_empty());
    }

    #[test]
    fn test_errors_name_the_offset() {
        let err = to_json("{ a: 1, b: ... }").unwrap_err();
        assert_eq!(err.offset, 11);
        assert!(err.to_string().ends_with("at offset 11"));

        let err = to_json("{ a: 'open }").unwrap_err();
        assert_eq!(err.message, "unterminated string");
        assert_eq!(err.offset, 5);

        assert!(to_json("{ a: Math.random() }").is_err());
        assert!(to_json("ObjectId()").is_err());
        assert!(to_json("[1] 2").is_err());
    }

    #[test]
    fn test_calls() {
        let src = "db.games.insertMany([{ a: ')' }])\n// db.x.insertMany(\ndb.games.aggregate([ { $sort: { score: -1 } } ])";
        assert_eq!(calls(src, "insertMany"), vec!["[{ a: ')' }]"]);
        assert_eq!(calls(src, "aggregate"), vec!["[ { $sort: { score: -1 } } ]"]);
        assert!(calls("db.c.myaggregate([])", "aggregate").is_empty());
    }
}
