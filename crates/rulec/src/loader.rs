//! Parses the textual rule document into records conforming to the schema
//! catalog.
//!
//! The format is nested `field: value` groups: sub-records in braces,
//! repeated fields by repetition, enum values by bare symbol, `#` comments
//! to end of line.

use crate::compile::{CompileErrorKind, CompilerError};
use crate::record::{Record, Value};
use crate::schema::{self, FieldKind, MessageDescriptor};

/// Parses a complete document as the root `Rules` record.
pub fn parse_rules(input: &str) -> Result<Record, CompilerError> {
    let catalog = schema::catalog();
    let rules_desc = catalog.message("Rules").ok_or_else(|| {
        CompilerError::new(
            CompileErrorKind::Internal,
            "catalog is missing the Rules message".to_string(),
        )
    })?;
    let mut cursor = Cursor::new(input);
    let record = parse_record(rules_desc, &mut cursor, false)?;
    cursor.skip_trivia();
    if let Some(c) = cursor.peek() {
        return Err(cursor.error(format!("unexpected {c:?} after top-level fields")));
    }
    Ok(record)
}

/// Builds the effective input from a main document plus extension fragments,
/// concatenated in sorted-by-path order so the result is independent of
/// filesystem enumeration order.
pub fn effective_input(main: &str, mut fragments: Vec<(String, String)>) -> String {
    fragments.sort_by(|a, b| a.0.cmp(&b.0));
    let mut out = String::with_capacity(
        main.len() + fragments.iter().map(|(_, src)| src.len() + 1).sum::<usize>(),
    );
    out.push_str(main);
    for (_, src) in &fragments {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(src);
    }
    out
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, line: 1 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn error(&self, message: String) -> CompilerError {
        CompilerError::new(
            CompileErrorKind::Parse,
            format!("line {}: {}", self.line, message),
        )
    }

    fn ident(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                self.bump();
            } else {
                break;
            }
        }
        if self.pos == start {
            None
        } else {
            Some(&self.src[start..self.pos])
        }
    }

    fn expect(&mut self, want: char) -> Result<(), CompilerError> {
        match self.peek() {
            Some(c) if c == want => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected {want:?}, found {c:?}"))),
            None => Err(self.error(format!("expected {want:?}, found end of input"))),
        }
    }

    fn string_literal(&mut self) -> Result<String, CompilerError> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal".to_string())),
                Some('"') => return Ok(out),
                Some('\n') => {
                    return Err(self.error("newline inside string literal".to_string()))
                }
                Some('\\') => match self.bump() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some(c) => {
                        return Err(self.error(format!("unknown string escape {c:?}")))
                    }
                    None => return Err(self.error("unterminated string literal".to_string())),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn int_literal(&mut self) -> Result<i64, CompilerError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        self.src[start..self.pos]
            .parse::<i64>()
            .map_err(|_| self.error(format!("bad integer literal {:?}", &self.src[start..self.pos])))
    }
}

fn parse_record(
    desc: &'static MessageDescriptor,
    cursor: &mut Cursor<'_>,
    braced: bool,
) -> Result<Record, CompilerError> {
    let mut record = Record::new(desc.name);
    loop {
        cursor.skip_trivia();
        match cursor.peek() {
            None => {
                if braced {
                    return Err(cursor.error(format!("unexpected end of input in {}", desc.name)));
                }
                return Ok(record);
            }
            Some('}') if braced => {
                cursor.bump();
                return Ok(record);
            }
            _ => {}
        }
        let Some(field_name) = cursor.ident() else {
            let c = cursor.peek().unwrap_or('\0');
            return Err(cursor.error(format!("expected a field name in {}, found {c:?}", desc.name)));
        };
        let Some(field) = desc.field(field_name) else {
            return Err(cursor.error(format!("unknown field {:?} in {}", field_name, desc.name)));
        };

        cursor.skip_trivia();
        let value = if let FieldKind::Message(target) = field.kind {
            // Sub-records accept both `field { ... }` and `field: { ... }`.
            if cursor.peek() == Some(':') {
                cursor.bump();
                cursor.skip_trivia();
            }
            cursor.expect('{')?;
            let target_desc = schema::catalog().message(target).ok_or_else(|| {
                CompilerError::new(
                    CompileErrorKind::Internal,
                    format!("catalog is missing message {target}"),
                )
            })?;
            Value::Record(parse_record(target_desc, cursor, true)?)
        } else {
            cursor.expect(':')?;
            cursor.skip_trivia();
            parse_scalar(field.name, field.kind, cursor)?
        };

        if field.repeated {
            record.push(field.name, value);
        } else if record.get(field.name).is_some() {
            return Err(cursor.error(format!(
                "duplicate value for singular field {}.{}",
                desc.name, field.name
            )));
        } else {
            record.set(field.name, value);
        }
    }
}

fn parse_scalar(
    field_name: &str,
    kind: FieldKind,
    cursor: &mut Cursor<'_>,
) -> Result<Value, CompilerError> {
    match kind {
        FieldKind::Str => {
            if cursor.peek() != Some('"') {
                return Err(cursor.error(format!("field {field_name} expects a quoted string")));
            }
            Ok(Value::Str(cursor.string_literal()?))
        }
        FieldKind::Int => {
            if !matches!(cursor.peek(), Some(c) if c == '-' || c.is_ascii_digit()) {
                return Err(cursor.error(format!("field {field_name} expects an integer")));
            }
            Ok(Value::Int(cursor.int_literal()?))
        }
        FieldKind::Bool => {
            let Some(word) = cursor.ident() else {
                return Err(cursor.error(format!("field {field_name} expects true or false")));
            };
            match word {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                other => {
                    Err(cursor.error(format!("field {field_name} expects true or false, found {other:?}")))
                }
            }
        }
        FieldKind::Enum(enum_name) => {
            let desc = schema::catalog().enum_by_name(enum_name).ok_or_else(|| {
                CompilerError::new(
                    CompileErrorKind::Internal,
                    format!("catalog is missing enum {enum_name}"),
                )
            })?;
            let Some(sym) = cursor.ident() else {
                return Err(cursor.error(format!("field {field_name} expects a {enum_name} value")));
            };
            if !desc.has_value(sym) {
                return Err(cursor.error(format!("{sym:?} is not a value of {enum_name}")));
            }
            Ok(Value::EnumSym(sym.to_string()))
        }
        FieldKind::Message(_) => Err(CompilerError::new(
            CompileErrorKind::Internal,
            format!("field {field_name}: message kind reached scalar parser"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tag_spec_name;

    #[test]
    fn parses_nested_records_and_repetition() {
        let doc = r#"
            # a tiny rule set
            tags: {
              tag_name: "LINK"
              html_format: HTML
              html_format: ADS
              attrs: { name: "href" }
              attrs: { name: "rel" mandatory: true }
            }
            attr_lists: {
              name: "common"
              attrs: { name: "title" }
            }
        "#;
        let rules = parse_rules(doc).expect("document must parse");
        let tags = rules.get_list("tags").expect("tags present");
        assert_eq!(tags.len(), 1);
        let Value::Record(tag) = &tags[0] else {
            panic!("tags element must be a record")
        };
        assert_eq!(tag_spec_name(tag), "link");
        assert_eq!(tag.get_list("html_format").map(<[Value]>::len), Some(2));
        assert_eq!(tag.get_list("attrs").map(<[Value]>::len), Some(2));
    }

    #[test]
    fn rejects_unknown_field_with_line() {
        let err = parse_rules("tags: {\n  no_such_field: \"x\"\n}").expect_err("must reject");
        assert_eq!(err.kind, CompileErrorKind::Parse);
        assert!(err.message.contains("line 2"), "{}", err.message);
        assert!(err.message.contains("no_such_field"), "{}", err.message);
    }

    #[test]
    fn rejects_unknown_enum_value() {
        let err = parse_rules("tags: { tag_name: \"A\" html_format: PRINT }")
            .expect_err("must reject");
        assert!(err.message.contains("PRINT"), "{}", err.message);
    }

    #[test]
    fn rejects_duplicate_singular_field() {
        let err = parse_rules("tags: { tag_name: \"A\" tag_name: \"B\" }")
            .expect_err("must reject");
        assert!(err.message.contains("tag_name"), "{}", err.message);
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = parse_rules("tags: { tag_name: \"A }").expect_err("must reject");
        assert!(err.message.contains("unterminated"), "{}", err.message);
    }

    #[test]
    fn effective_input_orders_fragments_by_path() {
        let out = effective_input(
            "tags: {\n}",
            vec![
                ("ext/b.rules".to_string(), "# b".to_string()),
                ("ext/a.rules".to_string(), "# a".to_string()),
            ],
        );
        let a = out.find("# a").expect("fragment a present");
        let b = out.find("# b").expect("fragment b present");
        assert!(a < b);
    }
}
