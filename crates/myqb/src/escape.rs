//! The escaping provider: literal and identifier quoting for the backtick
//! dialect.
//!
//! This is the only module that quotes anything. Everything else in the
//! crate renders values by calling [`escape_value`] and identifiers by
//! calling [`escape_id`].
//!
//! - Unquoted text is never emitted for a [`Value`]; non-finite floats
//!   degrade to `NULL` rather than producing invalid SQL.
//! - Identifiers are backtick-quoted with embedded backticks doubled.
//!   Dotted qualification (`alias`.`col`) is composed by the field
//!   resolver, not here.

use crate::value::Value;

/// Render a value as a dialect-correct SQL literal.
pub fn escape_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Value::Int(i) => i.to_string(),
        Value::UInt(u) => u.to_string(),
        Value::Float(f) => {
            if f.is_finite() {
                f.to_string()
            } else {
                "NULL".to_string()
            }
        }
        Value::Text(s) => escape_string(s),
        Value::Bytes(b) => escape_bytes(b),
        Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        Value::Time(t) => format!("'{}'", t.format("%H:%M:%S")),
        Value::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.3f")),
        Value::Uuid(u) => format!("'{}'", u.hyphenated()),
        Value::Json(j) => escape_string(&j.to_string()),
        #[cfg(feature = "rust_decimal")]
        Value::Decimal(d) => d.to_string(),
        Value::List(items) => items
            .iter()
            .map(escape_value)
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Quote an identifier (table, column, or alias name).
pub fn escape_id(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('`');
    for ch in name.chars() {
        if ch == '`' {
            out.push_str("``");
        } else {
            out.push(ch);
        }
    }
    out.push('`');
    out
}

/// Render a value as plain text without any quoting.
///
/// Used by the custom-statement macro expansion, where the substituted
/// values are clause fragments already rendered by the builder.
pub(crate) fn raw_text(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        other => escape_value(other),
    }
}

/// Escape a string with the dialect's backslash rules and single-quote it.
fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\0' => out.push_str("\\0"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

/// Render binary data as a hex literal.
fn escape_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2 + 3);
    out.push_str("X'");
    for byte in data {
        out.push_str(&format!("{byte:02X}"));
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn escapes_scalars() {
        assert_eq!(escape_value(&Value::Null), "NULL");
        assert_eq!(escape_value(&Value::Bool(true)), "TRUE");
        assert_eq!(escape_value(&Value::Int(-7)), "-7");
        assert_eq!(escape_value(&Value::UInt(42)), "42");
        assert_eq!(escape_value(&Value::Float(1.5)), "1.5");
        assert_eq!(escape_value(&Value::Float(f64::NAN)), "NULL");
    }

    #[test]
    fn escapes_strings() {
        assert_eq!(escape_value(&Value::from("hello")), "'hello'");
        assert_eq!(escape_value(&Value::from("it's")), "'it\\'s'");
        assert_eq!(escape_value(&Value::from("a\\b")), "'a\\\\b'");
        assert_eq!(escape_value(&Value::from("line\nbreak")), "'line\\nbreak'");
        assert_eq!(escape_value(&Value::from("say \"hi\"")), "'say \\\"hi\\\"'");
    }

    #[test]
    fn escapes_lists() {
        let list = Value::List(vec![Value::Int(1), Value::from("a")]);
        assert_eq!(escape_value(&list), "1, 'a'");
    }

    #[test]
    fn escapes_bytes_as_hex() {
        assert_eq!(escape_value(&Value::bytes(vec![0xde, 0xad])), "X'DEAD'");
    }

    #[test]
    fn escapes_temporal_values() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(escape_value(&Value::Date(d)), "'2024-03-09'");
        let dt = d.and_hms_milli_opt(12, 30, 5, 250).unwrap();
        assert_eq!(escape_value(&Value::DateTime(dt)), "'2024-03-09 12:30:05.250'");
    }

    #[test]
    fn escapes_identifiers() {
        assert_eq!(escape_id("name"), "`name`");
        assert_eq!(escape_id("weird`name"), "`weird``name`");
    }

    #[test]
    fn raw_text_skips_quoting() {
        assert_eq!(raw_text(&Value::from("LIMIT 10")), "LIMIT 10");
        assert_eq!(raw_text(&Value::Int(3)), "3");
    }
}
