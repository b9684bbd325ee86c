//! Dialect-aware identifier and literal quoting.
//!
//! [`Quoter`] never fails: names that already look quoted, or that contain
//! expression syntax such as `(`, pass through unchanged.
//!
//! # Example
//! ```ignore
//! use querykit::Dialect;
//!
//! let q = Dialect::postgres().quoter;
//! assert_eq!(q.quote_table_name("public.user"), r#""public"."user""#);
//! assert_eq!(q.quote_column_name("u.id"), r#""u"."id""#);
//! assert_eq!(q.quote_sql("SELECT [[id]] FROM {{%user}}"), r#"SELECT "id" FROM "user""#);
//! ```

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::value::{Value, format_float};

/// How string literals are escaped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringEscape {
    /// Double single quotes: `'` becomes `''`.
    Standard,
    /// Standard doubling plus backslash escapes for `\`, NUL, `\n`, `\r` and `\x1a`.
    Backslash,
}

/// How binary values are written as literals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryLiteral {
    /// `X'0aff'`
    HexString,
    /// `'\x0aff'`
    EscapedHex,
    /// `0x0aff`
    HexNumber,
}

/// Quoting rules of one database engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quoter {
    /// Opening and closing delimiters for column names.
    pub column_quote: (char, char),
    /// Opening and closing delimiters for table and schema names.
    pub table_quote: (char, char),
    pub string_escape: StringEscape,
    pub binary_literal: BinaryLiteral,
    /// Render booleans as `TRUE`/`FALSE` instead of `1`/`0`.
    pub bool_keywords: bool,
    /// Substituted for `%` inside `{{%name}}`.
    pub table_prefix: String,
}

impl Quoter {
    /// Quote a table name, splitting on schema dots.
    ///
    /// Sub-query text in parentheses and names containing `{{` are returned unchanged.
    pub fn quote_table_name(&self, name: &str) -> String {
        if (name.starts_with('(') && name.ends_with(')')) || name.contains("{{") {
            return name.to_string();
        }
        if !name.contains('.') {
            return self.quote_simple_table_name(name);
        }
        split_name_parts(name, self.table_quote)
            .iter()
            .map(|part| self.quote_simple_table_name(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quote a column name, optionally prefixed by a table name.
    ///
    /// Names containing `(`, `[[` or `{{` are treated as expressions and returned unchanged.
    pub fn quote_column_name(&self, name: &str) -> String {
        if name.contains('(') || name.contains("[[") || name.contains("{{") {
            return name.to_string();
        }
        match name.rfind('.') {
            Some(pos) => {
                let (table, column) = (&name[..pos], &name[pos + 1..]);
                format!(
                    "{}.{}",
                    self.quote_table_name(table),
                    self.quote_simple_column_name(column)
                )
            }
            None => self.quote_simple_column_name(name),
        }
    }

    /// Quote a single table name segment.
    pub fn quote_simple_table_name(&self, name: &str) -> String {
        wrap(name, self.table_quote)
    }

    /// Quote a single column name segment. `*` is never quoted.
    pub fn quote_simple_column_name(&self, name: &str) -> String {
        if name == "*" {
            return name.to_string();
        }
        wrap(name, self.column_quote)
    }

    /// Strip delimiters from a quoted table name segment.
    pub fn unquote_simple_table_name(&self, name: &str) -> String {
        unwrap(name, self.table_quote)
    }

    /// Strip delimiters from a quoted column name segment.
    pub fn unquote_simple_column_name(&self, name: &str) -> String {
        unwrap(name, self.column_quote)
    }

    /// Escape and quote a string literal.
    pub fn quote_string(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('\'');
        for ch in s.chars() {
            match (ch, self.string_escape) {
                ('\'', _) => out.push_str("''"),
                ('\\', StringEscape::Backslash) => out.push_str("\\\\"),
                ('\0', StringEscape::Backslash) => out.push_str("\\0"),
                ('\n', StringEscape::Backslash) => out.push_str("\\n"),
                ('\r', StringEscape::Backslash) => out.push_str("\\r"),
                ('\u{1a}', StringEscape::Backslash) => out.push_str("\\Z"),
                (c, _) => out.push(c),
            }
        }
        out.push('\'');
        out
    }

    /// Render a value as an inline SQL literal.
    ///
    /// Numbers are written bare (floats always with `.`), `NULL` as the keyword,
    /// everything else is converted to text and quoted.
    pub fn quote_value(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) if self.bool_keywords => String::from(if *b { "TRUE" } else { "FALSE" }),
            Value::Bool(b) => String::from(if *b { "1" } else { "0" }),
            Value::Int(i) => i.to_string(),
            Value::UInt(u) => u.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Bytes(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
                match self.binary_literal {
                    BinaryLiteral::HexString => format!("X'{hex}'"),
                    BinaryLiteral::EscapedHex => format!("'\\x{hex}'"),
                    BinaryLiteral::HexNumber => format!("0x{hex}"),
                }
            }
            other => self.quote_string(&other.to_plain_string()),
        }
    }

    /// Replace `[[column]]`, `{{table}}` and `{{%table}}` tokens with quoted names.
    pub fn quote_sql(&self, sql: &str) -> String {
        if !sql.contains("[[") && !sql.contains("{{") {
            return sql.to_string();
        }
        quote_sql_regex()
            .replace_all(sql, |caps: &Captures<'_>| {
                if let Some(column) = caps.get(3) {
                    self.quote_column_name(column.as_str())
                } else if let Some(table) = caps.get(2) {
                    self.quote_table_name(table.as_str())
                        .replace('%', &self.table_prefix)
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    }
}

fn quote_sql_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\{\{(%?[\w\-\. ]+%?)\}\}|\[\[([\w\-\. ]+)\]\])")
            .expect("invalid built-in quote_sql regex")
    })
}

fn wrap(name: &str, (open, close): (char, char)) -> String {
    if name.contains(open) {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 2);
    out.push(open);
    for ch in name.chars() {
        if ch == close {
            out.push(close);
        }
        out.push(ch);
    }
    out.push(close);
    out
}

fn unwrap(name: &str, (open, close): (char, char)) -> String {
    match name
        .strip_prefix(open)
        .and_then(|rest| rest.strip_suffix(close))
    {
        Some(inner) => inner.replace(&format!("{close}{close}"), &close.to_string()),
        None => name.to_string(),
    }
}

/// Split `schema.table` on dots that are not inside delimiters.
fn split_name_parts(name: &str, (open, close): (char, char)) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = name.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            current.push(ch);
            if ch == close {
                // Doubled closing delimiter is an escape.
                if chars.peek() == Some(&close) {
                    current.push(close);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            continue;
        }
        match ch {
            '.' => parts.push(std::mem::take(&mut current)),
            c if c == open => {
                in_quotes = true;
                current.push(c);
            }
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}
