//! Compiled statements and placeholder rewriting for drivers.

use std::fmt;

use crate::params::Params;
use crate::value::Value;

/// Positional placeholder syntax expected by a driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ... (PostgreSQL). A name used twice maps to one index.
    Dollar,
    /// `?` (MySQL, SQLite). A name used twice binds its value twice.
    Question,
}

/// SQL text plus the parameters it references.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Params,
}

impl BuiltQuery {
    pub fn new(sql: impl Into<String>, params: Params) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Rewrite named placeholders into positional ones.
    ///
    /// Only names bound in `params` are rewritten. Quoted literals and
    /// identifiers are copied untouched, as are `::` casts.
    pub fn to_positional(&self, style: PlaceholderStyle) -> (String, Vec<Value>) {
        let mut out = String::with_capacity(self.sql.len());
        let mut values: Vec<Value> = Vec::new();
        let mut seen: Vec<&str> = Vec::new();

        let bytes = self.sql.as_bytes();
        let mut i = 0;
        let mut quote: Option<u8> = None;
        let mut copied = 0;
        while i < bytes.len() {
            let b = bytes[i];
            if let Some(q) = quote {
                if b == q {
                    quote = None;
                }
                i += 1;
                continue;
            }
            match b {
                b'\'' | b'"' | b'`' => {
                    quote = Some(b);
                    i += 1;
                }
                b':' if bytes.get(i + 1) == Some(&b':') => i += 2,
                b':' | b'@' => {
                    let end = i + 1 + bytes[i + 1..]
                        .iter()
                        .take_while(|c| c.is_ascii_alphanumeric() || **c == b'_')
                        .count();
                    let name = &self.sql[i..end];
                    match self.params.get(name) {
                        Some(value) if end > i + 1 => {
                            out.push_str(&self.sql[copied..i]);
                            match style {
                                PlaceholderStyle::Dollar => {
                                    let idx = match seen.iter().position(|n| *n == name) {
                                        Some(pos) => pos + 1,
                                        None => {
                                            seen.push(name);
                                            values.push(value.clone());
                                            seen.len()
                                        }
                                    };
                                    out.push('$');
                                    out.push_str(&idx.to_string());
                                }
                                PlaceholderStyle::Question => {
                                    values.push(value.clone());
                                    out.push('?');
                                }
                            }
                            copied = end;
                        }
                        _ => {}
                    }
                    i = end.max(i + 1);
                }
                _ => i += 1,
            }
        }
        out.push_str(&self.sql[copied..]);
        (out, values)
    }
}

impl fmt::Display for BuiltQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}
