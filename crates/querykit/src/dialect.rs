//! Per-engine rendering rules.
//!
//! A [`Dialect`] bundles everything the builders need to know about a
//! database engine: quoting, LIKE escaping, the abstract column type map,
//! the placeholder prefix and a handful of capability flags.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::params::DEFAULT_PARAM_PREFIX;
use crate::quoter::{BinaryLiteral, Quoter, StringEscape};

/// Supported database engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialectKind {
    #[serde(rename = "mysql", alias = "mariadb")]
    MySql,
    #[serde(rename = "postgres", alias = "pgsql", alias = "postgresql")]
    Postgres,
    #[serde(rename = "sqlite")]
    Sqlite,
    #[serde(rename = "mssql", alias = "sqlsrv")]
    Mssql,
}

impl DialectKind {
    /// Short lowercase name used in error messages and log fields.
    pub fn name(self) -> &'static str {
        match self {
            DialectKind::MySql => "mysql",
            DialectKind::Postgres => "postgres",
            DialectKind::Sqlite => "sqlite",
            DialectKind::Mssql => "mssql",
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Abstract column type tokens understood by `get_column_type`.
pub const TYPE_PK: &str = "pk";
pub const TYPE_UPK: &str = "upk";
pub const TYPE_BIGPK: &str = "bigpk";
pub const TYPE_UBIGPK: &str = "ubigpk";
pub const TYPE_CHAR: &str = "char";
pub const TYPE_STRING: &str = "string";
pub const TYPE_TEXT: &str = "text";
pub const TYPE_TINYINT: &str = "tinyint";
pub const TYPE_SMALLINT: &str = "smallint";
pub const TYPE_INTEGER: &str = "integer";
pub const TYPE_BIGINT: &str = "bigint";
pub const TYPE_FLOAT: &str = "float";
pub const TYPE_DOUBLE: &str = "double";
pub const TYPE_DECIMAL: &str = "decimal";
pub const TYPE_DATETIME: &str = "datetime";
pub const TYPE_TIMESTAMP: &str = "timestamp";
pub const TYPE_TIME: &str = "time";
pub const TYPE_DATE: &str = "date";
pub const TYPE_BINARY: &str = "binary";
pub const TYPE_BOOLEAN: &str = "boolean";
pub const TYPE_MONEY: &str = "money";
pub const TYPE_JSON: &str = "json";

/// Rendering rules for one database engine.
#[derive(Clone, Debug, PartialEq)]
pub struct Dialect {
    pub kind: DialectKind,
    pub quoter: Quoter,
    /// Characters escaped inside LIKE patterns, and their replacements.
    pub like_escaping: Vec<(char, String)>,
    /// Appended as `ESCAPE 'c'` after each LIKE fragment when set.
    pub like_escape_char: Option<char>,
    /// Abstract type token to physical type.
    pub type_map: BTreeMap<String, String>,
    /// Prefix of generated placeholders.
    pub param_prefix: String,
    /// Joins the clauses of a statement.
    pub separator: String,
    pub supports_upsert: bool,
    pub supports_ilike: bool,
    pub supports_tuple_in: bool,
    pub parenthesize_union: bool,
    pub supports_recursive_keyword: bool,
}

impl Dialect {
    /// Preset for the given engine.
    pub fn for_kind(kind: DialectKind) -> Self {
        match kind {
            DialectKind::MySql => Self::mysql(),
            DialectKind::Postgres => Self::postgres(),
            DialectKind::Sqlite => Self::sqlite(),
            DialectKind::Mssql => Self::mssql(),
        }
    }

    /// MySQL / MariaDB.
    pub fn mysql() -> Self {
        Self {
            kind: DialectKind::MySql,
            quoter: Quoter {
                column_quote: ('`', '`'),
                table_quote: ('`', '`'),
                string_escape: StringEscape::Backslash,
                binary_literal: BinaryLiteral::HexString,
                bool_keywords: false,
                table_prefix: String::new(),
            },
            like_escaping: default_like_escaping(),
            like_escape_char: None,
            type_map: type_map(&[
                (TYPE_PK, "int(11) NOT NULL AUTO_INCREMENT PRIMARY KEY"),
                (TYPE_UPK, "int(10) UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY"),
                (TYPE_BIGPK, "bigint(20) NOT NULL AUTO_INCREMENT PRIMARY KEY"),
                (TYPE_UBIGPK, "bigint(20) UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY"),
                (TYPE_CHAR, "char(1)"),
                (TYPE_STRING, "varchar(255)"),
                (TYPE_TEXT, "text"),
                (TYPE_TINYINT, "tinyint(3)"),
                (TYPE_SMALLINT, "smallint(6)"),
                (TYPE_INTEGER, "int(11)"),
                (TYPE_BIGINT, "bigint(20)"),
                (TYPE_FLOAT, "float"),
                (TYPE_DOUBLE, "double"),
                (TYPE_DECIMAL, "decimal(10,0)"),
                (TYPE_DATETIME, "datetime"),
                (TYPE_TIMESTAMP, "timestamp"),
                (TYPE_TIME, "time"),
                (TYPE_DATE, "date"),
                (TYPE_BINARY, "blob"),
                (TYPE_BOOLEAN, "tinyint(1)"),
                (TYPE_MONEY, "decimal(19,4)"),
                (TYPE_JSON, "json"),
            ]),
            param_prefix: DEFAULT_PARAM_PREFIX.to_string(),
            separator: " ".to_string(),
            supports_upsert: true,
            supports_ilike: false,
            supports_tuple_in: true,
            parenthesize_union: true,
            supports_recursive_keyword: true,
        }
    }

    /// PostgreSQL.
    pub fn postgres() -> Self {
        Self {
            kind: DialectKind::Postgres,
            quoter: Quoter {
                column_quote: ('"', '"'),
                table_quote: ('"', '"'),
                string_escape: StringEscape::Standard,
                binary_literal: BinaryLiteral::EscapedHex,
                bool_keywords: true,
                table_prefix: String::new(),
            },
            like_escaping: default_like_escaping(),
            like_escape_char: None,
            type_map: type_map(&[
                (TYPE_PK, "serial NOT NULL PRIMARY KEY"),
                (TYPE_UPK, "serial NOT NULL PRIMARY KEY"),
                (TYPE_BIGPK, "bigserial NOT NULL PRIMARY KEY"),
                (TYPE_UBIGPK, "bigserial NOT NULL PRIMARY KEY"),
                (TYPE_CHAR, "char(1)"),
                (TYPE_STRING, "varchar(255)"),
                (TYPE_TEXT, "text"),
                (TYPE_TINYINT, "smallint"),
                (TYPE_SMALLINT, "smallint"),
                (TYPE_INTEGER, "integer"),
                (TYPE_BIGINT, "bigint"),
                (TYPE_FLOAT, "double precision"),
                (TYPE_DOUBLE, "double precision"),
                (TYPE_DECIMAL, "numeric(10,0)"),
                (TYPE_DATETIME, "timestamp(0)"),
                (TYPE_TIMESTAMP, "timestamp(0)"),
                (TYPE_TIME, "time(0)"),
                (TYPE_DATE, "date"),
                (TYPE_BINARY, "bytea"),
                (TYPE_BOOLEAN, "boolean"),
                (TYPE_MONEY, "numeric(19,4)"),
                (TYPE_JSON, "jsonb"),
            ]),
            param_prefix: DEFAULT_PARAM_PREFIX.to_string(),
            separator: " ".to_string(),
            supports_upsert: true,
            supports_ilike: true,
            supports_tuple_in: true,
            parenthesize_union: true,
            supports_recursive_keyword: true,
        }
    }

    /// SQLite 3.
    pub fn sqlite() -> Self {
        Self {
            kind: DialectKind::Sqlite,
            quoter: Quoter {
                column_quote: ('`', '`'),
                table_quote: ('`', '`'),
                string_escape: StringEscape::Standard,
                binary_literal: BinaryLiteral::HexString,
                bool_keywords: false,
                table_prefix: String::new(),
            },
            like_escaping: default_like_escaping(),
            like_escape_char: Some('\\'),
            type_map: type_map(&[
                (TYPE_PK, "integer PRIMARY KEY AUTOINCREMENT NOT NULL"),
                (TYPE_UPK, "integer PRIMARY KEY AUTOINCREMENT NOT NULL"),
                (TYPE_BIGPK, "integer PRIMARY KEY AUTOINCREMENT NOT NULL"),
                (TYPE_UBIGPK, "integer PRIMARY KEY AUTOINCREMENT NOT NULL"),
                (TYPE_CHAR, "char(1)"),
                (TYPE_STRING, "varchar(255)"),
                (TYPE_TEXT, "text"),
                (TYPE_TINYINT, "tinyint"),
                (TYPE_SMALLINT, "smallint"),
                (TYPE_INTEGER, "integer"),
                (TYPE_BIGINT, "bigint"),
                (TYPE_FLOAT, "float"),
                (TYPE_DOUBLE, "double"),
                (TYPE_DECIMAL, "decimal(10,0)"),
                (TYPE_DATETIME, "datetime"),
                (TYPE_TIMESTAMP, "timestamp"),
                (TYPE_TIME, "time"),
                (TYPE_DATE, "date"),
                (TYPE_BINARY, "blob"),
                (TYPE_BOOLEAN, "boolean"),
                (TYPE_MONEY, "decimal(19,4)"),
                (TYPE_JSON, "text"),
            ]),
            param_prefix: DEFAULT_PARAM_PREFIX.to_string(),
            separator: " ".to_string(),
            supports_upsert: true,
            supports_ilike: false,
            supports_tuple_in: false,
            parenthesize_union: false,
            supports_recursive_keyword: true,
        }
    }

    /// Microsoft SQL Server.
    pub fn mssql() -> Self {
        Self {
            kind: DialectKind::Mssql,
            quoter: Quoter {
                column_quote: ('[', ']'),
                table_quote: ('[', ']'),
                string_escape: StringEscape::Standard,
                binary_literal: BinaryLiteral::HexNumber,
                bool_keywords: false,
                table_prefix: String::new(),
            },
            like_escaping: vec![
                ('%', "[%]".to_string()),
                ('_', "[_]".to_string()),
                ('[', "[[]".to_string()),
                (']', "[]]".to_string()),
                ('\\', "[\\]".to_string()),
            ],
            like_escape_char: None,
            type_map: type_map(&[
                (TYPE_PK, "int IDENTITY PRIMARY KEY"),
                (TYPE_UPK, "int IDENTITY PRIMARY KEY"),
                (TYPE_BIGPK, "bigint IDENTITY PRIMARY KEY"),
                (TYPE_UBIGPK, "bigint IDENTITY PRIMARY KEY"),
                (TYPE_CHAR, "nchar(1)"),
                (TYPE_STRING, "nvarchar(255)"),
                (TYPE_TEXT, "nvarchar(max)"),
                (TYPE_TINYINT, "tinyint"),
                (TYPE_SMALLINT, "smallint"),
                (TYPE_INTEGER, "int"),
                (TYPE_BIGINT, "bigint"),
                (TYPE_FLOAT, "float"),
                (TYPE_DOUBLE, "float"),
                (TYPE_DECIMAL, "decimal(18,0)"),
                (TYPE_DATETIME, "datetime"),
                (TYPE_TIMESTAMP, "datetime"),
                (TYPE_TIME, "time"),
                (TYPE_DATE, "date"),
                (TYPE_BINARY, "varbinary(max)"),
                (TYPE_BOOLEAN, "bit"),
                (TYPE_MONEY, "decimal(19,4)"),
                (TYPE_JSON, "nvarchar(max)"),
            ]),
            param_prefix: DEFAULT_PARAM_PREFIX.to_string(),
            separator: " ".to_string(),
            supports_upsert: false,
            supports_ilike: false,
            supports_tuple_in: false,
            parenthesize_union: true,
            supports_recursive_keyword: false,
        }
    }

    /// Engine name, as used in error messages.
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Set the table prefix substituted into `{{%name}}`.
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.quoter.table_prefix = prefix.into();
        self
    }

    /// Set the prefix of generated placeholders.
    pub fn with_param_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.param_prefix = prefix.into();
        self
    }

    /// Set the clause separator.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Escape LIKE wildcards using this dialect's default map.
    pub fn escape_like(&self, pattern: &str) -> String {
        escape_like_with(pattern, &self.like_escaping)
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::postgres()
    }
}

pub(crate) fn default_like_escaping() -> Vec<(char, String)> {
    vec![
        ('%', "\\%".to_string()),
        ('_', "\\_".to_string()),
        ('\\', "\\\\".to_string()),
    ]
}

/// Escape every character of `pattern` found in `map`.
pub(crate) fn escape_like_with(pattern: &str, map: &[(char, String)]) -> String {
    let mut out = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        match map.iter().find(|(from, _)| *from == ch) {
            Some((_, to)) => out.push_str(to),
            None => out.push(ch),
        }
    }
    out
}

fn type_map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_quote_per_engine() {
        assert_eq!(Dialect::mysql().quoter.quote_column_name("id"), "`id`");
        assert_eq!(Dialect::postgres().quoter.quote_column_name("id"), "\"id\"");
        assert_eq!(Dialect::sqlite().quoter.quote_column_name("id"), "`id`");
        assert_eq!(Dialect::mssql().quoter.quote_column_name("id"), "[id]");
    }

    #[test]
    fn like_escaping_per_engine() {
        assert_eq!(Dialect::postgres().escape_like("50%_a\\"), "50\\%\\_a\\\\");
        assert_eq!(Dialect::mssql().escape_like("50%[x]"), "50[%][[]x[]]");
    }

    #[test]
    fn kind_round_trips_through_serde_names() {
        let kind: DialectKind = serde_json::from_str("\"pgsql\"").unwrap();
        assert_eq!(kind, DialectKind::Postgres);
        assert_eq!(serde_json::to_string(&DialectKind::MySql).unwrap(), "\"mysql\"");
        assert_eq!(DialectKind::Mssql.to_string(), "mssql");
    }

    #[test]
    fn capability_flags() {
        assert!(!Dialect::mssql().supports_upsert);
        assert!(Dialect::postgres().supports_ilike);
        assert!(!Dialect::sqlite().supports_tuple_in);
        assert!(!Dialect::sqlite().parenthesize_union);
        assert_eq!(Dialect::default().kind, DialectKind::Postgres);
    }
}
