//! Fluent column definitions for `CREATE TABLE` and `ALTER TABLE`.

use std::fmt;

use crate::dialect::{
    Dialect, DialectKind, TYPE_BIGINT, TYPE_BIGPK, TYPE_BINARY, TYPE_BOOLEAN, TYPE_CHAR,
    TYPE_DATE, TYPE_DATETIME, TYPE_DECIMAL, TYPE_DOUBLE, TYPE_FLOAT, TYPE_INTEGER, TYPE_JSON,
    TYPE_MONEY, TYPE_PK, TYPE_SMALLINT, TYPE_STRING, TYPE_TEXT, TYPE_TIME, TYPE_TIMESTAMP,
    TYPE_TINYINT, TYPE_UBIGPK, TYPE_UPK,
};
use crate::value::Value;

#[derive(Clone, Debug, PartialEq)]
enum DefaultValue {
    Value(Value),
    /// Rendered verbatim, e.g. `CURRENT_TIMESTAMP`.
    Expression(String),
}

/// A column definition built from an abstract type token.
///
/// ```ignore
/// let col = ColumnBuilder::string(Some(64)).not_null().unique();
/// qb.add_column("user", "email", col)?;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnBuilder {
    type_: String,
    length: Option<String>,
    not_null: Option<bool>,
    unique: bool,
    default: Option<DefaultValue>,
    check: Option<String>,
    comment: Option<String>,
    unsigned: bool,
    append: Option<String>,
}

impl ColumnBuilder {
    /// Column of an abstract type token such as `string` or `pk`.
    pub fn new(type_: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            length: None,
            not_null: None,
            unique: false,
            default: None,
            check: None,
            comment: None,
            unsigned: false,
            append: None,
        }
    }

    fn with_length(type_: &str, length: Option<impl fmt::Display>) -> Self {
        let mut col = Self::new(type_);
        col.length = length.map(|l| l.to_string());
        col
    }

    pub fn primary_key(length: Option<u32>) -> Self {
        Self::with_length(TYPE_PK, length)
    }

    pub fn big_primary_key(length: Option<u32>) -> Self {
        Self::with_length(TYPE_BIGPK, length)
    }

    pub fn char(length: Option<u32>) -> Self {
        Self::with_length(TYPE_CHAR, length)
    }

    pub fn string(length: Option<u32>) -> Self {
        Self::with_length(TYPE_STRING, length)
    }

    pub fn text() -> Self {
        Self::new(TYPE_TEXT)
    }

    pub fn tiny_integer(length: Option<u32>) -> Self {
        Self::with_length(TYPE_TINYINT, length)
    }

    pub fn small_integer(length: Option<u32>) -> Self {
        Self::with_length(TYPE_SMALLINT, length)
    }

    pub fn integer(length: Option<u32>) -> Self {
        Self::with_length(TYPE_INTEGER, length)
    }

    pub fn big_integer(length: Option<u32>) -> Self {
        Self::with_length(TYPE_BIGINT, length)
    }

    pub fn float(precision: Option<u32>) -> Self {
        Self::with_length(TYPE_FLOAT, precision)
    }

    pub fn double(precision: Option<u32>) -> Self {
        Self::with_length(TYPE_DOUBLE, precision)
    }

    /// `decimal(precision, scale)`; the scale is ignored without a precision.
    pub fn decimal(precision: Option<u32>, scale: Option<u32>) -> Self {
        let length = match (precision, scale) {
            (Some(p), Some(s)) => Some(format!("{p},{s}")),
            (Some(p), None) => Some(p.to_string()),
            (None, _) => None,
        };
        Self::with_length(TYPE_DECIMAL, length)
    }

    pub fn date_time(precision: Option<u32>) -> Self {
        Self::with_length(TYPE_DATETIME, precision)
    }

    pub fn timestamp(precision: Option<u32>) -> Self {
        Self::with_length(TYPE_TIMESTAMP, precision)
    }

    pub fn time(precision: Option<u32>) -> Self {
        Self::with_length(TYPE_TIME, precision)
    }

    pub fn date() -> Self {
        Self::new(TYPE_DATE)
    }

    pub fn binary(length: Option<u32>) -> Self {
        Self::with_length(TYPE_BINARY, length)
    }

    pub fn boolean() -> Self {
        Self::new(TYPE_BOOLEAN)
    }

    pub fn money(precision: Option<u32>, scale: Option<u32>) -> Self {
        let mut col = Self::decimal(precision, scale);
        col.type_ = TYPE_MONEY.to_string();
        col
    }

    pub fn json() -> Self {
        Self::new(TYPE_JSON)
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = Some(true);
        self
    }

    /// Explicit `NULL`.
    pub fn null(mut self) -> Self {
        self.not_null = Some(false);
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Only rendered on MySQL.
    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    pub fn default_expression(mut self, sql: impl Into<String>) -> Self {
        self.default = Some(DefaultValue::Expression(sql.into()));
        self
    }

    pub fn check(mut self, condition: impl Into<String>) -> Self {
        self.check = Some(condition.into());
        self
    }

    /// Inline comment. Only MySQL accepts it in a column definition.
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Raw SQL appended after everything else.
    pub fn append(mut self, sql: impl Into<String>) -> Self {
        self.append = Some(sql.into());
        self
    }

    fn is_primary_key(&self) -> bool {
        [TYPE_PK, TYPE_UPK, TYPE_BIGPK, TYPE_UBIGPK].contains(&self.type_.as_str())
    }

    /// Render the abstract definition, e.g. `string(64) NOT NULL UNIQUE`.
    ///
    /// The leading type token is resolved later by `QueryBuilder::get_column_type`.
    pub fn render(&self, dialect: &Dialect) -> String {
        let mysql = dialect.kind == DialectKind::MySql;
        let mut sql = match (self.type_.as_str(), mysql && self.unsigned) {
            (TYPE_PK, true) => TYPE_UPK.to_string(),
            (TYPE_BIGPK, true) => TYPE_UBIGPK.to_string(),
            (t, _) => t.to_string(),
        };

        if self.is_primary_key() {
            // Key tokens carry their own constraints.
            self.push_check(&mut sql);
            if mysql {
                self.push_comment(&mut sql, dialect);
            }
            self.push_append(&mut sql);
            return sql;
        }

        if let Some(length) = self.length.as_deref().filter(|l| !l.is_empty()) {
            sql.push_str(&format!("({length})"));
        }
        if mysql && self.unsigned {
            sql.push_str(" UNSIGNED");
        }
        match self.not_null {
            Some(true) => sql.push_str(" NOT NULL"),
            Some(false) => sql.push_str(" NULL"),
            None => {}
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        match &self.default {
            Some(DefaultValue::Value(Value::Null)) => sql.push_str(" DEFAULT NULL"),
            Some(DefaultValue::Value(Value::Bool(b))) => {
                let literal = match (dialect.kind, b) {
                    (DialectKind::Mssql, true) => "1",
                    (DialectKind::Mssql, false) => "0",
                    (_, true) => "TRUE",
                    (_, false) => "FALSE",
                };
                sql.push_str(&format!(" DEFAULT {literal}"));
            }
            Some(DefaultValue::Value(v)) => {
                sql.push_str(&format!(" DEFAULT {}", dialect.quoter.quote_value(v)));
            }
            Some(DefaultValue::Expression(e)) => sql.push_str(&format!(" DEFAULT {e}")),
            None => {}
        }
        self.push_check(&mut sql);
        if mysql {
            self.push_comment(&mut sql, dialect);
        }
        self.push_append(&mut sql);
        sql
    }

    fn push_check(&self, sql: &mut String) {
        if let Some(check) = &self.check {
            sql.push_str(&format!(" CHECK ({check})"));
        }
    }

    fn push_comment(&self, sql: &mut String, dialect: &Dialect) {
        if let Some(comment) = &self.comment {
            sql.push_str(&format!(" COMMENT {}", dialect.quoter.quote_string(comment)));
        }
    }

    fn push_append(&self, sql: &mut String) {
        if let Some(append) = &self.append {
            sql.push(' ');
            sql.push_str(append);
        }
    }
}

/// A column type given either as a type string or as a [`ColumnBuilder`].
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnDef {
    /// Abstract token (`string(32) NOT NULL`) or physical type, resolved through the type map.
    Type(String),
    Builder(ColumnBuilder),
}

impl From<&str> for ColumnDef {
    fn from(s: &str) -> Self {
        ColumnDef::Type(s.to_string())
    }
}

impl From<String> for ColumnDef {
    fn from(s: String) -> Self {
        ColumnDef::Type(s)
    }
}

impl From<ColumnBuilder> for ColumnDef {
    fn from(b: ColumnBuilder) -> Self {
        ColumnDef::Builder(b)
    }
}
