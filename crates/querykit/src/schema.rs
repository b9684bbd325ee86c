//! Table metadata consumed by the DML builders.
//!
//! Metadata is optional everywhere: an unknown table only means that values
//! are bound as given and upserts cannot infer conflict targets.

use std::collections::HashMap;
use std::sync::Arc;

use crate::value::Value;

/// Source of table metadata.
pub trait SchemaProvider: Send + Sync {
    /// Look up a table by its raw (unquoted, prefix-resolved) name.
    fn table(&self, name: &str) -> Option<Arc<TableSchema>>;

    /// Every known table name, used by schema-wide statements.
    fn table_names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Logical type of a column, used to coerce values before writing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    String,
    Binary,
    Json,
    Date,
    DateTime,
    Other,
}

/// Column information for casting.
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    pub name: String,
    pub kind: ColumnKind,
    pub is_primary_key: bool,
    pub allow_null: bool,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_primary_key: false,
            allow_null: true,
        }
    }

    /// Coerce a value to this column's type before it is written.
    ///
    /// Empty strings become `NULL` for non-text columns. Conversions that
    /// cannot be performed leave the value untouched.
    pub fn cast_for_write(&self, value: Value) -> Value {
        if let Value::String(s) = &value
            && s.is_empty()
            && !matches!(self.kind, ColumnKind::String | ColumnKind::Binary)
        {
            return Value::Null;
        }
        match (self.kind, value) {
            (_, Value::Null) => Value::Null,
            (ColumnKind::Integer, Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => Value::String(s),
            },
            (ColumnKind::Integer, Value::Bool(b)) => Value::Int(i64::from(b)),
            (ColumnKind::Integer, Value::Float(f)) if f.fract() == 0.0 && f.is_finite() => {
                Value::Int(f as i64)
            }
            (ColumnKind::Float, Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(f) => Value::Float(f),
                Err(_) => Value::String(s),
            },
            (ColumnKind::Float, Value::Int(i)) => Value::Float(i as f64),
            (ColumnKind::Boolean, Value::Int(i)) => Value::Bool(i != 0),
            (ColumnKind::Boolean, Value::UInt(u)) => Value::Bool(u != 0),
            (ColumnKind::Boolean, Value::String(s)) => {
                match s.trim().to_ascii_lowercase().as_str() {
                    "1" | "t" | "true" | "y" | "yes" | "on" => Value::Bool(true),
                    "0" | "f" | "false" | "n" | "no" | "off" => Value::Bool(false),
                    _ => Value::String(s),
                }
            }
            (ColumnKind::String, v @ (Value::Int(_) | Value::UInt(_) | Value::Float(_) | Value::Bool(_))) => {
                Value::String(v.to_plain_string())
            }
            (ColumnKind::Json, Value::String(s)) => match serde_json::from_str(&s) {
                Ok(json) => Value::Json(json),
                Err(_) => Value::String(s),
            },
            (_, v) => v,
        }
    }
}

/// Table information: columns and key constraints.
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub primary_key: Vec<String>,
    /// Named unique constraints.
    pub uniques: Vec<(String, Vec<String>)>,
    /// Sequence feeding the primary key, if any.
    pub sequence_name: Option<String>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a column.
    pub fn column(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        self.columns.push(ColumnSchema::new(name, kind));
        self
    }

    /// Set the primary key columns.
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        for col in &mut self.columns {
            col.is_primary_key = self.primary_key.contains(&col.name);
        }
        self
    }

    /// Add a named unique constraint.
    pub fn unique<I, S>(mut self, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uniques
            .push((name.into(), columns.into_iter().map(Into::into).collect()));
        self
    }

    /// Set the sequence name.
    pub fn sequence(mut self, name: impl Into<String>) -> Self {
        self.sequence_name = Some(name.into());
        self
    }

    /// Look up a column by name.
    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Cast `value` for `column`; unknown columns are returned as is.
    pub fn cast_for_write(&self, column: &str, value: Value) -> Value {
        match self.get_column(column) {
            Some(col) => col.cast_for_write(value),
            None => value,
        }
    }

    /// Primary key followed by every unique constraint.
    pub fn key_constraints(&self) -> impl Iterator<Item = &[String]> {
        std::iter::once(self.primary_key.as_slice())
            .filter(|pk| !pk.is_empty())
            .chain(self.uniques.iter().map(|(_, cols)| cols.as_slice()))
    }
}

/// In-memory [`SchemaProvider`].
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: HashMap<String, Arc<TableSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table, replacing any previous entry with the same name.
    pub fn register(&mut self, table: TableSchema) {
        self.tables.insert(table.name.clone(), Arc::new(table));
    }

    /// Chaining form of [`SchemaRegistry::register`].
    pub fn with_table(mut self, table: TableSchema) -> Self {
        self.register(table);
        self
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl SchemaProvider for SchemaRegistry {
    fn table(&self, name: &str) -> Option<Arc<TableSchema>> {
        self.tables.get(name).cloned()
    }

    fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }
}
