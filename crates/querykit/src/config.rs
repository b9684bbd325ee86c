//! Loading a [`Dialect`] from a TOML file.
//!
//! ```toml
//! kind = "postgres"
//! table_prefix = "app_"
//! param_prefix = ":p"
//!
//! [type_map]
//! json = "json"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::dialect::{Dialect, DialectKind};
use crate::error::{QueryError, QueryResult};

/// Dialect configuration file.
///
/// `kind` selects a preset; every other key overrides part of it.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DialectConfig {
    pub kind: DialectKind,
    pub table_prefix: Option<String>,
    pub param_prefix: Option<String>,
    pub separator: Option<String>,
    pub like_escape_char: Option<char>,
    #[serde(default)]
    pub type_map: BTreeMap<String, String>,
}

impl DialectConfig {
    /// Parse and validate configuration text.
    pub fn from_toml_str(raw: &str) -> QueryResult<Self> {
        let config: DialectConfig = toml::from_str(raw)
            .map_err(|e| QueryError::config(format!("failed to parse dialect config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            QueryError::config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw).map_err(|e| match e {
            QueryError::Config(msg) => QueryError::config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    fn validate(&self) -> QueryResult<()> {
        if matches!(self.param_prefix.as_deref(), Some("")) {
            return Err(QueryError::config("param_prefix must not be empty"));
        }
        if let Some((key, _)) = self.type_map.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(QueryError::config(format!(
                "type_map entry '{key}' maps to an empty type"
            )));
        }
        Ok(())
    }

    /// Build the configured dialect.
    pub fn into_dialect(self) -> Dialect {
        let mut dialect = Dialect::for_kind(self.kind);
        if let Some(prefix) = self.table_prefix {
            dialect.quoter.table_prefix = prefix;
        }
        if let Some(prefix) = self.param_prefix {
            dialect.param_prefix = prefix;
        }
        if let Some(separator) = self.separator {
            dialect.separator = separator;
        }
        if self.like_escape_char.is_some() {
            dialect.like_escape_char = self.like_escape_char;
        }
        dialect.type_map.extend(self.type_map);
        dialect
    }
}

impl TryFrom<&str> for Dialect {
    type Error = QueryError;

    fn try_from(raw: &str) -> QueryResult<Self> {
        Ok(DialectConfig::from_toml_str(raw)?.into_dialect())
    }
}
