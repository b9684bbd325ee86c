//! # querykit
//!
//! A dialect-aware SQL query compiler.
//!
//! Queries are described as data ([`Query`], [`Condition`], [`Expression`])
//! and compiled by a [`QueryBuilder`] into SQL text plus a map of named
//! parameters. The crate never talks to a database: the output is handed to
//! whatever driver executes it.
//!
//! ## Features
//!
//! - **Dialects**: MySQL, PostgreSQL, SQLite and SQL Server presets, or a TOML file via [`DialectConfig`]
//! - **Parameters**: every value is bound to a `:qpN` placeholder, never inlined
//! - **Conditions**: hash, comparison, `BETWEEN`, `IN` (including composite and sub-query), `LIKE`, `EXISTS`
//! - **Statements**: SELECT with joins, unions and CTEs; INSERT/UPDATE/DELETE/upsert; DDL
//! - **Extensible**: custom expression kinds and condition operators are registered per builder
//!
//! ## Example
//!
//! ```ignore
//! use querykit::{Condition, Dialect, Params, Query, QueryBuilder};
//!
//! let qb = QueryBuilder::new(Dialect::mysql());
//! let query = Query::new()
//!     .select("id, name")
//!     .from("user")
//!     .where_(Condition::hash([("status", 1)]))
//!     .and_where(Condition::like("name", ["ali"]))
//!     .order_by("id DESC")
//!     .limit(10);
//!
//! let built = qb.build(&query, Params::new())?;
//! // SELECT `id`, `name` FROM `user` WHERE (`status`=:qp0) AND (`name` LIKE :qp1)
//! //     ORDER BY `id` DESC LIMIT 10
//! ```
//!
//! ## Logging
//!
//! With the default `tracing` feature, every compiled statement emits one
//! DEBUG event on the `querykit.sql` target. Bound values are never logged.

pub mod builder;
pub mod built;
pub mod condition;
pub mod config;
pub mod dialect;
pub mod error;
pub mod expr;
pub mod params;
pub mod query;
pub mod quoter;
pub mod schema;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use builder::{
    ColumnBuilder, ColumnDef, ConditionParser, ForeignKey, InsertSource, QueryBuilder,
    QueryBuilderBuilder, UpsertUpdate,
};
pub use built::{BuiltQuery, PlaceholderStyle};
pub use condition::{Condition, InValues, LikeEscaping, LikeOperator};
pub use config::DialectConfig;
pub use dialect::{Dialect, DialectKind};
pub use error::{QueryError, QueryResult};
pub use expr::{Column, CustomExpression, Expression, ExpressionBuilder, Operand};
pub use params::{Params, bind_param};
pub use query::{Limit, OrderBy, Query, SortDirection};
pub use quoter::Quoter;
pub use schema::{ColumnKind, ColumnSchema, SchemaProvider, SchemaRegistry, TableSchema};
pub use value::Value;
