//! SQL statement compiler.
//!
//! [`QueryBuilder`] turns a [`Query`] AST (or DML/DDL arguments) into SQL text
//! for one [`Dialect`], binding values into a caller-owned [`Params`] map.
//!
//! ## Design
//!
//! - Built-in condition kinds are a closed enum and are dispatched by `match`.
//! - Custom expression kinds are dispatched through a registry fixed at
//!   construction time (see [`QueryBuilderBuilder`]); lookups fall back to the
//!   kinds an expression declares as its ancestors.
//! - A builder is immutable after construction and can be shared across threads.
//!
//! ```ignore
//! use querykit::{Condition, Dialect, Params, Query, QueryBuilder};
//!
//! let qb = QueryBuilder::new(Dialect::postgres());
//! let built = qb.build(
//!     &Query::new()
//!         .select("id, name")
//!         .from("user")
//!         .where_(Condition::hash([("status", 1)]))
//!         .limit(10),
//!     Params::new(),
//! )?;
//! assert_eq!(built.sql, r#"SELECT "id", "name" FROM "user" WHERE "status"=:qp0 LIMIT 10"#);
//! ```

mod clause;
mod column;
mod condition;
mod ddl;
mod dml;


pub use column::{ColumnBuilder, ColumnDef};
pub use ddl::ForeignKey;
pub use dml::{InsertSource, UpsertUpdate};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::built::BuiltQuery;
use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::error::{QueryError, QueryResult};
use crate::expr::{CustomExpression, Expression, ExpressionBuilder, Operand};
use crate::params::Params;
use crate::query::Query;
use crate::quoter::Quoter;
use crate::schema::{SchemaProvider, TableSchema};
use crate::value::Value;

/// Parses the operands of a custom condition operator.
pub type ConditionParser = Arc<dyn Fn(Vec<Operand>) -> QueryResult<Condition> + Send + Sync>;

/// Compiles queries and statements for one dialect.
#[derive(Clone)]
pub struct QueryBuilder {
    dialect: Arc<Dialect>,
    schema: Option<Arc<dyn SchemaProvider>>,
    expression_builders: Arc<HashMap<String, Arc<dyn ExpressionBuilder>>>,
    condition_parsers: Arc<HashMap<String, ConditionParser>>,
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.expression_builders.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        let mut operators: Vec<&str> = self.condition_parsers.keys().map(String::as_str).collect();
        operators.sort_unstable();
        f.debug_struct("QueryBuilder")
            .field("dialect", &self.dialect.kind)
            .field("has_schema", &self.schema.is_some())
            .field("expression_builders", &kinds)
            .field("condition_parsers", &operators)
            .finish()
    }
}

/// Construction-time configuration of a [`QueryBuilder`].
pub struct QueryBuilderBuilder {
    dialect: Dialect,
    schema: Option<Arc<dyn SchemaProvider>>,
    expression_builders: HashMap<String, Arc<dyn ExpressionBuilder>>,
    condition_parsers: HashMap<String, ConditionParser>,
}

impl QueryBuilderBuilder {
    /// Table metadata used for value casting and upsert conflict targets.
    pub fn schema(mut self, schema: Arc<dyn SchemaProvider>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Register the builder for a custom expression kind.
    pub fn expression_builder(
        mut self,
        kind: impl Into<String>,
        builder: Arc<dyn ExpressionBuilder>,
    ) -> Self {
        self.expression_builders.insert(kind.into(), builder);
        self
    }

    /// Register a parser for a custom operator of [`QueryBuilder::create_condition`].
    ///
    /// Operator names are matched case-insensitively.
    pub fn condition_parser<F>(mut self, operator: &str, parser: F) -> Self
    where
        F: Fn(Vec<Operand>) -> QueryResult<Condition> + Send + Sync + 'static,
    {
        self.condition_parsers
            .insert(operator.trim().to_ascii_uppercase(), Arc::new(parser));
        self
    }

    pub fn build(self) -> QueryBuilder {
        QueryBuilder {
            dialect: Arc::new(self.dialect),
            schema: self.schema,
            expression_builders: Arc::new(self.expression_builders),
            condition_parsers: Arc::new(self.condition_parsers),
        }
    }
}

impl QueryBuilder {
    /// Builder with no schema and no custom registries.
    pub fn new(dialect: Dialect) -> Self {
        Self::builder(dialect).build()
    }

    pub fn builder(dialect: Dialect) -> QueryBuilderBuilder {
        QueryBuilderBuilder {
            dialect,
            schema: None,
            expression_builders: HashMap::new(),
            condition_parsers: HashMap::new(),
        }
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn quoter(&self) -> &Quoter {
        &self.dialect.quoter
    }

    /// Compile a query.
    ///
    /// `params` seeds the map; the query's own params are merged over it and
    /// placeholder numbering continues from its size.
    pub fn build(&self, query: &Query, params: Params) -> QueryResult<BuiltQuery> {
        let mut params = params;
        let sql = self.build_query(query, &mut params)?;
        self.log_statement("select", &sql, &params);
        Ok(BuiltQuery::new(sql, params))
    }

    /// Compile a query into SQL, binding into a shared map.
    ///
    /// This is the form used for sub-queries.
    pub fn build_query(&self, query: &Query, params: &mut Params) -> QueryResult<String> {
        params.merge(&query.params);
        let sep = self.dialect.separator.as_str();

        let clauses = [
            self.build_select(&query.select, query.distinct, query.select_option.as_deref(), params)?,
            self.build_from(&query.from, params)?,
            self.build_join(&query.join, params)?,
            self.build_where(query.where_.as_ref(), params)?,
            self.build_group_by(&query.group_by, params)?,
            self.build_having(query.having.as_ref(), params)?,
        ];
        let mut sql = join_non_empty(&clauses, sep);

        let union = self.build_union(&query.union, params)?;
        if !union.is_empty() {
            sql = if self.dialect.parenthesize_union {
                format!("({sql}){sep}{union}")
            } else {
                format!("{sql}{sep}{union}")
            };
        }

        sql = self.build_order_by_and_limit(
            sql,
            &query.order_by,
            query.limit.as_ref(),
            query.offset.as_ref(),
            params,
        )?;

        let with = self.build_with_queries(&query.with, params)?;
        if !with.is_empty() {
            sql = format!("{with}{sep}{sql}");
        }
        Ok(sql)
    }

    /// Render any expression node.
    pub fn build_expression(&self, expr: &Expression, params: &mut Params) -> QueryResult<String> {
        match expr {
            Expression::Raw(sql) => Ok(self.quoter().quote_sql(sql)),
            Expression::Template {
                sql,
                params: own_params,
            } => {
                params.merge(own_params);
                Ok(self.quoter().quote_sql(sql))
            }
            Expression::Condition(cond) => self.build_condition(cond, params),
            Expression::Query(query) => Ok(format!("({})", self.build_query(query, params)?)),
            Expression::Custom(custom) => {
                let builder = self.resolve_expression_builder(custom.as_ref())?;
                builder.build(custom.as_ref(), self, params)
            }
        }
    }

    /// Find the builder for a custom expression: its own kind first, then its ancestors.
    fn resolve_expression_builder(
        &self,
        expr: &dyn CustomExpression,
    ) -> QueryResult<&Arc<dyn ExpressionBuilder>> {
        if let Some(builder) = self.expression_builders.get(expr.kind()) {
            return Ok(builder);
        }
        for ancestor in expr.ancestors() {
            if let Some(builder) = self.expression_builders.get(*ancestor) {
                #[cfg(feature = "tracing")]
                tracing::trace!(
                    target: "querykit.sql",
                    kind = expr.kind(),
                    ancestor = *ancestor,
                    "expression builder resolved through ancestor"
                );
                return Ok(builder);
            }
        }
        Err(QueryError::UnsupportedExpression {
            kind: expr.kind().to_string(),
        })
    }

    /// Build a condition from an operator name and operands.
    ///
    /// Registered parsers win over the built-in operators.
    pub fn create_condition(&self, operator: &str, operands: Vec<Operand>) -> QueryResult<Condition> {
        match self
            .condition_parsers
            .get(&operator.trim().to_ascii_uppercase())
        {
            Some(parser) => parser(operands),
            None => Condition::from_operator(operator, operands),
        }
    }

    /// Bind a value under a fresh placeholder name.
    pub fn bind_param(&self, value: impl Into<Value>, params: &mut Params) -> String {
        params.bind(&self.dialect.param_prefix, value)
    }

    /// Render an operand: bind values, build expressions.
    pub(crate) fn build_operand(&self, operand: &Operand, params: &mut Params) -> QueryResult<String> {
        match operand {
            Operand::Value(v) => Ok(self.bind_param(v.clone(), params)),
            Operand::Expr(e) => self.build_expression(e, params),
            Operand::List(_) => Err(QueryError::invalid_argument(
                "A list is not allowed here; use an IN condition",
            )),
        }
    }

    /// Quote a column name; expression-like names get only `[[...]]` rewriting.
    pub(crate) fn quote_column(&self, name: &str) -> String {
        if name.contains('(') {
            self.quoter().quote_sql(name)
        } else {
            self.quoter().quote_column_name(name)
        }
    }

    /// Quote a table name; expression-like names get only `{{...}}` rewriting.
    pub(crate) fn quote_table(&self, name: &str) -> String {
        if name.contains('(') || name.contains("{{") {
            self.quoter().quote_sql(name)
        } else {
            self.quoter().quote_table_name(name)
        }
    }

    /// Table name as stored in metadata: delimiters stripped, `{{%name}}` resolved.
    pub fn raw_table_name(&self, name: &str) -> String {
        let quoter = self.quoter();
        let name = match name.strip_prefix("{{").and_then(|n| n.strip_suffix("}}")) {
            Some(inner) => inner.replace('%', &quoter.table_prefix),
            None => name.to_string(),
        };
        name.split('.')
            .map(|part| quoter.unquote_simple_table_name(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Metadata for `table`, if a schema provider knows it.
    pub fn table_schema(&self, table: &str) -> Option<Arc<TableSchema>> {
        let schema = self.schema.as_ref()?;
        schema.table(&self.raw_table_name(table))
    }

    /// Emit one debug event per compiled statement.
    #[allow(unused_variables)]
    pub(crate) fn log_statement(&self, statement: &str, sql: &str, params: &Params) {
        #[cfg(feature = "tracing")]
        {
            let shown = if sql.len() > MAX_LOGGED_SQL_BYTES {
                format!("{}...", truncate_sql_bytes(sql, MAX_LOGGED_SQL_BYTES))
            } else {
                sql.to_string()
            };
            tracing::debug!(
                target: "querykit.sql",
                dialect = self.dialect.name(),
                statement,
                params = params.len(),
                sql = %shown,
                "statement built"
            );
        }
    }
}

#[cfg(feature = "tracing")]
const MAX_LOGGED_SQL_BYTES: usize = 200;

#[cfg(feature = "tracing")]
fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

pub(crate) fn join_non_empty(parts: &[String], sep: &str) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(sep)
}
