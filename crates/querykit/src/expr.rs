//! Expression nodes: anything that renders to a raw SQL fragment.
//!
//! - [`Expression`] is the renderable node itself (raw SQL, templates with
//!   their own params, conditions, sub-queries, custom kinds).
//! - [`Operand`] is any right-hand side: a bound value, an expression or a list.
//! - [`Column`] is any left-hand side: a quoted name or an expression.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::builder::QueryBuilder;
use crate::condition::Condition;
use crate::error::QueryResult;
use crate::params::Params;
use crate::query::Query;
use crate::value::Value;

/// A node rendered by the expression builder registry.
#[derive(Clone, Debug)]
pub enum Expression {
    /// SQL passed through verbatim (after `[[...]]`/`{{...}}` quoting).
    Raw(String),
    /// SQL with its own named params, merged into the build's map.
    Template { sql: String, params: Params },
    Condition(Box<Condition>),
    /// A sub-query, rendered as `(<sql>)`.
    Query(Box<Query>),
    Custom(Arc<dyn CustomExpression>),
}

impl Expression {
    /// Raw SQL fragment.
    pub fn raw(sql: impl Into<String>) -> Self {
        Expression::Raw(sql.into())
    }

    /// SQL fragment carrying named parameters.
    ///
    /// # Example
    /// ```ignore
    /// Expression::template("[[age]] > :min", Params::new().with(":min", 18));
    /// ```
    pub fn template(sql: impl Into<String>, params: Params) -> Self {
        Expression::Template {
            sql: sql.into(),
            params,
        }
    }

    /// Wrap a custom expression node.
    pub fn custom(expr: impl CustomExpression + 'static) -> Self {
        Expression::Custom(Arc::new(expr))
    }

    /// Returns `true` for sub-query expressions.
    pub fn is_query(&self) -> bool {
        matches!(self, Expression::Query(_))
    }
}

impl From<Query> for Expression {
    fn from(q: Query) -> Self {
        Expression::Query(Box::new(q))
    }
}

impl From<Condition> for Expression {
    fn from(c: Condition) -> Self {
        Expression::Condition(Box::new(c))
    }
}

/// A user-defined expression kind.
///
/// Builders are looked up by [`kind`](CustomExpression::kind) first, then by
/// each entry of [`ancestors`](CustomExpression::ancestors) in order.
pub trait CustomExpression: fmt::Debug + Send + Sync {
    /// Registry key of this expression.
    fn kind(&self) -> &'static str;

    /// Kinds this expression may also be built as, closest first.
    fn ancestors(&self) -> &'static [&'static str] {
        &[]
    }

    /// Downcasting support for builders.
    fn as_any(&self) -> &dyn Any;
}

/// Renders custom expressions of one kind.
pub trait ExpressionBuilder: Send + Sync {
    fn build(
        &self,
        expr: &dyn CustomExpression,
        qb: &QueryBuilder,
        params: &mut Params,
    ) -> QueryResult<String>;
}

impl<F> ExpressionBuilder for F
where
    F: Fn(&dyn CustomExpression, &QueryBuilder, &mut Params) -> QueryResult<String> + Send + Sync,
{
    fn build(
        &self,
        expr: &dyn CustomExpression,
        qb: &QueryBuilder,
        params: &mut Params,
    ) -> QueryResult<String> {
        self(expr, qb, params)
    }
}

/// Right-hand side of a condition or assignment.
#[derive(Clone, Debug)]
pub enum Operand {
    Value(Value),
    Expr(Expression),
    List(Vec<Operand>),
}

impl Operand {
    pub fn is_null(&self) -> bool {
        matches!(self, Operand::Value(Value::Null))
    }

    /// Null, blank strings and empty lists count as empty for filter conditions.
    pub fn is_empty(&self) -> bool {
        match self {
            Operand::Value(Value::Null) => true,
            Operand::Value(Value::String(s)) => s.trim().is_empty(),
            Operand::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Returns the bound value, if this operand is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Operand::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<Expression> for Operand {
    fn from(e: Expression) -> Self {
        Operand::Expr(e)
    }
}

impl From<Query> for Operand {
    fn from(q: Query) -> Self {
        Operand::Expr(q.into())
    }
}

impl<T: Into<Operand>> From<Vec<T>> for Operand {
    fn from(items: Vec<T>) -> Self {
        Operand::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Operand>, const N: usize> From<[T; N]> for Operand {
    fn from(items: [T; N]) -> Self {
        Operand::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Operand {
    fn from(v: Option<T>) -> Self {
        Operand::Value(v.into())
    }
}

macro_rules! impl_operand_from_value {
    ($($t:ty),+ $(,)?) => {
        $(
            impl From<$t> for Operand {
                fn from(v: $t) -> Self {
                    Operand::Value(Value::from(v))
                }
            }
        )+
    };
}

impl_operand_from_value!(
    bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64,
    &str, String, &String, serde_json::Value,
    NaiveDate, NaiveDateTime, DateTime<Utc>, Uuid,
);

/// Left-hand side of a condition: a column name or an expression.
#[derive(Clone, Debug)]
pub enum Column {
    Name(String),
    Expr(Expression),
}

impl Column {
    /// Plain name, if this is not an expression.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Column::Name(n) => Some(n),
            Column::Expr(_) => None,
        }
    }
}

impl From<&str> for Column {
    fn from(s: &str) -> Self {
        Column::Name(s.to_string())
    }
}

impl From<String> for Column {
    fn from(s: String) -> Self {
        Column::Name(s)
    }
}

impl From<&String> for Column {
    fn from(s: &String) -> Self {
        Column::Name(s.clone())
    }
}

impl From<Expression> for Column {
    fn from(e: Expression) -> Self {
        Column::Expr(e)
    }
}

impl From<Query> for Column {
    fn from(q: Query) -> Self {
        Column::Expr(q.into())
    }
}
