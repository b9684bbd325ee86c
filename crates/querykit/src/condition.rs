//! Condition AST.
//!
//! Conditions are immutable values. Building one never mutates it; only the
//! caller's [`Params`](crate::Params) map changes.
//!
//! # Example
//! ```ignore
//! use querykit::Condition;
//!
//! let cond = Condition::and([
//!     Condition::hash([("status", 1)]),
//!     Condition::or_like("name", ["foo", "bar"]),
//!     Condition::in_list("id", [1, 2, 3]),
//! ]);
//! ```

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{QueryError, QueryResult};
use crate::expr::{Column, Expression, Operand};
use crate::query::Query;
use crate::value::Value;

/// Boolean joiner of a conjunction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    pub fn as_str(self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

/// `BETWEEN` or `NOT BETWEEN`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BetweenOperator {
    Between,
    NotBetween,
}

impl BetweenOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            BetweenOperator::Between => "BETWEEN",
            BetweenOperator::NotBetween => "NOT BETWEEN",
        }
    }
}

/// `IN` or `NOT IN`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InOperator {
    In,
    NotIn,
}

impl InOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            InOperator::In => "IN",
            InOperator::NotIn => "NOT IN",
        }
    }

    pub fn is_negated(self) -> bool {
        self == InOperator::NotIn
    }
}

/// Pre-parsed LIKE operator: `[AND |OR ][NOT ][I]LIKE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LikeOperator {
    /// Joins the fragments of a multi-pattern condition.
    pub joiner: Conjunction,
    pub negated: bool,
    pub case_insensitive: bool,
}

impl LikeOperator {
    pub const LIKE: LikeOperator = LikeOperator {
        joiner: Conjunction::And,
        negated: false,
        case_insensitive: false,
    };

    /// Parse an operator string such as `"OR NOT LIKE"` (case-insensitive).
    pub fn parse(op: &str) -> QueryResult<Self> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"(?i)^(AND |OR |)((NOT |)(I?)LIKE)$").expect("invalid built-in LIKE regex")
        });
        let caps = re.captures(op.trim()).ok_or_else(|| {
            QueryError::invalid_argument(format!("Invalid LIKE operator '{op}'"))
        })?;
        let joiner = if caps[1].eq_ignore_ascii_case("OR ") {
            Conjunction::Or
        } else {
            Conjunction::And
        };
        Ok(Self {
            joiner,
            negated: !caps[3].is_empty(),
            case_insensitive: !caps[4].is_empty(),
        })
    }

    /// The bare keyword: `LIKE`, `NOT LIKE`, `ILIKE` or `NOT ILIKE`.
    pub fn keyword(self) -> &'static str {
        match (self.negated, self.case_insensitive) {
            (false, false) => "LIKE",
            (true, false) => "NOT LIKE",
            (false, true) => "ILIKE",
            (true, true) => "NOT ILIKE",
        }
    }
}

impl fmt::Display for LikeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.joiner == Conjunction::Or {
            f.write_str("OR ")?;
        }
        f.write_str(self.keyword())
    }
}

/// How LIKE patterns are escaped before binding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LikeEscaping {
    /// Escape with the dialect's map and wrap in `%...%`.
    #[default]
    Default,
    /// Escape with this map and wrap in `%...%`.
    Custom(Vec<(char, String)>),
    /// Bind the pattern as given.
    Disabled,
}

/// Values of an IN condition.
#[derive(Clone, Debug)]
pub enum InValues {
    List(Vec<Operand>),
    /// Rows keyed by column name; missing keys render as `NULL`.
    Rows(Vec<Vec<(String, Operand)>>),
    Query(Box<Query>),
}

/// A boolean predicate for WHERE, HAVING or JOIN ... ON.
#[derive(Clone, Debug)]
pub enum Condition {
    /// `column OP value`
    Simple {
        operator: String,
        column: Column,
        value: Operand,
    },
    /// Implicit AND of equality, IN and IS NULL tests.
    Hash(Vec<(String, Operand)>),
    Conjunction {
        operator: Conjunction,
        operands: Vec<Condition>,
    },
    Not(Box<Condition>),
    Between {
        operator: BetweenOperator,
        column: Column,
        start: Operand,
        end: Operand,
    },
    /// `value OP start_column AND end_column`
    BetweenColumns {
        value: Operand,
        operator: BetweenOperator,
        start_column: Column,
        end_column: Column,
    },
    In {
        operator: InOperator,
        columns: Vec<Column>,
        values: InValues,
    },
    Like {
        operator: LikeOperator,
        column: Column,
        patterns: Vec<Operand>,
        escaping: LikeEscaping,
    },
    Exists {
        negated: bool,
        query: Box<Query>,
    },
    Raw(String),
    Expression(Expression),
}

impl Condition {
    /// Comparison with an explicit operator token such as `>=`, `@>` or `IS NOT`.
    pub fn compare(
        column: impl Into<Column>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> QueryResult<Self> {
        let operator = operator.trim();
        if !is_valid_simple_operator(operator) {
            return Err(QueryError::invalid_argument(format!(
                "Invalid operator '{operator}'"
            )));
        }
        Ok(Self::simple(column, operator, value))
    }

    fn simple(column: impl Into<Column>, operator: &str, value: impl Into<Operand>) -> Self {
        Condition::Simple {
            operator: operator.to_string(),
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<Column>, value: impl Into<Operand>) -> Self {
        Self::simple(column, "=", value)
    }

    pub fn ne(column: impl Into<Column>, value: impl Into<Operand>) -> Self {
        Self::simple(column, "<>", value)
    }

    pub fn gt(column: impl Into<Column>, value: impl Into<Operand>) -> Self {
        Self::simple(column, ">", value)
    }

    pub fn gte(column: impl Into<Column>, value: impl Into<Operand>) -> Self {
        Self::simple(column, ">=", value)
    }

    pub fn lt(column: impl Into<Column>, value: impl Into<Operand>) -> Self {
        Self::simple(column, "<", value)
    }

    pub fn lte(column: impl Into<Column>, value: impl Into<Operand>) -> Self {
        Self::simple(column, "<=", value)
    }

    /// Column/value pairs joined by AND.
    pub fn hash<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Operand>,
    {
        Condition::Hash(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn and(operands: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Conjunction {
            operator: Conjunction::And,
            operands: operands.into_iter().collect(),
        }
    }

    pub fn or(operands: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Conjunction {
            operator: Conjunction::Or,
            operands: operands.into_iter().collect(),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: Condition) -> Self {
        Condition::Not(Box::new(operand))
    }

    pub fn between(
        column: impl Into<Column>,
        start: impl Into<Operand>,
        end: impl Into<Operand>,
    ) -> Self {
        Condition::Between {
            operator: BetweenOperator::Between,
            column: column.into(),
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn not_between(
        column: impl Into<Column>,
        start: impl Into<Operand>,
        end: impl Into<Operand>,
    ) -> Self {
        Condition::Between {
            operator: BetweenOperator::NotBetween,
            column: column.into(),
            start: start.into(),
            end: end.into(),
        }
    }

    /// `value BETWEEN start_column AND end_column`
    pub fn between_columns(
        value: impl Into<Operand>,
        start_column: impl Into<Column>,
        end_column: impl Into<Column>,
    ) -> Self {
        Condition::BetweenColumns {
            value: value.into(),
            operator: BetweenOperator::Between,
            start_column: start_column.into(),
            end_column: end_column.into(),
        }
    }

    /// `value NOT BETWEEN start_column AND end_column`
    pub fn not_between_columns(
        value: impl Into<Operand>,
        start_column: impl Into<Column>,
        end_column: impl Into<Column>,
    ) -> Self {
        Condition::BetweenColumns {
            value: value.into(),
            operator: BetweenOperator::NotBetween,
            start_column: start_column.into(),
            end_column: end_column.into(),
        }
    }

    pub fn in_list<I, V>(column: impl Into<Column>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        Condition::In {
            operator: InOperator::In,
            columns: vec![column.into()],
            values: InValues::List(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn not_in<I, V>(column: impl Into<Column>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        Condition::In {
            operator: InOperator::NotIn,
            columns: vec![column.into()],
            values: InValues::List(values.into_iter().map(Into::into).collect()),
        }
    }

    /// `(columns) IN (<sub-query>)`
    pub fn in_query<I, C>(columns: I, query: Query) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        Condition::In {
            operator: InOperator::In,
            columns: columns.into_iter().map(Into::into).collect(),
            values: InValues::Query(Box::new(query)),
        }
    }

    /// `(columns) NOT IN (<sub-query>)`
    pub fn not_in_query<I, C>(columns: I, query: Query) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        Condition::In {
            operator: InOperator::NotIn,
            columns: columns.into_iter().map(Into::into).collect(),
            values: InValues::Query(Box::new(query)),
        }
    }

    /// Composite-key IN over rows keyed by column name.
    pub fn in_rows<I, C, R, K, V>(columns: I, rows: R) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
        R: IntoIterator<Item = Vec<(K, V)>>,
        K: Into<String>,
        V: Into<Operand>,
    {
        Self::rows(InOperator::In, columns, rows)
    }

    /// Composite-key NOT IN over rows keyed by column name.
    pub fn not_in_rows<I, C, R, K, V>(columns: I, rows: R) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
        R: IntoIterator<Item = Vec<(K, V)>>,
        K: Into<String>,
        V: Into<Operand>,
    {
        Self::rows(InOperator::NotIn, columns, rows)
    }

    fn rows<I, C, R, K, V>(operator: InOperator, columns: I, rows: R) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
        R: IntoIterator<Item = Vec<(K, V)>>,
        K: Into<String>,
        V: Into<Operand>,
    {
        Condition::In {
            operator,
            columns: columns.into_iter().map(Into::into).collect(),
            values: InValues::Rows(
                rows.into_iter()
                    .map(|row| row.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
                    .collect(),
            ),
        }
    }

    fn like_with<I, V>(operator: LikeOperator, column: impl Into<Column>, patterns: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        Condition::Like {
            operator,
            column: column.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
            escaping: LikeEscaping::Default,
        }
    }

    /// `column LIKE '%p1%' AND column LIKE '%p2%' ...`
    pub fn like<I, V>(column: impl Into<Column>, patterns: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        Self::like_with(LikeOperator::LIKE, column, patterns)
    }

    pub fn not_like<I, V>(column: impl Into<Column>, patterns: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        let op = LikeOperator {
            negated: true,
            ..LikeOperator::LIKE
        };
        Self::like_with(op, column, patterns)
    }

    /// `column LIKE '%p1%' OR column LIKE '%p2%' ...`
    pub fn or_like<I, V>(column: impl Into<Column>, patterns: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        let op = LikeOperator {
            joiner: Conjunction::Or,
            ..LikeOperator::LIKE
        };
        Self::like_with(op, column, patterns)
    }

    pub fn or_not_like<I, V>(column: impl Into<Column>, patterns: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        let op = LikeOperator {
            joiner: Conjunction::Or,
            negated: true,
            case_insensitive: false,
        };
        Self::like_with(op, column, patterns)
    }

    /// Case-insensitive LIKE. Dialects without `ILIKE` fall back to `LIKE`.
    pub fn ilike<I, V>(column: impl Into<Column>, patterns: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        let op = LikeOperator {
            case_insensitive: true,
            ..LikeOperator::LIKE
        };
        Self::like_with(op, column, patterns)
    }

    /// LIKE with an operator string such as `"or not like"`.
    pub fn like_op<I, V>(operator: &str, column: impl Into<Column>, patterns: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        Ok(Self::like_with(LikeOperator::parse(operator)?, column, patterns))
    }

    /// Replace the escaping rule of a LIKE condition. Other conditions are unchanged.
    pub fn escaping(mut self, rule: LikeEscaping) -> Self {
        if let Condition::Like { escaping, .. } = &mut self {
            *escaping = rule;
        }
        self
    }

    pub fn exists(query: Query) -> Self {
        Condition::Exists {
            negated: false,
            query: Box::new(query),
        }
    }

    pub fn not_exists(query: Query) -> Self {
        Condition::Exists {
            negated: true,
            query: Box::new(query),
        }
    }

    /// Raw SQL condition.
    pub fn raw(sql: impl Into<String>) -> Self {
        Condition::Raw(sql.into())
    }

    /// Condition from an arbitrary expression.
    pub fn expr(expression: Expression) -> Self {
        Condition::Expression(expression)
    }

    /// Build a condition from an operator name and its operands.
    ///
    /// Recognised operators: `and`, `or`, `not`, `between`, `not between`,
    /// `in`, `not in`, the LIKE family, `exists` and `not exists`. Any other
    /// operator must be a valid comparison token with exactly two operands.
    pub fn from_operator(operator: &str, operands: Vec<Operand>) -> QueryResult<Self> {
        let op = operator.trim();
        let upper = op.to_ascii_uppercase();
        match upper.as_str() {
            "AND" | "OR" => {
                let conds = operands
                    .into_iter()
                    .map(operand_to_condition)
                    .collect::<QueryResult<Vec<_>>>()?;
                Ok(if upper == "AND" {
                    Self::and(conds)
                } else {
                    Self::or(conds)
                })
            }
            "NOT" => {
                let [operand] = take_operands::<1>(op, operands)?;
                Ok(Self::not(operand_to_condition(operand)?))
            }
            "BETWEEN" | "NOT BETWEEN" => {
                let [column, start, end] = take_operands::<3>(op, operands)?;
                Ok(Condition::Between {
                    operator: if upper == "BETWEEN" {
                        BetweenOperator::Between
                    } else {
                        BetweenOperator::NotBetween
                    },
                    column: operand_to_column(column)?,
                    start,
                    end,
                })
            }
            "IN" | "NOT IN" => {
                let [columns, values] = take_operands::<2>(op, operands)?;
                let operator = if upper == "IN" {
                    InOperator::In
                } else {
                    InOperator::NotIn
                };
                let columns = match columns {
                    Operand::List(items) => items
                        .into_iter()
                        .map(operand_to_column)
                        .collect::<QueryResult<Vec<_>>>()?,
                    other => vec![operand_to_column(other)?],
                };
                let values = match values {
                    Operand::List(items) => InValues::List(items),
                    Operand::Expr(Expression::Query(q)) => InValues::Query(q),
                    other => InValues::List(vec![other]),
                };
                Ok(Condition::In {
                    operator,
                    columns,
                    values,
                })
            }
            "EXISTS" | "NOT EXISTS" => {
                let [query] = take_operands::<1>(op, operands)?;
                match query {
                    Operand::Expr(Expression::Query(q)) => Ok(Condition::Exists {
                        negated: upper != "EXISTS",
                        query: q,
                    }),
                    _ => Err(QueryError::invalid_argument(format!(
                        "Operator '{op}' requires a sub-query operand"
                    ))),
                }
            }
            _ if upper.ends_with("LIKE") => {
                let operator = LikeOperator::parse(op)?;
                if operands.len() < 2 || operands.len() > 3 {
                    return Err(QueryError::invalid_argument(format!(
                        "Operator '{op}' requires two or three operands"
                    )));
                }
                let mut operands = operands.into_iter();
                let column = operands.next().map(operand_to_column).transpose()?;
                let patterns = match operands.next() {
                    Some(Operand::List(items)) => items,
                    Some(other) => vec![other],
                    None => Vec::new(),
                };
                let escaping = match operands.next() {
                    Some(Operand::Value(Value::Bool(false))) => LikeEscaping::Disabled,
                    _ => LikeEscaping::Default,
                };
                let column = column.ok_or_else(|| {
                    QueryError::invalid_argument(format!("Operator '{op}' requires a column"))
                })?;
                Ok(Condition::Like {
                    operator,
                    column,
                    patterns,
                    escaping,
                })
            }
            _ => {
                if !is_valid_simple_operator(op) {
                    return Err(QueryError::invalid_argument(format!(
                        "Invalid operator '{op}'"
                    )));
                }
                let [column, value] = take_operands::<2>(op, operands)?;
                Ok(Condition::Simple {
                    operator: op.to_string(),
                    column: operand_to_column(column)?,
                    value,
                })
            }
        }
    }

    /// Drop operands with empty values. Returns `None` when nothing is left.
    ///
    /// Used by [`Query::filter_where`] for optional search filters.
    pub fn filtered(self) -> Option<Condition> {
        match self {
            Condition::Hash(pairs) => {
                let pairs: Vec<_> = pairs.into_iter().filter(|(_, v)| !v.is_empty()).collect();
                (!pairs.is_empty()).then_some(Condition::Hash(pairs))
            }
            Condition::Conjunction { operator, operands } => {
                let operands: Vec<_> = operands.into_iter().filter_map(Condition::filtered).collect();
                (!operands.is_empty()).then_some(Condition::Conjunction { operator, operands })
            }
            Condition::Not(inner) => inner.filtered().map(Condition::not),
            Condition::Simple { ref value, .. } if value.is_empty() => None,
            Condition::Between {
                ref start, ref end, ..
            } if start.is_empty() || end.is_empty() => None,
            Condition::In {
                values: InValues::List(ref items),
                ..
            } if items.is_empty() => None,
            Condition::In {
                values: InValues::Rows(ref rows),
                ..
            } if rows.is_empty() => None,
            Condition::Like { ref patterns, .. }
                if patterns.iter().all(Operand::is_empty) =>
            {
                None
            }
            other => Some(other),
        }
    }
}

impl From<&str> for Condition {
    fn from(sql: &str) -> Self {
        Condition::Raw(sql.to_string())
    }
}

impl From<String> for Condition {
    fn from(sql: String) -> Self {
        Condition::Raw(sql)
    }
}

impl From<Expression> for Condition {
    fn from(e: Expression) -> Self {
        match e {
            Expression::Condition(c) => *c,
            other => Condition::Expression(other),
        }
    }
}

/// Symbolic operators (`=`, `>=`, `@>`, `->>`, ...) or keyword phrases (`IS NOT`, `REGEXP`).
fn is_valid_simple_operator(op: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^(?:[<>=!~*@#&|^%?+\-/]+|[A-Za-z]+(?: [A-Za-z]+)*)$")
            .expect("invalid built-in operator regex")
    });
    re.is_match(op)
}

fn take_operands<const N: usize>(op: &str, operands: Vec<Operand>) -> QueryResult<[Operand; N]> {
    let count = operands.len();
    operands.try_into().map_err(|_| {
        QueryError::invalid_argument(format!(
            "Operator '{op}' requires {N} operand(s), got {count}"
        ))
    })
}

fn operand_to_column(operand: Operand) -> QueryResult<Column> {
    match operand {
        Operand::Value(Value::String(name)) => Ok(Column::Name(name)),
        Operand::Expr(e) => Ok(Column::Expr(e)),
        other => Err(QueryError::invalid_argument(format!(
            "Expected a column name or expression, got {other:?}"
        ))),
    }
}

fn operand_to_condition(operand: Operand) -> QueryResult<Condition> {
    match operand {
        Operand::Value(Value::String(sql)) => Ok(Condition::Raw(sql)),
        Operand::Expr(e) => Ok(e.into()),
        other => Err(QueryError::invalid_argument(format!(
            "Expected a condition, got {other:?}"
        ))),
    }
}
