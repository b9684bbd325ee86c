//! Condition builders: one per [`Condition`] variant.

use crate::condition::{
    BetweenOperator, Condition, Conjunction, InOperator, InValues, LikeEscaping, LikeOperator,
};
use crate::dialect::escape_like_with;
use crate::error::{QueryError, QueryResult};
use crate::expr::{Column, Expression, Operand};
use crate::params::Params;
use crate::query::Query;
use crate::value::Value;

use super::QueryBuilder;

/// Vacuous result of a test over an empty set: `IN ()` is false, `NOT IN ()` is true.
fn empty_set_result(operator: InOperator) -> String {
    match operator {
        InOperator::In => "0=1".to_string(),
        InOperator::NotIn => String::new(),
    }
}

impl QueryBuilder {
    /// Render a condition. An empty string means "no condition".
    pub fn build_condition(&self, cond: &Condition, params: &mut Params) -> QueryResult<String> {
        match cond {
            Condition::Simple {
                operator,
                column,
                value,
            } => self.build_simple(operator, column, value, params),
            Condition::Hash(pairs) => self.build_hash(pairs, params),
            Condition::Conjunction { operator, operands } => {
                self.build_conjunction(*operator, operands, params)
            }
            Condition::Not(inner) => {
                let sql = self.build_condition(inner, params)?;
                if sql.is_empty() {
                    Ok(String::new())
                } else {
                    Ok(format!("NOT ({sql})"))
                }
            }
            Condition::Between {
                operator,
                column,
                start,
                end,
            } => {
                let column = self.build_column(column, params)?;
                let start = self.build_operand(start, params)?;
                let end = self.build_operand(end, params)?;
                Ok(format!("{column} {} {start} AND {end}", operator.as_str()))
            }
            Condition::BetweenColumns {
                value,
                operator,
                start_column,
                end_column,
            } => self.build_between_columns(value, *operator, start_column, end_column, params),
            Condition::In {
                operator,
                columns,
                values,
            } => self.build_in(*operator, columns, values, params),
            Condition::Like {
                operator,
                column,
                patterns,
                escaping,
            } => self.build_like(*operator, column, patterns, escaping, params),
            Condition::Exists { negated, query } => {
                let sql = self.build_query(query, params)?;
                let keyword = if *negated { "NOT EXISTS" } else { "EXISTS" };
                Ok(format!("{keyword} ({sql})"))
            }
            Condition::Raw(sql) => Ok(self.quoter().quote_sql(sql)),
            Condition::Expression(expr) => self.build_expression(expr, params),
        }
    }

    /// Left-hand side: quote names, build expressions.
    pub(crate) fn build_column(&self, column: &Column, params: &mut Params) -> QueryResult<String> {
        match column {
            Column::Name(name) => Ok(self.quote_column(name)),
            Column::Expr(expr) => self.build_expression(expr, params),
        }
    }

    fn build_simple(
        &self,
        operator: &str,
        column: &Column,
        value: &Operand,
        params: &mut Params,
    ) -> QueryResult<String> {
        let column = self.build_column(column, params)?;
        if value.is_null() {
            return Ok(format!("{column} {operator} NULL"));
        }
        let value = self.build_operand(value, params)?;
        Ok(format!("{column} {operator} {value}"))
    }

    fn build_hash(&self, pairs: &[(String, Operand)], params: &mut Params) -> QueryResult<String> {
        let mut parts = Vec::with_capacity(pairs.len());
        for (column, value) in pairs {
            let part = match value {
                Operand::List(items) => self.build_in(
                    InOperator::In,
                    &[Column::Name(column.clone())],
                    &InValues::List(items.clone()),
                    params,
                )?,
                Operand::Expr(Expression::Query(query)) => self.build_in(
                    InOperator::In,
                    &[Column::Name(column.clone())],
                    &InValues::Query(query.clone()),
                    params,
                )?,
                Operand::Value(Value::Null) => format!("{} IS NULL", self.quote_column(column)),
                other => {
                    let value = self.build_operand(other, params)?;
                    format!("{}={value}", self.quote_column(column))
                }
            };
            parts.push(part);
        }
        Ok(match parts.len() {
            0 => String::new(),
            1 => parts.remove(0),
            _ => format!("({})", parts.join(") AND (")),
        })
    }

    fn build_conjunction(
        &self,
        operator: Conjunction,
        operands: &[Condition],
        params: &mut Params,
    ) -> QueryResult<String> {
        let mut parts = Vec::with_capacity(operands.len());
        for operand in operands {
            let sql = self.build_condition(operand, params)?;
            if !sql.is_empty() {
                parts.push(sql);
            }
        }
        Ok(match parts.len() {
            0 => String::new(),
            1 => parts.remove(0),
            _ => format!("({})", parts.join(&format!(") {} (", operator.as_str()))),
        })
    }

    fn build_between_columns(
        &self,
        value: &Operand,
        operator: BetweenOperator,
        start_column: &Column,
        end_column: &Column,
        params: &mut Params,
    ) -> QueryResult<String> {
        let start = self.build_column(start_column, params)?;
        let end = self.build_column(end_column, params)?;
        let value = self.build_operand(value, params)?;
        Ok(format!("{value} {} {start} AND {end}", operator.as_str()))
    }

    fn build_in(
        &self,
        operator: InOperator,
        columns: &[Column],
        values: &InValues,
        params: &mut Params,
    ) -> QueryResult<String> {
        if columns.is_empty() {
            return Ok(empty_set_result(operator));
        }
        if let InValues::Query(query) = values {
            return self.build_subquery_in(operator, columns, query, params);
        }
        if columns.len() > 1 {
            return self.build_composite_in(operator, columns, values, params);
        }

        let column = &columns[0];
        let raw_values: Vec<&Operand> = match values {
            InValues::List(items) => items.iter().collect(),
            InValues::Rows(rows) => {
                let name = column.as_name().ok_or_else(|| {
                    QueryError::invalid_argument("IN over row values requires a plain column name")
                })?;
                rows.iter()
                    .map(|row| row_value(row, name).unwrap_or(&NULL_OPERAND))
                    .collect()
            }
            InValues::Query(_) => Vec::new(),
        };

        if raw_values.is_empty() {
            return Ok(empty_set_result(operator));
        }

        // Built once: an expression column may bind its own params.
        let col = self.build_column(column, params)?;
        let null_condition = if raw_values.iter().any(|v| v.is_null()) {
            Some(match operator {
                InOperator::In => format!("{col} IS NULL"),
                InOperator::NotIn => format!("{col} IS NOT NULL"),
            })
        } else {
            None
        };

        let mut sql_values = Vec::with_capacity(raw_values.len());
        for value in raw_values {
            if value.is_null() {
                continue;
            }
            sql_values.push(self.build_operand(value, params)?);
        }

        if sql_values.is_empty() {
            return Ok(null_condition.unwrap_or_else(|| empty_set_result(operator)));
        }

        let sql = if sql_values.len() > 1 {
            format!("{col} {} ({})", operator.as_str(), sql_values.join(", "))
        } else {
            let op = match operator {
                InOperator::In => "=",
                InOperator::NotIn => "<>",
            };
            format!("{col}{op}{}", sql_values[0])
        };

        Ok(match null_condition {
            Some(null_sql) => {
                let joiner = match operator {
                    InOperator::In => " OR ",
                    InOperator::NotIn => " AND ",
                };
                format!("{sql}{joiner}{null_sql}")
            }
            None => sql,
        })
    }

    fn build_subquery_in(
        &self,
        operator: InOperator,
        columns: &[Column],
        query: &Query,
        params: &mut Params,
    ) -> QueryResult<String> {
        let sql = self.build_query(query, params)?;
        let cols = columns
            .iter()
            .map(|c| self.build_column(c, params))
            .collect::<QueryResult<Vec<_>>>()?;
        if cols.len() == 1 {
            Ok(format!("{} {} ({sql})", cols[0], operator.as_str()))
        } else {
            Ok(format!("({}) {} ({sql})", cols.join(", "), operator.as_str()))
        }
    }

    fn build_composite_in(
        &self,
        operator: InOperator,
        columns: &[Column],
        values: &InValues,
        params: &mut Params,
    ) -> QueryResult<String> {
        let names = columns
            .iter()
            .map(|c| {
                c.as_name().map(str::to_string).ok_or_else(|| {
                    QueryError::invalid_argument("Composite IN requires plain column names")
                })
            })
            .collect::<QueryResult<Vec<_>>>()?;

        // Each row becomes one optional operand per column.
        let rows: Vec<Vec<Option<&Operand>>> = match values {
            InValues::Rows(rows) => rows
                .iter()
                .map(|row| names.iter().map(|n| row_value(row, n)).collect())
                .collect(),
            InValues::List(items) => items
                .iter()
                .map(|item| match item {
                    Operand::List(tuple) => Ok((0..names.len()).map(|i| tuple.get(i)).collect()),
                    other => Err(QueryError::invalid_argument(format!(
                        "Composite IN expects row values, got {other:?}"
                    ))),
                })
                .collect::<QueryResult<Vec<_>>>()?,
            InValues::Query(_) => Vec::new(),
        };

        if rows.is_empty() {
            return Ok(empty_set_result(operator));
        }

        let quoted: Vec<String> = names.iter().map(|n| self.quote_column(n)).collect();

        if !self.dialect.supports_tuple_in {
            let (cmp, null_test, inner, outer) = match operator {
                InOperator::In => (" = ", " IS NULL", " AND ", " OR "),
                InOperator::NotIn => (" != ", " IS NOT NULL", " OR ", " AND "),
            };
            let mut groups = Vec::with_capacity(rows.len());
            for row in rows {
                let mut tests = Vec::with_capacity(quoted.len());
                for (col, value) in quoted.iter().zip(row) {
                    match value {
                        Some(v) if !v.is_null() => {
                            tests.push(format!("{col}{cmp}{}", self.build_operand(v, params)?));
                        }
                        _ => tests.push(format!("{col}{null_test}")),
                    }
                }
                groups.push(format!("({})", tests.join(inner)));
            }
            return Ok(format!("({})", groups.join(outer)));
        }

        let mut tuples = Vec::with_capacity(rows.len());
        for row in rows {
            let mut vs = Vec::with_capacity(row.len());
            for value in row {
                match value {
                    Some(v) if !v.is_null() => vs.push(self.build_operand(v, params)?),
                    _ => vs.push("NULL".to_string()),
                }
            }
            tuples.push(format!("({})", vs.join(", ")));
        }
        Ok(format!(
            "({}) {} ({})",
            quoted.join(", "),
            operator.as_str(),
            tuples.join(", ")
        ))
    }

    fn build_like(
        &self,
        operator: LikeOperator,
        column: &Column,
        patterns: &[Operand],
        escaping: &LikeEscaping,
        params: &mut Params,
    ) -> QueryResult<String> {
        if patterns.is_empty() {
            return Ok(if operator.negated {
                String::new()
            } else {
                "0=1".to_string()
            });
        }

        let column = self.build_column(column, params)?;
        let keyword = if operator.case_insensitive && !self.dialect.supports_ilike {
            LikeOperator {
                case_insensitive: false,
                ..operator
            }
            .keyword()
        } else {
            operator.keyword()
        };
        let escape_sql = match self.dialect.like_escape_char {
            Some(c) => format!(" ESCAPE {}", self.quoter().quote_string(&c.to_string())),
            None => String::new(),
        };
        let map = match escaping {
            LikeEscaping::Default => Some(self.dialect.like_escaping.as_slice()),
            LikeEscaping::Custom(map) if !map.is_empty() => Some(map.as_slice()),
            LikeEscaping::Custom(_) | LikeEscaping::Disabled => None,
        };

        let mut parts = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let placeholder = match pattern {
                Operand::Expr(expr) => self.build_expression(expr, params)?,
                Operand::Value(value) => {
                    let bound = match map {
                        Some(map) => {
                            let text = value.to_plain_string();
                            Value::String(format!("%{}%", escape_like_with(&text, map)))
                        }
                        None => value.clone(),
                    };
                    self.bind_param(bound, params)
                }
                Operand::List(_) => {
                    return Err(QueryError::invalid_argument(
                        "LIKE patterns must be values or expressions",
                    ));
                }
            };
            parts.push(format!("{column} {keyword} {placeholder}{escape_sql}"));
        }
        Ok(parts.join(&format!(" {} ", operator.joiner.as_str())))
    }
}

static NULL_OPERAND: Operand = Operand::Value(Value::Null);

fn row_value<'a>(row: &'a [(String, Operand)], column: &str) -> Option<&'a Operand> {
    row.iter().find(|(k, _)| k == column).map(|(_, v)| v)
}
