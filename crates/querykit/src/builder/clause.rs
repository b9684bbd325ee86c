//! Clause builders used by [`QueryBuilder::build_query`].

use std::sync::OnceLock;

use regex::Regex;

use crate::condition::Condition;
use crate::dialect::DialectKind;
use crate::error::{QueryError, QueryResult};
use crate::expr::Column;
use crate::params::Params;
use crate::query::{Join, Limit, OrderBy, SelectColumn, SortDirection, TableRef, Union, UnionSource, WithQuery};

use super::QueryBuilder;

/// `expr AS alias` or `expr alias` in a select item.
pub(crate) fn select_alias_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.*?)(?i:\s+as\s+|\s+)([\w\-_\.]+)$").expect("invalid built-in alias regex")
    })
}

/// `table AS alias` or `table alias` in a FROM item.
fn table_alias_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.*?)(?i:\s+as|)\s+([^ ]+)$").expect("invalid built-in alias regex")
    })
}

impl QueryBuilder {
    pub(crate) fn build_select(
        &self,
        columns: &[SelectColumn],
        distinct: bool,
        option: Option<&str>,
        params: &mut Params,
    ) -> QueryResult<String> {
        let mut select = String::from(if distinct { "SELECT DISTINCT" } else { "SELECT" });
        if let Some(option) = option {
            select.push(' ');
            select.push_str(option);
        }
        if columns.is_empty() {
            select.push_str(" *");
            return Ok(select);
        }

        let mut parts = Vec::with_capacity(columns.len());
        for SelectColumn { column, alias } in columns {
            let part = match (column, alias) {
                (Column::Expr(expr), Some(alias)) => format!(
                    "{} AS {}",
                    self.build_expression(expr, params)?,
                    self.quoter().quote_column_name(alias)
                ),
                (Column::Expr(expr), None) => self.build_expression(expr, params)?,
                (Column::Name(name), Some(alias)) if name != alias => format!(
                    "{} AS {}",
                    self.quote_column(name),
                    self.quoter().quote_column_name(alias)
                ),
                (Column::Name(name), _) if name.contains('(') => self.quoter().quote_sql(name),
                (Column::Name(name), _) => match select_alias_regex().captures(name) {
                    Some(caps) => format!(
                        "{} AS {}",
                        self.quoter().quote_column_name(&caps[1]),
                        self.quoter().quote_column_name(&caps[2])
                    ),
                    None => self.quoter().quote_column_name(name),
                },
            };
            parts.push(part);
        }
        Ok(format!("{select} {}", parts.join(", ")))
    }

    pub(crate) fn build_from(&self, tables: &[TableRef], params: &mut Params) -> QueryResult<String> {
        if tables.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("FROM {}", self.quote_table_refs(tables, params)?.join(", ")))
    }

    pub(crate) fn quote_table_refs(
        &self,
        tables: &[TableRef],
        params: &mut Params,
    ) -> QueryResult<Vec<String>> {
        let mut out = Vec::with_capacity(tables.len());
        for TableRef { source, alias } in tables {
            let quoted = match (source, alias) {
                (Column::Expr(expr), Some(alias)) => format!(
                    "{} {}",
                    self.build_expression(expr, params)?,
                    self.quoter().quote_table_name(alias)
                ),
                (Column::Expr(expr), None) => self.build_expression(expr, params)?,
                (Column::Name(name), Some(alias)) => format!(
                    "{} {}",
                    self.quote_table(name),
                    self.quoter().quote_table_name(alias)
                ),
                (Column::Name(name), None) if name.contains('(') => self.quoter().quote_sql(name),
                (Column::Name(name), None) => match table_alias_regex().captures(name) {
                    Some(caps) => format!(
                        "{} {}",
                        self.quote_table(&caps[1]),
                        self.quoter().quote_table_name(&caps[2])
                    ),
                    None => self.quote_table(name),
                },
            };
            out.push(quoted);
        }
        Ok(out)
    }

    pub(crate) fn build_join(&self, joins: &[Join], params: &mut Params) -> QueryResult<String> {
        let mut parts = Vec::with_capacity(joins.len());
        for join in joins {
            let join_type = join.join_type.trim();
            if join_type.is_empty() {
                return Err(QueryError::MalformedJoin(
                    "a join must specify its join type".to_string(),
                ));
            }
            if matches!(&join.table.source, Column::Name(name) if name.trim().is_empty()) {
                return Err(QueryError::MalformedJoin(format!(
                    "{join_type} must specify the joined table"
                )));
            }
            let table = self
                .quote_table_refs(std::slice::from_ref(&join.table), params)?
                .remove(0);
            let mut sql = format!("{join_type} {table}");
            if let Some(on) = &join.on {
                let condition = self.build_condition(on, params)?;
                if !condition.is_empty() {
                    sql.push_str(" ON ");
                    sql.push_str(&condition);
                }
            }
            parts.push(sql);
        }
        Ok(parts.join(&self.dialect.separator))
    }

    pub(crate) fn build_where(
        &self,
        condition: Option<&Condition>,
        params: &mut Params,
    ) -> QueryResult<String> {
        self.prefixed_condition("WHERE", condition, params)
    }

    pub(crate) fn build_having(
        &self,
        condition: Option<&Condition>,
        params: &mut Params,
    ) -> QueryResult<String> {
        self.prefixed_condition("HAVING", condition, params)
    }

    fn prefixed_condition(
        &self,
        keyword: &str,
        condition: Option<&Condition>,
        params: &mut Params,
    ) -> QueryResult<String> {
        let Some(condition) = condition else {
            return Ok(String::new());
        };
        let sql = self.build_condition(condition, params)?;
        Ok(if sql.is_empty() {
            sql
        } else {
            format!("{keyword} {sql}")
        })
    }

    pub(crate) fn build_group_by(&self, columns: &[Column], params: &mut Params) -> QueryResult<String> {
        if columns.is_empty() {
            return Ok(String::new());
        }
        let cols = columns
            .iter()
            .map(|c| self.build_column(c, params))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(format!("GROUP BY {}", cols.join(", ")))
    }

    pub(crate) fn build_order_by(&self, columns: &[OrderBy], params: &mut Params) -> QueryResult<String> {
        if columns.is_empty() {
            return Ok(String::new());
        }
        let mut orders = Vec::with_capacity(columns.len());
        for OrderBy { column, direction } in columns {
            match column {
                Column::Expr(expr) => orders.push(self.build_expression(expr, params)?),
                Column::Name(name) => {
                    let mut sql = self.quote_column(name);
                    if *direction == SortDirection::Desc {
                        sql.push_str(" DESC");
                    }
                    orders.push(sql);
                }
            }
        }
        Ok(format!("ORDER BY {}", orders.join(", ")))
    }

    /// Render a LIMIT/OFFSET value. `None` disables the clause.
    fn limit_value(&self, value: Option<&Limit>, params: &mut Params) -> QueryResult<Option<String>> {
        match value {
            Some(Limit::Count(n)) if *n >= 0 => Ok(Some(n.to_string())),
            Some(Limit::Expr(expr)) => Ok(Some(self.build_expression(expr, params)?)),
            _ => Ok(None),
        }
    }

    pub(crate) fn build_limit(
        &self,
        limit: Option<&Limit>,
        offset: Option<&Limit>,
        params: &mut Params,
    ) -> QueryResult<String> {
        let limit = self.limit_value(limit, params)?;
        let offset = self
            .limit_value(offset, params)?
            .filter(|o| o != "0");

        let sql = match (self.dialect.kind, limit, offset) {
            (_, None, None) => String::new(),
            (DialectKind::MySql, None, Some(offset)) => {
                format!("LIMIT {offset}, 18446744073709551615")
            }
            (DialectKind::Sqlite, None, Some(offset)) => {
                format!("LIMIT 9223372036854775807 OFFSET {offset}")
            }
            (_, Some(limit), Some(offset)) => format!("LIMIT {limit} OFFSET {offset}"),
            (_, Some(limit), None) => format!("LIMIT {limit}"),
            (_, None, Some(offset)) => format!("OFFSET {offset}"),
        };
        Ok(sql)
    }

    /// Append ORDER BY and pagination to `sql`.
    pub(crate) fn build_order_by_and_limit(
        &self,
        mut sql: String,
        order_by: &[OrderBy],
        limit: Option<&Limit>,
        offset: Option<&Limit>,
        params: &mut Params,
    ) -> QueryResult<String> {
        let sep = self.dialect.separator.as_str();
        let order = self.build_order_by(order_by, params)?;

        if self.dialect.kind == DialectKind::Mssql {
            let limit = self.limit_value(limit, params)?;
            let offset = self.limit_value(offset, params)?;
            if limit.is_none() && offset.is_none() {
                if !order.is_empty() {
                    sql.push_str(sep);
                    sql.push_str(&order);
                }
                return Ok(sql);
            }
            let order = if order.is_empty() {
                "ORDER BY (SELECT NULL)".to_string()
            } else {
                order
            };
            sql.push_str(sep);
            sql.push_str(&order);
            sql.push_str(sep);
            sql.push_str(&format!("OFFSET {} ROWS", offset.as_deref().unwrap_or("0")));
            if let Some(limit) = limit {
                sql.push_str(sep);
                sql.push_str(&format!("FETCH NEXT {limit} ROWS ONLY"));
            }
            return Ok(sql);
        }

        if !order.is_empty() {
            sql.push_str(sep);
            sql.push_str(&order);
        }
        let limit = self.build_limit(limit, offset, params)?;
        if !limit.is_empty() {
            sql.push_str(sep);
            sql.push_str(&limit);
        }
        Ok(sql)
    }

    pub(crate) fn build_union(&self, unions: &[Union], params: &mut Params) -> QueryResult<String> {
        let mut parts = Vec::with_capacity(unions.len());
        for Union { source, all } in unions {
            let sql = match source {
                UnionSource::Query(query) => self.build_query(query, params)?,
                UnionSource::Raw(sql) => self.quoter().quote_sql(sql),
            };
            let keyword = if *all { "UNION ALL" } else { "UNION" };
            if self.dialect.parenthesize_union {
                parts.push(format!("{keyword} ( {sql} )"));
            } else {
                parts.push(format!("{keyword} {sql}"));
            }
        }
        Ok(parts.join(self.dialect.separator.as_str()))
    }

    pub(crate) fn build_with_queries(
        &self,
        withs: &[WithQuery],
        params: &mut Params,
    ) -> QueryResult<String> {
        if withs.is_empty() {
            return Ok(String::new());
        }
        let mut recursive = false;
        let mut parts = Vec::with_capacity(withs.len());
        for with in withs {
            recursive |= with.recursive;
            let sql = self.build_query(&with.query, params)?;
            parts.push(format!("{} AS ({sql})", self.quoter().quote_sql(&with.alias)));
        }
        let keyword = if recursive && self.dialect.supports_recursive_keyword {
            "WITH RECURSIVE"
        } else {
            "WITH"
        };
        Ok(format!("{keyword} {}", parts.join(", ")))
    }
}
