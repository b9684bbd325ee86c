//! Query AST with a fluent, consuming builder API.
//!
//! A [`Query`] only accumulates parts; it is turned into SQL by
//! [`QueryBuilder::build`](crate::QueryBuilder::build).
//!
//! # Example
//! ```ignore
//! use querykit::{Condition, Query};
//!
//! let q = Query::new()
//!     .select("id, name")
//!     .from("user u")
//!     .left_join("profile p", "p.user_id = u.id")
//!     .where_(Condition::hash([("status", 1)]))
//!     .and_where(Condition::gt("age", 18))
//!     .order_by("name, id DESC")
//!     .limit(10);
//! ```

use crate::condition::{Condition, Conjunction};
use crate::expr::{Column, Expression};
use crate::params::Params;

/// A selected column with an optional alias.
#[derive(Clone, Debug)]
pub struct SelectColumn {
    pub column: Column,
    pub alias: Option<String>,
}

impl SelectColumn {
    pub fn aliased(column: impl Into<Column>, alias: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            alias: Some(alias.into()),
        }
    }
}

macro_rules! impl_from_column_like {
    ($target:ident, $field:ident: $($t:ty),+) => {
        $(
            impl From<$t> for $target {
                fn from(v: $t) -> Self {
                    Self {
                        $field: Column::from(v),
                        alias: None,
                    }
                }
            }
        )+
    };
}

impl_from_column_like!(SelectColumn, column: &str, String, Column, Expression, Query);

/// A FROM or JOIN target: table name (with optional inline alias), sub-query or expression.
#[derive(Clone, Debug)]
pub struct TableRef {
    pub source: Column,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn aliased(source: impl Into<Column>, alias: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            alias: Some(alias.into()),
        }
    }
}

impl_from_column_like!(TableRef, source: &str, String, Column, Expression, Query);

/// A JOIN entry.
#[derive(Clone, Debug)]
pub struct Join {
    /// `INNER JOIN`, `LEFT JOIN`, ...
    pub join_type: String,
    pub table: TableRef,
    pub on: Option<Condition>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One ORDER BY entry. Expressions ignore the direction.
#[derive(Clone, Debug)]
pub struct OrderBy {
    pub column: Column,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(column: impl Into<Column>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<Column>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parse `"name, id DESC"` into entries.
    ///
    /// Items containing `(` are kept as raw expressions.
    pub fn parse_list(input: &str) -> Vec<OrderBy> {
        split_list(input)
            .into_iter()
            .map(|item| {
                if item.contains('(') {
                    return OrderBy::asc(Expression::raw(item));
                }
                let item = item.as_str();
                match item.rsplit_once(char::is_whitespace) {
                    Some((col, dir)) if dir.eq_ignore_ascii_case("desc") => {
                        OrderBy::desc(col.trim_end())
                    }
                    Some((col, dir)) if dir.eq_ignore_ascii_case("asc") => {
                        OrderBy::asc(col.trim_end())
                    }
                    _ => OrderBy::asc(item),
                }
            })
            .collect()
    }
}

/// LIMIT or OFFSET value.
#[derive(Clone, Debug)]
pub enum Limit {
    /// Negative counts disable the clause.
    Count(i64),
    Expr(Expression),
}

/// A UNION member.
#[derive(Clone, Debug)]
pub struct Union {
    pub source: UnionSource,
    pub all: bool,
}

#[derive(Clone, Debug)]
pub enum UnionSource {
    Query(Box<Query>),
    Raw(String),
}

/// A common table expression.
#[derive(Clone, Debug)]
pub struct WithQuery {
    pub query: Box<Query>,
    pub alias: String,
    pub recursive: bool,
}

/// SELECT query AST.
#[derive(Clone, Debug, Default)]
pub struct Query {
    pub(crate) select: Vec<SelectColumn>,
    pub(crate) select_option: Option<String>,
    pub(crate) distinct: bool,
    pub(crate) from: Vec<TableRef>,
    pub(crate) join: Vec<Join>,
    pub(crate) where_: Option<Condition>,
    pub(crate) group_by: Vec<Column>,
    pub(crate) having: Option<Condition>,
    pub(crate) order_by: Vec<OrderBy>,
    pub(crate) limit: Option<Limit>,
    pub(crate) offset: Option<Limit>,
    pub(crate) union: Vec<Union>,
    pub(crate) with: Vec<WithQuery>,
    pub(crate) params: Params,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== SELECT ====================

    /// Set the select list from a comma-separated string.
    ///
    /// Each item may carry an alias: `"COUNT(*) AS cnt, u.name n"`.
    pub fn select(mut self, cols: &str) -> Self {
        self.select = split_list(cols).into_iter().map(SelectColumn::from).collect();
        self
    }

    /// Set the select list.
    pub fn select_cols<I, C>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<SelectColumn>,
    {
        self.select = cols.into_iter().map(Into::into).collect();
        self
    }

    /// Append to the select list.
    pub fn add_select(mut self, cols: &str) -> Self {
        self.select
            .extend(split_list(cols).into_iter().map(SelectColumn::from));
        self
    }

    /// Append columns to the select list.
    pub fn add_select_cols<I, C>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<SelectColumn>,
    {
        self.select.extend(cols.into_iter().map(Into::into));
        self
    }

    /// Append an aliased expression or sub-query to the select list.
    pub fn select_as(mut self, column: impl Into<Column>, alias: impl Into<String>) -> Self {
        self.select.push(SelectColumn::aliased(column, alias));
        self
    }

    /// Extra keyword placed after `SELECT`, e.g. `SQL_CALC_FOUND_ROWS`.
    pub fn select_option(mut self, option: impl Into<String>) -> Self {
        self.select_option = Some(option.into());
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    // ==================== FROM / JOIN ====================

    /// Set FROM targets from a comma-separated string (`"user u, profile"`).
    pub fn from(mut self, tables: &str) -> Self {
        self.from = split_list(tables).into_iter().map(TableRef::from).collect();
        self
    }

    /// Set FROM targets.
    pub fn from_tables<I, T>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TableRef>,
    {
        self.from = tables.into_iter().map(Into::into).collect();
        self
    }

    /// Append an aliased sub-query to FROM.
    pub fn from_query(mut self, query: Query, alias: impl Into<String>) -> Self {
        self.from.push(TableRef::aliased(query, alias));
        self
    }

    /// Append a join. `on` may be `None` for `CROSS JOIN`-like entries.
    pub fn join(
        mut self,
        join_type: impl Into<String>,
        table: impl Into<TableRef>,
        on: Option<Condition>,
    ) -> Self {
        self.join.push(Join {
            join_type: join_type.into(),
            table: table.into(),
            on,
        });
        self
    }

    pub fn inner_join(self, table: impl Into<TableRef>, on: impl Into<Condition>) -> Self {
        self.join("INNER JOIN", table, Some(on.into()))
    }

    pub fn left_join(self, table: impl Into<TableRef>, on: impl Into<Condition>) -> Self {
        self.join("LEFT JOIN", table, Some(on.into()))
    }

    pub fn right_join(self, table: impl Into<TableRef>, on: impl Into<Condition>) -> Self {
        self.join("RIGHT JOIN", table, Some(on.into()))
    }

    // ==================== WHERE ====================

    /// Replace the WHERE condition.
    pub fn where_(mut self, condition: impl Into<Condition>) -> Self {
        self.where_ = Some(condition.into());
        self
    }

    /// AND a condition onto WHERE.
    pub fn and_where(mut self, condition: impl Into<Condition>) -> Self {
        self.where_ = Some(merge(self.where_.take(), condition.into(), Conjunction::And));
        self
    }

    /// OR a condition onto WHERE.
    pub fn or_where(mut self, condition: impl Into<Condition>) -> Self {
        self.where_ = Some(merge(self.where_.take(), condition.into(), Conjunction::Or));
        self
    }

    /// Replace WHERE, ignoring operands with empty values.
    ///
    /// If every operand is empty the WHERE clause is cleared.
    pub fn filter_where(mut self, condition: Condition) -> Self {
        self.where_ = condition.filtered();
        self
    }

    /// AND a filtered condition onto WHERE. Nothing happens if it filters to nothing.
    pub fn and_filter_where(self, condition: Condition) -> Self {
        match condition.filtered() {
            Some(c) => self.and_where(c),
            None => self,
        }
    }

    /// OR a filtered condition onto WHERE. Nothing happens if it filters to nothing.
    pub fn or_filter_where(self, condition: Condition) -> Self {
        match condition.filtered() {
            Some(c) => self.or_where(c),
            None => self,
        }
    }

    // ==================== GROUP BY / HAVING ====================

    /// Set GROUP BY from a comma-separated string.
    pub fn group_by(mut self, cols: &str) -> Self {
        self.group_by = split_list(cols).into_iter().map(group_column).collect();
        self
    }

    /// Append to GROUP BY.
    pub fn add_group_by(mut self, cols: &str) -> Self {
        self.group_by
            .extend(split_list(cols).into_iter().map(group_column));
        self
    }

    /// Append an expression to GROUP BY.
    pub fn group_by_expr(mut self, expr: Expression) -> Self {
        self.group_by.push(Column::Expr(expr));
        self
    }

    pub fn having(mut self, condition: impl Into<Condition>) -> Self {
        self.having = Some(condition.into());
        self
    }

    pub fn and_having(mut self, condition: impl Into<Condition>) -> Self {
        self.having = Some(merge(self.having.take(), condition.into(), Conjunction::And));
        self
    }

    pub fn or_having(mut self, condition: impl Into<Condition>) -> Self {
        self.having = Some(merge(self.having.take(), condition.into(), Conjunction::Or));
        self
    }

    // ==================== ORDER BY / LIMIT ====================

    /// Set ORDER BY from a string like `"name, id DESC"`.
    pub fn order_by(mut self, order: &str) -> Self {
        self.order_by = OrderBy::parse_list(order);
        self
    }

    /// Append to ORDER BY.
    pub fn add_order_by(mut self, order: &str) -> Self {
        self.order_by.extend(OrderBy::parse_list(order));
        self
    }

    pub fn order_by_asc(mut self, column: impl Into<Column>) -> Self {
        self.order_by.push(OrderBy::asc(column));
        self
    }

    pub fn order_by_desc(mut self, column: impl Into<Column>) -> Self {
        self.order_by.push(OrderBy::desc(column));
        self
    }

    /// Append a raw ordering expression such as `FIELD(id, 3, 1, 2)`.
    pub fn order_by_expr(mut self, expr: Expression) -> Self {
        self.order_by.push(OrderBy::asc(expr));
        self
    }

    /// Set LIMIT. Negative values disable it.
    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(Limit::Count(n));
        self
    }

    pub fn limit_expr(mut self, expr: Expression) -> Self {
        self.limit = Some(Limit::Expr(expr));
        self
    }

    /// Set OFFSET. Negative values disable it.
    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(Limit::Count(n));
        self
    }

    pub fn offset_expr(mut self, expr: Expression) -> Self {
        self.offset = Some(Limit::Expr(expr));
        self
    }

    // ==================== UNION / WITH ====================

    pub fn union(mut self, query: Query) -> Self {
        self.union.push(Union {
            source: UnionSource::Query(Box::new(query)),
            all: false,
        });
        self
    }

    pub fn union_all(mut self, query: Query) -> Self {
        self.union.push(Union {
            source: UnionSource::Query(Box::new(query)),
            all: true,
        });
        self
    }

    /// Append a raw SQL union member.
    pub fn union_raw(mut self, sql: impl Into<String>, all: bool) -> Self {
        self.union.push(Union {
            source: UnionSource::Raw(sql.into()),
            all,
        });
        self
    }

    /// Prepend a common table expression.
    pub fn with_query(mut self, query: Query, alias: impl Into<String>, recursive: bool) -> Self {
        self.with.push(WithQuery {
            query: Box::new(query),
            alias: alias.into(),
            recursive,
        });
        self
    }

    // ==================== PARAMS ====================

    /// Replace the bound parameters.
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Merge additional bound parameters.
    pub fn add_params(mut self, params: Params) -> Self {
        self.params.merge(&params);
        self
    }

    /// Bind a single named parameter.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<crate::value::Value>) -> Self {
        self.params.insert(name, value);
        self
    }

    // ==================== ACCESSORS ====================

    pub fn where_condition(&self) -> Option<&Condition> {
        self.where_.as_ref()
    }

    pub fn select_columns(&self) -> &[SelectColumn] {
        &self.select
    }

    pub fn bound_params(&self) -> &Params {
        &self.params
    }
}

fn merge(existing: Option<Condition>, new: Condition, op: Conjunction) -> Condition {
    match existing {
        None => new,
        Some(Condition::Conjunction {
            operator,
            mut operands,
        }) if operator == op && op == Conjunction::And => {
            operands.push(new);
            Condition::Conjunction { operator, operands }
        }
        Some(old) => Condition::Conjunction {
            operator: op,
            operands: vec![old, new],
        },
    }
}

fn group_column(item: String) -> Column {
    if item.contains('(') {
        Column::Expr(Expression::Raw(item))
    } else {
        Column::Name(item)
    }
}

/// Split on commas that are not inside parentheses or quotes.
pub(crate) fn split_list(input: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        match (ch, quote) {
            (c, Some(q)) if c == q => {
                quote = None;
                current.push(c);
            }
            (c, Some(_)) => current.push(c),
            ('\'' | '"' | '`', None) => {
                quote = Some(ch);
                current.push(ch);
            }
            ('(', None) => {
                depth += 1;
                current.push(ch);
            }
            (')', None) => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            (',', None) if depth == 0 => items.push(std::mem::take(&mut current)),
            (c, None) => current.push(c),
        }
    }
    items.push(current);
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
