//! INSERT, batch INSERT, UPDATE, DELETE and upsert statements.

use crate::condition::Condition;
use crate::dialect::DialectKind;
use crate::error::{QueryError, QueryResult};
use crate::expr::{Column, Expression, Operand};
use crate::params::Params;
use crate::query::{Query, SelectColumn};
use crate::schema::TableSchema;

use super::QueryBuilder;
use super::clause::select_alias_regex;

/// Rows inserted by [`QueryBuilder::insert`] and [`QueryBuilder::upsert`].
#[derive(Clone, Debug)]
pub enum InsertSource {
    /// Column/value pairs of a single row.
    Values(Vec<(String, Operand)>),
    /// `INSERT ... SELECT`; the select list must name its columns.
    Query(Query),
}

impl InsertSource {
    pub fn values<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Operand>,
    {
        InsertSource::Values(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<Query> for InsertSource {
    fn from(q: Query) -> Self {
        InsertSource::Query(q)
    }
}

/// What an upsert does on conflict.
#[derive(Clone, Debug)]
pub enum UpsertUpdate {
    /// Overwrite every inserted column that is not part of the conflict target.
    All,
    /// Leave the existing row untouched.
    Nothing,
    /// Apply these assignments.
    Columns(Vec<(String, Operand)>),
}

/// Quoted column names and rendered values of an insert.
struct InsertParts {
    names: Vec<String>,
    /// `VALUES (...)` placeholders; empty for `INSERT ... SELECT` and default rows.
    placeholders: Vec<String>,
    /// Trailing SQL used when there are no placeholders.
    values: String,
}

impl QueryBuilder {
    /// `INSERT INTO table (cols) VALUES (...)` or `INSERT INTO table (cols) SELECT ...`.
    pub fn insert(
        &self,
        table: &str,
        source: &InsertSource,
        params: &mut Params,
    ) -> QueryResult<String> {
        let sql = self.insert_sql(table, source, params)?;
        self.log_statement("insert", &sql, params);
        Ok(sql)
    }

    fn insert_sql(
        &self,
        table: &str,
        source: &InsertSource,
        params: &mut Params,
    ) -> QueryResult<String> {
        let schema = self.table_schema(table);
        let parts = self.prepare_insert_values(table, source, schema.as_deref(), params)?;
        let mut sql = format!("INSERT INTO {}", self.quote_table(table));
        if !parts.names.is_empty() {
            sql.push_str(&format!(" ({})", parts.names.join(", ")));
        }
        if parts.placeholders.is_empty() {
            sql.push_str(&parts.values);
        } else {
            sql.push_str(&format!(" VALUES ({})", parts.placeholders.join(", ")));
        }
        Ok(sql)
    }

    fn prepare_insert_values(
        &self,
        table: &str,
        source: &InsertSource,
        schema: Option<&TableSchema>,
        params: &mut Params,
    ) -> QueryResult<InsertParts> {
        match source {
            InsertSource::Query(query) => {
                let names = self.insert_select_names(table, query)?;
                let sql = self.build_query(query, params)?;
                Ok(InsertParts {
                    names,
                    placeholders: Vec::new(),
                    values: format!(" {sql}"),
                })
            }
            InsertSource::Values(pairs) => {
                let mut names = Vec::with_capacity(pairs.len());
                let mut placeholders = Vec::with_capacity(pairs.len());
                for (name, value) in pairs {
                    names.push(self.quote_column(name));
                    placeholders.push(self.build_write_value(schema, name, value, params)?);
                }
                let values = if self.dialect.kind == DialectKind::MySql {
                    " () VALUES ()".to_string()
                } else {
                    " DEFAULT VALUES".to_string()
                };
                Ok(InsertParts {
                    names,
                    placeholders,
                    values,
                })
            }
        }
    }

    /// Column names of an `INSERT ... SELECT`, taken from the select list.
    fn insert_select_names(&self, table: &str, query: &Query) -> QueryResult<Vec<String>> {
        let ambiguous = || QueryError::AmbiguousInsertSource {
            table: table.to_string(),
        };
        if query.select.is_empty() {
            return Err(ambiguous());
        }
        let mut names = Vec::with_capacity(query.select.len());
        for SelectColumn { column, alias } in &query.select {
            let name = match (column, alias) {
                (_, Some(alias)) => alias.clone(),
                (Column::Name(name), None) if name == "*" || name.ends_with(".*") => {
                    return Err(ambiguous());
                }
                (Column::Name(name), None) => match select_alias_regex().captures(name) {
                    Some(caps) => caps[2].to_string(),
                    None => name.clone(),
                },
                (Column::Expr(_), None) => return Err(ambiguous()),
            };
            names.push(self.quoter().quote_column_name(&name));
        }
        Ok(names)
    }

    /// Cast with table metadata if available, then bind or build.
    fn build_write_value(
        &self,
        schema: Option<&TableSchema>,
        column: &str,
        value: &Operand,
        params: &mut Params,
    ) -> QueryResult<String> {
        match (value, schema) {
            (Operand::Value(v), Some(schema)) => {
                let cast = schema.cast_for_write(column, v.clone());
                Ok(self.bind_param(cast, params))
            }
            (Operand::Value(v), None) => Ok(self.bind_param(v.clone(), params)),
            (other, _) => self.build_operand(other, params),
        }
    }

    /// Multi-row insert with values inlined as literals. No rows yields `""`.
    pub fn batch_insert<C, R>(
        &self,
        table: &str,
        columns: &[C],
        rows: R,
        params: &mut Params,
    ) -> QueryResult<String>
    where
        C: AsRef<str>,
        R: IntoIterator,
        R::Item: IntoIterator,
        <R::Item as IntoIterator>::Item: Into<Operand>,
    {
        let schema = self.table_schema(table);
        let quoter = self.quoter();
        let mut values = Vec::new();
        for row in rows {
            let mut vs = Vec::new();
            for (i, value) in row.into_iter().enumerate() {
                let operand: Operand = value.into();
                let literal = match operand {
                    Operand::Value(v) => {
                        let v = match (&schema, columns.get(i)) {
                            (Some(schema), Some(col)) => schema.cast_for_write(col.as_ref(), v),
                            _ => v,
                        };
                        quoter.quote_value(&v)
                    }
                    Operand::Expr(expr) => self.build_expression(&expr, params)?,
                    Operand::List(_) => {
                        return Err(QueryError::invalid_argument(
                            "batch insert values must be scalars or expressions",
                        ));
                    }
                };
                vs.push(literal);
            }
            values.push(format!("({})", vs.join(", ")));
        }
        if values.is_empty() {
            return Ok(String::new());
        }
        let names: Vec<String> = columns.iter().map(|c| self.quote_column(c.as_ref())).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.quote_table(table),
            names.join(", "),
            values.join(", ")
        );
        self.log_statement("batch_insert", &sql, params);
        Ok(sql)
    }

    /// `UPDATE table SET col=val, ... [WHERE ...]`
    pub fn update(
        &self,
        table: &str,
        sets: &[(String, Operand)],
        condition: Option<&Condition>,
        params: &mut Params,
    ) -> QueryResult<String> {
        let sql = self.update_sql(table, sets, condition, params)?;
        self.log_statement("update", &sql, params);
        Ok(sql)
    }

    fn update_sql(
        &self,
        table: &str,
        sets: &[(String, Operand)],
        condition: Option<&Condition>,
        params: &mut Params,
    ) -> QueryResult<String> {
        let schema = self.table_schema(table);
        let lines = self.prepare_update_sets(schema.as_deref(), sets, params)?;
        let sql = format!("UPDATE {} SET {}", self.quote_table(table), lines.join(", "));
        let where_ = self.build_where(condition, params)?;
        Ok(if where_.is_empty() {
            sql
        } else {
            format!("{sql} {where_}")
        })
    }

    fn prepare_update_sets(
        &self,
        schema: Option<&TableSchema>,
        sets: &[(String, Operand)],
        params: &mut Params,
    ) -> QueryResult<Vec<String>> {
        if sets.is_empty() {
            return Err(QueryError::invalid_argument(
                "UPDATE requires at least one column to set",
            ));
        }
        let mut lines = Vec::with_capacity(sets.len());
        for (name, value) in sets {
            let value = self.build_write_value(schema, name, value, params)?;
            lines.push(format!("{}={value}", self.quote_column(name)));
        }
        Ok(lines)
    }

    /// `DELETE FROM table [WHERE ...]`
    pub fn delete(
        &self,
        table: &str,
        condition: Option<&Condition>,
        params: &mut Params,
    ) -> QueryResult<String> {
        let mut sql = format!("DELETE FROM {}", self.quote_table(table));
        let where_ = self.build_where(condition, params)?;
        if !where_.is_empty() {
            sql.push(' ');
            sql.push_str(&where_);
        }
        self.log_statement("delete", &sql, params);
        Ok(sql)
    }

    /// Insert a row, or update it when it collides with a primary key or unique constraint.
    ///
    /// Conflict targets come from table metadata. When no constraint is fully
    /// covered by the inserted columns, a plain INSERT is produced.
    pub fn upsert(
        &self,
        table: &str,
        source: &InsertSource,
        update: &UpsertUpdate,
        params: &mut Params,
    ) -> QueryResult<String> {
        if !self.dialect.supports_upsert {
            return Err(QueryError::unsupported("upsert", self.dialect.name()));
        }
        let insert_sql = self.insert_sql(table, source, params)?;
        let insert_names = match source {
            InsertSource::Values(pairs) => pairs.iter().map(|(n, _)| self.quote_column(n)).collect(),
            InsertSource::Query(query) => self.insert_select_names(table, query)?,
        };
        let unique_names = self.unique_column_names(table, &insert_names);
        if unique_names.is_empty() {
            self.log_statement("upsert", &insert_sql, params);
            return Ok(insert_sql);
        }

        let update_names: Vec<String> = insert_names
            .iter()
            .filter(|n| !unique_names.contains(n))
            .cloned()
            .collect();
        let nothing = UpsertUpdate::Nothing;
        let update = match update {
            UpsertUpdate::All if update_names.is_empty() => &nothing,
            other => other,
        };

        let sql = match self.dialect.kind {
            DialectKind::MySql => {
                let sets: Vec<(String, Operand)> = match update {
                    UpsertUpdate::All => update_names
                        .iter()
                        .map(|n| (n.clone(), Expression::raw(format!("VALUES({n})")).into()))
                        .collect(),
                    UpsertUpdate::Nothing => {
                        let first = unique_names[0].clone();
                        let target = format!("{}.{first}", self.quote_table(table));
                        vec![(first, Expression::raw(target).into())]
                    }
                    UpsertUpdate::Columns(sets) => sets.clone(),
                };
                let lines = self.prepare_update_sets(self.table_schema(table).as_deref(), &sets, params)?;
                format!("{insert_sql} ON DUPLICATE KEY UPDATE {}", lines.join(", "))
            }
            _ => {
                let on_conflict = format!("ON CONFLICT ({})", unique_names.join(", "));
                let sets: Vec<(String, Operand)> = match update {
                    UpsertUpdate::Nothing => {
                        let sql = format!("{insert_sql} {on_conflict} DO NOTHING");
                        self.log_statement("upsert", &sql, params);
                        return Ok(sql);
                    }
                    UpsertUpdate::All => update_names
                        .iter()
                        .map(|n| (n.clone(), Expression::raw(format!("EXCLUDED.{n}")).into()))
                        .collect(),
                    UpsertUpdate::Columns(sets) => sets.clone(),
                };
                let lines = self.prepare_update_sets(self.table_schema(table).as_deref(), &sets, params)?;
                format!("{insert_sql} {on_conflict} DO UPDATE SET {}", lines.join(", "))
            }
        };
        self.log_statement("upsert", &sql, params);
        Ok(sql)
    }

    /// Quoted columns of every key constraint fully covered by `insert_names`.
    fn unique_column_names(&self, table: &str, insert_names: &[String]) -> Vec<String> {
        let Some(schema) = self.table_schema(table) else {
            return Vec::new();
        };
        let mut names: Vec<String> = Vec::new();
        for constraint in schema.key_constraints() {
            let quoted: Vec<String> = constraint.iter().map(|c| self.quote_column(c)).collect();
            if quoted.iter().all(|c| insert_names.contains(c)) {
                for c in quoted {
                    if !names.contains(&c) {
                        names.push(c);
                    }
                }
            }
        }
        names
    }
}
