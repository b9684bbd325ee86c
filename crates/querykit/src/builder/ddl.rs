//! Schema manipulation statements.
//!
//! Every method returns the statement text; dialects that cannot express an
//! operation return [`QueryError::UnsupportedOperation`].

use std::sync::OnceLock;

use regex::Regex;

use crate::dialect::DialectKind;
use crate::error::{QueryError, QueryResult};
use crate::expr::Operand;
use crate::params::Params;
use crate::query::Query;

use super::QueryBuilder;
use super::column::ColumnDef;

/// `type(args) rest`
fn parameterized_type_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+)\((.+?)\)(.*)$").expect("invalid built-in type regex"))
}

/// `type rest`
fn modified_type_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+)\s+").expect("invalid built-in type regex"))
}

fn type_args_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(.+\)").expect("invalid built-in type regex"))
}

/// A foreign key constraint for [`QueryBuilder::add_foreign_key`].
#[derive(Clone, Debug)]
pub struct ForeignKey {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

impl ForeignKey {
    pub fn new<C, R>(
        name: impl Into<String>,
        table: impl Into<String>,
        columns: C,
        ref_table: impl Into<String>,
        ref_columns: R,
    ) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            name: name.into(),
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            ref_table: ref_table.into(),
            ref_columns: ref_columns.into_iter().map(Into::into).collect(),
            on_delete: None,
            on_update: None,
        }
    }

    /// Referential action such as `CASCADE` or `SET NULL`.
    pub fn on_delete(mut self, action: impl Into<String>) -> Self {
        self.on_delete = Some(action.into());
        self
    }

    pub fn on_update(mut self, action: impl Into<String>) -> Self {
        self.on_update = Some(action.into());
        self
    }
}

impl QueryBuilder {
    /// Resolve an abstract column type through the dialect type map.
    ///
    /// `string` maps directly, `string(32)` replaces the mapped arguments and
    /// `string NOT NULL` keeps the trailing modifiers. Unknown types pass through.
    pub fn get_column_type(&self, column: impl Into<ColumnDef>) -> String {
        let type_ = match column.into() {
            ColumnDef::Type(t) => t,
            ColumnDef::Builder(b) => b.render(&self.dialect),
        };
        let map = &self.dialect.type_map;
        if let Some(mapped) = map.get(&type_) {
            return mapped.clone();
        }
        if let Some(caps) = parameterized_type_regex().captures(&type_)
            && let Some(mapped) = map.get(&caps[1])
        {
            let args = format!("({})", &caps[2]);
            let resolved = type_args_regex().replace(mapped, regex::NoExpand(&args));
            return format!("{resolved}{}", &caps[3]);
        }
        if let Some(caps) = modified_type_regex().captures(&type_)
            && let Some(mapped) = map.get(&caps[1])
        {
            return format!("{mapped}{}", &type_[caps[1].len()..]);
        }
        type_
    }

    fn ddl(&self, statement: &str, sql: String) -> QueryResult<String> {
        self.log_statement(statement, &sql, &Params::new());
        Ok(sql)
    }

    fn unsupported(&self, operation: &str) -> QueryError {
        QueryError::unsupported(operation, self.dialect.name())
    }

    fn quote_columns<C: AsRef<str>>(&self, columns: &[C]) -> String {
        columns
            .iter()
            .map(|c| self.quote_column(c.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `CREATE TABLE`. An empty column name inserts the definition as a raw line,
    /// e.g. a table-level constraint.
    pub fn create_table<I, K, D>(
        &self,
        table: &str,
        columns: I,
        options: Option<&str>,
    ) -> QueryResult<String>
    where
        I: IntoIterator<Item = (K, D)>,
        K: AsRef<str>,
        D: Into<ColumnDef>,
    {
        let mut lines = Vec::new();
        for (name, def) in columns {
            let name = name.as_ref();
            let line = if name.is_empty() {
                match def.into() {
                    ColumnDef::Type(raw) => raw,
                    builder => self.get_column_type(builder),
                }
            } else {
                format!("{} {}", self.quote_column(name), self.get_column_type(def))
            };
            lines.push(format!("\t{line}"));
        }
        let mut sql = format!(
            "CREATE TABLE {} (\n{}\n)",
            self.quote_table(table),
            lines.join(",\n")
        );
        if let Some(options) = options {
            sql.push(' ');
            sql.push_str(options);
        }
        self.ddl("create_table", sql)
    }

    pub fn rename_table(&self, old_name: &str, new_name: &str) -> QueryResult<String> {
        let old = self.quote_table(old_name);
        let new = self.quote_table(new_name);
        let sql = match self.dialect.kind {
            DialectKind::MySql => format!("RENAME TABLE {old} TO {new}"),
            DialectKind::Mssql => format!("sp_rename {old}, {new}"),
            _ => format!("ALTER TABLE {old} RENAME TO {new}"),
        };
        self.ddl("rename_table", sql)
    }

    pub fn drop_table(&self, table: &str) -> QueryResult<String> {
        self.ddl("drop_table", format!("DROP TABLE {}", self.quote_table(table)))
    }

    /// SQLite has no TRUNCATE; an unconditional DELETE is used instead.
    pub fn truncate_table(&self, table: &str) -> QueryResult<String> {
        let table = self.quote_table(table);
        let sql = match self.dialect.kind {
            DialectKind::Sqlite => format!("DELETE FROM {table}"),
            _ => format!("TRUNCATE TABLE {table}"),
        };
        self.ddl("truncate_table", sql)
    }

    pub fn add_column(
        &self,
        table: &str,
        column: &str,
        def: impl Into<ColumnDef>,
    ) -> QueryResult<String> {
        let keyword = match self.dialect.kind {
            DialectKind::Postgres | DialectKind::Sqlite => "ADD COLUMN",
            _ => "ADD",
        };
        let sql = format!(
            "ALTER TABLE {} {keyword} {} {}",
            self.quote_table(table),
            self.quote_column(column),
            self.get_column_type(def)
        );
        self.ddl("add_column", sql)
    }

    pub fn drop_column(&self, table: &str, column: &str) -> QueryResult<String> {
        let sql = format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_table(table),
            self.quote_column(column)
        );
        self.ddl("drop_column", sql)
    }

    pub fn rename_column(&self, table: &str, old_name: &str, new_name: &str) -> QueryResult<String> {
        let sql = match self.dialect.kind {
            DialectKind::Mssql => format!(
                "sp_rename '{}.{}', {}, 'COLUMN'",
                self.quote_table(table),
                self.quote_column(old_name),
                self.quote_column(new_name)
            ),
            _ => format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                self.quote_table(table),
                self.quote_column(old_name),
                self.quote_column(new_name)
            ),
        };
        self.ddl("rename_column", sql)
    }

    /// Change a column's type. On PostgreSQL a definition starting with `SET `
    /// or `DROP ` (e.g. `SET NOT NULL`) is applied as-is.
    pub fn alter_column(
        &self,
        table: &str,
        column: &str,
        def: impl Into<ColumnDef>,
    ) -> QueryResult<String> {
        let table = self.quote_table(table);
        let column = self.quote_column(column);
        let sql = match self.dialect.kind {
            DialectKind::Sqlite => return Err(self.unsupported("alter_column")),
            DialectKind::MySql => {
                format!("ALTER TABLE {table} CHANGE {column} {column} {}", self.get_column_type(def))
            }
            DialectKind::Postgres => match def.into() {
                ColumnDef::Type(t) if t.starts_with("SET ") || t.starts_with("DROP ") => {
                    format!("ALTER TABLE {table} ALTER COLUMN {column} {t}")
                }
                def => format!(
                    "ALTER TABLE {table} ALTER COLUMN {column} TYPE {}",
                    self.get_column_type(def)
                ),
            },
            DialectKind::Mssql => {
                format!("ALTER TABLE {table} ALTER COLUMN {column} {}", self.get_column_type(def))
            }
        };
        self.ddl("alter_column", sql)
    }

    pub fn add_primary_key<C: AsRef<str>>(
        &self,
        name: &str,
        table: &str,
        columns: &[C],
    ) -> QueryResult<String> {
        if self.dialect.kind == DialectKind::Sqlite {
            return Err(self.unsupported("add_primary_key"));
        }
        let sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            self.quote_table(table),
            self.quote_column(name),
            self.quote_columns(columns)
        );
        self.ddl("add_primary_key", sql)
    }

    pub fn drop_primary_key(&self, name: &str, table: &str) -> QueryResult<String> {
        let table = self.quote_table(table);
        let sql = match self.dialect.kind {
            DialectKind::Sqlite => return Err(self.unsupported("drop_primary_key")),
            DialectKind::MySql => format!("ALTER TABLE {table} DROP PRIMARY KEY"),
            _ => format!("ALTER TABLE {table} DROP CONSTRAINT {}", self.quote_column(name)),
        };
        self.ddl("drop_primary_key", sql)
    }

    pub fn add_foreign_key(&self, fk: &ForeignKey) -> QueryResult<String> {
        if self.dialect.kind == DialectKind::Sqlite {
            return Err(self.unsupported("add_foreign_key"));
        }
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_table(&fk.table),
            self.quote_column(&fk.name),
            self.quote_columns(&fk.columns),
            self.quote_table(&fk.ref_table),
            self.quote_columns(&fk.ref_columns)
        );
        if let Some(action) = &fk.on_delete {
            sql.push_str(&format!(" ON DELETE {action}"));
        }
        if let Some(action) = &fk.on_update {
            sql.push_str(&format!(" ON UPDATE {action}"));
        }
        self.ddl("add_foreign_key", sql)
    }

    pub fn drop_foreign_key(&self, name: &str, table: &str) -> QueryResult<String> {
        let table = self.quote_table(table);
        let name = self.quote_column(name);
        let sql = match self.dialect.kind {
            DialectKind::Sqlite => return Err(self.unsupported("drop_foreign_key")),
            DialectKind::MySql => format!("ALTER TABLE {table} DROP FOREIGN KEY {name}"),
            _ => format!("ALTER TABLE {table} DROP CONSTRAINT {name}"),
        };
        self.ddl("drop_foreign_key", sql)
    }

    /// `CREATE [UNIQUE] INDEX`. Columns containing `(` are treated as expressions.
    pub fn create_index<C: AsRef<str>>(
        &self,
        name: &str,
        table: &str,
        columns: &[C],
        unique: bool,
    ) -> QueryResult<String> {
        let sql = format!(
            "CREATE {}INDEX {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            self.quote_table(name),
            self.quote_table(table),
            self.quote_columns(columns)
        );
        self.ddl("create_index", sql)
    }

    pub fn drop_index(&self, name: &str, table: &str) -> QueryResult<String> {
        let name = self.quote_table(name);
        let sql = match self.dialect.kind {
            DialectKind::MySql | DialectKind::Mssql => {
                format!("DROP INDEX {name} ON {}", self.quote_table(table))
            }
            _ => format!("DROP INDEX {name}"),
        };
        self.ddl("drop_index", sql)
    }

    pub fn add_unique<C: AsRef<str>>(
        &self,
        name: &str,
        table: &str,
        columns: &[C],
    ) -> QueryResult<String> {
        if self.dialect.kind == DialectKind::Sqlite {
            return Err(self.unsupported("add_unique"));
        }
        let sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
            self.quote_table(table),
            self.quote_column(name),
            self.quote_columns(columns)
        );
        self.ddl("add_unique", sql)
    }

    pub fn drop_unique(&self, name: &str, table: &str) -> QueryResult<String> {
        let table = self.quote_table(table);
        let name = self.quote_column(name);
        let sql = match self.dialect.kind {
            DialectKind::Sqlite => return Err(self.unsupported("drop_unique")),
            DialectKind::MySql => format!("DROP INDEX {name} ON {table}"),
            _ => format!("ALTER TABLE {table} DROP CONSTRAINT {name}"),
        };
        self.ddl("drop_unique", sql)
    }

    pub fn add_check(&self, name: &str, table: &str, expression: &str) -> QueryResult<String> {
        if matches!(self.dialect.kind, DialectKind::MySql | DialectKind::Sqlite) {
            return Err(self.unsupported("add_check"));
        }
        let sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({})",
            self.quote_table(table),
            self.quote_column(name),
            self.quoter().quote_sql(expression)
        );
        self.ddl("add_check", sql)
    }

    pub fn drop_check(&self, name: &str, table: &str) -> QueryResult<String> {
        if matches!(self.dialect.kind, DialectKind::MySql | DialectKind::Sqlite) {
            return Err(self.unsupported("drop_check"));
        }
        let sql = format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_table(table),
            self.quote_column(name)
        );
        self.ddl("drop_check", sql)
    }

    /// Named DEFAULT constraint. Only SQL Server models defaults as constraints.
    pub fn add_default_value(
        &self,
        name: &str,
        table: &str,
        column: &str,
        value: impl Into<Operand>,
    ) -> QueryResult<String> {
        if self.dialect.kind != DialectKind::Mssql {
            return Err(self.unsupported("add_default_value"));
        }
        let value = match value.into() {
            Operand::Value(v) => self.quoter().quote_value(&v),
            Operand::Expr(e) => self.build_expression(&e, &mut Params::new())?,
            Operand::List(_) => {
                return Err(QueryError::invalid_argument(
                    "a default value must be a scalar or an expression",
                ));
            }
        };
        let sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} DEFAULT {value} FOR {}",
            self.quote_table(table),
            self.quote_column(name),
            self.quote_column(column)
        );
        self.ddl("add_default_value", sql)
    }

    pub fn drop_default_value(&self, name: &str, table: &str) -> QueryResult<String> {
        if self.dialect.kind != DialectKind::Mssql {
            return Err(self.unsupported("drop_default_value"));
        }
        let sql = format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_table(table),
            self.quote_column(name)
        );
        self.ddl("drop_default_value", sql)
    }

    /// SQL Server stores comments as `MS_Description` extended properties.
    fn mssql_description(&self, table: &str, column: Option<&str>, comment: &str) -> String {
        let raw = self.raw_table_name(table);
        let (schema, table) = raw.rsplit_once('.').unwrap_or(("dbo", raw.as_str()));
        let quoter = self.quoter();
        let mut sql = format!(
            "sp_addextendedproperty @name = N'MS_Description', @value = N{}, \
             @level0type = N'SCHEMA', @level0name = N{}, \
             @level1type = N'TABLE', @level1name = N{}",
            quoter.quote_string(comment),
            quoter.quote_string(schema),
            quoter.quote_string(table)
        );
        if let Some(column) = column {
            sql.push_str(&format!(
                ", @level2type = N'COLUMN', @level2name = N{}",
                quoter.quote_string(column)
            ));
        }
        sql
    }

    pub fn add_comment_on_table(&self, table: &str, comment: &str) -> QueryResult<String> {
        let quoted = self.quoter().quote_string(comment);
        let sql = match self.dialect.kind {
            DialectKind::Postgres => {
                format!("COMMENT ON TABLE {} IS {quoted}", self.quote_table(table))
            }
            DialectKind::MySql => format!("ALTER TABLE {} COMMENT {quoted}", self.quote_table(table)),
            DialectKind::Mssql => self.mssql_description(table, None, comment),
            DialectKind::Sqlite => return Err(self.unsupported("add_comment_on_table")),
        };
        self.ddl("add_comment_on_table", sql)
    }

    pub fn add_comment_on_column(
        &self,
        table: &str,
        column: &str,
        comment: &str,
    ) -> QueryResult<String> {
        let sql = match self.dialect.kind {
            DialectKind::Postgres => format!(
                "COMMENT ON COLUMN {}.{} IS {}",
                self.quote_table(table),
                self.quote_column(column),
                self.quoter().quote_string(comment)
            ),
            DialectKind::Mssql => self.mssql_description(table, Some(column), comment),
            DialectKind::MySql | DialectKind::Sqlite => {
                return Err(self.unsupported("add_comment_on_column"));
            }
        };
        self.ddl("add_comment_on_column", sql)
    }

    /// `CREATE VIEW name AS <query>` with bound values inlined as literals.
    pub fn create_view(&self, name: &str, query: &Query) -> QueryResult<String> {
        let mut params = Params::new();
        let sql = self.build_query(query, &mut params)?;
        let sql = self.inline_params(&sql, &params);
        self.ddl(
            "create_view",
            format!("CREATE VIEW {} AS {sql}", self.quote_table(name)),
        )
    }

    pub fn drop_view(&self, name: &str) -> QueryResult<String> {
        self.ddl("drop_view", format!("DROP VIEW {}", self.quote_table(name)))
    }

    /// Replace every placeholder with its quoted value, longest name first.
    fn inline_params(&self, sql: &str, params: &Params) -> String {
        let mut names: Vec<(&str, String)> = params
            .iter()
            .map(|(name, value)| (name, self.quoter().quote_value(value)))
            .collect();
        names.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut out = String::with_capacity(sql.len());
        let mut rest = sql;
        'scan: while let Some(c) = rest.chars().next() {
            for (name, literal) in &names {
                if let Some(tail) = rest.strip_prefix(name) {
                    out.push_str(literal);
                    rest = tail;
                    continue 'scan;
                }
            }
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
        out
    }

    /// Statement that moves the table's auto-increment counter.
    ///
    /// With `None`, the next value follows the current maximum primary key.
    /// PostgreSQL needs table metadata with a sequence name; MySQL needs a value.
    pub fn reset_sequence(&self, table: &str, value: Option<i64>) -> QueryResult<String> {
        let quoted = self.quote_table(table);
        let pk = || -> QueryResult<String> {
            let schema = self
                .table_schema(table)
                .ok_or_else(|| QueryError::invalid_argument(format!("unknown table: {table}")))?;
            schema
                .primary_key
                .first()
                .map(|c| self.quote_column(c))
                .ok_or_else(|| QueryError::invalid_argument(format!("table {table} has no primary key")))
        };

        let sql = match self.dialect.kind {
            DialectKind::Postgres => {
                let sequence = self
                    .table_schema(table)
                    .and_then(|s| s.sequence_name.clone())
                    .ok_or_else(|| {
                        QueryError::invalid_argument(format!(
                            "there is no sequence associated with table {table}"
                        ))
                    })?;
                let value = match value {
                    Some(v) => v.to_string(),
                    None => format!("(SELECT COALESCE(MAX({}),0) FROM {quoted})+1", pk()?),
                };
                format!(
                    "SELECT SETVAL('{}',{value},false)",
                    self.quoter().quote_table_name(&sequence)
                )
            }
            DialectKind::MySql => {
                let value = value.ok_or_else(|| {
                    QueryError::invalid_argument("MySQL reset_sequence requires an explicit value")
                })?;
                format!("ALTER TABLE {quoted} AUTO_INCREMENT={value}")
            }
            DialectKind::Sqlite => {
                let value = match value {
                    Some(v) => format!("'{}'", v.saturating_sub(1)),
                    None => format!("(SELECT MAX({}) FROM {quoted})", pk()?),
                };
                format!(
                    "UPDATE sqlite_sequence SET seq={value} WHERE name={}",
                    self.quoter().quote_string(&self.raw_table_name(table))
                )
            }
            DialectKind::Mssql => match value {
                Some(v) => format!("DBCC CHECKIDENT ('{quoted}', RESEED, {v})"),
                None => format!("DBCC CHECKIDENT ('{quoted}', RESEED)"),
            },
        };
        self.ddl("reset_sequence", sql)
    }

    /// Enable or disable foreign key enforcement.
    ///
    /// MySQL and SQLite toggle it per connection. PostgreSQL and SQL Server
    /// toggle it per table: `table`, or every table the schema provider knows.
    pub fn check_integrity(
        &self,
        check: bool,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> QueryResult<String> {
        let sql = match self.dialect.kind {
            DialectKind::MySql => format!("SET FOREIGN_KEY_CHECKS = {}", u8::from(check)),
            DialectKind::Sqlite => format!("PRAGMA foreign_keys={}", u8::from(check)),
            DialectKind::Postgres | DialectKind::Mssql => {
                let postgres = self.dialect.kind == DialectKind::Postgres;
                let schema = schema.unwrap_or(if postgres { "public" } else { "dbo" });
                let tables = match table {
                    Some(t) => vec![t.to_string()],
                    None => self
                        .schema
                        .as_ref()
                        .map(|s| s.table_names())
                        .unwrap_or_default(),
                };
                if tables.is_empty() {
                    return Err(QueryError::invalid_argument(
                        "check_integrity needs a table or a schema provider listing tables",
                    ));
                }
                let statements: Vec<String> = tables
                    .iter()
                    .map(|t| {
                        let name = self.quoter().quote_table_name(&format!("{schema}.{t}"));
                        match (postgres, check) {
                            (true, true) => format!("ALTER TABLE {name} ENABLE TRIGGER ALL"),
                            (true, false) => format!("ALTER TABLE {name} DISABLE TRIGGER ALL"),
                            (false, true) => format!("ALTER TABLE {name} CHECK CONSTRAINT ALL"),
                            (false, false) => format!("ALTER TABLE {name} NOCHECK CONSTRAINT ALL"),
                        }
                    })
                    .collect();
                statements.join("; ")
            }
        };
        self.ddl("check_integrity", sql)
    }
}
