use std::sync::Arc;

use querykit::{
    ColumnKind, Condition, Dialect, Expression, InsertSource, Operand, Params, Query, QueryBuilder,
    QueryError, SchemaRegistry, TableSchema, UpsertUpdate, Value,
};

fn user_schema() -> Arc<SchemaRegistry> {
    Arc::new(
        SchemaRegistry::new().with_table(
            TableSchema::new("user")
                .column("id", ColumnKind::Integer)
                .column("name", ColumnKind::String)
                .column("email", ColumnKind::String)
                .column("active", ColumnKind::Boolean)
                .primary_key(["id"])
                .unique("uq_user_email", ["email"]),
        ),
    )
}

fn with_schema(dialect: Dialect) -> QueryBuilder {
    QueryBuilder::builder(dialect).schema(user_schema()).build()
}

#[test]
fn insert_values() {
    let qb = QueryBuilder::new(Dialect::postgres());
    let mut params = Params::new();
    let sql = qb
        .insert(
            "user",
            &InsertSource::values([("name", "alice"), ("email", "a@example.com")]),
            &mut params,
        )
        .unwrap();
    assert_eq!(
        sql,
        r#"INSERT INTO "user" ("name", "email") VALUES (:qp0, :qp1)"#
    );
    assert_eq!(params.get(":qp1"), Some(&Value::from("a@example.com")));
}

#[test]
fn insert_with_expression_value() {
    let qb = QueryBuilder::new(Dialect::mysql());
    let mut params = Params::new();
    let sql = qb
        .insert(
            "user",
            &InsertSource::values([
                ("name", Operand::from("bob")),
                ("created_at", Expression::raw("NOW()").into()),
            ]),
            &mut params,
        )
        .unwrap();
    assert_eq!(
        sql,
        "INSERT INTO `user` (`name`, `created_at`) VALUES (:qp0, NOW())"
    );
    assert_eq!(params.len(), 1);
}

#[test]
fn insert_default_row() {
    let empty = InsertSource::Values(Vec::new());
    let mut params = Params::new();
    assert_eq!(
        QueryBuilder::new(Dialect::postgres())
            .insert("user", &empty, &mut params)
            .unwrap(),
        r#"INSERT INTO "user" DEFAULT VALUES"#
    );
    assert_eq!(
        QueryBuilder::new(Dialect::mysql())
            .insert("user", &empty, &mut params)
            .unwrap(),
        "INSERT INTO `user` () VALUES ()"
    );
}

#[test]
fn insert_from_select() {
    let qb = QueryBuilder::new(Dialect::postgres());
    let source = Query::new()
        .select("id, name")
        .from("user")
        .where_(Condition::eq("active", false));
    let mut params = Params::new();
    let sql = qb
        .insert("archive", &InsertSource::from(source), &mut params)
        .unwrap();
    assert_eq!(
        sql,
        r#"INSERT INTO "archive" ("id", "name") SELECT "id", "name" FROM "user" WHERE "active" = :qp0"#
    );

    let aliased = Query::new().select("u.id AS user_id").from("user u");
    let sql = qb
        .insert("archive", &InsertSource::from(aliased), &mut Params::new())
        .unwrap();
    assert!(sql.starts_with(r#"INSERT INTO "archive" ("user_id") SELECT"#));
}

#[test]
fn insert_from_select_star_is_ambiguous() {
    let qb = QueryBuilder::new(Dialect::postgres());
    let err = qb
        .insert(
            "archive",
            &InsertSource::from(Query::new().from("user")),
            &mut Params::new(),
        )
        .unwrap_err();
    assert!(matches!(err, QueryError::AmbiguousInsertSource { ref table } if table == "archive"));

    let err = qb
        .insert(
            "archive",
            &InsertSource::from(Query::new().select("u.*").from("user u")),
            &mut Params::new(),
        )
        .unwrap_err();
    assert!(matches!(err, QueryError::AmbiguousInsertSource { .. }));
}

#[test]
fn insert_casts_through_schema() {
    let qb = with_schema(Dialect::postgres());
    let mut params = Params::new();
    qb.insert(
        "user",
        &InsertSource::values([("id", "42"), ("active", "yes"), ("name", "")]),
        &mut params,
    )
    .unwrap();
    assert_eq!(params.get(":qp0"), Some(&Value::Int(42)));
    assert_eq!(params.get(":qp1"), Some(&Value::Bool(true)));
    assert_eq!(params.get(":qp2"), Some(&Value::from("")));
}

#[test]
fn batch_insert_inlines_literals() {
    let rows = vec![
        vec![Operand::from("a"), Operand::from(true)],
        vec![Operand::from("b'c"), Operand::from(false)],
    ];
    let mut params = Params::new();
    let sql = QueryBuilder::new(Dialect::postgres())
        .batch_insert("user", &["name", "active"], rows.clone(), &mut params)
        .unwrap();
    assert_eq!(
        sql,
        r#"INSERT INTO "user" ("name", "active") VALUES ('a', TRUE), ('b''c', FALSE)"#
    );
    assert!(params.is_empty());

    let sql = QueryBuilder::new(Dialect::mysql())
        .batch_insert("user", &["name", "active"], rows, &mut params)
        .unwrap();
    assert_eq!(
        sql,
        "INSERT INTO `user` (`name`, `active`) VALUES ('a', 1), ('b''c', 0)"
    );
}

#[test]
fn batch_insert_casts_and_handles_empty_input() {
    let qb = with_schema(Dialect::sqlite());
    let sql = qb
        .batch_insert(
            "user",
            &["id", "name"],
            vec![vec![Operand::from("7"), Operand::from(Value::Null)]],
            &mut Params::new(),
        )
        .unwrap();
    assert_eq!(sql, "INSERT INTO `user` (`id`, `name`) VALUES (7, NULL)");

    let none: Vec<Vec<Operand>> = Vec::new();
    let sql = qb
        .batch_insert("user", &["id"], none, &mut Params::new())
        .unwrap();
    assert_eq!(sql, "");
}

#[test]
fn update_with_condition() {
    let qb = QueryBuilder::new(Dialect::postgres());
    let mut params = Params::new();
    let sql = qb
        .update(
            "user",
            &[("status".to_string(), Operand::from(2))],
            Some(&Condition::eq("id", 5)),
            &mut params,
        )
        .unwrap();
    assert_eq!(sql, r#"UPDATE "user" SET "status"=:qp0 WHERE "id" = :qp1"#);
    assert_eq!(params.len(), 2);
}

#[test]
fn update_with_expression_and_no_condition() {
    let qb = QueryBuilder::new(Dialect::mssql());
    let sql = qb
        .update(
            "counter",
            &[(
                "hits".to_string(),
                Expression::raw("[[hits]] + 1").into(),
            )],
            None,
            &mut Params::new(),
        )
        .unwrap();
    assert_eq!(sql, "UPDATE [counter] SET [hits]=[hits] + 1");
}

#[test]
fn update_requires_columns() {
    let qb = QueryBuilder::new(Dialect::postgres());
    let err = qb.update("user", &[], None, &mut Params::new()).unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn delete_statements() {
    let qb = QueryBuilder::new(Dialect::postgres());
    let mut params = Params::new();
    assert_eq!(
        qb.delete("user", Some(&Condition::eq("id", 1)), &mut params)
            .unwrap(),
        r#"DELETE FROM "user" WHERE "id" = :qp0"#
    );
    assert_eq!(
        qb.delete("user", None, &mut params).unwrap(),
        r#"DELETE FROM "user""#
    );
}

#[test]
fn upsert_on_postgres() {
    let qb = with_schema(Dialect::postgres());
    let row = InsertSource::values([("id", Operand::from(1)), ("name", Operand::from("a"))]);

    assert_eq!(
        qb.upsert("user", &row, &UpsertUpdate::All, &mut Params::new())
            .unwrap(),
        r#"INSERT INTO "user" ("id", "name") VALUES (:qp0, :qp1) ON CONFLICT ("id") DO UPDATE SET "name"=EXCLUDED."name""#
    );
    assert_eq!(
        qb.upsert("user", &row, &UpsertUpdate::Nothing, &mut Params::new())
            .unwrap(),
        r#"INSERT INTO "user" ("id", "name") VALUES (:qp0, :qp1) ON CONFLICT ("id") DO NOTHING"#
    );

    let custom = UpsertUpdate::Columns(vec![("name".to_string(), Operand::from("b"))]);
    assert_eq!(
        qb.upsert("user", &row, &custom, &mut Params::new())
            .unwrap(),
        r#"INSERT INTO "user" ("id", "name") VALUES (:qp0, :qp1) ON CONFLICT ("id") DO UPDATE SET "name"=:qp2"#
    );
}

#[test]
fn upsert_on_mysql() {
    let qb = with_schema(Dialect::mysql());
    let row = InsertSource::values([("id", Operand::from(1)), ("name", Operand::from("a"))]);

    assert_eq!(
        qb.upsert("user", &row, &UpsertUpdate::All, &mut Params::new())
            .unwrap(),
        "INSERT INTO `user` (`id`, `name`) VALUES (:qp0, :qp1) ON DUPLICATE KEY UPDATE `name`=VALUES(`name`)"
    );
    assert_eq!(
        qb.upsert("user", &row, &UpsertUpdate::Nothing, &mut Params::new())
            .unwrap(),
        "INSERT INTO `user` (`id`, `name`) VALUES (:qp0, :qp1) ON DUPLICATE KEY UPDATE `id`=`user`.`id`"
    );
}

#[test]
fn upsert_without_covered_constraint_is_a_plain_insert() {
    let qb = with_schema(Dialect::sqlite());
    let row = InsertSource::values([("name", "a")]);
    assert_eq!(
        qb.upsert("user", &row, &UpsertUpdate::All, &mut Params::new())
            .unwrap(),
        "INSERT INTO `user` (`name`) VALUES (:qp0)"
    );

    let unknown = QueryBuilder::new(Dialect::postgres());
    assert_eq!(
        unknown
            .upsert("user", &row, &UpsertUpdate::All, &mut Params::new())
            .unwrap(),
        r#"INSERT INTO "user" ("name") VALUES (:qp0)"#
    );
}

#[test]
fn upsert_only_keys_falls_back_to_do_nothing() {
    let qb = with_schema(Dialect::sqlite());
    let row = InsertSource::values([("id", Operand::from(1)), ("email", Operand::from("x@y"))]);
    assert_eq!(
        qb.upsert("user", &row, &UpsertUpdate::All, &mut Params::new())
            .unwrap(),
        "INSERT INTO `user` (`id`, `email`) VALUES (:qp0, :qp1) ON CONFLICT (`id`, `email`) DO NOTHING"
    );
}

#[test]
fn upsert_is_unsupported_on_mssql() {
    let qb = with_schema(Dialect::mssql());
    let row = InsertSource::values([("id", 1)]);
    let err = qb
        .upsert("user", &row, &UpsertUpdate::All, &mut Params::new())
        .unwrap_err();
    assert!(err.is_unsupported());
}
