use querykit::{
    BuiltQuery, Condition, Dialect, Expression, OrderBy, Params, PlaceholderStyle, Query,
    QueryBuilder, Value,
};

fn build(dialect: Dialect, query: &Query) -> BuiltQuery {
    QueryBuilder::new(dialect).build(query, Params::new()).unwrap()
}

fn user_search() -> Query {
    Query::new()
        .select("u.id, u.name, p.bio")
        .from("user u")
        .left_join("profile p", "p.user_id = u.id")
        .where_(Condition::hash([("u.status", 1)]))
        .and_where(Condition::like("u.name", ["al_"]))
        .order_by("u.id DESC")
        .limit(20)
        .offset(40)
}

#[test]
fn same_query_per_dialect() {
    let query = user_search();

    assert_eq!(
        build(Dialect::postgres(), &query).sql,
        r#"SELECT "u"."id", "u"."name", "p"."bio" FROM "user" "u" LEFT JOIN "profile" "p" ON p.user_id = u.id WHERE ("u"."status"=:qp0) AND ("u"."name" LIKE :qp1) ORDER BY "u"."id" DESC LIMIT 20 OFFSET 40"#
    );
    assert_eq!(
        build(Dialect::mysql(), &query).sql,
        "SELECT `u`.`id`, `u`.`name`, `p`.`bio` FROM `user` `u` LEFT JOIN `profile` `p` ON p.user_id = u.id WHERE (`u`.`status`=:qp0) AND (`u`.`name` LIKE :qp1) ORDER BY `u`.`id` DESC LIMIT 20 OFFSET 40"
    );
    assert_eq!(
        build(Dialect::sqlite(), &query).sql,
        r"SELECT `u`.`id`, `u`.`name`, `p`.`bio` FROM `user` `u` LEFT JOIN `profile` `p` ON p.user_id = u.id WHERE (`u`.`status`=:qp0) AND (`u`.`name` LIKE :qp1 ESCAPE '\') ORDER BY `u`.`id` DESC LIMIT 20 OFFSET 40"
    );
    assert_eq!(
        build(Dialect::mssql(), &query).sql,
        "SELECT [u].[id], [u].[name], [p].[bio] FROM [user] [u] LEFT JOIN [profile] [p] ON p.user_id = u.id WHERE ([u].[status]=:qp0) AND ([u].[name] LIKE :qp1) ORDER BY [u].[id] DESC OFFSET 40 ROWS FETCH NEXT 20 ROWS ONLY"
    );
}

#[test]
fn bound_values_are_returned_in_order() {
    let built = build(Dialect::postgres(), &user_search());
    let values: Vec<(String, Value)> = built.params.into_vec();
    assert_eq!(
        values,
        vec![
            (":qp0".to_string(), Value::Int(1)),
            (":qp1".to_string(), Value::from(r"%al\_%")),
        ]
    );
}

#[test]
fn seeded_params_shift_numbering() {
    let qb = QueryBuilder::new(Dialect::postgres());
    let query = Query::new().from("t").where_(Condition::eq("a", 1));
    let built = qb.build(&query, Params::new().with(":tenant", 7)).unwrap();
    assert_eq!(built.sql, r#"SELECT * FROM "t" WHERE "a" = :qp1"#);
    assert_eq!(built.params.len(), 2);
}

#[test]
fn sub_queries_share_the_parameter_map() {
    let recent = Query::new()
        .select("user_id")
        .from("order")
        .where_(Condition::gt("created_at", "2024-01-01"));
    let query = Query::new()
        .from("user")
        .where_(Condition::eq("active", true))
        .and_where(Condition::in_query(["id"], recent));
    let built = build(Dialect::postgres(), &query);
    assert_eq!(
        built.sql,
        r#"SELECT * FROM "user" WHERE ("active" = :qp0) AND ("id" IN (SELECT "user_id" FROM "order" WHERE "created_at" > :qp1))"#
    );
    assert_eq!(built.params.get(":qp1"), Some(&Value::from("2024-01-01")));
}

#[test]
fn filter_where_skips_empty_inputs() {
    let name: Option<&str> = None;
    let query = Query::new().from("user").filter_where(Condition::hash([
        ("name", querykit::Operand::from(name)),
        ("status", querykit::Operand::from(2)),
        ("tag", querykit::Operand::from("")),
    ]));
    let built = build(Dialect::postgres(), &query);
    assert_eq!(built.sql, r#"SELECT * FROM "user" WHERE "status"=:qp0"#);

    let query = Query::new()
        .from("user")
        .and_filter_where(Condition::like("name", [""]));
    assert_eq!(build(Dialect::postgres(), &query).sql, r#"SELECT * FROM "user""#);
}

#[test]
fn order_by_entries_and_expressions() {
    let query = Query::new()
        .from("t")
        .order_by_desc("created_at")
        .order_by_expr(Expression::raw("FIELD([[id]], 3, 1, 2)"));
    assert_eq!(
        build(Dialect::mysql(), &query).sql,
        "SELECT * FROM `t` ORDER BY `created_at` DESC, FIELD(`id`, 3, 1, 2)"
    );

    let parsed = OrderBy::parse_list("name, LENGTH(name) DESC");
    assert_eq!(parsed.len(), 2);
}

#[test]
fn limit_expressions_are_built() {
    let query = Query::new()
        .from("t")
        .limit_expr(Expression::raw("(SELECT 5)"))
        .offset(2);
    assert_eq!(
        build(Dialect::postgres(), &query).sql,
        r#"SELECT * FROM "t" LIMIT (SELECT 5) OFFSET 2"#
    );
}

#[test]
fn raw_unions_and_ctes() {
    let query = Query::new()
        .select("id")
        .from("a")
        .union_raw("SELECT id FROM {{b}}", true);
    assert_eq!(
        build(Dialect::postgres(), &query).sql,
        r#"(SELECT "id" FROM "a") UNION ALL ( SELECT id FROM "b" )"#
    );

    let base = Query::new()
        .select("id, parent_id")
        .from("category")
        .where_(Condition::hash([("parent_id", Value::Null)]));
    let query = Query::new()
        .with_query(base, "tree", true)
        .from("tree");
    assert_eq!(
        build(Dialect::sqlite(), &query).sql,
        "WITH RECURSIVE tree AS (SELECT `id`, `parent_id` FROM `category` WHERE `parent_id` IS NULL) SELECT * FROM `tree`"
    );
}

#[test]
fn select_option_and_group_by_expression() {
    let query = Query::new()
        .select("DATE(created_at) AS day, COUNT(*) AS n")
        .select_option("SQL_CALC_FOUND_ROWS")
        .from("event")
        .group_by("DATE(created_at)")
        .having(Condition::gte("COUNT(*)", 10));
    assert_eq!(
        build(Dialect::mysql(), &query).sql,
        "SELECT SQL_CALC_FOUND_ROWS DATE(created_at) AS day, COUNT(*) AS n FROM `event` GROUP BY DATE(created_at) HAVING COUNT(*) >= :qp0"
    );
}

#[test]
fn positional_output_for_drivers() {
    let built = build(Dialect::postgres(), &user_search());
    let (sql, values) = built.to_positional(PlaceholderStyle::Dollar);
    assert!(sql.contains(r#"("u"."status"=$1) AND ("u"."name" LIKE $2)"#));
    assert_eq!(values.len(), 2);

    let built = build(Dialect::mysql(), &user_search());
    let (sql, values) = built.to_positional(PlaceholderStyle::Question);
    assert!(sql.contains("(`u`.`status`=?) AND (`u`.`name` LIKE ?)"));
    assert_eq!(values[0], Value::Int(1));
}

#[test]
fn table_prefix_applies_to_braced_names() {
    let qb = QueryBuilder::new(Dialect::postgres().with_table_prefix("app_"));
    let query = Query::new().from("{{%user}} u").where_(Condition::raw("[[u.id]] > 0"));
    assert_eq!(
        qb.build(&query, Params::new()).unwrap().sql,
        r#"SELECT * FROM "app_user" "u" WHERE "u"."id" > 0"#
    );
}
