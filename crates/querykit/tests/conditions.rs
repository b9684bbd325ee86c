use std::any::Any;
use std::sync::Arc;

use querykit::{
    Condition, CustomExpression, Dialect, Expression, Operand, Params, Query, QueryBuilder,
    QueryError, QueryResult, Value,
};

fn render(qb: &QueryBuilder, cond: &Condition) -> (String, Params) {
    let mut params = Params::new();
    let sql = qb.build_condition(cond, &mut params).unwrap();
    (sql, params)
}

fn cond(op: &str, operands: Vec<Operand>) -> Condition {
    QueryBuilder::new(Dialect::postgres())
        .create_condition(op, operands)
        .unwrap()
}

#[test]
fn operator_form_builds_trees() {
    let qb = QueryBuilder::new(Dialect::postgres());
    let tree = cond(
        "and",
        vec![
            Expression::from(Condition::eq("a", 1)).into(),
            Operand::from("b IS NULL"),
        ],
    );
    let (sql, params) = render(&qb, &tree);
    assert_eq!(sql, r#"("a" = :qp0) AND (b IS NULL)"#);
    assert_eq!(params.len(), 1);

    let (sql, _) = render(
        &qb,
        &cond("in", vec![Operand::from("id"), Operand::from(vec![1, 2, 3])]),
    );
    assert_eq!(sql, r#""id" IN (:qp0, :qp1, :qp2)"#);

    let (sql, _) = render(
        &qb,
        &cond(
            "not between",
            vec![Operand::from("age"), Operand::from(18), Operand::from(65)],
        ),
    );
    assert_eq!(sql, r#""age" NOT BETWEEN :qp0 AND :qp1"#);

    let (sql, params) = render(
        &qb,
        &cond("or like", vec![Operand::from("name"), Operand::from(vec!["a", "b"])]),
    );
    assert_eq!(sql, r#""name" LIKE :qp0 OR "name" LIKE :qp1"#);
    assert_eq!(params.get(":qp1"), Some(&Value::from("%b%")));

    let (sql, _) = render(
        &qb,
        &cond(">=", vec![Operand::from("score"), Operand::from(10)]),
    );
    assert_eq!(sql, r#""score" >= :qp0"#);
}

#[test]
fn operator_form_rejects_bad_input() {
    let qb = QueryBuilder::new(Dialect::postgres());
    let err = qb
        .create_condition("in", vec![Operand::from("id")])
        .unwrap_err();
    assert!(err.is_invalid_argument());

    let err = qb
        .create_condition("exists", vec![Operand::from("id")])
        .unwrap_err();
    assert!(err.is_invalid_argument());

    let err = qb
        .create_condition("= 1; DROP", vec![Operand::from("a"), Operand::from(1)])
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidArgument(_)));
}

#[test]
fn exists_through_operator_form() {
    let qb = QueryBuilder::new(Dialect::mysql());
    let sub = Query::new()
        .select("o.id")
        .from("order o")
        .where_("o.user_id = u.id");
    let (sql, _) = render(&qb, &cond("not exists", vec![Operand::from(sub)]));
    assert_eq!(
        sql,
        "NOT EXISTS (SELECT `o`.`id` FROM `order` `o` WHERE o.user_id = u.id)"
    );
}

/// `column @> value` on PostgreSQL, `JSON_CONTAINS(column, value)` elsewhere.
#[derive(Debug)]
struct JsonContains {
    column: String,
    value: serde_json::Value,
}

impl CustomExpression for JsonContains {
    fn kind(&self) -> &'static str {
        "json_contains"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn json_builder(dialect: Dialect) -> QueryBuilder {
    QueryBuilder::builder(dialect)
        .expression_builder(
            "json_contains",
            Arc::new(
                |expr: &dyn CustomExpression,
                 qb: &QueryBuilder,
                 params: &mut Params|
                 -> QueryResult<String> {
                    let json = expr
                        .as_any()
                        .downcast_ref::<JsonContains>()
                        .ok_or_else(|| QueryError::invalid_argument("not a json_contains"))?;
                    let column = qb.quoter().quote_column_name(&json.column);
                    let value = qb.bind_param(json.value.clone(), params);
                    Ok(match qb.dialect().kind {
                        querykit::DialectKind::Postgres => format!("{column} @> {value}"),
                        _ => format!("JSON_CONTAINS({column}, {value})"),
                    })
                },
            ),
        )
        .build()
}

#[test]
fn custom_expression_from_outside_the_crate() {
    let filter = || {
        Condition::expr(Expression::custom(JsonContains {
            column: "tags".to_string(),
            value: serde_json::json!(["rust"]),
        }))
    };
    let query = Query::new()
        .from("post")
        .where_(Condition::eq("published", true))
        .and_where(filter());

    let built = json_builder(Dialect::postgres())
        .build(&query, Params::new())
        .unwrap();
    assert_eq!(
        built.sql,
        r#"SELECT * FROM "post" WHERE ("published" = :qp0) AND ("tags" @> :qp1)"#
    );
    assert_eq!(
        built.params.get(":qp1"),
        Some(&Value::Json(serde_json::json!(["rust"])))
    );

    let built = json_builder(Dialect::mysql())
        .build(&Query::new().from("post").where_(filter()), Params::new())
        .unwrap();
    assert_eq!(
        built.sql,
        "SELECT * FROM `post` WHERE JSON_CONTAINS(`tags`, :qp0)"
    );

    let err = QueryBuilder::new(Dialect::mysql())
        .build(&Query::new().from("post").where_(filter()), Params::new())
        .unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedExpression { ref kind } if kind == "json_contains"));
}

#[test]
fn or_where_and_nested_not() {
    let qb = QueryBuilder::new(Dialect::sqlite());
    let query = Query::new()
        .from("user")
        .where_(Condition::hash([("role", "admin")]))
        .or_where(Condition::not(Condition::in_list("status", [1, 2])));
    let built = qb.build(&query, Params::new()).unwrap();
    assert_eq!(
        built.sql,
        "SELECT * FROM `user` WHERE (`role`=:qp0) OR (NOT (`status` IN (:qp1, :qp2)))"
    );
}

#[test]
fn filtered_conditions_drop_empty_branches() {
    let search: Option<&str> = None;
    let cond = Condition::and([
        Condition::eq("name", search),
        Condition::like("email", ["  "]),
        Condition::in_list("id", Vec::<i64>::new()),
        Condition::between("age", 18, 30),
    ]);
    let filtered = cond.filtered().unwrap();
    let (sql, _) = render(&QueryBuilder::new(Dialect::postgres()), &filtered);
    assert_eq!(sql, r#""age" BETWEEN :qp0 AND :qp1"#);

    assert!(Condition::hash([("a", "")]).filtered().is_none());
}
