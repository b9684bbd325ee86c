use std::fs;
use std::path::PathBuf;

use querykit::{Condition, Dialect, DialectConfig, DialectKind, Params, Query, QueryBuilder, QueryError};

fn temp_config(name: &str, body: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("querykit-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn loaded_dialect_drives_the_builder() {
    let path = temp_config(
        "pg.toml",
        r#"
kind = "pgsql"
table_prefix = "app_"
param_prefix = ":p"

[type_map]
json = "json"
"#,
    );
    let dialect = DialectConfig::load(&path).unwrap().into_dialect();
    assert_eq!(dialect.kind, DialectKind::Postgres);

    let qb = QueryBuilder::new(dialect);
    let query = Query::new()
        .from("{{%event}}")
        .where_(Condition::eq("kind", "click"));
    let built = qb.build(&query, Params::new()).unwrap();
    assert_eq!(built.sql, r#"SELECT * FROM "app_event" WHERE "kind" = :p0"#);
    assert_eq!(qb.get_column_type("json"), "json");
    assert_eq!(qb.get_column_type("text"), "text");

    fs::remove_file(path).unwrap();
}

#[test]
fn dialect_from_toml_text() {
    let dialect = Dialect::try_from("kind = \"mssql\"\nseparator = \"\\n\"").unwrap();
    let qb = QueryBuilder::new(dialect);
    let query = Query::new().select("id").from("t").order_by("id").limit(5);
    assert_eq!(
        qb.build(&query, Params::new()).unwrap().sql,
        "SELECT [id]\nFROM [t]\nORDER BY [id]\nOFFSET 0 ROWS\nFETCH NEXT 5 ROWS ONLY"
    );
}

#[test]
fn like_escape_char_override() {
    let dialect = Dialect::try_from("kind = \"mysql\"\nlike_escape_char = \"!\"").unwrap();
    let qb = QueryBuilder::new(dialect);
    let mut params = Params::new();
    let sql = qb
        .build_condition(&Condition::like("name", ["x"]), &mut params)
        .unwrap();
    assert_eq!(sql, "`name` LIKE :qp0 ESCAPE '!'");
}

#[test]
fn invalid_files_report_their_path() {
    let path = temp_config("bad.toml", "kind = \"sqlite\"\nunknown_key = 1\n");
    let err = DialectConfig::load(&path).unwrap_err();
    match &err {
        QueryError::Config(msg) => assert!(msg.contains("bad.toml")),
        other => panic!("expected a config error, got {other:?}"),
    }
    fs::remove_file(path).unwrap();

    let path = temp_config("empty_type.toml", "kind = \"mysql\"\n[type_map]\npk = \" \"\n");
    let err = DialectConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("type_map entry 'pk'"));
    fs::remove_file(path).unwrap();
}
