use std::sync::Arc;

use querykit::{
    ColumnBuilder, ColumnDef, ColumnKind, Condition, Dialect, Expression, ForeignKey, Query,
    QueryBuilder, SchemaRegistry, TableSchema,
};

fn qb(dialect: Dialect) -> QueryBuilder {
    QueryBuilder::new(dialect)
}

fn with_user_schema(dialect: Dialect) -> QueryBuilder {
    let registry = SchemaRegistry::new()
        .with_table(
            TableSchema::new("user")
                .column("id", ColumnKind::Integer)
                .primary_key(["id"])
                .sequence("user_id_seq"),
        )
        .with_table(TableSchema::new("post").column("id", ColumnKind::Integer));
    QueryBuilder::builder(dialect)
        .schema(Arc::new(registry))
        .build()
}

#[test]
fn column_types_resolve_through_the_type_map() {
    let pg = qb(Dialect::postgres());
    assert_eq!(pg.get_column_type("pk"), "serial NOT NULL PRIMARY KEY");
    assert_eq!(pg.get_column_type("string(64)"), "varchar(64)");
    assert_eq!(pg.get_column_type("string NOT NULL"), "varchar(255) NOT NULL");
    assert_eq!(pg.get_column_type("citext"), "citext");

    let mysql = qb(Dialect::mysql());
    assert_eq!(mysql.get_column_type("decimal(10,2)"), "decimal(10,2)");
    assert_eq!(mysql.get_column_type("boolean"), "tinyint(1)");
    assert_eq!(
        mysql.get_column_type(ColumnBuilder::integer(None).unsigned().not_null()),
        "int(11) UNSIGNED NOT NULL"
    );
    assert_eq!(
        mysql.get_column_type(ColumnBuilder::primary_key(None).unsigned()),
        "int(10) UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY"
    );

    let mssql = qb(Dialect::mssql());
    assert_eq!(
        mssql.get_column_type(ColumnBuilder::string(Some(32)).not_null()),
        "nvarchar(32) NOT NULL"
    );
}

#[test]
fn create_table_with_raw_constraint_line() {
    let sql = qb(Dialect::postgres())
        .create_table(
            "user",
            [
                ("id", ColumnDef::from("pk")),
                ("name", ColumnBuilder::string(Some(64)).not_null().into()),
                ("", ColumnDef::from("UNIQUE (name)")),
            ],
            None,
        )
        .unwrap();
    assert_eq!(
        sql,
        "CREATE TABLE \"user\" (\n\t\"id\" serial NOT NULL PRIMARY KEY,\n\t\"name\" varchar(64) NOT NULL,\n\tUNIQUE (name)\n)"
    );
}

#[test]
fn create_table_with_options() {
    let sql = qb(Dialect::mysql())
        .create_table(
            "log",
            [("id", "bigpk"), ("body", "text")],
            Some("ENGINE=InnoDB"),
        )
        .unwrap();
    assert_eq!(
        sql,
        "CREATE TABLE `log` (\n\t`id` bigint(20) NOT NULL AUTO_INCREMENT PRIMARY KEY,\n\t`body` text\n) ENGINE=InnoDB"
    );
}

#[test]
fn table_statements_per_dialect() {
    assert_eq!(
        qb(Dialect::mysql()).rename_table("a", "b").unwrap(),
        "RENAME TABLE `a` TO `b`"
    );
    assert_eq!(
        qb(Dialect::postgres()).rename_table("a", "b").unwrap(),
        r#"ALTER TABLE "a" RENAME TO "b""#
    );
    assert_eq!(
        qb(Dialect::mssql()).rename_table("a", "b").unwrap(),
        "sp_rename [a], [b]"
    );
    assert_eq!(
        qb(Dialect::postgres()).drop_table("a").unwrap(),
        r#"DROP TABLE "a""#
    );
    assert_eq!(
        qb(Dialect::sqlite()).truncate_table("a").unwrap(),
        "DELETE FROM `a`"
    );
    assert_eq!(
        qb(Dialect::mysql()).truncate_table("a").unwrap(),
        "TRUNCATE TABLE `a`"
    );
}

#[test]
fn column_statements_per_dialect() {
    assert_eq!(
        qb(Dialect::postgres())
            .add_column("user", "age", "integer")
            .unwrap(),
        r#"ALTER TABLE "user" ADD COLUMN "age" integer"#
    );
    assert_eq!(
        qb(Dialect::mysql()).add_column("user", "age", "integer").unwrap(),
        "ALTER TABLE `user` ADD `age` int(11)"
    );
    assert_eq!(
        qb(Dialect::sqlite()).drop_column("user", "age").unwrap(),
        "ALTER TABLE `user` DROP COLUMN `age`"
    );
    assert_eq!(
        qb(Dialect::postgres())
            .rename_column("user", "name", "full_name")
            .unwrap(),
        r#"ALTER TABLE "user" RENAME COLUMN "name" TO "full_name""#
    );
    assert_eq!(
        qb(Dialect::mssql())
            .rename_column("user", "name", "full_name")
            .unwrap(),
        "sp_rename '[user].[name]', [full_name], 'COLUMN'"
    );
}

#[test]
fn alter_column_per_dialect() {
    assert_eq!(
        qb(Dialect::mysql())
            .alter_column("user", "name", "string(128)")
            .unwrap(),
        "ALTER TABLE `user` CHANGE `name` `name` varchar(128)"
    );
    assert_eq!(
        qb(Dialect::postgres())
            .alter_column("user", "name", "string(128)")
            .unwrap(),
        r#"ALTER TABLE "user" ALTER COLUMN "name" TYPE varchar(128)"#
    );
    assert_eq!(
        qb(Dialect::postgres())
            .alter_column("user", "name", "SET NOT NULL")
            .unwrap(),
        r#"ALTER TABLE "user" ALTER COLUMN "name" SET NOT NULL"#
    );
    assert_eq!(
        qb(Dialect::mssql())
            .alter_column("user", "name", "text")
            .unwrap(),
        "ALTER TABLE [user] ALTER COLUMN [name] nvarchar(max)"
    );
    assert!(
        qb(Dialect::sqlite())
            .alter_column("user", "name", "text")
            .unwrap_err()
            .is_unsupported()
    );
}

#[test]
fn key_constraints() {
    let pg = qb(Dialect::postgres());
    assert_eq!(
        pg.add_primary_key("pk_user", "user", &["id"]).unwrap(),
        r#"ALTER TABLE "user" ADD CONSTRAINT "pk_user" PRIMARY KEY ("id")"#
    );
    assert_eq!(
        pg.drop_primary_key("pk_user", "user").unwrap(),
        r#"ALTER TABLE "user" DROP CONSTRAINT "pk_user""#
    );
    assert_eq!(
        qb(Dialect::mysql())
            .drop_primary_key("pk_user", "user")
            .unwrap(),
        "ALTER TABLE `user` DROP PRIMARY KEY"
    );

    let fk = ForeignKey::new("fk_post_user", "post", ["user_id"], "user", ["id"])
        .on_delete("CASCADE")
        .on_update("NO ACTION");
    assert_eq!(
        pg.add_foreign_key(&fk).unwrap(),
        r#"ALTER TABLE "post" ADD CONSTRAINT "fk_post_user" FOREIGN KEY ("user_id") REFERENCES "user" ("id") ON DELETE CASCADE ON UPDATE NO ACTION"#
    );
    assert_eq!(
        qb(Dialect::mysql())
            .drop_foreign_key("fk_post_user", "post")
            .unwrap(),
        "ALTER TABLE `post` DROP FOREIGN KEY `fk_post_user`"
    );
    assert!(
        qb(Dialect::sqlite())
            .add_foreign_key(&fk)
            .unwrap_err()
            .is_unsupported()
    );
}

#[test]
fn indexes_and_unique_constraints() {
    let pg = qb(Dialect::postgres());
    assert_eq!(
        pg.create_index("idx_user_email", "user", &["email"], true)
            .unwrap(),
        r#"CREATE UNIQUE INDEX "idx_user_email" ON "user" ("email")"#
    );
    assert_eq!(
        pg.create_index("idx_lower", "user", &["LOWER(email)"], false)
            .unwrap(),
        r#"CREATE INDEX "idx_lower" ON "user" (LOWER(email))"#
    );
    assert_eq!(
        pg.drop_index("idx_lower", "user").unwrap(),
        r#"DROP INDEX "idx_lower""#
    );
    assert_eq!(
        qb(Dialect::mysql()).drop_index("idx_lower", "user").unwrap(),
        "DROP INDEX `idx_lower` ON `user`"
    );

    assert_eq!(
        pg.add_unique("uq_email", "user", &["email", "tenant_id"])
            .unwrap(),
        r#"ALTER TABLE "user" ADD CONSTRAINT "uq_email" UNIQUE ("email", "tenant_id")"#
    );
    assert_eq!(
        qb(Dialect::mysql()).drop_unique("uq_email", "user").unwrap(),
        "DROP INDEX `uq_email` ON `user`"
    );
}

#[test]
fn checks_and_defaults() {
    assert_eq!(
        qb(Dialect::postgres())
            .add_check("chk_age", "user", "[[age]] >= 0")
            .unwrap(),
        r#"ALTER TABLE "user" ADD CONSTRAINT "chk_age" CHECK ("age" >= 0)"#
    );
    assert!(
        qb(Dialect::mysql())
            .add_check("chk_age", "user", "age >= 0")
            .unwrap_err()
            .is_unsupported()
    );

    let mssql = qb(Dialect::mssql());
    assert_eq!(
        mssql
            .add_default_value("df_status", "user", "status", 1)
            .unwrap(),
        "ALTER TABLE [user] ADD CONSTRAINT [df_status] DEFAULT 1 FOR [status]"
    );
    assert_eq!(
        mssql
            .add_default_value("df_created", "user", "created_at", Expression::raw("GETDATE()"))
            .unwrap(),
        "ALTER TABLE [user] ADD CONSTRAINT [df_created] DEFAULT GETDATE() FOR [created_at]"
    );
    assert_eq!(
        mssql.drop_default_value("df_status", "user").unwrap(),
        "ALTER TABLE [user] DROP CONSTRAINT [df_status]"
    );
    assert!(
        qb(Dialect::postgres())
            .drop_default_value("df_status", "user")
            .unwrap_err()
            .is_unsupported()
    );
}

#[test]
fn comments() {
    assert_eq!(
        qb(Dialect::postgres())
            .add_comment_on_table("user", "People")
            .unwrap(),
        r#"COMMENT ON TABLE "user" IS 'People'"#
    );
    assert_eq!(
        qb(Dialect::postgres())
            .add_comment_on_column("user", "name", "Full name")
            .unwrap(),
        r#"COMMENT ON COLUMN "user"."name" IS 'Full name'"#
    );
    assert_eq!(
        qb(Dialect::mysql())
            .add_comment_on_table("user", "People")
            .unwrap(),
        "ALTER TABLE `user` COMMENT 'People'"
    );
    assert_eq!(
        qb(Dialect::mssql())
            .add_comment_on_column("user", "name", "Full name")
            .unwrap(),
        "sp_addextendedproperty @name = N'MS_Description', @value = N'Full name', \
         @level0type = N'SCHEMA', @level0name = N'dbo', \
         @level1type = N'TABLE', @level1name = N'user', \
         @level2type = N'COLUMN', @level2name = N'name'"
    );
    assert!(
        qb(Dialect::sqlite())
            .add_comment_on_table("user", "People")
            .unwrap_err()
            .is_unsupported()
    );
}

#[test]
fn views_inline_bound_values() {
    let query = Query::new()
        .select("id")
        .from("user")
        .where_(Condition::hash([("status", 1)]));
    assert_eq!(
        qb(Dialect::postgres())
            .create_view("active_users", &query)
            .unwrap(),
        r#"CREATE VIEW "active_users" AS SELECT "id" FROM "user" WHERE "status"=1"#
    );

    let query = Query::new()
        .from("user")
        .where_(Condition::eq("name", "o'brien"));
    assert_eq!(
        qb(Dialect::sqlite()).create_view("v", &query).unwrap(),
        "CREATE VIEW `v` AS SELECT * FROM `user` WHERE `name` = 'o''brien'"
    );
    assert_eq!(
        qb(Dialect::sqlite()).drop_view("v").unwrap(),
        "DROP VIEW `v`"
    );
}

#[test]
fn reset_sequence_per_dialect() {
    assert_eq!(
        with_user_schema(Dialect::postgres())
            .reset_sequence("user", None)
            .unwrap(),
        r#"SELECT SETVAL('"user_id_seq"',(SELECT COALESCE(MAX("id"),0) FROM "user")+1,false)"#
    );
    assert_eq!(
        with_user_schema(Dialect::postgres())
            .reset_sequence("user", Some(5))
            .unwrap(),
        r#"SELECT SETVAL('"user_id_seq"',5,false)"#
    );
    assert!(
        with_user_schema(Dialect::postgres())
            .reset_sequence("post", None)
            .unwrap_err()
            .is_invalid_argument()
    );

    assert_eq!(
        qb(Dialect::sqlite()).reset_sequence("user", Some(10)).unwrap(),
        "UPDATE sqlite_sequence SET seq='9' WHERE name='user'"
    );
    assert_eq!(
        with_user_schema(Dialect::sqlite())
            .reset_sequence("user", None)
            .unwrap(),
        "UPDATE sqlite_sequence SET seq=(SELECT MAX(`id`) FROM `user`) WHERE name='user'"
    );
    assert_eq!(
        qb(Dialect::mysql()).reset_sequence("user", Some(100)).unwrap(),
        "ALTER TABLE `user` AUTO_INCREMENT=100"
    );
    assert!(
        qb(Dialect::mysql())
            .reset_sequence("user", None)
            .unwrap_err()
            .is_invalid_argument()
    );
    assert_eq!(
        qb(Dialect::mssql()).reset_sequence("user", Some(3)).unwrap(),
        "DBCC CHECKIDENT ('[user]', RESEED, 3)"
    );
}

#[test]
fn sqlite_reset_sequence_saturates_at_the_lower_bound() {
    assert_eq!(
        qb(Dialect::sqlite())
            .reset_sequence("user", Some(i64::MIN))
            .unwrap(),
        format!("UPDATE sqlite_sequence SET seq='{}' WHERE name='user'", i64::MIN)
    );
}

#[test]
fn check_integrity_per_dialect() {
    assert_eq!(
        qb(Dialect::mysql()).check_integrity(false, None, None).unwrap(),
        "SET FOREIGN_KEY_CHECKS = 0"
    );
    assert_eq!(
        qb(Dialect::sqlite()).check_integrity(true, None, None).unwrap(),
        "PRAGMA foreign_keys=1"
    );
    assert_eq!(
        qb(Dialect::postgres())
            .check_integrity(false, None, Some("user"))
            .unwrap(),
        r#"ALTER TABLE "public"."user" DISABLE TRIGGER ALL"#
    );
    assert_eq!(
        with_user_schema(Dialect::mssql())
            .check_integrity(true, None, None)
            .unwrap(),
        "ALTER TABLE [dbo].[post] CHECK CONSTRAINT ALL; ALTER TABLE [dbo].[user] CHECK CONSTRAINT ALL"
    );
    assert!(
        qb(Dialect::postgres())
            .check_integrity(true, None, None)
            .unwrap_err()
            .is_invalid_argument()
    );
}
