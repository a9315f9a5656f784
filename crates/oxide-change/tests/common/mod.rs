#![allow(dead_code)]

use oxide_change::prelude::*;

pub fn column(name: &str, type_name: &str) -> FieldValue {
    FieldValue::record([("name", name), ("type", type_name)])
}

pub fn configure(mut pending: PendingChange, fields: &[(&str, FieldValue)]) -> PendingChange {
    for (name, value) in fields {
        pending
            .set(name, value.clone())
            .unwrap_or_else(|e| panic!("Failed to set '{name}': {e}"));
    }
    pending
}

pub fn unit(
    kind: &str,
    dialect: &dyn Dialect,
    fields: &[(&str, FieldValue)],
) -> ChangeUnit {
    let pending = ChangeRegistry::global()
        .create(kind, dialect)
        .unwrap_or_else(|e| panic!("Failed to create '{kind}': {e}"));
    configure(pending, fields)
        .setup(&NoResources)
        .unwrap_or_else(|e| panic!("Failed to set up '{kind}': {e}"))
}

pub fn sql(statements: &[Statement]) -> Vec<&str> {
    statements.iter().map(Statement::sql).collect()
}

/// A representative configuration for every built-in kind.
///
/// `sql-file` reads `up.sql` relative to the resolver's base directory.
pub fn sample_fields(kind: &str) -> Vec<(&'static str, FieldValue)> {
    let text = |s: &str| FieldValue::from(s);
    match kind {
        "create-table" => vec![
            ("schema_name", text("app")),
            ("table_name", text("users")),
            ("if_not_exists", FieldValue::Bool(true)),
            (
                "columns",
                FieldValue::List(vec![
                    FieldValue::record([
                        ("name", text("id")),
                        ("type", text("bigint")),
                        ("primary_key", FieldValue::Bool(true)),
                        ("auto_increment", FieldValue::Bool(true)),
                    ]),
                    FieldValue::record([
                        ("name", text("email")),
                        ("type", text("varchar(255)")),
                        ("nullable", FieldValue::Bool(false)),
                        ("default_value", text("n/a")),
                    ]),
                ]),
            ),
        ],
        "drop-table" => vec![
            ("table_name", text("users")),
            ("if_exists", FieldValue::Bool(true)),
            ("cascade_constraints", FieldValue::Bool(true)),
        ],
        "rename-table" => vec![
            ("schema_name", text("app")),
            ("old_table_name", text("users")),
            ("new_table_name", text("accounts")),
        ],
        "add-column" => vec![
            ("table_name", text("users")),
            ("columns", FieldValue::List(vec![column("email", "text")])),
        ],
        "drop-column" => vec![
            ("table_name", text("users")),
            ("column_name", text("email")),
        ],
        "rename-column" => vec![
            ("table_name", text("users")),
            ("old_column_name", text("mail")),
            ("new_column_name", text("email")),
            ("column_data_type", text("varchar(255)")),
        ],
        "modify-data-type" => vec![
            ("table_name", text("users")),
            ("column_name", text("age")),
            ("new_data_type", text("bigint")),
        ],
        "add-not-null-constraint" => vec![
            ("table_name", text("users")),
            ("column_name", text("email")),
            ("column_data_type", text("text")),
            ("default_null_value", text("unknown")),
        ],
        "drop-not-null-constraint" => vec![
            ("table_name", text("users")),
            ("column_name", text("email")),
            ("column_data_type", text("text")),
        ],
        "create-index" => vec![
            ("table_name", text("users")),
            ("index_name", text("idx_users_email")),
            ("unique", FieldValue::Bool(true)),
            (
                "columns",
                FieldValue::List(vec![FieldValue::record([("name", "email")])]),
            ),
        ],
        "drop-index" => vec![
            ("table_name", text("users")),
            ("index_name", text("idx_users_email")),
        ],
        "add-foreign-key-constraint" => vec![
            ("base_table_name", text("orders")),
            ("base_column_names", text("user_id")),
            ("constraint_name", text("fk_orders_user")),
            ("referenced_table_name", text("users")),
            ("referenced_column_names", text("id")),
            ("on_delete", text("CASCADE")),
        ],
        "drop-foreign-key-constraint" => vec![
            ("base_table_name", text("orders")),
            ("constraint_name", text("fk_orders_user")),
        ],
        "add-unique-constraint" => vec![
            ("table_name", text("users")),
            ("column_names", text("email, tenant_id")),
            ("constraint_name", text("uq_users_email")),
        ],
        "drop-unique-constraint" => vec![
            ("table_name", text("users")),
            ("constraint_name", text("uq_users_email")),
        ],
        "insert" => vec![
            ("table_name", text("users")),
            (
                "columns",
                FieldValue::List(vec![
                    FieldValue::record([("name", text("id")), ("value", FieldValue::Integer(1))]),
                    FieldValue::record([("name", text("email")), ("value", text("a@example.com"))]),
                ]),
            ),
        ],
        "delete" => vec![
            ("table_name", text("users")),
            ("where_clause", text("id = 1")),
        ],
        "sql" => vec![
            ("sql", text("UPDATE users SET active = true; DELETE FROM sessions")),
            ("dbms", text("postgresql, mysql")),
            ("rollback_sql", text("UPDATE users SET active = false")),
        ],
        "sql-file" => vec![
            ("path", text("up.sql")),
            ("strip_comments", FieldValue::Bool(true)),
            ("rollback_sql", text("DROP TABLE audit")),
        ],
        other => panic!("No sample configuration for '{other}'"),
    }
}
