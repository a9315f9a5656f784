//! Raw SQL changes, inline or read from a file.

use tracing::debug;

use super::fields::{self, FieldList};
use super::{Change, ChangeBuilder, ChangeMetadata, FieldSpec, SPECIALIZATION_LEVEL_DEFAULT};
use crate::dialect::{self, Dialect};
use crate::error::{ChangeError, Result};
use crate::resource::ResourceResolver;
use crate::rollback::Rollback;
use crate::statement::{split_script, strip_comments, Statement};
use crate::value::FieldValue;

pub(crate) static SQL: ChangeMetadata = ChangeMetadata {
    kind: "sql",
    description: "Run raw SQL",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: &[
        FieldSpec::scalar("sql", "SQL to run").required(),
        FieldSpec::scalar("split_statements", "Split on the end delimiter (default true)"),
        FieldSpec::scalar("strip_comments", "Remove SQL comments first (default false)"),
        FieldSpec::scalar("end_delimiter", "Statement delimiter (default ';')"),
        FieldSpec::scalar("dbms", "Comma separated databases to run on; '!name' excludes"),
        FieldSpec::scalar("rollback_sql", "SQL that undoes the change"),
    ],
};

pub(crate) static SQL_FILE: ChangeMetadata = ChangeMetadata {
    kind: "sql-file",
    description: "Run SQL read from a file",
    specialization_level: SPECIALIZATION_LEVEL_DEFAULT,
    fields: &[
        FieldSpec::scalar("path", "File to read").required(),
        FieldSpec::scalar("relative_to_changelog", "Resolve 'path' next to the changelog"),
        FieldSpec::scalar("split_statements", "Split on the end delimiter (default true)"),
        FieldSpec::scalar("strip_comments", "Remove SQL comments first (default false)"),
        FieldSpec::scalar("end_delimiter", "Statement delimiter (default ';')"),
        FieldSpec::scalar("dbms", "Comma separated databases to run on; '!name' excludes"),
        FieldSpec::scalar("rollback_sql", "SQL that undoes the change"),
    ],
};

const DEFAULT_DELIMITER: &str = ";";

/// Script handling options shared by both kinds.
#[derive(Debug, Clone, Default)]
struct ScriptOptions {
    split_statements: Option<bool>,
    strip_comments: Option<bool>,
    end_delimiter: Option<String>,
    dbms: Option<String>,
    rollback_sql: Option<String>,
}

impl ScriptOptions {
    /// Sets an option field. Returns `false` if the field is not an option.
    fn set(&mut self, meta: &ChangeMetadata, field: &str, value: FieldValue) -> Result<bool> {
        match field {
            "split_statements" => self.split_statements = Some(fields::flag(meta, field, value)?),
            "strip_comments" => self.strip_comments = Some(fields::flag(meta, field, value)?),
            "end_delimiter" => self.end_delimiter = Some(fields::text(meta, field, value)?),
            "dbms" => self.dbms = Some(fields::text(meta, field, value)?),
            "rollback_sql" => self.rollback_sql = Some(fields::text(meta, field, value)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn check(&self) -> Result<()> {
        if let Some(ref dbms) = self.dbms {
            for entry in dbms.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                let name = entry.trim_start_matches('!');
                if name != "all" && dialect::by_name(name).is_none() {
                    return Err(ChangeError::setup(format!("'dbms': unknown database '{name}'")));
                }
            }
        }
        Ok(())
    }

    fn fields(&self, list: FieldList) -> FieldList {
        list.opt_flag("split_statements", self.split_statements)
            .opt_flag("strip_comments", self.strip_comments)
            .opt_text("end_delimiter", self.end_delimiter.as_ref())
            .opt_text("dbms", self.dbms.as_ref())
            .opt_text("rollback_sql", self.rollback_sql.as_ref())
    }

    /// Whether the `dbms` filter admits the dialect.
    fn admits(&self, dialect: &dyn Dialect) -> bool {
        let Some(ref dbms) = self.dbms else {
            return true;
        };
        let matches = |name: &str| {
            name == "all"
                || name.eq_ignore_ascii_case(dialect.name())
                || dialect::by_name(name).is_some_and(|d| d.name() == dialect.name())
        };

        let mut included = None;
        for entry in dbms.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.strip_prefix('!') {
                Some(excluded) if matches(excluded) => return false,
                Some(_) => {}
                None => {
                    included = Some(included.unwrap_or(false) || matches(entry));
                }
            }
        }
        included.unwrap_or(true)
    }

    fn statements(&self, script: &str) -> Vec<Statement> {
        let script = if self.strip_comments == Some(true) {
            strip_comments(script)
        } else {
            script.to_string()
        };
        let pieces = if self.split_statements == Some(false) {
            split_script(&script, "")
        } else {
            split_script(
                &script,
                self.end_delimiter.as_deref().unwrap_or(DEFAULT_DELIMITER),
            )
        };
        pieces.into_iter().map(Statement::new).collect()
    }

    fn rollback(&self) -> Rollback {
        match self.rollback_sql {
            Some(ref sql) if !sql.trim().is_empty() => Rollback::Explicit,
            _ => Rollback::impossible("no 'rollback_sql' is declared"),
        }
    }

    fn rollback_statements(&self) -> Result<Vec<Statement>> {
        match self.rollback_sql {
            Some(ref sql) => Ok(self.statements(sql)),
            None => Err(ChangeError::rollback_impossible("no 'rollback_sql' is declared")),
        }
    }
}

// sql

#[derive(Debug, Default)]
pub(crate) struct RawSqlBuilder {
    sql: Option<String>,
    options: ScriptOptions,
}

impl RawSqlBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }
}

impl ChangeBuilder for RawSqlBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &SQL
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        if field == "sql" {
            self.sql = Some(fields::text(&SQL, field, value)?);
            return Ok(());
        }
        if self.options.set(&SQL, field, value)? {
            Ok(())
        } else {
            Err(fields::unknown_field(&SQL, field))
        }
    }

    fn setup(self: Box<Self>, _resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        let this = *self;
        this.options.check()?;
        Ok(Box::new(RawSql {
            sql: fields::require(this.sql, "sql")?,
            options: this.options,
        }))
    }
}

/// Runs inline SQL.
#[derive(Debug, Clone)]
pub struct RawSql {
    sql: String,
    options: ScriptOptions,
}

impl Change for RawSql {
    fn metadata(&self) -> &'static ChangeMetadata {
        &SQL
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        self.options
            .fields(FieldList::new().text("sql", &self.sql))
            .into_vec()
    }

    fn supports(&self, dialect: &dyn Dialect) -> bool {
        dialect.supports(SQL.kind) && self.options.admits(dialect)
    }

    fn build_statements(&self, _dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        Ok(self.options.statements(&self.sql))
    }

    fn rollback(&self) -> Rollback {
        self.options.rollback()
    }

    fn build_rollback_statements(&self, _dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        self.options.rollback_statements()
    }

    fn confirmation_message(&self) -> String {
        "Custom SQL executed".to_string()
    }
}

// sql-file

#[derive(Debug, Default)]
pub(crate) struct SqlFileBuilder {
    path: Option<String>,
    relative_to_changelog: Option<bool>,
    options: ScriptOptions,
}

impl SqlFileBuilder {
    pub(crate) fn boxed() -> Box<dyn ChangeBuilder> {
        Box::<Self>::default()
    }
}

impl ChangeBuilder for SqlFileBuilder {
    fn metadata(&self) -> &'static ChangeMetadata {
        &SQL_FILE
    }

    fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        match field {
            "path" => self.path = Some(fields::text(&SQL_FILE, field, value)?),
            "relative_to_changelog" => {
                self.relative_to_changelog = Some(fields::flag(&SQL_FILE, field, value)?);
            }
            _ => {
                if !self.options.set(&SQL_FILE, field, value)? {
                    return Err(fields::unknown_field(&SQL_FILE, field));
                }
            }
        }
        Ok(())
    }

    fn setup(self: Box<Self>, resources: &dyn ResourceResolver) -> Result<Box<dyn Change>> {
        let this = *self;
        this.options.check()?;
        let path = fields::require(this.path, "path")?;
        let content = resources
            .read_to_string(&path, this.relative_to_changelog == Some(true))
            .map_err(|e| ChangeError::setup(format!("cannot read '{path}': {e}")))?;
        if content.trim().is_empty() {
            return Err(ChangeError::setup(format!("'{path}' contains no SQL")));
        }
        debug!(path = %path, bytes = content.len(), "Read SQL file");
        Ok(Box::new(SqlFile {
            path,
            relative_to_changelog: this.relative_to_changelog,
            options: this.options,
            content,
        }))
    }
}

/// Runs SQL read from a file during setup.
#[derive(Debug, Clone)]
pub struct SqlFile {
    path: String,
    relative_to_changelog: Option<bool>,
    options: ScriptOptions,
    content: String,
}

impl Change for SqlFile {
    fn metadata(&self) -> &'static ChangeMetadata {
        &SQL_FILE
    }

    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        let list = FieldList::new()
            .text("path", &self.path)
            .opt_flag("relative_to_changelog", self.relative_to_changelog);
        self.options.fields(list).into_vec()
    }

    fn derived_fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![("content", FieldValue::from(self.content.as_str()))]
    }

    fn supports(&self, dialect: &dyn Dialect) -> bool {
        dialect.supports(SQL_FILE.kind) && self.options.admits(dialect)
    }

    fn build_statements(&self, _dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        Ok(self.options.statements(&self.content))
    }

    fn rollback(&self) -> Rollback {
        self.options.rollback()
    }

    fn build_rollback_statements(&self, _dialect: &dyn Dialect) -> Result<Vec<Statement>> {
        self.options.rollback_statements()
    }

    fn confirmation_message(&self) -> String {
        format!("SQL in file {} executed", self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::generate_statements;
    use crate::dialect::{MySqlDialect, PostgresDialect, SqliteDialect};
    use crate::resource::{FsResourceResolver, NoResources};
    use crate::rollback::generate_rollback_statements;

    fn raw(values: &[(&str, FieldValue)]) -> Result<Box<dyn Change>> {
        let mut builder = RawSqlBuilder::boxed();
        for (field, value) in values {
            builder.set(field, value.clone())?;
        }
        builder.setup(&NoResources)
    }

    #[test]
    fn test_sql_is_split() {
        let change = raw(&[("sql", "UPDATE a SET x = ';'; DELETE FROM b;".into())]).unwrap();
        assert_eq!(
            change.build_statements(&PostgresDialect::new()).unwrap(),
            vec![
                Statement::new("UPDATE a SET x = ';'"),
                Statement::new("DELETE FROM b"),
            ]
        );
    }

    #[test]
    fn test_sql_without_split() {
        let change = raw(&[
            ("sql", "SELECT 1; SELECT 2".into()),
            ("split_statements", "false".into()),
        ])
        .unwrap();
        assert_eq!(
            change.build_statements(&PostgresDialect::new()).unwrap(),
            vec![Statement::new("SELECT 1; SELECT 2")]
        );
    }

    #[test]
    fn test_sql_rollback() {
        let without = raw(&[("sql", "SELECT 1".into())]).unwrap();
        assert!(matches!(
            generate_rollback_statements(without.as_ref(), &PostgresDialect::new()),
            Err(ChangeError::RollbackImpossible { .. })
        ));

        let with = raw(&[
            ("sql", "CREATE VIEW v AS SELECT 1".into()),
            ("rollback_sql", "DROP VIEW v".into()),
        ])
        .unwrap();
        assert_eq!(
            generate_rollback_statements(with.as_ref(), &PostgresDialect::new()).unwrap(),
            vec![Statement::new("DROP VIEW v")]
        );
    }

    #[test]
    fn test_dbms_filter() {
        let only_pg = raw(&[("sql", "SELECT 1".into()), ("dbms", "postgres".into())]).unwrap();
        assert!(only_pg.supports(&PostgresDialect::new()));
        assert!(!only_pg.supports(&MySqlDialect::new()));
        assert!(matches!(
            generate_statements(only_pg.as_ref(), &MySqlDialect::new()),
            Err(ChangeError::Unsupported { .. })
        ));

        let not_sqlite = raw(&[("sql", "SELECT 1".into()), ("dbms", "!sqlite".into())]).unwrap();
        assert!(not_sqlite.supports(&MySqlDialect::new()));
        assert!(!not_sqlite.supports(&SqliteDialect::new()));

        assert!(raw(&[("sql", "SELECT 1".into()), ("dbms", "db2".into())]).is_err());
    }

    #[test]
    fn test_sql_file_reads_during_setup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seed.sql"), "-- seed\nINSERT INTO t VALUES (1);\n").unwrap();

        let mut builder = SqlFileBuilder::boxed();
        builder.set("path", "seed.sql".into()).unwrap();
        builder.set("strip_comments", true.into()).unwrap();
        let change = builder
            .setup(&FsResourceResolver::new(dir.path()))
            .unwrap();

        // Later edits to the file do not change the frozen change.
        std::fs::write(dir.path().join("seed.sql"), "DROP TABLE t;").unwrap();
        assert_eq!(
            change.build_statements(&SqliteDialect::new()).unwrap(),
            vec![Statement::new("INSERT INTO t VALUES (1)")]
        );
        assert_eq!(change.derived_fields().len(), 1);
    }

    #[test]
    fn test_sql_file_missing() {
        let mut builder = SqlFileBuilder::boxed();
        builder.set("path", "missing.sql".into()).unwrap();
        assert!(matches!(
            builder.setup(&NoResources),
            Err(ChangeError::Setup { .. })
        ));
    }
}
