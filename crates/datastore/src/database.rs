//! The database wraps a rusqlite connection and provides the ability to work with a schema.
use std::collections::HashMap;

use itertools::Itertools;
use log::*;

use crate::descriptor::{ColumnDefault, DatabaseDescriptor, TableDescriptor};
use crate::query::{Assignment, Query, SqlBuilder};
use crate::row_value::RowValue;
use crate::{Error, Result, Timestamp};

/// Prebuilt statements for one table.
struct TableStatements {
    insert: String,
    update: String,
    delete: String,
}

struct DatabaseState {
    /// Maps table name to its prebuilt statements.
    statements: HashMap<String, TableStatements>,

    descriptor: DatabaseDescriptor,
}

pub struct Database {
    conn: rusqlite::Connection,
    state: DatabaseState,
}

/// A transaction like that from rusqlite: drop rolls back, calling commit commits.
pub struct Transaction<'a> {
    state: &'a DatabaseState,
    transaction: rusqlite::Transaction<'a>,
}

/// SQL that we run as part of opening a connection.
///
/// - Enables foreign key enforcement (though we don't expect foreign keys to be used).
/// - Keeps temporary tables and indices in memory along with everything else.
const INITIAL_SQL: &str = r#"
PRAGMA foreign_keys = 1;
PRAGMA temp_store = MEMORY;
"#;

const CREATE_TEMPLATE: &str = r#"
CREATE TABLE IF NOT EXISTS {{ table }} (
{%- for c in columns %}
    {{ c.name }} {{ c.sql_type }}
    {%- if c.key %} CONSTRAINT {{ key_constraint }} PRIMARY KEY AUTOINCREMENT
    {%- elif not c.nullable %} NOT NULL{% endif %}
    {%- if not loop.last or has_constraints %},{% endif %}
{%- endfor %}
{%- for k in constraints %}
    CONSTRAINT {{ k.name }} {{ k.body }}{% if not loop.last %},{% endif %}
{%- endfor %}
)
"#;

const INSERT_TEMPLATE: &str = r#"
INSERT INTO {{ table }}(
    {{ columns | join(sep=", ") }}
) VALUES (
    {%- for c in columns -%}
    :{{ c }}{% if not loop.last %}, {% endif -%}
    {%- endfor -%}
)
"#;

/// Columns with a default keep what the store has when the incoming row doesn't say.
const UPDATE_TEMPLATE: &str = r#"
UPDATE {{ table }} SET
{%- for c in columns %}
    {{ c.name }} = {% if c.keep_stored %}COALESCE(:{{ c.name }}, {{ c.name }}){% else %}:{{ c.name }}{% endif %}
    {%- if not loop.last %},{% endif %}
{%- endfor %}
WHERE {{ key }} = :{{ key }}
"#;

#[derive(serde::Serialize)]
struct ColumnContext<'a> {
    name: &'a str,
    sql_type: &'static str,
    key: bool,
    nullable: bool,
    keep_stored: bool,
}

#[derive(serde::Serialize)]
struct ConstraintContext<'a> {
    name: &'a str,
    body: String,
}

fn column_contexts(table: &TableDescriptor) -> Vec<ColumnContext<'_>> {
    table
        .iter_columns()
        .map(|c| ColumnContext {
            name: c.get_name(),
            sql_type: c.get_column_type().sql_type(),
            key: c.get_name() == table.get_key_column(),
            nullable: c.is_nullable(),
            keep_stored: c.get_default() == Some(ColumnDefault::InsertTime),
        })
        .collect()
}

/// Build the DDL for a table: the table itself, followed by its indexes.
fn build_create_statements(table: &TableDescriptor) -> Result<Vec<String>> {
    let mut context = tera::Context::new();
    context.insert("table", table.get_name());
    context.insert("key_constraint", table.get_key_constraint());
    context.insert("columns", &column_contexts(table));
    let constraints = table
        .iter_constraints()
        .map(|k| ConstraintContext {
            name: k.get_name(),
            body: k.get_kind().sql_body(),
        })
        .collect::<Vec<_>>();
    context.insert("has_constraints", &!constraints.is_empty());
    context.insert("constraints", &constraints);

    let mut ret = vec![tera::Tera::one_off(CREATE_TEMPLATE, &context, false)?];
    for index in table.iter_indexes() {
        ret.push(format!(
            "CREATE INDEX IF NOT EXISTS {} ON {}({})",
            index.get_name(),
            table.get_name(),
            index.iter_columns().join(", ")
        ));
    }

    Ok(ret)
}

/// Build the insert, update, and delete statements for all tables in the database.
fn build_table_statements(
    descriptor: &DatabaseDescriptor,
) -> Result<HashMap<String, TableStatements>> {
    let mut ret: HashMap<String, TableStatements> = Default::default();

    for table in descriptor.iter_tables() {
        let key = table.get_key_column();

        let mut context = tera::Context::new();
        context.insert("table", table.get_name());
        context.insert("key", key);
        context.insert(
            "columns",
            &table
                .iter_columns()
                .map(|x| x.get_name())
                .collect::<Vec<_>>(),
        );
        let insert = tera::Tera::one_off(INSERT_TEMPLATE, &context, false)?;

        context.insert(
            "columns",
            &column_contexts(table)
                .into_iter()
                .filter(|c| !c.key)
                .collect::<Vec<_>>(),
        );
        let update = tera::Tera::one_off(UPDATE_TEMPLATE, &context, false)?;

        let delete = format!("DELETE FROM {} WHERE {} = ?", table.get_name(), key);

        debug!("Insert statement for {}: {}", table.get_name(), insert);
        debug!("Update statement for {}: {}", table.get_name(), update);
        ret.insert(
            table.get_name().to_string(),
            TableStatements {
                insert,
                update,
                delete,
            },
        );
    }

    Ok(ret)
}

/// Create every table and index in the descriptor.
fn create_schema(conn: &mut rusqlite::Connection, descriptor: &DatabaseDescriptor) -> Result<()> {
    let transaction = conn.transaction()?;

    for table in descriptor.iter_tables() {
        for statement in build_create_statements(table)? {
            debug!("Creating schema for {}: {}", table.get_name(), statement);
            transaction.execute_batch(&statement)?;
        }
    }

    transaction.commit()?;
    Ok(())
}

impl Database {
    /// Open a fresh in-memory database.  Everything in it goes away when it is dropped.
    pub fn open_in_memory(descriptor: DatabaseDescriptor) -> Result<Self> {
        info!(
            "Opening in-memory database with the following tables: {}",
            descriptor.iter_tables().map(|x| x.get_name()).join(", ")
        );
        let conn = rusqlite::Connection::open_in_memory()?;
        Database::with_connection(conn, descriptor)
    }

    /// Build a database from an already-existing connection.
    ///
    /// Tables and indexes which already exist are left alone.
    pub fn with_connection(
        mut conn: rusqlite::Connection,
        descriptor: DatabaseDescriptor,
    ) -> Result<Self> {
        let statements = build_table_statements(&descriptor)?;
        conn.execute_batch(INITIAL_SQL)?;
        create_schema(&mut conn, &descriptor)?;
        Ok(Database {
            state: DatabaseState {
                statements,
                descriptor,
            },
            conn,
        })
    }

    pub fn get_descriptor(&self) -> &DatabaseDescriptor {
        &self.state.descriptor
    }

    pub fn transaction(&mut self) -> Result<Transaction> {
        Ok(Transaction {
            state: &self.state,
            transaction: self.conn.transaction()?,
        })
    }
}

impl DatabaseState {
    fn get_table(&self, table: &str) -> Result<(&TableDescriptor, &TableStatements)> {
        let desc = self.descriptor.get_table(table)?;
        let statements = self
            .statements
            .get(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))?;
        Ok((desc, statements))
    }
}

impl<'a> Transaction<'a> {
    /// Insert rows, returning the key sqlite assigned to each, in order.
    ///
    /// Either all of the rows go in or none do: if one fails, e.g. because of a constraint, the ones before it are
    /// undone and the transaction is otherwise untouched.
    pub fn insert_rows<T: serde::Serialize>(&mut self, table: &str, values: &[T]) -> Result<Vec<i64>> {
        let (table_desc, statements) = self.state.get_table(table)?;
        let savepoint = self.transaction.savepoint()?;

        let keys = {
            let mut statement = savepoint.prepare_cached(&statements.insert)?;
            let mut keys = Vec::with_capacity(values.len());

            for v in values.iter() {
                // First, from the external value to a row value:
                let mut rv = RowValue::new(table_desc, v)?;
                rv.fill_insert_defaults(table_desc, Timestamp::now())?;
                // Then bind.
                rv.bind_params(&mut statement)?;
                // And then run it.
                statement.raw_execute()?;
                keys.push(savepoint.last_insert_rowid());
            }

            keys
        };

        savepoint.commit()?;
        debug!("Inserted {} rows into {}", keys.len(), table);
        Ok(keys)
    }

    /// Write rows back by their keys, returning how many rows changed.
    ///
    /// Like [Transaction::insert_rows], all or nothing.  Rows without a key are an error.
    pub fn update_rows<T: serde::Serialize>(&mut self, table: &str, values: &[T]) -> Result<usize> {
        let (table_desc, statements) = self.state.get_table(table)?;
        let savepoint = self.transaction.savepoint()?;

        let changed = {
            let mut statement = savepoint.prepare_cached(&statements.update)?;
            let mut changed = 0;

            for v in values.iter() {
                let rv = RowValue::new(table_desc, v)?;
                if rv.get_integer(table_desc.get_key_column()).is_none() {
                    return Err(Error::InvalidRow(format!(
                        "{}: can't update a row without a key",
                        table
                    )));
                }
                rv.bind_params(&mut statement)?;
                changed += statement.raw_execute()?;
            }

            changed
        };

        savepoint.commit()?;
        debug!("Updated {} rows in {}", changed, table);
        Ok(changed)
    }

    /// Delete rows by key, returning how many were there to delete.
    pub fn delete_rows(&mut self, table: &str, keys: &[i64]) -> Result<usize> {
        let (_, statements) = self.state.get_table(table)?;
        let mut statement = self.transaction.prepare_cached(&statements.delete)?;

        let mut deleted = 0;
        for k in keys.iter() {
            deleted += statement.execute(rusqlite::params![k])?;
        }

        debug!("Deleted {} rows from {}", deleted, table);
        Ok(deleted)
    }

    fn run_select(
        &self,
        query: &Query,
        columns: &[&str],
        mut callback: impl FnMut(RowValue) -> Result<()>,
    ) -> Result<()> {
        let (table_desc, _) = self.state.get_table(query.get_table())?;
        let column_descs = columns
            .iter()
            .map(|c| table_desc.get_column(c))
            .collect::<Result<Vec<_>>>()?;
        let SqlBuilder { sql, params } = query.render_select(table_desc, columns)?;
        debug!("Running {} with {:?}", sql, params);

        let mut statement = self.transaction.prepare_cached(&sql)?;
        let mut rows = statement.query(rusqlite::params_from_iter(params.iter()))?;
        while let Some(r) = rows.next()? {
            callback(RowValue::from_rusqlite_row(&column_descs, r)?)?;
        }

        Ok(())
    }

    /// Run a query, calling the user-specified function with each returned row.
    ///
    /// This function can fail in the middle, but will always pass valid objects to your callback.  So e.g. if you see
    /// 500 and then a failure, there might have been 2000.
    pub fn load<T: serde::de::DeserializeOwned>(
        &self,
        query: &Query,
        mut callback: impl FnMut(T) -> Result<()>,
    ) -> Result<()> {
        let (table_desc, _) = self.state.get_table(query.get_table())?;
        let columns = table_desc
            .iter_columns()
            .map(|x| x.get_name())
            .collect::<Vec<_>>();
        self.run_select(query, &columns, |rv| callback(rv.deserialize()?))
    }

    /// Run a query, collecting the rows.
    pub fn fetch_all<T: serde::de::DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>> {
        let mut ret = vec![];
        self.load(query, |x| {
            ret.push(x);
            Ok(())
        })?;
        Ok(ret)
    }

    /// Run a query, returning the first row if there is one.
    pub fn fetch_first<T: serde::de::DeserializeOwned>(&self, query: &Query) -> Result<Option<T>> {
        let limited = match query.get_limit() {
            Some(0) => query.clone(),
            _ => query.clone().limit(1),
        };
        Ok(self.fetch_all(&limited)?.into_iter().next())
    }

    /// Run a query selecting only some columns.
    ///
    /// With one column, each row deserializes as that column's value, e.g. `String` for a name.  With more, each row
    /// deserializes as a sequence, e.g. `(String, i64)`.
    pub fn project<T: serde::de::DeserializeOwned>(
        &self,
        query: &Query,
        columns: &[&str],
    ) -> Result<Vec<T>> {
        if columns.is_empty() {
            return Err(Error::InvalidRow("Projections need at least one column".into()));
        }

        let mut ret = vec![];
        self.run_select(query, columns, |rv| {
            ret.push(rv.deserialize_projection()?);
            Ok(())
        })?;
        Ok(ret)
    }

    /// Count the rows matching a query.  Sqlite does the counting.
    pub fn count(&self, query: &Query) -> Result<u64> {
        let (table_desc, _) = self.state.get_table(query.get_table())?;
        let SqlBuilder { sql, params } = query.render_count(table_desc)?;
        debug!("Running {} with {:?}", sql, params);

        let mut statement = self.transaction.prepare_cached(&sql)?;
        let count: i64 =
            statement.query_row(rusqlite::params_from_iter(params.iter()), |r| r.get(0))?;
        Ok(count as u64)
    }

    /// Apply assignments to every row matching the query, without loading them.  Returns how many rows matched.
    pub fn update_where(&mut self, query: &Query, assignments: &[Assignment]) -> Result<usize> {
        let (table_desc, _) = self.state.get_table(query.get_table())?;
        let SqlBuilder { sql, params } = query.render_update(table_desc, assignments)?;
        debug!("Running {} with {:?}", sql, params);
        Ok(self
            .transaction
            .execute(&sql, rusqlite::params_from_iter(params.iter()))?)
    }

    /// Delete every row matching the query, without loading them.  Returns how many rows were deleted.
    pub fn delete_where(&mut self, query: &Query) -> Result<usize> {
        let (table_desc, _) = self.state.get_table(query.get_table())?;
        let SqlBuilder { sql, params } = query.render_delete(table_desc)?;
        debug!("Running {} with {:?}", sql, params);
        Ok(self
            .transaction
            .execute(&sql, rusqlite::params_from_iter(params.iter()))?)
    }

    /// Truncate the specified table.
    ///
    /// Deletes all contents of the table.  Keys handed out before the truncation stay used.
    pub fn truncate_table(&self, table: &str) -> Result<()> {
        // Make sure it actually exists.
        let (table_desc, _) = self.state.get_table(table)?;
        self.transaction
            .execute(&format!("DELETE FROM {}", table_desc.get_name()), [])?;
        Ok(())
    }

    /// Delete the contents of all tables.  Primarily useful for testing.
    pub fn truncate_all_tables(&mut self) -> Result<()> {
        for table in self.state.descriptor.iter_tables() {
            self.transaction
                .execute(&format!("DELETE FROM {}", table.get_name()), [])?;
        }

        Ok(())
    }

    pub fn commit(self) -> Result<()> {
        Ok(self.transaction.commit()?)
    }

    pub fn rollback(self) -> Result<()> {
        Ok(self.transaction.rollback()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::{Assignment, DatabaseDescriptorBuilder, Direction, Expr, Predicate};

    /// Goes with the test schema, below.
    #[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct TestRow {
        id: Option<i64>,
        name: String,
        score: i64,
        created: Option<Timestamp>,
    }

    impl TestRow {
        fn new(name: &str, score: i64) -> TestRow {
            TestRow {
                id: None,
                name: name.into(),
                score,
                created: None,
            }
        }
    }

    /// Build a simple test schema: one table with a unique name and a bounded score.
    fn build_test_descriptor() -> Result<DatabaseDescriptor> {
        let mut desc_builder = DatabaseDescriptorBuilder::new();
        desc_builder.add_table("players".into(), |tb| {
            tb.add_key_column("id".into(), "players_pk".into())?;
            tb.add_string_column("name".into(), false)?;
            tb.add_integer_column("score".into(), false)?;
            tb.add_timestamp_column("created".into(), false)?;
            tb.set_insert_time_default("created")?;
            tb.add_unique_constraint("unique_player_name".into(), "name".into())?;
            tb.add_range_constraint("score_in_range".into(), "score".into(), 0, 100)?;
            tb.add_max_length_constraint("short_name".into(), "name".into(), 10)?;
            tb.add_index("players_by_score".into(), vec!["score".into()])?;
            Ok(())
        })?;
        desc_builder.build()
    }

    fn open() -> Database {
        Database::open_in_memory(build_test_descriptor().unwrap()).expect("Database should open")
    }

    fn players() -> Query {
        Query::table("players")
    }

    fn names(transaction: &Transaction, query: &Query) -> Vec<String> {
        transaction.project(query, &["name"]).unwrap()
    }

    #[test]
    fn opens() {
        open();
    }

    #[test]
    fn test_create_statement() {
        let desc = build_test_descriptor().unwrap();
        let stmts = build_create_statements(desc.get_table("players").unwrap()).unwrap();
        assert!(stmts[0].contains("id INTEGER CONSTRAINT players_pk PRIMARY KEY AUTOINCREMENT,"));
        assert!(stmts[0].contains("CONSTRAINT score_in_range CHECK (score BETWEEN 0 AND 100)"));
        assert_eq!(
            stmts[1],
            "CREATE INDEX IF NOT EXISTS players_by_score ON players(score)"
        );
    }

    #[test]
    fn test_insert_and_load() {
        let mut db = open();

        let mut transaction = db.transaction().unwrap();
        let keys = transaction
            .insert_rows("players", &[TestRow::new("a", 1), TestRow::new("b", 2)])
            .expect("Insert should succeed");
        transaction.commit().unwrap();
        assert_eq!(keys.len(), 2);
        assert_ne!(keys[0], keys[1]);

        let transaction = db.transaction().unwrap();
        let rows: Vec<TestRow> = transaction.fetch_all(&players()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, Some(keys[0]));
        assert_eq!(rows[0].name, "a");
        // The default got filled in.
        assert!(rows.iter().all(|x| x.created.is_some()));
        assert_eq!(transaction.count(&players()).unwrap(), 2);
    }

    #[test]
    fn test_constraints_fail_whole_batch() {
        let mut db = open();

        let mut transaction = db.transaction().unwrap();
        transaction
            .insert_rows("players", &[TestRow::new("a", 1)])
            .unwrap();

        for bad in [
            vec![TestRow::new("b", 2), TestRow::new("b", 3)],
            vec![TestRow::new("c", 2), TestRow::new("d", 101)],
            vec![TestRow::new("e", -1)],
            vec![TestRow::new("this name is too long", 1)],
        ] {
            let err = transaction.insert_rows("players", &bad).unwrap_err();
            assert!(err.is_constraint_violation(), "{:?}", err);
        }

        // Only the first row made it, and the transaction is still usable.
        assert_eq!(names(&transaction, &players()), vec!["a".to_string()]);
        transaction.commit().unwrap();
    }

    #[test]
    fn test_ordering_and_limits() {
        let mut db = open();
        let mut transaction = db.transaction().unwrap();
        transaction
            .insert_rows(
                "players",
                &[
                    TestRow::new("c", 5),
                    TestRow::new("a", 7),
                    TestRow::new("b", 5),
                ],
            )
            .unwrap();

        let by_score = players().order_by("score", Direction::Ascending);
        // Ties keep insertion order.
        assert_eq!(names(&transaction, &by_score), vec!["c", "b", "a"]);

        let by_name_desc = players().order_by("name", Direction::Descending);
        assert_eq!(names(&transaction, &by_name_desc), vec!["c", "b", "a"]);
        assert_eq!(names(&transaction, &by_name_desc.clone().limit(2)), vec!["c", "b"]);
        assert_eq!(transaction.count(&by_name_desc.clone().limit(2)).unwrap(), 2);

        let pairs: Vec<(String, i64)> = transaction
            .project(
                &players().order_by("score", Direction::Descending),
                &["name", "score"],
            )
            .unwrap();
        assert_eq!(
            pairs,
            vec![("a".into(), 7), ("c".into(), 5), ("b".into(), 5)]
        );

        let first: Option<TestRow> = transaction
            .fetch_first(&players().filter(Predicate::eq("score", 5)))
            .unwrap();
        assert_eq!(first.unwrap().name, "c");

        let none: Option<TestRow> = transaction
            .fetch_first(&players().filter(Predicate::eq("name", "zzz")))
            .unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_bulk_update_and_delete() {
        let mut db = open();
        let mut transaction = db.transaction().unwrap();
        transaction
            .insert_rows(
                "players",
                &[
                    TestRow::new("a", 1),
                    TestRow::new("b", 2),
                    TestRow::new("c", 100),
                ],
            )
            .unwrap();

        let changed = transaction
            .update_where(
                &players().filter(Predicate::lt("score", 100)),
                &[Assignment::new("score", Expr::column("score").add(10))],
            )
            .unwrap();
        assert_eq!(changed, 2);
        let scores: Vec<i64> = transaction.project(&players(), &["score"]).unwrap();
        assert_eq!(scores, vec![11, 12, 100]);

        // Pushing c past the range fails, and nothing changes.
        let err = transaction
            .update_where(
                &players(),
                &[Assignment::new("score", Expr::column("score").add(1))],
            )
            .unwrap_err();
        assert!(err.is_constraint_violation());
        let scores: Vec<i64> = transaction.project(&players(), &["score"]).unwrap();
        assert_eq!(scores, vec![11, 12, 100]);

        let deleted = transaction
            .delete_where(&players().filter(Predicate::like("name", "%b%")))
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(transaction.count(&players()).unwrap(), 2);

        // With a limit, only the first matching row goes.
        let deleted = transaction
            .delete_where(&players().order_by("score", Direction::Descending).limit(1))
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(names(&transaction, &players()), vec!["a"]);
    }

    #[test]
    fn test_update_rows_by_key() {
        let mut db = open();
        let mut transaction = db.transaction().unwrap();
        transaction
            .insert_rows("players", &[TestRow::new("a", 1), TestRow::new("b", 2)])
            .unwrap();

        let mut rows: Vec<TestRow> = transaction.fetch_all(&players()).unwrap();
        let created = rows[0].created;
        rows.iter_mut().for_each(|x| x.score += 1);
        // A null default column keeps what's stored.
        rows[0].created = None;
        assert_eq!(transaction.update_rows("players", &rows).unwrap(), 2);

        let reloaded: Vec<TestRow> = transaction.fetch_all(&players()).unwrap();
        assert_eq!(
            reloaded.iter().map(|x| x.score).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert_eq!(reloaded[0].created, created);

        // Rows need keys.
        assert!(transaction
            .update_rows("players", &[TestRow::new("c", 1)])
            .is_err());
    }

    #[test]
    fn test_keys_are_not_reused() {
        let mut db = open();
        let mut transaction = db.transaction().unwrap();
        let keys = transaction
            .insert_rows("players", &[TestRow::new("a", 1), TestRow::new("b", 2)])
            .unwrap();
        assert_eq!(transaction.delete_rows("players", &keys[1..]).unwrap(), 1);
        assert_eq!(transaction.delete_rows("players", &keys[1..]).unwrap(), 0);

        let again = transaction
            .insert_rows("players", &[TestRow::new("b", 2)])
            .unwrap();
        assert!(again[0] > keys[1]);
    }

    #[test]
    fn test_drop_rolls_back() {
        let mut db = open();
        {
            let mut transaction = db.transaction().unwrap();
            transaction
                .insert_rows("players", &[TestRow::new("a", 1)])
                .unwrap();
        }

        let mut transaction = db.transaction().unwrap();
        assert_eq!(transaction.count(&players()).unwrap(), 0);
        transaction
            .insert_rows("players", &[TestRow::new("a", 1)])
            .unwrap();
        transaction.rollback().unwrap();

        let mut transaction = db.transaction().unwrap();
        assert_eq!(transaction.count(&players()).unwrap(), 0);
        transaction
            .insert_rows("players", &[TestRow::new("a", 1)])
            .unwrap();
        transaction.truncate_all_tables().unwrap();
        assert_eq!(transaction.count(&players()).unwrap(), 0);
    }

    #[test]
    fn test_unknown_table() {
        let mut db = open();
        let mut transaction = db.transaction().unwrap();
        assert!(matches!(
            transaction.insert_rows("nope", &[TestRow::new("a", 1)]),
            Err(Error::UnknownTable(_))
        ));
        assert!(matches!(
            transaction.count(&Query::table("nope")),
            Err(Error::UnknownTable(_))
        ));
        assert!(transaction.truncate_table("nope").is_err());
    }
}
