use crate::error::ViharaError;
use crate::store::row::{Row, Value};
use crate::store::schema::SQLITE_INIT;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Executor, Pool, Sqlite, SqliteConnection};

pub type SqlitePool = Pool<Sqlite>;

const TX_FINISHED: &str = "transaction already completed";

/// Parameterized SQL execution facade. The sole path by which business code
/// touches persisted state: caller-supplied values are always bound, never
/// formatted into query text. Table and column names come from static call
/// sites and are validated as plain identifiers on top of that.
///
/// Cheap to clone; hand one to whoever needs it instead of reaching for a
/// process-wide instance.
#[derive(Clone)]
pub struct DataStore {
    pool: SqlitePool,
}

impl DataStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), ViharaError> {
        // execute multiple statements safely (SQLite supports multi-commands but sqlx::query doesn't)
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Execute a parameterized query and return the first row, or `None`
    /// when nothing matches. An empty result is not an error.
    pub async fn fetch_one(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<Row>, ViharaError> {
        fetch_one_with(&self.pool, sql, params).await
    }

    /// Execute a parameterized query and return all matching rows, possibly
    /// empty, never null.
    pub async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ViharaError> {
        fetch_all_with(&self.pool, sql, params).await
    }

    /// Build and execute a parameterized INSERT from the column/value pairs.
    /// Returns the generated rowid.
    pub async fn insert(&self, table: &str, row: &[(&str, Value)]) -> Result<i64, ViharaError> {
        insert_with(&self.pool, table, row).await
    }

    /// Build and execute a parameterized UPDATE. Both the SET values and the
    /// WHERE values are bound positionally. Returns the affected row count.
    pub async fn update(
        &self,
        table: &str,
        row: &[(&str, Value)],
        where_clause: &str,
        where_params: &[Value],
    ) -> Result<u64, ViharaError> {
        update_with(&self.pool, table, row, where_clause, where_params).await
    }

    /// Build and execute a parameterized DELETE. Returns the affected row count.
    pub async fn delete(
        &self,
        table: &str,
        where_clause: &str,
        where_params: &[Value],
    ) -> Result<u64, ViharaError> {
        delete_with(&self.pool, table, where_clause, where_params).await
    }

    /// Open a transaction scope. All writes that must keep two tables'
    /// invariants in sync go through the returned [`Tx`].
    pub async fn begin(&self) -> Result<Tx, ViharaError> {
        let inner = self.pool.begin().await?;
        Ok(Tx { inner: Some(inner) })
    }
}

/// An open transaction. Exposes the same operation surface as [`DataStore`]
/// so a compound write runs entirely inside the scope. Dropping an
/// unfinished `Tx` rolls back, so partial writes are never observable.
///
/// Nested scopes are not supported: a `Tx` has no `begin`. Finishing twice
/// (commit or rollback on a completed scope) is a programming error and
/// fails loudly with a transaction error.
pub struct Tx {
    inner: Option<sqlx::Transaction<'static, Sqlite>>,
}

impl Tx {
    fn conn(&mut self) -> Result<&mut SqliteConnection, ViharaError> {
        self.inner
            .as_deref_mut()
            .ok_or(ViharaError::Transaction(TX_FINISHED))
    }

    pub async fn fetch_one(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<Row>, ViharaError> {
        fetch_one_with(&mut *self.conn()?, sql, params).await
    }

    pub async fn fetch_all(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Row>, ViharaError> {
        fetch_all_with(&mut *self.conn()?, sql, params).await
    }

    pub async fn insert(&mut self, table: &str, row: &[(&str, Value)]) -> Result<i64, ViharaError> {
        insert_with(&mut *self.conn()?, table, row).await
    }

    pub async fn update(
        &mut self,
        table: &str,
        row: &[(&str, Value)],
        where_clause: &str,
        where_params: &[Value],
    ) -> Result<u64, ViharaError> {
        update_with(&mut *self.conn()?, table, row, where_clause, where_params).await
    }

    pub async fn delete(
        &mut self,
        table: &str,
        where_clause: &str,
        where_params: &[Value],
    ) -> Result<u64, ViharaError> {
        delete_with(&mut *self.conn()?, table, where_clause, where_params).await
    }

    pub async fn commit(&mut self) -> Result<(), ViharaError> {
        match self.inner.take() {
            Some(tx) => Ok(tx.commit().await?),
            None => Err(ViharaError::Transaction(TX_FINISHED)),
        }
    }

    pub async fn rollback(&mut self) -> Result<(), ViharaError> {
        match self.inner.take() {
            Some(tx) => Ok(tx.rollback().await?),
            None => Err(ViharaError::Transaction(TX_FINISHED)),
        }
    }
}

fn bind_value<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<i64>),
        Value::Integer(i) => query.bind(*i),
        Value::Real(r) => query.bind(*r),
        Value::Text(t) => query.bind(t.as_str()),
    }
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [Value],
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = bind_value(query, param);
    }
    query
}

/// Table and column names cannot be bound as parameters; they must come from
/// static call sites. Rejecting anything that is not a plain identifier
/// keeps a routing bug from ever widening into query-text injection.
fn check_identifier(name: &str) -> Result<(), ViharaError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ViharaError::Query(format!("invalid identifier: {name:?}")))
    }
}

fn insert_sql(table: &str, columns: &[&str]) -> Result<String, ViharaError> {
    check_identifier(table)?;
    if columns.is_empty() {
        return Err(ViharaError::Query(format!(
            "insert into {table} with no columns"
        )));
    }
    for column in columns {
        check_identifier(column)?;
    }
    let placeholders = vec!["?"; columns.len()].join(", ");
    Ok(format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        columns.join(", ")
    ))
}

fn update_sql(table: &str, columns: &[&str], where_clause: &str) -> Result<String, ViharaError> {
    check_identifier(table)?;
    if columns.is_empty() {
        return Err(ViharaError::Query(format!(
            "update {table} with no columns"
        )));
    }
    if where_clause.trim().is_empty() {
        return Err(ViharaError::Query(format!(
            "refusing to update {table} without a WHERE clause"
        )));
    }
    for column in columns {
        check_identifier(column)?;
    }
    let assignments = columns
        .iter()
        .map(|c| format!("{c} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("UPDATE {table} SET {assignments} WHERE {where_clause}"))
}

fn delete_sql(table: &str, where_clause: &str) -> Result<String, ViharaError> {
    check_identifier(table)?;
    if where_clause.trim().is_empty() {
        return Err(ViharaError::Query(format!(
            "refusing to delete from {table} without a WHERE clause"
        )));
    }
    Ok(format!("DELETE FROM {table} WHERE {where_clause}"))
}

async fn fetch_one_with<'c, E>(
    executor: E,
    sql: &str,
    params: &[Value],
) -> Result<Option<Row>, ViharaError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let row = bind_params(sqlx::query(sql), params)
        .fetch_optional(executor)
        .await?;
    match row {
        Some(r) => Ok(Some(Row::from_sqlite(&r)?)),
        None => Ok(None),
    }
}

async fn fetch_all_with<'c, E>(
    executor: E,
    sql: &str,
    params: &[Value],
) -> Result<Vec<Row>, ViharaError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let rows = bind_params(sqlx::query(sql), params)
        .fetch_all(executor)
        .await?;
    rows.iter()
        .map(|r| Row::from_sqlite(r).map_err(ViharaError::from))
        .collect()
}

async fn insert_with<'c, E>(
    executor: E,
    table: &str,
    row: &[(&str, Value)],
) -> Result<i64, ViharaError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let columns: Vec<&str> = row.iter().map(|(column, _)| *column).collect();
    let sql = insert_sql(table, &columns)?;
    let mut query = sqlx::query(&sql);
    for (_, value) in row {
        query = bind_value(query, value);
    }
    let result = query.execute(executor).await?;
    Ok(result.last_insert_rowid())
}

async fn update_with<'c, E>(
    executor: E,
    table: &str,
    row: &[(&str, Value)],
    where_clause: &str,
    where_params: &[Value],
) -> Result<u64, ViharaError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let columns: Vec<&str> = row.iter().map(|(column, _)| *column).collect();
    let sql = update_sql(table, &columns, where_clause)?;
    let mut query = sqlx::query(&sql);
    for (_, value) in row {
        query = bind_value(query, value);
    }
    query = bind_params(query, where_params);
    let result = query.execute(executor).await?;
    Ok(result.rows_affected())
}

async fn delete_with<'c, E>(
    executor: E,
    table: &str,
    where_clause: &str,
    where_params: &[Value],
) -> Result<u64, ViharaError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let sql = delete_sql(table, where_clause)?;
    let result = bind_params(sqlx::query(&sql), where_params)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_accept_plain_names() {
        assert!(check_identifier("monks").is_ok());
        assert!(check_identifier("room_id").is_ok());
        assert!(check_identifier("_hidden").is_ok());
    }

    #[test]
    fn identifiers_reject_metacharacters() {
        assert!(check_identifier("").is_err());
        assert!(check_identifier("monks; DROP TABLE x").is_err());
        assert!(check_identifier("full name").is_err());
        assert!(check_identifier("1starts_with_digit").is_err());
    }

    #[test]
    fn insert_sql_shape() {
        let sql = insert_sql("monks", &["full_name", "room_id"]).unwrap();
        assert_eq!(sql, "INSERT INTO monks (full_name, room_id) VALUES (?, ?)");
    }

    #[test]
    fn update_requires_where_clause() {
        assert!(update_sql("rooms", &["capacity"], "  ").is_err());
        let sql = update_sql("rooms", &["capacity"], "id = ?").unwrap();
        assert_eq!(sql, "UPDATE rooms SET capacity = ? WHERE id = ?");
    }

    #[test]
    fn empty_row_is_rejected() {
        assert!(insert_sql("monks", &[]).is_err());
        assert!(update_sql("monks", &[], "id = ?").is_err());
    }
}
