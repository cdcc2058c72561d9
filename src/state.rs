use diesel::{
    SqliteConnection,
    connection::SimpleConnection,
    r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection},
};
use diesel_migrations::MigrationHarness;
use tokio::task::spawn_blocking;

use crate::{MIGRATIONS, brackets::BracketError};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Lets pooled connections queue behind each other's writes instead of
/// failing with `database is locked`.
#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error>
    for SqlitePragmas
{
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(
            "PRAGMA busy_timeout = 10000; \
             PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Builds the connection pool. An in-memory database only exists for as long
/// as its connection does, so it must be served by exactly one connection.
///
/// Writers take the database lock up front (`immediate_transaction`), so
/// concurrent mutations run one after another.
pub fn make_pool(db_url: &str) -> Result<DbPool, diesel::r2d2::PoolError> {
    Pool::builder()
        .max_size(if db_url == ":memory:" { 1 } else { 10 })
        .connection_customizer(Box::new(SqlitePragmas))
        .build(ConnectionManager::<SqliteConnection>::new(db_url))
}

pub fn run_migrations(pool: &DbPool) -> Result<(), BracketError> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| BracketError::Internal(format!("migrations failed: {e}")))?;
    Ok(())
}

/// Runs `f` with a pooled connection on the blocking thread pool.
///
/// **Important**: all diesel calls block, so request handlers must never call
/// into the store without going through this function.
pub async fn with_conn<T, F>(pool: DbPool, f: F) -> Result<T, BracketError>
where
    F: FnOnce(&mut DbConn) -> Result<T, BracketError> + Send + 'static,
    T: Send + 'static,
{
    spawn_blocking(move || {
        let mut conn = pool.get()?;
        f(&mut conn)
    })
    .await
    .map_err(|e| BracketError::Internal(format!("blocking task failed: {e}")))?
}
