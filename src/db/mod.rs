mod from_row;
mod schema;
pub mod queries;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::payments::StripeClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Contribution records, signatories, users and tokens.
    pub db: DbPool,
    /// Payment gateway client (shared HTTP connection pool).
    pub stripe: StripeClient,
    /// PDF export is refused at or above this many rows.
    pub pdf_max_rows: usize,
    /// Body limit for the multipart upload route.
    pub max_upload_bytes: usize,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path)
        .with_init(|conn| conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;"));
    Pool::builder().max_size(10).build(manager)
}
