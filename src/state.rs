use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Built once at startup and handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
}
