/*!
 * SQLite connection handling.
 *
 * One connection per database, shared behind a mutex. Async callers hop onto
 * the blocking pool so SQLite work never runs on a runtime worker.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction};

use super::schema;

/// File name of the cache database
const DATABASE_FILE: &str = "tovik.db";

/// Application directory under the platform data directory
const DATA_DIR: &str = "tovik";

/// Path reported for in-memory databases
const MEMORY_PATH: &str = ":memory:";

/// How long a write waits for a concurrent writer (another process) to finish
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle to an initialized database
#[derive(Clone)]
pub struct DatabaseConnection {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    /// Open the database in the platform data directory
    pub fn new_default() -> Result<Self> {
        Self::new(Self::default_database_path()?)
    }

    /// Open (creating if needed) the database file at `db_path`
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        info!("Opening translation cache at {:?}", db_path);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("Failed to set database busy timeout")?;

        Self::initialize(conn, db_path)
    }

    /// Open a private database that disappears with the process
    pub fn new_in_memory() -> Result<Self> {
        debug!("Opening in-memory database");
        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;
        Self::initialize(conn, PathBuf::from(MEMORY_PATH))
    }

    fn initialize(conn: Connection, db_path: PathBuf) -> Result<Self> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// `<data dir>/tovik/tovik.db`
    pub fn default_database_path() -> Result<PathBuf> {
        let base = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
            .ok_or_else(|| anyhow!("Could not determine a data directory for the cache"))?;

        Ok(base.join(DATA_DIR).join(DATABASE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path.as_os_str() == MEMORY_PATH
    }

    /// Run `f` on the connection from the calling thread
    pub fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connection.lock();
        f(&conn)
    }

    /// Run `f` on the connection from the blocking pool
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.run_blocking(move |conn| f(conn)).await
    }

    /// Run `f` inside one transaction from the blocking pool; any error rolls back
    pub async fn transaction_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.run_blocking(move |conn| {
            let tx = conn.transaction().context("Failed to begin transaction")?;
            let result = f(&tx)?;
            tx.commit().context("Failed to commit transaction")?;
            Ok(result)
        })
        .await
    }

    async fn run_blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = connection.lock();
            f(&mut conn)
        })
        .await
        .context("Database task panicked")?
    }

    /// Give freed pages back to the file system
    pub fn vacuum(&self) -> Result<()> {
        self.execute(|conn| conn.execute_batch("VACUUM").context("Failed to vacuum database"))
    }

    pub fn stats(&self) -> Result<DatabaseStats> {
        let (translation_count, language_count, profile_language) = self.execute(|conn| {
            let count = |table: &str| -> Result<i64> {
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                    .with_context(|| format!("Failed to count {}", table))
            };
            let profile = conn
                .query_row("SELECT language FROM profiles LIMIT 1", [], |row| row.get(0))
                .ok();
            Ok((count("translations")?, count("languages")?, profile))
        })?;

        let file_size_bytes = if self.is_in_memory() {
            0
        } else {
            std::fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(DatabaseStats {
            translation_count,
            language_count,
            profile_language,
            file_size_bytes,
        })
    }
}

/// What the store currently holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStats {
    pub translation_count: i64,
    pub language_count: i64,
    pub profile_language: Option<String>,
    pub file_size_bytes: u64,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Translations: {}, Languages: {}, Profile: {}, Size: {} KB",
            self.translation_count,
            self.language_count,
            self.profile_language.as_deref().unwrap_or("-"),
            self.file_size_bytes / 1024
        )
    }
}
