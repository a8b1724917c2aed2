/*!
 * Database schema and migrations.
 *
 * Migrations are applied in order; the applied version lives in SQLite's
 * `user_version` pragma.
 */

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use rusqlite::Connection;

/// Ordered migrations, each bringing the schema to its version
const MIGRATIONS: &[(i32, &str)] = &[(
    1,
    r#"
    CREATE TABLE IF NOT EXISTS translations (
        id TEXT PRIMARY KEY,
        domain TEXT NOT NULL,
        path TEXT NOT NULL,
        language_id TEXT NOT NULL,
        text TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_translations_language ON translations(language_id);

    CREATE TABLE IF NOT EXISTS languages (
        id TEXT PRIMARY KEY,
        native_name TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS profiles (
        id TEXT PRIMARY KEY,
        language TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
)];

/// Version the code expects after all migrations ran
pub fn latest_version() -> i32 {
    MIGRATIONS.last().map(|(version, _)| *version).unwrap_or(0)
}

/// Bring the schema up to [`latest_version`]
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    // WAL is a no-op for in-memory databases
    conn.execute_batch("PRAGMA journal_mode=WAL;")
        .context("Failed to enable WAL journal")?;

    let current = schema_version(conn)?;
    let latest = latest_version();
    if current > latest {
        return Err(anyhow!(
            "Database schema v{} is newer than supported v{}",
            current,
            latest
        ));
    }
    if current == latest {
        debug!("Database schema is up to date (v{})", current);
        return Ok(());
    }

    for (version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        info!("Applying database migration v{}", version);
        conn.execute_batch(&format!("BEGIN;\n{}\nPRAGMA user_version = {};\nCOMMIT;", sql, version))
            .with_context(|| format!("Failed to apply migration v{}", version))?;
    }

    Ok(())
}

fn schema_version(conn: &Connection) -> Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .context("Failed to read schema version")
}
