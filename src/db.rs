use crate::config::Config;
use crate::error::NotesError;
use crate::model;
use anyhow::Result;
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::future::Future;
use std::path::Path;
use tokio::sync::Mutex;

const SYSTEM_MIGRATIONS: &[(&str, &str)] =
    &[("system/000_migrations_table.sql", include_str!("migrations/system/000_migrations_table.sql"))];

const MIGRATIONS: &[(&str, &str)] = &[("001_notes.sql", include_str!("migrations/001_notes.sql"))];

/// Owns the store and the single connection every request goes through.
/// Access is serialized by `tx_lock`, so each operation sees a consistent
/// snapshot and never interleaves with another request's transaction.
pub struct Database {
    _db: LibsqlDatabase,
    conn: Connection,
    tx_lock: Mutex<()>,
}

impl Database {
    pub async fn new(cfg: &Config, data_dir: &Path) -> Result<Self> {
        let path = cfg.app.database_path(data_dir);
        tracing::info!(path = ?path, "[db] opening database");
        Self::open(&path).await
    }

    pub async fn in_memory() -> Result<Self> {
        Self::open(Path::new(":memory:")).await
    }

    pub async fn open(path: &Path) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;
        conn.execute_batch("PRAGMA foreign_keys = ON;").await?;

        Self::migrate(&conn).await?;

        Ok(Database {
            _db: db,
            conn,
            tx_lock: Mutex::new(()),
        })
    }

    async fn migrate(conn: &Connection) -> Result<()> {
        for (name, sql) in SYSTEM_MIGRATIONS {
            conn.execute_batch(sql)
                .await
                .map_err(|e| anyhow::anyhow!("failed to execute migration {name}: {e}"))?;
        }

        for (name, sql) in MIGRATIONS {
            Self::run_migration(conn, name, sql).await?;
        }

        Ok(())
    }

    async fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
        let mut rows = conn
            .query("SELECT 1 FROM _migrations WHERE name = ?", libsql::params![name])
            .await?;
        if rows.next().await?.is_some() {
            tracing::debug!("migration {} already applied, skipping", name);
            return Ok(());
        }

        tracing::info!("applying migration: {}", name);
        conn.execute_batch(sql)
            .await
            .map_err(|e| anyhow::anyhow!("failed to execute migration {name}: {e}"))?;

        let applied_at = model::format_timestamp(&model::now());
        conn.execute(
            "INSERT INTO _migrations (name, applied_at) VALUES (?, ?)",
            libsql::params![name, applied_at],
        )
        .await?;
        Ok(())
    }

    /// Runs `op` inside `BEGIN`/`COMMIT`. Any error rolls the whole operation back.
    pub async fn transaction<'a, T, F, Fut>(&'a self, op: F) -> Result<T, NotesError>
    where
        F: FnOnce(&'a Connection) -> Fut,
        Fut: Future<Output = Result<T, NotesError>>,
    {
        let _guard = self.tx_lock.lock().await;

        // A request dropped mid-transaction leaves it open on the shared connection.
        if !self.conn.is_autocommit() {
            tracing::warn!("[db] found an abandoned transaction, rolling it back");
            self.conn.execute("ROLLBACK", ()).await?;
        }

        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        let result = match op(&self.conn).await {
            Ok(value) => self.conn.execute("COMMIT", ()).await.map(|_| value).map_err(NotesError::from),
            Err(e) => Err(e),
        };

        if result.is_err() && !self.conn.is_autocommit() {
            if let Err(e) = self.conn.execute("ROLLBACK", ()).await {
                tracing::error!(error = %e, "[db] rollback failed");
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn count_rows(conn: &Connection, table: &str) -> Result<i64, NotesError> {
        let mut rows = conn.query(&format!("SELECT COUNT(*) FROM {table}"), ()).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Err(NotesError::Database(anyhow::anyhow!("COUNT returned no rows"))),
        }
    }

    async fn count(db: &Database, table: &str) -> i64 {
        db.transaction(|conn| count_rows(conn, table)).await.unwrap()
    }

    async fn insert_then_abort(conn: &Connection) -> Result<(), NotesError> {
        conn.execute(
            "INSERT INTO notes (content, created_at) VALUES ('draft', '2024-01-01T00:00:00Z')",
            (),
        )
        .await?;
        Err(NotesError::validation("abort"))
    }

    async fn insert_orphan_share(conn: &Connection) -> Result<u64, NotesError> {
        Ok(conn
            .execute(
                "INSERT INTO shared_notes (note_id, unique_token, created_at) \
                 VALUES (42, '00000000-0000-4000-8000-000000000000', '2024-01-01T00:00:00Z')",
                (),
            )
            .await?)
    }

    #[tokio::test]
    async fn applies_migrations_once() {
        let db = Database::in_memory().await.unwrap();
        assert_eq!(count(&db, "_migrations").await, 1);

        Database::migrate(&db.conn).await.unwrap();
        assert_eq!(count(&db, "_migrations").await, 1);
        assert_eq!(count(&db, "notes").await, 0);
    }

    #[tokio::test]
    async fn rolls_back_failed_transactions() {
        let db = Database::in_memory().await.unwrap();

        let result = db.transaction(insert_then_abort).await;

        assert!(matches!(result, Err(NotesError::Validation(_))));
        assert_eq!(count(&db, "notes").await, 0);
    }

    #[tokio::test]
    async fn enforces_share_foreign_key() {
        let db = Database::in_memory().await.unwrap();

        let result = db.transaction(insert_orphan_share).await;

        assert!(matches!(result, Err(NotesError::Database(_))));
        assert_eq!(count(&db, "shared_notes").await, 0);
    }
}
