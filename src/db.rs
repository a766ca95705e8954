use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::config::Config;
use crate::error::{LensError, Result};
use crate::store::KeyValueStore;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Durable local store backed by SQLite
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database at the configured path
    pub fn open() -> Result<Self> {
        let db_path = Config::db_path()?;
        Self::open_at(&db_path)
    }

    /// Open or create the database at an explicit path
    pub fn open_at(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(db_path)?;
        embedded::migrations::runner().run(&mut conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        embedded::migrations::runner().run(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| LensError::HostError("database lock poisoned".into()))
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, serde_json::to_string(&value)?, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}
