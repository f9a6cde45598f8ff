//! Embedded SQLite store for target configuration.
use anyhow::Context;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use tokio::task;

use crate::matcher::Filter;
use crate::store::TargetStore;
use crate::target::{Column, Target};

/// One row per target:
///   targets(name TEXT PRIMARY KEY, filter TEXT, columns TEXT,
///           cursor INTEGER, matched INTEGER)
///
/// `filter` and `columns` are JSON; heights and counters are stored as
/// signed 64-bit integers.
pub struct SqliteTargetStore {
    path: PathBuf,
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS targets (
        name     TEXT PRIMARY KEY,
        filter   TEXT NOT NULL,
        columns  TEXT NOT NULL,
        cursor   INTEGER NOT NULL,
        matched  INTEGER NOT NULL
    );
"#;

impl SqliteTargetStore {
    /// Creates/initializes the SQLite file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let conn = Connection::open(&path)
            .with_context(|| format!("open sqlite at {}", path.display()))?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            "#,
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { path })
    }

    fn read(conn: &Connection, name: &str) -> anyhow::Result<Option<Target>> {
        let row = conn
            .query_row(
                "SELECT filter, columns, cursor, matched FROM targets WHERE name = ?1",
                params![name],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((filter, columns, cursor, matched)) = row else {
            return Ok(None);
        };
        let filter: Filter =
            serde_json::from_str(&filter).with_context(|| format!("parse filter of {name}"))?;
        let columns: Vec<Column> =
            serde_json::from_str(&columns).with_context(|| format!("parse columns of {name}"))?;
        Ok(Some(Target {
            name: name.to_string(),
            filter,
            cursor: u64::try_from(cursor).with_context(|| format!("cursor of {name}"))?,
            columns,
            matched: u64::try_from(matched).with_context(|| format!("counter of {name}"))?,
        }))
    }

    fn write(conn: &Connection, t: &Target) -> anyhow::Result<()> {
        let filter = serde_json::to_string(&t.filter)?;
        let columns = serde_json::to_string(&t.columns)?;
        conn.execute(
            "INSERT INTO targets(name, filter, columns, cursor, matched)
             VALUES(?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(name) DO UPDATE SET
                filter=excluded.filter,
                columns=excluded.columns,
                cursor=excluded.cursor,
                matched=excluded.matched",
            params![
                t.name,
                filter,
                columns,
                i64::try_from(t.cursor).context("cursor exceeds i64")?,
                i64::try_from(t.matched).context("counter exceeds i64")?,
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl TargetStore for SqliteTargetStore {
    async fn load_target(&self, name: &str) -> anyhow::Result<Option<Target>> {
        let path = self.path.clone();
        let name = name.to_string();
        task::spawn_blocking(move || {
            let conn = Connection::open(path)?;
            Self::read(&conn, &name)
        })
        .await?
    }

    async fn save_target(&self, target: &Target) -> anyhow::Result<()> {
        let path = self.path.clone();
        let target = target.clone();
        task::spawn_blocking(move || {
            let conn = Connection::open(path)?;
            Self::write(&conn, &target)
        })
        .await?
    }

    async fn remove_target(&self, name: &str) -> anyhow::Result<bool> {
        let path = self.path.clone();
        let name = name.to_string();
        task::spawn_blocking(move || {
            let conn = Connection::open(path)?;
            let n = conn.execute("DELETE FROM targets WHERE name = ?1", params![name])?;
            Ok(n > 0)
        })
        .await?
    }

    async fn target_names(&self) -> anyhow::Result<Vec<String>> {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let conn = Connection::open(path)?;
            let mut stmt = conn.prepare("SELECT name FROM targets ORDER BY name")?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(names)
        })
        .await?
    }
}
