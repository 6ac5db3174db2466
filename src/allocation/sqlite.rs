// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! SQLite-backed allocation store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::{apply_delta, exhausted, has_unbound_row, pick_free_row, ZoneAllocation, ZoneAllocationStore};
use crate::{CellariumError, Result};

/// Allocation store persisted in SQLite (thread-safe wrapper)
///
/// `zone_rows.row_num` is the primary key, so a row can never be bound twice
/// even if two processes share the file.
#[derive(Clone)]
pub struct SqliteAllocationStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAllocationStore {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize()?;
        Ok(store)
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CellariumError::Store("Database lock poisoned".to_string()))
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS zone_allocations (
                zone_id TEXT PRIMARY KEY,
                wine_count INTEGER NOT NULL DEFAULT 0,
                first_wine_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS zone_rows (
                row_num INTEGER PRIMARY KEY,
                zone_id TEXT NOT NULL,
                position INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_zone_rows_zone ON zone_rows(zone_id);
        "#)?;
        Ok(())
    }

    /// Reclaim space after many releases
    pub fn vacuum(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("VACUUM", [])?;
        Ok(())
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn zone_rows(conn: &Connection, zone_id: &str) -> Result<Vec<u32>> {
    let mut stmt = conn.prepare("SELECT row_num FROM zone_rows WHERE zone_id = ?1 ORDER BY row_num")?;
    let rows = stmt
        .query_map(params![zone_id], |row| row.get::<_, u32>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn bound_rows(conn: &Connection) -> Result<BTreeSet<u32>> {
    let mut stmt = conn.prepare("SELECT row_num FROM zone_rows")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, u32>(0))?
        .collect::<std::result::Result<BTreeSet<_>, _>>()?;
    Ok(rows)
}

/// Record `row` against `zone_id`, creating the zone's binding with its first bottle
fn bind_row(tx: &Transaction<'_>, zone_id: &str, row: u32) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    tx.execute(
        r#"INSERT INTO zone_allocations (zone_id, wine_count, first_wine_at, updated_at)
           VALUES (?1, 1, ?2, ?2)
           ON CONFLICT(zone_id) DO UPDATE SET updated_at = excluded.updated_at"#,
        params![zone_id, now],
    )?;
    tx.execute(
        r#"INSERT INTO zone_rows (row_num, zone_id, position)
           VALUES (?1, ?2, (SELECT COALESCE(MAX(position), 0) + 1 FROM zone_rows WHERE zone_id = ?2))"#,
        params![row, zone_id],
    )?;
    Ok(())
}

#[async_trait]
impl ZoneAllocationStore for SqliteAllocationStore {
    async fn rows_for_zone(&self, zone_id: &str) -> Result<Vec<u32>> {
        let conn = self.lock_conn()?;
        zone_rows(&conn, zone_id)
    }

    async fn ensure_first_row(
        &self,
        zone_id: &str,
        preferred: &[u32],
        total_rows: u32,
        full_rows: &BTreeSet<u32>,
    ) -> Result<(Vec<u32>, bool)> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let existing = zone_rows(&tx, zone_id)?;
        if !existing.is_empty() {
            return Ok((existing, false));
        }

        let bound = bound_rows(&tx)?;
        let Some(row) = pick_free_row(&bound, full_rows, preferred, total_rows) else {
            if has_unbound_row(&bound, total_rows) {
                debug!("Every unbound row is full, zone {} left unbound", zone_id);
                return Ok((Vec::new(), false));
            }
            return Err(exhausted(zone_id));
        };
        bind_row(&tx, zone_id, row)?;
        tx.commit()?;

        info!("Allocated first row {} to zone {}", row, zone_id);
        Ok((vec![row], true))
    }

    async fn allocate_row(
        &self,
        zone_id: &str,
        preferred: &[u32],
        total_rows: u32,
        full_rows: &BTreeSet<u32>,
    ) -> Result<u32> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let bound = bound_rows(&tx)?;
        let row = pick_free_row(&bound, full_rows, preferred, total_rows).ok_or_else(|| exhausted(zone_id))?;
        bind_row(&tx, zone_id, row)?;
        tx.commit()?;

        info!("Allocated row {} to zone {}", row, zone_id);
        Ok(row)
    }

    async fn wine_count(&self, zone_id: &str) -> Result<u32> {
        let conn = self.lock_conn()?;
        let count = conn
            .query_row(
                "SELECT wine_count FROM zone_allocations WHERE zone_id = ?1",
                params![zone_id],
                |row| row.get::<_, u32>(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0))
    }

    async fn adjust_wine_count(&self, zone_id: &str, delta: i64) -> Result<u32> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let current = tx
            .query_row(
                "SELECT wine_count FROM zone_allocations WHERE zone_id = ?1",
                params![zone_id],
                |row| row.get::<_, u32>(0),
            )
            .optional()?;
        let Some(current) = current else {
            debug!("No allocation for zone {}, count not tracked", zone_id);
            return Ok(0);
        };

        let count = apply_delta(current, delta);
        if count == 0 {
            tx.execute("DELETE FROM zone_rows WHERE zone_id = ?1", params![zone_id])?;
            tx.execute("DELETE FROM zone_allocations WHERE zone_id = ?1", params![zone_id])?;
            info!("Zone {} is empty, rows released", zone_id);
        } else {
            tx.execute(
                "UPDATE zone_allocations SET wine_count = ?2, updated_at = ?3 WHERE zone_id = ?1",
                params![zone_id, count, Utc::now().to_rfc3339()],
            )?;
        }
        tx.commit()?;
        Ok(count)
    }

    async fn release_zone(&self, zone_id: &str) -> Result<bool> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM zone_rows WHERE zone_id = ?1", params![zone_id])?;
        let deleted = tx.execute("DELETE FROM zone_allocations WHERE zone_id = ?1", params![zone_id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    async fn active_allocations(&self) -> Result<BTreeMap<String, ZoneAllocation>> {
        let conn = self.lock_conn()?;

        let mut allocations = BTreeMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT zone_id, wine_count, first_wine_at, updated_at FROM zone_allocations",
            )?;
            let rows = stmt.query_map([], |row| {
                let first: String = row.get(2)?;
                let updated: String = row.get(3)?;
                Ok(ZoneAllocation {
                    zone_id: row.get(0)?,
                    rows: Vec::new(),
                    wine_count: row.get(1)?,
                    first_wine_at: parse_timestamp(&first),
                    updated_at: parse_timestamp(&updated),
                })
            })?;
            for allocation in rows {
                let allocation = allocation?;
                allocations.insert(allocation.zone_id.clone(), allocation);
            }
        }

        let mut stmt = conn.prepare("SELECT zone_id, row_num FROM zone_rows ORDER BY zone_id, position")?;
        let bindings = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)))?;
        for binding in bindings {
            let (zone_id, row) = binding?;
            if let Some(allocation) = allocations.get_mut(&zone_id) {
                allocation.rows.push(row);
            }
        }

        Ok(allocations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allocate_and_read_back() {
        let store = SqliteAllocationStore::in_memory().unwrap();
        assert_eq!(store.allocate_row("chardonnay", &[5, 6], 19, &BTreeSet::new()).await.unwrap(), 5);
        assert_eq!(store.allocate_row("chardonnay", &[5, 6], 19, &BTreeSet::new()).await.unwrap(), 6);
        assert_eq!(store.allocate_row("sparkling", &[5, 6], 19, &BTreeSet::new()).await.unwrap(), 1);

        assert_eq!(store.rows_for_zone("chardonnay").await.unwrap(), vec![5, 6]);
        assert_eq!(store.wine_count("chardonnay").await.unwrap(), 1);

        let active = store.active_allocations().await.unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active["chardonnay"].rows, vec![5, 6]);
    }

    #[tokio::test]
    async fn test_exhaustion_leaves_state_untouched() {
        let store = SqliteAllocationStore::in_memory().unwrap();
        store.allocate_row("a", &[], 1, &BTreeSet::new()).await.unwrap();
        let err = store.allocate_row("b", &[], 1, &BTreeSet::new()).await.unwrap_err();
        assert!(matches!(err, CellariumError::AllocationExhausted { .. }));
        assert!(store.rows_for_zone("b").await.unwrap().is_empty());
        assert_eq!(store.wine_count("b").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_count_reaching_zero_releases_rows() {
        let store = SqliteAllocationStore::in_memory().unwrap();
        store.allocate_row("zone", &[4], 19, &BTreeSet::new()).await.unwrap();
        assert_eq!(store.adjust_wine_count("zone", 1).await.unwrap(), 2);
        assert_eq!(store.adjust_wine_count("zone", -5).await.unwrap(), 0);
        assert!(store.active_allocations().await.unwrap().is_empty());
        assert_eq!(store.allocate_row("other", &[4], 19, &BTreeSet::new()).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_ensure_first_row_is_idempotent() {
        let store = SqliteAllocationStore::in_memory().unwrap();
        let none = BTreeSet::new();
        assert_eq!(store.ensure_first_row("douro", &[10], 19, &none).await.unwrap(), (vec![10], true));
        assert_eq!(store.ensure_first_row("douro", &[10], 19, &none).await.unwrap(), (vec![10], false));
        assert_eq!(store.wine_count("douro").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_full_rows_are_never_bound() {
        let store = SqliteAllocationStore::in_memory().unwrap();
        let full = BTreeSet::from([1, 2]);
        let (rows, created) = store.ensure_first_row("rioja", &[1], 2, &full).await.unwrap();
        assert!(rows.is_empty());
        assert!(!created);
        assert!(store.active_allocations().await.unwrap().is_empty());

        assert_eq!(store.allocate_row("rioja", &[1], 3, &full).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_release_zone() {
        let store = SqliteAllocationStore::in_memory().unwrap();
        store.allocate_row("zone", &[], 19, &BTreeSet::new()).await.unwrap();
        assert!(store.release_zone("zone").await.unwrap());
        assert!(!store.release_zone("zone").await.unwrap());
    }

    #[tokio::test]
    async fn test_bindings_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cellar.db");
        {
            let store = SqliteAllocationStore::open(&path).unwrap();
            store.allocate_row("portugal", &[10], 19, &BTreeSet::new()).await.unwrap();
            store.adjust_wine_count("portugal", 2).await.unwrap();
        }
        let store = SqliteAllocationStore::open(&path).unwrap();
        assert_eq!(store.rows_for_zone("portugal").await.unwrap(), vec![10]);
        assert_eq!(store.wine_count("portugal").await.unwrap(), 3);
    }
}
