// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Zone-to-row allocation state
//!
//! A row is bound to at most one zone at a time. Reading a zone's rows and
//! binding its first one is a single `ensure_first_row` call, and growing a
//! zone is a single `allocate_row` call, so every store can make the
//! read-pick-write sequence atomic (a mutex here, a transaction under a lock
//! in SQLite). Rows with no free slot are never bound.

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{CellariumError, Result};

pub use sqlite::SqliteAllocationStore;

/// Rows currently bound to a zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneAllocation {
    pub zone_id: String,
    /// Rows in the order they were bound
    pub rows: Vec<u32>,
    pub wine_count: u32,
    pub first_wine_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ZoneAllocation {
    fn new(zone_id: &str, row: u32) -> Self {
        let now = Utc::now();
        Self {
            zone_id: zone_id.to_string(),
            rows: vec![row],
            wine_count: 1,
            first_wine_at: now,
            updated_at: now,
        }
    }

    /// Bound rows in ascending order
    pub fn sorted_rows(&self) -> Vec<u32> {
        let mut rows = self.rows.clone();
        rows.sort_unstable();
        rows
    }
}

/// Persistent zone-to-row bindings
#[async_trait]
pub trait ZoneAllocationStore: Send + Sync {
    /// Rows bound to a zone, ascending
    async fn rows_for_zone(&self, zone_id: &str) -> Result<Vec<u32>>;

    /// Rows bound to `zone_id`, binding a first one when it has none
    ///
    /// Returns the rows (ascending) and whether this call created the
    /// binding, which records the zone's first bottle. When every unbound row
    /// is in `full_rows` nothing is bound and the row list is empty. Fails
    /// with [`CellariumError::AllocationExhausted`] only when every row is
    /// already bound.
    async fn ensure_first_row(
        &self,
        zone_id: &str,
        preferred: &[u32],
        total_rows: u32,
        full_rows: &BTreeSet<u32>,
    ) -> Result<(Vec<u32>, bool)>;

    /// Bind one more row to `zone_id` and return it
    ///
    /// Rows from `preferred` are tried in order, then every row in
    /// `1..=total_rows`, skipping bound rows and `full_rows`. A zone with no
    /// binding yet gets one that records its first bottle. Fails with
    /// [`CellariumError::AllocationExhausted`] when no row qualifies.
    async fn allocate_row(
        &self,
        zone_id: &str,
        preferred: &[u32],
        total_rows: u32,
        full_rows: &BTreeSet<u32>,
    ) -> Result<u32>;

    /// Bottles recorded against a zone (0 when it has no binding)
    async fn wine_count(&self, zone_id: &str) -> Result<u32>;

    /// Add `delta` bottles to a zone's count, releasing its rows at zero
    async fn adjust_wine_count(&self, zone_id: &str, delta: i64) -> Result<u32>;

    /// Drop a zone's binding; returns whether one existed
    async fn release_zone(&self, zone_id: &str) -> Result<bool>;

    /// Every active binding keyed by zone id
    async fn active_allocations(&self) -> Result<BTreeMap<String, ZoneAllocation>>;
}

/// First row neither bound nor full: preferred rows first, then a full scan
pub fn pick_free_row(bound: &BTreeSet<u32>, full_rows: &BTreeSet<u32>, preferred: &[u32], total_rows: u32) -> Option<u32> {
    preferred
        .iter()
        .copied()
        .filter(|row| *row >= 1 && *row <= total_rows)
        .chain(1..=total_rows)
        .find(|row| !bound.contains(row) && !full_rows.contains(row))
}

pub(crate) fn has_unbound_row(bound: &BTreeSet<u32>, total_rows: u32) -> bool {
    (1..=total_rows).any(|row| !bound.contains(&row))
}

pub(crate) fn exhausted(zone_id: &str) -> CellariumError {
    CellariumError::AllocationExhausted {
        zone_id: zone_id.to_string(),
    }
}

/// Map each bound row to its zone
pub fn row_owners(allocations: &BTreeMap<String, ZoneAllocation>) -> BTreeMap<u32, String> {
    allocations
        .values()
        .flat_map(|a| a.rows.iter().map(move |row| (*row, a.zone_id.clone())))
        .collect()
}

pub(crate) fn apply_delta(count: u32, delta: i64) -> u32 {
    (count as i64 + delta).clamp(0, u32::MAX as i64) as u32
}

fn bound_rows(state: &BTreeMap<String, ZoneAllocation>) -> BTreeSet<u32> {
    state.values().flat_map(|a| a.rows.iter().copied()).collect()
}

/// Allocation state held in process memory
///
/// Used for tests and for dry-run planning over a snapshot of a real store.
#[derive(Debug, Default)]
pub struct InMemoryAllocationStore {
    state: Mutex<BTreeMap<String, ZoneAllocation>>,
}

impl InMemoryAllocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing set of bindings
    pub fn from_snapshot(allocations: BTreeMap<String, ZoneAllocation>) -> Self {
        Self {
            state: Mutex::new(allocations),
        }
    }
}

#[async_trait]
impl ZoneAllocationStore for InMemoryAllocationStore {
    async fn rows_for_zone(&self, zone_id: &str) -> Result<Vec<u32>> {
        let state = self.state.lock().await;
        Ok(state.get(zone_id).map(ZoneAllocation::sorted_rows).unwrap_or_default())
    }

    async fn ensure_first_row(
        &self,
        zone_id: &str,
        preferred: &[u32],
        total_rows: u32,
        full_rows: &BTreeSet<u32>,
    ) -> Result<(Vec<u32>, bool)> {
        let mut state = self.state.lock().await;
        if let Some(allocation) = state.get(zone_id).filter(|a| !a.rows.is_empty()) {
            return Ok((allocation.sorted_rows(), false));
        }

        let bound = bound_rows(&state);
        match pick_free_row(&bound, full_rows, preferred, total_rows) {
            Some(row) => {
                state.insert(zone_id.to_string(), ZoneAllocation::new(zone_id, row));
                info!("Allocated first row {} to zone {}", row, zone_id);
                Ok((vec![row], true))
            }
            None if has_unbound_row(&bound, total_rows) => {
                debug!("Every unbound row is full, zone {} left unbound", zone_id);
                Ok((Vec::new(), false))
            }
            None => Err(exhausted(zone_id)),
        }
    }

    async fn allocate_row(
        &self,
        zone_id: &str,
        preferred: &[u32],
        total_rows: u32,
        full_rows: &BTreeSet<u32>,
    ) -> Result<u32> {
        let mut state = self.state.lock().await;
        let bound = bound_rows(&state);
        let row = pick_free_row(&bound, full_rows, preferred, total_rows).ok_or_else(|| exhausted(zone_id))?;

        match state.get_mut(zone_id) {
            Some(allocation) => {
                allocation.rows.push(row);
                allocation.updated_at = Utc::now();
            }
            None => {
                state.insert(zone_id.to_string(), ZoneAllocation::new(zone_id, row));
            }
        }
        info!("Allocated row {} to zone {}", row, zone_id);
        Ok(row)
    }

    async fn wine_count(&self, zone_id: &str) -> Result<u32> {
        let state = self.state.lock().await;
        Ok(state.get(zone_id).map(|a| a.wine_count).unwrap_or(0))
    }

    async fn adjust_wine_count(&self, zone_id: &str, delta: i64) -> Result<u32> {
        let mut state = self.state.lock().await;
        let Some(allocation) = state.get_mut(zone_id) else {
            debug!("No allocation for zone {}, count not tracked", zone_id);
            return Ok(0);
        };
        allocation.wine_count = apply_delta(allocation.wine_count, delta);
        allocation.updated_at = Utc::now();
        let count = allocation.wine_count;
        if count == 0 {
            state.remove(zone_id);
            info!("Zone {} is empty, rows released", zone_id);
        }
        Ok(count)
    }

    async fn release_zone(&self, zone_id: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        Ok(state.remove(zone_id).is_some())
    }

    async fn active_allocations(&self) -> Result<BTreeMap<String, ZoneAllocation>> {
        Ok(self.state.lock().await.clone())
    }
}
