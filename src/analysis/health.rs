// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Zone utilization, fragmentation and health

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::AnalysisConfig;
use crate::slots::{CellarLayout, SlotId};

/// Overall state of a zone's rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneHealth {
    Healthy,
    Crowded,
    Sparse,
    Fragmented,
}

impl fmt::Display for ZoneHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ZoneHealth::Healthy => "healthy",
            ZoneHealth::Crowded => "crowded",
            ZoneHealth::Sparse => "sparse",
            ZoneHealth::Fragmented => "fragmented",
        })
    }
}

/// Percentage of `capacity` taken by `count` bottles
pub fn utilization(count: usize, capacity: u32) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    count as f64 / capacity as f64 * 100.0
}

/// How scattered occupied slots are across `rows`, 0-100
///
/// Sums the empty columns between consecutive bottles (including the
/// wrap from the end of one row to the start of the next) and divides by
/// the number of empty slots in the rows. Contiguous packing scores 0.
pub fn fragmentation_score(occupied: &[SlotId], rows: &[u32], layout: &CellarLayout) -> f64 {
    let mut positions: Vec<(u32, u32)> = occupied
        .iter()
        .filter_map(|slot| match slot {
            SlotId::Cellar { row, col } if rows.contains(row) => Some((*row, *col)),
            _ => None,
        })
        .collect();
    positions.sort_unstable();
    positions.dedup();

    let capacity = layout.capacity_of(rows) as i64;
    let max_gaps = capacity - positions.len() as i64;
    if max_gaps <= 0 || positions.len() < 2 {
        return 0.0;
    }

    let gaps: i64 = positions
        .windows(2)
        .map(|pair| {
            let ((row_a, col_a), (row_b, col_b)) = (pair[0], pair[1]);
            if row_a == row_b {
                (col_b - col_a - 1) as i64
            } else {
                (layout.columns_in(row_a) as i64 - col_a as i64).max(0) + (col_b as i64 - 1)
            }
        })
        .sum();

    (gaps as f64 / max_gaps as f64 * 100.0).min(100.0)
}

/// Classify a zone from its utilization and fragmentation
pub fn classify_health(utilization: f64, bottle_count: usize, fragmentation: f64, config: &AnalysisConfig) -> ZoneHealth {
    if utilization > config.crowded_percent {
        ZoneHealth::Crowded
    } else if bottle_count > 0 && utilization < config.sparse_percent {
        ZoneHealth::Sparse
    } else if fragmentation > config.fragmentation_threshold {
        ZoneHealth::Fragmented
    } else {
        ZoneHealth::Healthy
    }
}
