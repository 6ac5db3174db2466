// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Physical slot identifiers and the cellar layout
//!
//! Slot ids are a fixed external contract: `R{row}C{col}` for cellar
//! positions (columns 1-9) and `F{n}` for fridge positions.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::wine::ColourFamily;
use crate::{CellariumError, Result};

/// Bottles per cellar row used for capacity accounting
pub const SLOTS_PER_ROW: u32 = 9;

static CELLAR_SLOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^R(\d+)C(\d+)$").unwrap());
static FRIDGE_SLOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^F(\d+)$").unwrap());

/// A single bottle position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotId {
    Cellar { row: u32, col: u32 },
    Fridge(u32),
}

impl SlotId {
    pub fn cellar(row: u32, col: u32) -> Self {
        SlotId::Cellar { row, col }
    }

    /// Row number for cellar slots
    pub fn row(&self) -> Option<u32> {
        match self {
            SlotId::Cellar { row, .. } => Some(*row),
            SlotId::Fridge(_) => None,
        }
    }

    pub fn col(&self) -> Option<u32> {
        match self {
            SlotId::Cellar { col, .. } => Some(*col),
            SlotId::Fridge(_) => None,
        }
    }

    pub fn is_cellar(&self) -> bool {
        matches!(self, SlotId::Cellar { .. })
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotId::Cellar { row, col } => write!(f, "R{}C{}", row, col),
            SlotId::Fridge(n) => write!(f, "F{}", n),
        }
    }
}

impl FromStr for SlotId {
    type Err = CellariumError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(caps) = CELLAR_SLOT.captures(s) {
            let row: u32 = caps[1].parse().map_err(|_| CellariumError::InvalidSlot(s.to_string()))?;
            let col: u32 = caps[2].parse().map_err(|_| CellariumError::InvalidSlot(s.to_string()))?;
            if row == 0 || col == 0 || col > SLOTS_PER_ROW {
                return Err(CellariumError::InvalidSlot(s.to_string()));
            }
            return Ok(SlotId::Cellar { row, col });
        }
        if let Some(caps) = FRIDGE_SLOT.captures(s) {
            let n: u32 = caps[1].parse().map_err(|_| CellariumError::InvalidSlot(s.to_string()))?;
            if n == 0 {
                return Err(CellariumError::InvalidSlot(s.to_string()));
            }
            return Ok(SlotId::Fridge(n));
        }
        Err(CellariumError::InvalidSlot(s.to_string()))
    }
}

impl Serialize for SlotId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Expand a location range such as `R10C1`..`R10C3` into individual slots.
///
/// Ranges spanning several cellar rows only yield their start slot.
pub fn expand_location_range(start: &str, end: Option<&str>) -> Result<Vec<SlotId>> {
    let first: SlotId = start.parse()?;
    let last: SlotId = match end.map(str::trim).filter(|e| !e.is_empty()) {
        Some(e) => e.parse()?,
        None => return Ok(vec![first]),
    };

    match (first, last) {
        (SlotId::Fridge(a), SlotId::Fridge(b)) if a <= b => Ok((a..=b).map(SlotId::Fridge).collect()),
        (SlotId::Cellar { row: r1, col: c1 }, SlotId::Cellar { row: r2, col: c2 }) if r1 == r2 && c1 <= c2 => {
            Ok((c1..=c2).map(|col| SlotId::cellar(r1, col)).collect())
        }
        _ => Ok(vec![first]),
    }
}

/// Physical shape of the cellar and fridge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CellarLayout {
    /// Number of cellar rows, numbered from 1
    pub rows: u32,
    /// Columns in a regular row
    pub columns_per_row: u32,
    /// Rows that are shorter than the regular width
    pub row_columns: BTreeMap<u32, u32>,
    /// Number of fridge positions
    pub fridge_slots: u32,
    /// Rows historically used for whites, rosés, sparkling and sweet wines
    pub white_rows: Vec<u32>,
    /// Rows historically used for reds and fortified wines
    pub red_rows: Vec<u32>,
}

impl Default for CellarLayout {
    fn default() -> Self {
        Self {
            rows: 19,
            columns_per_row: SLOTS_PER_ROW,
            row_columns: BTreeMap::from([(1, 7)]),
            fridge_slots: 9,
            white_rows: (1..=7).collect(),
            red_rows: (8..=19).collect(),
        }
    }
}

impl CellarLayout {
    /// A layout of `rows` full-width rows with no colour split
    pub fn uniform(rows: u32) -> Self {
        Self {
            rows,
            columns_per_row: SLOTS_PER_ROW,
            row_columns: BTreeMap::new(),
            fridge_slots: 0,
            white_rows: Vec::new(),
            red_rows: Vec::new(),
        }
    }

    /// Columns available in a row (0 for rows outside the cellar)
    pub fn columns_in(&self, row: u32) -> u32 {
        if row == 0 || row > self.rows {
            return 0;
        }
        self.row_columns
            .get(&row)
            .copied()
            .unwrap_or(self.columns_per_row)
            .min(SLOTS_PER_ROW)
    }

    /// All cellar row numbers in ascending order
    pub fn row_numbers(&self) -> impl Iterator<Item = u32> {
        1..=self.rows
    }

    /// Slots of one row, column 1 first
    pub fn slots_in_row(&self, row: u32) -> impl Iterator<Item = SlotId> {
        (1..=self.columns_in(row)).map(move |col| SlotId::cellar(row, col))
    }

    pub fn contains(&self, slot: &SlotId) -> bool {
        match slot {
            SlotId::Cellar { row, col } => *col >= 1 && *col <= self.columns_in(*row),
            SlotId::Fridge(n) => *n >= 1 && *n <= self.fridge_slots,
        }
    }

    /// Total physical slots across the given rows
    pub fn capacity_of(&self, rows: &[u32]) -> u32 {
        rows.iter().map(|r| self.columns_in(*r)).sum()
    }

    /// Rows historically used for a colour family
    pub fn rows_for_family(&self, family: ColourFamily) -> &[u32] {
        match family {
            ColourFamily::White => &self.white_rows,
            ColourFamily::Red => &self.red_rows,
        }
    }

    /// Check the layout is usable
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 {
            return Err(CellariumError::Config("layout must have at least one row".to_string()));
        }
        if self.columns_per_row == 0 || self.columns_per_row > SLOTS_PER_ROW {
            return Err(CellariumError::Config(format!(
                "columns_per_row must be between 1 and {}",
                SLOTS_PER_ROW
            )));
        }
        for row in self.white_rows.iter().chain(&self.red_rows) {
            if *row == 0 || *row > self.rows {
                return Err(CellariumError::Config(format!("colour row {} outside the cellar", row)));
            }
        }
        Ok(())
    }
}
