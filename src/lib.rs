// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Cellarium: Wine Cellar Placement & Reorganization Engine
//!
//! Decides which zone and slot a bottle belongs in, tracks which cellar rows
//! are bound to which zone, audits the cellar for misplaced bottles and
//! plans the moves that put them right.

pub mod allocation;
pub mod analysis;
pub mod config;
pub mod error;
pub mod matcher;
pub mod placement;
pub mod planner;
pub mod slots;
pub mod wine;
pub mod zones;

pub use config::AppConfig;
pub use error::{CellariumError, Result};
