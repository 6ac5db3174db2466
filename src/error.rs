// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for Cellarium

use thiserror::Error;

/// Result type alias for Cellarium operations
pub type Result<T> = std::result::Result<T, CellariumError>;

/// Cellarium error types
///
/// Only hard failures live here. A wine that matches no zone, or a zone whose
/// overflow chain is full, is reported through the normal return values.
#[derive(Error, Debug)]
pub enum CellariumError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown zone: {0}")]
    UnknownZone(String),

    #[error("Invalid slot id: {0}")]
    InvalidSlot(String),

    #[error("No free rows left to allocate to zone '{zone_id}'")]
    AllocationExhausted { zone_id: String },

    #[error("Allocation store error: {0}")]
    Store(String),
}
