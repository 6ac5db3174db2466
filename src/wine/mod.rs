// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Wine records as stored in the inventory, and their normalized form

pub mod normalize;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::slots::SlotId;

pub use normalize::normalize;

/// Inventory identifier of a wine
pub type WineId = i64;

/// Wine colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colour {
    Red,
    White,
    Rose,
    Sparkling,
    Fortified,
    Dessert,
}

impl Colour {
    pub fn as_str(&self) -> &'static str {
        match self {
            Colour::Red => "red",
            Colour::White => "white",
            Colour::Rose => "rose",
            Colour::Sparkling => "sparkling",
            Colour::Fortified => "fortified",
            Colour::Dessert => "dessert",
        }
    }

    /// Physical grouping used when catch-all storage keeps like with like
    pub fn family(&self) -> ColourFamily {
        match self {
            Colour::Red | Colour::Fortified => ColourFamily::Red,
            Colour::White | Colour::Rose | Colour::Sparkling | Colour::Dessert => ColourFamily::White,
        }
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse colour grouping of cellar rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColourFamily {
    Red,
    White,
}

/// A wine record in the shape the inventory stores it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawWine {
    pub id: WineId,
    pub name: String,
    #[serde(default)]
    pub vintage: Option<i32>,
    #[serde(default)]
    pub colour: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    /// Free-text grape list, e.g. "Shiraz 85%, Viognier 15%"
    #[serde(default)]
    pub grapes: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub appellation: Option<String>,
    #[serde(default)]
    pub winemaking: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Zone the wine has been tagged with, if any
    #[serde(default)]
    pub zone_id: Option<String>,
    /// Current physical position
    #[serde(default)]
    pub slot: Option<SlotId>,
}

/// A grape with its declared share of the blend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrapeShare {
    pub grape: String,
    pub percent: Option<f64>,
}

/// Canonical attribute snapshot used for zone scoring
///
/// Text attributes are lowercased and accent-folded so that comparisons
/// against zone rules are plain string equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wine {
    pub id: WineId,
    pub name: String,
    pub vintage: Option<i32>,
    pub colour: Option<Colour>,
    /// Grapes, highest declared percentage first
    pub grapes: Vec<String>,
    pub grape_shares: Vec<GrapeShare>,
    pub winemaking: Vec<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub appellation: Option<String>,
    /// Folded free text searched by keyword rules
    pub search_text: String,
}

impl Wine {
    pub fn dominant_grape(&self) -> Option<&str> {
        self.grapes.first().map(String::as_str)
    }

    /// Declared percentage of the dominant grape, when known
    pub fn dominant_percent(&self) -> Option<f64> {
        self.grape_shares.first().and_then(|s| s.percent)
    }

    pub fn colour_family(&self) -> Option<ColourFamily> {
        self.colour.map(|c| c.family())
    }

    pub fn has_grape(&self, grape: &str) -> bool {
        self.grapes.iter().any(|g| g == grape)
    }

    pub fn has_winemaking(&self, tag: &str) -> bool {
        self.winemaking.iter().any(|t| t == tag)
    }

    /// Whether a folded keyword occurs in the wine's text as whole words
    pub fn mentions(&self, keyword: &str) -> bool {
        if keyword.is_empty() {
            return false;
        }
        let text = self.search_text.as_str();
        text.match_indices(keyword).any(|(start, _)| {
            let before = text[..start].chars().next_back();
            let after = text[start + keyword.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
    }
}
