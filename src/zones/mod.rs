// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Storage zones and the read-only zone registry
//!
//! Zones are static configuration: loaded once (from JSON or the built-in
//! catalogue), normalized, validated and then only ever read.

mod catalogue;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::wine::normalize::{canonical_country, canonical_grape, fold};
use crate::wine::{Colour, ColourFamily};
use crate::{CellariumError, Result};

pub use catalogue::default_zones;

/// Id of the catch-all zone returned when nothing matches
///
/// Only used when the registry has no fallback zone. A registry whose
/// fallback zone has another id gets that id back from the matcher, so
/// unmatched wines can be placed into it.
pub const UNCLASSIFIED_ZONE_ID: &str = "unclassified";

/// Id of the zone for unusual, low-confidence wines
pub const CURIOSITIES_ZONE_ID: &str = "curiosities";

/// How a zone takes part in slot search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    /// Owns dedicated rows, allocated on demand
    #[default]
    Standard,
    /// Fills gaps in a shared row range, never owns rows
    Buffer,
    /// Last resort, searched across the whole cellar
    Fallback,
    /// Curiosities: searched cellar-wide, requires a minimum match score
    Curated,
}

impl ZoneKind {
    /// Kinds that never receive dedicated row bindings
    pub fn is_shared(&self) -> bool {
        !matches!(self, ZoneKind::Standard)
    }
}

/// Matching rules of a zone; every list is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneRules {
    pub colours: Vec<Colour>,
    pub grapes: Vec<String>,
    pub keywords: Vec<String>,
    pub countries: Vec<String>,
    pub regions: Vec<String>,
    pub appellations: Vec<String>,
    pub winemaking: Vec<String>,
    pub exclude_keywords: Vec<String>,
    pub exclude_regions: Vec<String>,
    pub exclude_winemaking: Vec<String>,
    /// Dominant grape must reach this share when it is one of the zone's grapes
    pub min_grape_percent: Option<f64>,
    /// Wine must declare at least this many varietals
    pub min_grape_count: Option<usize>,
}

impl ZoneRules {
    fn normalized(mut self) -> Self {
        let fold_all = |values: &mut Vec<String>| {
            *values = values.iter().map(|v| fold(v)).filter(|v| !v.is_empty()).collect();
        };
        self.grapes = self.grapes.iter().map(|g| canonical_grape(g)).collect();
        self.countries = self.countries.iter().map(|c| canonical_country(c)).collect();
        fold_all(&mut self.keywords);
        fold_all(&mut self.regions);
        fold_all(&mut self.appellations);
        fold_all(&mut self.winemaking);
        fold_all(&mut self.exclude_keywords);
        fold_all(&mut self.exclude_regions);
        fold_all(&mut self.exclude_winemaking);
        self.colours.sort();
        self.colours.dedup();
        self
    }
}

/// A logical storage category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: ZoneKind,
    #[serde(default)]
    pub rules: ZoneRules,
    /// Rows this zone prefers, in order of preference
    #[serde(default)]
    pub preferred_rows: Vec<u32>,
    /// Next zone to try when this one is full
    #[serde(default)]
    pub overflow_zone_id: Option<String>,
}

impl Zone {
    pub fn colours(&self) -> &[Colour] {
        &self.rules.colours
    }

    /// Colour families covered by the zone's declared colours
    pub fn colour_families(&self) -> BTreeSet<ColourFamily> {
        self.rules.colours.iter().map(|c| c.family()).collect()
    }

    /// Concrete criteria tokens shared zones can be compared on
    pub fn criterion_tokens(&self) -> BTreeSet<&str> {
        let r = &self.rules;
        r.grapes
            .iter()
            .chain(&r.countries)
            .chain(&r.regions)
            .chain(&r.appellations)
            .chain(&r.keywords)
            .map(String::as_str)
            .collect()
    }

    pub fn is_standard(&self) -> bool {
        self.kind == ZoneKind::Standard
    }
}

/// Immutable, ordered set of zones
///
/// Iteration order is matching priority order.
#[derive(Debug, Clone)]
pub struct ZoneRegistry {
    zones: Vec<Zone>,
    index: HashMap<String, usize>,
}

impl ZoneRegistry {
    /// Build a registry, normalizing rule text and checking references
    pub fn new(zones: Vec<Zone>) -> Result<Self> {
        let mut normalized = Vec::with_capacity(zones.len());
        let mut index = HashMap::new();

        for mut zone in zones {
            if zone.id.trim().is_empty() {
                return Err(CellariumError::Config("zone id must not be empty".to_string()));
            }
            if index.contains_key(&zone.id) {
                return Err(CellariumError::Config(format!("duplicate zone id '{}'", zone.id)));
            }
            zone.rules = zone.rules.normalized();
            index.insert(zone.id.clone(), normalized.len());
            normalized.push(zone);
        }

        for zone in &normalized {
            if let Some(target) = &zone.overflow_zone_id {
                if !index.contains_key(target) {
                    return Err(CellariumError::Config(format!(
                        "zone '{}' overflows into unknown zone '{}'",
                        zone.id, target
                    )));
                }
            }
        }

        for kind in [ZoneKind::Fallback, ZoneKind::Curated] {
            if normalized.iter().filter(|z| z.kind == kind).count() > 1 {
                return Err(CellariumError::Config(format!("more than one {:?} zone configured", kind)));
            }
        }

        Ok(Self { zones: normalized, index })
    }

    /// The built-in zone catalogue
    pub fn builtin() -> Self {
        Self::new(default_zones()).expect("built-in zone catalogue is valid")
    }

    /// Load zones from a JSON array file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let zones: Vec<Zone> = serde_json::from_str(&content)
            .map_err(|e| CellariumError::Config(format!("Failed to parse zones: {}", e)))?;
        tracing::info!("Loaded {} zones from {:?}", zones.len(), path);
        Self::new(zones)
    }

    pub fn get(&self, id: &str) -> Option<&Zone> {
        self.index.get(id).map(|i| &self.zones[*i])
    }

    /// Look up a zone, failing for unknown ids
    pub fn require(&self, id: &str) -> Result<&Zone> {
        self.get(id).ok_or_else(|| CellariumError::UnknownZone(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// The global fallback zone, if configured
    pub fn fallback(&self) -> Option<&Zone> {
        self.zones.iter().find(|z| z.kind == ZoneKind::Fallback)
    }

    /// The curiosities zone, if configured
    pub fn curated(&self) -> Option<&Zone> {
        self.zones.iter().find(|z| z.kind == ZoneKind::Curated)
    }

    /// Display name for an id, falling back to the id itself
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|z| z.name.as_str()).unwrap_or(id)
    }
}
