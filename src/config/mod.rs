// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for Cellarium

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::matcher::Confidence;
use crate::placement::OverflowPolicy;
use crate::slots::CellarLayout;
use crate::zones::ZoneRegistry;
use crate::{CellariumError, Result};

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Optional JSON zone catalogue replacing the built-in zones
    #[serde(default)]
    pub zones_path: Option<String>,

    /// Physical cellar shape
    #[serde(default)]
    pub layout: CellarLayout,

    /// Zone scoring weights and confidence thresholds
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Slot search behaviour
    #[serde(default)]
    pub placement: PlacementConfig,

    /// Health and drift thresholds
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Move planning costs and bounds
    #[serde(default)]
    pub planning: PlanningConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

/// Points each rule category contributes when a zone declares it
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CategoryWeights {
    pub colour: u32,
    pub grape: u32,
    pub keyword: u32,
    pub country: u32,
    pub region: u32,
    pub appellation: u32,
    pub winemaking: u32,
}

impl CategoryWeights {
    pub fn total(&self) -> u32 {
        self.colour + self.grape + self.keyword + self.country + self.region + self.appellation + self.winemaking
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MatchingConfig {
    pub weights: CategoryWeights,
    /// Minimum top score for high confidence
    pub high_threshold: u8,
    /// Minimum top score for medium confidence
    pub medium_threshold: u8,
    /// Lead over the runner-up required for high confidence
    pub clear_winner_margin: u8,
    /// Curiosities are accepted only above this score
    pub curiosity_min_score: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PlacementConfig {
    /// Keep buffers and overflow hops away from rows owned by unrelated zones
    pub enforce_affinity: bool,
    /// Allow the global fallback zone once a chain is exhausted
    pub allow_fallback: bool,
    pub overflow: OverflowPolicy,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Utilization above which a zone is crowded
    pub crowded_percent: f64,
    /// Utilization below which an occupied zone is sparse
    pub sparse_percent: f64,
    /// Fragmentation score above which a zone is fragmented
    pub fragmentation_threshold: f64,
    /// Share of occupants off the zone's colours that raises a drift signal
    pub colour_drift_fraction: f64,
    /// Share of occupants from unexpected countries that raises a drift signal
    pub country_drift_fraction: f64,
    /// Share of misplaced cellar bottles that raises an alert
    pub misplaced_alert_fraction: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PlanningConfig {
    /// Effort of moving one bottle
    pub move_effort: f64,
    /// Effort of exchanging two bottles
    pub swap_effort: f64,
    /// Wines recommended below this confidence are left alone
    pub min_confidence: Confidence,
    /// Stop planning once this much effort has been spent
    pub max_effort: Option<f64>,
}

// Default value functions
fn default_db_path() -> String { "cellarium.db".to_string() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            colour: 10,
            grape: 35,
            keyword: 15,
            country: 15,
            region: 25,
            appellation: 30,
            winemaking: 25,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            weights: CategoryWeights::default(),
            high_threshold: 70,
            medium_threshold: 45,
            clear_winner_margin: 15,
            curiosity_min_score: 30,
        }
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            enforce_affinity: true,
            allow_fallback: true,
            overflow: OverflowPolicy::default(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            crowded_percent: 95.0,
            sparse_percent: 20.0,
            fragmentation_threshold: 40.0,
            colour_drift_fraction: 0.2,
            country_drift_fraction: 0.5,
            misplaced_alert_fraction: 0.1,
        }
    }
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            move_effort: 1.0,
            swap_effort: 1.25,
            min_confidence: Confidence::Low,
            max_effort: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| CellariumError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check thresholds and layout for consistency
    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;

        let m = &self.matching;
        if m.weights.total() == 0 {
            return Err(CellariumError::Config("at least one category weight must be non-zero".to_string()));
        }
        if m.high_threshold > 100 || m.medium_threshold > m.high_threshold {
            return Err(CellariumError::Config(format!(
                "thresholds must satisfy medium ({}) <= high ({}) <= 100",
                m.medium_threshold, m.high_threshold
            )));
        }

        let a = &self.analysis;
        for (name, value) in [("crowded_percent", a.crowded_percent), ("sparse_percent", a.sparse_percent)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(CellariumError::Config(format!("{} must be within 0-100", name)));
            }
        }
        for (name, value) in [
            ("colour_drift_fraction", a.colour_drift_fraction),
            ("country_drift_fraction", a.country_drift_fraction),
            ("misplaced_alert_fraction", a.misplaced_alert_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CellariumError::Config(format!("{} must be within 0-1", name)));
            }
        }

        if self.planning.move_effort <= 0.0 || self.planning.swap_effort <= 0.0 {
            return Err(CellariumError::Config("move and swap effort must be positive".to_string()));
        }
        Ok(())
    }

    /// Load the zone registry this configuration points at
    pub fn zone_registry(&self) -> Result<ZoneRegistry> {
        match &self.zones_path {
            Some(path) => ZoneRegistry::load(Path::new(path)),
            None => Ok(ZoneRegistry::builtin()),
        }
    }
}
