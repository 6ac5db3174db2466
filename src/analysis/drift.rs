// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Advisory drift signals: a zone slowly filling with wines it was not meant for

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::wine::Wine;
use crate::zones::Zone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftKind {
    Colour,
    Country,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftSignal {
    pub zone_id: String,
    pub kind: DriftKind,
    /// Occupants that break the zone's rule
    pub offending: usize,
    /// Occupants with a known value for the attribute
    pub considered: usize,
    pub fraction: f64,
    pub message: String,
}

/// Check a zone's occupants against its declared colours and countries
pub fn detect_drift(zone: &Zone, occupants: &[&Wine], config: &AnalysisConfig) -> Vec<DriftSignal> {
    let mut signals = Vec::new();

    if !zone.rules.colours.is_empty() {
        let known: Vec<_> = occupants.iter().filter_map(|w| w.colour).collect();
        let offending = known.iter().filter(|c| !zone.rules.colours.contains(*c)).count();
        if offending > 0 {
            let fraction = offending as f64 / known.len() as f64;
            if fraction >= config.colour_drift_fraction {
                signals.push(DriftSignal {
                    zone_id: zone.id.clone(),
                    kind: DriftKind::Colour,
                    offending,
                    considered: known.len(),
                    fraction,
                    message: format!(
                        "{} of {} bottles in {} are not {}",
                        offending,
                        known.len(),
                        zone.name,
                        zone.rules.colours.iter().map(|c| c.as_str()).collect::<Vec<_>>().join("/")
                    ),
                });
            }
        }
    }

    if !zone.rules.countries.is_empty() {
        let known: Vec<&str> = occupants.iter().filter_map(|w| w.country.as_deref()).collect();
        let offending = known
            .iter()
            .filter(|c| !zone.rules.countries.iter().any(|expected| expected == *c))
            .count();
        if offending > 0 {
            let fraction = offending as f64 / known.len() as f64;
            if fraction > config.country_drift_fraction {
                signals.push(DriftSignal {
                    zone_id: zone.id.clone(),
                    kind: DriftKind::Country,
                    offending,
                    considered: known.len(),
                    fraction,
                    message: format!(
                        "Most bottles in {} come from outside {}",
                        zone.name,
                        zone.rules.countries.join(", ")
                    ),
                });
            }
        }
    }

    signals
}
