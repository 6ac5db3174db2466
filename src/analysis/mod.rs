// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Cellar audit
//!
//! Compares each placed bottle's physical zone with the zone the matcher
//! recommends, measures every bound zone, and attaches a move plan.

pub mod drift;
pub mod health;

pub use drift::{detect_drift, DriftKind, DriftSignal};
pub use health::{classify_health, fragmentation_score, utilization, ZoneHealth};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};
use uuid::Uuid;

use crate::allocation::row_owners;
use crate::config::AnalysisConfig;
use crate::matcher::{Confidence, ZoneMatch, ZoneMatcher, ZoneScore};
use crate::placement::{PlacementOptions, SlotAllocator};
use crate::planner::{MoveKind, MovePlanner, MoveSuggestion};
use crate::slots::{SlotId, SLOTS_PER_ROW};
use crate::wine::{normalize, RawWine, Wine, WineId};
use crate::zones::ZoneKind;
use crate::Result;

/// A bottle that is not where the matcher would put it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MisplacedWine {
    pub wine_id: WineId,
    pub name: String,
    pub current_slot: SlotId,
    /// Zone owning the bottle's row; None for rows no zone is bound to
    pub current_zone_id: Option<String>,
    pub recommended_zone_id: String,
    pub recommended_zone_name: String,
    pub confidence: Confidence,
    pub score: u8,
    pub reason: String,
    pub alternatives: Vec<ZoneScore>,
}

/// A bottle tagged as living in a buffer or the fallback zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferOccupant {
    pub wine_id: WineId,
    pub name: String,
    pub slot: SlotId,
    pub zone_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneAnalysis {
    pub zone_id: String,
    pub zone_name: String,
    pub rows: Vec<u32>,
    pub capacity: u32,
    pub bottle_count: usize,
    pub utilization: f64,
    pub fragmentation: f64,
    /// Bottles recommended for the zone exceed nine per bound row
    ///
    /// Counted on demand, not occupants: bottles sitting in the bound rows
    /// can never outnumber the slots those rows have.
    pub overflowing: bool,
    pub health: ZoneHealth,
    pub correctly_placed: usize,
    pub misplaced: usize,
    pub drift: Vec<DriftSignal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: AlertSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    pub message: String,
}

impl Alert {
    fn new(severity: AlertSeverity, zone_id: Option<&str>, message: String) -> Self {
        Self {
            severity,
            zone_id: zone_id.map(str::to_string),
            message,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_wines: usize,
    pub cellar_wines: usize,
    pub fridge_wines: usize,
    pub unplaced_wines: usize,
    pub active_zones: usize,
    pub correctly_placed: usize,
    pub misplaced: usize,
    pub buffer_occupants: usize,
    /// Wines the matcher could not classify with confidence
    pub needs_review: usize,
    pub manual_moves: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub summary: AnalysisSummary,
    pub zones: Vec<ZoneAnalysis>,
    pub misplaced: Vec<MisplacedWine>,
    pub buffer_occupants: Vec<BufferOccupant>,
    pub suggested_moves: Vec<MoveSuggestion>,
    pub alerts: Vec<Alert>,
    pub narratives: Vec<String>,
}

struct Classified<'a> {
    raw: &'a RawWine,
    wine: Wine,
    zone_match: ZoneMatch,
}

/// Audits placed bottles against zone recommendations
pub struct CellarAnalyzer {
    matcher: ZoneMatcher,
    allocator: SlotAllocator,
    config: AnalysisConfig,
    options: PlacementOptions,
}

impl CellarAnalyzer {
    pub fn new(matcher: ZoneMatcher, allocator: SlotAllocator, config: AnalysisConfig, options: PlacementOptions) -> Self {
        Self {
            matcher,
            allocator,
            config,
            options,
        }
    }

    /// Build the full report for an inventory
    pub async fn analyse_cellar(&self, wines: &[RawWine]) -> Result<AnalysisReport> {
        let registry = self.matcher.registry();
        let layout = self.allocator.layout();
        let allocations = self.allocator.store().active_allocations().await?;
        let owners = row_owners(&allocations);

        let mut summary = AnalysisSummary {
            total_wines: wines.len(),
            active_zones: allocations.len(),
            ..Default::default()
        };
        let mut misplaced = Vec::new();
        let mut buffer_occupants = Vec::new();
        let mut alerts = Vec::new();

        // occupants of each bound zone, and bottles recommended for it
        let mut by_zone: HashMap<&str, Vec<(SlotId, usize)>> = HashMap::new();
        let mut demand: HashMap<String, usize> = HashMap::new();
        let mut placement_counts: HashMap<&str, (usize, usize)> = HashMap::new();

        let classified: Vec<Classified> = wines
            .iter()
            .map(|raw| {
                let wine = normalize(raw);
                let zone_match = self.matcher.find_best_zone(&wine);
                Classified { raw, wine, zone_match }
            })
            .collect();

        for (index, item) in classified.iter().enumerate() {
            if item.zone_match.requires_review {
                summary.needs_review += 1;
            }
            let slot = match item.raw.slot {
                None => {
                    summary.unplaced_wines += 1;
                    continue;
                }
                Some(slot @ SlotId::Fridge(_)) => {
                    debug!("Wine {} is in the fridge at {}", item.raw.id, slot);
                    summary.fridge_wines += 1;
                    continue;
                }
                Some(slot) => slot,
            };
            summary.cellar_wines += 1;
            *demand.entry(item.zone_match.zone_id.clone()).or_default() += 1;

            let physical_zone = slot.row().and_then(|row| owners.get(&row)).map(String::as_str);
            if let Some(zone_id) = physical_zone {
                by_zone.entry(zone_id).or_default().push((slot, index));
            }

            let tagged = item.raw.zone_id.as_deref();
            let buffer_tag = tagged
                .and_then(|id| registry.get(id))
                .filter(|z| matches!(z.kind, ZoneKind::Buffer | ZoneKind::Fallback));
            if let Some(tag) = buffer_tag {
                buffer_occupants.push(BufferOccupant {
                    wine_id: item.raw.id,
                    name: item.raw.name.clone(),
                    slot,
                    zone_id: tag.id.clone(),
                });
                continue;
            }

            let recommended = item.zone_match.zone_id.as_str();
            let correct = match physical_zone {
                Some(zone_id) => {
                    zone_id == recommended
                        || tagged == Some(recommended)
                        || registry
                            .get(recommended)
                            .and_then(|z| z.overflow_zone_id.as_deref())
                            == Some(zone_id)
                }
                None => {
                    tagged == Some(recommended) || registry.get(recommended).is_some_and(|z| z.kind.is_shared())
                }
            };

            if let Some(zone_id) = physical_zone {
                let counts = placement_counts.entry(zone_id).or_default();
                if correct {
                    counts.0 += 1;
                } else {
                    counts.1 += 1;
                }
            }

            if correct {
                summary.correctly_placed += 1;
            } else {
                misplaced.push(MisplacedWine {
                    wine_id: item.raw.id,
                    name: item.raw.name.clone(),
                    current_slot: slot,
                    current_zone_id: physical_zone.map(str::to_string),
                    recommended_zone_id: item.zone_match.zone_id.clone(),
                    recommended_zone_name: item.zone_match.zone_name.clone(),
                    confidence: item.zone_match.confidence,
                    score: item.zone_match.score,
                    reason: item.zone_match.reason.clone(),
                    alternatives: item.zone_match.alternatives.clone(),
                });
            }
        }

        let mut zones = Vec::with_capacity(allocations.len());
        for allocation in allocations.values() {
            let zone_id = allocation.zone_id.as_str();
            let rows = allocation.sorted_rows();
            let occupants = by_zone.get(zone_id).map(Vec::as_slice).unwrap_or_default();
            let slots: Vec<SlotId> = occupants.iter().map(|(slot, _)| *slot).collect();

            let capacity = layout.capacity_of(&rows);
            let used = utilization(slots.len(), capacity);
            let fragmentation = fragmentation_score(&slots, &rows, layout);
            let health = classify_health(used, slots.len(), fragmentation, &self.config);
            let overflowing = demand.get(zone_id).copied().unwrap_or(0) > SLOTS_PER_ROW as usize * rows.len();
            let (correctly_placed, wrong) = placement_counts.get(zone_id).copied().unwrap_or_default();

            let drift = match registry.get(zone_id) {
                Some(zone) => {
                    let occupant_wines: Vec<&Wine> = occupants.iter().map(|(_, i)| &classified[*i].wine).collect();
                    detect_drift(zone, &occupant_wines, &self.config)
                }
                None => {
                    alerts.push(Alert::new(
                        AlertSeverity::Warning,
                        Some(zone_id),
                        format!("Rows {:?} are bound to unknown zone '{}'", rows, zone_id),
                    ));
                    Vec::new()
                }
            };

            let zone_name = registry.display_name(zone_id).to_string();
            match health {
                ZoneHealth::Crowded => alerts.push(Alert::new(
                    AlertSeverity::Warning,
                    Some(zone_id),
                    format!("{} is {:.0}% full", zone_name, used),
                )),
                ZoneHealth::Fragmented => alerts.push(Alert::new(
                    AlertSeverity::Info,
                    Some(zone_id),
                    format!("{} is fragmented ({:.0}%)", zone_name, fragmentation),
                )),
                ZoneHealth::Sparse | ZoneHealth::Healthy => {}
            }
            if overflowing {
                alerts.push(Alert::new(
                    AlertSeverity::Warning,
                    Some(zone_id),
                    format!("{} has more bottles than its {} rows hold", zone_name, rows.len()),
                ));
            }
            for signal in &drift {
                alerts.push(Alert::new(AlertSeverity::Info, Some(zone_id), signal.message.clone()));
            }

            zones.push(ZoneAnalysis {
                zone_id: zone_id.to_string(),
                zone_name,
                rows,
                capacity,
                bottle_count: slots.len(),
                utilization: used,
                fragmentation,
                overflowing,
                health,
                correctly_placed,
                misplaced: wrong,
                drift,
            });
        }

        misplaced.sort_by_key(|w| (w.confidence, w.current_slot));
        summary.misplaced = misplaced.len();
        summary.buffer_occupants = buffer_occupants.len();

        if summary.cellar_wines > 0 {
            let fraction = summary.misplaced as f64 / summary.cellar_wines as f64;
            if fraction > self.config.misplaced_alert_fraction {
                alerts.push(Alert::new(
                    AlertSeverity::Critical,
                    None,
                    format!("{:.0}% of cellar bottles are out of place", fraction * 100.0),
                ));
            }
        }
        if summary.needs_review > 0 {
            alerts.push(Alert::new(
                AlertSeverity::Info,
                None,
                format!("{} wines need manual classification", summary.needs_review),
            ));
        }

        let planner = MovePlanner::new(self.allocator.clone(), self.options);
        let suggested_moves = planner.generate_move_suggestions(&misplaced, wines).await?;
        summary.manual_moves = suggested_moves.iter().filter(|m| m.kind == MoveKind::Manual).count();

        let narratives = narrate(&zones, &summary);
        alerts.sort_by(|a, b| b.severity.cmp(&a.severity));

        info!(
            "Analysed {} wines: {} misplaced, {} moves suggested",
            summary.total_wines,
            summary.misplaced,
            suggested_moves.len()
        );

        Ok(AnalysisReport {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            summary,
            zones,
            misplaced,
            buffer_occupants,
            suggested_moves,
            alerts,
            narratives,
        })
    }
}

fn narrate(zones: &[ZoneAnalysis], summary: &AnalysisSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "{} of {} cellar bottles are in their zone, {} are out of place",
        summary.correctly_placed + summary.buffer_occupants,
        summary.cellar_wines,
        summary.misplaced
    )];

    let mut by_health: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for zone in zones {
        lines.push(format!(
            "{}: {} bottles in row{} {} ({:.0}% full, {})",
            zone.zone_name,
            zone.bottle_count,
            if zone.rows.len() == 1 { "" } else { "s" },
            zone.rows.iter().map(u32::to_string).collect::<Vec<_>>().join(", "),
            zone.utilization,
            zone.health
        ));
        if zone.health != ZoneHealth::Healthy {
            by_health.entry(zone.health.to_string()).or_default().push(&zone.zone_name);
        }
    }
    for (health, names) in by_health {
        lines.push(format!("{} zones: {}", health, names.join(", ")));
    }
    lines
}
