// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Move planning for misplaced bottles

pub mod effort;

pub use effort::{free_slots_by_zone, EffortPlanner, PlanStatistics, PlannedMoves, SkippedWine};

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::allocation::InMemoryAllocationStore;
use crate::analysis::MisplacedWine;
use crate::matcher::Confidence;
use crate::placement::{PlacementOptions, SlotAllocator};
use crate::slots::SlotId;
use crate::wine::{normalize, RawWine, Wine, WineId};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveKind {
    Move,
    Swap,
    Manual,
}

impl fmt::Display for MoveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            MoveKind::Move => "move",
            MoveKind::Swap => "swap",
            MoveKind::Manual => "manual",
        })
    }
}

/// One step of a reorganization plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveSuggestion {
    pub kind: MoveKind,
    pub wine_id: WineId,
    pub wine_name: String,
    pub from: SlotId,
    /// None when the bottle has to be placed by hand
    pub to: Option<SlotId>,
    pub target_zone_id: String,
    pub confidence: Confidence,
    /// 1 (high confidence) to 3 (low)
    pub priority: u8,
    pub is_overflow: bool,
    /// Other bottle of a swap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_with: Option<WineId>,
    pub reason: String,
}

impl MoveSuggestion {
    fn manual(wine: &MisplacedWine, reason: String) -> Self {
        Self {
            kind: MoveKind::Manual,
            wine_id: wine.wine_id,
            wine_name: wine.name.clone(),
            from: wine.current_slot,
            to: None,
            target_zone_id: wine.recommended_zone_id.clone(),
            confidence: wine.confidence,
            priority: wine.confidence.priority(),
            is_overflow: false,
            swap_with: None,
            reason,
        }
    }
}

/// Misplaced wines strongest recommendation first, then by row
pub(crate) fn planning_order(misplaced: &[MisplacedWine]) -> Vec<&MisplacedWine> {
    let mut ordered: Vec<&MisplacedWine> = misplaced.iter().collect();
    ordered.sort_by_key(|w| (w.confidence, w.current_slot.row().unwrap_or(u32::MAX)));
    ordered
}

/// Turns misplaced wines into collision-free moves
pub struct MovePlanner {
    allocator: SlotAllocator,
    options: PlacementOptions,
}

impl MovePlanner {
    pub fn new(allocator: SlotAllocator, options: PlacementOptions) -> Self {
        Self { allocator, options }
    }

    /// Plan a move for every misplaced wine
    ///
    /// Runs against a copy of the allocation state, so rows bound while
    /// planning are not persisted. A wine whose zone chain is full, or whose
    /// search fails, gets a manual suggestion instead of aborting the batch.
    pub async fn generate_move_suggestions(
        &self,
        misplaced: &[MisplacedWine],
        all_wines: &[RawWine],
    ) -> Result<Vec<MoveSuggestion>> {
        let snapshot = self.allocator.store().active_allocations().await?;
        let simulation = self
            .allocator
            .with_store(Arc::new(InMemoryAllocationStore::from_snapshot(snapshot)));

        let occupied: HashSet<SlotId> = all_wines.iter().filter_map(|w| w.slot).collect();
        let normalized: HashMap<WineId, Wine> = all_wines.iter().map(|w| (w.id, normalize(w))).collect();

        let mut vacated: HashSet<SlotId> = HashSet::new();
        let mut claimed: HashSet<SlotId> = HashSet::new();
        let mut suggestions = Vec::with_capacity(misplaced.len());

        for wine in planning_order(misplaced) {
            let view: HashSet<SlotId> = occupied
                .difference(&vacated)
                .copied()
                .chain(claimed.iter().copied())
                .collect();

            let found = simulation
                .find_available_slot(&wine.recommended_zone_id, &view, normalized.get(&wine.wine_id), self.options)
                .await;

            match found {
                Ok(Some(placement)) => {
                    debug!("Wine {} -> {} ({})", wine.wine_id, placement.slot_id, placement.zone_id);
                    vacated.insert(wine.current_slot);
                    claimed.insert(placement.slot_id);
                    suggestions.push(MoveSuggestion {
                        kind: MoveKind::Move,
                        wine_id: wine.wine_id,
                        wine_name: wine.name.clone(),
                        from: wine.current_slot,
                        to: Some(placement.slot_id),
                        target_zone_id: placement.zone_id.clone(),
                        confidence: wine.confidence,
                        priority: wine.confidence.priority(),
                        is_overflow: placement.is_overflow,
                        swap_with: None,
                        reason: if placement.is_overflow {
                            format!(
                                "{} is full, overflow via {}",
                                wine.recommended_zone_name,
                                placement.overflow_path.join(" -> ")
                            )
                        } else {
                            format!("Belongs in {}", wine.recommended_zone_name)
                        },
                    });
                }
                Ok(None) => {
                    suggestions.push(MoveSuggestion::manual(
                        wine,
                        format!("{} and its overflow zones are full", wine.recommended_zone_name),
                    ));
                }
                Err(e) => {
                    warn!("Could not plan a move for wine {}: {}", wine.wine_id, e);
                    suggestions.push(MoveSuggestion::manual(wine, e.to_string()));
                }
            }
        }

        suggestions.sort_by_key(|s| s.priority);
        Ok(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::OverflowPolicy;
    use crate::slots::CellarLayout;
    use crate::wine::Colour;
    use crate::zones::{Zone, ZoneKind, ZoneRegistry, ZoneRules};

    fn zone(id: &str, rows: &[u32]) -> Zone {
        Zone {
            id: id.to_string(),
            name: id.to_string(),
            kind: ZoneKind::Standard,
            rules: ZoneRules {
                colours: vec![Colour::Red],
                ..Default::default()
            },
            preferred_rows: rows.to_vec(),
            overflow_zone_id: None,
        }
    }

    fn misplaced(id: WineId, slot: SlotId, zone: &str, confidence: Confidence) -> MisplacedWine {
        MisplacedWine {
            wine_id: id,
            name: format!("Wine {}", id),
            current_slot: slot,
            current_zone_id: None,
            recommended_zone_id: zone.to_string(),
            recommended_zone_name: zone.to_string(),
            confidence,
            score: 80,
            reason: String::new(),
            alternatives: Vec::new(),
        }
    }

    fn raw(id: WineId, slot: SlotId) -> RawWine {
        RawWine {
            id,
            name: format!("Wine {}", id),
            slot: Some(slot),
            ..Default::default()
        }
    }

    fn planner(zones: Vec<Zone>, rows: u32) -> MovePlanner {
        let allocator = SlotAllocator::new(
            Arc::new(ZoneRegistry::new(zones).unwrap()),
            CellarLayout::uniform(rows),
            OverflowPolicy::default(),
            Arc::new(InMemoryAllocationStore::new()),
        );
        MovePlanner::new(allocator, PlacementOptions::default())
    }

    #[tokio::test]
    async fn test_destinations_are_never_shared() {
        let planner = planner(vec![zone("target", &[1])], 3);
        let wines: Vec<RawWine> = (1..=4).map(|i| raw(i, SlotId::cellar(3, i as u32))).collect();
        let misplaced: Vec<MisplacedWine> = wines
            .iter()
            .map(|w| misplaced(w.id, w.slot.unwrap(), "target", Confidence::High))
            .collect();

        let suggestions = planner.generate_move_suggestions(&misplaced, &wines).await.unwrap();
        assert_eq!(suggestions.len(), 4);
        let destinations: HashSet<SlotId> = suggestions.iter().filter_map(|s| s.to).collect();
        assert_eq!(destinations.len(), 4);
        assert!(suggestions.iter().all(|s| s.kind == MoveKind::Move));
    }

    #[tokio::test]
    async fn test_full_zone_yields_manual_suggestion() {
        let planner = planner(vec![zone("target", &[1])], 1);
        let mut wines: Vec<RawWine> = (1..=8).map(|i| raw(i, SlotId::cellar(1, i as u32))).collect();
        wines.push(raw(20, SlotId::Fridge(1)));
        wines.push(raw(21, SlotId::Fridge(2)));

        let misplaced = vec![
            misplaced(20, SlotId::Fridge(1), "target", Confidence::Medium),
            misplaced(21, SlotId::Fridge(2), "target", Confidence::Medium),
        ];
        let suggestions = planner.generate_move_suggestions(&misplaced, &wines).await.unwrap();
        assert_eq!(suggestions[0].kind, MoveKind::Move);
        assert_eq!(suggestions[0].to, Some(SlotId::cellar(1, 9)));
        assert_eq!(suggestions[1].kind, MoveKind::Manual);
        assert_eq!(suggestions[1].to, None);
    }

    #[tokio::test]
    async fn test_ordered_by_priority_and_failures_do_not_abort() {
        let planner = planner(vec![zone("target", &[1])], 2);
        let wines = vec![raw(1, SlotId::cellar(2, 1)), raw(2, SlotId::cellar(2, 2)), raw(3, SlotId::cellar(2, 3))];
        let misplaced = vec![
            misplaced(1, SlotId::cellar(2, 1), "target", Confidence::Low),
            misplaced(2, SlotId::cellar(2, 2), "missing_zone", Confidence::Medium),
            misplaced(3, SlotId::cellar(2, 3), "target", Confidence::High),
        ];

        let suggestions = planner.generate_move_suggestions(&misplaced, &wines).await.unwrap();
        let priorities: Vec<u8> = suggestions.iter().map(|s| s.priority).collect();
        assert_eq!(priorities, vec![1, 2, 3]);
        assert_eq!(suggestions[0].wine_id, 3);
        assert_eq!(suggestions[1].kind, MoveKind::Manual);
        assert_eq!(suggestions[2].kind, MoveKind::Move);
    }

    #[tokio::test]
    async fn test_planning_leaves_store_untouched() {
        let planner = planner(vec![zone("target", &[1])], 2);
        let wines = vec![raw(1, SlotId::cellar(2, 1))];
        let misplaced = vec![misplaced(1, SlotId::cellar(2, 1), "target", Confidence::High)];

        planner.generate_move_suggestions(&misplaced, &wines).await.unwrap();
        assert!(planner.allocator.store().active_allocations().await.unwrap().is_empty());
    }
}
