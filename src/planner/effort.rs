// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Effort-minimizing planner over explicit per-zone free-slot lists
//!
//! Pairs of bottles that each want the other's zone become a single swap.
//! Everything else is a single move into the next free slot of the target
//! zone, and the slot it leaves behind becomes free for its old zone.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use tracing::debug;

use super::{planning_order, MoveKind, MoveSuggestion};
use crate::allocation::ZoneAllocation;
use crate::analysis::MisplacedWine;
use crate::config::PlanningConfig;
use crate::matcher::Confidence;
use crate::slots::{CellarLayout, SlotId};
use crate::wine::WineId;

/// A wine the planner left where it is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedWine {
    pub wine_id: WineId,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanStatistics {
    pub single_moves: usize,
    pub swaps: usize,
    pub skipped: usize,
    pub total_effort: f64,
    pub average_effort: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannedMoves {
    pub moves: Vec<MoveSuggestion>,
    pub skipped: Vec<SkippedWine>,
    pub stats: PlanStatistics,
}

impl PlannedMoves {
    /// One-line description of the plan
    pub fn summary(&self) -> String {
        let s = &self.stats;
        if s.single_moves == 0 && s.swaps == 0 {
            return match s.skipped {
                0 => "Nothing to move".to_string(),
                n => format!("No moves planned, {} bottles skipped", n),
            };
        }
        let mut text = format!(
            "{} moves and {} swaps, total effort {:.2} (average {:.2})",
            s.single_moves, s.swaps, s.total_effort, s.average_effort
        );
        if s.skipped > 0 {
            text.push_str(&format!(", {} bottles skipped", s.skipped));
        }
        text
    }
}

/// Free cellar slots in each zone's bound rows, column order
pub fn free_slots_by_zone(
    allocations: &BTreeMap<String, ZoneAllocation>,
    layout: &CellarLayout,
    occupied: &HashSet<SlotId>,
) -> BTreeMap<String, Vec<SlotId>> {
    allocations
        .values()
        .map(|allocation| {
            let free: Vec<SlotId> = allocation
                .sorted_rows()
                .into_iter()
                .flat_map(|row| layout.slots_in_row(row))
                .filter(|slot| !occupied.contains(slot))
                .collect();
            (allocation.zone_id.clone(), free)
        })
        .collect()
}

/// Plans swaps and single moves within a confidence floor and effort budget
#[derive(Debug, Clone)]
pub struct EffortPlanner {
    move_effort: f64,
    swap_effort: f64,
    min_confidence: Confidence,
    max_effort: Option<f64>,
}

impl From<&PlanningConfig> for EffortPlanner {
    fn from(config: &PlanningConfig) -> Self {
        Self {
            move_effort: config.move_effort,
            swap_effort: config.swap_effort,
            min_confidence: config.min_confidence,
            max_effort: config.max_effort,
        }
    }
}

impl Default for EffortPlanner {
    fn default() -> Self {
        Self::from(&PlanningConfig::default())
    }
}

impl EffortPlanner {
    fn within_budget(&self, spent: f64, cost: f64) -> bool {
        self.max_effort.map_or(true, |max| spent + cost <= max)
    }

    pub fn plan_moves(&self, misplaced: &[MisplacedWine], free_slots: &BTreeMap<String, Vec<SlotId>>) -> PlannedMoves {
        let mut free: BTreeMap<String, VecDeque<SlotId>> = free_slots
            .iter()
            .map(|(zone, slots)| (zone.clone(), slots.iter().copied().collect()))
            .collect();
        let ordered = planning_order(misplaced);

        let mut plan = PlannedMoves::default();
        let mut handled: HashSet<WineId> = HashSet::new();
        let mut spent = 0.0;

        for wine in &ordered {
            if !wine.confidence.at_least(self.min_confidence) {
                handled.insert(wine.wine_id);
                plan.skipped.push(SkippedWine {
                    wine_id: wine.wine_id,
                    reason: format!("{} confidence is below {}", wine.confidence, self.min_confidence),
                });
            }
        }

        // swaps first: two bottles each sitting in the zone the other wants
        for (i, a) in ordered.iter().enumerate() {
            if handled.contains(&a.wine_id) {
                continue;
            }
            let partner = ordered.iter().skip(i + 1).find(|b| {
                !handled.contains(&b.wine_id)
                    && a.recommended_zone_id != b.recommended_zone_id
                    && a.current_zone_id.as_deref() == Some(b.recommended_zone_id.as_str())
                    && b.current_zone_id.as_deref() == Some(a.recommended_zone_id.as_str())
            });
            let Some(b) = partner else { continue };
            if !self.within_budget(spent, self.swap_effort) {
                continue;
            }

            spent += self.swap_effort;
            handled.insert(a.wine_id);
            handled.insert(b.wine_id);
            plan.stats.swaps += 1;
            let confidence = a.confidence.max(b.confidence);
            debug!("Swap {} <-> {}", a.wine_id, b.wine_id);
            plan.moves.push(MoveSuggestion {
                kind: MoveKind::Swap,
                wine_id: a.wine_id,
                wine_name: a.name.clone(),
                from: a.current_slot,
                to: Some(b.current_slot),
                target_zone_id: a.recommended_zone_id.clone(),
                confidence,
                priority: confidence.priority(),
                is_overflow: false,
                swap_with: Some(b.wine_id),
                reason: format!("Swap with {} which belongs in {}", b.name, b.recommended_zone_name),
            });
        }

        for wine in &ordered {
            if handled.contains(&wine.wine_id) {
                continue;
            }
            handled.insert(wine.wine_id);

            if !self.within_budget(spent, self.move_effort) {
                plan.skipped.push(SkippedWine {
                    wine_id: wine.wine_id,
                    reason: "effort budget exhausted".to_string(),
                });
                continue;
            }
            let Some(destination) = free.get_mut(&wine.recommended_zone_id).and_then(VecDeque::pop_front) else {
                plan.skipped.push(SkippedWine {
                    wine_id: wine.wine_id,
                    reason: format!("no free slot in {}", wine.recommended_zone_name),
                });
                continue;
            };

            spent += self.move_effort;
            plan.stats.single_moves += 1;
            if let Some(source_zone) = &wine.current_zone_id {
                free.entry(source_zone.clone()).or_default().push_back(wine.current_slot);
            }
            plan.moves.push(MoveSuggestion {
                kind: MoveKind::Move,
                wine_id: wine.wine_id,
                wine_name: wine.name.clone(),
                from: wine.current_slot,
                to: Some(destination),
                target_zone_id: wine.recommended_zone_id.clone(),
                confidence: wine.confidence,
                priority: wine.confidence.priority(),
                is_overflow: false,
                swap_with: None,
                reason: format!("Belongs in {}", wine.recommended_zone_name),
            });
        }

        plan.moves.sort_by_key(|m| m.priority);
        plan.stats.skipped = plan.skipped.len();
        plan.stats.total_effort = spent;
        let actions = plan.stats.single_moves + plan.stats.swaps;
        plan.stats.average_effort = if actions == 0 { 0.0 } else { spent / actions as f64 };
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn misplaced(id: WineId, slot: SlotId, current: Option<&str>, target: &str, confidence: Confidence) -> MisplacedWine {
        MisplacedWine {
            wine_id: id,
            name: format!("Wine {}", id),
            current_slot: slot,
            current_zone_id: current.map(str::to_string),
            recommended_zone_id: target.to_string(),
            recommended_zone_name: target.to_string(),
            confidence,
            score: 75,
            reason: String::new(),
            alternatives: Vec::new(),
        }
    }

    #[test]
    fn test_detects_swaps() {
        let wines = vec![
            misplaced(1, SlotId::cellar(9, 1), Some("rioja"), "portugal", Confidence::High),
            misplaced(2, SlotId::cellar(10, 1), Some("portugal"), "rioja", Confidence::Medium),
        ];
        let plan = EffortPlanner::default().plan_moves(&wines, &BTreeMap::new());

        assert_eq!(plan.stats.swaps, 1);
        assert_eq!(plan.stats.single_moves, 0);
        assert_eq!(plan.moves[0].kind, MoveKind::Swap);
        assert_eq!(plan.moves[0].to, Some(SlotId::cellar(10, 1)));
        assert_eq!(plan.moves[0].swap_with, Some(2));
        assert_eq!(plan.moves[0].confidence, Confidence::Medium);
        assert!((plan.stats.total_effort - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_vacated_slot_is_reused() {
        let wines = vec![
            misplaced(1, SlotId::cellar(9, 4), Some("rioja"), "portugal", Confidence::High),
            misplaced(2, SlotId::cellar(12, 1), Some("piedmont"), "rioja", Confidence::High),
        ];
        let free = BTreeMap::from([("portugal".to_string(), vec![SlotId::cellar(10, 3)])]);
        let plan = EffortPlanner::default().plan_moves(&wines, &free);

        assert_eq!(plan.stats.single_moves, 2);
        assert_eq!(plan.moves[0].to, Some(SlotId::cellar(10, 3)));
        assert_eq!(plan.moves[1].to, Some(SlotId::cellar(9, 4)));
        assert!((plan.stats.average_effort - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_floor_and_missing_space_are_skipped() {
        let planner = EffortPlanner::from(&PlanningConfig {
            min_confidence: Confidence::Medium,
            ..Default::default()
        });
        let wines = vec![
            misplaced(1, SlotId::cellar(1, 1), None, "portugal", Confidence::Low),
            misplaced(2, SlotId::cellar(1, 2), None, "portugal", Confidence::High),
        ];
        let plan = planner.plan_moves(&wines, &BTreeMap::new());

        assert!(plan.moves.is_empty());
        assert_eq!(plan.stats.skipped, 2);
        assert!(plan.summary().contains("2 bottles skipped"));
    }

    #[test]
    fn test_effort_budget_stops_planning() {
        let planner = EffortPlanner::from(&PlanningConfig {
            max_effort: Some(1.5),
            ..Default::default()
        });
        let wines = vec![
            misplaced(1, SlotId::cellar(1, 1), None, "portugal", Confidence::High),
            misplaced(2, SlotId::cellar(1, 2), None, "portugal", Confidence::High),
        ];
        let free = BTreeMap::from([(
            "portugal".to_string(),
            vec![SlotId::cellar(10, 1), SlotId::cellar(10, 2)],
        )]);
        let plan = planner.plan_moves(&wines, &free);

        assert_eq!(plan.stats.single_moves, 1);
        assert_eq!(plan.skipped[0].reason, "effort budget exhausted");
    }

    #[test]
    fn test_free_slots_by_zone() {
        let layout = CellarLayout::default();
        let now = chrono::Utc::now();
        let allocations = BTreeMap::from([(
            "sparkling".to_string(),
            ZoneAllocation {
                zone_id: "sparkling".to_string(),
                rows: vec![1],
                wine_count: 2,
                first_wine_at: now,
                updated_at: now,
            },
        )]);
        let occupied: HashSet<SlotId> = [SlotId::cellar(1, 1), SlotId::cellar(1, 3)].into();

        let free = free_slots_by_zone(&allocations, &layout, &occupied);
        // row 1 has 7 columns
        assert_eq!(free["sparkling"].len(), 5);
        assert_eq!(free["sparkling"][0], SlotId::cellar(1, 2));
    }

    #[test]
    fn test_empty_plan_summary() {
        assert_eq!(EffortPlanner::default().plan_moves(&[], &BTreeMap::new()).summary(), "Nothing to move");
    }
}
