// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Slot search
//!
//! Finds a concrete empty slot for a zone. Standard zones search the rows
//! bound to them, binding a first row on demand. Buffers fill gaps in their
//! shared row range. Fallback and curated zones search the whole cellar.
//! A full zone spills along its overflow chain, and the fallback zone is
//! only tried once that chain is exhausted.

mod overflow;

pub use overflow::OverflowPolicy;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::allocation::{row_owners, ZoneAllocationStore};
use crate::config::PlacementConfig;
use crate::matcher::{ZoneMatch, ZoneMatcher};
use crate::slots::{CellarLayout, SlotId};
use crate::wine::{normalize, RawWine, Wine, WineId};
use crate::zones::{Zone, ZoneKind, ZoneRegistry};
use crate::{CellariumError, Result};

/// Per-call search switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementOptions {
    /// Try the fallback zone once the overflow chain is exhausted
    pub allow_fallback: bool,
    /// Keep buffers off rows bound to other zones and vet overflow hops
    pub enforce_affinity: bool,
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self {
            allow_fallback: true,
            enforce_affinity: true,
        }
    }
}

impl From<&PlacementConfig> for PlacementOptions {
    fn from(config: &PlacementConfig) -> Self {
        Self {
            allow_fallback: config.allow_fallback,
            enforce_affinity: config.enforce_affinity,
        }
    }
}

/// A free slot found for a zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotPlacement {
    pub slot_id: SlotId,
    /// Zone the slot belongs to, which differs from the requested zone on overflow
    pub zone_id: String,
    pub is_overflow: bool,
    /// Full zones passed through before this one, requested zone first
    pub overflow_path: Vec<String>,
    /// The search bound a first row to the zone, which already counts the bottle
    #[serde(default)]
    pub new_allocation: bool,
}

/// Outcome of adding a bottle to the cellar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementOutcome {
    pub wine_id: WineId,
    pub zone_match: ZoneMatch,
    /// Zone the search started from
    pub target_zone_id: String,
    /// None when the bottle needs manual placement
    pub placement: Option<SlotPlacement>,
}

/// Finds free slots against an allocation store
#[derive(Clone)]
pub struct SlotAllocator {
    registry: Arc<ZoneRegistry>,
    layout: CellarLayout,
    policy: OverflowPolicy,
    store: Arc<dyn ZoneAllocationStore>,
}

impl SlotAllocator {
    pub fn new(
        registry: Arc<ZoneRegistry>,
        layout: CellarLayout,
        policy: OverflowPolicy,
        store: Arc<dyn ZoneAllocationStore>,
    ) -> Self {
        Self {
            registry,
            layout,
            policy,
            store,
        }
    }

    /// Same zones and layout over a different store
    pub fn with_store(&self, store: Arc<dyn ZoneAllocationStore>) -> Self {
        Self {
            store,
            ..self.clone()
        }
    }

    pub fn store(&self) -> &Arc<dyn ZoneAllocationStore> {
        &self.store
    }

    pub fn layout(&self) -> &CellarLayout {
        &self.layout
    }

    /// Find an empty slot for `zone_id`
    ///
    /// Returns `Ok(None)` when the zone, its overflow chain and (if allowed)
    /// the fallback zone are all full. Errors only when a first row cannot
    /// be bound because every row belongs to some zone. A row is only bound
    /// when it has a free slot, so a zone never holds a row without a bottle.
    pub async fn find_available_slot(
        &self,
        zone_id: &str,
        occupied: &HashSet<SlotId>,
        wine: Option<&Wine>,
        options: PlacementOptions,
    ) -> Result<Option<SlotPlacement>> {
        let mut current = self.registry.require(zone_id)?;
        let mut visited: HashSet<&str> = HashSet::new();
        let mut path: Vec<String> = Vec::new();

        loop {
            visited.insert(current.id.as_str());

            if let Some((slot_id, new_allocation)) = self.search_zone(current, occupied, wine, options).await? {
                return Ok(Some(SlotPlacement {
                    slot_id,
                    zone_id: current.id.clone(),
                    is_overflow: !path.is_empty(),
                    overflow_path: path,
                    new_allocation,
                }));
            }

            match self.next_hop(current, &visited, wine, options) {
                Some(next) => {
                    info!("Zone {} is full, overflowing to {}", current.id, next.id);
                    path.push(current.id.clone());
                    current = next;
                }
                None => {
                    if current.is_standard() {
                        if let Some(slot_id) = self.extend_zone(current, occupied).await? {
                            return Ok(Some(SlotPlacement {
                                slot_id,
                                zone_id: current.id.clone(),
                                is_overflow: !path.is_empty(),
                                overflow_path: path,
                                new_allocation: false,
                            }));
                        }
                    }
                    path.push(current.id.clone());
                    break;
                }
            }
        }

        if options.allow_fallback {
            if let Some(fallback) = self.registry.fallback() {
                if !visited.contains(fallback.id.as_str()) {
                    if let Some((slot_id, _)) = self.search_zone(fallback, occupied, wine, options).await? {
                        info!("Chain from {} exhausted, using {}", zone_id, fallback.id);
                        return Ok(Some(SlotPlacement {
                            slot_id,
                            zone_id: fallback.id.clone(),
                            is_overflow: true,
                            overflow_path: path,
                            new_allocation: false,
                        }));
                    }
                }
            }
        }

        warn!("No free slot for zone {} (tried {})", zone_id, path.join(" -> "));
        Ok(None)
    }

    /// Overflow zone to try next, if the hop is allowed
    fn next_hop(&self, zone: &Zone, visited: &HashSet<&str>, wine: Option<&Wine>, options: PlacementOptions) -> Option<&Zone> {
        let next_id = zone.overflow_zone_id.as_deref()?;
        if visited.contains(next_id) {
            debug!("Overflow from {} back to {} stopped, zone already visited", zone.id, next_id);
            return None;
        }
        let next = self.registry.get(next_id)?;
        if next.kind == ZoneKind::Fallback {
            return None;
        }
        if options.enforce_affinity && !self.policy.is_sensible(zone, next, wine) {
            debug!("Overflow from {} to {} rejected by affinity policy", zone.id, next.id);
            return None;
        }
        Some(next)
    }

    async fn search_zone(
        &self,
        zone: &Zone,
        occupied: &HashSet<SlotId>,
        wine: Option<&Wine>,
        options: PlacementOptions,
    ) -> Result<Option<(SlotId, bool)>> {
        match zone.kind {
            ZoneKind::Standard => {
                let (rows, new_allocation) = self
                    .store
                    .ensure_first_row(&zone.id, &zone.preferred_rows, self.layout.rows, &self.full_rows(occupied))
                    .await?;
                Ok(self.first_free(&rows, occupied).map(|slot| (slot, new_allocation)))
            }
            ZoneKind::Buffer => {
                let rows: Vec<u32> = if options.enforce_affinity {
                    let owners = row_owners(&self.store.active_allocations().await?);
                    zone.preferred_rows
                        .iter()
                        .copied()
                        .filter(|row| owners.get(row).map_or(true, |owner| *owner == zone.id))
                        .collect()
                } else {
                    zone.preferred_rows.clone()
                };
                Ok(self.first_free(&rows, occupied).map(|slot| (slot, false)))
            }
            ZoneKind::Fallback | ZoneKind::Curated => {
                let rows = self.catch_all_rows(wine);
                Ok(self.first_free(&rows, occupied).map(|slot| (slot, false)))
            }
        }
    }

    /// Bind one more row to a full standard zone and take its first free slot
    async fn extend_zone(&self, zone: &Zone, occupied: &HashSet<SlotId>) -> Result<Option<SlotId>> {
        let full = self.full_rows(occupied);
        match self.store.allocate_row(&zone.id, &zone.preferred_rows, self.layout.rows, &full).await {
            Ok(row) => Ok(self.first_free(&[row], occupied)),
            Err(CellariumError::AllocationExhausted { .. }) => {
                debug!("No free row left to extend zone {}", zone.id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Whole-cellar row order, the wine's colour-family rows first
    fn catch_all_rows(&self, wine: Option<&Wine>) -> Vec<u32> {
        let mut rows: Vec<u32> = match wine.and_then(Wine::colour_family) {
            Some(family) => self.layout.rows_for_family(family).to_vec(),
            None => Vec::new(),
        };
        for row in self.layout.row_numbers() {
            if !rows.contains(&row) {
                rows.push(row);
            }
        }
        rows
    }

    /// Rows with no empty slot, which must never be bound to a zone
    fn full_rows(&self, occupied: &HashSet<SlotId>) -> BTreeSet<u32> {
        self.layout
            .row_numbers()
            .filter(|row| self.layout.slots_in_row(*row).all(|slot| occupied.contains(&slot)))
            .collect()
    }

    fn first_free(&self, rows: &[u32], occupied: &HashSet<SlotId>) -> Option<SlotId> {
        rows.iter()
            .flat_map(|row| self.layout.slots_in_row(*row))
            .find(|slot| !occupied.contains(slot))
    }

    /// Classify a new bottle, find it a slot and count it against its zone
    ///
    /// `zone_override` skips the matcher's choice of target zone.
    pub async fn place_bottle(
        &self,
        matcher: &ZoneMatcher,
        raw: &RawWine,
        occupied: &HashSet<SlotId>,
        zone_override: Option<&str>,
        options: PlacementOptions,
    ) -> Result<PlacementOutcome> {
        let wine = normalize(raw);
        let zone_match = matcher.find_best_zone(&wine);
        let target_zone_id = zone_override.unwrap_or(&zone_match.zone_id).to_string();

        let placement = self
            .find_available_slot(&target_zone_id, occupied, Some(&wine), options)
            .await?;

        match &placement {
            Some(p) => {
                if !p.new_allocation {
                    self.store.adjust_wine_count(&p.zone_id, 1).await?;
                }
                info!("Placed wine {} in {} ({})", wine.id, p.slot_id, p.zone_id);
            }
            None => warn!("Wine {} needs manual placement", wine.id),
        }

        Ok(PlacementOutcome {
            wine_id: wine.id,
            zone_match,
            target_zone_id,
            placement,
        })
    }

    /// Record a bottle leaving a zone; the zone's rows are released at zero
    pub async fn remove_bottle(&self, zone_id: &str) -> Result<u32> {
        self.registry.require(zone_id)?;
        let remaining = self.store.adjust_wine_count(zone_id, -1).await?;
        debug!("Zone {} now holds {} bottles", zone_id, remaining);
        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::{InMemoryAllocationStore, ZoneAllocation};
    use crate::config::MatchingConfig;
    use crate::wine::Colour;
    use crate::zones::ZoneRules;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    fn white_zone(id: &str, rows: &[u32], overflow: Option<&str>) -> Zone {
        Zone {
            id: id.to_string(),
            name: id.to_string(),
            kind: ZoneKind::Standard,
            rules: ZoneRules {
                colours: vec![Colour::White],
                grapes: vec!["chardonnay".to_string()],
                ..Default::default()
            },
            preferred_rows: rows.to_vec(),
            overflow_zone_id: overflow.map(str::to_string),
        }
    }

    fn allocator(zones: Vec<Zone>, rows: u32) -> SlotAllocator {
        SlotAllocator::new(
            Arc::new(ZoneRegistry::new(zones).unwrap()),
            CellarLayout::uniform(rows),
            OverflowPolicy::default(),
            Arc::new(InMemoryAllocationStore::new()),
        )
    }

    fn full_row(row: u32) -> HashSet<SlotId> {
        (1..=9).map(|col| SlotId::cellar(row, col)).collect()
    }

    /// Hands control back to the scheduler before every store call
    struct YieldingStore {
        inner: InMemoryAllocationStore,
    }

    #[async_trait]
    impl ZoneAllocationStore for YieldingStore {
        async fn rows_for_zone(&self, zone_id: &str) -> Result<Vec<u32>> {
            tokio::task::yield_now().await;
            self.inner.rows_for_zone(zone_id).await
        }

        async fn ensure_first_row(
            &self,
            zone_id: &str,
            preferred: &[u32],
            total_rows: u32,
            full_rows: &BTreeSet<u32>,
        ) -> Result<(Vec<u32>, bool)> {
            tokio::task::yield_now().await;
            self.inner.ensure_first_row(zone_id, preferred, total_rows, full_rows).await
        }

        async fn allocate_row(
            &self,
            zone_id: &str,
            preferred: &[u32],
            total_rows: u32,
            full_rows: &BTreeSet<u32>,
        ) -> Result<u32> {
            tokio::task::yield_now().await;
            self.inner.allocate_row(zone_id, preferred, total_rows, full_rows).await
        }

        async fn wine_count(&self, zone_id: &str) -> Result<u32> {
            tokio::task::yield_now().await;
            self.inner.wine_count(zone_id).await
        }

        async fn adjust_wine_count(&self, zone_id: &str, delta: i64) -> Result<u32> {
            tokio::task::yield_now().await;
            self.inner.adjust_wine_count(zone_id, delta).await
        }

        async fn release_zone(&self, zone_id: &str) -> Result<bool> {
            tokio::task::yield_now().await;
            self.inner.release_zone(zone_id).await
        }

        async fn active_allocations(&self) -> Result<BTreeMap<String, ZoneAllocation>> {
            tokio::task::yield_now().await;
            self.inner.active_allocations().await
        }
    }

    #[tokio::test]
    async fn test_first_placement_binds_preferred_row() {
        let allocator = allocator(vec![white_zone("a", &[2], None)], 3);
        let placement = allocator
            .find_available_slot("a", &HashSet::new(), None, PlacementOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(placement.slot_id, SlotId::cellar(2, 1));
        assert!(placement.new_allocation);
        assert!(!placement.is_overflow);
        assert_eq!(allocator.store().rows_for_zone("a").await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_skips_occupied_columns() {
        let allocator = allocator(vec![white_zone("a", &[1], None)], 2);
        let occupied: HashSet<SlotId> = [SlotId::cellar(1, 1), SlotId::cellar(1, 2)].into();
        let placement = allocator
            .find_available_slot("a", &occupied, None, PlacementOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(placement.slot_id, SlotId::cellar(1, 3));
    }

    #[tokio::test]
    async fn test_full_zone_spills_into_overflow_zone() {
        let allocator = allocator(
            vec![white_zone("a", &[1], Some("b")), white_zone("b", &[2], None)],
            3,
        );
        allocator.store().allocate_row("a", &[1], 3, &BTreeSet::new()).await.unwrap();

        let placement = allocator
            .find_available_slot("a", &full_row(1), None, PlacementOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(placement.zone_id, "b");
        assert_eq!(placement.slot_id, SlotId::cellar(2, 1));
        assert!(placement.is_overflow);
        assert_eq!(placement.overflow_path, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_zone_without_overflow_grows_by_a_row() {
        let allocator = allocator(vec![white_zone("a", &[1, 2], None)], 3);
        allocator.store().allocate_row("a", &[1], 3, &BTreeSet::new()).await.unwrap();

        let placement = allocator
            .find_available_slot("a", &full_row(1), None, PlacementOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(placement.slot_id, SlotId::cellar(2, 1));
        assert!(!placement.is_overflow);
        assert_eq!(allocator.store().rows_for_zone("a").await.unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_overflow_cycle_terminates() {
        let allocator = allocator(
            vec![white_zone("a", &[1], Some("b")), white_zone("b", &[2], Some("a"))],
            2,
        );
        allocator.store().allocate_row("a", &[1], 2, &BTreeSet::new()).await.unwrap();
        allocator.store().allocate_row("b", &[2], 2, &BTreeSet::new()).await.unwrap();

        let occupied: HashSet<SlotId> = full_row(1).union(&full_row(2)).copied().collect();
        let options = PlacementOptions {
            allow_fallback: false,
            enforce_affinity: true,
        };
        let result = allocator.find_available_slot("a", &occupied, None, options).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_first_row_allocation_exhaustion_is_an_error() {
        let allocator = allocator(vec![white_zone("a", &[1], None), white_zone("b", &[1], None)], 1);
        allocator.store().allocate_row("a", &[1], 1, &BTreeSet::new()).await.unwrap();

        let err = allocator
            .find_available_slot("b", &HashSet::new(), None, PlacementOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CellariumError::AllocationExhausted { .. }));
    }

    #[tokio::test]
    async fn test_free_rows_full_of_bottles_are_not_bound() {
        let allocator = allocator(
            vec![white_zone("a", &[1], Some("b")), white_zone("b", &[2], None)],
            2,
        );
        allocator.store().allocate_row("b", &[2], 2, &BTreeSet::new()).await.unwrap();

        let placement = allocator
            .find_available_slot("a", &full_row(1), None, PlacementOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(placement.zone_id, "b");
        assert_eq!(placement.slot_id, SlotId::cellar(2, 1));
        assert!(!placement.new_allocation);

        assert!(allocator.store().rows_for_zone("a").await.unwrap().is_empty());
        assert_eq!(allocator.store().wine_count("a").await.unwrap(), 0);
        assert!(!allocator.store().active_allocations().await.unwrap().contains_key("a"));
    }

    #[tokio::test]
    async fn test_growth_skips_full_rows() {
        let allocator = allocator(vec![white_zone("a", &[1, 2], None)], 3);
        allocator.store().allocate_row("a", &[1], 3, &BTreeSet::new()).await.unwrap();
        let mut occupied = full_row(1);
        occupied.extend(full_row(2));

        let placement = allocator
            .find_available_slot("a", &occupied, None, PlacementOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(placement.slot_id, SlotId::cellar(3, 1));
        assert_eq!(allocator.store().rows_for_zone("a").await.unwrap(), vec![1, 3]);

        // nothing left to grow into: the zone keeps its single row
        occupied.extend(full_row(3));
        let strict = PlacementOptions {
            allow_fallback: false,
            enforce_affinity: true,
        };
        assert!(allocator.find_available_slot("a", &occupied, None, strict).await.unwrap().is_none());
        assert_eq!(allocator.store().rows_for_zone("a").await.unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_concurrent_first_placements_share_one_binding() {
        let registry = Arc::new(ZoneRegistry::builtin());
        let matcher = ZoneMatcher::new(registry.clone(), MatchingConfig::default());
        let allocator = SlotAllocator::new(
            registry,
            CellarLayout::default(),
            OverflowPolicy::default(),
            Arc::new(YieldingStore {
                inner: InMemoryAllocationStore::new(),
            }),
        );
        let barolo = RawWine {
            id: 1,
            name: "Barolo".to_string(),
            colour: Some("red".to_string()),
            grapes: Some("Nebbiolo".to_string()),
            region: Some("Piedmont".to_string()),
            ..Default::default()
        };
        let barbaresco = RawWine {
            id: 2,
            name: "Barbaresco".to_string(),
            ..barolo.clone()
        };
        let occupied = HashSet::new();
        let options = PlacementOptions::default();

        let (x, y) = tokio::join!(
            allocator.place_bottle(&matcher, &barolo, &occupied, None, options),
            allocator.place_bottle(&matcher, &barbaresco, &occupied, None, options),
        );
        let (x, y) = (x.unwrap().placement.unwrap(), y.unwrap().placement.unwrap());
        assert_eq!(x.zone_id, "piedmont");
        assert_eq!(y.zone_id, "piedmont");
        assert!(x.new_allocation != y.new_allocation);

        assert_eq!(allocator.store().rows_for_zone("piedmont").await.unwrap(), vec![12]);
        assert_eq!(allocator.store().wine_count("piedmont").await.unwrap(), 2);

        assert_eq!(allocator.remove_bottle("piedmont").await.unwrap(), 1);
        assert_eq!(allocator.store().rows_for_zone("piedmont").await.unwrap(), vec![12]);
    }

    #[tokio::test]
    async fn test_unknown_zone_is_an_error() {
        let allocator = allocator(vec![white_zone("a", &[1], None)], 1);
        let err = allocator
            .find_available_slot("nope", &HashSet::new(), None, PlacementOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CellariumError::UnknownZone(_)));
    }

    #[tokio::test]
    async fn test_buffer_skips_rows_of_other_zones() {
        let mut buffer = white_zone("buffer", &[1, 2], None);
        buffer.kind = ZoneKind::Buffer;
        let allocator = allocator(vec![white_zone("a", &[1], None), buffer], 2);
        allocator.store().allocate_row("a", &[1], 2, &BTreeSet::new()).await.unwrap();

        let placement = allocator
            .find_available_slot("buffer", &HashSet::new(), None, PlacementOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(placement.slot_id, SlotId::cellar(2, 1));

        let relaxed = PlacementOptions {
            allow_fallback: true,
            enforce_affinity: false,
        };
        let placement = allocator
            .find_available_slot("buffer", &HashSet::new(), None, relaxed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(placement.slot_id, SlotId::cellar(1, 1));
    }

    #[tokio::test]
    async fn test_fallback_prefers_colour_family_rows() {
        let registry = Arc::new(ZoneRegistry::builtin());
        let allocator = SlotAllocator::new(
            registry,
            CellarLayout::default(),
            OverflowPolicy::default(),
            Arc::new(InMemoryAllocationStore::new()),
        );
        let red = normalize(&RawWine {
            id: 1,
            name: "Mystery Red".to_string(),
            colour: Some("red".to_string()),
            ..Default::default()
        });
        let placement = allocator
            .find_available_slot("unclassified", &HashSet::new(), Some(&red), PlacementOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(placement.slot_id, SlotId::cellar(8, 1));

        let unknown = allocator
            .find_available_slot("unclassified", &HashSet::new(), None, PlacementOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unknown.slot_id, SlotId::cellar(1, 1));
    }

    #[tokio::test]
    async fn test_exhausted_chain_reaches_fallback_only_when_allowed() {
        let mut fallback = white_zone("unclassified", &[], None);
        fallback.kind = ZoneKind::Fallback;
        fallback.rules = ZoneRules::default();
        let allocator = allocator(vec![white_zone("a", &[1], None), fallback], 2);
        allocator.store().allocate_row("a", &[1], 2, &BTreeSet::new()).await.unwrap();
        // row 2 is taken by a zone outside this registry
        allocator.store().allocate_row("elsewhere", &[2], 2, &BTreeSet::new()).await.unwrap();

        let mut occupied = full_row(1);
        occupied.insert(SlotId::cellar(2, 1));

        let placement = allocator
            .find_available_slot("a", &occupied, None, PlacementOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(placement.zone_id, "unclassified");
        assert_eq!(placement.slot_id, SlotId::cellar(2, 2));
        assert!(placement.is_overflow);
        assert_eq!(placement.overflow_path, vec!["a".to_string()]);

        let strict = PlacementOptions {
            allow_fallback: false,
            enforce_affinity: true,
        };
        assert!(allocator.find_available_slot("a", &occupied, None, strict).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_place_and_remove_bottle_bookkeeping() {
        let registry = Arc::new(ZoneRegistry::builtin());
        let matcher = ZoneMatcher::new(registry.clone(), MatchingConfig::default());
        let allocator = SlotAllocator::new(
            registry,
            CellarLayout::default(),
            OverflowPolicy::default(),
            Arc::new(InMemoryAllocationStore::new()),
        );
        let raw = RawWine {
            id: 11,
            name: "Barolo Riserva".to_string(),
            colour: Some("red".to_string()),
            grapes: Some("Nebbiolo".to_string()),
            region: Some("Piedmont".to_string()),
            ..Default::default()
        };

        let first = allocator
            .place_bottle(&matcher, &raw, &HashSet::new(), None, PlacementOptions::default())
            .await
            .unwrap();
        let slot = first.placement.as_ref().unwrap().slot_id;
        assert_eq!(first.target_zone_id, "piedmont");
        assert_eq!(slot, SlotId::cellar(12, 1));

        let occupied: HashSet<SlotId> = [slot].into();
        let second = allocator
            .place_bottle(&matcher, &raw, &occupied, None, PlacementOptions::default())
            .await
            .unwrap();
        assert_eq!(second.placement.unwrap().slot_id, SlotId::cellar(12, 2));
        assert_eq!(allocator.store().wine_count("piedmont").await.unwrap(), 2);

        assert_eq!(allocator.remove_bottle("piedmont").await.unwrap(), 1);
        assert_eq!(allocator.remove_bottle("piedmont").await.unwrap(), 0);
        assert!(allocator.store().rows_for_zone("piedmont").await.unwrap().is_empty());
    }
}
