// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Zone matching
//!
//! Scores a normalized wine against every standard zone's rule set. Each rule
//! category a zone declares adds its weight to the points possible, and to the
//! points earned when the wine satisfies it. Colour, exclusions and the grape
//! thresholds are hard gates that force a score of 0.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::MatchingConfig;
use crate::wine::Wine;
use crate::zones::{Zone, ZoneKind, ZoneRegistry, UNCLASSIFIED_ZONE_ID};

/// Strength of a zone recommendation, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Move priority: 1 for high confidence through 3 for low
    pub fn priority(&self) -> u8 {
        match self {
            Confidence::High => 1,
            Confidence::Medium => 2,
            Confidence::Low => 3,
        }
    }

    /// Whether this confidence is at least `min`
    pub fn at_least(&self, min: Confidence) -> bool {
        *self <= min
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        })
    }
}

/// Score of one zone for one wine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneScore {
    pub zone_id: String,
    pub zone_name: String,
    /// 0-100
    pub score: u8,
    /// Criteria the wine satisfied, e.g. `grape:shiraz`
    pub matched: Vec<String>,
    /// Why the zone was ruled out, when it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disqualified: Option<String>,
}

/// Result of classifying a wine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneMatch {
    pub zone_id: String,
    pub zone_name: String,
    pub confidence: Confidence,
    pub score: u8,
    pub reason: String,
    pub matched: Vec<String>,
    /// Next best zones, for manual override
    pub alternatives: Vec<ZoneScore>,
    pub requires_review: bool,
}

/// Number of runner-up zones reported with a match
pub const MAX_ALTERNATIVES: usize = 3;

/// Scores wines against the zone registry
#[derive(Debug, Clone)]
pub struct ZoneMatcher {
    registry: Arc<ZoneRegistry>,
    config: MatchingConfig,
}

impl ZoneMatcher {
    pub fn new(registry: Arc<ZoneRegistry>, config: MatchingConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    /// Score a single zone against a wine
    pub fn score_zone(&self, zone: &Zone, wine: &Wine) -> ZoneScore {
        let rules = &zone.rules;
        let weights = &self.config.weights;

        let disqualify = |reason: String| ZoneScore {
            zone_id: zone.id.clone(),
            zone_name: zone.name.clone(),
            score: 0,
            matched: Vec::new(),
            disqualified: Some(reason),
        };

        if let Some(keyword) = rules.exclude_keywords.iter().find(|k| wine.mentions(k)) {
            return disqualify(format!("excluded keyword '{}'", keyword));
        }
        if let Some(region) = rules.exclude_regions.iter().find(|r| {
            wine.region.as_deref() == Some(r.as_str()) || wine.appellation.as_deref() == Some(r.as_str())
        }) {
            return disqualify(format!("excluded region '{}'", region));
        }
        if let Some(tag) = rules.exclude_winemaking.iter().find(|t| wine.has_winemaking(t)) {
            return disqualify(format!("excluded winemaking '{}'", tag));
        }

        let mut possible = 0u32;
        let mut earned = 0u32;
        let mut matched = Vec::new();

        if !rules.colours.is_empty() {
            possible += weights.colour;
            match wine.colour {
                Some(colour) if rules.colours.contains(&colour) => {
                    earned += weights.colour;
                    matched.push(format!("colour:{}", colour));
                }
                Some(colour) => return disqualify(format!("colour {} not allowed", colour)),
                None => {}
            }
        }

        if !rules.grapes.is_empty() {
            possible += weights.grape;
            let hits: Vec<&str> = rules
                .grapes
                .iter()
                .filter(|g| wine.has_grape(g))
                .map(String::as_str)
                .collect();
            if !hits.is_empty() {
                earned += weights.grape;
                matched.push(format!("grape:{}", hits.join("+")));
            }

            if let Some(min) = rules.min_grape_percent {
                if let (Some(dominant), Some(percent)) = (wine.dominant_grape(), wine.dominant_percent()) {
                    if rules.grapes.iter().any(|g| g == dominant) && percent < min {
                        return disqualify(format!("{} at {}% is below {}%", dominant, percent, min));
                    }
                }
            }
        }

        if let Some(min_count) = rules.min_grape_count {
            if wine.grapes.len() < min_count {
                return disqualify(format!("needs at least {} grapes", min_count));
            }
        }

        if !rules.keywords.is_empty() {
            possible += weights.keyword;
            if let Some(keyword) = rules.keywords.iter().find(|k| wine.mentions(k)) {
                earned += weights.keyword;
                matched.push(format!("keyword:{}", keyword));
            }
        }

        if !rules.countries.is_empty() {
            possible += weights.country;
            if let Some(country) = wine.country.as_ref().filter(|c| rules.countries.contains(c)) {
                earned += weights.country;
                matched.push(format!("country:{}", country));
            }
        }

        if !rules.regions.is_empty() {
            possible += weights.region;
            let hit = rules.regions.iter().find(|r| {
                wine.region.as_deref() == Some(r.as_str()) || wine.appellation.as_deref() == Some(r.as_str())
            });
            if let Some(region) = hit {
                earned += weights.region;
                matched.push(format!("region:{}", region));
            }
        }

        if !rules.appellations.is_empty() {
            possible += weights.appellation;
            let hit = rules
                .appellations
                .iter()
                .find(|a| wine.appellation.as_deref() == Some(a.as_str()) || wine.mentions(a));
            if let Some(appellation) = hit {
                earned += weights.appellation;
                matched.push(format!("appellation:{}", appellation));
            }
        }

        if !rules.winemaking.is_empty() {
            possible += weights.winemaking;
            if let Some(tag) = rules.winemaking.iter().find(|t| wine.has_winemaking(t)) {
                earned += weights.winemaking;
                matched.push(format!("winemaking:{}", tag));
            }
        }

        let score = if possible == 0 {
            0
        } else {
            ((earned as f64 / possible as f64) * 100.0).round().min(100.0) as u8
        };

        ZoneScore {
            zone_id: zone.id.clone(),
            zone_name: zone.name.clone(),
            score,
            matched,
            disqualified: None,
        }
    }

    /// Non-zero scores of every standard zone, best first
    ///
    /// Ties keep registry priority order.
    pub fn rank_zones(&self, wine: &Wine) -> Vec<ZoneScore> {
        let mut scored: Vec<ZoneScore> = self
            .registry
            .iter()
            .filter(|z| z.kind == ZoneKind::Standard)
            .map(|z| self.score_zone(z, wine))
            .filter(|s| s.score > 0)
            .collect();
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored
    }

    /// Confidence of a top score given the runner-up
    pub fn confidence_for(&self, top: u8, runner_up: Option<u8>) -> Confidence {
        let clear_winner = runner_up.map_or(true, |second| top.saturating_sub(second) >= self.config.clear_winner_margin);
        if top >= self.config.high_threshold && clear_winner {
            Confidence::High
        } else if top >= self.config.medium_threshold {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Pick the best zone for a wine
    pub fn find_best_zone(&self, wine: &Wine) -> ZoneMatch {
        let ranked = self.rank_zones(wine);

        let Some(top) = ranked.first() else {
            return self.fallback_match(wine);
        };

        let confidence = self.confidence_for(top.score, ranked.get(1).map(|s| s.score));
        let reason = format!(
            "{} matched on {} (score {})",
            top.zone_name,
            top.matched.join(", "),
            top.score
        );

        ZoneMatch {
            zone_id: top.zone_id.clone(),
            zone_name: top.zone_name.clone(),
            confidence,
            score: top.score,
            reason,
            matched: top.matched.clone(),
            alternatives: ranked.iter().skip(1).take(MAX_ALTERNATIVES).cloned().collect(),
            requires_review: confidence == Confidence::Low,
        }
    }

    fn fallback_match(&self, wine: &Wine) -> ZoneMatch {
        if let Some(curated) = self.registry.curated() {
            let candidate = self.score_zone(curated, wine);
            if candidate.score > self.config.curiosity_min_score {
                tracing::debug!("Wine {} matched no standard zone, using {}", wine.id, curated.id);
                return ZoneMatch {
                    zone_id: candidate.zone_id,
                    zone_name: candidate.zone_name.clone(),
                    confidence: Confidence::Medium,
                    score: candidate.score,
                    reason: format!(
                        "No standard zone matched; {} fits on {}",
                        candidate.zone_name,
                        candidate.matched.join(", ")
                    ),
                    matched: candidate.matched,
                    alternatives: Vec::new(),
                    requires_review: true,
                };
            }
        }

        // the registry's own fallback zone, whatever its id
        let (zone_id, zone_name) = match self.registry.fallback() {
            Some(zone) => (zone.id.clone(), zone.name.clone()),
            None => (UNCLASSIFIED_ZONE_ID.to_string(), "Unclassified".to_string()),
        };
        ZoneMatch {
            zone_id,
            zone_name,
            confidence: Confidence::Low,
            score: 0,
            reason: "No zone matched; manual classification needed".to_string(),
            matched: Vec::new(),
            alternatives: Vec::new(),
            requires_review: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryWeights;
    use crate::wine::{normalize, Colour, RawWine};
    use crate::zones::{ZoneRules, CURIOSITIES_ZONE_ID};

    fn wine(colour: Option<Colour>, grapes: &[&str]) -> Wine {
        Wine {
            id: 1,
            name: "Test".to_string(),
            vintage: None,
            colour,
            grapes: grapes.iter().map(|g| g.to_string()).collect(),
            grape_shares: Vec::new(),
            winemaking: Vec::new(),
            country: None,
            region: None,
            appellation: None,
            search_text: String::new(),
        }
    }

    fn chardonnay_zone() -> Zone {
        Zone {
            id: "chardonnay".to_string(),
            name: "Chardonnay".to_string(),
            kind: ZoneKind::Standard,
            rules: ZoneRules {
                colours: vec![Colour::White],
                grapes: vec!["chardonnay".to_string()],
                ..Default::default()
            },
            preferred_rows: vec![],
            overflow_zone_id: None,
        }
    }

    fn matcher_with(zones: Vec<Zone>, weights: CategoryWeights) -> ZoneMatcher {
        let config = MatchingConfig {
            weights,
            ..Default::default()
        };
        ZoneMatcher::new(Arc::new(ZoneRegistry::new(zones).unwrap()), config)
    }

    fn builtin_matcher() -> ZoneMatcher {
        ZoneMatcher::new(Arc::new(ZoneRegistry::builtin()), MatchingConfig::default())
    }

    #[test]
    fn test_white_chardonnay_scores_full_marks() {
        let weights = CategoryWeights {
            colour: 40,
            grape: 60,
            ..Default::default()
        };
        let matcher = matcher_with(vec![chardonnay_zone()], weights);
        let zone = chardonnay_zone();

        let white = matcher.score_zone(&zone, &wine(Some(Colour::White), &["chardonnay"]));
        assert_eq!(white.score, 100);

        let red = matcher.score_zone(&zone, &wine(Some(Colour::Red), &["chardonnay"]));
        assert_eq!(red.score, 0);
        assert!(red.disqualified.is_some());
    }

    #[test]
    fn test_unknown_colour_is_not_disqualified() {
        let matcher = matcher_with(vec![chardonnay_zone()], CategoryWeights::default());
        let score = matcher.score_zone(&chardonnay_zone(), &wine(None, &["chardonnay"]));
        // grape 35 of colour 10 + grape 35
        assert_eq!(score.score, 78);
    }

    #[test]
    fn test_colour_gate_holds_for_every_builtin_zone() {
        let matcher = builtin_matcher();
        let colours = [
            Colour::Red, Colour::White, Colour::Rose, Colour::Sparkling, Colour::Fortified, Colour::Dessert,
        ];
        for zone in matcher.registry().iter() {
            for colour in colours {
                let mut w = wine(Some(colour), &["shiraz", "chardonnay"]);
                w.search_text = "champagne rioja port".to_string();
                let score = matcher.score_zone(zone, &w);
                assert!(score.score <= 100);
                if !zone.colours().is_empty() && !zone.colours().contains(&colour) {
                    assert_eq!(score.score, 0, "{} accepted {}", zone.id, colour);
                }
            }
        }
    }

    #[test]
    fn test_zone_without_rules_scores_zero() {
        let mut empty = chardonnay_zone();
        empty.rules = ZoneRules::default();
        let matcher = matcher_with(vec![empty.clone()], CategoryWeights::default());
        assert_eq!(matcher.score_zone(&empty, &wine(Some(Colour::White), &[])).score, 0);
    }

    #[test]
    fn test_min_grape_percent_disqualifies_minor_share() {
        let matcher = builtin_matcher();
        let shiraz = matcher.registry().get("shiraz").unwrap();
        let blend = normalize(&RawWine {
            id: 2,
            name: "Barossa GSM".to_string(),
            colour: Some("red".to_string()),
            grapes: Some("Shiraz 45%, Grenache 40%, Mourvedre 15%".to_string()),
            country: Some("Australia".to_string()),
            ..Default::default()
        });
        assert_eq!(matcher.score_zone(shiraz, &blend).score, 0);

        let varietal = normalize(&RawWine {
            id: 3,
            name: "Barossa Shiraz".to_string(),
            colour: Some("red".to_string()),
            grapes: Some("Shiraz 100%".to_string()),
            country: Some("Australia".to_string()),
            ..Default::default()
        });
        assert!(matcher.score_zone(shiraz, &varietal).score > 0);
    }

    #[test]
    fn test_min_grape_count_requires_blend() {
        let matcher = builtin_matcher();
        let blends = matcher.registry().get("new_world_blends").unwrap();
        let single = normalize(&RawWine {
            id: 4,
            name: "Kanonkop Pinotage".to_string(),
            colour: Some("red".to_string()),
            country: Some("South Africa".to_string()),
            ..Default::default()
        });
        assert_eq!(matcher.score_zone(blends, &single).score, 0);
    }

    #[test]
    fn test_exclusion_beats_matches() {
        let matcher = builtin_matcher();
        let southern = matcher.registry().get("southern_italy").unwrap();
        let mut w = wine(Some(Colour::Red), &["primitivo"]);
        w.region = Some("puglia".to_string());
        w.winemaking = vec!["appassimento".to_string()];
        assert_eq!(matcher.score_zone(southern, &w).score, 0);
    }

    #[test]
    fn test_confidence_rules() {
        let matcher = builtin_matcher();
        assert_eq!(matcher.confidence_for(80, None), Confidence::High);
        assert_eq!(matcher.confidence_for(80, Some(65)), Confidence::High);
        assert_eq!(matcher.confidence_for(80, Some(70)), Confidence::Medium);
        assert_eq!(matcher.confidence_for(50, None), Confidence::Medium);
        assert_eq!(matcher.confidence_for(30, None), Confidence::Low);
    }

    #[test]
    fn test_best_zone_for_marlborough_sauvignon() {
        let matcher = builtin_matcher();
        let w = normalize(&RawWine {
            id: 5,
            name: "Cloudy Bay Sauvignon Blanc".to_string(),
            region: Some("Marlborough".to_string()),
            ..Default::default()
        });
        let result = matcher.find_best_zone(&w);
        assert_eq!(result.zone_id, "sauvignon_blanc");
        assert_eq!(result.confidence, Confidence::High);
        assert!(!result.requires_review);
        assert!(result.alternatives.len() <= MAX_ALTERNATIVES);
        assert!(result.alternatives.iter().all(|a| a.score <= result.score));
    }

    #[test]
    fn test_unmatched_wine_is_unclassified() {
        let matcher = builtin_matcher();
        let w = normalize(&RawWine {
            id: 6,
            name: "Mystery Bottle".to_string(),
            ..Default::default()
        });
        let result = matcher.find_best_zone(&w);
        assert_eq!(result.zone_id, UNCLASSIFIED_ZONE_ID);
        assert_eq!(result.confidence, Confidence::Low);
        assert!(result.requires_review);
    }

    #[test]
    fn test_unmatched_wine_uses_registry_fallback_id() {
        let catch_all = Zone {
            id: "catch_all".to_string(),
            name: "Catch-all".to_string(),
            kind: ZoneKind::Fallback,
            rules: ZoneRules::default(),
            preferred_rows: vec![],
            overflow_zone_id: None,
        };
        let red = wine(Some(Colour::Red), &["nebbiolo"]);

        let matcher = matcher_with(vec![chardonnay_zone(), catch_all], CategoryWeights::default());
        let result = matcher.find_best_zone(&red);
        assert_eq!(result.zone_id, "catch_all");
        assert_eq!(result.zone_name, "Catch-all");
        assert!(result.requires_review);

        let bare = matcher_with(vec![chardonnay_zone()], CategoryWeights::default());
        assert_eq!(bare.find_best_zone(&red).zone_id, UNCLASSIFIED_ZONE_ID);
    }

    #[test]
    fn test_curiosity_needs_minimum_score() {
        let matcher = builtin_matcher();
        let orange = normalize(&RawWine {
            id: 7,
            name: "Georgian Qvevri Amber".to_string(),
            notes: Some("skin contact orange wine".to_string()),
            ..Default::default()
        });
        let result = matcher.find_best_zone(&orange);
        assert_eq!(result.zone_id, CURIOSITIES_ZONE_ID);
        assert_eq!(result.confidence, Confidence::Medium);
        assert!(result.requires_review);
    }

    #[test]
    fn test_priority_order_breaks_ties() {
        let mut first = chardonnay_zone();
        first.id = "first".to_string();
        let mut second = chardonnay_zone();
        second.id = "second".to_string();
        let matcher = matcher_with(vec![first, second], CategoryWeights::default());
        let result = matcher.find_best_zone(&wine(Some(Colour::White), &["chardonnay"]));
        assert_eq!(result.zone_id, "first");
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(result.alternatives[0].zone_id, "second");
    }
}
