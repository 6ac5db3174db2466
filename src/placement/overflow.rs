// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! When a full zone may spill into its overflow zone

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::wine::{ColourFamily, Wine};
use crate::zones::{Zone, ZoneKind};

/// Checks applied to an overflow hop while affinity is enforced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverflowPolicy {
    /// Source and destination must share a colour family
    pub require_colour_overlap: bool,
    /// Non-buffer destinations must share a grape, country, region,
    /// appellation or keyword with the source
    pub require_shared_criterion: bool,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        Self {
            require_colour_overlap: true,
            require_shared_criterion: true,
        }
    }
}

impl OverflowPolicy {
    /// Whether spilling from `from` into `to` keeps like with like
    ///
    /// The fallback zone is never a sensible target. A zone without declared
    /// colours borrows the wine's colour family.
    pub fn is_sensible(&self, from: &Zone, to: &Zone, wine: Option<&Wine>) -> bool {
        if to.kind == ZoneKind::Fallback {
            return false;
        }

        if self.require_colour_overlap {
            let wine_family = wine.and_then(Wine::colour_family);
            let families = |zone: &Zone| -> BTreeSet<ColourFamily> {
                let declared = zone.colour_families();
                if declared.is_empty() {
                    wine_family.into_iter().collect()
                } else {
                    declared
                }
            };
            let (source, destination) = (families(from), families(to));
            if !source.is_empty() && !destination.is_empty() && source.is_disjoint(&destination) {
                return false;
            }
        }

        if self.require_shared_criterion
            && to.kind != ZoneKind::Buffer
            && from.criterion_tokens().is_disjoint(&to.criterion_tokens())
        {
            return false;
        }

        true
    }
}
