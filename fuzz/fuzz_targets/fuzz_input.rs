// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use cellarium::slots::{expand_location_range, CellarLayout, SlotId};
use cellarium::wine::{normalize, RawWine};

#[derive(Arbitrary, Debug)]
struct Input {
    slot: String,
    range_end: Option<String>,
    name: String,
    colour: Option<String>,
    grapes: Option<String>,
    region: Option<String>,
    notes: Option<String>,
}

fuzz_target!(|input: Input| {
    if let Ok(slot) = input.slot.parse::<SlotId>() {
        // parsing is the inverse of display
        assert_eq!(slot.to_string().parse::<SlotId>().ok(), Some(slot));
        let _ = CellarLayout::default().contains(&slot);
    }
    // skip huge fridge ranges
    let short_end = input.range_end.as_deref().map_or(true, |e| e.len() <= 4);
    if input.slot.len() <= 4 && short_end {
        if let Ok(slots) = expand_location_range(&input.slot, input.range_end.as_deref()) {
            assert!(!slots.is_empty());
        }
    }

    let wine = normalize(&RawWine {
        id: 1,
        name: input.name,
        colour: input.colour,
        grapes: input.grapes,
        region: input.region,
        notes: input.notes,
        ..Default::default()
    });
    assert!(wine.grapes.len() == wine.grape_shares.len());
});
