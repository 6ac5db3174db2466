// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Built-in zone catalogue
//!
//! Whites, rosés, sparkling and sweet wines live in rows 1-7, reds and
//! fortified wines in rows 8-19. Order here is matching priority.

use super::{Zone, ZoneKind, ZoneRules, CURIOSITIES_ZONE_ID, UNCLASSIFIED_ZONE_ID};
use crate::wine::Colour;

struct ZoneBuilder(Zone);

fn zone(id: &str, name: &str) -> ZoneBuilder {
    ZoneBuilder(Zone {
        id: id.to_string(),
        name: name.to_string(),
        kind: ZoneKind::Standard,
        rules: ZoneRules::default(),
        preferred_rows: Vec::new(),
        overflow_zone_id: None,
    })
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl ZoneBuilder {
    fn kind(mut self, kind: ZoneKind) -> Self {
        self.0.kind = kind;
        self
    }

    fn colours(mut self, colours: &[Colour]) -> Self {
        self.0.rules.colours = colours.to_vec();
        self
    }

    fn grapes(mut self, grapes: &[&str]) -> Self {
        self.0.rules.grapes = strings(grapes);
        self
    }

    fn keywords(mut self, keywords: &[&str]) -> Self {
        self.0.rules.keywords = strings(keywords);
        self
    }

    fn countries(mut self, countries: &[&str]) -> Self {
        self.0.rules.countries = strings(countries);
        self
    }

    fn regions(mut self, regions: &[&str]) -> Self {
        self.0.rules.regions = strings(regions);
        self
    }

    fn appellations(mut self, appellations: &[&str]) -> Self {
        self.0.rules.appellations = strings(appellations);
        self
    }

    fn winemaking(mut self, tags: &[&str]) -> Self {
        self.0.rules.winemaking = strings(tags);
        self
    }

    fn exclude_keywords(mut self, keywords: &[&str]) -> Self {
        self.0.rules.exclude_keywords = strings(keywords);
        self
    }

    fn exclude_regions(mut self, regions: &[&str]) -> Self {
        self.0.rules.exclude_regions = strings(regions);
        self
    }

    fn exclude_winemaking(mut self, tags: &[&str]) -> Self {
        self.0.rules.exclude_winemaking = strings(tags);
        self
    }

    fn min_grape_percent(mut self, percent: f64) -> Self {
        self.0.rules.min_grape_percent = Some(percent);
        self
    }

    fn min_grape_count(mut self, count: usize) -> Self {
        self.0.rules.min_grape_count = Some(count);
        self
    }

    fn rows(mut self, rows: impl IntoIterator<Item = u32>) -> Self {
        self.0.preferred_rows = rows.into_iter().collect();
        self
    }

    fn overflow(mut self, zone_id: &str) -> Self {
        self.0.overflow_zone_id = Some(zone_id.to_string());
        self
    }

    fn build(self) -> Zone {
        self.0
    }
}

/// The default cellar zones
pub fn default_zones() -> Vec<Zone> {
    use Colour::*;

    vec![
        zone("sparkling", "Sparkling & Champagne")
            .colours(&[Sparkling])
            .keywords(&["champagne", "prosecco", "cava", "cremant", "franciacorta"])
            .winemaking(&["traditional method"])
            .rows([1, 2])
            .overflow("white_buffer")
            .build(),
        zone("rose", "Rosé")
            .colours(&[Rose])
            .keywords(&["rose", "rosado", "rosato"])
            .rows([1, 2])
            .overflow("white_buffer")
            .build(),
        zone("sauvignon_blanc", "Sauvignon Blanc")
            .colours(&[White])
            .grapes(&["sauvignon blanc"])
            .regions(&["loire", "marlborough", "bordeaux"])
            .appellations(&["sancerre", "pouilly fume"])
            .rows([2, 3])
            .overflow("white_buffer")
            .build(),
        zone("chenin_blanc", "Chenin Blanc")
            .colours(&[White])
            .grapes(&["chenin blanc"])
            .regions(&["loire", "western cape"])
            .appellations(&["vouvray", "savennieres"])
            .rows([3])
            .overflow("white_buffer")
            .build(),
        zone("aromatic_whites", "Aromatic Whites")
            .colours(&[White])
            .grapes(&[
                "riesling", "gewurztraminer", "viognier", "pinot gris", "gruner veltliner",
                "torrontes", "muscat",
            ])
            .regions(&["alsace", "mosel", "rheingau", "wachau"])
            .rows([4])
            .overflow("white_buffer")
            .build(),
        zone("chardonnay", "Chardonnay & White Burgundy")
            .colours(&[White])
            .grapes(&["chardonnay"])
            .regions(&["burgundy"])
            .appellations(&["chablis", "meursault"])
            .rows([5, 6])
            .overflow("white_buffer")
            .build(),
        zone("mediterranean_whites", "Iberian & Mediterranean Whites")
            .colours(&[White])
            .grapes(&[
                "albarino", "verdejo", "godello", "vermentino", "assyrtiko", "garganega", "fiano",
                "greco", "falanghina", "loureiro",
            ])
            .countries(&["spain", "portugal", "italy", "greece"])
            .rows([6])
            .overflow("white_buffer")
            .build(),
        zone("dessert_fortified", "Dessert & Fortified")
            .colours(&[Dessert, Fortified])
            .keywords(&["port", "sherry", "madeira", "sauternes", "tokaji", "late harvest"])
            .winemaking(&["botrytis", "late harvest", "solera"])
            .rows([7])
            .build(),
        zone("white_buffer", "White Buffer")
            .kind(ZoneKind::Buffer)
            .colours(&[White, Rose, Sparkling, Dessert])
            .rows(1..=7)
            .build(),
        zone("pinot_noir", "Pinot Noir & Gamay")
            .colours(&[Red])
            .grapes(&["pinot noir", "gamay"])
            .regions(&["burgundy", "beaujolais", "central otago"])
            .rows([8])
            .overflow("red_buffer")
            .build(),
        zone("rioja_ribera", "Rioja & Ribera del Duero")
            .colours(&[Red])
            .grapes(&["tempranillo", "grenache"])
            .countries(&["spain"])
            .appellations(&["rioja", "ribera del duero", "toro", "priorat"])
            .rows([9])
            .overflow("portugal")
            .build(),
        zone("portugal", "Portuguese Reds")
            .colours(&[Red])
            .grapes(&["touriga nacional", "tempranillo"])
            .countries(&["portugal"])
            .regions(&["douro", "alentejo", "dao"])
            .rows([10])
            .overflow("red_buffer")
            .build(),
        zone("appassimento", "Amarone & Appassimento")
            .colours(&[Red])
            .grapes(&["corvina", "rondinella"])
            .regions(&["veneto"])
            .winemaking(&["appassimento", "ripasso"])
            .rows([11])
            .overflow("red_buffer")
            .build(),
        zone("piedmont", "Piedmont")
            .colours(&[Red])
            .grapes(&["nebbiolo", "barbera", "dolcetto"])
            .regions(&["piedmont"])
            .countries(&["italy"])
            .appellations(&["barolo", "barbaresco", "langhe"])
            .rows([12])
            .overflow("central_italy")
            .build(),
        zone("central_italy", "Tuscany & Central Italy")
            .colours(&[Red])
            .grapes(&["sangiovese", "montepulciano"])
            .regions(&["tuscany", "emilia romagna", "abruzzo"])
            .countries(&["italy"])
            .rows([13])
            .overflow("southern_italy")
            .build(),
        zone("southern_italy", "Puglia & Southern Italy")
            .colours(&[Red])
            .grapes(&["primitivo", "negroamaro", "nero d'avola", "aglianico", "nerello mascalese"])
            .regions(&["puglia", "sicily", "campania"])
            .countries(&["italy"])
            .exclude_winemaking(&["appassimento"])
            .rows([14])
            .overflow("red_buffer")
            .build(),
        zone("rhone_south_france", "Rhône & Southern France")
            .colours(&[Red])
            .grapes(&["grenache", "shiraz", "mourvedre", "carignan", "cinsault"])
            .regions(&["rhone", "languedoc"])
            .countries(&["france"])
            .rows([15])
            .overflow("red_buffer")
            .build(),
        zone("shiraz", "Shiraz")
            .colours(&[Red])
            .grapes(&["shiraz"])
            .countries(&["australia", "south africa", "usa"])
            .exclude_regions(&["rhone"])
            .min_grape_percent(60.0)
            .rows([16])
            .overflow("rhone_south_france")
            .build(),
        zone("cabernet_bordeaux", "Cabernet & Bordeaux Blends")
            .colours(&[Red])
            .grapes(&["cabernet sauvignon", "merlot", "cabernet franc", "petit verdot"])
            .regions(&["bordeaux", "california", "south australia"])
            .appellations(&["pauillac", "margaux", "saint emilion", "pomerol"])
            .rows([17, 18])
            .overflow("red_buffer")
            .build(),
        zone("new_world_blends", "New World Red Blends")
            .colours(&[Red])
            .grapes(&["pinotage", "cabernet sauvignon", "shiraz", "merlot"])
            .countries(&["south africa", "australia", "usa", "chile", "argentina"])
            .min_grape_count(2)
            .rows([18])
            .overflow("red_buffer")
            .build(),
        zone("south_america", "Malbec & South America")
            .colours(&[Red])
            .grapes(&["malbec", "carmenere"])
            .countries(&["argentina", "chile"])
            .rows([19])
            .overflow("red_buffer")
            .build(),
        zone("red_buffer", "Red Buffer")
            .kind(ZoneKind::Buffer)
            .colours(&[Red, Fortified])
            .rows(8..=19)
            .build(),
        zone(CURIOSITIES_ZONE_ID, "Curiosities")
            .kind(ZoneKind::Curated)
            .grapes(&[
                "furmint", "sagrantino", "tannat", "blaufrankisch", "zweigelt", "lagrein", "mencia",
                "xarel lo",
            ])
            .keywords(&["orange", "amphora", "pet nat", "qvevri"])
            .winemaking(&["skin contact", "natural"])
            .exclude_keywords(&["orange muscat"])
            .build(),
        zone(UNCLASSIFIED_ZONE_ID, "Unclassified")
            .kind(ZoneKind::Fallback)
            .build(),
    ]
}
