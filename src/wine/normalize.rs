// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Attribute normalization
//!
//! Turns a raw inventory record into the canonical [`Wine`] snapshot used for
//! zone scoring. Structured fields win; when they are missing the colour,
//! grapes, winemaking tags and origin are inferred from the free text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

use super::{Colour, GrapeShare, RawWine, Wine};

pub const RED_GRAPES: &[&str] = &[
    "cabernet sauvignon", "cabernet franc", "merlot", "pinot noir", "shiraz", "grenache",
    "tempranillo", "sangiovese", "nebbiolo", "barbera", "dolcetto", "malbec", "carmenere",
    "pinotage", "zinfandel", "primitivo", "negroamaro", "nero d'avola", "aglianico", "corvina",
    "rondinella", "mourvedre", "carignan", "cinsault", "touriga nacional", "petit verdot",
    "gamay", "montepulciano", "mencia", "tannat", "nerello mascalese", "sagrantino",
    "blaufrankisch", "zweigelt", "petite sirah", "lagrein",
];

pub const WHITE_GRAPES: &[&str] = &[
    "chardonnay", "sauvignon blanc", "chenin blanc", "riesling", "pinot gris", "gewurztraminer",
    "viognier", "semillon", "albarino", "verdejo", "gruner veltliner", "torrontes", "muscat",
    "vermentino", "garganega", "fiano", "greco", "falanghina", "marsanne", "roussanne", "godello",
    "assyrtiko", "trebbiano", "pinot blanc", "colombard", "grenache blanc", "furmint",
    "melon de bourgogne", "picpoul", "loureiro", "glera", "macabeo", "xarel lo",
];

/// Alternative names mapped onto the canonical grape name
const GRAPE_ALIASES: &[(&str, &str)] = &[
    ("syrah", "shiraz"),
    ("cab sauv", "cabernet sauvignon"),
    ("sauv blanc", "sauvignon blanc"),
    ("pinot grigio", "pinot gris"),
    ("garnacha", "grenache"),
    ("garnatxa", "grenache"),
    ("cannonau", "grenache"),
    ("monastrell", "mourvedre"),
    ("mataro", "mourvedre"),
    ("tinta roriz", "tempranillo"),
    ("tinto fino", "tempranillo"),
    ("tinta del pais", "tempranillo"),
    ("alvarinho", "albarino"),
    ("spatburgunder", "pinot noir"),
    ("pinot nero", "pinot noir"),
    ("steen", "chenin blanc"),
    ("moscato", "muscat"),
    ("muscadet", "melon de bourgogne"),
    ("carignane", "carignan"),
    ("carmenere", "carmenere"),
];

/// Known appellations and regions with their parent region and country
struct Origin {
    keyword: &'static str,
    appellation: Option<&'static str>,
    region: &'static str,
    country: &'static str,
}

const fn origin(
    keyword: &'static str,
    appellation: Option<&'static str>,
    region: &'static str,
    country: &'static str,
) -> Origin {
    Origin { keyword, appellation, region, country }
}

static ORIGINS: &[Origin] = &[
    origin("barolo", Some("barolo"), "piedmont", "italy"),
    origin("barbaresco", Some("barbaresco"), "piedmont", "italy"),
    origin("langhe", Some("langhe"), "piedmont", "italy"),
    origin("piedmont", None, "piedmont", "italy"),
    origin("piemonte", None, "piedmont", "italy"),
    origin("brunello di montalcino", Some("brunello di montalcino"), "tuscany", "italy"),
    origin("chianti", Some("chianti"), "tuscany", "italy"),
    origin("bolgheri", Some("bolgheri"), "tuscany", "italy"),
    origin("montepulciano d'abruzzo", Some("montepulciano d'abruzzo"), "abruzzo", "italy"),
    origin("tuscany", None, "tuscany", "italy"),
    origin("toscana", None, "tuscany", "italy"),
    origin("amarone", Some("amarone della valpolicella"), "veneto", "italy"),
    origin("ripasso", Some("valpolicella ripasso"), "veneto", "italy"),
    origin("valpolicella", Some("valpolicella"), "veneto", "italy"),
    origin("soave", Some("soave"), "veneto", "italy"),
    origin("prosecco", Some("prosecco"), "veneto", "italy"),
    origin("veneto", None, "veneto", "italy"),
    origin("romagna", None, "emilia romagna", "italy"),
    origin("salice salentino", Some("salice salentino"), "puglia", "italy"),
    origin("manduria", Some("primitivo di manduria"), "puglia", "italy"),
    origin("puglia", None, "puglia", "italy"),
    origin("etna", Some("etna"), "sicily", "italy"),
    origin("sicilia", None, "sicily", "italy"),
    origin("rioja", Some("rioja"), "rioja", "spain"),
    origin("ribera del duero", Some("ribera del duero"), "castilla y leon", "spain"),
    origin("toro", Some("toro"), "castilla y leon", "spain"),
    origin("priorat", Some("priorat"), "catalonia", "spain"),
    origin("rias baixas", Some("rias baixas"), "galicia", "spain"),
    origin("rueda", Some("rueda"), "castilla y leon", "spain"),
    origin("cava", Some("cava"), "catalonia", "spain"),
    origin("jerez", Some("jerez"), "andalucia", "spain"),
    origin("champagne", Some("champagne"), "champagne", "france"),
    origin("chablis", Some("chablis"), "burgundy", "france"),
    origin("meursault", Some("meursault"), "burgundy", "france"),
    origin("bourgogne", None, "burgundy", "france"),
    origin("burgundy", None, "burgundy", "france"),
    origin("beaujolais", Some("beaujolais"), "beaujolais", "france"),
    origin("sancerre", Some("sancerre"), "loire", "france"),
    origin("pouilly fume", Some("pouilly fume"), "loire", "france"),
    origin("vouvray", Some("vouvray"), "loire", "france"),
    origin("savennieres", Some("savennieres"), "loire", "france"),
    origin("chinon", Some("chinon"), "loire", "france"),
    origin("loire", None, "loire", "france"),
    origin("chateauneuf du pape", Some("chateauneuf du pape"), "rhone", "france"),
    origin("cotes du rhone", Some("cotes du rhone"), "rhone", "france"),
    origin("crozes hermitage", Some("crozes hermitage"), "rhone", "france"),
    origin("rhone", None, "rhone", "france"),
    origin("pauillac", Some("pauillac"), "bordeaux", "france"),
    origin("margaux", Some("margaux"), "bordeaux", "france"),
    origin("saint emilion", Some("saint emilion"), "bordeaux", "france"),
    origin("pomerol", Some("pomerol"), "bordeaux", "france"),
    origin("sauternes", Some("sauternes"), "bordeaux", "france"),
    origin("bordeaux", None, "bordeaux", "france"),
    origin("languedoc", None, "languedoc", "france"),
    origin("minervois", Some("minervois"), "languedoc", "france"),
    origin("corbieres", Some("corbieres"), "languedoc", "france"),
    origin("alsace", None, "alsace", "france"),
    origin("douro", Some("douro"), "douro", "portugal"),
    origin("vinho verde", Some("vinho verde"), "minho", "portugal"),
    origin("alentejo", None, "alentejo", "portugal"),
    origin("dao", Some("dao"), "dao", "portugal"),
    origin("stellenbosch", Some("stellenbosch"), "western cape", "south africa"),
    origin("swartland", Some("swartland"), "western cape", "south africa"),
    origin("franschhoek", Some("franschhoek"), "western cape", "south africa"),
    origin("western cape", None, "western cape", "south africa"),
    origin("barossa", Some("barossa valley"), "south australia", "australia"),
    origin("mclaren vale", Some("mclaren vale"), "south australia", "australia"),
    origin("coonawarra", Some("coonawarra"), "south australia", "australia"),
    origin("margaret river", Some("margaret river"), "western australia", "australia"),
    origin("marlborough", Some("marlborough"), "marlborough", "new zealand"),
    origin("central otago", Some("central otago"), "central otago", "new zealand"),
    origin("napa", Some("napa valley"), "california", "usa"),
    origin("sonoma", Some("sonoma"), "california", "usa"),
    origin("california", None, "california", "usa"),
    origin("mendoza", Some("mendoza"), "mendoza", "argentina"),
    origin("uco valley", Some("uco valley"), "mendoza", "argentina"),
    origin("maipo", Some("maipo valley"), "central valley", "chile"),
    origin("colchagua", Some("colchagua valley"), "central valley", "chile"),
    origin("casablanca", Some("casablanca valley"), "aconcagua", "chile"),
    origin("mosel", Some("mosel"), "mosel", "germany"),
    origin("rheingau", Some("rheingau"), "rheingau", "germany"),
    origin("wachau", Some("wachau"), "niederosterreich", "austria"),
    origin("tokaj", Some("tokaji"), "tokaj", "hungary"),
];

const COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("us", "usa"),
    ("united states", "usa"),
    ("united states of america", "usa"),
    ("america", "usa"),
    ("nz", "new zealand"),
    ("espana", "spain"),
    ("italia", "italy"),
    ("deutschland", "germany"),
    ("osterreich", "austria"),
    ("rsa", "south africa"),
];

static GRAPE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let mut names: Vec<&str> = RED_GRAPES
        .iter()
        .chain(WHITE_GRAPES)
        .copied()
        .chain(GRAPE_ALIASES.iter().map(|(alias, _)| *alias))
        .collect();
    names.sort_by_key(|n| std::cmp::Reverse(n.len()));
    let alternation = names.iter().map(|n| regex::escape(n)).collect::<Vec<_>>().join("|");
    Regex::new(&format!(r"\b(?:{})\b", alternation)).unwrap()
});

static PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,3}(?:\.\d+)?)\s*%").unwrap());
static GRAPE_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,/;&+]|\band\b").unwrap());

static SPARKLING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"sparkl|\b(?:prosecco|champagne|cava|cremant|franciacorta|spumante|sekt|pet nat|brut|fizz)\b").unwrap()
});
static FORTIFIED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:fortified|port|porto|tawny|lbv|sherry|fino|oloroso|amontillado|madeira|marsala)\b").unwrap()
});
static DESSERT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:dessert|sauternes|tokaji|late harvest|ice ?wine|eiswein|beerenauslese|vin santo|recioto|sticky)\b").unwrap()
});
static ROSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:rose|rosado|rosato|blush)\b").unwrap());

static WINEMAKING_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\bunoaked\b|\bno oak\b", "unoaked"),
        (r"\b(?:oaked|oak aged|barrique|barrel (?:aged|fermented))\b", "oaked"),
        (r"\b(?:appassimento|amarone|recioto|dried grapes?)\b", "appassimento"),
        (r"\bripasso\b", "ripasso"),
        (r"\bsur lie\b", "sur lie"),
        (r"\b(?:skin contact|orange wine|ramato)\b", "skin contact"),
        (r"\b(?:late harvest|spatlese|vendange tardive)\b", "late harvest"),
        (r"\b(?:botrytis|noble rot|sauternes|tokaji)\b", "botrytis"),
        (r"\b(?:traditional method|methode champenoise|methode traditionnelle|champagne|cava|franciacorta)\b", "traditional method"),
        (r"\bsolera\b", "solera"),
        (r"\b(?:old vines?|vieilles vignes)\b", "old vines"),
        (r"\borganic\b", "organic"),
        (r"\bbiodynamic\b", "biodynamic"),
        (r"\b(?:natural wine|pet nat)\b", "natural"),
    ]
    .into_iter()
    .map(|(pattern, tag)| (Regex::new(pattern).unwrap(), tag))
    .collect()
});

static ORIGIN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ORIGINS
        .iter()
        .map(|o| Regex::new(&format!(r"\b{}\b", regex::escape(o.keyword))).unwrap())
        .collect()
});

/// Lowercase, strip common accents and collapse separators to single spaces
pub fn fold(text: &str) -> String {
    let mapped: String = text
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            '’' | '`' => '\'',
            '-' | '_' => ' ',
            other => other,
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Map a grape name onto its canonical spelling
pub fn canonical_grape(name: &str) -> String {
    let folded = fold(name);
    GRAPE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == folded)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(folded)
}

pub fn canonical_country(name: &str) -> String {
    let folded = fold(name);
    COUNTRY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == folded)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(folded)
}

/// Parse a structured colour value
pub fn parse_colour(raw: &str) -> Option<Colour> {
    let folded = fold(raw);
    match folded.as_str() {
        "" => None,
        "red" | "rouge" | "tinto" | "rosso" => Some(Colour::Red),
        "white" | "blanc" | "blanco" | "bianco" => Some(Colour::White),
        _ if ROSE.is_match(&folded) => Some(Colour::Rose),
        _ if SPARKLING.is_match(&folded) => Some(Colour::Sparkling),
        _ if FORTIFIED.is_match(&folded) => Some(Colour::Fortified),
        _ if folded.contains("sweet") || DESSERT.is_match(&folded) => Some(Colour::Dessert),
        _ => None,
    }
}

/// Split a grape declaration into shares, highest percentage first
pub fn parse_grapes(raw: &str) -> Vec<GrapeShare> {
    let mut shares: Vec<GrapeShare> = Vec::new();

    for part in GRAPE_SEPARATOR.split(&fold(raw)) {
        let percent = PERCENT
            .captures(part)
            .and_then(|caps| caps[1].parse::<f64>().ok())
            .filter(|p| *p > 0.0 && *p <= 100.0);
        let name = PERCENT.replace_all(part, "");
        let name = name.trim_matches(|c: char| !c.is_alphabetic());
        if name.is_empty() {
            continue;
        }
        let grape = canonical_grape(name);
        if shares.iter().any(|s| s.grape == grape) {
            continue;
        }
        shares.push(GrapeShare { grape, percent });
    }

    // Stable: undeclared shares keep their written order after declared ones
    shares.sort_by(|a, b| match (a.percent, b.percent) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    shares
}

/// Find known grape names mentioned in free text
pub fn infer_grapes(text: &str) -> Vec<GrapeShare> {
    let folded = fold(text);
    let mut shares: Vec<GrapeShare> = Vec::new();
    for m in GRAPE_PATTERN.find_iter(&folded) {
        let grape = canonical_grape(m.as_str());
        if !shares.iter().any(|s| s.grape == grape) {
            shares.push(GrapeShare { grape, percent: None });
        }
    }
    shares
}

/// Colour from the wine's name and style
pub fn infer_colour_from_text(text: &str) -> Option<Colour> {
    let folded = fold(text);
    if SPARKLING.is_match(&folded) {
        Some(Colour::Sparkling)
    } else if FORTIFIED.is_match(&folded) {
        Some(Colour::Fortified)
    } else if DESSERT.is_match(&folded) {
        Some(Colour::Dessert)
    } else if ROSE.is_match(&folded) {
        Some(Colour::Rose)
    } else {
        None
    }
}

/// Colour implied by the dominant grape
pub fn colour_from_grapes(grapes: &[String]) -> Option<Colour> {
    let dominant = grapes.first()?;
    if RED_GRAPES.contains(&dominant.as_str()) {
        Some(Colour::Red)
    } else if WHITE_GRAPES.contains(&dominant.as_str()) {
        Some(Colour::White)
    } else {
        None
    }
}

/// Winemaking tags found in free text
pub fn infer_winemaking(text: &str) -> Vec<String> {
    let folded = fold(text);
    let mut tags: Vec<String> = Vec::new();
    for (pattern, tag) in WINEMAKING_PATTERNS.iter() {
        if *tag == "oaked" && tags.iter().any(|t| t == "unoaked") {
            continue;
        }
        if pattern.is_match(&folded) && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

fn find_origin(text: &str) -> Option<&'static Origin> {
    let folded = fold(text);
    ORIGINS
        .iter()
        .zip(ORIGIN_PATTERNS.iter())
        .find(|(_, pattern)| pattern.is_match(&folded))
        .map(|(origin, _)| origin)
}

fn country_for_region(region: &str) -> Option<&'static str> {
    ORIGINS.iter().find(|o| o.region == region).map(|o| o.country)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Derive the canonical attribute set of a raw wine record
pub fn normalize(raw: &RawWine) -> Wine {
    let label_text = [Some(raw.name.as_str()), non_empty(&raw.style)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    let search_text = fold(
        &[
            Some(raw.name.as_str()),
            non_empty(&raw.style),
            non_empty(&raw.grapes),
            non_empty(&raw.notes),
            non_empty(&raw.region),
            non_empty(&raw.appellation),
            non_empty(&raw.country),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" "),
    );

    let mut grape_shares = non_empty(&raw.grapes).map(parse_grapes).unwrap_or_default();
    if grape_shares.is_empty() {
        let text = [Some(label_text.as_str()), non_empty(&raw.notes)]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        grape_shares = infer_grapes(&text);
    }
    let grapes: Vec<String> = grape_shares.iter().map(|s| s.grape.clone()).collect();

    let colour = non_empty(&raw.colour)
        .and_then(parse_colour)
        .or_else(|| infer_colour_from_text(&label_text))
        .or_else(|| colour_from_grapes(&grapes));

    let mut winemaking: Vec<String> = raw
        .winemaking
        .iter()
        .map(|t| fold(t))
        .filter(|t| !t.is_empty())
        .collect();
    for tag in infer_winemaking(&search_text) {
        if !winemaking.contains(&tag) {
            winemaking.push(tag);
        }
    }

    let origin_text = [Some(raw.name.as_str()), non_empty(&raw.appellation), non_empty(&raw.region)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let inferred = find_origin(&origin_text);

    let appellation = non_empty(&raw.appellation)
        .map(fold)
        .or_else(|| inferred.and_then(|o| o.appellation).map(String::from));
    let region = non_empty(&raw.region)
        .map(fold)
        .or_else(|| inferred.map(|o| o.region.to_string()));
    let country = non_empty(&raw.country)
        .map(canonical_country)
        .or_else(|| region.as_deref().and_then(country_for_region).map(String::from))
        .or_else(|| inferred.map(|o| o.country.to_string()));

    Wine {
        id: raw.id,
        name: raw.name.clone(),
        vintage: raw.vintage,
        colour,
        grapes,
        grape_shares,
        winemaking,
        country,
        region,
        appellation,
        search_text,
    }
}
