//! BISAC subject headings
//!
//! `codes` maps a nine-character subject code to its full heading. Headings
//! arrive from upstream in several degraded forms (code-prefixed, truncated,
//! abbreviated top level); `abbreviations` and `top_level` repair them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// BISAC reference table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BisacTable {
    /// Code → canonical heading
    pub codes: BTreeMap<String, String>,
    /// Known truncated/abbreviated heading → canonical heading
    #[serde(default)]
    pub abbreviations: BTreeMap<String, String>,
    /// Three-letter top-level prefix → top-level heading
    #[serde(default)]
    pub top_level: BTreeMap<String, String>,
}

impl BisacTable {
    /// Canonical heading with exactly this text (case-insensitive)
    pub fn canonical_heading(&self, heading: &str) -> Option<&str> {
        self.codes
            .values()
            .find(|h| h.eq_ignore_ascii_case(heading))
            .map(|h| h.as_str())
    }

    pub fn heading_for(&self, code: &str) -> Option<&str> {
        self.codes.get(&code.to_ascii_uppercase()).map(|h| h.as_str())
    }

    /// True when `value` is a known code or canonical heading
    pub fn is_allowed(&self, value: &str) -> bool {
        self.heading_for(value).is_some() || self.canonical_heading(value).is_some()
    }
}

pub(crate) fn builtin_bisac() -> BisacTable {
    let codes = [
        ("BUS000000", "BUSINESS & ECONOMICS / General"),
        ("BUS041000", "BUSINESS & ECONOMICS / Management"),
        ("BUS071000", "BUSINESS & ECONOMICS / Leadership"),
        ("BUS069000", "BUSINESS & ECONOMICS / Economics / General"),
        ("COM000000", "COMPUTERS / General"),
        ("COM004000", "COMPUTERS / Artificial Intelligence / General"),
        ("COM051000", "COMPUTERS / Programming / General"),
        ("COM051010", "COMPUTERS / Languages / General"),
        ("COM053000", "COMPUTERS / Security / General"),
        ("FIC000000", "FICTION / General"),
        ("FIC028000", "FICTION / Science Fiction / General"),
        ("FIC009000", "FICTION / Fantasy / General"),
        ("HIS000000", "HISTORY / General"),
        ("HIS027000", "HISTORY / Military / General"),
        ("HIS037070", "HISTORY / Modern / 20th Century / General"),
        ("HIS036000", "HISTORY / United States / General"),
        ("PHI000000", "PHILOSOPHY / General"),
        ("PHI005000", "PHILOSOPHY / Ethics & Moral Philosophy"),
        ("POL000000", "POLITICAL SCIENCE / General"),
        ("POL011000", "POLITICAL SCIENCE / International Relations / General"),
        ("REL000000", "RELIGION / General"),
        ("SCI000000", "SCIENCE / General"),
        ("SCI004000", "SCIENCE / Space Science / Astronomy"),
        ("SCI055000", "SCIENCE / Physics / General"),
        ("SOC000000", "SOCIAL SCIENCE / General"),
        ("TEC000000", "TECHNOLOGY & ENGINEERING / General"),
        ("TEC002000", "TECHNOLOGY & ENGINEERING / Aeronautics & Astronautics"),
        ("LCO000000", "LITERARY COLLECTIONS / General"),
        ("POE000000", "POETRY / General"),
        ("REF000000", "REFERENCE / General"),
    ];

    let abbreviations = [
        ("COMPUTERS / Artificial Intel", "COMPUTERS / Artificial Intelligence / General"),
        ("COMPUTERS / AI", "COMPUTERS / Artificial Intelligence / General"),
        ("BUSINESS / General", "BUSINESS & ECONOMICS / General"),
        ("BUSINESS / Management", "BUSINESS & ECONOMICS / Management"),
        ("TECHNOLOGY / General", "TECHNOLOGY & ENGINEERING / General"),
        ("HISTORY / 20th Century", "HISTORY / Modern / 20th Century / General"),
        ("SCIENCE / Astronomy", "SCIENCE / Space Science / Astronomy"),
        ("SCI FI", "FICTION / Science Fiction / General"),
    ];

    let top_level = [
        ("BUS", "BUSINESS & ECONOMICS"),
        ("COM", "COMPUTERS"),
        ("FIC", "FICTION"),
        ("HIS", "HISTORY"),
        ("PHI", "PHILOSOPHY"),
        ("POL", "POLITICAL SCIENCE"),
        ("REL", "RELIGION"),
        ("SCI", "SCIENCE"),
        ("SOC", "SOCIAL SCIENCE"),
        ("TEC", "TECHNOLOGY & ENGINEERING"),
        ("LCO", "LITERARY COLLECTIONS"),
        ("POE", "POETRY"),
        ("REF", "REFERENCE"),
    ];

    let to_map = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    };

    BisacTable {
        codes: to_map(&codes),
        abbreviations: to_map(&abbreviations),
        top_level: to_map(&top_level),
    }
}
