//! Static reference data
//!
//! `LookupTables` is loaded once (built-in defaults, optionally overridden
//! table-by-table from a TOML file) and shared read-only by every strategy
//! and validator.
//!
//! # Tables
//! 1. **paper** - paper stock profiles and binding constants
//! 2. **territories** - market codes, currencies and price multipliers
//! 3. **bisac** - subject codes, abbreviations and top-level prefixes
//! 4. **enumerations** - allowed values per intake-sheet column
//! 5. **text_limits** - character limits per text context
//! 6. **naming** - file naming pattern and extensions

pub mod bisac;
pub mod paper;
pub mod territories;

pub use bisac::BisacTable;
pub use paper::{BindingType, PaperProfile};
pub use territories::Territory;

use crate::error::{EngineError, EngineResult};
use crate::fields::Field;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// File naming conventions for generated asset paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConventions {
    /// Pattern with `{isbn}`, `{file_type}`, `{title}`, `{author}` placeholders
    pub pattern: String,
    /// Titles longer than this many characters are cut
    pub max_title_length: usize,
    /// File type → extension without the dot
    pub extensions: BTreeMap<String, String>,
    /// Extension for file types missing from `extensions`
    pub default_extension: String,
}

impl Default for NamingConventions {
    fn default() -> Self {
        let extensions = [
            ("cover", "pdf"),
            ("interior", "pdf"),
            ("jacket", "pdf"),
            ("epub", "epub"),
            ("marketing", "jpg"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            pattern: "{isbn}_{file_type}".to_string(),
            max_title_length: 50,
            extensions,
            default_extension: "pdf".to_string(),
        }
    }
}

impl NamingConventions {
    pub fn extension_for(&self, file_type: &str) -> &str {
        self.extensions
            .get(&file_type.to_lowercase())
            .map(|s| s.as_str())
            .unwrap_or(&self.default_extension)
    }
}

/// Immutable reference data bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupTables {
    /// Lower-case paper name → profile
    pub paper_profiles: BTreeMap<String, PaperProfile>,
    /// Paper used when a record names none
    pub default_paper: String,
    pub territories: Vec<Territory>,
    pub bisac: BisacTable,
    /// Column header → allowed values
    pub enumerations: BTreeMap<String, Vec<String>>,
    /// Text context → character limit
    pub text_limits: BTreeMap<String, usize>,
    pub naming: NamingConventions,
}

impl Default for LookupTables {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LookupTables {
    /// Built-in reference data
    pub fn builtin() -> Self {
        Self {
            paper_profiles: paper::builtin_paper_profiles(),
            default_paper: "white".to_string(),
            territories: territories::builtin_territories(),
            bisac: bisac::builtin_bisac(),
            enumerations: builtin_enumerations(),
            text_limits: builtin_text_limits(),
            naming: NamingConventions::default(),
        }
    }

    /// Parse a TOML override file; tables it omits keep their built-in values
    pub fn from_toml_str(content: &str) -> EngineResult<Self> {
        let tables: LookupTables = toml::from_str(content).map_err(|e| {
            EngineError::Common(folio_common::Error::Config(format!(
                "Invalid lookup tables: {}",
                e
            )))
        })?;
        tables.check()?;
        Ok(tables)
    }

    /// Load a TOML override file from disk
    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let tables = Self::from_toml_str(&content)?;
        tracing::info!(
            path = %path.display(),
            papers = tables.paper_profiles.len(),
            territories = tables.territories.len(),
            bisac_codes = tables.bisac.codes.len(),
            "Lookup tables loaded"
        );
        Ok(tables)
    }

    /// Paper profile by name (case-insensitive)
    pub fn paper(&self, name: &str) -> Option<&PaperProfile> {
        self.paper_profiles.get(&name.trim().to_lowercase())
    }

    pub fn territory(&self, code: &str) -> Option<&Territory> {
        self.territories
            .iter()
            .find(|t| t.code.eq_ignore_ascii_case(code))
    }

    /// The territory that copies the home-market price verbatim
    pub fn parity_territory(&self) -> Option<&Territory> {
        self.territories.iter().find(|t| t.mirrors_base)
    }

    /// Allowed values for a column, if the column is enumerated
    pub fn allowed_values(&self, field: Field) -> Option<&[String]> {
        self.enumerations.get(field.header()).map(|v| v.as_slice())
    }

    pub fn text_limit(&self, context: &str) -> Option<usize> {
        self.text_limits.get(context).copied()
    }

    fn check(&self) -> EngineResult<()> {
        let parity = self.territories.iter().filter(|t| t.mirrors_base).count();
        if parity > 1 {
            return Err(EngineError::InvalidInput(format!(
                "{} territories flagged mirrors_base; at most one allowed",
                parity
            )));
        }
        if !self.paper_profiles.contains_key(&self.default_paper.to_lowercase()) {
            return Err(EngineError::InvalidInput(format!(
                "Default paper '{}' has no profile",
                self.default_paper
            )));
        }
        Ok(())
    }
}

fn builtin_enumerations() -> BTreeMap<String, Vec<String>> {
    let entries: &[(Field, &[&str])] = &[
        (Field::Binding, &["Perfect Bound", "Case Laminate", "Cloth"]),
        (
            Field::InteriorColor,
            &["Black & White", "Standard Color", "Premium Color"],
        ),
        (Field::InteriorPaper, &["White", "Creme", "Groundwood", "Color"]),
        (Field::CoverFinish, &["Matte", "Gloss"]),
        (Field::Returnable, &["Yes-Destroy", "Yes-Deliver", "No"]),
        (
            Field::TerritorialRights,
            &["World", "US Only", "World excluding US"],
        ),
        (
            Field::Audience,
            &[
                "General/Trade",
                "Juvenile",
                "Young Adult",
                "Scholarly",
                "Professional",
                "College/Higher Education",
            ],
        ),
        (
            Field::Language,
            &["eng", "spa", "fra", "deu", "ita", "por", "jpn", "zho", "kor", "rus"],
        ),
        (
            Field::ContributorOneRole,
            &["A01", "A12", "A19", "B01", "B06", "A07", "E07"],
        ),
        (
            Field::ContributorTwoRole,
            &["A01", "A12", "A19", "B01", "B06", "A07", "E07"],
        ),
        (
            Field::ContributorThreeRole,
            &["A01", "A12", "A19", "B01", "B06", "A07", "E07"],
        ),
        (Field::OrderTypeEligibility, &["POD", "Short Run", "POD and Short Run"]),
    ];

    entries
        .iter()
        .map(|(field, values)| {
            (
                field.header().to_string(),
                values.iter().map(|v| v.to_string()).collect(),
            )
        })
        .collect()
}

fn builtin_text_limits() -> BTreeMap<String, usize> {
    [
        ("title", 255),
        ("subtitle", 255),
        ("short_description", 350),
        ("long_description", 4000),
        ("annotation", 4000),
        ("keywords", 500),
        ("contributor_bio", 2000),
        ("table_of_contents", 2000),
        ("review_quotes", 2000),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), *v))
    .collect()
}
