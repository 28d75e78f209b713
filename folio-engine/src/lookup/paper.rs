//! Paper stock and binding reference data

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference page area (6 x 9 in) that `weight_per_page` is quoted for
pub const REFERENCE_PAGE_AREA_SQ_IN: f64 = 54.0;

/// Physical properties of one interior paper stock
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaperProfile {
    /// Grams per printed page at the reference page area (0 = derive from density)
    pub weight_per_page: f64,
    /// Inches of spine per printed page
    pub thickness_per_page: f64,
    /// Sheet density in g/cm³
    pub density: f64,
}

impl PaperProfile {
    /// Grams per printed page for the given page area
    ///
    /// Falls back to `density × thickness × area` when no quoted weight exists.
    pub fn page_weight_grams(&self, page_area_sq_in: f64) -> f64 {
        if self.weight_per_page > 0.0 {
            self.weight_per_page * page_area_sq_in / REFERENCE_PAGE_AREA_SQ_IN
        } else {
            const CM_PER_IN: f64 = 2.54;
            let volume_cm3 =
                page_area_sq_in * CM_PER_IN * CM_PER_IN * self.thickness_per_page * CM_PER_IN;
            volume_cm3 * self.density
        }
    }
}

pub(crate) fn builtin_paper_profiles() -> BTreeMap<String, PaperProfile> {
    let mut profiles = BTreeMap::new();
    profiles.insert(
        "white".to_string(),
        PaperProfile {
            weight_per_page: 1.29,
            thickness_per_page: 0.002252,
            density: 0.65,
        },
    );
    profiles.insert(
        "creme".to_string(),
        PaperProfile {
            weight_per_page: 1.29,
            thickness_per_page: 0.0025,
            density: 0.58,
        },
    );
    profiles.insert(
        "groundwood".to_string(),
        PaperProfile {
            weight_per_page: 1.12,
            thickness_per_page: 0.0022,
            density: 0.60,
        },
    );
    profiles.insert(
        "color".to_string(),
        PaperProfile {
            weight_per_page: 1.75,
            thickness_per_page: 0.002347,
            density: 0.78,
        },
    );
    profiles
}

/// Binding family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingType {
    Paperback,
    Hardcover,
}

const HARDCOVER_KEYWORDS: &[&str] = &["hard", "cloth"];

impl BindingType {
    /// Infer binding from a free-text field value
    ///
    /// Hardcover keywords are checked first; anything unmatched is a paperback.
    pub fn infer(value: &str) -> Self {
        let lower = value.to_lowercase();
        if HARDCOVER_KEYWORDS.iter().any(|k| lower.contains(k)) {
            BindingType::Hardcover
        } else {
            BindingType::Paperback
        }
    }

    /// Cover (or case) weight in grams
    pub fn cover_weight_grams(self) -> f64 {
        match self {
            BindingType::Paperback => 20.0,
            BindingType::Hardcover => 180.0,
        }
    }

    /// Thickness added by the cover or boards, inches
    pub fn cover_thickness_in(self) -> f64 {
        match self {
            BindingType::Paperback => 0.02,
            BindingType::Hardcover => 0.25,
        }
    }

    /// Intake-sheet binding label
    pub fn label(self) -> &'static str {
        match self {
            BindingType::Paperback => "Perfect Bound",
            BindingType::Hardcover => "Case Laminate",
        }
    }
}
