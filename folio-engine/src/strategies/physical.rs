//! Physical specifications: trim size, weight, spine width, thickness
//!
//! Weight = text block (pages × per-page weight scaled to trim area) + cover
//! weight for the binding. Spine width = pages × thickness per page. Overall
//! thickness adds the binding's cover thickness to the spine.
//!
//! A missing page count produces empty output rather than an error; some
//! intake contexts collect physical specs later.

use crate::error::StrategyError;
use crate::lookup::{BindingType, PaperProfile};
use crate::pipeline::MappingContext;
use crate::types::MetadataRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Grams at or above which weight is shown in ounces
pub const OUNCE_THRESHOLD_GRAMS: f64 = 453.6;
const GRAMS_PER_OUNCE: f64 = 28.3495;
const GRAMS_PER_POUND: f64 = 453.592;

/// Trim size used when neither record nor config supplies one
pub const DEFAULT_TRIM_SIZE: &str = "6 x 9";

pub(crate) const PAGE_COUNT_KEYS: &[&str] = &["page_count", "pages", "Pages"];
pub(crate) const TRIM_SIZE_KEYS: &[&str] = &["trim_size", "Trim Size"];
pub(crate) const PAPER_KEYS: &[&str] = &["interior_paper", "paper_type"];
pub(crate) const BINDING_KEYS: &[&str] = &["binding", "rendition_booktype", "format"];

// 6 x 9 | 6" × 9" | 6in X 9in | 5.5 by 8.5 inches
static TRIM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^\s*(\d+(?:\.\d+)?)\s*(?:"|”|''|in(?:ch(?:es)?)?\.?)?\s*(?:x|×|\*|by)\s*(\d+(?:\.\d+)?)\s*(?:"|”|''|in(?:ch(?:es)?)?\.?)?\s*$"#,
    )
    .expect("trim size regex is valid")
});

/// Trim size in inches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimSize {
    pub width: f64,
    pub height: f64,
}

impl TrimSize {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Parse free-form trim text; tolerant of `×`, quotes and inch units
pub fn parse_trim_size(raw: &str) -> Option<TrimSize> {
    let caps = TRIM_RE.captures(raw)?;
    let width: f64 = caps.get(1)?.as_str().parse().ok()?;
    let height: f64 = caps.get(2)?.as_str().parse().ok()?;
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    Some(TrimSize { width, height })
}

/// Computed physical properties of one book
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalSpecs {
    pub weight_grams: f64,
    pub spine_width_in: f64,
    pub thickness_in: f64,
}

impl PhysicalSpecs {
    pub fn compute(pages: u32, trim: TrimSize, paper: &PaperProfile, binding: BindingType) -> Self {
        let pages = pages as f64;
        let text_block_grams = pages * paper.page_weight_grams(trim.area());
        let spine_width_in = pages * paper.thickness_per_page;
        Self {
            weight_grams: text_block_grams + binding.cover_weight_grams(),
            spine_width_in,
            thickness_in: spine_width_in + binding.cover_thickness_in(),
        }
    }

    pub fn weight_pounds(&self) -> f64 {
        self.weight_grams / GRAMS_PER_POUND
    }
}

/// Grams below the threshold, ounces at or above
pub fn format_weight(grams: f64) -> String {
    if grams < OUNCE_THRESHOLD_GRAMS {
        format!("{:.0} g", grams)
    } else {
        format!("{:.1} oz", grams / GRAMS_PER_OUNCE)
    }
}

/// Page count from the first present alias; `None` when absent
pub(crate) fn page_count(record: &MetadataRecord, keys: &[String]) -> Result<Option<u32>, StrategyError> {
    let keys: Vec<&str> = if keys.is_empty() {
        PAGE_COUNT_KEYS.to_vec()
    } else {
        keys.iter().map(|k| k.as_str()).collect()
    };
    let Some(key) = keys.iter().find(|k| record.contains(k)) else {
        return Ok(None);
    };
    match record.get_number(key) {
        Some(n) if n >= 1.0 => Ok(Some(n.round() as u32)),
        _ => Err(StrategyError::parse(
            record.get_str(key).unwrap_or_default(),
            "page count",
        )),
    }
}

pub(crate) fn trim_size(record: &MetadataRecord, ctx: &MappingContext) -> Result<TrimSize, StrategyError> {
    let raw = record
        .first_of(TRIM_SIZE_KEYS)
        .unwrap_or_else(|| ctx.config.setting_or("trim_size", DEFAULT_TRIM_SIZE).to_string());
    parse_trim_size(&raw).ok_or_else(|| StrategyError::parse(raw, "trim size"))
}

pub(crate) fn binding(record: &MetadataRecord, ctx: &MappingContext) -> BindingType {
    let raw = record
        .first_of(BINDING_KEYS)
        .or_else(|| ctx.config.setting("binding").map(str::to_string))
        .unwrap_or_default();
    BindingType::infer(&raw)
}

/// Paper name as written in the record/config, or the table default
pub(crate) fn paper_name(record: &MetadataRecord, ctx: &MappingContext) -> String {
    record
        .first_of(PAPER_KEYS)
        .or_else(|| ctx.config.setting("paper_type").map(str::to_string))
        .unwrap_or_else(|| ctx.tables.default_paper.clone())
}

fn paper<'a>(record: &MetadataRecord, ctx: &'a MappingContext) -> Result<&'a PaperProfile, StrategyError> {
    let name = paper_name(record, ctx);
    ctx.tables
        .paper(&name)
        .ok_or(StrategyError::UnknownLookup {
            table: "paper profile",
            key: name,
        })
}

/// Specs for the record, `None` when the page count is absent
pub fn specs_for(
    record: &MetadataRecord,
    inputs: &[String],
    ctx: &MappingContext,
) -> Result<Option<PhysicalSpecs>, StrategyError> {
    let Some(pages) = page_count(record, inputs)? else {
        debug!(book_id = %record.book_id(), "No page count; physical specs left empty");
        return Ok(None);
    };
    let trim = trim_size(record, ctx)?;
    let paper = paper(record, ctx)?;
    let binding = binding(record, ctx);
    Ok(Some(PhysicalSpecs::compute(pages, trim, paper, binding)))
}

pub fn weight(record: &MetadataRecord, inputs: &[String], ctx: &MappingContext) -> Result<String, StrategyError> {
    Ok(specs_for(record, inputs, ctx)?
        .map(|s| format_weight(s.weight_grams))
        .unwrap_or_default())
}

pub fn weight_lbs(record: &MetadataRecord, inputs: &[String], ctx: &MappingContext) -> Result<String, StrategyError> {
    Ok(specs_for(record, inputs, ctx)?
        .map(|s| format!("{:.2}", s.weight_pounds()))
        .unwrap_or_default())
}

pub fn spine_width(record: &MetadataRecord, inputs: &[String], ctx: &MappingContext) -> Result<String, StrategyError> {
    Ok(specs_for(record, inputs, ctx)?
        .map(|s| format!("{:.3}", s.spine_width_in))
        .unwrap_or_default())
}

pub fn thickness(record: &MetadataRecord, inputs: &[String], ctx: &MappingContext) -> Result<String, StrategyError> {
    Ok(specs_for(record, inputs, ctx)?
        .map(|s| format!("{:.3}", s.thickness_in))
        .unwrap_or_default())
}

pub fn page_count_value(record: &MetadataRecord, inputs: &[String]) -> Result<String, StrategyError> {
    Ok(page_count(record, inputs)?
        .map(|p| p.to_string())
        .unwrap_or_default())
}

pub fn trim_width(record: &MetadataRecord, ctx: &MappingContext) -> Result<String, StrategyError> {
    Ok(format_inches(trim_size(record, ctx)?.width))
}

pub fn trim_height(record: &MetadataRecord, ctx: &MappingContext) -> Result<String, StrategyError> {
    Ok(format_inches(trim_size(record, ctx)?.height))
}

pub fn binding_label(record: &MetadataRecord, ctx: &MappingContext) -> Result<String, StrategyError> {
    Ok(binding(record, ctx).label().to_string())
}

/// Paper name in its enumerated spelling ("white" → "White")
pub fn paper_label(record: &MetadataRecord, ctx: &MappingContext) -> Result<String, StrategyError> {
    let name = paper_name(record, ctx);
    let mut chars = name.trim().chars();
    Ok(match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    })
}

fn format_inches(value: f64) -> String {
    let s = format!("{:.3}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}
