//! Computed strategy library
//!
//! Every function here is pure over `(MetadataRecord, MappingContext)` and
//! produces one field value. [`ComputedFn`] names them so the registry can
//! hold a closed, comparable set instead of boxed closures.
//!
//! # Modules
//! - **physical** - trim size, weight, spine width, thickness
//! - **file_naming** - cover/interior/jacket paths
//! - **pricing** - territorial list prices and discounts
//! - **categories** - BISAC heading resolution
//! - **text_length** - limit-constrained text
//! - **dates** - date normalization

pub mod categories;
pub mod dates;
pub mod file_naming;
pub mod physical;
pub mod pricing;
pub mod text_length;

use crate::error::StrategyError;
use crate::pipeline::MappingContext;
use crate::types::MetadataRecord;
use std::fmt;

/// Named computed function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputedFn {
    /// Identifier resolved by the pipeline (pool or record)
    AssignedIdentifier,
    TrimWidth,
    TrimHeight,
    Weight,
    WeightLbs,
    SpineWidth,
    Thickness,
    PageCount,
    BindingLabel,
    PaperLabel,
    AssetPath { file_type: String },
    TerritoryPrice { territory: String },
    TerritoryDiscount { territory: String },
    /// 1-based position among the record's categories
    BisacCategory { position: usize },
    LengthLimited { context: String },
    Date,
}

impl fmt::Display for ComputedFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputedFn::AssetPath { file_type } => write!(f, "asset_path({})", file_type),
            ComputedFn::TerritoryPrice { territory } => write!(f, "territory_price({})", territory),
            ComputedFn::TerritoryDiscount { territory } => {
                write!(f, "territory_discount({})", territory)
            }
            ComputedFn::BisacCategory { position } => write!(f, "bisac_category({})", position),
            ComputedFn::LengthLimited { context } => write!(f, "length_limited({})", context),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Run one computed function
pub fn evaluate(
    function: &ComputedFn,
    inputs: &[String],
    record: &MetadataRecord,
    ctx: &MappingContext,
) -> Result<String, StrategyError> {
    match function {
        ComputedFn::AssignedIdentifier => Ok(ctx
            .identifier
            .map(str::to_string)
            .or_else(|| file_naming::extract_identifier(record))
            .unwrap_or_default()),
        ComputedFn::TrimWidth => physical::trim_width(record, ctx),
        ComputedFn::TrimHeight => physical::trim_height(record, ctx),
        ComputedFn::Weight => physical::weight(record, inputs, ctx),
        ComputedFn::WeightLbs => physical::weight_lbs(record, inputs, ctx),
        ComputedFn::SpineWidth => physical::spine_width(record, inputs, ctx),
        ComputedFn::Thickness => physical::thickness(record, inputs, ctx),
        ComputedFn::PageCount => physical::page_count_value(record, inputs),
        ComputedFn::BindingLabel => physical::binding_label(record, ctx),
        ComputedFn::PaperLabel => physical::paper_label(record, ctx),
        ComputedFn::AssetPath { file_type } => file_naming::asset_path(record, ctx, file_type),
        ComputedFn::TerritoryPrice { territory } => pricing::price(record, inputs, ctx, territory),
        ComputedFn::TerritoryDiscount { territory } => pricing::discount(ctx, territory),
        ComputedFn::BisacCategory { position } => {
            categories::bisac_category(record, inputs, ctx, *position)
        }
        ComputedFn::LengthLimited { context } => {
            text_length::length_limited(record, inputs, ctx, context)
        }
        ComputedFn::Date => dates::date_field(record, inputs),
    }
}
