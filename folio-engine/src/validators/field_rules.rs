//! Single-field rules: presence, format, range and allowed values

use super::ValidationDiagnostic;
use crate::fields::Field;
use crate::lookup::LookupTables;
use crate::strategies::dates::normalize_date;
use crate::strategies::pricing::parse_price;
use crate::strategies::text_length::resolve_limit;
use folio_common::{isbn, ResolvedConfig};

/// Always-required columns
const REQUIRED: &[Field] = &[
    Field::Isbn,
    Field::Title,
    Field::Publisher,
    Field::Imprint,
    Field::ContributorOne,
    Field::PubDate,
    Field::Language,
];

/// One check applied to a non-empty value (except `Required`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    Required,
    Isbn13,
    /// Value must be in the lookup table's enumeration for the column
    Enumerated,
    /// Known BISAC code or canonical heading
    Bisac,
    Integer { min: i64, max: i64 },
    Decimal { min: f64, max: f64 },
    /// `"K"`, `"P"` or a number in range
    Grade,
    Price,
    Date,
    MaxLength { context: &'static str },
}

/// Rules for `field`, given scope requirements
pub fn rules_for(field: Field, config: &ResolvedConfig) -> Vec<Rule> {
    use Field as F;

    let mut rules = Vec::new();
    if is_required(field, config) {
        rules.push(Rule::Required);
    }

    match field {
        F::Isbn | F::ParentIsbn => rules.push(Rule::Isbn13),
        F::BisacCategory | F::BisacCategory2 | F::BisacCategory3 => rules.push(Rule::Bisac),
        F::Pages => rules.push(Rule::Integer { min: 1, max: 2000 }),
        F::Illustrations => rules.push(Rule::Integer { min: 0, max: 10_000 }),
        F::CartonPackQuantity => rules.push(Rule::Integer { min: 1, max: 1000 }),
        F::EditionNumber => rules.push(Rule::Integer { min: 1, max: 999 }),
        F::MinAge | F::MaxAge => rules.push(Rule::Integer { min: 0, max: 150 }),
        F::MinGrade | F::MaxGrade => rules.push(Rule::Grade),
        F::TrimWidth | F::TrimHeight => rules.push(Rule::Decimal { min: 1.0, max: 20.0 }),
        F::SpineWidth => rules.push(Rule::Decimal { min: 0.0, max: 5.0 }),
        F::Thickness => rules.push(Rule::Decimal { min: 0.0, max: 6.0 }),
        F::WeightLbs => rules.push(Rule::Decimal { min: 0.0, max: 50.0 }),
        F::PubDate | F::StreetDate => rules.push(Rule::Date),
        F::Title => rules.push(Rule::MaxLength { context: "title" }),
        F::Subtitle => rules.push(Rule::MaxLength { context: "subtitle" }),
        F::Keywords => rules.push(Rule::MaxLength { context: "keywords" }),
        F::ShortDescription => rules.push(Rule::MaxLength { context: "short_description" }),
        F::LongDescription => rules.push(Rule::MaxLength { context: "long_description" }),
        F::AnnotationSummary => rules.push(Rule::MaxLength { context: "annotation" }),
        F::TableOfContents => rules.push(Rule::MaxLength { context: "table_of_contents" }),
        F::ReviewQuotes => rules.push(Rule::MaxLength { context: "review_quotes" }),
        F::ContributorOneBio | F::ContributorTwoBio | F::ContributorThreeBio => {
            rules.push(Rule::MaxLength { context: "contributor_bio" })
        }
        _ if field.price_territory().is_some() => rules.push(Rule::Price),
        _ if field.header().contains("Discount") => {
            rules.push(Rule::Decimal { min: 0.0, max: 100.0 })
        }
        _ => {}
    }

    rules.push(Rule::Enumerated);
    rules
}

/// Required by default, by `require_page_count`, or listed in `required_fields`
pub fn is_required(field: Field, config: &ResolvedConfig) -> bool {
    if REQUIRED.contains(&field) {
        return true;
    }
    if field == Field::Pages && config.setting("require_page_count") == Some("true") {
        return true;
    }
    config
        .setting("required_fields")
        .map(|list| list.split(',').any(|h| h.trim() == field.header()))
        .unwrap_or(false)
}

/// Apply one rule, recording failures on `diag`
pub fn apply(
    rule: Rule,
    field: Field,
    value: &str,
    tables: &LookupTables,
    config: &ResolvedConfig,
    diag: &mut ValidationDiagnostic,
) {
    let value = value.trim();
    if value.is_empty() {
        if rule == Rule::Required {
            diag.fail(format!("{} is required", field));
        }
        return;
    }

    match rule {
        Rule::Required => {}
        Rule::Isbn13 => {
            if !isbn::is_valid_isbn13(value) {
                diag.fail(format!("'{}' is not a valid ISBN-13", value));
            }
        }
        Rule::Enumerated => {
            if let Some(allowed) = tables.allowed_values(field) {
                if !allowed.iter().any(|a| a.eq_ignore_ascii_case(value)) {
                    diag.fail(format!("'{}' is not one of: {}", value, allowed.join(", ")));
                }
            }
        }
        Rule::Bisac => {
            if !tables.bisac.is_allowed(value) {
                diag.fail(format!("'{}' is not a known BISAC subject", value));
            }
        }
        Rule::Integer { min, max } => match value.parse::<i64>() {
            Ok(n) if (min..=max).contains(&n) => {}
            Ok(n) => diag.fail(format!("{} is outside {}..={}", n, min, max)),
            Err(_) => diag.fail(format!("'{}' is not a whole number", value)),
        },
        Rule::Decimal { min, max } => match value.parse::<f64>() {
            Ok(n) if n >= min && n <= max => {}
            Ok(n) => diag.fail(format!("{} is outside {}..={}", n, min, max)),
            Err(_) => diag.fail(format!("'{}' is not a number", value)),
        },
        Rule::Grade => {
            let ok = matches!(value, "K" | "P")
                || value.parse::<u8>().map(|g| g <= 17).unwrap_or(false);
            if !ok {
                diag.fail(format!("'{}' is not a grade (P, K or 1-17)", value));
            }
        }
        Rule::Price => match parse_price(value) {
            Some(p) if !p.is_zero() => {}
            _ => diag.fail(format!("'{}' is not a positive price", value)),
        },
        Rule::Date => {
            if normalize_date(value).as_deref() != Some(value) {
                diag.fail(format!("'{}' is not a YYYY-MM-DD date", value));
            }
        }
        Rule::MaxLength { context } => {
            if let Some(limit) = resolve_limit(context, config, tables) {
                let length = value.chars().count();
                if length > limit {
                    diag.fail(format!("{} characters exceeds the {} limit of {}", length, context, limit));
                }
            }
        }
    }
}
