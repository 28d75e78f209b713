//! Cross-field consistency checks
//!
//! # Checks
//! 1. **Spine vs pages**: declared spine width within 25% of pages × paper thickness
//! 2. **Physical gaps**: page count present but weight or spine empty (warning)
//! 3. **Age and grade ranges**: max not below min
//! 4. **Dates**: street date not before publication date (warning)
//! 5. **Prices**: no territory left empty while another has a price; prices
//!    agree with the parity territory's price within one cent (warning)

use super::ValidationDiagnostic;
use crate::fields::{Field, OutputRecord, TERRITORY_FIELDS};
use crate::lookup::LookupTables;
use crate::strategies::dates::parse_date;
use crate::strategies::pricing::{expected_price, parse_price};
use rust_decimal::Decimal;

/// Allowed relative gap between declared and expected spine width
const SPINE_TOLERANCE: f64 = 0.25;

/// Run the checks that involve `field`
pub fn check(field: Field, output: &OutputRecord, tables: &LookupTables, diag: &mut ValidationDiagnostic) {
    match field {
        Field::SpineWidth => check_spine(output, tables, diag),
        Field::Weight => {
            if !output.is_empty(Field::Pages) && output.is_empty(Field::Weight) {
                diag.warn("Page count present but weight is empty");
            }
        }
        Field::MaxAge => check_range(output, Field::MinAge, Field::MaxAge, parse_age, diag),
        Field::MaxGrade => check_range(output, Field::MinGrade, Field::MaxGrade, parse_grade, diag),
        Field::StreetDate => {
            let pub_date = parse_date(output.get(Field::PubDate));
            let street = parse_date(output.get(Field::StreetDate));
            if let (Some(pub_date), Some(street)) = (pub_date, street) {
                if street < pub_date {
                    diag.warn(format!("Street date {} precedes publication date {}", street, pub_date));
                }
            }
        }
        _ => {
            if let Some(code) = field.price_territory() {
                check_price(field, code, output, tables, diag);
            }
        }
    }
}

fn check_spine(output: &OutputRecord, tables: &LookupTables, diag: &mut ValidationDiagnostic) {
    let pages = output.get(Field::Pages).trim();
    let spine = output.get(Field::SpineWidth).trim();
    if pages.is_empty() {
        return;
    }
    if spine.is_empty() {
        diag.warn("Page count present but spine width is empty");
        return;
    }
    let (Ok(pages), Ok(spine)) = (pages.parse::<f64>(), spine.parse::<f64>()) else {
        return;
    };
    let paper_name = output.get(Field::InteriorPaper);
    let Some(paper) = tables
        .paper(paper_name)
        .or_else(|| tables.paper(&tables.default_paper))
    else {
        return;
    };

    let expected = pages * paper.thickness_per_page;
    if expected > 0.0 && ((spine - expected) / expected).abs() > SPINE_TOLERANCE {
        diag.fail(format!(
            "Spine width {:.3} in does not match {} pages (expected about {:.3} in)",
            spine, pages, expected
        ));
    }
}

fn parse_age(value: &str) -> Option<i32> {
    value.trim().parse().ok()
}

/// P = -1, K = 0
fn parse_grade(value: &str) -> Option<i32> {
    match value.trim() {
        "P" => Some(-1),
        "K" => Some(0),
        other => other.parse().ok(),
    }
}

fn check_range(
    output: &OutputRecord,
    min_field: Field,
    max_field: Field,
    parse: fn(&str) -> Option<i32>,
    diag: &mut ValidationDiagnostic,
) {
    if let (Some(min), Some(max)) = (parse(output.get(min_field)), parse(output.get(max_field))) {
        if max < min {
            diag.fail(format!("{} is below {}", max_field, min_field));
        }
    }
}

fn check_price(field: Field, code: &str, output: &OutputRecord, tables: &LookupTables, diag: &mut ValidationDiagnostic) {
    let value = output.get(field).trim();

    if value.is_empty() {
        let sibling = TERRITORY_FIELDS
            .iter()
            .find(|(price, _, _)| *price != field && !output.is_empty(*price));
        if let Some((_, _, sibling_code)) = sibling {
            diag.fail(format!("{} price missing while {} has a price", code, sibling_code));
        }
        return;
    }

    let Some(parity) = tables.parity_territory() else {
        return;
    };
    if parity.code.eq_ignore_ascii_case(code) {
        return;
    }
    let Some(parity_field) = Field::price_field(&parity.code) else {
        return;
    };
    let parity_price = output.get(parity_field);
    let (Some(target), Some(actual)) = (tables.territory(code), parse_price(value)) else {
        return;
    };
    if let Some(expected) = expected_price(tables, &parity.code, parity_price, target) {
        if (actual - expected).abs() > Decimal::new(1, 2) {
            diag.warn(format!(
                "{} price {} differs from {} implied by the {} price",
                code, actual, expected, parity.code
            ));
        }
    }
}
