//! Territorial list prices
//!
//! The parity territory copies the home-market price string byte-for-byte.
//! Every other territory multiplies the home price and tags the currency:
//! `"$20.00"` in `UK` (×0.79, GBP) becomes `"15.80 GBP"`.

use crate::error::StrategyError;
use crate::lookup::{LookupTables, Territory};
use crate::pipeline::MappingContext;
use crate::types::MetadataRecord;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Home-market price aliases
pub const BASE_PRICE_KEYS: &[&str] = &["list_price", "us_price", "price"];

/// Parse a price string, ignoring currency symbols, codes and thousands separators
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok().filter(|d| *d >= Decimal::ZERO)
}

fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `"15.80 GBP"`
pub fn format_price(amount: Decimal, currency: &str) -> String {
    format!("{:.2} {}", round_money(amount), currency)
}

/// Price for `territory` given the home-market price string
pub fn territory_price(base: &str, territory: &Territory) -> Result<String, StrategyError> {
    if territory.mirrors_base {
        return Ok(base.to_string());
    }
    let amount = parse_price(base).ok_or_else(|| StrategyError::parse(base, "price"))?;
    let converted = amount.checked_mul(territory.multiplier).ok_or_else(|| {
        StrategyError::Evaluation(format!("{} price overflows for {}", territory.code, base))
    })?;
    Ok(format_price(converted, &territory.currency))
}

/// Home-market amount implied by a territory's price (multiplier applied in reverse)
pub fn base_from_territory(price: &str, territory: &Territory) -> Option<Decimal> {
    let amount = parse_price(price)?;
    if territory.mirrors_base {
        return Some(amount);
    }
    if territory.multiplier.is_zero() {
        return None;
    }
    amount.checked_div(territory.multiplier)
}

/// Price for `territory` computed from a home-market amount
///
/// Used when no base string exists to mirror. `None` when the amount overflows.
pub fn price_from_base_amount(amount: Decimal, territory: &Territory) -> Option<String> {
    if territory.mirrors_base {
        Some(format!("{:.2}", round_money(amount)))
    } else {
        let converted = amount.checked_mul(territory.multiplier)?;
        Some(format_price(converted, &territory.currency))
    }
}

/// Expected price for `territory` given another territory's price, for cross-checks
pub fn expected_price(
    tables: &LookupTables,
    known_code: &str,
    known_price: &str,
    target: &Territory,
) -> Option<Decimal> {
    let known = tables.territory(known_code)?;
    let base = base_from_territory(known_price, known)?;
    let amount = if target.mirrors_base {
        base
    } else {
        base.checked_mul(target.multiplier)?
    };
    Some(round_money(amount))
}

/// Strategy: list price for `code`
///
/// Missing base price yields "" so the validator decides whether the gap matters.
pub fn price(
    record: &MetadataRecord,
    inputs: &[String],
    ctx: &MappingContext,
    code: &str,
) -> Result<String, StrategyError> {
    let territory = ctx.tables.territory(code).ok_or(StrategyError::UnknownLookup {
        table: "territory",
        key: code.to_string(),
    })?;

    let base = if inputs.is_empty() {
        record.first_of(BASE_PRICE_KEYS)
    } else {
        inputs.iter().find_map(|k| record.get_str(k))
    };

    match base {
        Some(base) => territory_price(&base, territory),
        None => Ok(String::new()),
    }
}

/// Strategy: wholesale discount for `code` (config `wholesale_discount` wins)
pub fn discount(ctx: &MappingContext, code: &str) -> Result<String, StrategyError> {
    if let Some(discount) = ctx.config.setting("wholesale_discount") {
        return Ok(discount.to_string());
    }
    ctx.tables
        .territory(code)
        .map(|t| t.discount.clone())
        .ok_or(StrategyError::UnknownLookup {
            table: "territory",
            key: code.to_string(),
        })
}
