//! Publication date normalization to `YYYY-MM-DD`

use crate::error::StrategyError;
use crate::types::MetadataRecord;
use chrono::NaiveDate;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Parse the accepted date spellings; month-only and year-only forms map to the first day
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // ISO timestamps: keep the date part
    let raw = raw.split('T').next().unwrap_or(raw);

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d") {
        return Some(date);
    }
    if raw.len() == 4 {
        if let Ok(year) = raw.parse::<i32>() {
            return NaiveDate::from_ymd_opt(year, 1, 1);
        }
    }
    None
}

pub fn normalize_date(raw: &str) -> Option<String> {
    parse_date(raw).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Strategy: first present date among `inputs`, normalized
pub fn date_field(record: &MetadataRecord, inputs: &[String]) -> Result<String, StrategyError> {
    let Some(raw) = inputs.iter().find_map(|k| record.get_str(k)) else {
        return Ok(String::new());
    };
    normalize_date(&raw).ok_or_else(|| StrategyError::parse(raw, "date"))
}
