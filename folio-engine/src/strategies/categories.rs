//! BISAC subject resolution
//!
//! Upstream category strings come as `"BUS041000 Business & Economics / Management"`,
//! `"BUS041000: ..."`, a bare code, a canonical heading, or a truncated or
//! abbreviated heading. The leading code is split off at the first space,
//! colon, dash or semicolon after the nine-character code.

use crate::error::StrategyError;
use crate::lookup::BisacTable;
use crate::pipeline::MappingContext;
use crate::types::MetadataRecord;
use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z]{3}\d{6})(?:\s*[:;\-–]\s*|\s+|$)(.*)$").expect("BISAC code regex is valid")
});

/// Minimum characters before a prefix match against headings is attempted
const MIN_PREFIX_LEN: usize = 8;

/// Split `"CODE rest"` into `(CODE, rest)`; `None` when no leading code
pub fn extract_code(raw: &str) -> Option<(String, String)> {
    let caps = LEADING_CODE_RE.captures(raw)?;
    let code = caps.get(1)?.as_str().to_ascii_uppercase();
    let rest = caps.get(2).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
    Some((code, rest))
}

/// Canonical heading for a category string, or the input unchanged
///
/// Order: known code → exact heading → abbreviation table → expanded
/// top-level prefix → unique heading prefix (for truncated text).
pub fn resolve_heading(raw: &str, table: &BisacTable) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let (code, text) = match extract_code(raw) {
        Some((code, rest)) => (Some(code), rest),
        None => (None, raw.to_string()),
    };

    if let Some(heading) = code.as_deref().and_then(|c| table.heading_for(c)) {
        return heading.to_string();
    }
    if text.is_empty() {
        return raw.to_string();
    }
    if let Some(heading) = table.canonical_heading(&text) {
        return heading.to_string();
    }
    if let Some(heading) = table
        .abbreviations
        .iter()
        .find(|(abbr, _)| abbr.eq_ignore_ascii_case(&text))
        .map(|(_, full)| full)
    {
        return heading.clone();
    }

    let expanded = expand_top_level(&text, table);
    if let Some(heading) = table.canonical_heading(&expanded) {
        return heading.to_string();
    }

    let trimmed = expanded.trim_end_matches(['.', '…', ' ']);
    if trimmed.chars().count() >= MIN_PREFIX_LEN {
        let lower = trimmed.to_lowercase();
        let matches: Vec<&String> = table
            .codes
            .values()
            .filter(|h| h.to_lowercase().starts_with(&lower))
            .collect();
        if matches.len() == 1 {
            return matches[0].clone();
        }
    }

    text
}

/// `"BUS / General"` → `"BUSINESS & ECONOMICS / General"`
fn expand_top_level(text: &str, table: &BisacTable) -> String {
    let Some((head, tail)) = text.split_once('/') else {
        return text.to_string();
    };
    match table.top_level.get(&head.trim().to_ascii_uppercase()) {
        Some(full) => format!("{} /{}", full, tail),
        None => text.to_string(),
    }
}

/// Strategy: `position`-th (1-based) category
///
/// `inputs[0]` is the position-specific key and is used whole when it holds
/// a single value. Later inputs are lists (joined with `"; "` upstream) that
/// are split and indexed by position.
pub fn bisac_category(
    record: &MetadataRecord,
    inputs: &[String],
    ctx: &MappingContext,
    position: usize,
) -> Result<String, StrategyError> {
    if position == 0 {
        return Err(StrategyError::Evaluation(
            "BISAC category positions start at 1".to_string(),
        ));
    }

    for (i, key) in inputs.iter().enumerate() {
        let Some(raw) = record.get_str(key) else {
            continue;
        };
        let entries: Vec<&str> = raw
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        let entry = if i == 0 && entries.len() == 1 {
            entries.first()
        } else {
            entries.get(position - 1)
        };
        return Ok(entry
            .map(|e| resolve_heading(e, &ctx.tables.bisac))
            .unwrap_or_default());
    }
    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::LookupTables;

    fn table() -> BisacTable {
        LookupTables::builtin().bisac
    }

    #[test]
    fn test_extract_code() {
        assert_eq!(
            extract_code("BUS041000 Business & Economics / Management"),
            Some(("BUS041000".to_string(), "Business & Economics / Management".to_string()))
        );
        assert_eq!(
            extract_code("com004000: AI"),
            Some(("COM004000".to_string(), "AI".to_string()))
        );
        assert_eq!(extract_code("FIC000000"), Some(("FIC000000".to_string(), String::new())));
        assert_eq!(extract_code("BUSINESS & ECONOMICS / General"), None);
        assert_eq!(
            extract_code("HIS027000 - History / Military"),
            Some(("HIS027000".to_string(), "History / Military".to_string()))
        );
    }

    #[test]
    fn test_resolve_by_code_and_heading() {
        let table = table();
        assert_eq!(resolve_heading("BUS041000", &table), "BUSINESS & ECONOMICS / Management");
        assert_eq!(
            resolve_heading("business & economics / general", &table),
            "BUSINESS & ECONOMICS / General"
        );
    }

    #[test]
    fn test_resolve_abbreviated_and_truncated() {
        let table = table();
        assert_eq!(
            resolve_heading("COMPUTERS / Artificial Intel", &table),
            "COMPUTERS / Artificial Intelligence / General"
        );
        assert_eq!(resolve_heading("BUS / Leadership", &table), "BUSINESS & ECONOMICS / Leadership");
        assert_eq!(
            resolve_heading("POLITICAL SCIENCE / International Rel...", &table),
            "POLITICAL SCIENCE / International Relations / General"
        );
    }

    #[test]
    fn test_unknown_falls_back_to_input() {
        let table = table();
        assert_eq!(resolve_heading("UNDERWATER BASKETS / Weaving", &table), "UNDERWATER BASKETS / Weaving");
        // ambiguous prefix is not guessed
        assert_eq!(resolve_heading("COMPUTERS / ", &table), "COMPUTERS /");
    }
}
