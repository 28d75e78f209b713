//! Asset file names and paths
//!
//! Names are built from a pattern with `{isbn}`, `{file_type}`, `{title}` and
//! `{author}` placeholders, then cleaned so they are safe on every common
//! filesystem: reserved characters become `_`, whitespace/underscore runs
//! collapse to a single `_`, and the file-type extension is appended.

use crate::error::StrategyError;
use crate::fields::Field;
use crate::lookup::NamingConventions;
use crate::pipeline::MappingContext;
use crate::types::MetadataRecord;
use folio_common::isbn;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Identifier aliases in priority order
pub const ISBN_KEYS: &[&str] = &[
    "isbn13",
    "isbn_13",
    "ISBN13",
    "isbn",
    "ISBN",
    "ISBN or SKU",
    "isbn10",
    "isbn_10",
    "ISBN10",
];

static INVALID_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).expect("invalid-char regex is valid"));
static SEPARATOR_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s_]+").expect("separator regex is valid"));

/// Identifier from the first alias holding a 13-digit form, else a 10-digit form
///
/// A valid ISBN-10 is returned as its ISBN-13 equivalent; an invalid one is
/// returned as supplied so validation can flag it.
pub fn extract_identifier(record: &MetadataRecord) -> Option<String> {
    let candidates: Vec<String> = ISBN_KEYS
        .iter()
        .filter_map(|k| record.get_str(k))
        .map(|v| isbn::normalize(&v))
        .collect();

    if let Some(isbn13) = candidates.iter().find(|c| c.len() == 13) {
        return Some(isbn13.clone());
    }
    let isbn10 = candidates.iter().find(|c| c.len() == 10)?;
    Some(isbn::isbn10_to_isbn13(isbn10).unwrap_or_else(|| isbn10.clone()))
}

/// Replace reserved characters and collapse separator runs
pub fn clean_filename(raw: &str) -> String {
    let replaced = INVALID_CHARS_RE.replace_all(raw, "_");
    let collapsed = SEPARATOR_RUN_RE.replace_all(&replaced, "_");
    collapsed.trim_matches(|c| c == '_' || c == '.').to_string()
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Inputs to name generation
#[derive(Debug, Clone, Default)]
pub struct NameParts<'a> {
    pub isbn: &'a str,
    pub file_type: &'a str,
    pub title: &'a str,
    pub author: &'a str,
}

/// File name for one asset, or `None` without an identifier
pub fn generate_filename(parts: &NameParts, pattern: &str, naming: &NamingConventions) -> Option<String> {
    if parts.isbn.trim().is_empty() {
        return None;
    }

    let title = truncate_chars(parts.title.trim(), naming.max_title_length);
    let stem = pattern
        .replace("{isbn}", parts.isbn.trim())
        .replace("{file_type}", parts.file_type)
        .replace("{title}", title)
        .replace("{author}", parts.author.trim());
    let stem = clean_filename(&stem);

    let extension = naming.extension_for(parts.file_type);
    let suffix = format!(".{}", extension);
    if stem.to_lowercase().ends_with(&suffix) {
        Some(stem)
    } else {
        Some(format!("{}{}", stem, suffix))
    }
}

/// File name nested under `{file_type}/{imprint?}/{year?}/`
pub fn generate_organized_path(
    parts: &NameParts,
    pattern: &str,
    naming: &NamingConventions,
    imprint: Option<&str>,
    year: Option<&str>,
) -> Option<String> {
    let filename = generate_filename(parts, pattern, naming)?;
    let mut segments = vec![clean_filename(parts.file_type)];
    segments.extend(
        [imprint, year]
            .into_iter()
            .flatten()
            .map(clean_filename)
            .filter(|s| !s.is_empty()),
    );
    segments.push(filename);
    Some(segments.join("/"))
}

/// Strategy: asset path for `file_type`
///
/// Uses the identifier resolved earlier in the row, falling back to the
/// record's own aliases. An absent identifier yields "" and a warning.
pub fn asset_path(record: &MetadataRecord, ctx: &MappingContext, file_type: &str) -> Result<String, StrategyError> {
    let resolved = ctx.resolved.get(Field::Isbn);
    let identifier = if resolved.is_empty() {
        extract_identifier(record)
    } else {
        Some(resolved.to_string())
    };

    let Some(identifier) = identifier else {
        warn!(
            book_id = %record.book_id(),
            file_type,
            "No identifier available; asset path left empty"
        );
        return Ok(String::new());
    };

    let title = record.get_str("title").unwrap_or_default();
    let author = record
        .first_of(&["author", "contributors.0.name"])
        .unwrap_or_default();
    let parts = NameParts {
        isbn: &identifier,
        file_type,
        title: &title,
        author: &author,
    };

    let naming = &ctx.tables.naming;
    let pattern = ctx.config.setting_or("file_naming_pattern", &naming.pattern);

    let path = if ctx.config.setting("organize_paths") == Some("true") {
        let imprint = ctx
            .config
            .setting("imprint")
            .map(str::to_string)
            .or_else(|| record.get_str("imprint"));
        let year = publication_year(record);
        generate_organized_path(&parts, pattern, naming, imprint.as_deref(), year.as_deref())
    } else {
        generate_filename(&parts, pattern, naming)
    };

    Ok(path.unwrap_or_default())
}

fn publication_year(record: &MetadataRecord) -> Option<String> {
    let date = record.first_of(&["publication_date", "pub_date"])?;
    super::dates::normalize_date(&date).map(|d| d[..4].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts<'a>(isbn: &'a str, file_type: &'a str, title: &'a str) -> NameParts<'a> {
        NameParts {
            isbn,
            file_type,
            title,
            author: "",
        }
    }

    #[test]
    fn test_basic_pattern() {
        let naming = NamingConventions::default();
        let name = generate_filename(&parts("9780134685991", "cover", ""), "{isbn}_{file_type}", &naming);
        assert_eq!(name.as_deref(), Some("9780134685991_cover.pdf"));
    }

    #[test]
    fn test_title_cleaned_and_truncated() {
        let naming = NamingConventions {
            max_title_length: 12,
            ..Default::default()
        };
        let name = generate_filename(
            &parts("9780134685991", "interior", "Why: A/B  Testing?  Works"),
            "{isbn}_{title}_{file_type}",
            &naming,
        )
        .unwrap();
        // "Why: A/B  Te" → "Why_A_B_Te"
        assert_eq!(name, "9780134685991_Why_A_B_Te_interior.pdf");
    }

    #[test]
    fn test_extension_not_doubled() {
        let naming = NamingConventions::default();
        let name = generate_filename(&parts("9780134685991", "epub", ""), "{isbn}.epub", &naming);
        assert_eq!(name.as_deref(), Some("9780134685991.epub"));
    }

    #[test]
    fn test_missing_identifier() {
        let naming = NamingConventions::default();
        assert_eq!(generate_filename(&parts("", "cover", "T"), "{isbn}_{file_type}", &naming), None);
    }

    #[test]
    fn test_organized_path() {
        let naming = NamingConventions::default();
        let path = generate_organized_path(
            &parts("9780134685991", "cover", ""),
            "{isbn}_{file_type}",
            &naming,
            Some("Xynapse Traces"),
            Some("2025"),
        );
        assert_eq!(
            path.as_deref(),
            Some("cover/Xynapse_Traces/2025/9780134685991_cover.pdf")
        );

        let path = generate_organized_path(
            &parts("9780134685991", "cover", ""),
            "{isbn}_{file_type}",
            &naming,
            None,
            None,
        );
        assert_eq!(path.as_deref(), Some("cover/9780134685991_cover.pdf"));
    }

    #[test]
    fn test_extract_prefers_13_digit() {
        let record = MetadataRecord::new()
            .with("isbn10", "0-306-40615-2")
            .with("ISBN", "978-0-306-40615-7");
        assert_eq!(extract_identifier(&record).as_deref(), Some("9780306406157"));

        let record = MetadataRecord::new().with("isbn10", "0-306-40615-2");
        assert_eq!(extract_identifier(&record).as_deref(), Some("9780306406157"));

        // bad check digit is left for validation to report
        let record = MetadataRecord::new().with("isbn10", "0306406153");
        assert_eq!(extract_identifier(&record).as_deref(), Some("0306406153"));
    }

    #[test]
    fn test_clean_filename() {
        assert_eq!(clean_filename("a<b>c"), "a_b_c");
        assert_eq!(clean_filename("  lots   of __ space "), "lots_of_space");
        assert_eq!(clean_filename("..hidden."), "hidden");
    }
}
