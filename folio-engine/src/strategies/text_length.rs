//! Length-constrained text
//!
//! A text context (`short_description`, `keywords`, ...) has a character limit
//! resolved from the scoped config first, then the lookup tables. Text within
//! the limit passes through untouched. Over-length text is either cut at the
//! last word boundary or, when the scope sets `overlength_text = "keep"`,
//! emitted as-is so the validator flags it for regeneration upstream.

use crate::error::StrategyError;
use crate::lookup::LookupTables;
use crate::pipeline::MappingContext;
use crate::types::MetadataRecord;
use folio_common::ResolvedConfig;
use tracing::warn;

/// Result of checking one text against its limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LengthOutcome {
    /// No limit configured, or the text fits
    WithinLimit,
    /// Text exceeds the limit by `excess` characters
    NeedsRegeneration { limit: usize, length: usize, excess: usize },
}

/// Limit for `context`: scope `field_limits`, then lookup tables
pub fn resolve_limit(context: &str, config: &ResolvedConfig, tables: &LookupTables) -> Option<usize> {
    config
        .field_limit(context)
        .or_else(|| tables.text_limit(context))
}

pub fn check_length(text: &str, limit: Option<usize>) -> LengthOutcome {
    let Some(limit) = limit else {
        return LengthOutcome::WithinLimit;
    };
    let length = text.chars().count();
    if length <= limit {
        LengthOutcome::WithinLimit
    } else {
        LengthOutcome::NeedsRegeneration {
            limit,
            length,
            excess: length - limit,
        }
    }
}

/// Cut `text` to at most `max_chars` characters, ending on a word boundary
///
/// Falls back to a hard cut when the first word alone exceeds the limit.
/// Trailing whitespace and dangling `,;:-` are removed; no ellipsis is added.
pub fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut_at = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..cut_at];

    // Already on a boundary if the next char is whitespace
    let next_is_space = text[cut_at..].chars().next().is_some_and(char::is_whitespace);
    let candidate = if next_is_space {
        head
    } else {
        match head.rfind(char::is_whitespace) {
            Some(idx) if idx > 0 => &head[..idx],
            _ => head,
        }
    };

    candidate
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '-'))
        .to_string()
}

/// Strategy: first present input, held to the limit for `context`
pub fn length_limited(
    record: &MetadataRecord,
    inputs: &[String],
    ctx: &MappingContext,
    context: &str,
) -> Result<String, StrategyError> {
    let Some(text) = inputs.iter().find_map(|k| record.get_str(k)) else {
        return Ok(String::new());
    };
    let limit = resolve_limit(context, ctx.config, ctx.tables);

    match check_length(&text, limit) {
        LengthOutcome::WithinLimit => Ok(text),
        LengthOutcome::NeedsRegeneration { limit, length, .. } => {
            if ctx.config.setting("overlength_text") == Some("keep") {
                warn!(
                    book_id = %record.book_id(),
                    context,
                    length,
                    limit,
                    "Text over limit; left for regeneration"
                );
                Ok(text)
            } else {
                warn!(
                    book_id = %record.book_id(),
                    context,
                    length,
                    limit,
                    "Text over limit; truncated at word boundary"
                );
                Ok(truncate_at_word_boundary(&text, limit))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_limit_unchanged() {
        assert_eq!(truncate_at_word_boundary("short text", 50), "short text");
        assert_eq!(check_length("abc", Some(3)), LengthOutcome::WithinLimit);
        assert_eq!(check_length("anything", None), LengthOutcome::WithinLimit);
    }

    #[test]
    fn test_check_reports_excess() {
        assert_eq!(
            check_length("abcdef", Some(4)),
            LengthOutcome::NeedsRegeneration { limit: 4, length: 6, excess: 2 }
        );
    }

    #[test]
    fn test_truncates_at_word_boundary() {
        let text = "The quick brown fox jumps over the lazy dog";
        assert_eq!(truncate_at_word_boundary(text, 18), "The quick brown");
        assert_eq!(truncate_at_word_boundary(text, 19), "The quick brown fox");
        assert_eq!(truncate_at_word_boundary("alpha, beta, gamma", 12), "alpha, beta");
    }

    #[test]
    fn test_hard_cut_for_single_long_word() {
        assert_eq!(truncate_at_word_boundary("Supercalifragilistic", 5), "Super");
    }

    #[test]
    fn test_multibyte_safe() {
        let text = "Café société élégante";
        let cut = truncate_at_word_boundary(text, 10);
        assert_eq!(cut, "Café");
        assert!(cut.chars().count() <= 10);
    }

    #[test]
    fn test_config_limit_wins() {
        let tables = LookupTables::builtin();
        let mut config = ResolvedConfig::default();
        assert_eq!(resolve_limit("short_description", &config, &tables), Some(350));
        config.field_limits.insert("short_description".to_string(), 200);
        assert_eq!(resolve_limit("short_description", &config, &tables), Some(200));
        assert_eq!(resolve_limit("unheard_of", &config, &tables), None);
    }
}
