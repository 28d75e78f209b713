//! ISBN check digit utilities
//!
//! ISBN-13 uses alternating 1/3 weights modulo 10; ISBN-10 uses descending
//! 10..2 weights modulo 11 with `X` standing for ten.

/// Strip hyphens and whitespace, upper-case any trailing `x`
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Check digit for the first twelve digits of an ISBN-13
///
/// Returns `None` unless `first12` is exactly twelve ASCII digits.
pub fn isbn13_check_digit(first12: &str) -> Option<char> {
    if first12.len() != 12 || !first12.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let sum: u32 = first12
        .bytes()
        .enumerate()
        .map(|(i, b)| {
            let d = (b - b'0') as u32;
            if i % 2 == 0 {
                d
            } else {
                d * 3
            }
        })
        .sum();
    let check = (10 - sum % 10) % 10;
    char::from_digit(check, 10)
}

/// Check digit for the first nine digits of an ISBN-10
pub fn isbn10_check_digit(first9: &str) -> Option<char> {
    if first9.len() != 9 || !first9.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let sum: u32 = first9
        .bytes()
        .enumerate()
        .map(|(i, b)| (10 - i as u32) * (b - b'0') as u32)
        .sum();
    match (11 - sum % 11) % 11 {
        10 => Some('X'),
        d => char::from_digit(d, 10),
    }
}

/// True for a 13-digit string with a correct check digit
pub fn is_valid_isbn13(candidate: &str) -> bool {
    candidate.len() == 13
        && candidate.bytes().all(|b| b.is_ascii_digit())
        && isbn13_check_digit(&candidate[..12]) == candidate.chars().last()
}

/// True for a 10-character ISBN with a correct check character
pub fn is_valid_isbn10(candidate: &str) -> bool {
    candidate.len() == 10
        && candidate.is_ascii()
        && isbn10_check_digit(&candidate[..9]) == candidate.chars().last()
}

/// Convert an ISBN-10 to its 978-prefixed ISBN-13
pub fn isbn10_to_isbn13(isbn10: &str) -> Option<String> {
    let isbn10 = normalize(isbn10);
    if !is_valid_isbn10(&isbn10) {
        return None;
    }
    let first12 = format!("978{}", &isbn10[..9]);
    let check = isbn13_check_digit(&first12)?;
    Some(format!("{}{}", first12, check))
}

/// Recompute the check digit of a 13-character candidate
///
/// Succeeds when the first twelve characters are digits, whatever the
/// thirteenth character is. Returns the corrected identifier.
pub fn repair_isbn13(candidate: &str) -> Option<String> {
    let normalized = normalize(candidate);
    if normalized.len() != 13 || !normalized.is_ascii() {
        return None;
    }
    let first12 = &normalized[..12];
    let check = isbn13_check_digit(first12)?;
    Some(format!("{}{}", first12, check))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isbn13_check_digit() {
        assert_eq!(isbn13_check_digit("978013468599"), Some('1'));
        assert_eq!(isbn13_check_digit("978030640615"), Some('7'));
        assert_eq!(isbn13_check_digit("97801346859"), None);
        assert_eq!(isbn13_check_digit("97801346859A"), None);
    }

    #[test]
    fn test_valid_isbn13() {
        assert!(is_valid_isbn13("9780134685991"));
        assert!(is_valid_isbn13("9780306406157"));
        assert!(!is_valid_isbn13("9780134685992"));
        assert!(!is_valid_isbn13("978013468599X"));
        assert!(!is_valid_isbn13("978-0134685991"));
    }

    #[test]
    fn test_isbn10() {
        assert!(is_valid_isbn10("0306406152"));
        assert!(is_valid_isbn10("080442957X"));
        assert!(!is_valid_isbn10("0306406153"));
        assert_eq!(isbn10_to_isbn13("0-306-40615-2").as_deref(), Some("9780306406157"));
        assert_eq!(isbn10_to_isbn13("0306406153"), None);
    }

    #[test]
    fn test_repair() {
        assert_eq!(repair_isbn13("978013468599X").as_deref(), Some("9780134685991"));
        assert_eq!(repair_isbn13("978-0-13-468599-5").as_deref(), Some("9780134685991"));
        assert_eq!(repair_isbn13("97801346859"), None);
        assert_eq!(repair_isbn13("97801346X5991"), None);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" 978-0-13 468599-1 "), "9780134685991");
        assert_eq!(normalize("080442957x"), "080442957X");
    }
}
