//! Pure input-normalization helpers used by the step state-machine.

use regex::Regex;
use serde_json::Value;

/// A full name split into its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedName {
    pub first: String,
    pub middle: String,
    pub last: String,
}

/// Splits a raw full-name string into first, middle and last parts.
///
/// Internal whitespace is normalized before splitting. The first token is
/// the first name, the final token (when there are at least two) the last
/// name, and any interior tokens join into the middle name. Empty input
/// yields three empty strings. ASCII-oriented; no locale awareness.
pub fn parse_full_name(full_name: &str) -> ParsedName {
    let tokens: Vec<&str> = full_name.split_whitespace().collect();
    match tokens.as_slice() {
        [] => ParsedName::default(),
        [first] => ParsedName {
            first: (*first).to_string(),
            ..Default::default()
        },
        [first, middle @ .., last] => ParsedName {
            first: (*first).to_string(),
            middle: middle.join(" "),
            last: (*last).to_string(),
        },
    }
}

/// Keeps only ASCII digits: `"+91 98765-43210"` becomes `"919876543210"`.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Strips everything but ASCII letters and uppercases the rest. Used for
/// campaign/source attribution tags.
pub fn letters_only_upper(raw: &str) -> String {
    let re = Regex::new(r"[^a-zA-Z]").unwrap();
    re.replace_all(raw, "").to_uppercase()
}

/// Strips everything but ASCII letters and spaces. Used for person names,
/// where interior spaces are significant.
pub fn letters_and_spaces(raw: &str) -> String {
    let re = Regex::new(r"[^a-zA-Z ]").unwrap();
    re.replace_all(raw, "").into_owned()
}

/// Uppercases and trims surrounding whitespace: `" ab1234c "` becomes
/// `"AB1234C"`.
pub fn upper_trim(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Coerces a loosely-typed JSON amount to an integer, defaulting to 0.
///
/// Strings are read up to the first non-digit character, so `"50000"` is
/// 50000 and `"50k"` is 50; anything unparseable is 0.
pub fn int_or_zero(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let re = Regex::new(r"^[+-]?[0-9]+").unwrap();
            re.find(s.trim())
                .and_then(|m| m.as_str().parse::<i64>().ok())
                .unwrap_or(0)
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_token_name() {
        assert_eq!(
            parse_full_name("John"),
            ParsedName {
                first: "John".into(),
                middle: "".into(),
                last: "".into(),
            }
        );
    }

    #[test]
    fn three_token_name() {
        assert_eq!(
            parse_full_name("John Middle Doe"),
            ParsedName {
                first: "John".into(),
                middle: "Middle".into(),
                last: "Doe".into(),
            }
        );
    }

    #[test]
    fn interior_tokens_join_into_middle_name() {
        assert_eq!(
            parse_full_name("John A B Doe"),
            ParsedName {
                first: "John".into(),
                middle: "A B".into(),
                last: "Doe".into(),
            }
        );
    }

    #[test]
    fn two_token_name_has_no_middle() {
        assert_eq!(
            parse_full_name("John Doe"),
            ParsedName {
                first: "John".into(),
                middle: "".into(),
                last: "Doe".into(),
            }
        );
    }

    #[test]
    fn empty_name_yields_empty_parts() {
        assert_eq!(parse_full_name(""), ParsedName::default());
        assert_eq!(parse_full_name("   "), ParsedName::default());
    }

    #[test]
    fn irregular_whitespace_is_normalized() {
        assert_eq!(
            parse_full_name("  John   Middle\tDoe "),
            ParsedName {
                first: "John".into(),
                middle: "Middle".into(),
                last: "Doe".into(),
            }
        );
    }

    #[test]
    fn mobile_numbers_reduce_to_digits() {
        assert_eq!(digits_only("+91 98765-43210"), "919876543210");
        assert_eq!(digits_only("no digits"), "");
    }

    #[test]
    fn pancard_is_uppercased_and_trimmed() {
        assert_eq!(upper_trim(" ab1234c "), "AB1234C");
    }

    #[test]
    fn attribution_tags_keep_letters_only() {
        assert_eq!(letters_only_upper("ref-case 01"), "REFCASE");
        assert_eq!(letters_only_upper("c4c"), "CC");
        assert_eq!(letters_only_upper("123"), "");
    }

    #[test]
    fn names_keep_letters_and_spaces() {
        assert_eq!(letters_and_spaces("John D0e Jr."), "John De Jr");
    }

    #[test]
    fn amounts_coerce_with_zero_default() {
        assert_eq!(int_or_zero(Some(&json!(50000))), 50000);
        assert_eq!(int_or_zero(Some(&json!("50000"))), 50000);
        assert_eq!(int_or_zero(Some(&json!("50k"))), 50);
        assert_eq!(int_or_zero(Some(&json!("about"))), 0);
        assert_eq!(int_or_zero(Some(&json!(null))), 0);
        assert_eq!(int_or_zero(None), 0);
    }
}
