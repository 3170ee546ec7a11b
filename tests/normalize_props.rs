/// Property-based tests using proptest
/// Tests invariants of the name parser and the input normalizers.
use proptest::prelude::*;
use rust_leads_api::normalize::{
    digits_only, letters_and_spaces, letters_only_upper, parse_full_name, upper_trim,
};

// Property: name parsing should never panic and degrades to empty parts
proptest! {
    #[test]
    fn name_parsing_never_panics(name in "\\PC*") {
        let _ = parse_full_name(&name);
    }

    #[test]
    fn whitespace_only_names_yield_empty_parts(name in "[ \t]*") {
        let parsed = parse_full_name(&name);
        prop_assert_eq!(parsed.first, "");
        prop_assert_eq!(parsed.middle, "");
        prop_assert_eq!(parsed.last, "");
    }

    #[test]
    fn single_token_names_have_no_middle_or_last(token in "[A-Za-z]{1,12}") {
        let parsed = parse_full_name(&token);
        prop_assert_eq!(parsed.first, token);
        prop_assert_eq!(parsed.middle, "");
        prop_assert_eq!(parsed.last, "");
    }

    #[test]
    fn parsed_parts_reassemble_to_the_normalized_name(
        tokens in prop::collection::vec("[A-Za-z]{1,8}", 1..6)
    ) {
        let raw = tokens.join(" ");
        let parsed = parse_full_name(&raw);

        let mut parts = vec![parsed.first];
        if !parsed.middle.is_empty() {
            parts.push(parsed.middle);
        }
        if !parsed.last.is_empty() {
            parts.push(parsed.last);
        }
        prop_assert_eq!(parts.join(" "), raw);
    }

    #[test]
    fn irregular_spacing_does_not_change_the_split(
        tokens in prop::collection::vec("[A-Za-z]{1,8}", 2..5),
        padding in 1usize..4
    ) {
        let spaced = tokens.join(&" ".repeat(padding));
        let compact = tokens.join(" ");
        prop_assert_eq!(parse_full_name(&spaced), parse_full_name(&compact));
    }
}

// Property: digit extraction keeps exactly the digits, in order
proptest! {
    #[test]
    fn digits_only_output_is_all_digits(raw in "\\PC*") {
        prop_assert!(digits_only(&raw).chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn digit_extraction_preserves_order(mobile in "[0-9]{10}") {
        let formatted = format!("+91 {}-{}", &mobile[..5], &mobile[5..]);
        prop_assert_eq!(digits_only(&formatted), format!("91{}", mobile));
    }
}

// Property: attribution tags reduce to uppercase ASCII letters
proptest! {
    #[test]
    fn attribution_tags_are_upper_ascii(raw in "\\PC*") {
        let tag = letters_only_upper(&raw);
        prop_assert!(tag.chars().all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn name_stripping_keeps_letters_and_spaces_only(raw in "\\PC*") {
        let name = letters_and_spaces(&raw);
        prop_assert!(name.chars().all(|c| c.is_ascii_alphabetic() || c == ' '));
    }
}

// Property: natural-key normalization is idempotent
proptest! {
    #[test]
    fn upper_trim_is_idempotent(raw in "[ ]?[A-Za-z0-9]{0,12}[ ]?") {
        let once = upper_trim(&raw);
        prop_assert_eq!(upper_trim(&once), once);
    }
}
