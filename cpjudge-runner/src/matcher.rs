// Copyright (c) The cpjudge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Output normalization and multi-answer matching.
//!
//! This is a strict text judge: after normalization, the actual output
//! must equal one of the accepted answers exactly. There is no numeric
//! tolerance of any kind.

/// Canonicalizes program output before comparison.
///
/// Leading and trailing whitespace is stripped from the text as a whole,
/// then CRLF sequences are unified to a single line feed. The result is a
/// fixpoint: normalizing an already-normalized string returns it
/// unchanged.
pub fn normalize(text: &str) -> String {
    let mut text = text.trim().to_owned();
    // A single replace pass is not a fixpoint ("\r\r\n" collapses to
    // "\r\n"), so repeat until no CRLF remains.
    while text.contains("\r\n") {
        text = text.replace("\r\n", "\n");
    }
    text
}

/// Returns true if `actual` matches any of the accepted answers after
/// normalization.
///
/// The first matching candidate short-circuits; the order of `accepted`
/// never changes the boolean result.
pub fn matches(actual: &str, accepted: &[String]) -> bool {
    let actual = normalize(actual);
    accepted
        .iter()
        .any(|candidate| normalize(candidate) == actual)
}

/// The accepted answer surfaced in failure reports.
///
/// By convention this is the first one; which answer is "shown" carries no
/// semantic weight.
pub fn expected_display(accepted: &[String]) -> &str {
    accepted.first().map(String::as_str).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("6\n", &["6\n"], true; "exact")]
    #[test_case("6", &["6\n"], true; "trailing newline trimmed")]
    #[test_case("  6  ", &["6"], true; "surrounding whitespace trimmed")]
    #[test_case("1\r\n2", &["1\n2"], true; "crlf unified")]
    #[test_case("7", &["6"], false; "wrong answer")]
    #[test_case("5", &["5\n", "5"], true; "second candidate")]
    #[test_case("1 2", &["1  2"], false; "interior whitespace is significant")]
    #[test_case("6", &[], false; "no accepted answers")]
    fn matching(actual: &str, accepted: &[&str], expected: bool) {
        let accepted: Vec<String> = accepted.iter().map(|s| (*s).to_owned()).collect();
        assert_eq!(matches(actual, &accepted), expected);
    }

    #[test]
    fn expected_display_is_first_candidate() {
        let accepted = vec!["5\n".to_owned(), "5".to_owned()];
        assert_eq!(expected_display(&accepted), "5\n");
        assert_eq!(expected_display(&[]), "");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(t in "\\PC*") {
            let once = normalize(&t);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalize_handles_carriage_returns(t in "[a-z\r\n ]*") {
            let once = normalize(&t);
            prop_assert_eq!(&normalize(&once), &once);
            prop_assert!(!once.contains("\r\n"));
        }

        #[test]
        fn matching_is_line_ending_agnostic(t in "[a-z0-9\n]*", a in "[a-z0-9\n]*") {
            let crlf = t.replace('\n', "\r\n");
            let accepted = vec![a];
            prop_assert_eq!(matches(&t, &accepted), matches(&crlf, &accepted));
        }

        #[test]
        fn match_result_is_order_independent(
            actual in "[a-c\n]{0,6}",
            mut accepted in prop::collection::vec("[a-c\n]{0,6}", 0..4),
        ) {
            let forward = matches(&actual, &accepted);
            accepted.reverse();
            prop_assert_eq!(matches(&actual, &accepted), forward);
        }
    }
}
