// Copyright (c) The cpjudge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test case store.
//!
//! A case file is a single JSON array; each element is an object with a
//! `test` field (the stdin text) and a `correct_answers` field (the
//! accepted outputs). A case missing either field still loads -- validity
//! is checked per case at run time, so one malformed element does not
//! abort the whole set.

use crate::errors::CaseListLoadError;
use camino::Utf8Path;
use serde::Deserialize;
use std::fmt;

/// A single raw test case as it appears in the case file.
///
/// Both fields are optional at this level; use [`TestCase::valid`] to
/// obtain the checked view.
#[derive(Clone, Debug, Deserialize)]
pub struct TestCase {
    /// The text fed to the program's stdin.
    #[serde(default)]
    pub test: Option<String>,

    /// The accepted outputs. Matching any one of them passes the case.
    #[serde(default)]
    pub correct_answers: Option<Vec<String>>,
}

impl TestCase {
    /// Returns the checked view of this case, or the reason it is
    /// malformed.
    pub fn valid(&self) -> Result<ValidCase<'_>, MalformedCaseReason> {
        let input = self.test.as_deref().ok_or(MalformedCaseReason::MissingInput)?;
        let accepted = self
            .correct_answers
            .as_deref()
            .ok_or(MalformedCaseReason::MissingAnswers)?;
        if accepted.is_empty() {
            return Err(MalformedCaseReason::EmptyAnswers);
        }
        Ok(ValidCase { input, accepted })
    }
}

/// A well-formed test case: input text plus a non-empty set of accepted
/// outputs.
#[derive(Clone, Copy, Debug)]
pub struct ValidCase<'a> {
    /// The text fed to the program's stdin.
    pub input: &'a str,

    /// The accepted outputs. Guaranteed non-empty.
    pub accepted: &'a [String],
}

/// The reason a case cannot be executed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MalformedCaseReason {
    /// The `test` field is missing.
    MissingInput,

    /// The `correct_answers` field is missing.
    MissingAnswers,

    /// The `correct_answers` array is empty.
    EmptyAnswers,
}

impl fmt::Display for MalformedCaseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput => write!(f, "case is missing the `test` field"),
            Self::MissingAnswers => write!(f, "case is missing the `correct_answers` field"),
            Self::EmptyAnswers => write!(f, "case has an empty `correct_answers` array"),
        }
    }
}

/// An ordered, index-addressable list of test cases.
///
/// Loaded once per session and immutable during a run.
#[derive(Clone, Debug)]
pub struct CaseList {
    cases: Vec<TestCase>,
}

impl CaseList {
    /// Loads a case list from a JSON file.
    pub fn load(path: &Utf8Path) -> Result<Self, CaseListLoadError> {
        let data = std::fs::read_to_string(path).map_err(|error| CaseListLoadError::Read {
            path: path.to_owned(),
            error,
        })?;
        Self::from_json_str(&data).map_err(|error| CaseListLoadError::Parse {
            path: path.to_owned(),
            error,
        })
    }

    /// Parses a case list from an in-memory JSON string.
    pub fn from_json_str(data: &str) -> Result<Self, serde_json::Error> {
        let cases = serde_json::from_str(data)?;
        Ok(Self { cases })
    }

    /// Returns the number of cases in the list.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Returns true if the list contains no cases.
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Returns the case at `index`, if there is one.
    pub fn get(&self, index: usize) -> Option<&TestCase> {
        self.cases.get(index)
    }

    /// Iterates over the cases in index order.
    pub fn iter(&self) -> impl Iterator<Item = &TestCase> + '_ {
        self.cases.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_well_formed_cases() {
        let json = indoc! {r#"
            [
                { "test": "3\n", "correct_answers": ["6\n"] },
                { "test": "1 2\n", "correct_answers": ["3\n", "3"] }
            ]
        "#};
        let list = CaseList::from_json_str(json).expect("valid case file");
        assert_eq!(list.len(), 2);

        let first = list.get(0).unwrap().valid().expect("well-formed case");
        assert_eq!(first.input, "3\n");
        assert_eq!(first.accepted, ["6\n".to_owned()]);
    }

    #[test]
    fn missing_fields_defer_to_run_time() {
        let json = r#"[{ "test": "1\n" }, { "correct_answers": ["2"] }, {}]"#;
        let list = CaseList::from_json_str(json).expect("missing fields are not a parse error");
        assert_eq!(list.len(), 3);

        assert_eq!(
            list.get(0).unwrap().valid().unwrap_err(),
            MalformedCaseReason::MissingAnswers
        );
        assert_eq!(
            list.get(1).unwrap().valid().unwrap_err(),
            MalformedCaseReason::MissingInput
        );
        assert_eq!(
            list.get(2).unwrap().valid().unwrap_err(),
            MalformedCaseReason::MissingInput
        );
    }

    #[test]
    fn empty_answers_are_malformed() {
        let json = r#"[{ "test": "1\n", "correct_answers": [] }]"#;
        let list = CaseList::from_json_str(json).unwrap();
        assert_eq!(
            list.get(0).unwrap().valid().unwrap_err(),
            MalformedCaseReason::EmptyAnswers
        );
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let json = r#"[{ "test": "1\n", "correct_answers": ["2"], "comment": "doubling" }]"#;
        let list = CaseList::from_json_str(json).unwrap();
        assert!(list.get(0).unwrap().valid().is_ok());
    }

    #[test]
    fn rejects_non_array_documents() {
        for json in [r#"{ "test": "1" }"#, "42", "not json at all"] {
            CaseList::from_json_str(json).expect_err("only arrays are accepted");
        }
    }

    #[test]
    fn load_reports_missing_file() {
        let err = CaseList::load(Utf8Path::new("this/file/does/not/exist.json")).unwrap_err();
        assert!(matches!(
            err,
            crate::errors::CaseListLoadError::Read { .. }
        ));
    }
}
