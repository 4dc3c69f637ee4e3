//! Grammatical cases and the rules that decide which case a gap must take.
//!
//! Governance is decided from the single token right before the marker:
//! a preposition from the fixed table, a noun with a known case, or an
//! accusative-governing verb, in that order.

use crate::domain::DomainConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The seven Polish cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Case {
    Nominative,
    Genitive,
    Dative,
    Accusative,
    Instrumental,
    Locative,
    Vocative,
}

impl Case {
    pub const ALL: [Case; 7] = [
        Case::Nominative,
        Case::Genitive,
        Case::Dative,
        Case::Accusative,
        Case::Instrumental,
        Case::Locative,
        Case::Vocative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Case::Nominative => "nominative",
            Case::Genitive => "genitive",
            Case::Dative => "dative",
            Case::Accusative => "accusative",
            Case::Instrumental => "instrumental",
            Case::Locative => "locative",
            Case::Vocative => "vocative",
        }
    }

    pub fn from_name(name: &str) -> Option<Case> {
        Case::ALL
            .into_iter()
            .find(|case| case.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case a filler must take, recomputed per marker and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredCase {
    Governed(Case),
    Unknown,
}

impl RequiredCase {
    pub fn case(&self) -> Option<Case> {
        match self {
            RequiredCase::Governed(case) => Some(*case),
            RequiredCase::Unknown => None,
        }
    }
}

/// Which rule produced a [`RequiredCase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Governor {
    Preposition(String),
    Noun(String),
    Verb(String),
    None,
}

/// Fixed preposition → governed case table.
///
/// Prepositions that govern more than one case are listed under the reading
/// most common in listing texts ("z silnikiem", "w kolorze", "na felgach").
const PREPOSITIONS: &[(&str, Case)] = &[
    ("w", Case::Locative),
    ("we", Case::Locative),
    ("na", Case::Locative),
    ("o", Case::Locative),
    ("przy", Case::Locative),
    ("z", Case::Instrumental),
    ("ze", Case::Instrumental),
    ("przed", Case::Instrumental),
    ("nad", Case::Instrumental),
    ("pod", Case::Instrumental),
    ("między", Case::Instrumental),
    ("bez", Case::Genitive),
    ("do", Case::Genitive),
    ("od", Case::Genitive),
    ("dla", Case::Genitive),
    ("u", Case::Genitive),
    ("obok", Case::Genitive),
    ("podczas", Case::Genitive),
    ("według", Case::Genitive),
    ("wokół", Case::Genitive),
    ("ku", Case::Dative),
    ("dzięki", Case::Dative),
    ("wbrew", Case::Dative),
    ("przez", Case::Accusative),
];

pub fn preposition_case(token: &str) -> Option<Case> {
    PREPOSITIONS
        .iter()
        .find(|(prep, _)| *prep == token)
        .map(|(_, case)| *case)
}

/// The word directly before `text`'s end, lowercased.
///
/// Returns `None` when the text ends in punctuation (or is empty): a comma
/// or full stop between governor and gap breaks the government.
pub fn preceding_token(text: &str) -> Option<String> {
    let trimmed = text.trim_end();
    let last = trimmed.chars().last()?;
    if !last.is_alphanumeric() {
        return None;
    }
    let start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric())
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    Some(trimmed[start..].to_lowercase())
}

/// Decide the case a gap must take given the text before it.
pub fn required_case(text_before: &str, domain: &DomainConfig) -> (RequiredCase, Governor) {
    let Some(token) = preceding_token(text_before) else {
        return (RequiredCase::Unknown, Governor::None);
    };

    if let Some(case) = preposition_case(&token) {
        return (RequiredCase::Governed(case), Governor::Preposition(token));
    }
    if let Some(case) = domain.declensions.noun_case(&token) {
        return (RequiredCase::Governed(case), Governor::Noun(token));
    }
    if domain.accusative_verbs.contains(&token) {
        return (RequiredCase::Governed(Case::Accusative), Governor::Verb(token));
    }

    (RequiredCase::Unknown, Governor::None)
}
