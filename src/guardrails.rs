//! Post-fill checks on the final text and the fills that produced it.
//!
//! Every check runs even after an earlier one failed. Errors and warnings are
//! plain messages; whether they block is decided by the [`ValidationLevel`].

use crate::config::Config;
use crate::domain::DomainConfig;
use crate::fill::FillChoice;
use crate::gap::{contains_marker_syntax, find_marker_literals, strip_marker_syntax};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    /// Warnings block as well as errors
    Strict,
    #[default]
    Normal,
    /// Nothing blocks; issues are still reported
    Lenient,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationLevel::Strict => "strict",
            ValidationLevel::Normal => "normal",
            ValidationLevel::Lenient => "lenient",
        }
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(ValidationLevel::Strict),
            "normal" => Ok(ValidationLevel::Normal),
            "lenient" => Ok(ValidationLevel::Lenient),
            other => Err(format!(
                "unknown validation level '{}' (expected strict, normal or lenient)",
                other
            )),
        }
    }
}

/// Numeric thresholds for one validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min_length: usize,
    pub max_length: usize,
    pub max_fill_length: usize,
}

impl Limits {
    /// Config values where set, domain thresholds otherwise.
    pub fn resolve(config: &Config, domain: &DomainConfig) -> Self {
        Self {
            min_length: config.min_length.unwrap_or(domain.min_length),
            max_length: config.max_length.unwrap_or(domain.max_length),
            max_fill_length: config.max_fill_length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub level: ValidationLevel,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Errors followed by warnings.
    pub fn issues(&self) -> Vec<String> {
        self.errors.iter().chain(&self.warnings).cloned().collect()
    }
}

pub fn validate(
    final_text: &str,
    original_text: &str,
    fills: &[FillChoice],
    domain: &DomainConfig,
    limits: &Limits,
    level: ValidationLevel,
) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    check_markers(final_text, &mut errors);
    check_length(final_text, original_text, limits, &mut errors, &mut warnings);
    check_relevance(final_text, domain, &mut warnings);
    check_prohibited(final_text, domain, &mut warnings);
    check_grammar(final_text, domain, &mut warnings);
    check_fills(fills, limits, &mut errors, &mut warnings);

    let is_valid = match level {
        ValidationLevel::Strict => errors.is_empty() && warnings.is_empty(),
        ValidationLevel::Normal => errors.is_empty(),
        ValidationLevel::Lenient => true,
    };

    ValidationReport {
        is_valid,
        level,
        errors,
        warnings,
    }
}

fn check_markers(text: &str, errors: &mut Vec<String>) {
    let leftover = find_marker_literals(text);
    if !leftover.is_empty() {
        errors.push(format!(
            "Found {} unfilled gap markers: {}",
            leftover.len(),
            leftover.join(", ")
        ));
    }
}

fn check_length(
    text: &str,
    original: &str,
    limits: &Limits,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    let len = text.chars().count();
    if len > limits.max_length {
        errors.push(format!(
            "Text exceeds maximum length ({} > {})",
            len, limits.max_length
        ));
    }
    if len < limits.min_length {
        errors.push(format!(
            "Text is too short ({} < {})",
            len, limits.min_length
        ));
    }

    let original_len = strip_marker_syntax(original)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .count();
    if len < original_len {
        warnings.push(format!(
            "Text ({} chars) is shorter than the original without markers ({} chars)",
            len, original_len
        ));
    }
}

fn check_relevance(text: &str, domain: &DomainConfig, warnings: &mut Vec<String>) {
    if !domain.vocabulary.is_empty() && !domain.mentions_vocabulary(text) {
        warnings.push(format!("Text lacks {}-related terminology", domain.name));
    }
}

fn check_prohibited(text: &str, domain: &DomainConfig, warnings: &mut Vec<String>) {
    for word in domain.prohibited_in(text) {
        warnings.push(format!("Text contains prohibited word '{}'", word));
    }
}

fn check_grammar(text: &str, domain: &DomainConfig, warnings: &mut Vec<String>) {
    for message in domain.grammar_issues(text) {
        warnings.push(format!("Potential grammar issue: {}", message));
    }
}

/// Fragments a model emits when it echoes a placeholder instead of a word.
const PLACEHOLDERS: &[&str] = &["[gap", "xxxx", "????", "..."];

const INVALID_FILL_CHARS: &[char] = &['[', ']', '<', '>', '"', '\''];

fn is_placeholder(choice: &str) -> bool {
    let lower = choice.to_lowercase();
    contains_marker_syntax(choice) || PLACEHOLDERS.iter().any(|p| lower.contains(p))
}

fn check_fills(
    fills: &[FillChoice],
    limits: &Limits,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    let mut seen = HashSet::new();
    for fill in fills {
        if !seen.insert(fill.index) {
            errors.push(format!("Gap {} appears more than once", fill.index));
        }
        if fill.choice.trim().is_empty() {
            errors.push(format!("Gap {} has an empty choice", fill.index));
            continue;
        }
        if is_placeholder(&fill.choice) {
            errors.push(format!("Fill for gap {} looks like placeholder text", fill.index));
        } else if fill.choice.contains(INVALID_FILL_CHARS) {
            errors.push(format!("Fill for gap {} contains invalid characters", fill.index));
        }
        if fill.choice.chars().count() > limits.max_fill_length {
            warnings.push(format!(
                "Fill for gap {} is longer than {} chars",
                fill.index, limits.max_fill_length
            ));
        }
    }
}
