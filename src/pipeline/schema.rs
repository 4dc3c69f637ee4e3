//! Request and response shapes of the enhancement pipeline.

use crate::domain::DomainError;
use crate::gap::NotationMode;
use crate::grammar::CaseCorrection;
use crate::llm::{GenerationParams, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const DEFAULT_DOMAIN: &str = "cars";
pub const SUPPORTED_LANGUAGE: &str = "pl";

/// A request the pipeline refuses before touching any item.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request contains no items")]
    NoItems,
    #[error("{field} must be in {range}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: String,
        range: &'static str,
    },
    #[error("unsupported language '{0}' (only 'pl' is supported)")]
    UnsupportedLanguage(String),
    #[error("duplicate item id '{0}'")]
    DuplicateId(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn new_item_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_language() -> String {
    SUPPORTED_LANGUAGE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementRequest {
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub items: Vec<EnhancementItem>,
    #[serde(default)]
    pub options: EnhancementOptions,
}

impl EnhancementRequest {
    pub fn new(items: Vec<EnhancementItem>) -> Self {
        Self {
            domain: default_domain(),
            model: default_model(),
            items,
            options: EnhancementOptions::default(),
        }
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.items.is_empty() {
            return Err(RequestError::NoItems);
        }
        let mut seen = std::collections::HashSet::new();
        for item in &self.items {
            if !seen.insert(item.id.as_str()) {
                return Err(RequestError::DuplicateId(item.id.clone()));
            }
        }
        self.options.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementItem {
    #[serde(default = "new_item_id")]
    pub id: String,
    pub text_with_gaps: String,
    /// Facts about the subject, rendered into prompts in key order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
}

impl EnhancementItem {
    pub fn new(text_with_gaps: impl Into<String>) -> Self {
        Self {
            id: new_item_id(),
            text_with_gaps: text_with_gaps.into(),
            attributes: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = Some(attributes);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementOptions {
    #[serde(default = "default_language")]
    pub language: String,
    pub temperature: f32,
    pub max_new_tokens: u32,
    pub top_p: f32,
    /// Candidates wanted per gap; the first is the choice, the rest alternatives.
    pub top_n_per_gap: u32,
    pub gap_notation: NotationMode,
    pub normalize_text: bool,
}

impl Default for EnhancementOptions {
    fn default() -> Self {
        let params = GenerationParams::default();
        Self {
            language: default_language(),
            temperature: params.temperature,
            max_new_tokens: params.max_new_tokens,
            top_p: params.top_p,
            top_n_per_gap: 1,
            gap_notation: NotationMode::Auto,
            normalize_text: false,
        }
    }
}

impl EnhancementOptions {
    pub fn validate(&self) -> Result<(), RequestError> {
        if !self.language.eq_ignore_ascii_case(SUPPORTED_LANGUAGE) {
            return Err(RequestError::UnsupportedLanguage(self.language.clone()));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(RequestError::OutOfRange {
                field: "temperature",
                value: self.temperature.to_string(),
                range: "[0, 1]",
            });
        }
        if !(50..=1000).contains(&self.max_new_tokens) {
            return Err(RequestError::OutOfRange {
                field: "max_new_tokens",
                value: self.max_new_tokens.to_string(),
                range: "[50, 1000]",
            });
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(RequestError::OutOfRange {
                field: "top_p",
                value: self.top_p.to_string(),
                range: "(0, 1]",
            });
        }
        if !(1..=5).contains(&self.top_n_per_gap) {
            return Err(RequestError::OutOfRange {
                field: "top_n_per_gap",
                value: self.top_n_per_gap.to_string(),
                range: "[1, 5]",
            });
        }
        Ok(())
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            max_new_tokens: self.max_new_tokens,
            top_p: self.top_p,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Ok,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Success,
    Partial,
    Error,
}

impl BatchStatus {
    /// `success` if no item failed, `error` if all did, `partial` otherwise.
    /// Items with warnings count as processed.
    pub fn aggregate<'a>(statuses: impl IntoIterator<Item = &'a ItemStatus>) -> Self {
        let (mut total, mut failed) = (0usize, 0usize);
        for status in statuses {
            total += 1;
            if *status == ItemStatus::Error {
                failed += 1;
            }
        }
        if failed == 0 {
            BatchStatus::Success
        } else if failed == total {
            BatchStatus::Error
        } else {
            BatchStatus::Partial
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapFill {
    pub index: u32,
    /// Marker literal the fill replaced, e.g. `[GAP:1]`
    pub marker: String,
    pub choice: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedItem {
    pub id: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_text: Option<String>,
    pub gaps: Vec<GapFill>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub corrections: Vec<CaseCorrection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// `inference` or `parse`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancementResponse {
    pub domain: String,
    pub model: String,
    pub items: Vec<ProcessedItem>,
    pub processing_time_ms: u64,
    pub status: BatchStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapCount {
    pub id: String,
    pub gap_count: usize,
    pub has_gaps: bool,
    pub text_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapCountReport {
    pub items: Vec<GapCount>,
    pub total_gaps: usize,
    /// Every item has at least one gap.
    pub valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_request_gets_defaults() {
        let request: EnhancementRequest =
            serde_json::from_str(r#"{"items": [{"text_with_gaps": "Auto [GAP:1]"}]}"#).unwrap();
        assert_eq!(request.domain, "cars");
        assert_eq!(request.model, "bielik-1.5b-gguf");
        assert_eq!(request.options, EnhancementOptions::default());
        assert_eq!(request.items[0].id.len(), 36);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_options_ranges() {
        let check = |json: &str| {
            serde_json::from_str::<EnhancementOptions>(json)
                .unwrap()
                .validate()
        };
        assert!(check(r#"{"temperature": 1.0, "max_new_tokens": 50, "top_n_per_gap": 5}"#).is_ok());
        assert!(matches!(
            check(r#"{"temperature": 1.5}"#),
            Err(RequestError::OutOfRange { field: "temperature", .. })
        ));
        assert!(matches!(
            check(r#"{"max_new_tokens": 20}"#),
            Err(RequestError::OutOfRange { field: "max_new_tokens", .. })
        ));
        assert!(matches!(
            check(r#"{"top_p": 0.0}"#),
            Err(RequestError::OutOfRange { field: "top_p", .. })
        ));
        assert!(matches!(
            check(r#"{"top_n_per_gap": 6}"#),
            Err(RequestError::OutOfRange { field: "top_n_per_gap", .. })
        ));
        assert!(matches!(
            check(r#"{"language": "en"}"#),
            Err(RequestError::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn test_out_of_range_message() {
        let err = RequestError::OutOfRange {
            field: "top_n_per_gap",
            value: "9".into(),
            range: "[1, 5]",
        };
        assert_eq!(err.to_string(), "top_n_per_gap must be in [1, 5], got 9");
    }

    #[test]
    fn test_request_validation() {
        assert!(matches!(
            EnhancementRequest::new(Vec::new()).validate(),
            Err(RequestError::NoItems)
        ));
        let request = EnhancementRequest::new(vec![
            EnhancementItem::new("a").with_id("x"),
            EnhancementItem::new("b").with_id("x"),
        ]);
        assert!(matches!(request.validate(), Err(RequestError::DuplicateId(id)) if id == "x"));
    }

    #[test]
    fn test_notation_aliases() {
        let options: EnhancementOptions =
            serde_json::from_str(r#"{"gap_notation": "[GAP:n]"}"#).unwrap();
        assert_eq!(options.gap_notation, NotationMode::Tagged);
    }

    #[test]
    fn test_batch_status_aggregate() {
        let ok = ItemStatus::Ok;
        let warning = ItemStatus::Warning;
        let failed = ItemStatus::Error;
        assert_eq!(BatchStatus::aggregate(&[ok, warning]), BatchStatus::Success);
        assert_eq!(BatchStatus::aggregate(&[ok, failed]), BatchStatus::Partial);
        assert_eq!(BatchStatus::aggregate(&[failed, failed]), BatchStatus::Error);
    }
}
