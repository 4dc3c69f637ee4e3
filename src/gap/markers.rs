//! Gap marker detection
//!
//! Two notations are understood: the tagged form `[GAP:n]` and runs of three
//! or more underscores. Underscore runs carry no index of their own, so they
//! are numbered 1..N in scan order.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

const TAGGED_PATTERN: &str = r"\[GAP:(\d+)\]";
const UNDERSCORE_PATTERN: &str = r"_{3,}";

fn tagged_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TAGGED_PATTERN).expect("tagged marker pattern is valid"))
}

fn underscore_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(UNDERSCORE_PATTERN).expect("underscore marker pattern is valid"))
}

/// Which notation(s) to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum NotationMode {
    /// Tagged markers first, underscore runs only if no tagged marker exists
    #[default]
    Auto,
    #[serde(alias = "[GAP:n]")]
    Tagged,
    #[serde(alias = "___")]
    Underscore,
}

/// The literal syntax a marker was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notation {
    Tagged,
    Underscore,
}

/// A gap placeholder located in the original text. Offsets are byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GapMarker {
    pub index: u32,
    pub notation: Notation,
    pub start: usize,
    pub end: usize,
}

impl GapMarker {
    /// The marker's literal text as it appears in `text`.
    pub fn literal<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.start..self.end).unwrap_or("")
    }

    /// Canonical tagged spelling of this marker.
    pub fn tag(&self) -> String {
        format!("[GAP:{}]", self.index)
    }
}

/// Detect markers in `text`, sorted by start offset.
pub fn detect_markers(text: &str, mode: NotationMode) -> Vec<GapMarker> {
    let mut markers = match mode {
        NotationMode::Tagged => scan_tagged(text),
        NotationMode::Underscore => scan_underscore(text),
        NotationMode::Auto => {
            let tagged = scan_tagged(text);
            if tagged.is_empty() {
                scan_underscore(text)
            } else {
                tagged
            }
        }
    };
    markers.sort_by_key(|m| m.start);
    markers
}

fn scan_tagged(text: &str) -> Vec<GapMarker> {
    let mut seen = HashSet::new();
    let mut markers = Vec::new();

    for caps in tagged_re().captures_iter(text) {
        let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Ok(index) = digits.as_str().parse::<u32>() else {
            tracing::debug!(marker = whole.as_str(), "skipping marker with unparseable index");
            continue;
        };
        if !seen.insert(index) {
            tracing::warn!(index, offset = whole.start(), "skipping duplicate gap marker");
            continue;
        }
        markers.push(GapMarker {
            index,
            notation: Notation::Tagged,
            start: whole.start(),
            end: whole.end(),
        });
    }

    markers
}

fn scan_underscore(text: &str) -> Vec<GapMarker> {
    underscore_re()
        .find_iter(text)
        .zip(1u32..)
        .map(|(m, index)| GapMarker {
            index,
            notation: Notation::Underscore,
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// Rewrite underscore markers into the tagged form and re-detect.
///
/// Replacement runs right-to-left so earlier offsets stay valid. Text that
/// already uses tagged markers (or has none) is returned unchanged.
pub fn normalize_to_tagged(text: &str) -> (String, Vec<GapMarker>) {
    let markers = detect_markers(text, NotationMode::Auto);
    if markers.iter().all(|m| m.notation == Notation::Tagged) {
        return (text.to_string(), markers);
    }

    let mut result = text.to_string();
    for marker in markers.iter().rev() {
        result.replace_range(marker.start..marker.end, &marker.tag());
    }

    let rescanned = detect_markers(&result, NotationMode::Tagged);
    (result, rescanned)
}

/// Every literal marker (either notation) still present in `text`.
pub fn find_marker_literals(text: &str) -> Vec<&str> {
    let mut found: Vec<(usize, &str)> = tagged_re()
        .find_iter(text)
        .chain(underscore_re().find_iter(text))
        .map(|m| (m.start(), m.as_str()))
        .collect();
    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, literal)| literal).collect()
}

/// Byte spans of every marker literal in `text`, detected or not.
pub(crate) fn marker_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = tagged_re()
        .find_iter(text)
        .chain(underscore_re().find_iter(text))
        .map(|m| (m.start(), m.end()))
        .collect();
    spans.sort_unstable();
    spans
}

pub fn contains_marker_syntax(text: &str) -> bool {
    tagged_re().is_match(text) || underscore_re().is_match(text)
}

/// Remove any marker syntax from a piece of text (e.g. a model answer that
/// echoed the placeholder back). Only the literals go; inner spacing is kept
/// and the ends are trimmed.
pub fn strip_marker_syntax(text: &str) -> String {
    let without_tags = tagged_re().replace_all(text, "");
    let without_runs = underscore_re().replace_all(&without_tags, "");
    without_runs.trim().to_string()
}
