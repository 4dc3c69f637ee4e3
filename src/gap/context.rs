//! Context windows around a single gap marker.
//!
//! A window never reaches into a neighbouring marker: each side is clamped at
//! the nearest other marker literal so a per-gap prompt cannot leak another
//! gap's identity.

use super::markers::{marker_spans, GapMarker};
use serde::Serialize;

pub const DEFAULT_CONTEXT_WINDOW: usize = 30;

/// What the described gap is shown as inside a rendered context.
pub const GAP_PLACEHOLDER: &str = "___";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapContext {
    pub index: u32,
    pub before: String,
    pub after: String,
}

impl GapContext {
    /// Context with the gap itself shown as a placeholder.
    pub fn render(&self) -> String {
        format!("{}{}{}", self.before, GAP_PLACEHOLDER, self.after)
            .trim()
            .to_string()
    }
}

/// Compute the context of `marker` within `text`, `window` characters per side.
pub fn extract_context(text: &str, marker: &GapMarker, window: usize) -> GapContext {
    let start = marker.start.min(text.len());
    let end = marker.end.clamp(start, text.len());

    let mut left = start_of_window(text, start, window);
    let mut right = end_of_window(text, end, window);

    for (other_start, other_end) in marker_spans(text) {
        if other_start == start && other_end == end {
            continue;
        }
        if other_end <= start && other_end > left {
            left = other_end;
        }
        if other_start >= end && other_start < right {
            right = other_start;
        }
    }

    GapContext {
        index: marker.index,
        before: text[left..start].to_string(),
        after: text[end..right].to_string(),
    }
}

/// Contexts for every marker, in the order given.
pub fn extract_contexts(text: &str, markers: &[GapMarker], window: usize) -> Vec<GapContext> {
    markers
        .iter()
        .map(|marker| extract_context(text, marker, window))
        .collect()
}

fn start_of_window(text: &str, start: usize, window: usize) -> usize {
    if window == 0 {
        return start;
    }
    text[..start]
        .char_indices()
        .rev()
        .nth(window - 1)
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn end_of_window(text: &str, end: usize, window: usize) -> usize {
    text[end..]
        .char_indices()
        .nth(window)
        .map(|(idx, _)| end + idx)
        .unwrap_or(text.len())
}
