//! Gap markers: detection, notation normalization and context windows.

pub mod context;
pub mod markers;
pub mod normalize;

pub use context::{extract_context, extract_contexts, GapContext, DEFAULT_CONTEXT_WINDOW};
pub use markers::{
    contains_marker_syntax, detect_markers, find_marker_literals, normalize_to_tagged,
    strip_marker_syntax, GapMarker, Notation, NotationMode,
};
pub use normalize::normalize_text;
