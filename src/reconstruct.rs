//! Position-preserving reassembly of the final text.

use crate::gap::{strip_marker_syntax, GapMarker};
use std::collections::BTreeMap;

/// Replace every filled marker with its chosen text.
///
/// Markers are applied in descending start order so each replacement leaves
/// the offsets of the markers still to be processed untouched. Markers with no
/// entry in `fills`, or whose fill is nothing but marker syntax, stay in the
/// output verbatim.
pub fn reconstruct<S: AsRef<str>>(
    original: &str,
    markers: &[GapMarker],
    fills: &BTreeMap<u32, S>,
) -> String {
    let mut ordered: Vec<&GapMarker> = markers.iter().collect();
    ordered.sort_by(|a, b| b.start.cmp(&a.start));

    let mut result = original.to_string();
    for marker in ordered {
        let Some(choice) = fills.get(&marker.index) else {
            continue;
        };
        if marker.end > result.len() || marker.start > marker.end {
            tracing::warn!(index = marker.index, "marker offsets outside text, skipping");
            continue;
        }
        let cleaned = strip_marker_syntax(choice.as_ref());
        if cleaned.is_empty() {
            tracing::warn!(index = marker.index, "fill is empty after cleaning, keeping marker");
            continue;
        }
        result.replace_range(marker.start..marker.end, &cleaned);
    }
    result
}
