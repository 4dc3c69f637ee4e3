//! Fill choices produced from model output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The chosen replacement for one gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillChoice {
    pub index: u32,
    pub choice: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

impl FillChoice {
    pub fn new(index: u32, choice: impl Into<String>) -> Self {
        Self {
            index,
            choice: choice.into(),
            alternatives: Vec::new(),
        }
    }

    pub fn with_alternatives(mut self, alternatives: Vec<String>) -> Self {
        self.alternatives = alternatives;
        self
    }
}

/// Fills keyed by gap index. Inserting an index again replaces the earlier
/// value, so the most recently parsed answer wins.
pub type FillSet = BTreeMap<u32, FillChoice>;

/// Index → chosen text view of a fill set.
pub fn choices(fills: &FillSet) -> BTreeMap<u32, &str> {
    fills
        .iter()
        .map(|(index, fill)| (*index, fill.choice.as_str()))
        .collect()
}
