//! Prompt strategy selection and rendering.

use super::prompts::{
    BATCHED_JSON_SYSTEM, BATCHED_JSON_TASK, BATCHED_SYSTEM, BATCHED_TASK, PER_GAP_SYSTEM,
    PER_GAP_TASK,
};
use crate::domain::DomainConfig;
use crate::gap::{extract_context, GapMarker, DEFAULT_CONTEXT_WINDOW};
use serde::Serialize;
use serde_json::{Map, Value};

pub const DEFAULT_TOKEN_THRESHOLD: usize = 750;
pub const DEFAULT_BATCHED_MAX_MARKERS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStrategy {
    Batched,
    PerGap,
}

impl PromptStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptStrategy::Batched => "batched",
            PromptStrategy::PerGap => "per_gap",
        }
    }
}

/// One prompt to send. Per-gap units are bound to the marker they fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptUnit {
    pub prompt: String,
    pub marker: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptPlan {
    pub strategy: PromptStrategy,
    pub units: Vec<PromptUnit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyOptions {
    /// Batched below this many estimated tokens.
    pub token_threshold: usize,
    /// Batched at or below this many markers regardless of size.
    pub batched_max_markers: usize,
    pub context_window: usize,
    /// Extra candidates requested per gap; non-zero switches the batched
    /// prompt to the JSON answer format.
    pub alternatives: usize,
}

impl Default for StrategyOptions {
    fn default() -> Self {
        Self {
            token_threshold: DEFAULT_TOKEN_THRESHOLD,
            batched_max_markers: DEFAULT_BATCHED_MAX_MARKERS,
            context_window: DEFAULT_CONTEXT_WINDOW,
            alternatives: 0,
        }
    }
}

/// Rough token estimate: four characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

pub fn choose_strategy(text: &str, marker_count: usize, options: &StrategyOptions) -> PromptStrategy {
    if estimate_tokens(text) < options.token_threshold
        || marker_count <= options.batched_max_markers
    {
        PromptStrategy::Batched
    } else {
        PromptStrategy::PerGap
    }
}

/// Render attributes as `Heading:\nKey: value, Key: value\n\n`.
///
/// Null values are skipped; an empty or absent map renders nothing.
pub fn format_attributes_section(attributes: Option<&Map<String, Value>>, heading: &str) -> String {
    let line = attributes
        .map(|attrs| {
            attrs
                .iter()
                .filter_map(|(key, value)| {
                    let value = match value {
                        Value::Null => return None,
                        Value::String(s) if s.trim().is_empty() => return None,
                        Value::String(s) => s.trim().to_string(),
                        other => other.to_string(),
                    };
                    Some(format!("{}: {}", display_key(key), value))
                })
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    if line.is_empty() {
        String::new()
    } else {
        format!("{}:\n{}\n\n", heading, line)
    }
}

/// `fuel_type` -> `Fuel type`
fn display_key(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn system_prompt(domain: &DomainConfig, instruction: &str) -> String {
    format!("{} {}", domain.assistant_role.trim(), instruction)
}

/// Choose a strategy for `text` and render its prompts.
///
/// `markers` must have been detected in `text`.
pub fn plan_prompts(
    text: &str,
    markers: &[GapMarker],
    attributes: Option<&Map<String, Value>>,
    domain: &DomainConfig,
    options: &StrategyOptions,
) -> PromptPlan {
    let strategy = choose_strategy(text, markers.len(), options);
    let attrs = format_attributes_section(attributes, &domain.attributes_heading);

    let units = match strategy {
        PromptStrategy::Batched => {
            let mut indices: Vec<u32> = markers.iter().map(|m| m.index).collect();
            indices.sort_unstable();
            let (system, task) = if options.alternatives > 0 {
                let first = indices.first().copied().unwrap_or(1);
                (
                    BATCHED_JSON_SYSTEM
                        .replace("{alternatives}", &options.alternatives.to_string())
                        .replace("{index}", &first.to_string()),
                    BATCHED_JSON_TASK.replace("{text}", text),
                )
            } else {
                let numbering: Vec<String> =
                    indices.iter().map(|i| format!("{}. słowo", i)).collect();
                let numbers: Vec<String> = indices.iter().map(|i| format!("{}.", i)).collect();
                (
                    BATCHED_SYSTEM.replace("{numbering}", &numbering.join("\n")),
                    BATCHED_TASK
                        .replace("{numbers}", &numbers.join(", "))
                        .replace("{text}", text),
                )
            };
            let prompt = format!("{}\n\n{}{}", system_prompt(domain, &system), attrs, task);
            vec![PromptUnit { prompt, marker: None }]
        }
        PromptStrategy::PerGap => markers
            .iter()
            .map(|marker| {
                let context = extract_context(text, marker, options.context_window).render();
                let prompt = format!(
                    "{}\n\n{}{}",
                    system_prompt(domain, PER_GAP_SYSTEM),
                    attrs,
                    PER_GAP_TASK.replace("{context}", &context)
                );
                PromptUnit {
                    prompt,
                    marker: Some(marker.index),
                }
            })
            .collect(),
    };

    PromptPlan { strategy, units }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainRegistry;
    use crate::gap::{detect_markers, NotationMode};
    use serde_json::json;

    fn long_text(markers: usize) -> String {
        let filler = "Samochód był regularnie serwisowany w autoryzowanej stacji obsługi. ";
        let mut text = filler.repeat(50);
        for i in 1..=markers {
            text.push_str(&format!("Auto jest [GAP:{}]. ", i));
        }
        text
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        // characters, not bytes
        assert_eq!(estimate_tokens("żółć"), 1);
    }

    #[test]
    fn test_short_text_is_batched() {
        let options = StrategyOptions::default();
        assert_eq!(
            choose_strategy("Auto [GAP:1] [GAP:2] [GAP:3] [GAP:4]", 4, &options),
            PromptStrategy::Batched
        );
    }

    #[test]
    fn test_long_text_with_few_markers_is_batched() {
        let text = long_text(2);
        assert!(estimate_tokens(&text) >= DEFAULT_TOKEN_THRESHOLD);
        assert_eq!(
            choose_strategy(&text, 2, &StrategyOptions::default()),
            PromptStrategy::Batched
        );
    }

    #[test]
    fn test_long_text_with_many_markers_is_per_gap() {
        let text = long_text(3);
        assert_eq!(
            choose_strategy(&text, 3, &StrategyOptions::default()),
            PromptStrategy::PerGap
        );
    }

    #[test]
    fn test_attributes_section() {
        let attrs = json!({"marka": "Toyota", "fuel_type": "benzyna", "rok": 2019, "vin": null});
        let section = format_attributes_section(attrs.as_object(), "Dane pojazdu");
        assert_eq!(
            section,
            "Dane pojazdu:\nMarka: Toyota, Fuel type: benzyna, Rok: 2019\n\n"
        );
        assert_eq!(format_attributes_section(None, "Dane pojazdu"), "");
        assert_eq!(format_attributes_section(json!({}).as_object(), "Dane pojazdu"), "");
    }

    #[test]
    fn test_batched_plan() {
        let domain = DomainRegistry::builtin().get("cars").unwrap();
        let text = "Auto [GAP:1] z [GAP:2] silnikiem";
        let markers = detect_markers(text, NotationMode::Auto);
        let attrs = json!({"marka": "Skoda"});
        let plan = plan_prompts(text, &markers, attrs.as_object(), &domain, &StrategyOptions::default());

        assert_eq!(plan.strategy, PromptStrategy::Batched);
        assert_eq!(plan.units.len(), 1);
        let unit = &plan.units[0];
        assert_eq!(unit.marker, None);
        assert!(unit.prompt.starts_with("Jesteś kreatywnym asystentem sprzedaży samochodów."));
        assert!(unit.prompt.contains("Dane pojazdu:\nMarka: Skoda"));
        assert!(unit.prompt.contains("Tekst do uzupełnienia:\nAuto [GAP:1] z [GAP:2] silnikiem"));
        assert!(unit.prompt.contains("1. słowo\n2. słowo"));
        assert!(unit.prompt.contains("(1., 2.)"));
    }

    #[test]
    fn test_batched_plan_numbers_lines_by_gap_index() {
        let domain = DomainRegistry::builtin().get("cars").unwrap();
        let text = "Auto [GAP:7] w kolorze [GAP:0] z [GAP:5]";
        let markers = detect_markers(text, NotationMode::Auto);
        let plan = plan_prompts(text, &markers, None, &domain, &StrategyOptions::default());
        let prompt = &plan.units[0].prompt;
        assert!(prompt.contains("0. słowo\n5. słowo\n7. słowo"));
        assert!(prompt.contains("(0., 5., 7.)"));
        assert!(!prompt.contains("1. słowo"));
    }

    #[test]
    fn test_batched_plan_asks_for_json_with_alternatives() {
        let domain = DomainRegistry::builtin().get("cars").unwrap();
        let text = "Auto [GAP:1]";
        let markers = detect_markers(text, NotationMode::Auto);
        let options = StrategyOptions {
            alternatives: 2,
            ..StrategyOptions::default()
        };
        let plan = plan_prompts(text, &markers, None, &domain, &options);
        let prompt = &plan.units[0].prompt;
        assert!(prompt.contains("do 2 alternatyw"));
        assert!(prompt.contains("\"gaps\""));
        assert!(prompt.contains("\"index\": 1,"));
    }

    #[test]
    fn test_per_gap_units_carry_only_their_context() {
        let domain = DomainRegistry::builtin().get("cars").unwrap();
        let text = long_text(3);
        let markers = detect_markers(&text, NotationMode::Auto);
        let plan = plan_prompts(&text, &markers, None, &domain, &StrategyOptions::default());

        assert_eq!(plan.strategy, PromptStrategy::PerGap);
        assert_eq!(plan.units.len(), 3);
        for (unit, marker) in plan.units.iter().zip(&markers) {
            assert_eq!(unit.marker, Some(marker.index));
            assert!(!unit.prompt.contains("[GAP:"));
            assert!(unit.prompt.contains("___"));
            assert!(unit.prompt.ends_with("podaj jedno słowo:"));
        }
    }
}
