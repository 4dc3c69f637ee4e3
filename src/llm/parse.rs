//! Tolerant parsing of model output into gap fills.
//!
//! Model output may be a numbered list, a JSON object (fenced or bare, possibly
//! wrapped in a string-encoded `arguments` payload), JSON cut off mid-way, or
//! free text. Each format is handled by one stage; the first stage that yields
//! anything wins and later stages are not consulted.

use crate::fill::{FillChoice, FillSet};
use crate::gap::strip_marker_syntax;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;

/// Longest answer, in words, accepted from a per-gap prompt.
const MAX_SINGLE_ANSWER_WORDS: usize = 4;

static NUMBERED_LINE: OnceLock<Regex> = OnceLock::new();
static FENCED_BLOCK: OnceLock<Regex> = OnceLock::new();
static GAP_FRAGMENT: OnceLock<Regex> = OnceLock::new();

fn numbered_line() -> &'static Regex {
    NUMBERED_LINE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*(\d+)[.)][ \t]*([^\r\n]+)").expect("numbered line pattern")
    })
}

fn fenced_block() -> &'static Regex {
    FENCED_BLOCK
        .get_or_init(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("fence pattern"))
}

fn gap_fragment() -> &'static Regex {
    GAP_FRAGMENT.get_or_init(|| {
        Regex::new(r#"\{\s*"index"\s*:\s*(\d+)\s*,\s*"choice"\s*:\s*"([^"]+)""#)
            .expect("gap fragment pattern")
    })
}

/// Which stage produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    NumberedList,
    Json,
    TruncatedJson,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub stage: ParseStage,
    pub fills: FillSet,
}

type Stage = fn(&str) -> Vec<FillChoice>;

const STAGES: [(ParseStage, Stage); 3] = [
    (ParseStage::NumberedList, parse_numbered_list),
    (ParseStage::Json, parse_json_object),
    (ParseStage::TruncatedJson, parse_truncated_fragments),
];

/// Run the stage chain over `raw`. `None` means nothing usable was found.
pub fn parse_response(raw: &str) -> Option<ParsedResponse> {
    if raw.trim().is_empty() {
        return None;
    }
    STAGES.iter().find_map(|(stage, parse)| {
        let found = parse(raw);
        if found.is_empty() {
            return None;
        }
        // later duplicates overwrite earlier ones
        let fills: FillSet = found.into_iter().map(|fill| (fill.index, fill)).collect();
        tracing::trace!(stage = ?stage, fills = fills.len(), "parsed model output");
        Some(ParsedResponse {
            stage: *stage,
            fills,
        })
    })
}

fn parse_numbered_list(raw: &str) -> Vec<FillChoice> {
    numbered_line()
        .captures_iter(raw)
        .filter_map(|caps| {
            let index = caps[1].parse::<u32>().ok()?;
            Some(FillChoice::new(index, clean_choice(&caps[2])?))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct GapEntry {
    index: u32,
    choice: String,
    #[serde(default)]
    alternatives: Vec<String>,
}

fn parse_json_object(raw: &str) -> Vec<FillChoice> {
    let scope = fenced_block()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw);

    let Some(start) = scope.find('{') else {
        return Vec::new();
    };
    let Some(object) = extract_balanced_json_from(scope, start) else {
        return Vec::new();
    };
    let Ok(mut value) = serde_json::from_str::<Value>(object) else {
        return Vec::new();
    };

    // legacy wrapper: {"arguments": "{\"gaps\": [...]}"}
    if let Some(Value::String(payload)) = value.get("arguments") {
        if let Ok(inner) = serde_json::from_str::<Value>(payload) {
            value = inner;
        }
    }

    let Some(Value::Array(entries)) = value.get("gaps") else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| serde_json::from_value::<GapEntry>(entry.clone()).ok())
        .filter_map(|entry| {
            let choice = clean_choice(&entry.choice)?;
            let alternatives = entry
                .alternatives
                .iter()
                .filter_map(|alt| clean_choice(alt))
                .filter(|alt| *alt != choice)
                .collect();
            Some(FillChoice::new(entry.index, choice).with_alternatives(alternatives))
        })
        .collect()
}

fn parse_truncated_fragments(raw: &str) -> Vec<FillChoice> {
    gap_fragment()
        .captures_iter(raw)
        .filter_map(|caps| {
            let index = caps[1].parse::<u32>().ok()?;
            Some(FillChoice::new(index, clean_choice(&caps[2])?))
        })
        .collect()
}

/// A choice with echoed marker syntax removed; `None` when nothing is left,
/// so the gap counts as unfilled instead of being erased.
fn clean_choice(raw: &str) -> Option<String> {
    let cleaned = strip_marker_syntax(raw);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Return the balanced `{...}` or `[...]` span starting at `start`, honoring
/// string literals and escapes. `None` if the span never closes or is
/// mismatched.
pub(crate) fn extract_balanced_json_from(content: &str, start: usize) -> Option<&str> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in content[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
                continue;
            }
            if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(ch) {
                    return None;
                }
                if stack.is_empty() {
                    let end = start + offset + ch.len_utf8();
                    return Some(&content[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse the answer to a per-gap prompt: a single word or short phrase.
///
/// Takes the first non-empty line, drops list numbering, quotes and a trailing
/// period. Answers longer than `MAX_SINGLE_ANSWER_WORDS` words or
/// `max_chars` characters are treated as unusable.
pub fn parse_single_choice(raw: &str, max_chars: usize) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|line| !line.is_empty())?;

    let line = match numbered_line().captures(line) {
        Some(caps) => caps.get(2).map(|m| m.as_str()).unwrap_or(line),
        None => line,
    };
    let line = line
        .trim_matches(|c: char| {
            c.is_whitespace()
                || matches!(c, '"' | '\'' | '„' | '”' | '“' | '`' | '*' | '.' | ',' | ';' | '!')
        });
    let cleaned = strip_marker_syntax(line);

    if cleaned.is_empty()
        || cleaned.split_whitespace().count() > MAX_SINGLE_ANSWER_WORDS
        || cleaned.chars().count() > max_chars
    {
        return None;
    }
    Some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::choices;

    fn pairs(raw: &str) -> Vec<(u32, String)> {
        parse_response(raw)
            .map(|parsed| {
                choices(&parsed.fills)
                    .into_iter()
                    .map(|(i, c)| (i, c.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_numbered_list() {
        let parsed = parse_response("1. zadbane\n2) benzynowym\n").unwrap();
        assert_eq!(parsed.stage, ParseStage::NumberedList);
        assert_eq!(
            pairs("1. zadbane\n2) benzynowym\n"),
            vec![(1, "zadbane".into()), (2, "benzynowym".into())]
        );
    }

    #[test]
    fn test_numbered_list_with_preamble_and_crlf() {
        let raw = "Oto odpowiedź:\r\n  1.   czarny  \r\n2. nowy\r\n";
        assert_eq!(pairs(raw), vec![(1, "czarny".into()), (2, "nowy".into())]);
    }

    #[test]
    fn test_duplicate_index_keeps_last() {
        assert_eq!(pairs("1. stary\n1. nowy"), vec![(1, "nowy".into())]);
    }

    #[test]
    fn test_fenced_json() {
        let raw = "Proszę:\n```json\n{\"gaps\": [{\"index\": 1, \"choice\": \"srebrny\"}, {\"index\": 2, \"choice\": \" hybrydowym \"}]}\n```";
        let parsed = parse_response(raw).unwrap();
        assert_eq!(parsed.stage, ParseStage::Json);
        assert_eq!(pairs(raw), vec![(1, "srebrny".into()), (2, "hybrydowym".into())]);
    }

    #[test]
    fn test_bare_json_with_braces_in_strings() {
        let raw = r#"Wynik: {"filled_text": "Auto {x}", "gaps": [{"index": 3, "choice": "piękne"}]} koniec"#;
        assert_eq!(pairs(raw), vec![(3, "piękne".into())]);
    }

    #[test]
    fn test_legacy_arguments_wrapper() {
        let raw = r#"{"name": "fill", "arguments": "{\"gaps\": [{\"index\": 1, \"choice\": \"zielony\"}]}"}"#;
        assert_eq!(pairs(raw), vec![(1, "zielony".into())]);
    }

    #[test]
    fn test_json_alternatives_are_kept() {
        let raw = r#"{"gaps": [{"index": 1, "choice": "czarny", "alternatives": ["grafitowy", "czarny", " "]}]}"#;
        let parsed = parse_response(raw).unwrap();
        assert_eq!(parsed.fills[&1].alternatives, vec!["grafitowy".to_string()]);
    }

    #[test]
    fn test_truncated_json_keeps_complete_fragments() {
        let raw = r#"{"gaps": [{"index": 1, "choice": "zadbane"}, {"index": 2, "choice": "benzyn"#;
        let parsed = parse_response(raw).unwrap();
        assert_eq!(parsed.stage, ParseStage::TruncatedJson);
        assert_eq!(pairs(raw), vec![(1, "zadbane".into())]);
    }

    #[test]
    fn test_first_successful_stage_wins() {
        // the list stage succeeds, so the JSON fragment is never merged in
        let raw = "1. nowy\n{\"index\": 2, \"choice\": \"stary\"}";
        let parsed = parse_response(raw).unwrap();
        assert_eq!(parsed.stage, ParseStage::NumberedList);
        assert_eq!(pairs(raw), vec![(1, "nowy".into())]);
    }

    #[test]
    fn test_echoed_markers_are_not_fills() {
        assert_eq!(
            pairs("1. [GAP:1]\n2. benzynowym"),
            vec![(2, "benzynowym".into())]
        );
        assert_eq!(pairs("1. [GAP:1] czarny"), vec![(1, "czarny".into())]);
        let raw = r#"{"gaps": [{"index": 1, "choice": "___"}, {"index": 2, "choice": "nowy", "alternatives": ["[GAP:2]"]}]}"#;
        let parsed = parse_response(raw).unwrap();
        assert_eq!(pairs(raw), vec![(2, "nowy".into())]);
        assert!(parsed.fills[&2].alternatives.is_empty());
        // nothing left after cleaning falls through to the next stage
        assert!(parse_response("1. [GAP:1]\n2. ___").is_none());
    }

    #[test]
    fn test_refusal_yields_nothing() {
        assert!(parse_response("I cannot help with that.").is_none());
        assert!(parse_response("").is_none());
        assert!(parse_response("{\"gaps\": []}").is_none());
    }

    #[test]
    fn test_extract_balanced_json_from() {
        let text = r#"x {"a": "}", "b": [1, {"c": 2}]} y"#;
        let start = text.find('{').unwrap();
        assert_eq!(
            extract_balanced_json_from(text, start),
            Some(r#"{"a": "}", "b": [1, {"c": 2}]}"#)
        );
        assert_eq!(extract_balanced_json_from("{\"a\": [}", 0), None);
        assert_eq!(extract_balanced_json_from("{\"a\": 1", 0), None);
    }

    #[test]
    fn test_parse_single_choice() {
        assert_eq!(parse_single_choice("  czarny\n", 100), Some("czarny".into()));
        assert_eq!(parse_single_choice("1. \"zadbany\".", 100), Some("zadbany".into()));
        assert_eq!(parse_single_choice("\n\nbardzo dobrym\nwyjaśnienie", 100), Some("bardzo dobrym".into()));
        assert_eq!(
            parse_single_choice("To zależy od wielu różnych czynników", 100),
            None
        );
        assert_eq!(parse_single_choice("długie", 3), None);
        assert_eq!(parse_single_choice("   ", 100), None);
        assert_eq!(parse_single_choice("[GAP:1]", 100), None);
    }
}
