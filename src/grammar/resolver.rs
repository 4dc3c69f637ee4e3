//! Case-agreement resolution for gap fills.
//!
//! Only case is handled. Gender and number agreement are not attempted, so a
//! masculine filler after a feminine noun is left masculine.

use super::case::{required_case, Case, Governor, RequiredCase};
use super::declension::{inflect, DeclensionTable};
use crate::domain::DomainConfig;
use crate::fill::{choices, FillSet};
use crate::gap::{extract_context, GapMarker};
use crate::reconstruct::reconstruct;
use serde::Serialize;

/// Outcome of resolving one filler against its context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub text: String,
    pub required: RequiredCase,
    pub governor: Governor,
}

/// A filler the resolver changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseCorrection {
    pub gap_index: u32,
    pub original: String,
    pub corrected: String,
    pub case: Case,
    pub context: String,
}

/// Inflect `word` to agree with whatever governs the gap at the end of
/// `text_before`. Returns the word unchanged when no rule applies.
pub fn resolve(word: &str, text_before: &str, domain: &DomainConfig) -> Resolution {
    let (required, governor) = required_case(text_before, domain);
    let text = match required.case() {
        Some(case) => inflect_phrase(word, case, &domain.declensions),
        None => word.to_string(),
    };
    Resolution {
        text,
        required,
        governor,
    }
}

/// Inflect each word of a (short) phrase into `case`, keeping punctuation,
/// spacing and capitalization.
pub fn inflect_phrase(phrase: &str, case: Case, table: &DeclensionTable) -> String {
    let mut out = String::with_capacity(phrase.len() + 8);
    let mut rest = phrase;
    while !rest.is_empty() {
        let ws_len = rest.len() - rest.trim_start().len();
        out.push_str(&rest[..ws_len]);
        rest = &rest[ws_len..];
        let token_len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        out.push_str(&inflect_token(&rest[..token_len], case, table));
        rest = &rest[token_len..];
    }
    out
}

fn inflect_token(token: &str, case: Case, table: &DeclensionTable) -> String {
    let core_start = token
        .char_indices()
        .find(|(_, c)| c.is_alphabetic())
        .map(|(idx, _)| idx);
    let Some(core_start) = core_start else {
        return token.to_string();
    };
    let core_end = token
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_alphabetic())
        .map(|(idx, c)| idx + c.len_utf8())
        .unwrap_or(token.len());
    let core = &token[core_start..core_end];
    if core.chars().any(|c| !c.is_alphabetic()) {
        return token.to_string();
    }

    let lower = core.to_lowercase();
    if table.is_in_case(&lower, case) {
        return token.to_string();
    }
    let Some(inflected) = inflect(&lower, case, table) else {
        return token.to_string();
    };

    format!(
        "{}{}{}",
        &token[..core_start],
        match_capitalization(core, &inflected),
        &token[core_end..]
    )
}

fn match_capitalization(original: &str, inflected: &str) -> String {
    let letters: Vec<char> = original.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return inflected.to_uppercase();
    }
    if original.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = inflected.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
    }
    inflected.to_string()
}

/// Run case agreement over a whole fill set, replacing choices in place.
///
/// Markers are visited left to right and the text before each marker is
/// rebuilt with the already resolved fills, so a gap right after another gap
/// sees the earlier filler as its preceding token.
pub fn apply_case_agreement(
    text: &str,
    markers: &[GapMarker],
    fills: &mut FillSet,
    domain: &DomainConfig,
    context_window: usize,
) -> Vec<CaseCorrection> {
    let mut ordered: Vec<&GapMarker> = markers.iter().collect();
    ordered.sort_by_key(|m| m.start);

    let mut corrections = Vec::new();
    for marker in ordered {
        let Some(current) = fills.get(&marker.index).map(|f| f.choice.clone()) else {
            continue;
        };

        let earlier: Vec<GapMarker> = markers
            .iter()
            .filter(|m| m.end <= marker.start)
            .copied()
            .collect();
        let prefix = text.get(..marker.start).unwrap_or(text);
        let text_before = reconstruct(prefix, &earlier, &choices(fills));

        let resolution = resolve(&current, &text_before, domain);
        if resolution.text == current {
            continue;
        }

        tracing::debug!(
            index = marker.index,
            original = %current,
            corrected = %resolution.text,
            governor = ?resolution.governor,
            "case agreement adjusted fill"
        );

        if let (Some(case), Some(fill)) = (resolution.required.case(), fills.get_mut(&marker.index)) {
            fill.choice = resolution.text.clone();
            corrections.push(CaseCorrection {
                gap_index: marker.index,
                original: current,
                corrected: resolution.text,
                case,
                context: extract_context(text, marker, context_window).render(),
            });
        }
    }
    corrections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainRegistry;
    use crate::fill::FillChoice;
    use crate::gap::{detect_markers, NotationMode};
    use std::sync::Arc;

    fn cars() -> Arc<DomainConfig> {
        DomainRegistry::builtin().get("cars").unwrap()
    }

    fn resolve_in(text: &str, word: &str) -> String {
        let marker = detect_markers(text, NotationMode::Auto)[0];
        resolve(word, &text[..marker.start], &cars()).text
    }

    #[test]
    fn test_locative_after_noun() {
        assert_eq!(resolve_in("Sprzedam auto w kolorze [GAP:0].", "czarny"), "czarnym");
    }

    #[test]
    fn test_grammar_cases_from_listing_texts() {
        assert_eq!(resolve_in("Samochód z [GAP:1] silnikiem.", "benzynowy"), "benzynowym");
        assert_eq!(resolve_in("Auto bez [GAP:2].", "wypadek"), "wypadku");
        assert_eq!(resolve_in("W [GAP:4] stanie.", "dobry"), "dobrym");
        assert_eq!(resolve_in("Auto gotowe do [GAP:5].", "jazdy"), "jazdy");
    }

    #[test]
    fn test_gender_is_not_adjusted() {
        assert_eq!(resolve_in("Wersja [GAP:3].", "limitowany"), "limitowany");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let domain = cars();
        let cases = [
            ("Sprzedam auto w kolorze ", "czarny"),
            ("Auto z ", "zielony"),
            ("Auto bez ", "sportowa"),
            ("Oferujemy ", "limitowana"),
            ("Felgi dla ", "Niebieski"),
            ("Samochód ", "zadbany"),
        ];
        for (before, word) in cases {
            let once = resolve(word, before, &domain).text;
            let twice = resolve(&once, before, &domain).text;
            assert_eq!(once, twice, "{:?} + {}", before, word);
        }
    }

    #[test]
    fn test_capitalization_is_preserved() {
        assert_eq!(resolve_in("W kolorze [GAP:1]", "Czarny"), "Czarnym");
        assert_eq!(resolve_in("W kolorze [GAP:1]", "CZARNY"), "CZARNYM");
    }

    #[test]
    fn test_unknown_governor_passes_through() {
        assert_eq!(resolve_in("Bardzo [GAP:1] auto", "zielony"), "zielony");
        assert_eq!(resolve_in("Przebieg: [GAP:1] km", "120000"), "120000");
    }

    #[test]
    fn test_phrase_inflection_keeps_punctuation() {
        let domain = cars();
        assert_eq!(
            inflect_phrase("bardzo zadbany,", Case::Locative, &domain.declensions),
            "bardzo zadbanym,"
        );
    }

    #[test]
    fn test_apply_case_agreement_mutates_choices() {
        let domain = cars();
        let text = "Sprzedam auto w kolorze [GAP:1] z [GAP:2] silnikiem";
        let markers = detect_markers(text, NotationMode::Auto);
        let mut fills = FillSet::new();
        fills.insert(1, FillChoice::new(1, "czarny"));
        fills.insert(2, FillChoice::new(2, "benzynowym"));

        let corrections = apply_case_agreement(text, &markers, &mut fills, &domain, 30);

        assert_eq!(fills[&1].choice, "czarnym");
        assert_eq!(fills[&2].choice, "benzynowym");
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].gap_index, 1);
        assert_eq!(corrections[0].case, Case::Locative);
        assert!(corrections[0].context.contains("kolorze ___"));
    }

    #[test]
    fn test_gap_after_gap_sees_resolved_filler() {
        let domain = cars();
        let text = "Auto [GAP:1] [GAP:2]";
        let markers = detect_markers(text, NotationMode::Auto);
        let mut fills = FillSet::new();
        fills.insert(1, FillChoice::new(1, "ma"));
        fills.insert(2, FillChoice::new(2, "sportowa"));

        apply_case_agreement(text, &markers, &mut fills, &domain, 30);
        assert_eq!(fills[&2].choice, "sportową");
    }
}
