//! Declension dictionary and suffix heuristics.
//!
//! The dictionary maps a base (nominative) form to its seven case forms. A
//! reverse index over every form doubles as the morphological lexicon: it
//! tells which case(s) a given surface form already carries.

use super::case::Case;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartOfSpeech {
    #[default]
    Adjective,
    Noun,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclensionEntry {
    pub lemma: String,
    #[serde(default)]
    pub pos: PartOfSpeech,
    pub forms: BTreeMap<Case, String>,
}

impl DeclensionEntry {
    /// Build an entry from forms listed in [`Case::ALL`] order.
    pub fn from_forms(pos: PartOfSpeech, forms: [&str; 7]) -> Self {
        let forms: BTreeMap<Case, String> = Case::ALL
            .iter()
            .zip(forms)
            .map(|(case, form)| (*case, form.to_string()))
            .collect();
        let lemma = forms
            .get(&Case::Nominative)
            .cloned()
            .unwrap_or_default();
        Self { lemma, pos, forms }
    }

    pub fn form(&self, case: Case) -> Option<&str> {
        self.forms.get(&case).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeclensionTable {
    entries: BTreeMap<String, DeclensionEntry>,
    /// surface form -> (lemma, case) for every dictionary form
    form_index: HashMap<String, Vec<(String, Case)>>,
    /// surface form -> cases, nouns only (dictionary nouns plus bare lexicon forms)
    noun_forms: HashMap<String, Vec<Case>>,
}

impl DeclensionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mut entry: DeclensionEntry) {
        entry.lemma = entry.lemma.to_lowercase();
        for form in entry.forms.values_mut() {
            *form = form.to_lowercase();
        }
        entry
            .forms
            .entry(Case::Nominative)
            .or_insert_with(|| entry.lemma.clone());

        for (case, form) in &entry.forms {
            let slot = self.form_index.entry(form.clone()).or_default();
            if !slot.contains(&(entry.lemma.clone(), *case)) {
                slot.push((entry.lemma.clone(), *case));
            }
            if entry.pos == PartOfSpeech::Noun {
                push_case(self.noun_forms.entry(form.clone()).or_default(), *case);
            }
        }
        self.entries.insert(entry.lemma.clone(), entry);
    }

    /// Register an inflected noun form that has no full paradigm in the table.
    pub fn insert_noun_form(&mut self, form: &str, case: Case) {
        push_case(self.noun_forms.entry(form.to_lowercase()).or_default(), case);
    }

    pub fn lookup(&self, lemma: &str) -> Option<&DeclensionEntry> {
        self.entries.get(lemma)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cases a surface form is known to carry, in [`Case::ALL`] order.
    pub fn cases_of(&self, form: &str) -> Vec<Case> {
        let mut cases: Vec<Case> = self
            .form_index
            .get(form)
            .map(|hits| hits.iter().map(|(_, case)| *case).collect())
            .unwrap_or_default();
        if let Some(noun_cases) = self.noun_forms.get(form) {
            cases.extend(noun_cases.iter().copied());
        }
        cases.sort();
        cases.dedup();
        cases
    }

    pub fn is_known(&self, form: &str) -> bool {
        self.form_index.contains_key(form) || self.noun_forms.contains_key(form)
    }

    pub fn is_in_case(&self, form: &str, case: Case) -> bool {
        self.cases_of(form).contains(&case)
    }

    /// Case carried by a noun form; ambiguous forms take the first case in
    /// [`Case::ALL`] order.
    pub fn noun_case(&self, form: &str) -> Option<Case> {
        self.noun_forms
            .get(form)
            .and_then(|cases| cases.iter().min().copied())
    }

    /// Dictionary form of `word` in `case`. `word` may be the base form or
    /// any other form of a known lemma.
    pub fn dictionary_form(&self, word: &str, case: Case) -> Option<String> {
        if let Some(entry) = self.entries.get(word) {
            return entry.form(case).map(str::to_string);
        }
        let (lemma, _) = self.form_index.get(word)?.first()?;
        self.entries.get(lemma)?.form(case).map(str::to_string)
    }
}

fn push_case(cases: &mut Vec<Case>, case: Case) {
    if !cases.contains(&case) {
        cases.push(case);
    }
}

/// One suffix rewrite: a word ending in `suffix` takes `replacement` in `case`.
struct SuffixRule {
    suffix: &'static str,
    case: Case,
    replacement: &'static str,
}

const fn rule(suffix: &'static str, case: Case, replacement: &'static str) -> SuffixRule {
    SuffixRule {
        suffix,
        case,
        replacement,
    }
}

/// Fallback endings for regular adjectives, longest suffix first.
///
/// Every replacement ends in a letter no suffix ends in, so a word that was
/// already rewritten never matches again.
const SUFFIX_RULES: &[SuffixRule] = &[
    // feminine
    rule("owa", Case::Genitive, "owej"),
    rule("owa", Case::Dative, "owej"),
    rule("owa", Case::Locative, "owej"),
    rule("owa", Case::Accusative, "ową"),
    rule("owa", Case::Instrumental, "ową"),
    rule("ska", Case::Genitive, "skiej"),
    rule("ska", Case::Dative, "skiej"),
    rule("ska", Case::Locative, "skiej"),
    rule("ska", Case::Accusative, "ską"),
    rule("ska", Case::Instrumental, "ską"),
    rule("cka", Case::Genitive, "ckiej"),
    rule("cka", Case::Dative, "ckiej"),
    rule("cka", Case::Locative, "ckiej"),
    rule("cka", Case::Accusative, "cką"),
    rule("cka", Case::Instrumental, "cką"),
    rule("na", Case::Genitive, "nej"),
    rule("na", Case::Dative, "nej"),
    rule("na", Case::Locative, "nej"),
    rule("na", Case::Accusative, "ną"),
    rule("na", Case::Instrumental, "ną"),
    // neuter
    rule("kie", Case::Genitive, "kiego"),
    rule("kie", Case::Dative, "kiemu"),
    rule("kie", Case::Instrumental, "kim"),
    rule("kie", Case::Locative, "kim"),
    rule("owe", Case::Genitive, "owego"),
    rule("owe", Case::Dative, "owemu"),
    rule("owe", Case::Instrumental, "owym"),
    rule("owe", Case::Locative, "owym"),
    rule("ne", Case::Genitive, "nego"),
    rule("ne", Case::Dative, "nemu"),
    rule("ne", Case::Instrumental, "nym"),
    rule("ne", Case::Locative, "nym"),
    // masculine, soft stem
    rule("ki", Case::Genitive, "kiego"),
    rule("ki", Case::Dative, "kiemu"),
    rule("ki", Case::Instrumental, "kim"),
    rule("ki", Case::Locative, "kim"),
    rule("gi", Case::Genitive, "giego"),
    rule("gi", Case::Dative, "giemu"),
    rule("gi", Case::Instrumental, "gim"),
    rule("gi", Case::Locative, "gim"),
    // masculine, hard stem
    rule("y", Case::Genitive, "ego"),
    rule("y", Case::Dative, "emu"),
    rule("y", Case::Instrumental, "ym"),
    rule("y", Case::Locative, "ym"),
];

/// Best-effort inflection of an unknown (lowercase) word.
pub fn heuristic_form(word: &str, case: Case) -> Option<String> {
    SUFFIX_RULES
        .iter()
        .filter(|rule| rule.case == case)
        .find(|rule| word.ends_with(rule.suffix) && word.len() > rule.suffix.len())
        .map(|rule| {
            let stem = &word[..word.len() - rule.suffix.len()];
            format!("{}{}", stem, rule.replacement)
        })
}

/// Inflect a lowercase word: dictionary first, heuristics only for words the
/// table knows nothing about.
pub fn inflect(word: &str, case: Case, table: &DeclensionTable) -> Option<String> {
    if let Some(form) = table.dictionary_form(word, case) {
        return Some(form);
    }
    if table.is_known(word) {
        return None;
    }
    heuristic_form(word, case)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DeclensionTable {
        let mut table = DeclensionTable::new();
        table.insert(DeclensionEntry::from_forms(
            PartOfSpeech::Adjective,
            ["czarny", "czarnego", "czarnemu", "czarny", "czarnym", "czarnym", "czarny"],
        ));
        table.insert(DeclensionEntry::from_forms(
            PartOfSpeech::Noun,
            ["kolor", "koloru", "kolorowi", "kolor", "kolorem", "kolorze", "kolorze"],
        ));
        table.insert_noun_form("jazdy", Case::Genitive);
        table
    }

    #[test]
    fn test_dictionary_form_from_base_and_other_forms() {
        let table = table();
        assert_eq!(table.dictionary_form("czarny", Case::Locative).as_deref(), Some("czarnym"));
        assert_eq!(table.dictionary_form("czarnego", Case::Dative).as_deref(), Some("czarnemu"));
        assert_eq!(table.dictionary_form("zielony", Case::Dative), None);
    }

    #[test]
    fn test_cases_of_form() {
        let table = table();
        assert_eq!(table.cases_of("czarnym"), vec![Case::Instrumental, Case::Locative]);
        assert!(table.is_in_case("czarny", Case::Accusative));
        assert!(table.is_in_case("jazdy", Case::Genitive));
        assert!(table.cases_of("nieznany").is_empty());
    }

    #[test]
    fn test_noun_case_only_for_nouns() {
        let table = table();
        assert_eq!(table.noun_case("kolorze"), Some(Case::Locative));
        assert_eq!(table.noun_case("kolor"), Some(Case::Nominative));
        assert_eq!(table.noun_case("czarnym"), None);
    }

    #[test]
    fn test_heuristics() {
        assert_eq!(heuristic_form("zielony", Case::Instrumental).as_deref(), Some("zielonym"));
        assert_eq!(heuristic_form("zielony", Case::Genitive).as_deref(), Some("zielonego"));
        assert_eq!(heuristic_form("sportowa", Case::Instrumental).as_deref(), Some("sportową"));
        assert_eq!(heuristic_form("polski", Case::Locative).as_deref(), Some("polskim"));
        assert_eq!(heuristic_form("zadbane", Case::Locative).as_deref(), Some("zadbanym"));
        assert_eq!(heuristic_form("zielony", Case::Nominative), None);
        assert_eq!(heuristic_form("120000", Case::Genitive), None);
        assert_eq!(heuristic_form("y", Case::Genitive), None);
    }

    #[test]
    fn test_heuristic_output_is_stable() {
        for word in ["zielony", "sportowa", "polski", "zadbane", "luksusowe", "długi"] {
            for case in Case::ALL {
                if let Some(form) = heuristic_form(word, case) {
                    assert_eq!(heuristic_form(&form, case), None, "{} -> {}", word, form);
                }
            }
        }
    }

    #[test]
    fn test_inflect_skips_heuristics_for_known_words() {
        let table = table();
        assert_eq!(inflect("jazdy", Case::Locative, &table), None);
        assert_eq!(inflect("czarny", Case::Genitive, &table).as_deref(), Some("czarnego"));
        assert_eq!(inflect("szary", Case::Genitive, &table).as_deref(), Some("szarego"));
    }
}
