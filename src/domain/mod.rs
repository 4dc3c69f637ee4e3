//! Domain configuration: vocabulary, case tables and guardrail thresholds.
//!
//! A [`DomainRegistry`] is built once at startup from the built-in domains,
//! optionally extended by a TOML file, and then shared read-only.

mod cars;

use crate::grammar::{Case, DeclensionEntry, DeclensionTable, PartOfSpeech};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("unknown domain '{0}'")]
    Unknown(String),
    #[error("failed to read domains file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse domains file {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("domain '{domain}': declension entry without a nominative form")]
    MissingNominative { domain: String },
    #[error("domain '{domain}': unknown case name '{name}'")]
    UnknownCase { domain: String, name: String },
    #[error("domain '{0}' is new and must set assistant_role")]
    MissingRole(String),
    #[error("domain '{domain}': invalid grammar check pattern '{pattern}': {source}")]
    InvalidPattern {
        domain: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A pattern that hints at a case-agreement slip in the final text. Matched
/// against the lowercased text; a match is a warning, never an error.
#[derive(Debug, Clone)]
pub struct GrammarCheck {
    pub pattern: Regex,
    pub message: String,
}

impl GrammarCheck {
    pub fn new(pattern: &str, message: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            message: message.into(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DomainConfig {
    pub name: String,
    /// Opening sentence of every system prompt.
    pub assistant_role: String,
    /// Heading placed above the attribute line, e.g. "Dane pojazdu".
    pub attributes_heading: String,
    /// Verbs that take an accusative object.
    pub accusative_verbs: HashSet<String>,
    pub vocabulary: Vec<String>,
    pub prohibited_words: Vec<String>,
    pub declensions: DeclensionTable,
    pub grammar_checks: Vec<GrammarCheck>,
    pub min_length: usize,
    pub max_length: usize,
}

impl DomainConfig {
    /// Whether `text` mentions at least one vocabulary term.
    pub fn mentions_vocabulary(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.vocabulary.iter().any(|term| lower.contains(term.as_str()))
    }

    /// Prohibited words found in `text`, lowercase.
    pub fn prohibited_in(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        self.prohibited_words
            .iter()
            .filter(|word| lower.contains(word.as_str()))
            .cloned()
            .collect()
    }

    /// Messages of the grammar checks that match `text`.
    pub fn grammar_issues(&self, text: &str) -> Vec<&str> {
        let lower = text.to_lowercase();
        self.grammar_checks
            .iter()
            .filter(|check| check.pattern.is_match(&lower))
            .map(|check| check.message.as_str())
            .collect()
    }

    fn apply(&mut self, overlay: DomainOverlay) -> Result<(), DomainError> {
        if let Some(role) = overlay.assistant_role {
            self.assistant_role = role;
        }
        if let Some(heading) = overlay.attributes_heading {
            self.attributes_heading = heading;
        }
        if let Some(min) = overlay.min_length {
            self.min_length = min;
        }
        if let Some(max) = overlay.max_length {
            self.max_length = max;
        }
        self.accusative_verbs
            .extend(overlay.accusative_verbs.into_iter().map(|v| v.to_lowercase()));
        extend_unique(&mut self.vocabulary, overlay.vocabulary);
        extend_unique(&mut self.prohibited_words, overlay.prohibited_words);

        for entry in overlay.declension {
            let mut forms = BTreeMap::new();
            for (name, form) in entry.forms {
                let case = Case::from_name(&name).ok_or_else(|| DomainError::UnknownCase {
                    domain: self.name.clone(),
                    name: name.clone(),
                })?;
                forms.insert(case, form);
            }
            let lemma = forms
                .get(&Case::Nominative)
                .cloned()
                .ok_or_else(|| DomainError::MissingNominative {
                    domain: self.name.clone(),
                })?;
            self.declensions.insert(DeclensionEntry {
                lemma,
                pos: entry.pos,
                forms,
            });
        }
        for (form, case) in overlay.noun_forms {
            self.declensions.insert_noun_form(&form, case);
        }
        for entry in overlay.grammar_check {
            let check = GrammarCheck::new(&entry.pattern, entry.message).map_err(|source| {
                DomainError::InvalidPattern {
                    domain: self.name.clone(),
                    pattern: entry.pattern.clone(),
                    source,
                }
            })?;
            self.grammar_checks.push(check);
        }
        Ok(())
    }
}

fn extend_unique(target: &mut Vec<String>, extra: Vec<String>) {
    for word in extra {
        let word = word.to_lowercase();
        if !target.contains(&word) {
            target.push(word);
        }
    }
}

/// On-disk shape of one `[[domain]]` table.
#[derive(Debug, Deserialize)]
struct DomainOverlay {
    name: String,
    assistant_role: Option<String>,
    attributes_heading: Option<String>,
    #[serde(default)]
    accusative_verbs: Vec<String>,
    #[serde(default)]
    vocabulary: Vec<String>,
    #[serde(default)]
    prohibited_words: Vec<String>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    #[serde(default)]
    declension: Vec<DeclensionSpec>,
    #[serde(default)]
    noun_forms: BTreeMap<String, Case>,
    #[serde(default)]
    grammar_check: Vec<GrammarCheckEntry>,
}

#[derive(Debug, Deserialize)]
struct GrammarCheckEntry {
    pattern: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct DeclensionSpec {
    #[serde(default)]
    pos: PartOfSpeech,
    /// case name -> form
    forms: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct DomainsFile {
    #[serde(default)]
    domain: Vec<DomainOverlay>,
}

#[derive(Debug, Clone)]
pub struct DomainRegistry {
    domains: HashMap<String, Arc<DomainConfig>>,
}

impl DomainRegistry {
    /// Registry with the built-in domains only.
    pub fn builtin() -> Self {
        let mut domains = HashMap::new();
        let cars = cars::config();
        domains.insert(cars.name.clone(), Arc::new(cars));
        Self { domains }
    }

    /// Built-in domains extended by the TOML file at `path`.
    pub fn with_file(path: &Path) -> Result<Self, DomainError> {
        let content = std::fs::read_to_string(path).map_err(|source| DomainError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut registry = Self::builtin();
        registry.merge_toml(&content, &path.display().to_string())?;
        Ok(registry)
    }

    /// Merge `[[domain]]` tables into the registry.
    ///
    /// A table naming an existing domain extends it: lists are appended,
    /// scalar fields replace. New domains must at least set `assistant_role`.
    pub fn merge_toml(&mut self, content: &str, origin: &str) -> Result<(), DomainError> {
        let file: DomainsFile = toml::from_str(content).map_err(|source| DomainError::Parse {
            origin: origin.to_string(),
            source,
        })?;

        for overlay in file.domain {
            let key = overlay.name.to_lowercase();
            let mut config = match self.domains.get(&key) {
                Some(existing) => (**existing).clone(),
                None => {
                    if overlay.assistant_role.is_none() {
                        return Err(DomainError::MissingRole(overlay.name));
                    }
                    DomainConfig {
                        name: key.clone(),
                        assistant_role: String::new(),
                        attributes_heading: "Dane".to_string(),
                        accusative_verbs: HashSet::new(),
                        vocabulary: Vec::new(),
                        prohibited_words: Vec::new(),
                        declensions: DeclensionTable::new(),
                        grammar_checks: Vec::new(),
                        min_length: 10,
                        max_length: 2000,
                    }
                }
            };
            config.apply(overlay)?;
            tracing::debug!(domain = %key, origin, "loaded domain");
            self.domains.insert(key, Arc::new(config));
        }
        Ok(())
    }

    /// Look up a domain by name, case-insensitively.
    pub fn get(&self, name: &str) -> Result<Arc<DomainConfig>, DomainError> {
        self.domains
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| DomainError::Unknown(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.domains.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_cars() {
        let registry = DomainRegistry::builtin();
        let cars = registry.get("Cars").unwrap();
        assert_eq!(cars.name, "cars");
        assert_eq!(cars.max_length, 600);
        assert!(cars.accusative_verbs.contains("posiada"));
        assert_eq!(cars.declensions.noun_case("kolorze"), Some(Case::Locative));
        assert_eq!(cars.declensions.noun_case("auto"), Some(Case::Nominative));
        assert!(!cars.declensions.is_known("bardzo"));
    }

    #[test]
    fn test_unknown_domain() {
        let err = DomainRegistry::builtin().get("boats").unwrap_err();
        assert!(matches!(err, DomainError::Unknown(name) if name == "boats"));
    }

    #[test]
    fn test_vocabulary_and_prohibited_words() {
        let cars = DomainRegistry::builtin().get("cars").unwrap();
        assert!(cars.mentions_vocabulary("Zadbany SUV z salonu"));
        assert!(!cars.mentions_vocabulary("Mieszkanie na sprzedaż"));
        assert_eq!(cars.prohibited_in("Niski przebieg GWARANTOWANE"), vec!["gwarantowane"]);
    }

    #[test]
    fn test_merge_extends_existing_domain() {
        let mut registry = DomainRegistry::builtin();
        registry
            .merge_toml(
                r#"
[[domain]]
name = "cars"
max_length = 800
accusative_verbs = ["Prezentujemy"]

[[domain.declension]]
forms = { nominative = "perłowy", genitive = "perłowego", dative = "perłowemu", accusative = "perłowy", instrumental = "perłowym", locative = "perłowym", vocative = "perłowy" }
"#,
                "inline",
            )
            .unwrap();
        let cars = registry.get("cars").unwrap();
        assert_eq!(cars.max_length, 800);
        assert_eq!(cars.min_length, 10);
        assert!(cars.accusative_verbs.contains("prezentujemy"));
        assert!(cars.accusative_verbs.contains("posiada"));
        assert_eq!(
            cars.declensions.dictionary_form("perłowy", Case::Locative),
            Some("perłowym".to_string())
        );
    }

    #[test]
    fn test_new_domain_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[[domain]]
name = "real_estate"
assistant_role = "Jesteś asystentem agenta nieruchomości."
attributes_heading = "Dane nieruchomości"
vocabulary = ["mieszkanie", "dom", "pokój"]

[domain.noun_forms]
mieszkaniu = "locative"
"#
        )
        .unwrap();

        let registry = DomainRegistry::with_file(file.path()).unwrap();
        assert_eq!(registry.names(), vec!["cars", "real_estate"]);
        let estate = registry.get("real_estate").unwrap();
        assert_eq!(estate.attributes_heading, "Dane nieruchomości");
        assert_eq!(estate.declensions.noun_case("mieszkaniu"), Some(Case::Locative));
    }

    #[test]
    fn test_cars_grammar_checks() {
        let cars = DomainRegistry::builtin().get("cars").unwrap();
        assert_eq!(cars.grammar_issues("Auto w kolorze czarnym").len(), 0);
        assert_eq!(cars.grammar_issues("Sprzedam auto, kolor czarny").len(), 1);
        assert_eq!(cars.grammar_issues("Napęd Elektryczny i silnik hybrydowy").len(), 2);
    }

    #[test]
    fn test_grammar_checks_from_file() {
        let mut registry = DomainRegistry::builtin();
        registry
            .merge_toml(
                r#"
[[domain]]
name = "cars"

[[domain.grammar_check]]
pattern = '\bfelgi\s+\p{L}+ych\b'
message = "check the case after 'felgi'"
"#,
                "inline",
            )
            .unwrap();
        let cars = registry.get("cars").unwrap();
        assert_eq!(
            cars.grammar_issues("Felgi aluminiowych"),
            vec!["check the case after 'felgi'"]
        );

        let err = registry
            .merge_toml(
                "[[domain]]\nname = \"cars\"\n[[domain.grammar_check]]\npattern = \"(\"\nmessage = \"x\"\n",
                "inline",
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidPattern { pattern, .. } if pattern == "("));
    }

    #[test]
    fn test_new_domain_requires_role() {
        let mut registry = DomainRegistry::builtin();
        let err = registry
            .merge_toml("[[domain]]\nname = \"boats\"\n", "inline")
            .unwrap_err();
        assert!(matches!(err, DomainError::MissingRole(_)));
    }

    #[test]
    fn test_declension_without_nominative_is_rejected() {
        let mut registry = DomainRegistry::builtin();
        let err = registry
            .merge_toml(
                "[[domain]]\nname = \"cars\"\n[[domain.declension]]\nforms = { genitive = \"x\" }\n",
                "inline",
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::MissingNominative { .. }));
    }

    #[test]
    fn test_unknown_case_name_is_rejected() {
        let mut registry = DomainRegistry::builtin();
        let err = registry
            .merge_toml(
                "[[domain]]\nname = \"cars\"\n[[domain.declension]]\nforms = { nominative = \"x\", ablative = \"y\" }\n",
                "inline",
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::UnknownCase { name, .. } if name == "ablative"));
    }
}
