//! Polish case agreement for gap fillers.

pub mod case;
pub mod declension;
pub mod resolver;

pub use case::{preceding_token, preposition_case, required_case, Case, Governor, RequiredCase};
pub use declension::{heuristic_form, inflect, DeclensionEntry, DeclensionTable, PartOfSpeech};
pub use resolver::{apply_case_agreement, inflect_phrase, resolve, CaseCorrection, Resolution};
