//! Optional clean-up of raw input text before marker detection.

use regex::Regex;
use std::sync::OnceLock;

struct Rules {
    whitespace: Regex,
    space_before_punct: Regex,
    space_after_sentence: Regex,
    single_quotes: Regex,
    double_quotes: Regex,
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| Rules {
        whitespace: Regex::new(r"\s+").expect("whitespace pattern is valid"),
        space_before_punct: Regex::new(r"\s+([.,!?;:])").expect("punctuation pattern is valid"),
        space_after_sentence: Regex::new(r"([.!?])\s+").expect("sentence pattern is valid"),
        single_quotes: Regex::new("[\u{2018}\u{2019}\u{2032}`]").expect("quote pattern is valid"),
        double_quotes: Regex::new("[\u{201C}\u{201D}\u{201E}]").expect("quote pattern is valid"),
    })
}

/// Collapse whitespace, tighten spacing around punctuation and replace
/// typographic quotes with ASCII ones.
pub fn normalize_text(text: &str) -> String {
    let rules = rules();
    let text = rules.whitespace.replace_all(text.trim(), " ");
    let text = rules.space_before_punct.replace_all(&text, "$1");
    let text = rules.space_after_sentence.replace_all(&text, "$1 ");
    let text = rules.single_quotes.replace_all(&text, "'");
    let text = rules.double_quotes.replace_all(&text, "\"");
    text.trim().to_string()
}
