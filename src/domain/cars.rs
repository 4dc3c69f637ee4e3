//! Built-in tables for car listings.

use super::{DomainConfig, GrammarCheck};
use crate::grammar::{Case, DeclensionEntry, DeclensionTable, PartOfSpeech};

const ADJECTIVES: &[[&str; 7]] = &[
    // colours
    ["czarny", "czarnego", "czarnemu", "czarny", "czarnym", "czarnym", "czarny"],
    ["biały", "białego", "białemu", "biały", "białym", "białym", "biały"],
    ["czerwony", "czerwonego", "czerwonemu", "czerwony", "czerwonym", "czerwonym", "czerwony"],
    ["srebrny", "srebrnego", "srebrnemu", "srebrny", "srebrnym", "srebrnym", "srebrny"],
    ["szary", "szarego", "szaremu", "szary", "szarym", "szarym", "szary"],
    ["niebieski", "niebieskiego", "niebieskiemu", "niebieski", "niebieskim", "niebieskim", "niebieski"],
    ["zielony", "zielonego", "zielonemu", "zielony", "zielonym", "zielonym", "zielony"],
    ["żółty", "żółtego", "żółtemu", "żółty", "żółtym", "żółtym", "żółty"],
    ["granatowy", "granatowego", "granatowemu", "granatowy", "granatowym", "granatowym", "granatowy"],
    ["grafitowy", "grafitowego", "grafitowemu", "grafitowy", "grafitowym", "grafitowym", "grafitowy"],
    // engines and drivetrains
    ["benzynowy", "benzynowego", "benzynowemu", "benzynowy", "benzynowym", "benzynowym", "benzynowy"],
    ["dieselowy", "dieselowego", "dieselowemu", "dieselowy", "dieselowym", "dieselowym", "dieselowy"],
    ["hybrydowy", "hybrydowego", "hybrydowemu", "hybrydowy", "hybrydowym", "hybrydowym", "hybrydowy"],
    ["elektryczny", "elektrycznego", "elektrycznemu", "elektryczny", "elektrycznym", "elektrycznym", "elektryczny"],
    ["mocny", "mocnego", "mocnemu", "mocny", "mocnym", "mocnym", "mocny"],
    ["oszczędny", "oszczędnego", "oszczędnemu", "oszczędny", "oszczędnym", "oszczędnym", "oszczędny"],
    // condition
    ["zadbany", "zadbanego", "zadbanemu", "zadbany", "zadbanym", "zadbanym", "zadbany"],
    ["nowy", "nowego", "nowemu", "nowy", "nowym", "nowym", "nowy"],
    ["stary", "starego", "staremu", "stary", "starym", "starym", "stary"],
    ["piękny", "pięknego", "pięknemu", "piękny", "pięknym", "pięknym", "piękny"],
    ["dobry", "dobrego", "dobremu", "dobry", "dobrym", "dobrym", "dobry"],
    ["idealny", "idealnego", "idealnemu", "idealny", "idealnym", "idealnym", "idealny"],
    ["bezwypadkowy", "bezwypadkowego", "bezwypadkowemu", "bezwypadkowy", "bezwypadkowym", "bezwypadkowym", "bezwypadkowy"],
    ["sportowy", "sportowego", "sportowemu", "sportowy", "sportowym", "sportowym", "sportowy"],
    ["automatyczny", "automatycznego", "automatycznemu", "automatyczny", "automatycznym", "automatycznym", "automatyczny"],
    ["manualny", "manualnego", "manualnemu", "manualny", "manualnym", "manualnym", "manualny"],
];

const NOUNS: &[[&str; 7]] = &[
    ["auto", "auta", "autu", "auto", "autem", "aucie", "auto"],
    ["samochód", "samochodu", "samochodowi", "samochód", "samochodem", "samochodzie", "samochodzie"],
    ["pojazd", "pojazdu", "pojazdowi", "pojazd", "pojazdem", "pojeździe", "pojeździe"],
    ["kolor", "koloru", "kolorowi", "kolor", "kolorem", "kolorze", "kolorze"],
    ["lakier", "lakieru", "lakierowi", "lakier", "lakierem", "lakierze", "lakierze"],
    ["silnik", "silnika", "silnikowi", "silnik", "silnikiem", "silniku", "silniku"],
    ["napęd", "napędu", "napędowi", "napęd", "napędem", "napędzie", "napędzie"],
    ["stan", "stanu", "stanowi", "stan", "stanem", "stanie", "stanie"],
    ["przebieg", "przebiegu", "przebiegowi", "przebieg", "przebiegiem", "przebiegu", "przebiegu"],
    ["wypadek", "wypadku", "wypadkowi", "wypadek", "wypadkiem", "wypadku", "wypadku"],
    ["wnętrze", "wnętrza", "wnętrzu", "wnętrze", "wnętrzem", "wnętrzu", "wnętrze"],
    ["wersja", "wersji", "wersji", "wersję", "wersją", "wersji", "wersjo"],
    ["skrzynia", "skrzyni", "skrzyni", "skrzynię", "skrzynią", "skrzyni", "skrzynio"],
    ["jazda", "jazdy", "jeździe", "jazdę", "jazdą", "jeździe", "jazdo"],
];

const ACCUSATIVE_VERBS: &[&str] = &[
    "ma", "mam", "mamy", "posiada", "posiadam", "posiadamy", "sprzedam", "sprzedaję",
    "sprzedaje", "sprzedajemy", "oferuję", "oferuje", "oferujemy", "polecam", "polecamy",
    "kupisz", "zyskujesz", "otrzymujesz",
];

const VOCABULARY: &[&str] = &[
    "samochód", "auto", "pojazd", "marka", "model", "silnik", "kolor", "przebieg", "rocznik",
    "paliwo", "napęd", "sedan", "suv", "hatchback", "combi", "kombi", "van", "cabriolet",
];

const PROHIBITED_WORDS: &[&str] = &["gwarantowane"];

/// Nominative adjective right after a noun that usually sits in another case.
const GRAMMAR_CHECKS: &[(&str, &str)] = &[
    (
        r"\bkolor\s+\p{L}+y\b",
        "color adjective should agree with 'kolor' (e.g. w kolorze czarnym)",
    ),
    (
        r"\bsilnik\s+\p{L}+y\b",
        "engine adjective should agree with 'silnik' (e.g. z silnikiem benzynowym)",
    ),
    (
        r"\bnapęd\s+\p{L}+y\b",
        "drive adjective should agree with 'napęd' (e.g. z napędem elektrycznym)",
    ),
];

pub(super) fn config() -> DomainConfig {
    let mut declensions = DeclensionTable::new();
    for forms in ADJECTIVES {
        declensions.insert(DeclensionEntry::from_forms(PartOfSpeech::Adjective, *forms));
    }
    for forms in NOUNS {
        declensions.insert(DeclensionEntry::from_forms(PartOfSpeech::Noun, *forms));
    }
    declensions.insert_noun_form("felgach", Case::Locative);
    declensions.insert_noun_form("oponach", Case::Locative);

    let grammar_checks = GRAMMAR_CHECKS
        .iter()
        .map(|(pattern, message)| {
            GrammarCheck::new(pattern, *message).expect("built-in grammar check pattern is valid")
        })
        .collect();

    DomainConfig {
        name: "cars".to_string(),
        assistant_role: "Jesteś kreatywnym asystentem sprzedaży samochodów.".to_string(),
        attributes_heading: "Dane pojazdu".to_string(),
        accusative_verbs: ACCUSATIVE_VERBS.iter().map(|v| v.to_string()).collect(),
        vocabulary: VOCABULARY.iter().map(|v| v.to_string()).collect(),
        prohibited_words: PROHIBITED_WORDS.iter().map(|v| v.to_string()).collect(),
        declensions,
        grammar_checks,
        min_length: 10,
        max_length: 600,
    }
}
