//! Fixed instruction texts. The domain's assistant role is prepended to
//! each system instruction at render time.

/// `{numbering}` is one `n. słowo` line per gap, `n` being the gap's own number.
pub const BATCHED_SYSTEM: &str = "Uzupełnij luki [GAP:n] w tekście, wybierając jedno słowo dla każdej luki. Wypisz wynik jako listę, w której numer pozycji to numer luki n z [GAP:n]:
{numbering}";

pub const BATCHED_TASK: &str = "Tekst do uzupełnienia:
{text}

Wypisz listę słów pasujących do luk ({numbers}):";

pub const BATCHED_JSON_SYSTEM: &str = r#"Uzupełnij luki [GAP:n] w tekście. Dla każdej luki podaj najlepsze słowo oraz do {alternatives} alternatyw. Odpowiedz wyłącznie obiektem JSON w formacie:
{"gaps": [{"index": {index}, "choice": "słowo", "alternatives": ["inne", "jeszcze inne"]}]}
Pole "index" to numer luki n z [GAP:n]."#;

pub const BATCHED_JSON_TASK: &str = "Tekst do uzupełnienia:
{text}

Odpowiedz obiektem JSON:";

pub const PER_GAP_SYSTEM: &str = "Twoim zadaniem jest uzupełnić lukę oznaczoną ___ w podanym fragmencie. Wybierz JEDNO słowo (przymiotnik lub rzeczownik), które najlepiej pasuje do kontekstu. Odpowiedź: tylko słowo, bez wyjaśnień.";

pub const PER_GAP_TASK: &str = "Tekst:
{context}

Wypełnij lukę - podaj jedno słowo:";
