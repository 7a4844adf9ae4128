//! Cyrillic to Latin transliteration of file names.
//!
//! The table follows the Ukrainian national romanization with a couple of
//! simplifications (`й` and `ї` both become `i`, the soft sign is dropped).
//! Characters outside the table pass through untouched.
//!
//! # Examples
//!
//! ```
//! use dirsort::transliterate::{CaseMode, normalize, normalize_with};
//!
//! assert_eq!(normalize("Документ.txt"), "Dokument.txt");
//! assert_eq!(normalize_with("Документ.txt", CaseMode::Lowercase), "dokument.txt");
//! assert_eq!(normalize("report.PDF"), "report.PDF");
//! ```

/// Lowercase Cyrillic letter to its Latin spelling.
pub const TRANSLIT_TABLE: &[(char, &str)] = &[
    ('а', "a"),
    ('б', "b"),
    ('в', "v"),
    ('г', "h"),
    ('ґ', "g"),
    ('д', "d"),
    ('е', "e"),
    ('є', "ie"),
    ('ж', "zh"),
    ('з', "z"),
    ('и', "y"),
    ('і', "i"),
    ('ї', "i"),
    ('й', "i"),
    ('к', "k"),
    ('л', "l"),
    ('м', "m"),
    ('н', "n"),
    ('о', "o"),
    ('п', "p"),
    ('р', "r"),
    ('с', "s"),
    ('т', "t"),
    ('у', "u"),
    ('ф', "f"),
    ('х', "kh"),
    ('ц', "ts"),
    ('ч', "ch"),
    ('ш', "sh"),
    ('щ', "shch"),
    ('ь', ""),
    ('ю', "iu"),
    ('я', "ia"),
];

/// How uppercase Cyrillic letters are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseMode {
    /// Uppercase letters keep their case: `Ж` becomes `Zh`, or `ZH` inside an
    /// all-caps run.
    #[default]
    Preserve,
    /// Every mapped letter is emitted in lowercase, so `Документ` becomes
    /// `dokument`. Unmapped characters still keep their case.
    Lowercase,
}

/// Looks up the Latin spelling of a character, ignoring its case.
///
/// Returns `None` for characters outside the table, including characters whose
/// lowercase form is more than one code point.
pub fn lookup(c: char) -> Option<&'static str> {
    let mut lower = c.to_lowercase();
    let first = lower.next()?;
    if lower.next().is_some() {
        return None;
    }
    TRANSLIT_TABLE
        .iter()
        .find(|(cyr, _)| *cyr == first)
        .map(|(_, latin)| *latin)
}

/// Transliterates a file name, preserving the case of mapped letters.
pub fn normalize(name: &str) -> String {
    normalize_with(name, CaseMode::Preserve)
}

/// Transliterates a file name using the given case handling.
pub fn normalize_with(name: &str, mode: CaseMode) -> String {
    if !contains_cyrillic(name) {
        return name.to_string();
    }

    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len());

    for (i, &c) in chars.iter().enumerate() {
        let Some(latin) = lookup(c) else {
            out.push(c);
            continue;
        };

        if mode == CaseMode::Lowercase || !c.is_uppercase() {
            out.push_str(latin);
            continue;
        }

        let prev_upper = i > 0 && chars[i - 1].is_uppercase();
        let next = chars.get(i + 1).copied();
        let next_upper = next.is_some_and(char::is_uppercase);
        let next_lower = next.is_some_and(char::is_lowercase);

        if next_upper || (prev_upper && !next_lower) {
            out.push_str(&latin.to_uppercase());
        } else {
            let mut letters = latin.chars();
            if let Some(first) = letters.next() {
                out.extend(first.to_uppercase());
                out.push_str(letters.as_str());
            }
        }
    }

    out
}

/// Returns true if the string contains any character from the Cyrillic block.
pub fn contains_cyrillic(s: &str) -> bool {
    s.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c))
}
