//! Comparison forms for scientific names.
//!
//! [`normalize`] produces the key under which backbone names are indexed: lowercase ASCII,
//! hybrid markers and punctuation removed, whitespace collapsed, and every epithet (any token
//! after the first) normalized for common spelling variation. [`normalize_stemmed`] additionally
//! maps Latin gender endings onto a single form and is used when comparing tokens, never for
//! index keys, as it would merge too many distinct names.
//!
//! Both functions are total and idempotent, and they ignore case.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const HYBRID_SIGN: char = '×';

/// Fold a string to ASCII, keeping case.
///
/// Diacritics are stripped after compatibility decomposition. Letters that have no
/// decomposition are transliterated (`æ` → `ae`, `ø` → `o`, `ł` → `l`, ...).
#[must_use]
pub fn fold_to_ascii(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.nfkd() {
        if is_combining_mark(c) {
            continue;
        }
        match c {
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("OE"),
            'ø' => out.push('o'),
            'Ø' => out.push('O'),
            'đ' | 'ð' => out.push('d'),
            'Đ' | 'Ð' => out.push('D'),
            'ł' => out.push('l'),
            'Ł' => out.push('L'),
            'ß' => out.push_str("ss"),
            'þ' => out.push_str("th"),
            'Þ' => out.push_str("TH"),
            'ı' => out.push('i'),
            _ => out.push(c),
        }
    }
    out
}

/// Normalize a scientific name into its index key form.
#[must_use]
pub fn normalize(raw: &str) -> String {
    normalize_name(raw, false)
}

/// Normalize a scientific name, also unifying Latin epithet endings.
#[must_use]
pub fn normalize_stemmed(raw: &str) -> String {
    normalize_name(raw, true)
}

fn normalize_name(raw: &str, stemming: bool) -> String {
    let folded = fold_to_ascii(&raw.to_lowercase());

    let mut cleaned = String::with_capacity(folded.len());
    for c in folded.chars() {
        match c {
            '\'' | '_' | '-' | HYBRID_SIGN => {}
            '(' | ')' | '.' | ',' | ';' | ':' | '"' | '?' | '!' => cleaned.push(' '),
            c if c.is_whitespace() => cleaned.push(' '),
            c => cleaned.push(c),
        }
    }

    let mut tokens = cleaned.split_whitespace().filter(|t| !is_hybrid_marker(t));
    let Some(first) = tokens.next() else {
        return String::new();
    };

    let mut out = String::with_capacity(cleaned.len());
    out.push_str(first);
    for token in tokens {
        let epithet = normalize_epithet(token, stemming);
        if is_hybrid_marker(&epithet) {
            continue;
        }
        out.push(' ');
        out.push_str(&epithet);
    }
    out
}

fn is_hybrid_marker(token: &str) -> bool {
    token == "x"
}

/// Normalize a single lowercase epithet for spelling variation.
///
/// Repeated letters collapse, `j`/`y`/`i` runs after the first letter become `i`, and `th`/`rh`
/// drop the `h`. With `stemming`, the endings `-on`, `-um`, `-us` become `-a` and a final `-ei`
/// becomes `-i`.
///
/// The steps repeat until the word no longer changes. None of them lengthens the word, and the
/// only same-length rewrite turns `j`/`y` into `i`, so this always terminates.
#[must_use]
pub fn normalize_epithet(token: &str, stemming: bool) -> String {
    let mut word = token.to_string();
    loop {
        let next = normalize_epithet_once(&word, stemming);
        if next == word {
            return word;
        }
        word = next;
    }
}

fn normalize_epithet_once(token: &str, stemming: bool) -> String {
    let mut word = collapse_repeated_letters(token);
    if stemming {
        word = stem_ending(&word);
    }
    word = unify_i_variants(&word);
    if stemming {
        if let Some(stem) = word.strip_suffix("ei") {
            word = format!("{stem}i");
        }
    }
    word = drop_aspirate_h(&word);
    collapse_repeated_letters(&word)
}

fn collapse_repeated_letters(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last: Option<char> = None;
    for c in s.chars() {
        if c.is_alphabetic() && last == Some(c) {
            continue;
        }
        out.push(c);
        last = Some(c);
    }
    out
}

fn stem_ending(word: &str) -> String {
    for suffix in ["on", "um", "us"] {
        if let Some(stem) = word.strip_suffix(suffix) {
            return format!("{stem}a");
        }
    }
    word.to_string()
}

fn unify_i_variants(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut in_run = false;
    for (i, c) in word.chars().enumerate() {
        if i > 0 && matches!(c, 'i' | 'j' | 'y') {
            if !in_run {
                out.push('i');
                in_run = true;
            }
            continue;
        }
        in_run = false;
        out.push(c);
    }
    out
}

fn drop_aspirate_h(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev: Option<char> = None;
    for c in word.chars() {
        if c == 'h' && matches!(prev, Some('t' | 'r')) {
            continue;
        }
        out.push(c);
        prev = Some(c);
    }
    out
}
