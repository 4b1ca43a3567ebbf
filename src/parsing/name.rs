//! Lightweight scientific name parser.
//!
//! Splits `[×] Genus [(Subgenus)] [epithet] [rank marker] [infraspecific epithet] [authorship]`
//! into a [`ParsedName`]. Authorship is split into the basionym part in brackets and the
//! combination part, each with an optional trailing year.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::core::name::ParsedName;
use crate::core::types::Rank;
use crate::utils::validation::MAX_NAME_LENGTH;

static TRAILING_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)[\s,]*\(?([12][0-9?]{3}[a-z]?)\)?$").expect("valid trailing year regex")
});

/// Names that only express that the taxon is unknown
const PLACEHOLDERS: &[&str] = &[
    "incertae sedis",
    "unknown",
    "unidentified",
    "not assigned",
    "unassigned",
    "sp",
    "spp",
    "sp.",
    "spp.",
];

/// Lowercase words that start an authorship rather than an epithet
const AUTHOR_PARTICLES: &[&str] = &[
    "d'", "da", "de", "del", "della", "den", "der", "des", "di", "do", "dos", "du", "la", "le",
    "ten", "ter", "van", "von", "zu",
];

/// Qualifiers that are skipped
const QUALIFIERS: &[&str] = &["cf.", "cf", "aff.", "aff", "nr.", "agg.", "s.l.", "s.str."];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty name")]
    Empty,

    #[error("Placeholder name: {0}")]
    Placeholder(String),

    #[error("Unparsable name: {0}")]
    Unparsable(String),

    #[error("Name too long: {0} bytes")]
    TooLong(usize),
}

/// Parse a scientific name.
///
/// # Errors
///
/// Returns `ParseError::Empty` for blank input, `ParseError::Placeholder` for names such as
/// "incertae sedis", `ParseError::TooLong` above the name length limit and
/// `ParseError::Unparsable` for names not starting with a capitalized genus or uninomial.
pub fn parse(name: &str) -> Result<ParsedName, ParseError> {
    let trimmed = check_name(name)?;

    let mut pn = ParsedName {
        scientific_name: trimmed.to_string(),
        ..ParsedName::default()
    };

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let mut pos = 0;

    // Leading hybrid marker, either standalone or attached to the genus
    let mut first = tokens[pos];
    if first == "×" || first == "x" || first == "X" {
        pn.hybrid = true;
        pos += 1;
        first = tokens
            .get(pos)
            .copied()
            .ok_or_else(|| ParseError::Unparsable(trimmed.to_string()))?;
    }
    if let Some(rest) = first.strip_prefix('×') {
        pn.hybrid = true;
        first = rest;
    }
    if !is_uninomial(first) {
        return Err(ParseError::Unparsable(trimmed.to_string()));
    }
    pn.genus = Some(first.to_string());
    pos += 1;

    let mut pending_rank: Option<Rank> = None;
    while pos < tokens.len() {
        let token = tokens[pos];

        if QUALIFIERS.contains(&token) {
            pos += 1;
            continue;
        }

        // Infrageneric name in brackets right after the genus
        if pn.specific_epithet.is_none() && pn.infrageneric.is_none() && pending_rank.is_none() {
            if let Some(inner) = token.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
                if is_uninomial(inner) && !inner.ends_with('.') {
                    pn.infrageneric = Some(inner.to_string());
                    pn.rank = Some(Rank::Subgenus);
                    pos += 1;
                    continue;
                }
            }
        }

        if token == "×" || token == "x" {
            return Err(ParseError::Unparsable(format!("hybrid formula: {trimmed}")));
        }

        if let Some(rank) = Rank::from_marker(token).filter(|_| is_marker_token(token)) {
            if rank == Rank::Species && pn.specific_epithet.is_none() {
                // "Abies sp." denotes an unidentified species of the genus
                pn.rank = Some(Rank::Species);
                pos += 1;
                break;
            }
            if rank.is_infrageneric() && pn.specific_epithet.is_none() {
                if let Some(next) = tokens.get(pos + 1).filter(|t| is_uninomial(t)) {
                    pn.infrageneric = Some((*next).to_string());
                    pn.rank = Some(rank);
                    pos += 2;
                    continue;
                }
            }
            if pn.specific_epithet.is_some() && pn.infraspecific_epithet.is_none() {
                pending_rank = Some(rank);
                pos += 1;
                continue;
            }
            break;
        }

        let token = token.strip_prefix('×').map_or(token, |rest| {
            pn.hybrid = true;
            rest
        });
        if !is_epithet(token) {
            break;
        }
        if pn.specific_epithet.is_none() && pending_rank.is_none() {
            pn.specific_epithet = Some(token.to_string());
            pn.rank = Some(Rank::Species);
        } else if pn.infraspecific_epithet.is_none() {
            pn.infraspecific_epithet = Some(token.to_string());
            pn.rank = pending_rank.take().or(Some(Rank::InfraspecificName));
        } else {
            break;
        }
        pos += 1;
    }

    let authorship = tokens[pos.min(tokens.len())..].join(" ");
    apply_authorship(&mut pn, &authorship);
    pn.parsed = true;
    Ok(pn)
}

/// Whether a name is written in a single case, e.g. "ABIES ALBA" or "abies alba".
///
/// The parser tells genus, epithets and authors apart by case, so such names cannot be split.
#[must_use]
pub fn is_single_case(name: &str) -> bool {
    name.chars().any(char::is_alphabetic)
        && (name.to_lowercase() == name || name.to_uppercase() == name)
}

/// Wrap a name without splitting it into its parts.
///
/// Only the checks that do not depend on case are applied and the result is marked unparsed.
///
/// # Errors
///
/// Returns `ParseError::Empty`, `ParseError::TooLong` or `ParseError::Placeholder` as [`parse`] does.
pub fn parse_unsplit(name: &str) -> Result<ParsedName, ParseError> {
    let trimmed = check_name(name)?;
    Ok(ParsedName {
        scientific_name: trimmed.to_string(),
        ..ParsedName::default()
    })
}

fn check_name(name: &str) -> Result<&str, ParseError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ParseError::TooLong(trimmed.len()));
    }
    if is_placeholder(trimmed) {
        return Err(ParseError::Placeholder(trimmed.to_string()));
    }
    Ok(trimmed)
}

/// Parse a standalone authorship such as "(L., 1753) Mill. 1768".
///
/// The returned name only carries the authorship and year fields.
#[must_use]
pub fn parse_authorship(authorship: &str) -> ParsedName {
    let mut pn = ParsedName {
        parsed: true,
        ..ParsedName::default()
    };
    apply_authorship(&mut pn, authorship);
    pn
}

/// Split an authorship into its bracket and combination parts.
fn apply_authorship(pn: &mut ParsedName, authorship: &str) {
    let mut rest = authorship.trim();
    if rest.is_empty() {
        return;
    }

    if let Some(inner) = rest.strip_prefix('(') {
        if let Some(close) = inner.find(')') {
            let (author, year) = split_year(&inner[..close]);
            pn.bracket_authorship = author;
            pn.bracket_year = year;
            rest = inner[close + 1..].trim();
        }
    }

    let (author, year) = split_year(rest);
    pn.authorship = author;
    pn.year = year;
}

fn split_year(s: &str) -> (Option<String>, Option<String>) {
    let s = s.trim().trim_end_matches(',').trim();
    if s.is_empty() {
        return (None, None);
    }
    match TRAILING_YEAR.captures(s) {
        Some(caps) => {
            let author = caps.get(1).map(|m| m.as_str().trim().trim_end_matches(','));
            let year = caps.get(2).map(|m| m.as_str().to_string());
            (author.filter(|a| !a.is_empty()).map(str::to_string), year)
        }
        None => (Some(s.to_string()), None),
    }
}

fn is_placeholder(name: &str) -> bool {
    let lower = name.to_lowercase();
    let collapsed = lower.split_whitespace().collect::<Vec<_>>().join(" ");
    PLACEHOLDERS.contains(&collapsed.as_str()) || collapsed.starts_with("incertae sedis")
}

/// A capitalized word of at least two letters, e.g. a genus or family
fn is_uninomial(token: &str) -> bool {
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_uppercase()
        && token.chars().count() > 1
        && chars.all(|c| c.is_alphabetic() || c == '-')
}

/// A lowercase word of at least two letters that is not an author particle
fn is_epithet(token: &str) -> bool {
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_lowercase()
        && token.chars().count() > 1
        && chars.all(|c| c.is_alphabetic() || c == '-')
        && !AUTHOR_PARTICLES.contains(&token)
}

/// Rank markers are lowercase and either abbreviated with a period or one of the known words
fn is_marker_token(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_lowercase)
        && (token.ends_with('.') || matches!(token, "subsp" | "ssp" | "var" | "forma" | "cv"))
}
