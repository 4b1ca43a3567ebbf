//! Author comparison.
//!
//! Authorships are folded to ASCII, lowercased and stripped of punctuation before individual
//! authors are compared. Authors are abbreviated in many ways, so a shared surname prefix of
//! sufficient length is accepted as equality. Years only come into play when the authors
//! themselves do not compare as equal.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::name::ParsedName;
use crate::core::normalize::fold_to_ascii;
use crate::core::types::Equality;

static IN_PUBLICATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i) in .+$").expect("valid in-publication regex"));
static SANCTIONING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" *: *[A-Z][a-z]+\.?$").expect("valid sanctioning regex"));
static EX_AUTHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^.+ ex ").expect("valid ex-author regex"));
static FILIUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Z][a-z]*)[. ]\s*f(?:il)?\.?\b").expect("valid filius regex")
});
static AND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)( et | and |&amp;|&)").expect("valid conjunction regex"));
static TRANSLITERATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([auo])e").expect("valid transliteration regex"));
static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[[:punct:]&&[^,]]+").expect("valid punctuation regex"));
static COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*,\s*").expect("valid comma regex"));
static AUTHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:[a-z]\s)*).*?([a-z]+)( filius)?$").expect("valid author regex")
});
static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^0-9])([0-9?]{4})([^0-9]|$)").expect("valid year regex"));

/// Surname prefix length accepted as the same author
const MIN_COMMON_PREFIX: usize = 4;

/// Team members shorter than this are expanded through the author map
const MIN_AUTHOR_LENGTH_WITHOUT_LOOKUP: usize = 4;

/// Shortest normalized team accepted by the containment check
const MIN_CONTAINED_LENGTH: usize = 3;

#[derive(Error, Debug)]
pub enum AuthorMapError {
    #[error("Failed to read author map: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Invalid author map line {line}: expected abbreviation and full name separated by a tab")]
    InvalidLine { line: usize },
}

/// Compares authorships with three-valued logic.
///
/// Cloning is cheap: the abbreviation map is shared.
#[derive(Debug, Clone, Default)]
pub struct AuthorComparator {
    author_map: Arc<HashMap<String, String>>,
}

impl AuthorComparator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a comparator that expands abbreviated authors, e.g. "L." to "Linnaeus".
    ///
    /// Keys and values are normalized; entries that normalize to nothing are skipped.
    pub fn with_author_map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let map: HashMap<String, String> = entries
            .into_iter()
            .filter_map(|(k, v)| Some((normalize(k.as_ref())?, normalize(v.as_ref())?)))
            .collect();
        info!("Created author comparator with {} abbreviation entries", map.len());
        Self {
            author_map: Arc::new(map),
        }
    }

    /// Load the abbreviation map from a tab separated file.
    ///
    /// Blank lines and lines starting with `#` are ignored.
    pub fn load_author_map(path: &Path) -> Result<Self, AuthorMapError> {
        let reader = BufReader::new(File::open(path)?);
        let mut entries = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut cols = line.split('\t');
            match (cols.next(), cols.next()) {
                (Some(abbrev), Some(full)) => entries.push((abbrev.to_string(), full.to_string())),
                _ => return Err(AuthorMapError::InvalidLine { line: idx + 1 }),
            }
        }
        debug!("Read {} author map lines from {}", entries.len(), path.display());
        Ok(Self::with_author_map(entries))
    }

    #[must_use]
    pub fn author_map_len(&self) -> usize {
        self.author_map.len()
    }

    /// Compare two authorships, each with an optional year.
    ///
    /// Authors are compared first. Only when they are not equal is the year consulted, which can
    /// still turn the result into EQUAL when the years are close and the authorships share at
    /// least one capital letter.
    #[must_use]
    pub fn compare(
        &self,
        authors1: Option<&str>,
        year1: Option<&str>,
        authors2: Option<&str>,
        year2: Option<&str>,
    ) -> Equality {
        let mut result = self.compare_teams(authors1, authors2);
        if result == Equality::Equal {
            return result;
        }

        let year_result = YearComparator::new(year1, year2).compare();
        if year_result == Equality::Unknown {
            return result;
        }
        match (non_blank(authors1), non_blank(authors2)) {
            (Some(a1), Some(a2)) if year_result == Equality::Equal => {
                if shares_capital(a1, a2) {
                    result = year_result;
                }
            }
            _ => result = year_result,
        }
        result
    }

    /// Compare the full authorship of two names.
    ///
    /// The combination authorship decides when it is known. Otherwise the basionym authorship
    /// is compared, and as a last resort a basionym authorship on one side is compared with the
    /// combination authorship on the other, since missing brackets are a common error.
    #[must_use]
    pub fn compare_names(&self, n1: &ParsedName, n2: &ParsedName) -> Equality {
        let combination = self.compare(
            n1.authorship.as_deref(),
            n1.year.as_deref(),
            n2.authorship.as_deref(),
            n2.year.as_deref(),
        );
        if combination != Equality::Unknown {
            return combination;
        }

        let basionym = self.compare(
            n1.bracket_authorship.as_deref(),
            n1.bracket_year.as_deref(),
            n2.bracket_authorship.as_deref(),
            n2.bracket_year.as_deref(),
        );
        if basionym != Equality::Unknown {
            return combination.and(basionym);
        }

        let across = if is_blank(n1.authorship.as_deref()) && is_blank(n1.year.as_deref()) {
            self.compare(
                n1.bracket_authorship.as_deref(),
                n1.bracket_year.as_deref(),
                n2.authorship.as_deref(),
                n2.year.as_deref(),
            )
        } else if is_blank(n1.bracket_authorship.as_deref()) && is_blank(n1.bracket_year.as_deref())
        {
            self.compare(
                n1.authorship.as_deref(),
                n1.year.as_deref(),
                n2.bracket_authorship.as_deref(),
                n2.bracket_year.as_deref(),
            )
        } else {
            Equality::Unknown
        };
        if across == Equality::Equal {
            Equality::Equal
        } else {
            Equality::Unknown
        }
    }

    fn lookup(&self, author: String) -> String {
        match self.author_map.get(&author) {
            Some(full) => full.clone(),
            None => author,
        }
    }

    fn split_and_lookup(&self, normalized: Option<&str>) -> Vec<String> {
        normalized
            .map(|team| {
                team.split(',')
                    .filter(|a| !a.is_empty())
                    .map(|a| {
                        if a.len() < MIN_AUTHOR_LENGTH_WITHOUT_LOOKUP {
                            self.lookup(a.to_string())
                        } else {
                            a.to_string()
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn compare_teams(&self, a1: Option<&str>, a2: Option<&str>) -> Equality {
        let n1 = a1.and_then(normalize);
        let n2 = a2.and_then(normalize);
        let team1 = self.split_and_lookup(n1.as_deref());
        let team2 = self.split_and_lookup(n2.as_deref());
        if team1.is_empty() || team2.is_empty() {
            return Equality::Unknown;
        }

        let mut equality = compare_normalized_teams(&team1, &team2);
        if equality != Equality::Equal {
            // Retry with every team member expanded, not only the short ones
            let expanded1: Vec<String> = team1.iter().cloned().map(|a| self.lookup(a)).collect();
            let expanded2: Vec<String> = team2.iter().cloned().map(|a| self.lookup(a)).collect();
            if expanded1 != team1 || expanded2 != team2 {
                equality = compare_normalized_teams(&expanded1, &expanded2);
            }
        }

        if equality != Equality::Equal {
            if let (Some(n1), Some(n2)) = (n1.as_deref(), n2.as_deref()) {
                if team_contained(n1, n2) {
                    return Equality::Equal;
                }
            }
        }
        equality
    }
}

/// Normalize an authorship to lowercase ASCII with authors separated by commas.
///
/// Returns `None` for blank input or input without any letters or digits.
#[must_use]
pub fn normalize(authorship: &str) -> Option<String> {
    if authorship.trim().is_empty() {
        return None;
    }
    let x = fold_to_ascii(authorship);
    let x = IN_PUBLICATION.replace(&x, "");
    let x = SANCTIONING.replace(&x, "");
    let x = EX_AUTHOR.replace(&x, "");
    let x = FILIUS.replace_all(&x, "$1 filius");
    let x = AND.replace_all(&x, ", ");
    let x = TRANSLITERATION.replace_all(&x, "$1");
    let x = PUNCTUATION.replace_all(&x, " ");
    let x = COMMA.replace_all(&x, ",");
    let x = x.split_whitespace().collect::<Vec<_>>().join(" ");
    if x.is_empty() {
        None
    } else {
        Some(x.to_lowercase())
    }
}

fn compare_normalized_teams(team1: &[String], team2: &[String]) -> Equality {
    if team1 == team2 {
        return Equality::Equal;
    }
    let authors2: Vec<Author> = team2.iter().map(|a| Author::parse(a)).collect();
    for a1 in team1.iter().map(|a| Author::parse(a)) {
        if authors2.iter().any(|a2| a1.compare(a2) == Equality::Equal) {
            return Equality::Equal;
        }
    }
    Equality::Different
}

/// True when one team, without separators, is contained in the other.
fn team_contained(n1: &str, n2: &str) -> bool {
    let squash = |s: &str| s.replace([',', ' '], "");
    let (s1, s2) = (squash(n1), squash(n2));
    let (shorter, longer) = if s1.len() <= s2.len() { (s1, s2) } else { (s2, s1) };
    shorter.len() >= MIN_CONTAINED_LENGTH && longer.contains(&shorter)
}

fn shares_capital(a1: &str, a2: &str) -> bool {
    a1.chars()
        .filter(|c| c.is_uppercase())
        .any(|c| a2.contains(c))
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

fn is_blank(s: Option<&str>) -> bool {
    non_blank(s).is_none()
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .take_while(|((_, x), y)| x == y)
        .last()
        .map_or(0, |((i, c), _)| i + c.len_utf8());
    &a[..end]
}

/// A single normalized author: initials, surname and an optional `filius` suffix.
#[derive(Debug)]
struct Author<'a> {
    fullname: &'a str,
    initials: &'a str,
    surname: &'a str,
}

impl<'a> Author<'a> {
    fn parse(fullname: &'a str) -> Self {
        match AUTHOR.captures(fullname) {
            Some(caps) => Self {
                fullname,
                initials: caps.get(1).map_or("", |m| m.as_str().trim()),
                surname: caps.get(2).map_or("", |m| m.as_str().trim()),
            },
            None => {
                debug!("Cannot parse author: {fullname}");
                Self {
                    fullname,
                    initials: "",
                    surname: fullname.trim(),
                }
            }
        }
    }

    /// Initials conflict only when both exist and neither set contains the other.
    fn first_initials_differ(&self, other: &Author<'_>) -> bool {
        if self.initials.is_empty() || other.initials.is_empty() {
            return false;
        }
        if self.initials == other.initials {
            return false;
        }
        let letters = |s: &str| {
            let mut v: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();
            v.sort_unstable();
            v
        };
        let (mut smaller, mut larger) = (letters(self.initials), letters(other.initials));
        if smaller.len() > larger.len() {
            std::mem::swap(&mut smaller, &mut larger);
        }
        !is_sub_multiset(&smaller, &larger)
    }

    fn compare(&self, other: &Author<'_>) -> Equality {
        if self.fullname == other.fullname {
            return Equality::Equal;
        }

        let common = common_prefix(self.surname, other.surname);
        if self.surname == other.surname || common.len() >= MIN_COMMON_PREFIX {
            // Relatives often share a surname and differ in a single initial
            return if self.first_initials_differ(other) {
                Equality::Different
            } else {
                Equality::Equal
            };
        }

        let abbreviated_surname = self.surname == common || other.surname == common;
        if !self.first_initials_differ(other) && abbreviated_surname && !common.is_empty() {
            return Equality::Equal;
        }

        let abbreviated_fullname = (self.fullname == common && other.surname.starts_with(common))
            || (other.fullname == common && self.surname.starts_with(common));
        if abbreviated_fullname && !common.is_empty() {
            return Equality::Equal;
        }

        let shared = common_prefix(self.fullname, other.fullname);
        if shared.chars().filter(|c| !c.is_whitespace()).count() > MIN_COMMON_PREFIX {
            return Equality::Equal;
        }
        Equality::Different
    }
}

/// Both slices must be sorted.
fn is_sub_multiset(smaller: &[char], larger: &[char]) -> bool {
    let mut it = larger.iter();
    smaller.iter().all(|c| it.by_ref().any(|l| l == c))
}

/// Compares publication years, tolerating one year difference and `?` placeholders.
#[derive(Debug, Clone)]
pub struct YearComparator {
    y1: Option<String>,
    y2: Option<String>,
}

impl YearComparator {
    #[must_use]
    pub fn new(y1: Option<&str>, y2: Option<&str>) -> Self {
        Self {
            y1: y1.and_then(normalize_year),
            y2: y2.and_then(normalize_year),
        }
    }

    #[must_use]
    pub fn compare(&self) -> Equality {
        let (Some(y1), Some(y2)) = (self.y1.as_deref(), self.y2.as_deref()) else {
            return Equality::Unknown;
        };
        if y1 == y2 {
            return Equality::Equal;
        }
        match (y1.parse::<i32>(), y2.parse::<i32>()) {
            (Ok(i1), Ok(i2)) => {
                if (i1 - i2).abs() <= 1 {
                    return Equality::Equal;
                }
            }
            _ => {
                if placeholders_match(y1, y2) {
                    return Equality::Equal;
                }
            }
        }
        Equality::Different
    }
}

fn normalize_year(y: &str) -> Option<String> {
    let compact: String = y.chars().filter(|c| !c.is_whitespace()).collect();
    match YEAR.captures(&compact) {
        Some(caps) => caps.get(2).map(|m| m.as_str().to_string()),
        None => normalize(y),
    }
}

/// Blank out the first `?` of each year in both years and compare again.
fn placeholders_match(y1: &str, y2: &str) -> bool {
    let q1 = y1.find('?');
    let q2 = y2.find('?');
    if q1.is_none() && q2.is_none() {
        return false;
    }
    let mut s1: Vec<char> = y1.chars().collect();
    let mut s2: Vec<char> = y2.chars().collect();
    for pos in [q1, q2].into_iter().flatten() {
        if let Some(c) = s1.get_mut(pos) {
            *c = '_';
        }
        if let Some(c) = s2.get_mut(pos) {
            *c = '_';
        }
    }
    s1 == s2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(a1: Option<&str>, y1: Option<&str>, a2: Option<&str>, y2: Option<&str>) -> Equality {
        AuthorComparator::new().compare(a1, y1, a2, y2)
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("  "), None);
        assert_eq!(normalize("()."), None);
        assert_eq!(normalize("Döring").as_deref(), Some("doring"));
        assert_eq!(normalize("A.J. White").as_deref(), Some("a j white"));
        assert_eq!(normalize("Bertero ex Colla").as_deref(), Some("colla"));
        assert_eq!(
            normalize("G.Kirchn. in Petzold & G.Kirchn.").as_deref(),
            Some("g kirchn")
        );
        assert_eq!(normalize("Torr. & A.Gray").as_deref(), Some("torr,a gray"));
        assert_eq!(normalize("Mueller").as_deref(), Some("muller"));
        assert_eq!(normalize("Don f.").as_deref(), Some("don filius"));
        assert_eq!(normalize("L.f.").as_deref(), Some("l filius"));
        assert_eq!(normalize("Fr. : Fr.").as_deref(), Some("fr"));
    }

    #[test]
    fn test_reflexive_and_unknown() {
        assert_eq!(cmp(Some("Mill."), None, Some("Mill."), None), Equality::Equal);
        assert_eq!(cmp(None, None, None, None), Equality::Unknown);
        assert_eq!(cmp(Some(""), None, Some(" "), None), Equality::Unknown);
        assert_eq!(cmp(Some("L."), None, None, None), Equality::Unknown);
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(cmp(Some("L."), None, Some("Linne"), None), Equality::Equal);
        assert_eq!(cmp(Some("Chapm."), None, Some("F.R.Chapm."), None), Equality::Equal);
        assert_eq!(cmp(Some("Koch"), None, Some("H Koch"), None), Equality::Equal);
        assert_eq!(cmp(Some("Reich."), None, Some("Reichenberger"), None), Equality::Equal);
        assert_eq!(cmp(Some("Reich."), None, Some("Müller"), None), Equality::Different);
        assert_eq!(cmp(Some("Mill."), None, Some("L."), None), Equality::Different);
    }

    #[test]
    fn test_teams() {
        assert_eq!(
            cmp(
                Some("Robertson, T., Miller, P. et Jameson, R. J."),
                None,
                Some("Miller"),
                None
            ),
            Equality::Equal
        );
        assert_eq!(
            cmp(Some("Bluff & Fingerh."), None, Some("Lindl."), None),
            Equality::Different
        );
    }

    #[test]
    fn test_conflicting_initials() {
        assert_eq!(
            cmp(Some("R.H.Roberts"), None, Some("R.J.Roberts"), None),
            Equality::Different
        );
        assert_eq!(cmp(Some("A.J.White"), None, Some("J.White"), None), Equality::Equal);
    }

    #[test]
    fn test_years() {
        assert_eq!(cmp(None, Some("1978"), None, Some("1934")), Equality::Different);
        assert_eq!(cmp(None, Some("1978"), None, Some("1978")), Equality::Equal);
        assert_eq!(
            cmp(Some("Bruand"), Some("1850"), Some("Bruand"), Some("1851")),
            Equality::Equal
        );
        assert_eq!(
            cmp(Some("Bruand"), Some("1850"), None, Some("1998")),
            Equality::Different
        );
        assert_eq!(
            cmp(Some("O. Kuntze"), Some("1891"), Some("P. Miller"), Some("1754")),
            Equality::Different
        );
    }

    #[test]
    fn test_year_comparator() {
        assert_eq!(YearComparator::new(Some("1850"), Some("1851")).compare(), Equality::Equal);
        assert_eq!(YearComparator::new(Some("1850"), Some("1852")).compare(), Equality::Different);
        assert_eq!(YearComparator::new(Some("(1850)"), Some("1850")).compare(), Equality::Equal);
        assert_eq!(YearComparator::new(Some("18?5"), Some("1885")).compare(), Equality::Equal);
        assert_eq!(YearComparator::new(Some("18?5"), Some("1886")).compare(), Equality::Different);
        assert_eq!(YearComparator::new(None, Some("1850")).compare(), Equality::Unknown);
    }

    #[test]
    fn test_author_map() {
        let ac = AuthorComparator::with_author_map([("L.", "Linnaeus"), ("DC.", "de Candolle")]);
        assert_eq!(ac.author_map_len(), 2);
        assert_eq!(ac.compare(Some("DC."), None, Some("de Candolle"), None), Equality::Equal);
        assert_eq!(
            AuthorComparator::new().compare(Some("DC."), None, Some("Candolle"), None),
            Equality::Different
        );
    }

    #[test]
    fn test_load_author_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authors.tsv");
        std::fs::write(&path, "# abbreviations\nDC.\tde Candolle\n\nL.\tLinnaeus\n").unwrap();
        let ac = AuthorComparator::load_author_map(&path).unwrap();
        assert_eq!(ac.author_map_len(), 2);

        std::fs::write(&path, "DC. de Candolle\n").unwrap();
        assert!(matches!(
            AuthorComparator::load_author_map(&path),
            Err(AuthorMapError::InvalidLine { line: 1 })
        ));
    }

    #[test]
    fn test_compare_names_brackets() {
        let ac = AuthorComparator::new();
        let a = ParsedName::with_authorship(Some("Mill."), None).with_bracket(Some("L."), None);
        let b = ParsedName::with_authorship(None, None).with_bracket(Some("L."), None);
        assert_eq!(ac.compare_names(&a, &b), Equality::Equal);

        // basionym author given without brackets
        let c = ParsedName::with_authorship(None, None).with_bracket(Some("Linne"), None);
        let d = ParsedName::with_authorship(Some("L."), None);
        assert_eq!(ac.compare_names(&c, &d), Equality::Equal);

        let e = ParsedName::with_authorship(None, None).with_bracket(Some("Bluff"), None);
        let f = ParsedName::with_authorship(Some("Lindl."), None);
        assert_eq!(ac.compare_names(&e, &f), Equality::Unknown);

        let empty = ParsedName::default();
        assert_eq!(ac.compare_names(&empty, &empty), Equality::Unknown);
    }
}
