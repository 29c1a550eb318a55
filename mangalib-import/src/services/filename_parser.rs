//! Manga filename parser
//!
//! Extracts series title, volume, part, author, year and resolution from
//! release-style filenames such as `One Piece Tome 09 (Oda) 1600x2400.cbz`.
//! Parsing never fails: unrecognized fields are left empty.

use crate::models::{ParsedFilename, UNTITLED};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static filename pattern")
}

static PART: Lazy<Regex> = Lazy::new(|| re(r"(?i)(?:Part|Arc|Partie)\s+([0-9]+)"));

// [^T] is case-folded under (?i), so part names stop at any 't'
static PART_NAME: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)(?:Part|Arc|Partie)\s+[0-9]+\s*-\s*([^T]+?)\s+T[0-9]+"));

static VOLUME_AFTER_PART: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)(?:Part|Arc|Partie)\s+[0-9]+(?:\s*-\s*[^T-]*?)?\s*-?\s*T[\s.]?([0-9]+)")
});

/// Volume markers, most specific first
static VOLUME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)Tome[\s.]([0-9]+)",
        r"(?i)T[\s.]?([0-9]+)",
        r"(?i)Vol\.?\s*([0-9]+)",
        r"(?i)Volume[\s.]([0-9]+)",
        r"(?i)v[\s.]?([0-9]+)",
        r"(?i)#([0-9]+)",
        r"(?i)-\s*([0-9]+)(?:\s|$)",
        r"(?i)\s([0-9]{1,2})\s*(?:\(|\[)",
        r"(?i)\s([0-9]+)\s*(?:FR|EN|VF|VO)",
        r"(?i)\s([0-9]{1,3})$",
    ]
    .into_iter()
    .map(re)
    .collect()
});

static TITLE_BEFORE_PART: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)^(.+?)\s+(?:Part|Arc|Partie)\s*[0-9]+"));

static TITLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^(.+?)\s+(?:Tome|T[\s.]?[0-9]+|Vol|Volume|v[\s.]?[0-9]+|#[0-9]+|-\s*[0-9]+)",
        r"(?i)^(.+?)\s+([0-9]{1,2})\s*(?:\(|\[)",
    ]
    .into_iter()
    .map(re)
    .collect()
});

static LANGUAGE_TAIL: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)\s+(?:FR|EN|VF|VO|FRENCH|ENGLISH)\b.*$"));
static RELEASE_TAIL: Lazy<Regex> = Lazy::new(|| re(r"\s*-\s*[A-Za-z0-9]+$"));
static TRAILING_DASH: Lazy<Regex> = Lazy::new(|| re(r"\s*-\s*$"));

static AUTHOR_PAREN: Lazy<Regex> = Lazy::new(|| re(r"\(([^)]+?)\)"));
static AUTHOR_DASH: Lazy<Regex> =
    Lazy::new(|| re(r"-\s*([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\s*(?:T[0-9]+|Tome|Vol)"));
static FOUR_DIGITS: Lazy<Regex> = Lazy::new(|| re(r"^[0-9]{4}$"));

static YEAR: Lazy<Regex> = Lazy::new(|| re(r"\b(19[0-9]{2}|20[0-9]{2})\b"));
static RESOLUTION: Lazy<Regex> = Lazy::new(|| re(r"([0-9]{3,4}x[0-9]{3,4})"));

/// Largest number accepted as a volume
const MAX_VOLUME: u32 = 999;

/// Parse a filename (optionally with a relative path) into structured fields
pub fn parse_filename(filename: &str) -> ParsedFilename {
    let base = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());

    let format = base
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase();

    let stem = Path::new(&base)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = normalize_separators(&stem);

    let part_number = first_capture(&PART, &name).and_then(|n| n.parse().ok());
    let part_name = if part_number.is_some() {
        first_capture(&PART_NAME, &name)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
    } else {
        None
    };

    let volume = if part_number.is_some() {
        first_capture(&VOLUME_AFTER_PART, &name)
            .and_then(|n| n.parse().ok())
            .filter(|&v| v != 0)
            // The part marker itself must not be read as a `T` volume
            .or_else(|| find_volume(&PART.replace_all(&name, " ")))
    } else {
        find_volume(&name)
    };

    let title = extract_title(&name, part_number.is_some());

    ParsedFilename {
        title: Some(title),
        volume,
        part_number,
        part_name,
        author: extract_author(&base, &name),
        year: first_capture(&YEAR, &base).and_then(|y| y.parse().ok()),
        resolution: first_capture(&RESOLUTION, &base).map(str::to_string),
        format,
    }
}

/// Dots become spaces unless between two digits; underscores become spaces
fn normalize_separators(stem: &str) -> String {
    let chars: Vec<char> = stem.chars().collect();
    let mut out = String::with_capacity(stem.len());

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '.' => {
                let prev_digit = i > 0 && chars[i - 1].is_ascii_digit();
                let next_digit = chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
                out.push(if prev_digit && next_digit { '.' } else { ' ' });
            }
            '_' => out.push(' '),
            other => out.push(other),
        }
    }

    collapse_whitespace(&out)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_capture<'a>(pattern: &Regex, text: &'a str) -> Option<&'a str> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// First candidate from the ordered patterns that is a plausible volume
fn find_volume(name: &str) -> Option<u32> {
    VOLUME_PATTERNS.iter().find_map(|pattern| {
        let number: u32 = first_capture(pattern, name)?.parse().ok()?;
        let looks_like_year = (1800..=2099).contains(&number);
        (!looks_like_year && number <= MAX_VOLUME).then_some(number)
    })
}

fn extract_title(name: &str, has_part: bool) -> String {
    let matched = if has_part {
        first_capture(&TITLE_BEFORE_PART, name)
    } else {
        TITLE_PATTERNS
            .iter()
            .find_map(|pattern| first_capture(pattern, name))
    };

    let title = match matched {
        Some(t) => t.to_string(),
        None => {
            let without_lang = LANGUAGE_TAIL.replace(name, "");
            let without_tag = RELEASE_TAIL.replace(&without_lang, "");
            let cleaned = without_tag.trim();
            if cleaned.is_empty() {
                name.to_string()
            } else {
                cleaned.to_string()
            }
        }
    };

    let title = collapse_whitespace(&TRAILING_DASH.replace(&title, ""));
    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title
    }
}

fn extract_author(raw: &str, name: &str) -> Option<String> {
    if let Some(inner) = first_capture(&AUTHOR_PAREN, raw) {
        let inner = inner.trim();
        return if FOUR_DIGITS.is_match(inner) || inner.is_empty() {
            None
        } else {
            Some(inner.to_string())
        };
    }

    first_capture(&AUTHOR_DASH, name).map(|a| a.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tome_marker() {
        let parsed = parse_filename("One Piece Tome 09.cbz");
        assert_eq!(parsed.title.as_deref(), Some("One Piece"));
        assert_eq!(parsed.volume, Some(9));
        assert_eq!(parsed.format, "cbz");
    }

    #[test]
    fn test_underscore_vol() {
        let parsed = parse_filename("OnePiece_Vol01.cbz");
        assert_eq!(parsed.title.as_deref(), Some("OnePiece"));
        assert_eq!(parsed.volume, Some(1));
    }

    #[test]
    fn test_dotted_name() {
        let parsed = parse_filename("Dragon.Ball.T.04.CBR");
        assert_eq!(parsed.title.as_deref(), Some("Dragon Ball"));
        assert_eq!(parsed.volume, Some(4));
        assert_eq!(parsed.format, "cbr");
    }

    #[test]
    fn test_number_before_author() {
        let parsed = parse_filename("Golden Kamui 01 (Noda).cbz");
        assert_eq!(parsed.title.as_deref(), Some("Golden Kamui"));
        assert_eq!(parsed.volume, Some(1));
        assert_eq!(parsed.author.as_deref(), Some("Noda"));
    }

    #[test]
    fn test_dash_number() {
        let parsed = parse_filename("Naruto - 05.cbz");
        assert_eq!(parsed.title.as_deref(), Some("Naruto"));
        assert_eq!(parsed.volume, Some(5));
    }

    #[test]
    fn test_year_is_not_a_volume() {
        let parsed = parse_filename("Akira - 1988.cbz");
        assert_eq!(parsed.volume, None);
        assert_eq!(parsed.year, Some(1988));
    }

    #[test]
    fn test_no_volume() {
        let parsed = parse_filename("Naruto 2005 Edition.pdf");
        assert_eq!(parsed.volume, None);
        assert_eq!(parsed.title.as_deref(), Some("Naruto 2005 Edition"));
        assert_eq!(parsed.year, Some(2005));
        assert_eq!(parsed.format, "pdf");
    }

    #[test]
    fn test_part_and_volume() {
        let parsed = parse_filename("Jojo Part 3 T12.cbz");
        assert_eq!(parsed.part_number, Some(3));
        assert_eq!(parsed.volume, Some(12));
        assert_eq!(parsed.title.as_deref(), Some("Jojo"));
    }

    #[test]
    fn test_part_with_tome_word() {
        let parsed = parse_filename("Jojo Part 3 Tome 12.cbz");
        assert_eq!(parsed.part_number, Some(3));
        assert_eq!(parsed.volume, Some(12));
    }

    #[test]
    fn test_arc_with_hash_volume() {
        let parsed = parse_filename("Berserk Arc 2 #5.cbz");
        assert_eq!(parsed.part_number, Some(2));
        assert_eq!(parsed.volume, Some(5));
        assert_eq!(parsed.title.as_deref(), Some("Berserk"));
    }

    #[test]
    fn test_part_number_is_not_a_volume() {
        let parsed = parse_filename("Jojo Part 3.cbz");
        assert_eq!(parsed.part_number, Some(3));
        assert_eq!(parsed.volume, None);
    }

    #[test]
    fn test_year_in_parentheses_is_not_author() {
        let parsed = parse_filename("Berserk T01 (1990).cbz");
        assert_eq!(parsed.author, None);
        assert_eq!(parsed.year, Some(1990));
        assert_eq!(parsed.volume, Some(1));
    }

    #[test]
    fn test_resolution() {
        let parsed = parse_filename("Monster Vol 3 1600x2400.cbz");
        assert_eq!(parsed.resolution.as_deref(), Some("1600x2400"));
        assert_eq!(parsed.volume, Some(3));
    }

    #[test]
    fn test_language_tag_stripped_on_word_boundary() {
        let parsed = parse_filename("Golden FR.cbz");
        assert_eq!(parsed.title.as_deref(), Some("Golden"));
    }

    #[test]
    fn test_empty_name_is_untitled() {
        let parsed = parse_filename("___.cbz");
        assert_eq!(parsed.title.as_deref(), Some(UNTITLED));
        assert_eq!(parsed.volume, None);
    }

    #[test]
    fn test_relative_path_uses_basename() {
        let parsed = parse_filename("incoming/batch 2/Bleach Tome 7.cbz");
        assert_eq!(parsed.title.as_deref(), Some("Bleach"));
        assert_eq!(parsed.volume, Some(7));
    }

    #[test]
    fn test_decimal_dot_kept() {
        assert_eq!(normalize_separators("Title.1.5"), "Title 1.5");
        assert_eq!(normalize_separators("A_B..C"), "A B C");
    }
}
