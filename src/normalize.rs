//! Pure functions for canonicalizing S3 keys and scoring their quality.
//!
//! Both `normalize` and `quality_score` operate on the basename only —
//! the retention selector and rename planner never need the full key's
//! directory prefix for comparison.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

struct CopySuffixPatterns {
    patterns: Vec<Regex>,
}

fn copy_suffix_patterns() -> &'static CopySuffixPatterns {
    static PATTERNS: OnceLock<CopySuffixPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| CopySuffixPatterns {
        patterns: vec![
            Regex::new(r"\s*\(\d+\)$").unwrap(),
            RegexBuilder::new(r"\s*-\s*Copie$").case_insensitive(true).build().unwrap(),
            RegexBuilder::new(r"\s*-\s*Copy$").case_insensitive(true).build().unwrap(),
            RegexBuilder::new(r"[_ ]copy$").case_insensitive(true).build().unwrap(),
            Regex::new(r"_\d+$").unwrap(),
        ],
    })
}

// The second alternative's character class carries a literal space —
// kept verbatim rather than "fixed", per the decided reading that it's
// a deliberate (if odd) member of the byte-residue class, not a typo.
fn mojibake_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Ã[\x80-\xbf]|Ã[©¨ ´¹²³¼½¾]|Â[\xa0-\xbf]|Ã\x83Â").unwrap()
    })
}

/// Splits a basename into (stem, extension) at the last `.`, the
/// extension including its leading dot. No extension yields `""`.
fn split_ext(basename: &str) -> (&str, &str) {
    match basename.rfind('.') {
        Some(0) | None => (basename, ""),
        Some(idx) => basename.split_at(idx),
    }
}

fn basename(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) => &key[idx + 1..],
        None => key,
    }
}

fn strip_accents(stem: &str) -> String {
    stem.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

fn strip_copy_suffixes(stem: &str) -> String {
    let mut current = stem.to_string();
    for pattern in &copy_suffix_patterns().patterns {
        current = pattern.replace(&current, "").into_owned();
    }
    current
}

fn has_copy_suffix(stem: &str) -> bool {
    copy_suffix_patterns().patterns.iter().any(|p| p.is_match(stem))
}

fn collapse_whitespace(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    let mut last_was_space = false;
    for c in stem.trim().chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

/// Canonical, comparable form of a key's basename: lowercased,
/// accent-stripped, copy-suffix-free, whitespace-collapsed.
pub fn normalize(key: &str) -> String {
    let (stem, ext) = split_ext(basename(key));
    let stem = stem.to_lowercase();
    let ext = ext.to_lowercase();
    let stem = strip_accents(&stem);
    let stem = strip_copy_suffixes(&stem);
    let stem = collapse_whitespace(&stem);
    stem + &ext
}

/// Non-negative badness score for a key's basename (0 = pristine).
pub fn quality_score(key: &str) -> u32 {
    let (stem, _ext) = split_ext(basename(key));
    let mut score = 0;

    if mojibake_pattern().is_match(stem) {
        score += 10;
    }
    if has_copy_suffix(stem) {
        score += 5;
    }
    if stem != stem.trim() {
        score += 2;
    }
    if stem.contains("  ") {
        score += 1;
    }

    score
}
