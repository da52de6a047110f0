//! Pure keeper selection among a duplicate group.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::normalize::quality_score;
use crate::types::ObjectRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    Cleanest,
    Shortest,
    Oldest,
    Newest,
}

impl FromStr for Criterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cleanest" => Ok(Criterion::Cleanest),
            "shortest" => Ok(Criterion::Shortest),
            "oldest" => Ok(Criterion::Oldest),
            "newest" => Ok(Criterion::Newest),
            other => Err(format!(
                "unknown retention criterion '{other}', expected one of: cleanest, shortest, oldest, newest"
            )),
        }
    }
}

fn basename_len(key: &str) -> usize {
    match key.rfind('/') {
        Some(idx) => key[idx + 1..].chars().count(),
        None => key.chars().count(),
    }
}

/// Per-criterion sort key for one record; smaller always wins.
fn sort_key(criterion: Criterion, record: &ObjectRecord) -> i64 {
    match criterion {
        Criterion::Cleanest => quality_score(&record.key) as i64,
        Criterion::Shortest => basename_len(&record.key) as i64,
        Criterion::Oldest => record.last_modified.timestamp(),
        Criterion::Newest => -record.last_modified.timestamp(),
    }
}

/// Orders `a` before `b` under the composite criteria list, falling
/// back to ascending key string for determinism.
fn compare(criteria: &[Criterion], a: &ObjectRecord, b: &ObjectRecord) -> Ordering {
    for &criterion in criteria {
        let ordering = sort_key(criterion, a).cmp(&sort_key(criterion, b));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.key.cmp(&b.key)
}

/// Selects exactly one keeper from a non-empty duplicate group; the
/// rest are deletion candidates, in the same relative order as input.
pub fn select_keeper<'a>(
    criteria: &[Criterion],
    objects: &'a [ObjectRecord],
) -> (&'a ObjectRecord, Vec<&'a ObjectRecord>) {
    assert!(!objects.is_empty(), "retention selection requires a non-empty group");
    assert!(!criteria.is_empty(), "retention selection requires at least one criterion");

    let keeper = objects
        .iter()
        .min_by(|a, b| compare(criteria, a, b))
        .expect("non-empty group has a minimum");

    let deletions = objects.iter().filter(|o| o.key != keeper.key).collect();
    (keeper, deletions)
}

pub fn parse_criteria(raw: &str) -> Result<Vec<Criterion>, String> {
    let criteria: Vec<Criterion> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Criterion::from_str)
        .collect::<Result<_, _>>()?;

    if criteria.is_empty() {
        return Err("--keep requires at least one retention criterion (cleanest, shortest, oldest, newest)".to_string());
    }

    Ok(criteria)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(key: &str, days_ago: i64) -> ObjectRecord {
        ObjectRecord {
            key: key.to_string(),
            size: 10,
            etag: "e".to_string(),
            is_multipart: false,
            sha256: None,
            last_modified: Utc.timestamp_opt(1_700_000_000 - days_ago * 86_400, 0).unwrap(),
            scanned_at: Utc::now(),
        }
    }

    #[test]
    fn selection_is_total_and_deterministic() {
        let objects = vec![record("b.txt", 1), record("a.txt", 1)];
        let (keeper, deletions) = select_keeper(&[Criterion::Oldest], &objects);
        assert_eq!(deletions.len(), 1);
        // same last_modified, tie broken by key ascending
        assert_eq!(keeper.key, "a.txt");
    }

    #[test]
    fn oldest_prefers_earlier_timestamp() {
        let objects = vec![record("new.txt", 0), record("old.txt", 10)];
        let (keeper, _) = select_keeper(&[Criterion::Oldest], &objects);
        assert_eq!(keeper.key, "old.txt");
    }

    #[test]
    fn newest_prefers_later_timestamp() {
        let objects = vec![record("new.txt", 0), record("old.txt", 10)];
        let (keeper, _) = select_keeper(&[Criterion::Newest], &objects);
        assert_eq!(keeper.key, "new.txt");
    }

    #[test]
    fn parses_comma_separated_criteria_list() {
        let criteria = parse_criteria("cleanest, shortest").unwrap();
        assert_eq!(criteria, vec![Criterion::Cleanest, Criterion::Shortest]);
    }

    #[test]
    fn rejects_unknown_criterion() {
        assert!(parse_criteria("largest").is_err());
    }

    #[test]
    fn rejects_empty_criteria_list() {
        assert!(parse_criteria("").is_err());
        assert!(parse_criteria(",  ,").is_err());
    }
}
