//! Rewrite rules and conflict-aware rename planning.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use crate::types::PlannedRename;

/// A key-rewrite rule. Today there is exactly one variant; this stays a
/// tagged enum rather than a dynamic registry so new rules are parsed
/// once at the CLI edge and consumed here as already-validated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanRule {
    StripSpaces,
}

impl FromStr for CleanRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strip-spaces" => Ok(CleanRule::StripSpaces),
            other => Err(format!("unknown clean rule '{other}', expected one of: strip-spaces")),
        }
    }
}

impl CleanRule {
    /// Returns the cleaned key, or `None` if this rule makes no change.
    fn apply(&self, key: &str) -> Option<String> {
        match self {
            CleanRule::StripSpaces => {
                let cleaned: Vec<&str> = key
                    .split('/')
                    .map(str::trim)
                    .filter(|segment| !segment.is_empty())
                    .collect();
                let result = cleaned.join("/");
                if result != key {
                    Some(result)
                } else {
                    None
                }
            }
        }
    }
}

/// Applies `rules` left-to-right to every key in `existing_keys`,
/// threading each rule's output into the next, then resolves target
/// conflicts deterministically.
///
/// The plan is total — every key whose rules produced a change appears
/// exactly once with a unique target — and idempotent: re-planning over
/// the resulting keys (with the same rules) yields no further renames.
pub fn plan_renames(rules: &[CleanRule], existing_keys: &[String]) -> Vec<PlannedRename> {
    let mut renames: HashMap<String, String> = HashMap::new();

    for key in existing_keys {
        let mut cleaned = key.clone();
        for rule in rules {
            if let Some(next) = rule.apply(&cleaned) {
                cleaned = next;
            }
        }
        if cleaned != *key {
            renames.insert(key.clone(), cleaned);
        }
    }

    if renames.is_empty() {
        return Vec::new();
    }

    resolve_conflicts(&renames, existing_keys)
}

fn resolve_conflicts(renames: &HashMap<String, String>, existing_keys: &[String]) -> Vec<PlannedRename> {
    let rename_domain: HashSet<&String> = renames.keys().collect();
    let mut taken: HashSet<String> = existing_keys
        .iter()
        .filter(|k| !rename_domain.contains(k))
        .cloned()
        .collect();

    let mut by_target: HashMap<&String, Vec<&String>> = HashMap::new();
    for (source, target) in renames {
        by_target.entry(target).or_default().push(source);
    }
    for sources in by_target.values_mut() {
        sources.sort();
    }

    let mut targets_in_order: Vec<&String> = by_target.keys().copied().collect();
    targets_in_order.sort();

    let mut plan = Vec::with_capacity(renames.len());
    for target in targets_in_order {
        let sources = &by_target[target];
        for (i, source) in sources.iter().enumerate() {
            let candidate = if i == 0 && !taken.contains(target.as_str()) {
                target.clone()
            } else {
                suffixed(target, &taken)
            };
            taken.insert(candidate.clone());

            let conflict_with = if candidate != **target { Some((*target).clone()) } else { None };
            plan.push(PlannedRename {
                source: (*source).clone(),
                target: candidate,
                conflict_with,
            });
        }
    }

    plan
}

fn suffixed(target: &str, taken: &HashSet<String>) -> String {
    let (root, ext) = match target.rfind('.') {
        Some(0) | None => (target, ""),
        Some(idx) => target.split_at(idx),
    };
    let mut n = 2u32;
    loop {
        let candidate = format!("{root}_{n}{ext}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
