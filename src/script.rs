//! Bash script emitters for deletions and renames.
//!
//! Both scripts share a header shape: shebang, `set -euo pipefail`, a
//! `DRY_RUN` toggle keyed on the first positional argument, and an
//! `ENDPOINT` variable populated only when the bucket has a stored
//! endpoint override.

use chrono::Utc;
use humansize::{format_size, BINARY};

use crate::rename::CleanRule;
use crate::retention::{select_keeper, Criterion};
use crate::types::{DuplicateGroup, IndexStats, PlannedRename};

fn escape_single_quotes(value: &str) -> String {
    value.replace('\'', "'\\''")
}

fn header(
    title: &str,
    bucket: &str,
    op_count: usize,
    op_label: &str,
    endpoint_url: Option<&str>,
    output_path: &str,
    extra: &[String],
) -> Vec<String> {
    let mut lines = vec![
        "#!/usr/bin/env bash".to_string(),
        format!("# {title}"),
        format!("# Bucket: {bucket}"),
        format!("# Generated: {}", Utc::now().format("%Y-%m-%d %H:%M")),
        format!("# {op_label}: {op_count}"),
        "#".to_string(),
        "# Review this script before running it!".to_string(),
    ];
    lines.extend(extra.iter().cloned());
    lines.push("#".to_string());
    lines.push(format!("# Dry run: bash {output_path} --dryrun"));
    lines.push("set -euo pipefail".to_string());
    lines.push(String::new());
    lines.push("DRY_RUN=\"\"".to_string());
    lines.push("if [[ \"${1:-}\" == \"--dryrun\" ]]; then".to_string());
    lines.push("  DRY_RUN=\"--dryrun\"".to_string());
    lines.push("  echo \"Dry run: no changes will be made.\"".to_string());
    lines.push("fi".to_string());
    match endpoint_url {
        Some(endpoint) => lines.push(format!("ENDPOINT=\"--endpoint-url {endpoint}\"")),
        None => lines.push("ENDPOINT=\"\"".to_string()),
    }
    lines.push(String::new());
    lines
}

/// Emits a deletion script: one `aws s3 rm` line per non-kept member of
/// each duplicate group, selected by `keep_criteria`.
pub fn generate_delete_script(
    bucket: &str,
    groups: &[DuplicateGroup],
    keep_criteria: &[Criterion],
    keep_label: &str,
    stats: IndexStats,
    endpoint_url: Option<&str>,
    output_path: &str,
) -> String {
    let extra = vec![
        format!("# Retention policy: --keep {keep_label}"),
        format!("# Duplicate groups: {}", stats.duplicate_groups),
        format!("# Objects to delete: {}", stats.duplicate_objects),
        format!("# Reclaimable space: {}", format_size(stats.wasted_bytes, BINARY)),
        "# Deletions are IRREVERSIBLE.".to_string(),
    ];
    let mut lines = header(
        "S3 duplicate deletion script",
        bucket,
        groups.len(),
        "Duplicate groups",
        endpoint_url,
        output_path,
        &extra,
    );

    if groups.is_empty() {
        lines.push("echo 'No duplicates detected.'".to_string());
        return lines.join("\n") + "\n";
    }

    for (i, group) in groups.iter().enumerate() {
        let (keeper, to_delete) = select_keeper(keep_criteria, &group.objects);

        lines.push(format!(
            "# --- Group {} ({} copies, {} reclaimable)",
            i + 1,
            group.objects.len(),
            format_size(group.wasted_bytes(), BINARY)
        ));
        lines.push(format!("# Fingerprint: {}", group.fingerprint));
        lines.push(format!("# Kept: {}", keeper.key));

        for obj in to_delete {
            let key_escaped = escape_single_quotes(&obj.key);
            lines.push(format!("aws s3 rm ${{DRY_RUN:-}} $ENDPOINT 's3://{bucket}/{key_escaped}'"));
        }
        lines.push(String::new());
    }

    lines.push(format!(
        "echo 'Done: {} objects deleted, {} reclaimed.'",
        stats.duplicate_objects,
        format_size(stats.wasted_bytes, BINARY)
    ));

    lines.join("\n") + "\n"
}

/// Emits a rename script: one `aws s3 mv` line per planned rename,
/// prepending a comment when conflict resolution changed the target.
pub fn generate_rename_script(
    bucket: &str,
    rules: &[CleanRule],
    plan: &[PlannedRename],
    endpoint_url: Option<&str>,
    output_path: &str,
) -> String {
    let rule_names: Vec<&str> = rules
        .iter()
        .map(|r| match r {
            CleanRule::StripSpaces => "strip-spaces",
        })
        .collect();
    let extra = vec![format!("# Rules: {}", rule_names.join(", "))];

    let mut lines = header(
        "S3 key cleanup script",
        bucket,
        plan.len(),
        "Renames",
        endpoint_url,
        output_path,
        &extra,
    );

    if plan.is_empty() {
        lines.push("echo 'No renames necessary.'".to_string());
        return lines.join("\n") + "\n";
    }

    let mut sorted_plan: Vec<&PlannedRename> = plan.iter().collect();
    sorted_plan.sort_by(|a, b| a.source.cmp(&b.source));

    for rename in sorted_plan {
        if let Some(original_target) = &rename.conflict_with {
            lines.push(format!(
                "# Conflict resolved: '{original_target}' already exists -> renamed to '{}'",
                rename.target
            ));
        }
        let src_escaped = escape_single_quotes(&rename.source);
        let tgt_escaped = escape_single_quotes(&rename.target);
        lines.push(format!(
            "aws s3 mv --copy-props metadata-directive ${{DRY_RUN:-}} $ENDPOINT 's3://{bucket}/{src_escaped}' 's3://{bucket}/{tgt_escaped}'"
        ));
    }

    lines.push(String::new());
    lines.push("if [[ -n \"$DRY_RUN\" ]]; then".to_string());
    lines.push(format!("  echo 'Dry run complete: {} objects to rename.'", plan.len()));
    lines.push("else".to_string());
    lines.push(format!("  echo 'Done: {} objects renamed.'", plan.len()));
    lines.push("fi".to_string());

    lines.join("\n") + "\n"
}
