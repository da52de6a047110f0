//! Report rendering: JSON, CSV, terminal table.

use std::collections::HashMap;
use std::io::Write;

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use humansize::{format_size, BINARY};
use serde::Serialize;

use crate::error::Result;
use crate::normalize::normalize;
use crate::store::IndexStore;
use crate::types::{DuplicateGroup, IndexStats, MediaMetadata, ObjectRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "table" => Ok(ReportFormat::Table),
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            other => Err(format!("unknown report format '{other}', expected one of: table, json, csv")),
        }
    }
}

#[derive(Serialize)]
struct JsonObjectRef {
    key: String,
    last_modified: String,
}

#[derive(Serialize)]
struct JsonGroup {
    fingerprint: String,
    size: u64,
    wasted_bytes: u64,
    objects: Vec<JsonObjectRef>,
}

#[derive(Serialize)]
struct JsonSuspectFile {
    key: String,
    size: u64,
    etag: String,
}

#[derive(Serialize)]
struct JsonSuspectGroup {
    normalized: String,
    files: Vec<JsonSuspectFile>,
}

#[derive(Serialize)]
struct JsonSameWorkFile {
    key: String,
    codec: Option<String>,
    bitrate: Option<u32>,
    size: u64,
}

#[derive(Serialize)]
struct JsonSameWorkGroup {
    artist: String,
    title: String,
    files: Vec<JsonSameWorkFile>,
}

#[derive(Serialize)]
struct JsonReport {
    stats: IndexStats,
    groups: Vec<JsonGroup>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    suspect_names: Vec<JsonSuspectGroup>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    same_work: Vec<JsonSameWorkGroup>,
}

/// A group of keys sharing a normalized basename but disagreeing on
/// content (≥2 distinct ETags) — likely re-encodes or stale copies.
pub struct SuspectNameGroup {
    pub normalized: String,
    pub files: Vec<ObjectRecord>,
}

/// Records joined to media metadata that share (artist, title) —
/// candidate re-rips or alternate encodings of the same work.
pub struct SameWorkGroup {
    pub artist: String,
    pub title: String,
    pub files: Vec<(ObjectRecord, MediaMetadata)>,
}

pub fn detect_suspect_names(objects: &[ObjectRecord]) -> Vec<SuspectNameGroup> {
    let mut by_normalized: HashMap<String, Vec<&ObjectRecord>> = HashMap::new();
    for obj in objects {
        by_normalized.entry(normalize(&obj.key)).or_default().push(obj);
    }

    let mut groups: Vec<SuspectNameGroup> = by_normalized
        .into_iter()
        .filter_map(|(normalized, files)| {
            let distinct_etags: std::collections::HashSet<&str> =
                files.iter().map(|o| o.etag.as_str()).collect();
            if distinct_etags.len() >= 2 {
                Some(SuspectNameGroup {
                    normalized,
                    files: files.into_iter().cloned().collect(),
                })
            } else {
                None
            }
        })
        .collect();

    groups.sort_by(|a, b| a.normalized.cmp(&b.normalized));
    groups
}

pub fn detect_same_work(objects: &[ObjectRecord], media: &[MediaMetadata]) -> Vec<SameWorkGroup> {
    let media_by_key: HashMap<&str, &MediaMetadata> =
        media.iter().map(|m| (m.key.as_str(), m)).collect();

    let mut by_work: HashMap<(String, String), Vec<(ObjectRecord, MediaMetadata)>> = HashMap::new();
    for obj in objects {
        let Some(meta) = media_by_key.get(obj.key.as_str()) else { continue };
        let (Some(artist), Some(title)) = (&meta.artist, &meta.title) else { continue };
        by_work
            .entry((artist.clone(), title.clone()))
            .or_default()
            .push((obj.clone(), (*meta).clone()));
    }

    let mut groups: Vec<SameWorkGroup> = by_work
        .into_iter()
        .filter(|(_, files)| files.len() >= 2)
        .map(|((artist, title), mut files)| {
            files.sort_by(|a, b| b.0.size.cmp(&a.0.size));
            SameWorkGroup { artist, title, files }
        })
        .collect();

    groups.sort_by(|a, b| (a.artist.clone(), a.title.clone()).cmp(&(b.artist.clone(), b.title.clone())));
    groups
}

pub fn render(store: &IndexStore, format: ReportFormat) -> Result<String> {
    let groups = store.get_all_duplicates()?;
    let stats = store.get_stats()?;
    let objects = store.all_objects()?;
    let media = store.all_media_metadata()?;

    let suspect_names = detect_suspect_names(&objects);
    let same_work = detect_same_work(&objects, &media);

    Ok(match format {
        ReportFormat::Json => render_json(&groups, stats, &suspect_names, &same_work)?,
        ReportFormat::Csv => render_csv(&groups, &suspect_names, &same_work)?,
        ReportFormat::Table => render_table(&groups, stats),
    })
}

fn render_json(
    groups: &[DuplicateGroup],
    stats: IndexStats,
    suspect_names: &[SuspectNameGroup],
    same_work: &[SameWorkGroup],
) -> Result<String> {
    let report = JsonReport {
        stats,
        groups: groups
            .iter()
            .map(|g| JsonGroup {
                fingerprint: g.fingerprint.clone(),
                size: g.size,
                wasted_bytes: g.wasted_bytes(),
                objects: g
                    .objects
                    .iter()
                    .map(|o| JsonObjectRef {
                        key: o.key.clone(),
                        last_modified: o.last_modified.to_rfc3339(),
                    })
                    .collect(),
            })
            .collect(),
        suspect_names: suspect_names
            .iter()
            .map(|g| JsonSuspectGroup {
                normalized: g.normalized.clone(),
                files: g
                    .files
                    .iter()
                    .map(|o| JsonSuspectFile { key: o.key.clone(), size: o.size, etag: o.etag.clone() })
                    .collect(),
            })
            .collect(),
        same_work: same_work
            .iter()
            .map(|g| JsonSameWorkGroup {
                artist: g.artist.clone(),
                title: g.title.clone(),
                files: g
                    .files
                    .iter()
                    .map(|(o, m)| JsonSameWorkFile {
                        key: o.key.clone(),
                        codec: m.codec.clone(),
                        bitrate: m.bitrate,
                        size: o.size,
                    })
                    .collect(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn render_csv(
    groups: &[DuplicateGroup],
    suspect_names: &[SuspectNameGroup],
    same_work: &[SameWorkGroup],
) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "section",
        "group_key",
        "object_key",
        "size",
        "etag",
        "last_modified",
        "wasted_bytes",
        "artist",
        "title",
        "codec",
        "bitrate",
    ])?;

    for group in groups {
        let size = group.size.to_string();
        let wasted = group.wasted_bytes().to_string();
        for obj in &group.objects {
            let last_modified = obj.last_modified.to_rfc3339();
            writer.write_record([
                "duplicate",
                group.fingerprint.as_str(),
                obj.key.as_str(),
                size.as_str(),
                "",
                last_modified.as_str(),
                wasted.as_str(),
                "",
                "",
                "",
                "",
            ])?;
        }
    }

    for group in suspect_names {
        for obj in &group.files {
            let size = obj.size.to_string();
            writer.write_record([
                "suspect_name",
                group.normalized.as_str(),
                obj.key.as_str(),
                size.as_str(),
                obj.etag.as_str(),
                "",
                "",
                "",
                "",
                "",
                "",
            ])?;
        }
    }

    for group in same_work {
        for (obj, meta) in &group.files {
            let size = obj.size.to_string();
            let bitrate = meta.bitrate.map(|b| b.to_string()).unwrap_or_default();
            writer.write_record([
                "same_work",
                "",
                obj.key.as_str(),
                size.as_str(),
                "",
                "",
                "",
                group.artist.as_str(),
                group.title.as_str(),
                meta.codec.as_deref().unwrap_or(""),
                bitrate.as_str(),
            ])?;
        }
    }

    let bytes = writer.into_inner().map_err(|e| crate::error::CoreError::Index(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn render_table(groups: &[DuplicateGroup], stats: IndexStats) -> String {
    let mut out = Vec::new();

    let _ = writeln!(out, "Objects scanned:        {}", stats.total_objects);
    let _ = writeln!(out, "Total size:              {}", format_size(stats.total_size, BINARY));
    let _ = writeln!(out, "Duplicate groups:        {}", stats.duplicate_groups);
    let _ = writeln!(out, "Duplicate objects:       {}", stats.duplicate_objects);
    let _ = writeln!(out, "Reclaimable space:       {}", format_size(stats.wasted_bytes, BINARY));
    let _ = writeln!(out);

    if groups.is_empty() {
        let _ = writeln!(out, "No duplicates detected.");
        return String::from_utf8_lossy(&out).into_owned();
    }

    let mut sorted_groups: Vec<&DuplicateGroup> = groups.iter().collect();
    sorted_groups.sort_by(|a, b| b.wasted_bytes().cmp(&a.wasted_bytes()));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Copies", "File size", "Wasted space", "Files"]);

    for (i, group) in sorted_groups.iter().enumerate() {
        let files = group.objects.iter().map(|o| o.key.as_str()).collect::<Vec<_>>().join("\n");
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(group.objects.len()),
            Cell::new(format_size(group.size, BINARY)),
            Cell::new(format_size(group.wasted_bytes(), BINARY)),
            Cell::new(files),
        ]);
    }

    let _ = writeln!(out, "{table}");
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn obj(key: &str, size: u64, etag: &str) -> ObjectRecord {
        ObjectRecord {
            key: key.to_string(),
            size,
            etag: etag.to_string(),
            is_multipart: false,
            sha256: None,
            last_modified: Utc::now(),
            scanned_at: Utc::now(),
        }
    }

    #[test]
    fn suspect_names_require_distinct_etags() {
        let objects = vec![
            obj("Song (1).mp3", 10, "etag-a"),
            obj("song.mp3", 10, "etag-b"),
        ];
        let groups = detect_suspect_names(&objects);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].files.len(), 2);
    }

    #[test]
    fn suspect_names_ignore_identical_content() {
        let objects = vec![
            obj("Song (1).mp3", 10, "etag-a"),
            obj("song.mp3", 10, "etag-a"),
        ];
        assert!(detect_suspect_names(&objects).is_empty());
    }

    #[test]
    fn csv_emits_section_discriminator_for_every_group_kind() {
        let groups = vec![DuplicateGroup {
            fingerprint: "fp1".to_string(),
            size: 10,
            objects: vec![obj("a.mp3", 10, "etag-a"), obj("b.mp3", 10, "etag-a")],
        }];
        let suspect_names = vec![SuspectNameGroup {
            normalized: "song".to_string(),
            files: vec![obj("Song (1).mp3", 10, "etag-a"), obj("song.mp3", 10, "etag-b")],
        }];
        let same_work = vec![SameWorkGroup {
            artist: "Artist".to_string(),
            title: "Title".to_string(),
            files: vec![
                (
                    obj("a.flac", 200, "e1"),
                    MediaMetadata { key: "a.flac".to_string(), codec: Some("flac".to_string()), bitrate: None, ..Default::default() },
                ),
                (
                    obj("a.mp3", 100, "e2"),
                    MediaMetadata { key: "a.mp3".to_string(), codec: Some("mp3".to_string()), bitrate: Some(320), ..Default::default() },
                ),
            ],
        }];

        let csv = render_csv(&groups, &suspect_names, &same_work).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "section,group_key,object_key,size,etag,last_modified,wasted_bytes,artist,title,codec,bitrate"
        );
        let rows: Vec<&str> = lines.collect();
        assert_eq!(rows.len(), 6, "2 duplicate + 2 suspect_name + 2 same_work rows");
        assert!(rows.iter().any(|r| r.starts_with("duplicate,fp1,a.mp3")));
        assert!(rows.iter().any(|r| r.starts_with("suspect_name,song,Song (1).mp3")));
        assert!(rows.iter().any(|r| r.contains("same_work,,a.flac,200,,,,Artist,Title,flac,")));
    }

    #[test]
    fn same_work_requires_artist_and_title() {
        let objects = vec![obj("a.mp3", 100, "e1"), obj("b.flac", 200, "e2")];
        let media = vec![
            MediaMetadata {
                key: "a.mp3".to_string(),
                artist: Some("Artist".to_string()),
                title: Some("Title".to_string()),
                ..Default::default()
            },
            MediaMetadata {
                key: "b.flac".to_string(),
                artist: Some("Artist".to_string()),
                title: Some("Title".to_string()),
                ..Default::default()
            },
        ];
        let groups = detect_same_work(&objects, &media);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].files[0].0.key, "b.flac", "larger file sorts first");
    }
}
