//! Optional media-tag extraction — an external collaborator invoked on a
//! prefix of an object's bytes, not part of the duplicate-detection pipeline.

use std::io::Write;

use async_trait::async_trait;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::Accessor;

use crate::transport::ObjectStoreClient;
use crate::types::MediaMetadata;

/// First RANGE_BYTES of an object's body are enough for tag parsers to
/// find header atoms/frames without downloading the whole file.
pub const RANGE_BYTES: u64 = 256 * 1024;

const AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".flac", ".ogg", ".m4a", ".aac", ".wma", ".opus", ".wav"];
const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mkv", ".avi", ".mov", ".wmv", ".webm"];

pub fn is_media_file(key: &str) -> bool {
    let ext = extension(key);
    AUDIO_EXTENSIONS.contains(&ext.as_str()) || VIDEO_EXTENSIONS.contains(&ext.as_str())
}

fn extension(key: &str) -> String {
    match key.rfind('.') {
        Some(idx) => key[idx..].to_lowercase(),
        None => String::new(),
    }
}

/// Reads tags from a byte prefix of a media object. Implementations
/// never fail the caller — a decode failure is swallowed into a
/// null-field `MediaMetadata`.
pub trait TagReader: Send + Sync {
    fn read_tags(&self, key: &str, extension: &str, prefix_bytes: &[u8]) -> MediaMetadata;
}

/// Parses tags via `lofty`, writing the prefix to a named temp file
/// (lofty needs a seekable reader; a suffixed temp file mirrors the
/// original tool's own range-GET-to-tempfile approach).
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read_tags(&self, key: &str, extension: &str, prefix_bytes: &[u8]) -> MediaMetadata {
        let suffix = if extension.is_empty() { ".bin" } else { extension };
        let parsed = tempfile::Builder::new().suffix(suffix).tempfile().and_then(|mut tmp| {
            tmp.write_all(prefix_bytes)?;
            tmp.flush()?;
            Ok(tmp)
        });

        let tmp = match parsed {
            Ok(tmp) => tmp,
            Err(e) => {
                tracing::debug!(key, error = %e, "failed to stage media prefix for tag reading");
                return MediaMetadata { key: key.to_string(), ..Default::default() };
            }
        };

        let tagged = match lofty::read_from_path(tmp.path()) {
            Ok(tagged) => tagged,
            Err(e) => {
                tracing::debug!(key, error = %e, "unreadable media tags");
                return MediaMetadata { key: key.to_string(), ..Default::default() };
            }
        };

        let tag = tagged.primary_tag().or_else(|| tagged.first_tag());
        let properties = tagged.properties();

        MediaMetadata {
            key: key.to_string(),
            artist: tag.and_then(|t| t.artist()).map(|s| s.to_string()),
            album: tag.and_then(|t| t.album()).map(|s| s.to_string()),
            title: tag.and_then(|t| t.title()).map(|s| s.to_string()),
            duration_s: Some(properties.duration().as_secs_f64()),
            codec: Some(format!("{:?}", tagged.file_type()).to_lowercase()),
            bitrate: properties.audio_bitrate(),
        }
    }
}

/// Fetches the tag-reading prefix for `key` and extracts its metadata;
/// never returns an error — unreadable or truncated input yields a
/// null-field `MediaMetadata` (a `CoreError::Decoding` condition that is
/// swallowed here rather than propagated).
pub async fn extract_metadata(
    client: &dyn ObjectStoreClient,
    reader: &dyn TagReader,
    bucket: &str,
    key: &str,
) -> MediaMetadata {
    let ext = extension(key);
    let range_end = RANGE_BYTES.saturating_sub(1);
    let data = match client.get_object_range(bucket, key, 0, range_end).await {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!(key, error = %e, "range GET failed for media extraction");
            return MediaMetadata { key: key.to_string(), ..Default::default() };
        }
    };
    reader.read_tags(key, &ext, &data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_audio_and_video_extensions() {
        assert!(is_media_file("song.MP3"));
        assert!(is_media_file("movie.mkv"));
        assert!(!is_media_file("document.pdf"));
        assert!(!is_media_file("no_extension"));
    }
}
