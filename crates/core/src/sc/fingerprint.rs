//! Metadata-only cache invalidation: size + last-write of the archive and override profile,
//! plus the language and schema version. Content is never hashed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::fs::FileSystem;
use crate::sc::output::{OutputMetadata, SCHEMA_VERSION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionFingerprint {
    pub source_archive_path: String,
    pub source_archive_size: u64,
    pub source_archive_last_write: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_profile_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_profile_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_profile_last_write: Option<DateTime<Utc>>,
    pub language: String,
}

impl ExtractionFingerprint {
    /// `None` when the archive can't be stat'ed. A missing override file is recorded as absent.
    pub fn capture(
        fs: &dyn FileSystem,
        archive: &Path,
        override_profile: Option<&Path>,
        language: &str,
    ) -> Option<Self> {
        let archive_stamp = fs.stamp(archive)?;
        let ov = override_profile.and_then(|p| fs.stamp(p).map(|s| (p, s)));
        Some(ExtractionFingerprint {
            source_archive_path: archive.display().to_string(),
            source_archive_size: archive_stamp.size,
            source_archive_last_write: archive_stamp.last_write,
            override_profile_path: ov.map(|(p, _)| p.display().to_string()),
            override_profile_size: ov.map(|(_, s)| s.size),
            override_profile_last_write: ov.map(|(_, s)| s.last_write),
            language: language.to_string(),
        })
    }
}

/// Should the output at `output` be rebuilt for `current`?
/// Any doubt (missing, unreadable, malformed, older schema) answers yes.
pub fn needs_regeneration(
    fs: &dyn FileSystem,
    output: &Path,
    current: &ExtractionFingerprint,
) -> bool {
    match stored_metadata(fs, output) {
        Some(meta) => meta.schema_version != SCHEMA_VERSION || meta.fingerprint != *current,
        None => true,
    }
}

/// Only the `metadata` object is deserialized; the action list is left alone.
fn stored_metadata(fs: &dyn FileSystem, output: &Path) -> Option<OutputMetadata> {
    if !fs.file_exists(output) {
        return None;
    }
    let text = fs.read_all_text(output).ok()?;
    let mut root: Value = serde_json::from_str(&text).ok()?;
    let meta = root.get_mut("metadata")?.take();
    serde_json::from_value(meta).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use chrono::TimeZone;

    #[test]
    fn capture_records_override_only_when_present() {
        let fs = MemoryFileSystem::new();
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        fs.insert("/sc/Data.p4k", vec![0u8; 10], at);

        let fp = ExtractionFingerprint::capture(
            &fs,
            Path::new("/sc/Data.p4k"),
            Some(Path::new("/sc/actionmaps.xml")),
            "ENGLISH",
        )
        .unwrap();
        assert_eq!(fp.source_archive_size, 10);
        assert_eq!(fp.override_profile_path, None);

        fs.insert("/sc/actionmaps.xml", "<x/>", at);
        let fp = ExtractionFingerprint::capture(
            &fs,
            Path::new("/sc/Data.p4k"),
            Some(Path::new("/sc/actionmaps.xml")),
            "ENGLISH",
        )
        .unwrap();
        assert_eq!(fp.override_profile_size, Some(4));

        assert!(
            ExtractionFingerprint::capture(&fs, Path::new("/nope"), None, "ENGLISH").is_none()
        );
    }

    #[test]
    fn malformed_output_needs_regeneration() {
        let fs = MemoryFileSystem::new();
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        fs.insert("/sc/Data.p4k", vec![0u8; 10], at);
        let fp = ExtractionFingerprint::capture(&fs, Path::new("/sc/Data.p4k"), None, "ENGLISH")
            .unwrap();

        let out = Path::new("/out.json");
        assert!(needs_regeneration(&fs, out, &fp));
        fs.insert(out, "{ not json", at);
        assert!(needs_regeneration(&fs, out, &fp));
        fs.insert(out, r#"{"actions": []}"#, at);
        assert!(needs_regeneration(&fs, out, &fp));
    }
}
