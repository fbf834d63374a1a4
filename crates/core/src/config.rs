//! Extraction options. Defaults come from `bindings::constants`; a JSON file can override
//! any subset (missing keys keep their defaults).
//!
//! ```json
//! {
//!   "skip_action_maps": ["debug", "flycam"],
//!   "action_map_ui_categories": { "mining": "@ui_CCFPS" },
//!   "toggle_markers": ["toggle", "umschalten"],
//!   "include_override": true
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use crate::bindings::constants::{ACTION_MAP_UI_CATEGORIES, SKIP_ACTION_MAPS, TOGGLE_MARKERS};
use crate::fs::FileSystem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// `<actionmap name>` values to ignore entirely.
    pub skip_action_maps: HashSet<String>,
    /// Category fallback per action map when it declares no `UICategory`.
    pub action_map_ui_categories: HashMap<String, String>,
    /// Lowercase substrings that flag an action as a toggle candidate.
    pub toggle_markers: Vec<String>,
    /// Apply the user's on-disk override profile when present.
    pub include_override: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            skip_action_maps: SKIP_ACTION_MAPS.clone(),
            action_map_ui_categories: ACTION_MAP_UI_CATEGORIES.clone(),
            toggle_markers: TOGGLE_MARKERS.clone(),
            include_override: true,
        }
    }
}

impl ExtractOptions {
    pub fn from_json(text: &str) -> Result<Self, String> {
        let mut opts: ExtractOptions =
            serde_json::from_str(text).map_err(|e| format!("parse extract options: {e}"))?;
        opts.toggle_markers = opts
            .toggle_markers
            .into_iter()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        Ok(opts)
    }

    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self, String> {
        let text = fs
            .read_all_text(path)
            .map_err(|e| format!("read {}: {e}", path.display()))?;
        Self::from_json(&text).map_err(|e| format!("{}: {e}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{MemoryFileSystem, RealFileSystem};
    use chrono::Utc;

    #[test]
    fn partial_json_keeps_defaults() {
        let opts = ExtractOptions::from_json(r#"{ "toggle_markers": [" Toggle ", ""] }"#).unwrap();
        assert_eq!(opts.toggle_markers, vec!["toggle".to_string()]);
        assert!(opts.skip_action_maps.contains("debug"));
        assert!(opts.include_override);
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(ExtractOptions::from_json("{ nope").is_err());
    }

    #[test]
    fn load_reads_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut f, br#"{ "include_override": false }"#).unwrap();
        let opts = ExtractOptions::load(&RealFileSystem, f.path()).unwrap();
        assert!(!opts.include_override);
    }

    #[test]
    fn load_goes_through_file_system() {
        let fs = MemoryFileSystem::new();
        fs.insert(
            "/cfg/extract.json",
            "\u{feff}{ \"skip_action_maps\": [\"mining\"] }",
            Utc::now(),
        );
        let opts = ExtractOptions::load(&fs, Path::new("/cfg/extract.json")).unwrap();
        assert_eq!(opts.skip_action_maps, HashSet::from(["mining".to_string()]));

        let err = ExtractOptions::load(&fs, Path::new("/cfg/missing.json")).unwrap_err();
        assert!(err.starts_with("read /cfg/missing.json"));
    }
}
