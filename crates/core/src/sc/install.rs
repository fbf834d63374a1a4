use core::fmt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::fs::FileSystem;

/// Languages the game ships a `global.ini` for. Tokens are the upper-cased `g_language` values.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, Default)]
pub enum GameLanguage {
    #[default]
    English,
    ChineseSimplified,
    ChineseTraditional,
    French,
    German,
    Italian,
    Japanese,
    Korean,
    Polish,
    PortugueseBrazil,
    SpanishLatinAmerica,
    SpanishSpain,
}

pub const DEFAULT_LANGUAGE: GameLanguage = GameLanguage::English;

impl GameLanguage {
    pub const ALL: [GameLanguage; 12] = [
        GameLanguage::English,
        GameLanguage::ChineseSimplified,
        GameLanguage::ChineseTraditional,
        GameLanguage::French,
        GameLanguage::German,
        GameLanguage::Italian,
        GameLanguage::Japanese,
        GameLanguage::Korean,
        GameLanguage::Polish,
        GameLanguage::PortugueseBrazil,
        GameLanguage::SpanishLatinAmerica,
        GameLanguage::SpanishSpain,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            GameLanguage::English => "ENGLISH",
            GameLanguage::ChineseSimplified => "CHINESE_(SIMPLIFIED)",
            GameLanguage::ChineseTraditional => "CHINESE_(TRADITIONAL)",
            GameLanguage::French => "FRENCH_(FRANCE)",
            GameLanguage::German => "GERMAN_(GERMANY)",
            GameLanguage::Italian => "ITALIAN_(ITALY)",
            GameLanguage::Japanese => "JAPANESE_(JAPAN)",
            GameLanguage::Korean => "KOREAN_(SOUTH_KOREA)",
            GameLanguage::Polish => "POLISH_(POLAND)",
            GameLanguage::PortugueseBrazil => "PORTUGUESE_(BRAZIL)",
            GameLanguage::SpanishLatinAmerica => "SPANISH_(LATIN_AMERICA)",
            GameLanguage::SpanishSpain => "SPANISH_(SPAIN)",
        }
    }

    /// Folder under `Data/Localization`.
    pub fn folder(&self) -> String {
        self.token().to_ascii_lowercase()
    }

    pub fn iter() -> impl Iterator<Item = GameLanguage> {
        Self::ALL.into_iter()
    }
}

impl fmt::Display for GameLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for GameLanguage {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_matches('"').to_ascii_uppercase();
        GameLanguage::iter()
            .find(|l| l.token() == wanted)
            .ok_or_else(|| format!("unsupported language '{}'", s.trim()))
    }
}

/// Well-known paths inside an install root (e.g. `.../StarCitizen/LIVE`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    pub root: PathBuf,
}

impl InstallLayout {
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn archive_path(&self) -> PathBuf {
        self.root.join("Data.p4k")
    }

    pub fn user_cfg_path(&self) -> PathBuf {
        self.root.join("user.cfg")
    }

    /// `<root>/user/client/0/Profiles/default/actionmaps.xml`, whether or not it exists.
    pub fn override_profile_path(&self) -> PathBuf {
        self.root
            .join("user")
            .join("client")
            .join("0")
            .join("Profiles")
            .join("default")
            .join("actionmaps.xml")
    }
}

static G_LANGUAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*g_language\s*=\s*(.+?)\s*$").expect("static regex"));

/// Read `<install>/user.cfg` for `g_language=<value>` and return the supported token,
/// or the default language token when the file, the line or the value isn't usable.
pub fn detect_language(fs: &dyn FileSystem, install_dir: &Path) -> String {
    let cfg = InstallLayout::from_root(install_dir).user_cfg_path();
    let Ok(lines) = fs.read_all_lines(&cfg) else {
        return DEFAULT_LANGUAGE.token().to_string();
    };
    language_from_cfg_lines(lines.iter().map(String::as_str))
        .unwrap_or(DEFAULT_LANGUAGE)
        .token()
        .to_string()
}

/// Last `g_language` assignment wins; comment lines are ignored.
pub fn language_from_cfg_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Option<GameLanguage> {
    let mut found = None;
    for line in lines {
        let t = line.trim_start();
        if t.starts_with(';') || t.starts_with("--") || t.starts_with("//") {
            continue;
        }
        if let Some(caps) = G_LANGUAGE.captures(t) {
            found = caps.get(1).map(|m| m.as_str().to_string());
        }
    }
    found.and_then(|v| v.parse().ok())
}

/// Map a free-form language hint to a supported token.
pub fn normalize_language(value: &str) -> Option<String> {
    value
        .parse::<GameLanguage>()
        .ok()
        .map(|l| l.token().to_string())
}
