use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Action maps that only exist for developer/internal tooling; nothing in them is useful to
/// a binding picker.
pub static SKIP_ACTION_MAPS: Lazy<HashSet<String>> = Lazy::new(|| {
    [
        "IFCS_controls",
        "debug",
        "zero_gravity_traversal",
        "hacking",
        "RemoteRigidEntityController",
        "character_customizer",
        "flycam",
        "server_renderer",
        "vehicle_mobiglas",
    ]
    .into_iter()
    .map(String::from)
    .collect()
});

/// Category for maps that ship without a `UICategory`.
pub static ACTION_MAP_UI_CATEGORIES: Lazy<HashMap<String, String>> = Lazy::new(|| {
    [
        ("mining", "@ui_CCFPS"),
        ("vehicle_mfd", "@ui_CG_MFDs"),
        ("mapui", "@ui_Map"),
        ("stopwatch", "@ui_CGStopWatch"),
        ("ui_textfield", "@uiCGUIGeneral"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
});

/// Substrings (lowercase) in an action name or description that mark it as a toggle.
pub static TOGGLE_MARKERS: Lazy<Vec<String>> = Lazy::new(|| vec!["toggle".to_string()]);

/// Where the default binding profile lives inside `Data.p4k`.
pub const DEFAULT_PROFILE_DIR: &str = "Data/Libs/Config";
pub const DEFAULT_PROFILE_FILE: &str = "defaultProfile.xml";

/// Where per-language string tables live inside `Data.p4k`.
pub const LOCALIZATION_DIR: &str = "Data/Localization";
pub const LOCALIZATION_FILE: &str = "global.ini";
