//! Activation modes: the `<ActivationMode>` definition table and per-action mode resolution.
//!
//! Resolution is a pure function of the action's declared trigger flags and the table:
//! 1. a named `activationMode="..."` reference the game knows,
//! 2. an exact `(onPress, onHold, onRelease, retriggerable)` match against the table, except
//!    for press+release tuples and the listed ambiguous twins,
//! 3. the flag heuristic.

use core::fmt;
use indexmap::IndexMap;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Threshold value meaning "not set".
pub const NOT_SET: f32 = -1.0;

/// Named behaviours the game defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivationMode {
    #[default]
    Press,
    PressQuicker,
    DelayedPress,
    DelayedPressMedium,
    DelayedPressLong,
    Tap,
    TapQuicker,
    DoubleTap,
    DoubleTapNonblocking,
    Hold,
    DelayedHold,
    DelayedHoldLong,
    HoldNoRetrigger,
    HoldToggle,
    SmartToggle,
    All,
}

impl ActivationMode {
    pub const ALL: [ActivationMode; 16] = [
        ActivationMode::Press,
        ActivationMode::PressQuicker,
        ActivationMode::DelayedPress,
        ActivationMode::DelayedPressMedium,
        ActivationMode::DelayedPressLong,
        ActivationMode::Tap,
        ActivationMode::TapQuicker,
        ActivationMode::DoubleTap,
        ActivationMode::DoubleTapNonblocking,
        ActivationMode::Hold,
        ActivationMode::DelayedHold,
        ActivationMode::DelayedHoldLong,
        ActivationMode::HoldNoRetrigger,
        ActivationMode::HoldToggle,
        ActivationMode::SmartToggle,
        ActivationMode::All,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ActivationMode::Press => "press",
            ActivationMode::PressQuicker => "press_quicker",
            ActivationMode::DelayedPress => "delayed_press",
            ActivationMode::DelayedPressMedium => "delayed_press_medium",
            ActivationMode::DelayedPressLong => "delayed_press_long",
            ActivationMode::Tap => "tap",
            ActivationMode::TapQuicker => "tap_quicker",
            ActivationMode::DoubleTap => "double_tap",
            ActivationMode::DoubleTapNonblocking => "double_tap_nonblocking",
            ActivationMode::Hold => "hold",
            ActivationMode::DelayedHold => "delayed_hold",
            ActivationMode::DelayedHoldLong => "delayed_hold_long",
            ActivationMode::HoldNoRetrigger => "hold_no_retrigger",
            ActivationMode::HoldToggle => "hold_toggle",
            ActivationMode::SmartToggle => "smart_toggle",
            ActivationMode::All => "all",
        }
    }
}

impl fmt::Display for ActivationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActivationMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if wanted == "hold, no retrigger" {
            return Ok(ActivationMode::HoldNoRetrigger);
        }
        ActivationMode::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| format!("unknown activation mode '{}'", s.trim()))
    }
}

/// Definitions that share a boolean tuple and only differ by thresholds.
/// An exact match may pick one of these only when the action declares a threshold that
/// matches the candidate's.
pub const AMBIGUOUS_MODE_TWINS: &[(ActivationMode, ActivationMode)] = &[
    (ActivationMode::Press, ActivationMode::Tap),
    (ActivationMode::PressQuicker, ActivationMode::TapQuicker),
];

pub fn is_ambiguous_twin(mode: ActivationMode) -> bool {
    AMBIGUOUS_MODE_TWINS
        .iter()
        .any(|&(a, b)| a == mode || b == mode)
}

const FLAG_KEYS: &[&str] = &[
    "onPress",
    "onHold",
    "onRelease",
    "retriggerable",
    "pressTriggerThreshold",
    "releaseTriggerThreshold",
];

#[inline]
fn bool_attr(node: Node, k: &str) -> bool {
    node.attribute(k)
        .map(str::trim)
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

#[inline]
fn f32_attr(node: Node, k: &str, default: f32) -> f32 {
    node.attribute(k)
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

#[inline]
fn i32_attr(node: Node, k: &str, default: i32) -> i32 {
    node.attribute(k)
        .and_then(|v| v.trim().parse::<i32>().ok())
        .unwrap_or(default)
}

/// One `<ActivationMode>` definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationModeMetadata {
    pub name: String,
    pub on_press: bool,
    pub on_hold: bool,
    pub on_release: bool,
    pub retriggerable: bool,
    pub press_trigger_threshold: f32,
    pub release_trigger_threshold: f32,
    pub release_trigger_delay: f32,
    pub multi_tap: i32,
    pub multi_tap_block: i32,
}

impl ActivationModeMetadata {
    /// `None` when the element has no usable `name`.
    pub fn from_node(node: Node) -> Option<Self> {
        let name = node.attribute("name").map(str::trim).filter(|n| !n.is_empty())?;
        Some(ActivationModeMetadata {
            name: name.to_string(),
            on_press: bool_attr(node, "onPress"),
            on_hold: bool_attr(node, "onHold"),
            on_release: bool_attr(node, "onRelease"),
            retriggerable: bool_attr(node, "retriggerable"),
            press_trigger_threshold: f32_attr(node, "pressTriggerThreshold", NOT_SET),
            release_trigger_threshold: f32_attr(node, "releaseTriggerThreshold", NOT_SET),
            release_trigger_delay: f32_attr(node, "releaseTriggerDelay", 0.0),
            multi_tap: i32_attr(node, "multiTap", 1),
            multi_tap_block: i32_attr(node, "multiTapBlock", 1),
        })
    }

    #[inline]
    pub fn flags(&self) -> (bool, bool, bool, bool) {
        (self.on_press, self.on_hold, self.on_release, self.retriggerable)
    }
}

/// Trigger flags and thresholds an `<action>` (or its nested device node) declares inline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeclaredActivation {
    pub on_press: bool,
    pub on_hold: bool,
    pub on_release: bool,
    pub retriggerable: bool,
    pub press_trigger_threshold: f32,
    pub release_trigger_threshold: f32,
}

impl Default for DeclaredActivation {
    fn default() -> Self {
        Self {
            on_press: false,
            on_hold: false,
            on_release: false,
            retriggerable: false,
            press_trigger_threshold: NOT_SET,
            release_trigger_threshold: NOT_SET,
        }
    }
}

impl DeclaredActivation {
    /// Does this node carry any trigger attributes?
    pub fn has_attributes(node: Node) -> bool {
        FLAG_KEYS.iter().any(|&k| node.attribute(k).is_some())
    }

    pub fn from_node(node: Node) -> Self {
        DeclaredActivation {
            on_press: bool_attr(node, "onPress"),
            on_hold: bool_attr(node, "onHold"),
            on_release: bool_attr(node, "onRelease"),
            retriggerable: bool_attr(node, "retriggerable"),
            press_trigger_threshold: f32_attr(node, "pressTriggerThreshold", NOT_SET),
            release_trigger_threshold: f32_attr(node, "releaseTriggerThreshold", NOT_SET),
        }
    }

    #[inline]
    pub fn flags(&self) -> (bool, bool, bool, bool) {
        (self.on_press, self.on_hold, self.on_release, self.retriggerable)
    }

    /// A declared threshold that singles out `candidate` among its twins.
    pub fn distinguishes(&self, candidate: &ActivationModeMetadata) -> bool {
        let same = |a: f32, b: f32| (a - b).abs() < 1e-4;
        (self.press_trigger_threshold != NOT_SET
            && same(self.press_trigger_threshold, candidate.press_trigger_threshold))
            || (self.release_trigger_threshold != NOT_SET
                && same(self.release_trigger_threshold, candidate.release_trigger_threshold))
    }
}

/// Activation-mode definitions keyed by lowercase name, in declaration order.
/// Built once per extraction and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivationModeTable {
    modes: IndexMap<String, ActivationModeMetadata>,
}

impl ActivationModeTable {
    /// Collect every named `<ActivationMode>` element in the document.
    pub fn from_document(doc: &Document) -> Self {
        let mut table = ActivationModeTable::default();
        for node in doc
            .descendants()
            .filter(|n| n.is_element() && n.has_tag_name("ActivationMode"))
        {
            if let Some(m) = ActivationModeMetadata::from_node(node) {
                table.insert(m);
            }
        }
        table
    }

    /// Later definitions with the same (case-insensitive) name replace earlier ones in place.
    pub fn insert(&mut self, mode: ActivationModeMetadata) {
        self.modes.insert(mode.name.to_lowercase(), mode);
    }

    pub fn get(&self, name: &str) -> Option<&ActivationModeMetadata> {
        self.modes.get(&name.trim().to_lowercase())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.modes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivationModeMetadata> {
        self.modes.values()
    }
}

/// Full resolution: named reference, then exact match, then heuristic.
pub fn resolve_activation_mode(
    declared: &DeclaredActivation,
    named: Option<&str>,
    table: &ActivationModeTable,
) -> ActivationMode {
    if let Some(mode) = named.and_then(|n| n.parse::<ActivationMode>().ok()) {
        return mode;
    }
    exact_match(declared, table).unwrap_or_else(|| heuristic_mode(declared))
}

/// First table entry (declaration order) whose flag tuple equals the declared one.
/// Skipped entirely for press+release tuples so hold-like actions aren't read as taps.
pub fn exact_match(
    declared: &DeclaredActivation,
    table: &ActivationModeTable,
) -> Option<ActivationMode> {
    if declared.on_press && declared.on_release {
        return None;
    }
    table
        .iter()
        .filter(|m| m.flags() == declared.flags())
        .find_map(|m| {
            let mode = m.name.parse::<ActivationMode>().ok()?;
            if is_ambiguous_twin(mode) && !declared.distinguishes(m) {
                return None;
            }
            Some(mode)
        })
}

pub fn heuristic_mode(declared: &DeclaredActivation) -> ActivationMode {
    match declared.flags() {
        (true, _, true, true) => ActivationMode::Hold,
        (true, _, true, false) => ActivationMode::HoldNoRetrigger,
        (false, true, false, _) => ActivationMode::Hold,
        (false, false, true, _) => ActivationMode::Tap,
        _ => ActivationMode::Press,
    }
}
