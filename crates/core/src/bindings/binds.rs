use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::Node;
use serde::{Deserialize, Serialize};

/// Input devices a binding can target, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    Keyboard,
    Mouse,
    Joystick,
    Gamepad,
}

impl Device {
    pub const ALL: [Device; 4] = [
        Device::Keyboard,
        Device::Mouse,
        Device::Joystick,
        Device::Gamepad,
    ];

    /// Attribute / element name used by the game's profiles.
    pub fn tag(&self) -> &'static str {
        match self {
            Device::Keyboard => "keyboard",
            Device::Mouse => "mouse",
            Device::Joystick => "joystick",
            Device::Gamepad => "gamepad",
        }
    }
}

/// `mouse<N>`, `mwheel_up`, `mwheel_down`, optionally after `+`-joined modifiers.
static MOUSE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:[^+]+\+)*(?:mouse\d+|mwheel_(?:up|down))$").expect("static regex")
});

/// Device instance prefix such as `kb1_`, `mo1_`, `js2_`, `gp1_`.
static INSTANCE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:kb|mo|js|gp)\d*_").expect("static regex"));

/// One optional canonical token per device. `None` serializes as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bindings {
    pub keyboard: Option<String>,
    pub mouse: Option<String>,
    pub joystick: Option<String>,
    pub gamepad: Option<String>,
}

impl Bindings {
    pub fn slot(&self, device: Device) -> Option<&str> {
        match device {
            Device::Keyboard => self.keyboard.as_deref(),
            Device::Mouse => self.mouse.as_deref(),
            Device::Joystick => self.joystick.as_deref(),
            Device::Gamepad => self.gamepad.as_deref(),
        }
    }

    pub fn slot_mut(&mut self, device: Device) -> &mut Option<String> {
        match device {
            Device::Keyboard => &mut self.keyboard,
            Device::Mouse => &mut self.mouse,
            Device::Joystick => &mut self.joystick,
            Device::Gamepad => &mut self.gamepad,
        }
    }

    pub fn set(&mut self, device: Device, value: Option<String>) {
        *self.slot_mut(device) = value;
    }

    #[inline]
    pub fn has_any(&self) -> bool {
        Device::ALL.iter().any(|&d| self.slot(d).is_some())
    }

    /// Raw bindings of an `<action>`: a non-blank direct attribute wins, otherwise the first
    /// nested `<device>` element (its `input`, else its first `<inputdata input>`).
    /// The result is normalized.
    pub fn from_node(action: Node) -> Self {
        let mut out = Bindings::default();
        for device in Device::ALL {
            let direct = action
                .attribute(device.tag())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            let value = match direct {
                Some(v) => Some(v.to_string()),
                None => nested_input(action, device),
            };
            out.set(device, value);
        }
        out.normalize();
        out
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Canonicalize every slot. Idempotent.
    ///
    /// Keyboard values that are really mouse buttons or wheel steps move to the mouse slot
    /// (an already-filled mouse slot wins and the keyboard copy is dropped).
    pub fn normalize(&mut self) {
        for device in Device::ALL {
            let slot = self.slot_mut(device);
            *slot = slot.as_deref().and_then(normalize_token);
        }
        if let Some(kb) = self.keyboard.take_if(|kb| is_mouse_token(kb)) {
            if self.mouse.is_none() {
                self.mouse = Some(kb);
            }
        }
    }
}

fn nested_input(action: Node, device: Device) -> Option<String> {
    let node = action
        .children()
        .find(|n| n.is_element() && n.has_tag_name(device.tag()))?;
    if let Some(v) = node.attribute("input").map(str::trim).filter(|v| !v.is_empty()) {
        return Some(v.to_string());
    }
    node.children()
        .find(|n| n.is_element() && n.has_tag_name("inputdata"))
        .and_then(|n| n.attribute("input"))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Trim and strip device markers; `None` when nothing meaningful remains.
pub fn normalize_token(raw: &str) -> Option<String> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    let stripped = strip_device_markers(t);
    if stripped.is_empty() { None } else { Some(stripped) }
}

pub fn is_mouse_token(token: &str) -> bool {
    MOUSE_TOKEN.is_match(token.trim())
}

/// Remove instance prefixes (`kb1_`) and `hmd`/`hmd_*` tokens among `+`-joined parts.
/// Repeats until nothing changes, so prefixes exposed by a removal are caught too.
pub fn strip_device_markers(token: &str) -> String {
    let mut current = token.trim().to_string();
    loop {
        let next = current
            .split('+')
            .map(|part| {
                let mut p = part.trim();
                while let Some(m) = INSTANCE_PREFIX.find(p) {
                    p = p[m.end()..].trim_start();
                }
                p
            })
            .filter(|p| !p.is_empty() && !is_hmd_marker(p))
            .collect::<Vec<_>>()
            .join("+");
        if next == current {
            return next;
        }
        current = next;
    }
}

#[inline]
fn is_hmd_marker(part: &str) -> bool {
    let lower = part.to_ascii_lowercase();
    lower == "hmd" || lower.starts_with("hmd_")
}
