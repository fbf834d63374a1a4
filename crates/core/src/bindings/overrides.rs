//! User override profile (`actionmaps.xml`) merged over the defaults.

use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Document, Node};
use std::{collections::HashMap, sync::Arc};

use crate::bindings::{
    action_binding::BindingRecord,
    binds::{Bindings, Device, is_mouse_token, normalize_token},
};
use crate::core_log::CoreLog;

/// `kb1_f`, `mo1_mouse2`, `js2_button3` → (device, instance, key).
static REBIND_INPUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)(kb|mo|js|gp)(\d*)_(.*)$").expect("static regex"));

/// Apply `<actionmap name><action name><rebind input/></action></actionmap>` onto `records`.
///
/// Keyboard and mouse rebinds replace the default slot (a blank key clears it). Other devices
/// and unknown actions are ignored. All edits are staged and only committed once the whole
/// document has been read, so an error leaves every record untouched.
/// Returns the number of records that changed.
pub fn apply_override_profile(
    records: &mut [BindingRecord],
    xml: &str,
    logger: &Arc<dyn CoreLog>,
) -> Result<usize, String> {
    let doc = Document::parse(xml).map_err(|e| format!("parse override XML: {e}"))?;

    let mut by_map: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
    let mut by_action: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, r) in records.iter().enumerate() {
        by_map
            .entry((r.map_name.as_str(), r.action_name.as_str()))
            .or_default()
            .push(i);
        by_action.entry(r.action_name.as_str()).or_default().push(i);
    }

    let mut staged: HashMap<usize, Bindings> = HashMap::new();
    for act_node in doc
        .descendants()
        .filter(|n| n.is_element() && n.has_tag_name("action"))
    {
        let Some(act_name) = act_node.attribute("name").map(str::trim) else {
            continue;
        };
        let map_name = enclosing_map(act_node);
        let targets = match map_name {
            Some(m) => by_map.get(&(m, act_name)),
            None => by_action.get(act_name),
        };
        let Some(targets) = targets else {
            logger.debug(&format!(
                "[apply_override_profile] unknown action {}.{act_name}",
                map_name.unwrap_or("*")
            ));
            continue;
        };

        for rebind in act_node
            .children()
            .filter(|n| n.is_element() && n.has_tag_name("rebind"))
        {
            let input = rebind.attribute("input").unwrap_or("").trim();
            let Some((device, value)) = parse_rebind(input) else {
                logger.debug(&format!(
                    "[apply_override_profile] ignoring '{input}' on {act_name}"
                ));
                continue;
            };
            for &i in targets {
                let b = staged
                    .entry(i)
                    .or_insert_with(|| records[i].bindings.clone());
                b.set(device, value.clone());
                b.normalize();
            }
        }
    }

    let mut changed = 0;
    for (i, b) in staged {
        if records[i].bindings != b {
            records[i].bindings = b;
            changed += 1;
        }
    }
    logger.info(&format!(
        "[apply_override_profile] {changed} action(s) rebound"
    ));
    Ok(changed)
}

/// Keyboard / mouse rebinds only. A keyboard rebind to a mouse button lands in the mouse slot.
fn parse_rebind(input: &str) -> Option<(Device, Option<String>)> {
    let caps = REBIND_INPUT.captures(input)?;
    let device = match caps.get(1)?.as_str().to_ascii_lowercase().as_str() {
        "kb" => Device::Keyboard,
        "mo" => Device::Mouse,
        _ => return None,
    };
    let value = normalize_token(caps.get(3).map_or("", |m| m.as_str()));
    let device = match &value {
        Some(v) if device == Device::Keyboard && is_mouse_token(v) => Device::Mouse,
        _ => device,
    };
    Some((device, value))
}

fn enclosing_map<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.ancestors()
        .find(|n| n.is_element() && n.has_tag_name("actionmap"))
        .and_then(|n| n.attribute("name"))
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::activation_mode::ActivationMode;
    use crate::core_log::NoopLog;

    fn record(map: &str, action: &str, kb: Option<&str>, mouse: Option<&str>) -> BindingRecord {
        BindingRecord {
            action_name: action.into(),
            map_name: map.into(),
            map_label: String::new(),
            ui_label: "L".into(),
            ui_description: String::new(),
            ui_category: String::new(),
            activation_mode: ActivationMode::Press,
            bindings: Bindings {
                keyboard: kb.map(str::to_string),
                mouse: mouse.map(str::to_string),
                ..Default::default()
            },
            is_toggle_candidate: false,
        }
    }

    fn log() -> Arc<dyn CoreLog> {
        Arc::new(NoopLog)
    }

    #[test]
    fn keyboard_mouse_and_blank_rebinds() {
        let mut rs = vec![
            record("seat", "fire", Some("space"), None),
            record("seat", "aim", Some("a"), Some("mouse2")),
            record("other", "fire", Some("z"), None),
        ];
        let n = apply_override_profile(
            &mut rs,
            r#"<ActionMaps><ActionProfiles><actionmap name="seat">
                 <action name="fire"><rebind input="kb1_mouse1"/></action>
                 <action name="aim"><rebind input="kb1_ "/><rebind input="js1_button2"/></action>
                 <action name="nope"><rebind input="kb1_x"/></action>
               </actionmap></ActionProfiles></ActionMaps>"#,
            &log(),
        )
        .unwrap();
        assert_eq!(n, 2);
        assert_eq!(rs[0].bindings.keyboard.as_deref(), Some("space"));
        assert_eq!(rs[0].bindings.mouse.as_deref(), Some("mouse1"));
        assert_eq!(rs[1].bindings.keyboard, None);
        assert_eq!(rs[1].bindings.mouse.as_deref(), Some("mouse2"));
        assert_eq!(rs[2].bindings.keyboard.as_deref(), Some("z"));
    }

    #[test]
    fn action_outside_map_matches_by_name() {
        let mut rs = vec![
            record("seat", "fire", Some("space"), None),
            record("other", "fire", Some("z"), None),
        ];
        let n = apply_override_profile(
            &mut rs,
            r#"<profile><action name="fire"><rebind input="kb1_f"/></action></profile>"#,
            &log(),
        )
        .unwrap();
        assert_eq!(n, 2);
        assert!(rs.iter().all(|r| r.bindings.keyboard.as_deref() == Some("f")));
    }

    #[test]
    fn malformed_xml_leaves_records_untouched() {
        let mut rs = vec![record("seat", "fire", Some("space"), None)];
        let before = rs.clone();
        let broken = "<actionmap name=\"seat\"><action";
        assert!(apply_override_profile(&mut rs, broken, &log()).is_err());
        assert_eq!(rs, before);
    }
}
