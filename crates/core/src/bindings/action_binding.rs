use roxmltree::Node;
use serde::{Deserialize, Serialize};

use crate::bindings::{
    action_map::MapContext,
    activation_mode::{
        ActivationMode, ActivationModeTable, DeclaredActivation, resolve_activation_mode,
    },
    binds::Bindings,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSkipReason {
    MissingName,
    MissingLabel,
}

/// One bindable action, flattened with its map context. This is what the output file lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingRecord {
    pub action_name: String,
    pub map_name: String,
    pub map_label: String,
    pub ui_label: String,
    pub ui_description: String,
    pub ui_category: String,
    pub activation_mode: ActivationMode,
    pub bindings: Bindings,
    pub is_toggle_candidate: bool,
}

impl BindingRecord {
    #[inline]
    fn non_empty_attr(node: Node, key: &str) -> Option<String> {
        node.attribute(key)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Parse an `<action>` element. Actions without a name or a `UILabel` are not bindable
    /// from a UI and are skipped by the caller.
    pub fn from_node(
        node: Node,
        map: &MapContext,
        modes: &ActivationModeTable,
        toggle_markers: &[String],
    ) -> Result<Self, ActionSkipReason> {
        let action_name =
            Self::non_empty_attr(node, "name").ok_or(ActionSkipReason::MissingName)?;
        let ui_label = Self::non_empty_attr(node, "UILabel").ok_or(ActionSkipReason::MissingLabel)?;
        let ui_description = Self::non_empty_attr(node, "UIDescription").unwrap_or_default();

        let carrier = activation_carrier(node);
        let declared = carrier.map(DeclaredActivation::from_node).unwrap_or_default();
        let named = node
            .attribute("activationMode")
            .or_else(|| carrier.and_then(|c| c.attribute("activationMode")));
        let activation_mode = resolve_activation_mode(&declared, named, modes);

        let mut record = BindingRecord {
            action_name,
            map_name: map.name.clone(),
            map_label: map.label.clone(),
            ui_label,
            ui_description,
            ui_category: map.category.clone(),
            activation_mode,
            bindings: Bindings::from_node(node),
            is_toggle_candidate: false,
        };
        record.refresh_toggle_candidate(toggle_markers);
        Ok(record)
    }

    #[inline]
    pub fn has_bindings(&self) -> bool {
        self.bindings.has_any()
    }

    /// A label a user could read: non-empty and not a leftover `@token`.
    pub fn has_meaningful_label(&self) -> bool {
        let l = self.ui_label.trim();
        !l.is_empty() && !l.starts_with('@')
    }

    /// Re-evaluate against the current name and description (call after localizing).
    pub fn refresh_toggle_candidate(&mut self, toggle_markers: &[String]) {
        let name = self.action_name.to_lowercase();
        let desc = self.ui_description.to_lowercase();
        self.is_toggle_candidate = toggle_markers
            .iter()
            .any(|m| name.contains(m.as_str()) || desc.contains(m.as_str()));
    }
}

/// Where an action's trigger flags live: on the `<action>` itself, or else on the first
/// nested device / `<inputdata>` element that declares any.
fn activation_carrier<'a, 'input>(action: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    if DeclaredActivation::has_attributes(action) {
        return Some(action);
    }
    action
        .descendants()
        .skip(1)
        .find(|n| n.is_element() && DeclaredActivation::has_attributes(*n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::activation_mode::ActivationModeMetadata;
    use roxmltree::Document;

    fn markers() -> Vec<String> {
        vec!["toggle".to_string()]
    }

    fn map() -> MapContext {
        MapContext {
            name: "spaceship_general".into(),
            label: "@ui_CGSpaceFlight".into(),
            category: "@ui_CCSpaceFlight".into(),
        }
    }

    fn parse(xml: &str, modes: &ActivationModeTable) -> Result<BindingRecord, ActionSkipReason> {
        let doc = Document::parse(xml).unwrap();
        BindingRecord::from_node(doc.root_element(), &map(), modes, &markers())
    }

    #[test]
    fn copies_map_context_and_flags_toggles() {
        let r = parse(
            r#"<action name="v_toggle_lights" UILabel="@ui_lights" keyboard="l"/>"#,
            &ActivationModeTable::default(),
        )
        .unwrap();
        assert_eq!(r.map_name, "spaceship_general");
        assert_eq!(r.ui_category, "@ui_CCSpaceFlight");
        assert_eq!(r.ui_description, "");
        assert_eq!(r.activation_mode, ActivationMode::Press);
        assert!(r.is_toggle_candidate);
    }

    #[test]
    fn skips_unlabelled_and_nameless() {
        let t = ActivationModeTable::default();
        assert_eq!(
            parse(r#"<action name="a" keyboard="x"/>"#, &t),
            Err(ActionSkipReason::MissingLabel)
        );
        assert_eq!(
            parse(r#"<action name=" " UILabel="L"/>"#, &t),
            Err(ActionSkipReason::MissingName)
        );
    }

    #[test]
    fn flags_can_come_from_nested_inputdata() {
        let r = parse(
            r#"<action name="a" UILabel="L">
                 <keyboard><inputdata input="f" onHold="1"/></keyboard>
               </action>"#,
            &ActivationModeTable::default(),
        )
        .unwrap();
        assert_eq!(r.activation_mode, ActivationMode::Hold);
        assert_eq!(r.bindings.keyboard.as_deref(), Some("f"));
    }

    #[test]
    fn named_reference_wins() {
        let mut t = ActivationModeTable::default();
        t.insert(ActivationModeMetadata {
            name: "delayed_press".into(),
            on_press: true,
            on_hold: false,
            on_release: false,
            retriggerable: false,
            press_trigger_threshold: 0.25,
            release_trigger_threshold: -1.0,
            release_trigger_delay: 0.0,
            multi_tap: 1,
            multi_tap_block: 1,
        });
        let r = parse(
            r#"<action name="a" UILabel="L" activationMode="double_tap" onPress="1"/>"#,
            &t,
        )
        .unwrap();
        assert_eq!(r.activation_mode, ActivationMode::DoubleTap);

        let r = parse(r#"<action name="a" UILabel="L" onPress="1"/>"#, &t).unwrap();
        assert_eq!(r.activation_mode, ActivationMode::DelayedPress);
    }

    #[test]
    fn meaningful_label() {
        let mut r = parse(
            r#"<action name="a" UILabel="@ui_x"/>"#,
            &ActivationModeTable::default(),
        )
        .unwrap();
        assert!(!r.has_meaningful_label());
        r.ui_label = "Fire".into();
        assert!(r.has_meaningful_label());
        assert!(!r.has_bindings());
    }
}
