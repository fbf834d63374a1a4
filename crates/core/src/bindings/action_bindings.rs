use roxmltree::Document;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::bindings::{
    action_binding::{ActionSkipReason, BindingRecord},
    action_map::MapContext,
    activation_mode::ActivationModeTable,
    overrides,
    translations::{self, LocalizationTable},
};
use crate::config::ExtractOptions;
use crate::core_log::CoreLog;

/// Everything parsed out of one `defaultProfile.xml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ActionBindings {
    pub records: Vec<BindingRecord>,
    pub activation_modes: ActivationModeTable,
}

impl ActionBindings {
    /// Parse the default profile text: the activation-mode table first, then every bindable
    /// action of every non-skipped `<actionmap>`, in document order.
    pub fn parse_default_profile(
        xml: &str,
        opts: &ExtractOptions,
        logger: &Arc<dyn CoreLog>,
    ) -> Result<Self, String> {
        let doc = Document::parse(xml).map_err(|e| format!("parse default XML: {e}"))?;
        let activation_modes = ActivationModeTable::from_document(&doc);

        let mut records = Vec::new();
        let mut maps = 0usize;
        for node in doc
            .descendants()
            .filter(|n| n.is_element() && n.has_tag_name("actionmap"))
        {
            let map = match MapContext::from_node(node, &opts.action_map_ui_categories) {
                Ok(m) => m,
                Err(e) => {
                    logger.debug(&format!("[parse_default_profile] skipping actionmap: {e:?}"));
                    continue;
                }
            };
            if opts.skip_action_maps.contains(&map.name) {
                continue;
            }
            maps += 1;

            for action in node
                .children()
                .filter(|n| n.is_element() && n.has_tag_name("action"))
            {
                match BindingRecord::from_node(
                    action,
                    &map,
                    &activation_modes,
                    &opts.toggle_markers,
                ) {
                    Ok(r) => records.push(r),
                    Err(ActionSkipReason::MissingName) => logger.debug(&format!(
                        "[parse_default_profile] nameless action in {}",
                        map.name
                    )),
                    Err(ActionSkipReason::MissingLabel) => logger.debug(&format!(
                        "[parse_default_profile] {}.{} has no UILabel",
                        map.name,
                        action.attribute("name").unwrap_or_default()
                    )),
                }
            }
        }

        logger.info(&format!(
            "[parse_default_profile] Loaded {} actions in {} maps; {} activation modes",
            records.len(),
            maps,
            activation_modes.len()
        ));

        Ok(ActionBindings {
            records,
            activation_modes,
        })
    }

    pub fn apply_localization(
        &mut self,
        table: &LocalizationTable,
        toggle_markers: &[String],
    ) -> usize {
        translations::apply_localization(&mut self.records, table, toggle_markers)
    }

    /// Overlay the user's override profile. On error nothing changes.
    pub fn apply_override_profile(
        &mut self,
        xml: &str,
        logger: &Arc<dyn CoreLog>,
    ) -> Result<usize, String> {
        overrides::apply_override_profile(&mut self.records, xml, logger)
    }

    /// Drop records a picker can't show: no bindings and no readable label.
    /// Returns how many were removed.
    pub fn retain_meaningful(&mut self) -> usize {
        let before = self.records.len();
        self.records
            .retain(|r| r.has_bindings() || r.has_meaningful_label());
        before - self.records.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
