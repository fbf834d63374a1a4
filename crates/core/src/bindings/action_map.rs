use roxmltree::Node;
use std::collections::HashMap;

#[derive(Debug)]
pub enum ActionMapParseError {
    MissingName,
}

/// The `<actionmap>` an action belongs to, as copied onto each of its records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MapContext {
    pub name: String,
    pub label: String,
    pub category: String,
}

impl MapContext {
    pub fn from_node(
        node: Node,
        actionmap_ui_categories: &HashMap<String, String>,
    ) -> Result<Self, ActionMapParseError> {
        let name = node
            .attribute("name")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ActionMapParseError::MissingName)?
            .to_string();

        let label = node
            .attribute("UILabel")
            .map(str::trim)
            .unwrap_or("")
            .to_string();

        // declared category, then the configured table, then the map's own label
        let category = node
            .attribute("UICategory")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| actionmap_ui_categories.get(&name).cloned())
            .unwrap_or_else(|| label.clone());

        Ok(MapContext {
            name,
            label,
            category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    #[test]
    fn category_fallback_order() {
        let table: HashMap<String, String> =
            [("mining".to_string(), "@ui_CCFPS".to_string())].into();

        let doc = Document::parse(r#"<actionmap name="mining" UILabel="@ui_Mining"/>"#).unwrap();
        let m = MapContext::from_node(doc.root_element(), &table).unwrap();
        assert_eq!(m.category, "@ui_CCFPS");

        let doc = Document::parse(r#"<actionmap name="seat" UILabel="@ui_Seat"/>"#).unwrap();
        let m = MapContext::from_node(doc.root_element(), &table).unwrap();
        assert_eq!(m.category, "@ui_Seat");

        let xml = r#"<actionmap name="mining" UICategory="@ui_X" UILabel="L"/>"#;
        let doc = Document::parse(xml).unwrap();
        let m = MapContext::from_node(doc.root_element(), &table).unwrap();
        assert_eq!(m.category, "@ui_X");
    }

    #[test]
    fn nameless_map_is_rejected() {
        let doc = Document::parse(r#"<actionmap UILabel="x"/>"#).unwrap();
        assert!(MapContext::from_node(doc.root_element(), &HashMap::new()).is_err());
    }
}
