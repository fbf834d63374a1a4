use quick_xml::escape::escape;

/// Owned element tree produced by the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlNode {
    pub tag: String,
    pub content: String,
    /// Declaration order is preserved.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

enum Step<'a> {
    Open(&'a XmlNode),
    Close(&'a str),
}

impl XmlNode {
    pub fn new(tag: impl Into<String>) -> Self {
        XmlNode {
            tag: tag.into(),
            content: String::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Total element count of this subtree.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(n) = stack.pop() {
            count += 1;
            stack.extend(n.children.iter());
        }
        count
    }

    /// Compact XML text. Leaves without content render self-closing (`<Tag />`),
    /// text-only elements as `<Tag>text</Tag>`. Text and attribute values are escaped.
    /// Walks with an explicit stack so very deep documents can't blow the call stack.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![Step::Open(self)];

        while let Some(step) = stack.pop() {
            match step {
                Step::Close(tag) => {
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
                Step::Open(node) => {
                    out.push('<');
                    out.push_str(&node.tag);
                    for (k, v) in &node.attributes {
                        out.push(' ');
                        out.push_str(k);
                        out.push_str("=\"");
                        out.push_str(&escape(v.as_str()));
                        out.push('"');
                    }
                    if node.children.is_empty() && node.content.is_empty() {
                        out.push_str(" />");
                        continue;
                    }
                    out.push('>');
                    out.push_str(&escape(node.content.as_str()));
                    stack.push(Step::Close(&node.tag));
                    stack.extend(node.children.iter().rev().map(Step::Open));
                }
            }
        }
        out
    }
}

/// Children are released from a work-list so dropping a deep chain can't exhaust the stack.
impl Drop for XmlNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_text_child_and_attribute() {
        let root = XmlNode::new("Root")
            .with_attribute("attr", "value")
            .with_child(XmlNode::new("Child").with_content("Hello"));
        assert_eq!(
            root.to_xml_string(),
            r#"<Root attr="value"><Child>Hello</Child></Root>"#
        );
    }

    #[test]
    fn empty_leaf_is_self_closing() {
        assert_eq!(XmlNode::new("Tag").to_xml_string(), "<Tag />");
        assert_eq!(
            XmlNode::new("a").with_attribute("k", "v").to_xml_string(),
            r#"<a k="v" />"#
        );
    }

    #[test]
    fn escapes_markup_in_values() {
        let n = XmlNode::new("t")
            .with_attribute("q", "a\"<b")
            .with_content("x & y");
        assert_eq!(n.to_xml_string(), r#"<t q="a&quot;&lt;b">x &amp; y</t>"#);
    }

    #[test]
    fn deep_chain_drops_without_recursion() {
        let mut node = XmlNode::new("leaf");
        for _ in 0..200_000 {
            node = XmlNode::new("n").with_child(node);
        }
        assert_eq!(node.node_count(), 200_001);
        drop(node);
    }

    #[test]
    fn sibling_order_is_kept() {
        let n = XmlNode::new("r")
            .with_child(XmlNode::new("a"))
            .with_child(XmlNode::new("b"));
        assert_eq!(n.to_xml_string(), "<r><a /><b /></r>");
        assert_eq!(n.node_count(), 3);
    }
}
