//! Location-path queries over a parsed descriptor.
//!
//! Paths are absolute, slash separated and match local element names, so a
//! namespaced `<project xmlns="http://maven.apache.org/POM/4.0.0">` is queried
//! exactly like a bare one. The final step may be `*`.

use crate::error::ExtractError;
use roxmltree::{Document, Node};

pub struct PomDocument<'input> {
    doc: Document<'input>,
}

impl<'input> PomDocument<'input> {
    pub fn parse(text: &'input str) -> Result<Self, ExtractError> {
        let doc = Document::parse(text).map_err(|e| ExtractError::Parse(e.to_string()))?;
        Ok(Self { doc })
    }

    pub fn root(&self) -> Node<'_, 'input> {
        self.doc.root_element()
    }

    /// Every element matched by `path`, in document order.
    pub fn nodes(&self, path: &str) -> Vec<Node<'_, 'input>> {
        let mut steps = path.split('/').filter(|s| !s.is_empty());

        let root = self.root();
        match steps.next() {
            Some(first) if matches_step(root, first) => {}
            _ => return Vec::new(),
        }

        let mut current = vec![root];
        for step in steps {
            current = current
                .into_iter()
                .flat_map(|node| node.children().filter(move |c| matches_step(*c, step)))
                .collect();
            if current.is_empty() {
                break;
            }
        }
        current
    }

    /// Trimmed text content of the first match, empty when nothing matches.
    pub fn value(&self, path: &str) -> String {
        self.nodes(path)
            .first()
            .map(|node| text_content(*node).trim().to_string())
            .unwrap_or_default()
    }

    /// Every element named `name` anywhere in the document.
    pub fn descendants(&self, name: &str) -> Vec<Node<'_, 'input>> {
        self.doc
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == name)
            .collect()
    }
}

fn matches_step(node: Node<'_, '_>, step: &str) -> bool {
    node.is_element() && (step == "*" || node.tag_name().name() == step)
}

/// Concatenated text of every descendant text node.
pub fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Trimmed text of the first direct child element named `name`.
pub fn child_value(node: Node<'_, '_>, name: &str) -> String {
    child_element(node, name)
        .map(|child| text_content(child).trim().to_string())
        .unwrap_or_default()
}

pub fn child_element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}
