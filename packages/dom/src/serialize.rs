//! Canonical XML serialization.
//!
//! This is the form handed to the saver. Attributes appear in sorted
//! order (the attribute map is ordered), text is escaped, and decoration
//! nodes never serialize: the GUI tree serializes to the same text as the
//! data tree it mirrors.

use crate::{NodeId, NodeKind, Tree};
use std::fmt::Write;

/// Serialize the whole tree from its root.
pub fn serialize(tree: &Tree) -> String {
    serialize_subtree(tree, tree.root())
}

/// Serialize one subtree.
pub fn serialize_subtree(tree: &Tree, node: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, node, &mut out);
    out
}

fn write_node(tree: &Tree, node: NodeId, out: &mut String) {
    match &tree.node(node).kind {
        NodeKind::Text { data } => out.push_str(&escape(data, false)),
        NodeKind::Element {
            name,
            attrs,
            children,
            decoration,
            ..
        } => {
            if decoration.is_some() {
                return;
            }
            let _ = write!(out, "<{}", name);
            for (attr, value) in attrs {
                let _ = write!(out, " {}=\"{}\"", attr, escape(value, true));
            }
            if children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for &child in children {
                write_node(tree, child, out);
            }
            let _ = write!(out, "</{}>", name);
        }
    }
}

fn escape(text: &str, in_attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bias, QName};
    use std::collections::BTreeMap;

    #[test]
    fn test_serializes_elements_text_and_attrs() {
        let mut tree = Tree::new(QName::local("doc"));
        let mut attrs = BTreeMap::new();
        attrs.insert(QName::local("n"), "1 < 2".to_string());
        let p = tree.new_element(QName::local("p"), attrs);
        let t = tree.new_text("a & b");
        let empty = tree.new_element(QName::prefixed("x", "br"), BTreeMap::new());
        tree.attach(tree.root(), 0, p).unwrap();
        tree.attach(p, 0, t).unwrap();
        tree.attach(p, 1, empty).unwrap();

        assert_eq!(
            serialize(&tree),
            "<doc><p n=\"1 &lt; 2\">a &amp; b<x:br/></p></doc>"
        );
    }

    #[test]
    fn test_decorations_do_not_serialize() {
        let mut tree = Tree::new(QName::local("doc"));
        let t = tree.new_text("hi");
        let deco = tree.new_decoration("_phantom", Bias::Start);
        tree.attach(tree.root(), 0, t).unwrap();
        tree.attach(tree.root(), 1, deco).unwrap();

        assert_eq!(serialize(&tree), "<doc>hi</doc>");
    }
}
