//! Document tree nodes.
//!
//! A [`Node`] is a scalar, an ordered list (a reconstructed group), a
//! section (an ordered mapping of tag to node) or absent. Sections keep the
//! order in which the layout declares their children, which is the order the
//! schema requires on the wire.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::record::Scalar;
use crate::variant::DocumentVariant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Absent,
    Scalar(Scalar),
    List(Vec<Node>),
    Section(Section),
}

impl Node {
    pub fn is_absent(&self) -> bool {
        matches!(self, Node::Absent)
    }

    pub fn as_section(&self) -> Option<&Section> {
        match self {
            Node::Section(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Follow a path of section tags.
    pub fn at(&self, path: &[&str]) -> Option<&Node> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self.as_section()?.get(head)?.at(rest),
        }
    }
}

/// Ordered mapping of element tag to child node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    entries: Vec<(String, Node)>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: impl Into<String>, node: Node) {
        self.entries.push((tag.into(), node));
    }

    pub fn get(&self, tag: &str) -> Option<&Node> {
        self.entries.iter().find(|(t, _)| t == tag).map(|(_, n)| n)
    }

    /// Follow a path of section tags starting at this section.
    pub fn at(&self, path: &[&str]) -> Option<&Node> {
        let (head, rest) = path.split_first()?;
        self.get(head)?.at(rest)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(t, n)| (t.as_str(), n))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, Node)> {
        self.entries
    }
}

impl FromIterator<(String, Node)> for Section {
    fn from_iter<I: IntoIterator<Item = (String, Node)>>(iter: I) -> Self {
        Section {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A compacted document tree for one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub variant: DocumentVariant,
    pub root: Section,
}

impl Document {
    pub fn at(&self, path: &[&str]) -> Option<&Node> {
        self.root.at(path)
    }
}

// ── JSON rendering ───────────────────────────────────────────────────────────

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Absent => serializer.serialize_none(),
            Node::Scalar(s) => s.serialize(serializer),
            Node::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Section(section) => section.serialize(serializer),
        }
    }
}

impl Serialize for Section {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (tag, node) in &self.entries {
            map.serialize_entry(tag, node)?;
        }
        map.end()
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.variant.root_tag(), &self.root)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(s: &str) -> Node {
        Node::Scalar(Scalar::text(s))
    }

    #[test]
    fn path_lookup_walks_sections() {
        let mut inner = Section::new();
        inner.push("TipoeCF", leaf("31"));
        let mut root = Section::new();
        root.push("IdDoc", Node::Section(inner));

        assert_eq!(root.at(&["IdDoc", "TipoeCF"]), Some(&leaf("31")));
        assert_eq!(root.at(&["IdDoc", "Missing"]), None);
        assert_eq!(root.at(&[]), None);
    }

    #[test]
    fn json_rendering_keeps_declared_order() {
        let mut root = Section::new();
        root.push("Zeta", leaf("1"));
        root.push("Alpha", Node::List(vec![leaf("a"), leaf("b")]));
        root.push("Gone", Node::Absent);

        let rendered = serde_json::to_string(&root).unwrap();
        assert_eq!(rendered, r#"{"Zeta":"1","Alpha":["a","b"],"Gone":null}"#);
    }
}
