//! Recursive compaction of document trees.
//!
//! Post-order: children are compacted before their parent decides whether
//! anything is left. After compaction no list is empty, no section is empty
//! and no scalar is empty.

use crate::error::MappingError;
use crate::node::{Document, Node, Section};
use crate::variant::DocumentVariant;

/// Compact a node. Returns [`Node::Absent`] when nothing meaningful remains.
pub fn compact(node: Node) -> Node {
    match node {
        Node::Absent => Node::Absent,
        Node::Scalar(s) if s.is_empty() => Node::Absent,
        Node::Scalar(s) => Node::Scalar(s),
        Node::List(items) => {
            let kept: Vec<Node> = items
                .into_iter()
                .map(compact)
                .filter(|n| !n.is_absent())
                .collect();
            if kept.is_empty() {
                Node::Absent
            } else {
                Node::List(kept)
            }
        }
        Node::Section(section) => match compact_section(section) {
            Some(section) => Node::Section(section),
            None => Node::Absent,
        },
    }
}

/// Compact a section, returning `None` when every child was dropped.
pub fn compact_section(section: Section) -> Option<Section> {
    let kept: Section = section
        .into_entries()
        .into_iter()
        .filter_map(|(tag, node)| match compact(node) {
            Node::Absent => None,
            node => Some((tag, node)),
        })
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept)
    }
}

/// Compact an assembled root into a [`Document`], failing if nothing is left.
pub fn compact_document(variant: DocumentVariant, root: Section) -> Result<Document, MappingError> {
    let root = compact_section(root).ok_or(MappingError::EmptyDocument { variant })?;
    Ok(Document { variant, root })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::build_full;
    use crate::record::{normalize, Sanitizer, Scalar};

    fn leaf(s: &str) -> Node {
        Node::Scalar(Scalar::text(s))
    }

    fn section(entries: Vec<(&str, Node)>) -> Node {
        Node::Section(entries.into_iter().map(|(t, n)| (t.to_string(), n)).collect())
    }

    #[test]
    fn empty_scalars_become_absent() {
        assert_eq!(compact(leaf("")), Node::Absent);
        assert_eq!(compact(leaf("  ")), leaf("  "));
        assert_eq!(compact(leaf("0")), leaf("0"));
    }

    struct KeepEverything;

    impl Sanitizer for KeepEverything {
        fn sanitize(&self, _key: &str, value: &serde_json::Value) -> Result<Option<Scalar>, String> {
            Ok(value.as_str().map(Scalar::text))
        }
    }

    #[test]
    fn whitespace_kept_by_the_sanitizer_survives_pruning() {
        let raw = serde_json::json!({ "RazonSocialEmisor": " ", "Version": "" });
        let record = normalize(raw.as_object().unwrap(), &KeepEverything).unwrap();
        let document = build_full(&record).unwrap();

        assert_eq!(
            document
                .at(&["Encabezado", "Emisor", "RazonSocialEmisor"])
                .and_then(Node::as_scalar),
            Some(&Scalar::text(" "))
        );
        assert!(document.at(&["Encabezado", "Version"]).is_none());
    }

    #[test]
    fn sections_of_absent_children_collapse() {
        let node = section(vec![
            ("A", Node::Absent),
            ("B", section(vec![("C", leaf(""))])),
        ]);
        assert_eq!(compact(node), Node::Absent);
    }

    #[test]
    fn lists_drop_absent_entries_and_collapse_when_empty() {
        let node = Node::List(vec![leaf(""), section(vec![("X", leaf("1"))]), Node::Absent]);
        assert_eq!(
            compact(node),
            Node::List(vec![section(vec![("X", leaf("1"))])])
        );
        assert_eq!(compact(Node::List(vec![Node::Absent, leaf("")])), Node::Absent);
    }

    #[test]
    fn partially_filled_sections_keep_order() {
        let node = section(vec![
            ("First", leaf("1")),
            ("Empty", leaf("")),
            ("Third", leaf("3")),
        ]);
        assert_eq!(
            compact(node),
            section(vec![("First", leaf("1")), ("Third", leaf("3"))])
        );
    }

    #[test]
    fn empty_root_is_rejected() {
        let root: Section = vec![("Encabezado".to_string(), section(vec![("Version", leaf(""))]))]
            .into_iter()
            .collect();
        assert_eq!(
            compact_document(DocumentVariant::Full, root),
            Err(MappingError::EmptyDocument {
                variant: DocumentVariant::Full
            })
        );
    }

    #[test]
    fn compaction_is_idempotent_on_a_mixed_tree() {
        let node = section(vec![
            ("A", Node::List(vec![leaf("x"), leaf("")])),
            ("B", section(vec![("C", Node::List(vec![]))])),
            ("D", leaf("d")),
        ]);
        let once = compact(node);
        assert_eq!(compact(once.clone()), once);
    }
}
