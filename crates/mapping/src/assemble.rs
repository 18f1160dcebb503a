//! Document assembly: walk a [`Layout`] against a [`FlatRecord`].
//!
//! Assembly produces the raw tree, absent fields included. Callers go
//! through [`build_full`] / [`build_abbreviated`], which also prune and
//! reject empty documents.

use crate::error::MappingError;
use crate::group::{reconstruct, Scope};
use crate::layout::{self, Element, Layout, Presence};
use crate::node::{Document, Node, Section};
use crate::prune::compact_document;
use crate::record::{FlatRecord, Scalar};
use crate::variant::{DocumentVariant, SecurityCode, SECURITY_CODE_FIELD};

/// Build the children of one section, in layout order, under `scope`.
pub fn build_section(elements: &[Element], record: &FlatRecord, scope: &Scope) -> Section {
    let mut section = Section::new();
    for element in elements {
        let (tag, node) = build_element(element, record, scope);
        section.push(tag, node);
    }
    section
}

fn build_element(element: &Element, record: &FlatRecord, scope: &Scope) -> (&'static str, Node) {
    match element {
        Element::Field(field) => {
            let node = record
                .get(&scope.key(field.key))
                .cloned()
                .map(Node::Scalar)
                .unwrap_or(Node::Absent);
            (field.tag, node)
        }
        Element::Section(spec) => {
            let present = match &spec.presence {
                Presence::Always => true,
                Presence::WhenAny(triggers) => {
                    triggers.iter().any(|t| record.has_value(&scope.key(t)))
                }
            };
            let node = if present {
                Node::Section(build_section(&spec.children, record, scope))
            } else {
                Node::Absent
            };
            (spec.tag, node)
        }
        Element::Group(spec) => {
            let node = match reconstruct(spec, record, scope) {
                Node::Absent => Node::Absent,
                entries => {
                    let mut container = Section::new();
                    container.push(spec.entry, entries);
                    Node::Section(container)
                }
            };
            (spec.container, node)
        }
    }
}

/// Assemble the unpruned root section of `layout`.
pub fn assemble(layout: &Layout, record: &FlatRecord) -> Section {
    build_section(&layout.elements, record, &Scope::root())
}

/// Assemble and prune the full document.
pub fn build_full(record: &FlatRecord) -> Result<Document, MappingError> {
    let root = assemble(layout::full(), record);
    compact_document(DocumentVariant::Full, root)
}

/// Assemble and prune the abbreviated document.
///
/// The security code comes from the signed full document, so this can only
/// be called once that document exists.
pub fn build_abbreviated(
    record: &FlatRecord,
    security_code: &SecurityCode,
) -> Result<Document, MappingError> {
    let record = record.with_field(SECURITY_CODE_FIELD, Scalar::text(security_code.as_str()));
    let root = assemble(layout::abbreviated(), &record);
    compact_document(DocumentVariant::Abbreviated, root)
}
