//! Repeated-group reconstruction.
//!
//! Every repeated structure of the document (payment methods, line items,
//! sub-discounts, pages, ...) is described by one [`GroupSpec`]. A single
//! routine, [`reconstruct`], turns a group description plus a flat record
//! into an ordered list of entries.

use std::collections::BTreeSet;

use crate::assemble::build_section;
use crate::layout::Element;
use crate::node::Node;
use crate::prune::compact;
use crate::record::FlatRecord;

// ── Scope ────────────────────────────────────────────────────────────────────

/// How indices are spelled in flat keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyForm {
    /// `Base[i]`, `Base[i][j]`
    Bracketed,
    /// `Basei` (single level only)
    Suffixed,
}

/// The index path a field name is resolved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    indices: Vec<u32>,
    form: KeyForm,
}

impl Scope {
    pub fn root() -> Self {
        Scope {
            indices: Vec::new(),
            form: KeyForm::Bracketed,
        }
    }

    pub fn child(&self, index: u32, form: KeyForm) -> Self {
        let mut indices = self.indices.clone();
        indices.push(index);
        Scope { indices, form }
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Flat key for `base` at this scope.
    pub fn key(&self, base: &str) -> String {
        let mut key = base.to_string();
        for index in &self.indices {
            match self.form {
                KeyForm::Bracketed => key.push_str(&format!("[{}]", index)),
                KeyForm::Suffixed => key.push_str(&index.to_string()),
            }
        }
        key
    }
}

// ── GroupSpec ────────────────────────────────────────────────────────────────

/// When an entry is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inclusion {
    /// At least one field of the entry, at any depth, is non-empty.
    AnyField,
    /// Every named field is non-empty.
    AllOf(Vec<&'static str>),
    /// The lead field is non-empty and so is at least one of the others.
    Lead {
        field: &'static str,
        any_of: Vec<&'static str>,
    },
}

/// Whether the group container is built at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupPresence {
    Always,
    /// Only when entry 1's named field is non-empty.
    LeadEntry(&'static str),
}

/// What one entry of the group looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryShape {
    /// Each entry is a bare scalar read from this key base.
    Value(&'static str),
    /// Each entry is a section built from these elements.
    Record(Vec<Element>),
}

/// Declarative description of one repeated structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    /// Element wrapping the entries, e.g. `TablaFormasPago`.
    pub container: &'static str,
    /// Element of each entry, e.g. `FormaDePago`.
    pub entry: &'static str,
    /// Highest index ever read.
    pub bound: u32,
    pub form: KeyForm,
    pub presence: GroupPresence,
    pub inclusion: Inclusion,
    pub shape: EntryShape,
}

impl GroupSpec {
    /// Key bases at this group's own depth. Nested groups are excluded since
    /// their keys live one level deeper.
    pub fn key_bases(&self) -> Vec<&'static str> {
        match &self.shape {
            EntryShape::Value(key) => vec![*key],
            EntryShape::Record(children) => {
                let mut bases = Vec::new();
                collect_field_keys(children, &mut bases);
                bases
            }
        }
    }

    /// Indices present in the record for this group under `scope`, ascending
    /// and capped at the bound.
    pub fn present_indices(&self, record: &FlatRecord, scope: &Scope) -> BTreeSet<u32> {
        let bases = self.key_bases();
        match self.form {
            KeyForm::Bracketed => bases
                .iter()
                .flat_map(|base| record.indices_under(base, scope.indices()))
                .filter(|i| *i <= self.bound)
                .collect(),
            KeyForm::Suffixed => (1..=self.bound)
                .filter(|i| {
                    let entry = scope.child(*i, KeyForm::Suffixed);
                    bases.iter().any(|base| record.get(&entry.key(base)).is_some())
                })
                .collect(),
        }
    }

    fn build_entry(&self, record: &FlatRecord, scope: &Scope) -> Option<Node> {
        match &self.shape {
            EntryShape::Value(key) => record.value(&scope.key(key)).cloned().map(Node::Scalar),
            EntryShape::Record(children) => {
                let entry = Node::Section(build_section(children, record, scope));
                if self.includes(&entry, record, scope) {
                    Some(entry)
                } else {
                    None
                }
            }
        }
    }

    fn includes(&self, entry: &Node, record: &FlatRecord, scope: &Scope) -> bool {
        match &self.inclusion {
            Inclusion::AnyField => !compact(entry.clone()).is_absent(),
            Inclusion::AllOf(fields) => fields.iter().all(|f| record.has_value(&scope.key(f))),
            Inclusion::Lead { field, any_of } => {
                record.has_value(&scope.key(field))
                    && any_of.iter().any(|f| record.has_value(&scope.key(f)))
            }
        }
    }
}

fn collect_field_keys(elements: &[Element], out: &mut Vec<&'static str>) {
    for element in elements {
        match element {
            Element::Field(field) => out.push(field.key),
            Element::Section(section) => collect_field_keys(&section.children, out),
            Element::Group(_) => {}
        }
    }
}

/// Rebuild a repeated group from indexed keys.
///
/// Entries follow ascending index order regardless of how the record
/// enumerates its keys. Gaps in the indices are skipped, not filled. The
/// result is a non-empty [`Node::List`] or [`Node::Absent`].
pub fn reconstruct(spec: &GroupSpec, record: &FlatRecord, scope: &Scope) -> Node {
    if let GroupPresence::LeadEntry(lead) = spec.presence {
        let first = scope.child(1, spec.form);
        if !record.has_value(&first.key(lead)) {
            return Node::Absent;
        }
    }

    let entries: Vec<Node> = spec
        .present_indices(record, scope)
        .into_iter()
        .filter_map(|index| spec.build_entry(record, &scope.child(index, spec.form)))
        .collect();

    if entries.is_empty() {
        Node::Absent
    } else {
        Node::List(entries)
    }
}
