//! ecf mapping engine -- turns flat scenario records into electronic
//! invoice document trees.
//!
//! A scenario is one flat JSON object whose repeated groups are spelled as
//! indexed keys (`FormaPago[2]`, `TipoCodigo[1][3]`). The engine:
//! 1. Normalizes the raw object into a [`FlatRecord`] (denylist + sanitizer)
//! 2. Walks a declarative [`Layout`], rebuilding every repeated group from
//!    its [`GroupSpec`]
//! 3. Prunes empty structure and rejects documents with nothing left
//!
//! Two layouts exist: the full document and the abbreviated summary that
//! simplified invoices below the threshold also need. The abbreviated
//! document can only be built from a [`SecurityCode`], which is derived from
//! the signed full document.

pub mod assemble;
pub mod error;
pub mod group;
pub mod layout;
pub mod node;
pub mod prune;
pub mod record;
pub mod variant;

pub use assemble::{assemble, build_abbreviated, build_full};
pub use error::MappingError;
pub use group::{reconstruct, EntryShape, GroupPresence, GroupSpec, Inclusion, KeyForm, Scope};
pub use layout::{Element, Layout};
pub use node::{Document, Node, Section};
pub use prune::{compact, compact_document};
pub use record::{normalize, FlatRecord, Sanitizer, Scalar, StandardSanitizer};
pub use variant::{requires_abbreviated, DocumentVariant, SecurityCode};

/// Normalize a raw scenario and build its full document in one step.
pub fn map_scenario(
    raw: &serde_json::Map<String, serde_json::Value>,
    sanitizer: &dyn Sanitizer,
) -> Result<(FlatRecord, Document), MappingError> {
    let record = normalize(raw, sanitizer)?;
    let document = build_full(&record)?;
    Ok((record, document))
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn map_scenario_normalizes_then_builds() {
        let raw = serde_json::json!({
            "EmpresaID": "internal-7",
            "estatus": "ready",
            "Version": "1.0",
            "TipoeCF": 31,
            "ENCF": " E310000000005 ",
        });
        let (record, document) = map_scenario(raw.as_object().unwrap(), &StandardSanitizer).unwrap();

        assert!(record.get("EmpresaID").is_none());
        assert_eq!(
            document
                .at(&["Encabezado", "IdDoc", "eNCF"])
                .and_then(Node::as_scalar),
            Some(&Scalar::text("E310000000005"))
        );
        assert_eq!(
            serde_json::to_value(&document).unwrap()["ECF"]["Encabezado"]["IdDoc"]["TipoeCF"],
            serde_json::json!(31)
        );
    }
}
