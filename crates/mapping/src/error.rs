use crate::variant::DocumentVariant;

/// Errors raised while turning a flat record into a document tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    /// The sanitizer refused a field value.
    #[error("field '{key}' could not be sanitized: {reason}")]
    Unsanitizable { key: String, reason: String },

    /// Pruning left nothing to serialize.
    #[error("no valid data to build the {variant} document")]
    EmptyDocument { variant: DocumentVariant },
}
