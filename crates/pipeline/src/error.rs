use std::fmt;

use ecf_mapping::{DocumentVariant, MappingError};

use crate::protocol::Route;

/// Failure reported by an external collaborator (credential resolver,
/// encoder, signer, submitter) or by the sanitizer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// The collaborator is missing configuration (URL, secret, file).
    #[error("not configured: {message}")]
    Config { message: String },

    /// The value handed to the collaborator was refused before any call.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The request never produced a response.
    #[error("transport failure: {message}")]
    Transport { message: String },

    /// The remote end answered with a non-success status.
    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// A response arrived but could not be read.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },
}

/// Pipeline stage a collaborator failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalize,
    Credential,
    Encode(DocumentVariant),
    Sign(DocumentVariant),
    Submit(Route),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Normalize => write!(f, "normalization"),
            Stage::Credential => write!(f, "credential resolution"),
            Stage::Encode(variant) => write!(f, "encoding of the {} document", variant),
            Stage::Sign(variant) => write!(f, "signing of the {} document", variant),
            Stage::Submit(route) => write!(f, "submission to the {} endpoint", route),
        }
    }
}

/// Everything that can fail one scenario. Never escapes the batch: the
/// orchestrator turns it into an error result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScenarioError {
    /// Pruning left nothing to serialize.
    #[error("no valid data to build the {variant} document")]
    EmptyDocument { variant: DocumentVariant },

    /// The signed full document has no signature value to derive the
    /// security code from, and the abbreviated document is required.
    #[error("could not extract a SignatureValue from the signed full document")]
    MissingSignatureArtifact,

    /// A field the protocol itself needs is absent from the scenario.
    #[error("scenario has no value for '{field}'")]
    MissingField { field: &'static str },

    #[error("{stage} failed: {source}")]
    Collaborator {
        stage: Stage,
        #[source]
        source: CollaboratorError,
    },
}

impl ScenarioError {
    pub fn collaborator(stage: Stage, source: CollaboratorError) -> Self {
        ScenarioError::Collaborator { stage, source }
    }
}

impl From<MappingError> for ScenarioError {
    fn from(err: MappingError) -> Self {
        match err {
            MappingError::EmptyDocument { variant } => ScenarioError::EmptyDocument { variant },
            MappingError::Unsanitizable { key, reason } => ScenarioError::Collaborator {
                stage: Stage::Normalize,
                source: CollaboratorError::InvalidInput {
                    message: format!("field '{}': {}", key, reason),
                },
            },
        }
    }
}
