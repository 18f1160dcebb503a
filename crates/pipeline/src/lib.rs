//! ecf pipeline -- signs and submits the documents built by `ecf-mapping`.
//!
//! For each scenario of a batch:
//! 1. Normalize the raw record and build the full document
//! 2. Lease the issuer's signing credential
//! 3. Sign the full document and, for simplified invoices below the
//!    threshold, build and sign the abbreviated document from the full
//!    document's security code
//! 4. Submit the signed documents to their routes
//!
//! Every external dependency sits behind a trait in [`collaborator`]; the
//! defaults ([`DirectoryCredentialResolver`], [`XmlEncoder`], [`HttpSigner`],
//! [`HttpSubmitter`]) are wired from a [`PipelineConfig`].

pub mod batch;
pub mod collaborator;
pub mod config;
pub mod credential;
pub mod error;
pub mod http;
pub mod protocol;
pub mod signature;
pub mod xml;

pub use batch::{
    run_batch, run_scenario, BatchOptions, BatchSummary, RawScenario, ScenarioOutcome,
    ScenarioResult,
};
pub use collaborator::{
    Collaborators, Credential, CredentialLease, CredentialResolver, DocumentEncoder, Signer,
    Submitter,
};
pub use config::{ConfigError, PipelineConfig};
pub use credential::DirectoryCredentialResolver;
pub use error::{CollaboratorError, ScenarioError, Stage};
pub use http::{HttpSigner, HttpSubmitter};
pub use protocol::{file_name, taxpayer_id, Route, ScenarioContext, Submission};
pub use signature::{security_code, signature_value};
pub use xml::XmlEncoder;
