//! Collaborator seams of the pipeline.
//!
//! Everything that touches the outside world sits behind a trait here:
//! - [`CredentialResolver`] leases a per-taxpayer signing credential
//! - [`DocumentEncoder`] renders a document tree as XML text
//! - [`Signer`] signs that text with the leased credential
//! - [`Submitter`] delivers signed text to one of the submission routes
//!
//! [`Collaborators`] bundles one implementation of each (plus the scalar
//! sanitizer) so a batch can share them across scenarios.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use ecf_mapping::{Document, Sanitizer};

use crate::error::CollaboratorError;
use crate::protocol::Route;

// ── Credential lease ─────────────────────────────────────────────────────────

/// Reference to a signing certificate plus its secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Location the signer can load the certificate from.
    pub reference: String,
    pub secret: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("reference", &self.reference)
            .field("secret", &"<redacted>")
            .finish()
    }
}

type ReleaseFn = Box<dyn FnOnce() + Send + Sync>;

/// A credential scoped to one scenario.
///
/// The release action runs exactly once: on [`CredentialLease::release`]
/// or, failing that, when the lease is dropped.
pub struct CredentialLease {
    credential: Credential,
    release: Option<ReleaseFn>,
}

impl CredentialLease {
    pub fn new(credential: Credential, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        CredentialLease {
            credential,
            release: Some(Box::new(release)),
        }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Release the credential now.
    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for CredentialLease {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl fmt::Debug for CredentialLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialLease")
            .field("credential", &self.credential)
            .field("released", &self.release.is_none())
            .finish()
    }
}

// ── Traits ───────────────────────────────────────────────────────────────────

/// Leases the signing credential of one taxpayer.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(&self, taxpayer_id: &str) -> Result<CredentialLease, CollaboratorError>;
}

/// Renders a document tree to the text that gets signed.
pub trait DocumentEncoder: Send + Sync {
    fn encode(&self, document: &Document) -> Result<String, CollaboratorError>;
}

/// Signs encoded document text and returns the signed text.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, xml: &str, credential: &Credential) -> Result<String, CollaboratorError>;
}

/// Delivers a signed document to a submission route.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        route: Route,
        signed_xml: &str,
        file_name: &str,
    ) -> Result<serde_json::Value, CollaboratorError>;
}

/// One implementation of every collaborator, shared across a batch.
#[derive(Clone)]
pub struct Collaborators {
    pub sanitizer: Arc<dyn Sanitizer>,
    pub credentials: Arc<dyn CredentialResolver>,
    pub encoder: Arc<dyn DocumentEncoder>,
    pub signer: Arc<dyn Signer>,
    pub submitter: Arc<dyn Submitter>,
}
