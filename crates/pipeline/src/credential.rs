//! Certificate directory credential resolver.
//!
//! Each issuer's certificate lives at `<directory>/<taxpayer>.p12`. A lease
//! hands the signer a private scratch copy, deleted when the lease is
//! released, so concurrent scenarios never share a file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::collaborator::{Credential, CredentialLease, CredentialResolver};
use crate::error::CollaboratorError;

pub const CERTIFICATE_EXTENSION: &str = "p12";

/// Resolves credentials from a certificate directory.
///
/// Secret lookup order:
/// 1. Secrets registered with [`DirectoryCredentialResolver::with_secret`]
/// 2. Environment variable `ECF_CERT_SECRET_<TAXPAYER>`
#[derive(Debug, Clone)]
pub struct DirectoryCredentialResolver {
    directory: PathBuf,
    secrets: BTreeMap<String, String>,
}

impl DirectoryCredentialResolver {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        DirectoryCredentialResolver {
            directory: directory.into(),
            secrets: BTreeMap::new(),
        }
    }

    pub fn with_secret(mut self, taxpayer_id: &str, secret: &str) -> Self {
        self.secrets
            .insert(taxpayer_id.to_string(), secret.to_string());
        self
    }

    fn env_var_name(taxpayer_id: &str) -> String {
        format!("ECF_CERT_SECRET_{}", taxpayer_id.to_uppercase())
    }

    fn secret_for(&self, taxpayer_id: &str) -> Option<String> {
        self.secrets
            .get(taxpayer_id)
            .cloned()
            .or_else(|| std::env::var(Self::env_var_name(taxpayer_id)).ok())
    }

    fn certificate_path(&self, taxpayer_id: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{}", taxpayer_id, CERTIFICATE_EXTENSION))
    }
}

/// Taxpayer ids end up in a file name; keep them to plain identifiers.
fn check_taxpayer_id(taxpayer_id: &str) -> Result<(), CollaboratorError> {
    if !taxpayer_id.is_empty() && taxpayer_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        Ok(())
    } else {
        Err(CollaboratorError::InvalidInput {
            message: format!("'{}' is not a valid taxpayer id", taxpayer_id),
        })
    }
}

#[async_trait]
impl CredentialResolver for DirectoryCredentialResolver {
    async fn resolve(&self, taxpayer_id: &str) -> Result<CredentialLease, CollaboratorError> {
        check_taxpayer_id(taxpayer_id)?;

        let source = self.certificate_path(taxpayer_id);
        let secret = self
            .secret_for(taxpayer_id)
            .ok_or_else(|| CollaboratorError::Config {
                message: format!(
                    "no certificate secret for taxpayer '{}' (set it under [credentials.secrets] or {})",
                    taxpayer_id,
                    Self::env_var_name(taxpayer_id)
                ),
            })?;

        let scratch = tokio::task::spawn_blocking(move || {
            if !source.is_file() {
                return Err(CollaboratorError::Config {
                    message: format!("certificate '{}' not found", source.display()),
                });
            }
            let scratch = tempfile::Builder::new()
                .prefix("ecf-cert-")
                .suffix(&format!(".{}", CERTIFICATE_EXTENSION))
                .tempfile()
                .map_err(|e| CollaboratorError::Transport {
                    message: format!("could not create scratch certificate: {}", e),
                })?
                .into_temp_path();
            std::fs::copy(&source, &scratch).map_err(|e| CollaboratorError::Transport {
                message: format!("could not copy '{}': {}", source.display(), e),
            })?;
            Ok(scratch)
        })
        .await
        .map_err(|e| CollaboratorError::Transport {
            message: format!("task join error: {}", e),
        })??;

        let credential = Credential {
            reference: scratch.display().to_string(),
            secret,
        };
        tracing::debug!(taxpayer = taxpayer_id, certificate = %credential.reference, "credential leased");

        let taxpayer = taxpayer_id.to_string();
        Ok(CredentialLease::new(credential, move || {
            if let Err(e) = scratch.close() {
                tracing::warn!(taxpayer = %taxpayer, error = %e, "could not remove scratch certificate");
            }
        }))
    }
}
