//! Pipeline configuration file.
//!
//! # Example
//!
//! ```toml
//! [signer]
//! url = "http://127.0.0.1:8000/index.php"
//!
//! [submission]
//! summary_url = "https://ecf.example.gob.do/recepcionfc/api/recepcion/ecf"
//! archive_url = "https://ecf.example.gob.do/archivo/api/ecf"
//! reception_url = "https://ecf.example.gob.do/recepcion/api/ecf"
//! auth_token = "..."
//!
//! [credentials]
//! directory = "certs"
//!
//! [credentials.secrets]
//! 131880681 = "certificate-passphrase"
//!
//! [batch]
//! concurrency = 4
//! ```
//!
//! Missing secrets fall back to `ECF_CERT_SECRET_<TAXPAYER>`, a missing
//! submission token to `ECF_SUBMISSION_AUTH_TOKEN`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ecf_mapping::StandardSanitizer;
use serde::{Deserialize, Serialize};

use crate::collaborator::Collaborators;
use crate::credential::DirectoryCredentialResolver;
use crate::http::{HttpSigner, HttpSubmitter};
use crate::protocol::Route;
use crate::xml::XmlEncoder;

pub const AUTH_TOKEN_ENV: &str = "ECF_SUBMISSION_AUTH_TOKEN";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse '{origin}': {message}")]
    Parse { origin: String, message: String },

    #[error("invalid configuration: {}", problems.join("; "))]
    Invalid { problems: Vec<String> },
}

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub signer: SignerConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

/// `[signer]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignerConfig {
    pub url: Option<String>,
}

/// `[submission]` section: one endpoint per route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmissionConfig {
    /// Abbreviated documents.
    pub summary_url: Option<String>,
    /// Full documents that were summarized by an abbreviated document.
    pub archive_url: Option<String>,
    /// Every other full document.
    pub reception_url: Option<String>,
    pub auth_token: Option<String>,
}

impl SubmissionConfig {
    pub fn url(&self, route: Route) -> Option<&str> {
        match route {
            Route::Summary => self.summary_url.as_deref(),
            Route::Archive => self.archive_url.as_deref(),
            Route::Reception => self.reception_url.as_deref(),
        }
    }
}

/// `[credentials]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsConfig {
    /// Directory holding one `<taxpayer>.p12` per issuer.
    pub directory: Option<PathBuf>,
    /// Certificate secrets keyed by taxpayer id.
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,
}

/// `[batch]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}

// ── Functions ─────────────────────────────────────────────────────────────────

impl PipelineConfig {
    /// Read and parse a configuration file. Does not validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, "<inline>")
    }

    fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Check that every collaborator the pipeline needs can be built.
    ///
    /// Lists every problem rather than stopping at the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        match self.signer.url.as_deref() {
            None => problems.push("missing signer url -- set [signer] url".to_string()),
            Some(url) => check_url(&mut problems, "[signer] url", url),
        }

        for (route, key) in [
            (Route::Summary, "summary_url"),
            (Route::Archive, "archive_url"),
            (Route::Reception, "reception_url"),
        ] {
            match self.submission.url(route) {
                None => problems.push(format!(
                    "missing {} endpoint -- set [submission] {}",
                    route, key
                )),
                Some(url) => check_url(&mut problems, &format!("[submission] {}", key), url),
            }
        }

        if self.credentials.directory.is_none() {
            problems.push("missing certificate directory -- set [credentials] directory".into());
        }

        if self.batch.concurrency == 0 {
            problems.push("[batch] concurrency must be at least 1".into());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { problems })
        }
    }

    /// Validate, then build the default collaborators.
    pub fn collaborators(&self) -> Result<Collaborators, ConfigError> {
        self.validate()?;

        let directory = self.credentials.directory.clone().unwrap_or_default();
        let mut credentials = DirectoryCredentialResolver::new(directory);
        for (taxpayer, secret) in &self.credentials.secrets {
            credentials = credentials.with_secret(taxpayer, secret);
        }

        let signer_url = self.signer.url.clone().unwrap_or_default();
        let auth_token = self
            .submission
            .auth_token
            .clone()
            .or_else(|| std::env::var(AUTH_TOKEN_ENV).ok());

        Ok(Collaborators {
            sanitizer: Arc::new(StandardSanitizer),
            credentials: Arc::new(credentials),
            encoder: Arc::new(XmlEncoder::default()),
            signer: Arc::new(HttpSigner::new(signer_url)),
            submitter: Arc::new(HttpSubmitter::new(&self.submission, auth_token)),
        })
    }
}

fn check_url(problems: &mut Vec<String>, name: &str, url: &str) {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        problems.push(format!("{} must be an http(s) URL, got '{}'", name, url));
    }
}
