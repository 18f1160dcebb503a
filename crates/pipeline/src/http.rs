//! HTTP signer and submitter.
//!
//! Both use `ureq` (sync) wrapped in `tokio::task::spawn_blocking` so the
//! blocking calls never stall the async runtime. Non-success statuses are
//! read rather than raised so the response body ends up in the error.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::json;

use crate::collaborator::{Credential, Signer, Submitter};
use crate::config::SubmissionConfig;
use crate::error::CollaboratorError;
use crate::protocol::Route;

fn agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .into()
}

/// POST `body` as JSON and return the status and the body text.
fn post_json(
    url: &str,
    body: &serde_json::Value,
    auth_token: Option<&str>,
) -> Result<(u16, String), CollaboratorError> {
    let mut request = agent().post(url);
    if let Some(token) = auth_token {
        request = request.header("Authorization", &format!("Bearer {}", token));
    }
    let response = request
        .send_json(body)
        .map_err(|e| CollaboratorError::Transport {
            message: format!("POST {}: {}", url, e),
        })?;
    let status = response.status().as_u16();
    let text = response
        .into_body()
        .read_to_string()
        .map_err(|e| CollaboratorError::InvalidResponse {
            message: format!("could not read response from {}: {}", url, e),
        })?;
    Ok((status, text))
}

fn expect_success(status: u16, body: String) -> Result<String, CollaboratorError> {
    if (200..300).contains(&status) {
        Ok(body)
    } else {
        Err(CollaboratorError::Rejected { status, body })
    }
}

/// Interpret a submission response: JSON bodies stay JSON, anything else is
/// kept as a JSON string.
pub fn response_value(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|_| serde_json::Value::String(body.to_string()))
}

// ── Signer ───────────────────────────────────────────────────────────────────

/// Signing service client.
///
/// Sends `{xmlContent, certPath, certPassword}` and expects the signed XML
/// back as the response body.
#[derive(Debug, Clone)]
pub struct HttpSigner {
    url: String,
}

impl HttpSigner {
    pub fn new(url: impl Into<String>) -> Self {
        HttpSigner { url: url.into() }
    }

    pub fn request_body(xml: &str, credential: &Credential) -> serde_json::Value {
        json!({
            "xmlContent": xml,
            "certPath": credential.reference,
            "certPassword": credential.secret,
        })
    }
}

#[async_trait]
impl Signer for HttpSigner {
    async fn sign(&self, xml: &str, credential: &Credential) -> Result<String, CollaboratorError> {
        let url = self.url.clone();
        let body = Self::request_body(xml, credential);

        let (status, text) = tokio::task::spawn_blocking(move || post_json(&url, &body, None))
            .await
            .map_err(|e| CollaboratorError::Transport {
                message: format!("task join error: {}", e),
            })??;

        let signed = expect_success(status, text)?;
        if signed.trim().is_empty() {
            return Err(CollaboratorError::InvalidResponse {
                message: "signer returned an empty document".into(),
            });
        }
        Ok(signed)
    }
}

// ── Submitter ────────────────────────────────────────────────────────────────

/// Submission endpoints client, one URL per [`Route`].
///
/// Sends `{fileName, xmlContent}` with an optional bearer token.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    endpoints: BTreeMap<Route, String>,
    auth_token: Option<String>,
}

impl HttpSubmitter {
    pub fn new(config: &SubmissionConfig, auth_token: Option<String>) -> Self {
        let endpoints = Route::ALL
            .into_iter()
            .filter_map(|route| config.url(route).map(|url| (route, url.to_string())))
            .collect();
        HttpSubmitter {
            endpoints,
            auth_token,
        }
    }

    pub fn endpoint(&self, route: Route) -> Option<&str> {
        self.endpoints.get(&route).map(String::as_str)
    }

    pub fn request_body(signed_xml: &str, file_name: &str) -> serde_json::Value {
        json!({
            "fileName": file_name,
            "xmlContent": signed_xml,
        })
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(
        &self,
        route: Route,
        signed_xml: &str,
        file_name: &str,
    ) -> Result<serde_json::Value, CollaboratorError> {
        let url = self
            .endpoint(route)
            .ok_or_else(|| CollaboratorError::Config {
                message: format!("no endpoint configured for the {} route", route),
            })?
            .to_string();
        let body = Self::request_body(signed_xml, file_name);
        let auth_token = self.auth_token.clone();

        let (status, text) = tokio::task::spawn_blocking(move || {
            post_json(&url, &body, auth_token.as_deref())
        })
        .await
        .map_err(|e| CollaboratorError::Transport {
            message: format!("task join error: {}", e),
        })??;

        expect_success(status, text).map(|body| response_value(&body))
    }
}
