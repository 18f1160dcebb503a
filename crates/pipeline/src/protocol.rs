//! Per-scenario signing and submission protocol.
//!
//! One scenario moves through an explicit state machine:
//!
//! ```text
//! BuildFull -> Acquire -> SignFull -+-> Submit -> Done
//!                                   |      ^
//!                                   +-> BuildAbbreviated -> SignAbbreviated
//! ```
//!
//! The credential is leased between building and signing the full document
//! and travels with the run until submission, so an empty scenario never
//! reaches the resolver or the signer.
//!
//! The abbreviated branch is taken iff the scenario is a simplified invoice
//! below the threshold. It needs the security code from the signed full
//! document, so it can only start after `SignFull`. Any failure ends the
//! scenario; there is no partial success.
//!
//! Routing uses the same gate. When the abbreviated document exists it goes
//! to the summary route first, then the full document goes to the archive
//! route. Otherwise the full document goes to the reception route. Exactly
//! one full-document submission happens either way.

use std::fmt;

use ecf_mapping::{
    build_abbreviated, build_full, requires_abbreviated, Document, DocumentVariant, FlatRecord,
};
use serde::{Deserialize, Serialize};

use crate::collaborator::{Collaborators, CredentialLease};
use crate::error::{ScenarioError, Stage};
use crate::signature::security_code;

pub const CASE_FIELD: &str = "CasoPrueba";
pub const DOCUMENT_NUMBER_FIELD: &str = "ENCF";
pub const TAXPAYER_FIELD: &str = "RNCEmisor";

// ── Routes and submissions ───────────────────────────────────────────────────

/// Submission endpoint kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Abbreviated documents.
    Summary,
    /// Full documents that also have an abbreviated document.
    Archive,
    /// Every other full document.
    Reception,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Summary, Route::Archive, Route::Reception];

    /// Route for a full document, given whether it was summarized.
    pub fn for_full(abbreviated: bool) -> Route {
        if abbreviated {
            Route::Archive
        } else {
            Route::Reception
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Summary => write!(f, "summary"),
            Route::Archive => write!(f, "archive"),
            Route::Reception => write!(f, "reception"),
        }
    }
}

/// One delivered document and what the endpoint answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub document: DocumentVariant,
    pub route: Route,
    pub file_name: String,
    pub response: serde_json::Value,
}

// ── Scenario identity ────────────────────────────────────────────────────────

/// File name both documents of a scenario are submitted under.
///
/// `<CasoPrueba>.xml`, falling back to `<ENCF>.xml`.
pub fn file_name(record: &FlatRecord) -> Result<String, ScenarioError> {
    record
        .text(CASE_FIELD)
        .or_else(|| record.text(DOCUMENT_NUMBER_FIELD))
        .map(|stem| format!("{}.xml", stem))
        .ok_or(ScenarioError::MissingField { field: CASE_FIELD })
}

/// Issuer taxpayer id, used to resolve the signing credential.
pub fn taxpayer_id(record: &FlatRecord) -> Result<String, ScenarioError> {
    record.text(TAXPAYER_FIELD).ok_or(ScenarioError::MissingField {
        field: TAXPAYER_FIELD,
    })
}

// ── State machine ────────────────────────────────────────────────────────────

/// Identity and credential of a scenario once it is known to have a
/// document worth signing. Dropping it releases the credential.
struct Session {
    file_name: String,
    lease: CredentialLease,
}

/// A signed document waiting for submission.
struct Signed {
    variant: DocumentVariant,
    route: Route,
    xml: String,
}

enum State {
    BuildFull,
    Acquire(Document),
    SignFull(Session, Document),
    BuildAbbreviated(Session, String),
    SignAbbreviated(Session, Document, String),
    Submit(Session, Vec<Signed>),
    Done(Vec<Submission>),
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::BuildFull => "build_full",
            State::Acquire(_) => "acquire_credential",
            State::SignFull(..) => "sign_full",
            State::BuildAbbreviated(..) => "build_abbreviated",
            State::SignAbbreviated(..) => "sign_abbreviated",
            State::Submit(..) => "submit",
            State::Done(_) => "done",
        }
    }
}

/// One scenario's protocol run.
pub struct ScenarioContext<'a> {
    record: &'a FlatRecord,
    collaborators: &'a Collaborators,
    abbreviated: bool,
    label: String,
}

impl<'a> ScenarioContext<'a> {
    pub fn new(record: &'a FlatRecord, collaborators: &'a Collaborators) -> Self {
        let label = record
            .text(CASE_FIELD)
            .or_else(|| record.text(DOCUMENT_NUMBER_FIELD))
            .unwrap_or_else(|| "<unnamed>".to_string());
        ScenarioContext {
            record,
            collaborators,
            abbreviated: requires_abbreviated(record),
            label,
        }
    }

    /// Run the protocol to completion.
    ///
    /// Returns the submissions in the order they were made. The credential
    /// is leased only once the full document is known to be non-empty, and
    /// is released exactly once whichever state the run ends in.
    pub async fn run(&self) -> Result<Vec<Submission>, ScenarioError> {
        let mut state = State::BuildFull;
        loop {
            tracing::debug!(scenario = %self.label, state = state.name(), "protocol step");
            state = match state {
                State::Done(submissions) => return Ok(submissions),
                other => self.step(other).await?,
            };
        }
    }

    async fn step(&self, state: State) -> Result<State, ScenarioError> {
        match state {
            State::BuildFull => Ok(State::Acquire(build_full(self.record)?)),

            State::Acquire(document) => {
                let file_name = file_name(self.record)?;
                let taxpayer = taxpayer_id(self.record)?;
                let lease = self
                    .collaborators
                    .credentials
                    .resolve(&taxpayer)
                    .await
                    .map_err(|e| ScenarioError::collaborator(Stage::Credential, e))?;
                Ok(State::SignFull(Session { file_name, lease }, document))
            }

            State::SignFull(session, document) => {
                let signed_full = self.sign(&document, &session).await?;
                if self.abbreviated {
                    tracing::info!(
                        scenario = %self.label,
                        "simplified invoice below threshold, abbreviated document required"
                    );
                    Ok(State::BuildAbbreviated(session, signed_full))
                } else {
                    let full = Signed {
                        variant: DocumentVariant::Full,
                        route: Route::for_full(false),
                        xml: signed_full,
                    };
                    Ok(State::Submit(session, vec![full]))
                }
            }

            State::BuildAbbreviated(session, signed_full) => {
                let code = security_code(&signed_full)?;
                tracing::debug!(scenario = %self.label, security_code = %code, "security code extracted");
                let document = build_abbreviated(self.record, &code)?;
                Ok(State::SignAbbreviated(session, document, signed_full))
            }

            State::SignAbbreviated(session, document, signed_full) => {
                let signed_abbreviated = self.sign(&document, &session).await?;
                let queue = vec![
                    Signed {
                        variant: DocumentVariant::Abbreviated,
                        route: Route::Summary,
                        xml: signed_abbreviated,
                    },
                    Signed {
                        variant: DocumentVariant::Full,
                        route: Route::for_full(true),
                        xml: signed_full,
                    },
                ];
                Ok(State::Submit(session, queue))
            }

            State::Submit(session, queue) => {
                let mut submissions = Vec::with_capacity(queue.len());
                for signed in queue {
                    submissions.push(self.submit(&session, signed).await?);
                }
                session.lease.release();
                Ok(State::Done(submissions))
            }

            done @ State::Done(_) => Ok(done),
        }
    }

    async fn sign(&self, document: &Document, session: &Session) -> Result<String, ScenarioError> {
        let variant = document.variant;
        let xml = self
            .collaborators
            .encoder
            .encode(document)
            .map_err(|e| ScenarioError::collaborator(Stage::Encode(variant), e))?;
        let signed = self
            .collaborators
            .signer
            .sign(&xml, session.lease.credential())
            .await
            .map_err(|e| ScenarioError::collaborator(Stage::Sign(variant), e))?;
        tracing::info!(scenario = %self.label, %variant, "document signed");
        Ok(signed)
    }

    async fn submit(&self, session: &Session, signed: Signed) -> Result<Submission, ScenarioError> {
        let response = self
            .collaborators
            .submitter
            .submit(signed.route, &signed.xml, &session.file_name)
            .await
            .map_err(|e| ScenarioError::collaborator(Stage::Submit(signed.route), e))?;
        tracing::info!(
            scenario = %self.label,
            variant = %signed.variant,
            route = %signed.route,
            "document submitted"
        );
        Ok(Submission {
            document: signed.variant,
            route: signed.route,
            file_name: session.file_name.clone(),
            response,
        })
    }
}
