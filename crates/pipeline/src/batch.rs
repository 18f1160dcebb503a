//! Batch orchestration.
//!
//! A batch runs every scenario through normalization and the
//! [`ScenarioContext`] protocol and returns one [`ScenarioResult`] per input,
//! in input order. A failing scenario never aborts the batch: its error is
//! recorded and the next scenario proceeds.
//!
//! Scenarios run one at a time by default. With `concurrency > 1` they run
//! on a [`JoinSet`] bounded by a [`Semaphore`]; each scenario still owns its
//! own credential lease, and results are put back in input order.

use std::sync::Arc;

use ecf_mapping::{normalize, FlatRecord};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::collaborator::Collaborators;
use crate::error::ScenarioError;
use crate::protocol::{ScenarioContext, Submission};

pub type RawScenario = serde_json::Map<String, serde_json::Value>;

// ── Options and results ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Scenarios in flight at once. 0 is treated as 1.
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions { concurrency: 1 }
    }
}

impl BatchOptions {
    pub fn concurrent(concurrency: usize) -> Self {
        BatchOptions { concurrency }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScenarioOutcome {
    Success { response: Vec<Submission> },
    Error { message: String },
}

/// Outcome of one scenario.
///
/// Serializes as `{"scenario": {...}, "processed_at": "...", "status":
/// "success", "response": [...]}` or with `"status": "error"` and a
/// `"message"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioResult {
    /// The normalized scenario, or the raw one if normalization failed.
    pub scenario: FlatRecord,
    /// RFC 3339, UTC.
    pub processed_at: String,
    #[serde(flatten)]
    pub outcome: ScenarioOutcome,
}

impl ScenarioResult {
    fn new(scenario: FlatRecord, outcome: Result<Vec<Submission>, ScenarioError>) -> Self {
        let outcome = match outcome {
            Ok(response) => ScenarioOutcome::Success { response },
            Err(e) => ScenarioOutcome::Error {
                message: e.to_string(),
            },
        };
        ScenarioResult {
            scenario,
            processed_at: timestamp(),
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ScenarioOutcome::Success { .. })
    }

    /// Error message, for failed scenarios.
    pub fn message(&self) -> Option<&str> {
        match &self.outcome {
            ScenarioOutcome::Success { .. } => None,
            ScenarioOutcome::Error { message } => Some(message),
        }
    }

    pub fn submissions(&self) -> &[Submission] {
        match &self.outcome {
            ScenarioOutcome::Success { response } => response,
            ScenarioOutcome::Error { .. } => &[],
        }
    }
}

fn timestamp() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[ScenarioResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        BatchSummary {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        }
    }
}

// ── Orchestration ────────────────────────────────────────────────────────────

/// Normalize and process one scenario. Never fails: errors become an
/// error result.
pub async fn run_scenario(raw: &RawScenario, collaborators: &Collaborators) -> ScenarioResult {
    let record = match normalize(raw, collaborators.sanitizer.as_ref()) {
        Ok(record) => record,
        Err(e) => return ScenarioResult::new(FlatRecord::from_raw(raw), Err(e.into())),
    };
    let outcome = ScenarioContext::new(&record, collaborators).run().await;
    ScenarioResult::new(record, outcome)
}

/// Process every scenario and return their results in input order.
pub async fn run_batch(
    scenarios: &[RawScenario],
    collaborators: &Collaborators,
    options: BatchOptions,
) -> Vec<ScenarioResult> {
    let concurrency = options.concurrency.max(1);
    tracing::info!(scenarios = scenarios.len(), concurrency, "batch started");

    let results = if concurrency == 1 {
        let mut results = Vec::with_capacity(scenarios.len());
        for (index, raw) in scenarios.iter().enumerate() {
            let result = run_scenario(raw, collaborators).await;
            log_result(index, &result);
            results.push(result);
        }
        results
    } else {
        run_concurrent(scenarios, collaborators, concurrency).await
    };

    let summary = BatchSummary::from_results(&results);
    tracing::info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "batch finished"
    );
    results
}

async fn run_concurrent(
    scenarios: &[RawScenario],
    collaborators: &Collaborators,
    concurrency: usize,
) -> Vec<ScenarioResult> {
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();
    for (index, raw) in scenarios.iter().cloned().enumerate() {
        let collaborators = collaborators.clone();
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            (index, run_scenario(&raw, &collaborators).await)
        });
    }

    let mut slots: Vec<Option<ScenarioResult>> = vec![None; scenarios.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => {
                log_result(index, &result);
                slots[index] = Some(result);
            }
            Err(e) => tracing::error!(error = %e, "scenario task did not complete"),
        }
    }

    slots
        .into_iter()
        .zip(scenarios)
        .map(|(slot, raw)| {
            slot.unwrap_or_else(|| ScenarioResult {
                scenario: FlatRecord::from_raw(raw),
                processed_at: timestamp(),
                outcome: ScenarioOutcome::Error {
                    message: "scenario task did not complete".to_string(),
                },
            })
        })
        .collect()
}

fn log_result(index: usize, result: &ScenarioResult) {
    match &result.outcome {
        ScenarioOutcome::Success { response } => {
            tracing::info!(index, submissions = response.len(), "scenario succeeded")
        }
        ScenarioOutcome::Error { message } => {
            tracing::warn!(index, error = %message, "scenario failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Route;
    use ecf_mapping::{DocumentVariant, Scalar};

    fn result(outcome: ScenarioOutcome) -> ScenarioResult {
        ScenarioResult {
            scenario: FlatRecord::from_fields([("ENCF", Scalar::text("E310000000001"))]),
            processed_at: "2025-01-01T00:00:00Z".into(),
            outcome,
        }
    }

    #[test]
    fn success_serializes_with_status_and_response() {
        let value = serde_json::to_value(result(ScenarioOutcome::Success {
            response: vec![Submission {
                document: DocumentVariant::Full,
                route: Route::Reception,
                file_name: "E310000000001.xml".into(),
                response: serde_json::json!({"trackId": "t-1"}),
            }],
        }))
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "scenario": {"ENCF": "E310000000001"},
                "processed_at": "2025-01-01T00:00:00Z",
                "status": "success",
                "response": [{
                    "document": "full",
                    "route": "reception",
                    "file_name": "E310000000001.xml",
                    "response": {"trackId": "t-1"},
                }],
            })
        );
    }

    #[test]
    fn error_serializes_with_status_and_message() {
        let value = serde_json::to_value(result(ScenarioOutcome::Error {
            message: "boom".into(),
        }))
        .unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["message"], "boom");
        assert!(value.get("response").is_none());
    }

    #[test]
    fn summary_counts_outcomes() {
        let results = vec![
            result(ScenarioOutcome::Success { response: vec![] }),
            result(ScenarioOutcome::Error {
                message: "x".into(),
            }),
            result(ScenarioOutcome::Success { response: vec![] }),
        ];
        assert_eq!(
            BatchSummary::from_results(&results),
            BatchSummary {
                total: 3,
                succeeded: 2,
                failed: 1
            }
        );
        assert_eq!(results[1].message(), Some("x"));
        assert!(results[1].submissions().is_empty());
    }

    #[test]
    fn timestamps_are_rfc3339() {
        let stamp = timestamp();
        assert!(time::OffsetDateTime::parse(
            &stamp,
            &time::format_description::well_known::Rfc3339
        )
        .is_ok());
    }

    #[test]
    fn zero_concurrency_means_sequential() {
        assert_eq!(BatchOptions::concurrent(0).concurrency.max(1), 1);
        assert_eq!(BatchOptions::default().concurrency, 1);
    }
}
