//! Scenario file loading.

use std::path::Path;

use ecf_pipeline::RawScenario;

/// Read a JSON array of scenario objects.
///
/// Returns a human-readable error string on failure.
pub(crate) fn read_scenarios(path: &Path) -> Result<Vec<RawScenario>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("error: could not read '{}': {}", path.display(), e))?;
    parse_scenarios(&content)
        .map_err(|e| format!("error: invalid scenarios in '{}': {}", path.display(), e))
}

fn parse_scenarios(content: &str) -> Result<Vec<RawScenario>, String> {
    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let entries = match value {
        serde_json::Value::Array(entries) => entries,
        _ => return Err("expected a JSON array of scenario objects".to_string()),
    };
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| match entry {
            serde_json::Value::Object(fields) => Ok(fields),
            _ => Err(format!("scenario {} is not a JSON object", i)),
        })
        .collect()
}
