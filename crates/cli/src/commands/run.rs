use std::path::Path;
use std::process;

use ecf_pipeline::{
    run_batch, BatchOptions, BatchSummary, PipelineConfig, ScenarioOutcome, ScenarioResult,
};

use crate::scenarios::read_scenarios;
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_run(
    scenarios_path: &Path,
    config_path: &Path,
    concurrency: Option<usize>,
    output: OutputFormat,
    quiet: bool,
) {
    let scenarios = match read_scenarios(scenarios_path) {
        Ok(s) => s,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let config = match PipelineConfig::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let collaborators = match config.collaborators() {
        Ok(c) => c,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let options = BatchOptions::concurrent(concurrency.unwrap_or(config.batch.concurrency));

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(&format!("error: could not start runtime: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let results = rt.block_on(run_batch(&scenarios, &collaborators, options));

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => match serde_json::to_string_pretty(&results) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                report_error(&format!("error: could not serialize results: {}", e), output, quiet);
                process::exit(1);
            }
        },
        OutputFormat::Text => {
            for (index, result) in results.iter().enumerate() {
                println!("{}", text_line(index, result));
            }
            let summary = BatchSummary::from_results(&results);
            println!(
                "{} scenarios: {} succeeded, {} failed",
                summary.total, summary.succeeded, summary.failed
            );
        }
    }
}

/// `<index>  <status>  <label>  <routes | message>`
fn text_line(index: usize, result: &ScenarioResult) -> String {
    let label = result
        .scenario
        .text("CasoPrueba")
        .or_else(|| result.scenario.text("ENCF"))
        .unwrap_or_else(|| "-".to_string());
    match &result.outcome {
        ScenarioOutcome::Success { response } => {
            let routes: Vec<String> = response
                .iter()
                .map(|s| format!("{}->{}", s.document, s.route))
                .collect();
            format!("{:>4}  ok     {}  {}", index, label, routes.join(", "))
        }
        ScenarioOutcome::Error { message } => {
            format!("{:>4}  error  {}  {}", index, label, message)
        }
    }
}
