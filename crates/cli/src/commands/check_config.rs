use std::path::Path;
use std::process;

use ecf_pipeline::{ConfigError, PipelineConfig, Route};

use crate::{report_error, OutputFormat};

pub(crate) fn cmd_check_config(config_path: &Path, output: OutputFormat, quiet: bool) {
    let config = match PipelineConfig::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        match (&e, output) {
            (ConfigError::Invalid { problems }, OutputFormat::Json) => {
                if !quiet {
                    eprintln!("{}", serde_json::json!({ "valid": false, "problems": problems }));
                }
            }
            (ConfigError::Invalid { problems }, OutputFormat::Text) => {
                for problem in problems {
                    report_error(&format!("error: {}", problem), output, quiet);
                }
            }
            _ => report_error(&format!("error: {}", e), output, quiet),
        }
        process::exit(1);
    }

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => {
            let routes: serde_json::Map<String, serde_json::Value> = Route::ALL
                .into_iter()
                .map(|route| (route.to_string(), serde_json::json!(config.submission.url(route))))
                .collect();
            let summary = serde_json::json!({
                "valid": true,
                "signer": config.signer.url,
                "routes": routes,
                "certificates": config.credentials.directory,
                "concurrency": config.batch.concurrency,
            });
            println!("{}", summary);
        }
        OutputFormat::Text => {
            println!("{}: ok", config_path.display());
            println!("  signer:       {}", config.signer.url.as_deref().unwrap_or("-"));
            for route in Route::ALL {
                println!(
                    "  {:<12}  {}",
                    format!("{}:", route),
                    config.submission.url(route).unwrap_or("-")
                );
            }
            if let Some(directory) = &config.credentials.directory {
                println!("  certificates: {}", directory.display());
            }
            println!("  concurrency:  {}", config.batch.concurrency);
        }
    }
}
