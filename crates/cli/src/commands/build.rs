use std::path::Path;
use std::process;

use ecf_mapping::{
    build_abbreviated, build_full, normalize, requires_abbreviated, Document, SecurityCode,
    StandardSanitizer,
};
use ecf_pipeline::{DocumentEncoder, XmlEncoder};

use crate::scenarios::read_scenarios;
use crate::{report_error, DocumentFormat, OutputFormat, VariantArg};

pub(crate) fn cmd_build(
    scenarios_path: &Path,
    index: usize,
    variant: VariantArg,
    security_code: Option<&str>,
    format: DocumentFormat,
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

    let raw = match scenarios.get(index) {
        Some(raw) => raw,
        None => {
            let msg = format!(
                "error: no scenario at index {} ('{}' holds {})",
                index,
                scenarios_path.display(),
                scenarios.len()
            );
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let record = match normalize(raw, &StandardSanitizer) {
        Ok(r) => r,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let built = match variant {
        VariantArg::Full => build_full(&record),
        VariantArg::Abbreviated => {
            let code = match security_code.and_then(SecurityCode::from_signature_value) {
                Some(code) => code,
                None => {
                    report_error(
                        "error: --variant abbreviated needs --security-code with at least 6 characters",
                        output,
                        quiet,
                    );
                    process::exit(1);
                }
            };
            if !requires_abbreviated(&record) {
                tracing::warn!(index, "scenario does not require an abbreviated document");
            }
            build_abbreviated(&record, &code)
        }
    };

    let document = match built {
        Ok(d) => d,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match render(&document, format) {
        Ok(text) => println!("{}", text),
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn render(document: &Document, format: DocumentFormat) -> Result<String, String> {
    match format {
        DocumentFormat::Json => serde_json::to_string_pretty(document)
            .map_err(|e| format!("error: could not serialize document: {}", e)),
        DocumentFormat::Xml => XmlEncoder::default()
            .encode(document)
            .map_err(|e| format!("error: could not encode document: {}", e)),
    }
}
