//! Security-code extraction from a signed full document.

use std::sync::LazyLock;

use ecf_mapping::SecurityCode;
use regex::Regex;

use crate::error::ScenarioError;

static SIGNATURE_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:\w+:)?SignatureValue(?:\s[^>]*)?>([^<]*)</(?:\w+:)?SignatureValue>")
        .expect("SignatureValue pattern is valid")
});

/// Text of the first `SignatureValue` element, whitespace removed.
///
/// Accepts a namespace prefix (`ds:SignatureValue`) and attributes. Signers
/// wrap long base64 values across lines, so inner whitespace is dropped.
pub fn signature_value(signed_xml: &str) -> Option<String> {
    let captured = SIGNATURE_VALUE.captures(signed_xml)?.get(1)?.as_str();
    let value: String = captured.chars().filter(|c| !c.is_whitespace()).collect();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Derive the abbreviated document's security code from the signed full
/// document.
pub fn security_code(signed_xml: &str) -> Result<SecurityCode, ScenarioError> {
    signature_value(signed_xml)
        .as_deref()
        .and_then(SecurityCode::from_signature_value)
        .ok_or(ScenarioError::MissingSignatureArtifact)
}
