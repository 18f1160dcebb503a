//! Document variants, the abbreviated-document gate and the security code
//! that links an abbreviated document to its signed full document.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::record::FlatRecord;

/// Document-type code of a consumer (simplified) invoice.
pub const SIMPLIFIED_INVOICE_TYPE: &str = "32";

/// Total amount (exclusive) below which a simplified invoice also needs an
/// abbreviated summary document.
pub const ABBREVIATED_THRESHOLD: i64 = 250_000;

pub const TYPE_CODE_FIELD: &str = "TipoeCF";
pub const TOTAL_AMOUNT_FIELD: &str = "MontoTotal";
pub const SECURITY_CODE_FIELD: &str = "CodigoSeguridadeCF";

pub const SECURITY_CODE_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentVariant {
    Full,
    Abbreviated,
}

impl DocumentVariant {
    /// Root element of the serialized document.
    pub fn root_tag(self) -> &'static str {
        match self {
            DocumentVariant::Full => "ECF",
            DocumentVariant::Abbreviated => "RFCE",
        }
    }
}

impl fmt::Display for DocumentVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentVariant::Full => write!(f, "full"),
            DocumentVariant::Abbreviated => write!(f, "abbreviated"),
        }
    }
}

impl FromStr for DocumentVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(DocumentVariant::Full),
            "abbreviated" => Ok(DocumentVariant::Abbreviated),
            other => Err(format!("unknown document variant '{}'", other)),
        }
    }
}

/// Parse a monetary amount. Accepts plain and scientific notation, with or
/// without `,` thousands separators (`1,500.00`).
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let text: String = text.trim().chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Whether this scenario also needs the abbreviated document.
///
/// True iff the type code is the simplified-invoice code and the total
/// amount parses and is strictly below the threshold. A missing or
/// unparseable total never gates.
pub fn requires_abbreviated(record: &FlatRecord) -> bool {
    let is_simplified = record
        .text(TYPE_CODE_FIELD)
        .is_some_and(|code| code == SIMPLIFIED_INVOICE_TYPE);
    if !is_simplified {
        return false;
    }
    record
        .text(TOTAL_AMOUNT_FIELD)
        .and_then(|total| parse_amount(&total))
        .is_some_and(|total| total < Decimal::from(ABBREVIATED_THRESHOLD))
}

/// First [`SECURITY_CODE_LEN`] characters of the full document's signature
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SecurityCode(String);

impl SecurityCode {
    /// Derive the code from a signature value. `None` if it is too short.
    pub fn from_signature_value(signature_value: &str) -> Option<Self> {
        let code: String = signature_value
            .trim()
            .chars()
            .take(SECURITY_CODE_LEN)
            .collect();
        if code.chars().count() == SECURITY_CODE_LEN {
            Some(SecurityCode(code))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecurityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Scalar;

    fn record(type_code: Scalar, total: Option<Scalar>) -> FlatRecord {
        let mut fields = vec![(TYPE_CODE_FIELD, type_code)];
        if let Some(total) = total {
            fields.push((TOTAL_AMOUNT_FIELD, total));
        }
        FlatRecord::from_fields(fields)
    }

    #[test]
    fn simplified_invoice_below_threshold_is_gated() {
        let r = record(Scalar::text("32"), Some(Scalar::text("249999.99")));
        assert!(requires_abbreviated(&r));
    }

    #[test]
    fn threshold_itself_is_not_gated() {
        let r = record(Scalar::text("32"), Some(Scalar::text("250000.00")));
        assert!(!requires_abbreviated(&r));
    }

    #[test]
    fn grouped_totals_are_read_as_amounts() {
        assert_eq!(parse_amount("1,500.00"), Some(Decimal::new(150000, 2)));
        let r = record(Scalar::text("32"), Some(Scalar::text("1,500.00")));
        assert!(requires_abbreviated(&r));
        let r = record(Scalar::text("32"), Some(Scalar::text("250,000.00")));
        assert!(!requires_abbreviated(&r));
    }

    #[test]
    fn other_types_are_never_gated() {
        let r = record(Scalar::text("31"), Some(Scalar::text("10.00")));
        assert!(!requires_abbreviated(&r));
    }

    #[test]
    fn numeric_type_code_is_accepted() {
        let r = record(
            Scalar::Number(32.into()),
            Some(Scalar::Number(serde_json::Number::from_f64(1200.5).unwrap())),
        );
        assert!(requires_abbreviated(&r));
    }

    #[test]
    fn missing_or_garbled_total_is_not_gated() {
        assert!(!requires_abbreviated(&record(Scalar::text("32"), None)));
        assert!(!requires_abbreviated(&record(
            Scalar::text("32"),
            Some(Scalar::text("n/a"))
        )));
    }

    #[test]
    fn security_code_takes_first_six_characters() {
        let code = SecurityCode::from_signature_value("AbC123xyzXYZ987==").unwrap();
        assert_eq!(code.as_str(), "AbC123");
    }

    #[test]
    fn short_signature_value_yields_no_code() {
        assert_eq!(SecurityCode::from_signature_value("abc"), None);
        assert_eq!(SecurityCode::from_signature_value("   "), None);
    }

    #[test]
    fn variant_parses_and_displays() {
        assert_eq!("full".parse::<DocumentVariant>(), Ok(DocumentVariant::Full));
        assert_eq!(DocumentVariant::Abbreviated.to_string(), "abbreviated");
        assert!("summary".parse::<DocumentVariant>().is_err());
    }
}
