//! Flat scenario records and their normalization.
//!
//! A scenario arrives as one flat JSON object per business case. Scalar
//! fields use plain keys (`RNCEmisor`), repeated groups use bracketed,
//! 1-based index suffixes (`FormaPago[2]`, `TipoCodigo[1][3]`). Every key
//! is parsed once when the record is built so group reconstruction never
//! pattern-matches key strings again.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::MappingError;
use crate::variant::parse_amount;

/// Administrative fields carried by the scenario source that are not part of
/// the document schema.
pub const ADMINISTRATIVE_FIELDS: &[&str] = &["EmpresaID", "estatus"];

// ── Scalar ───────────────────────────────────────────────────────────────────

/// A single field value after sanitization.
///
/// Float numbers render without float noise: `1180.00` arrives as `1180.0`
/// and is written back as `1180`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Scalar {
    /// Build a text scalar.
    pub fn text(s: impl Into<String>) -> Self {
        Scalar::Text(s.into())
    }

    /// Only the empty string is empty; blanking whitespace is the
    /// sanitizer's call. Numbers never are.
    pub fn is_empty(&self) -> bool {
        match self {
            Scalar::Text(s) => s.is_empty(),
            Scalar::Number(_) => false,
        }
    }

    /// Textual rendering used for comparisons, so `"32"` and `32` agree.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Scalar::Text(s) => Cow::Borrowed(s.as_str()),
            Scalar::Number(n) => match normalized_float(n) {
                Some(d) => Cow::Owned(d.to_string()),
                None => Cow::Owned(n.to_string()),
            },
        }
    }
}

/// Float numbers as normalized decimals. `None` for integers and for
/// floats outside the decimal range.
fn normalized_float(n: &serde_json::Number) -> Option<Decimal> {
    if n.is_f64() {
        parse_amount(&n.to_string()).map(|d| d.normalize())
    } else {
        None
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Text(s) => serializer.serialize_str(s),
            Scalar::Number(n) => match normalized_float(n) {
                Some(d) if d.scale() == 0 => match d.to_i64() {
                    Some(i) => serializer.serialize_i64(i),
                    None => n.serialize(serializer),
                },
                _ => n.serialize(serializer),
            },
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

// ── Indexed keys ─────────────────────────────────────────────────────────────

/// Split `Base[i]` / `Base[i][j]` into its base name and 1-based indices.
///
/// Returns `None` for plain keys and for anything that is not a clean
/// sequence of bracketed positive decimal indices (`Base[0]`, `Base[x]`,
/// `Base[1`, `Base[1]tail`).
pub fn parse_indexed_key(key: &str) -> Option<(&str, Vec<u32>)> {
    let open = key.find('[')?;
    let (base, mut rest) = key.split_at(open);
    if base.is_empty() {
        return None;
    }

    let mut indices = Vec::new();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        let digits = &inner[..close];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index: u32 = digits.parse().ok()?;
        if index == 0 {
            return None;
        }
        indices.push(index);
        rest = &inner[close + 1..];
    }
    Some((base, indices))
}

// ── FlatRecord ───────────────────────────────────────────────────────────────

/// Immutable snapshot of one scenario's document-relevant fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRecord {
    fields: BTreeMap<String, Scalar>,
    /// base name -> every index path present under it
    index: HashMap<String, Vec<Vec<u32>>>,
}

impl FlatRecord {
    /// Build a record from already-sanitized fields.
    pub fn from_fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Scalar)>,
        K: Into<String>,
    {
        let fields: BTreeMap<String, Scalar> =
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let mut index: HashMap<String, Vec<Vec<u32>>> = HashMap::new();
        for key in fields.keys() {
            if let Some((base, indices)) = parse_indexed_key(key) {
                index.entry(base.to_string()).or_default().push(indices);
            }
        }
        FlatRecord { fields, index }
    }

    /// Best-effort record built from a raw scenario without sanitizing it.
    ///
    /// Used to report the scenario back when normalization itself failed.
    pub fn from_raw(raw: &serde_json::Map<String, serde_json::Value>) -> Self {
        Self::from_fields(raw.iter().filter_map(|(key, value)| {
            let scalar = match value {
                serde_json::Value::Null => return None,
                serde_json::Value::String(s) => Scalar::Text(s.clone()),
                serde_json::Value::Number(n) => Scalar::Number(n.clone()),
                other => Scalar::Text(other.to_string()),
            };
            Some((key.clone(), scalar))
        }))
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.fields.get(key)
    }

    /// The value under `key`, if it is present and non-empty.
    pub fn value(&self, key: &str) -> Option<&Scalar> {
        self.fields.get(key).filter(|v| !v.is_empty())
    }

    pub fn has_value(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    /// Text of a field, trimmed. `None` when nothing is left.
    pub fn text(&self, key: &str) -> Option<String> {
        self.value(key)
            .map(|v| v.as_text().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Last-position indices present for `base` directly under `prefix`.
    ///
    /// With `prefix = [2]`, `TipoCodigo[2][1]` and `TipoCodigo[2][4]` yield
    /// `{1, 4}`; `TipoCodigo[3][1]` and `TipoCodigo[2]` are ignored.
    pub fn indices_under(&self, base: &str, prefix: &[u32]) -> BTreeSet<u32> {
        self.index
            .get(base)
            .into_iter()
            .flatten()
            .filter(|path| path.len() == prefix.len() + 1 && path.starts_with(prefix))
            .filter_map(|path| path.last().copied())
            .collect()
    }

    /// A copy of this record with one extra field.
    pub fn with_field(&self, key: &str, value: Scalar) -> FlatRecord {
        let mut fields = self.fields.clone();
        fields.insert(key.to_string(), value);
        Self::from_fields(fields)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for FlatRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<K: Into<String>> FromIterator<(K, Scalar)> for FlatRecord {
    fn from_iter<I: IntoIterator<Item = (K, Scalar)>>(iter: I) -> Self {
        Self::from_fields(iter)
    }
}

// ── Sanitizer ────────────────────────────────────────────────────────────────

/// Scalar sanitizer applied to every field that survives the denylist.
///
/// Returns `Ok(None)` for values that should be dropped. Must be pure.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, key: &str, value: &serde_json::Value) -> Result<Option<Scalar>, String>;
}

/// Default sanitizer: trims text, drops nulls and blank text, keeps numbers,
/// renders booleans as text and refuses nested values.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardSanitizer;

impl Sanitizer for StandardSanitizer {
    fn sanitize(&self, _key: &str, value: &serde_json::Value) -> Result<Option<Scalar>, String> {
        match value {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Scalar::text(trimmed)))
                }
            }
            serde_json::Value::Number(n) => Ok(Some(Scalar::Number(n.clone()))),
            serde_json::Value::Bool(b) => Ok(Some(Scalar::text(b.to_string()))),
            serde_json::Value::Array(_) => Err("arrays are not scalar values".to_string()),
            serde_json::Value::Object(_) => Err("objects are not scalar values".to_string()),
        }
    }
}

/// Strip administrative fields and sanitize the rest into a [`FlatRecord`].
pub fn normalize(
    raw: &serde_json::Map<String, serde_json::Value>,
    sanitizer: &dyn Sanitizer,
) -> Result<FlatRecord, MappingError> {
    let mut fields = BTreeMap::new();
    for (key, value) in raw {
        if ADMINISTRATIVE_FIELDS.contains(&key.as_str()) {
            continue;
        }
        let sanitized = sanitizer
            .sanitize(key, value)
            .map_err(|reason| MappingError::Unsanitizable {
                key: key.clone(),
                reason,
            })?;
        if let Some(scalar) = sanitized {
            fields.insert(key.clone(), scalar);
        }
    }
    Ok(FlatRecord::from_fields(fields))
}
