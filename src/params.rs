//! Parameter coercion.
//!
//! Pure, side-effect-free conversion of extracted free text into typed
//! parameter values. The model's extraction answers arrive as prose, so the
//! numeric path pulls the first well-formed number out of surrounding text
//! rather than demanding a bare literal.
//!
//! A required parameter with no extractable value fails with
//! [`ParamError::MissingRequired`]; a present-but-untypable value fails with
//! [`ParamError::Coercion`]. Coercion never silently defaults.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParamError;
use crate::skill::ParamKind;

/// A typed parameter value ready to hand to the sandbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Number(f64),
    Flag(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(s) => write!(f, "{}", s),
            ParamValue::Number(n) => write!(f, "{}", n),
            ParamValue::Flag(b) => write!(f, "{}", b),
        }
    }
}

/// Coerced parameters for one skill call, keyed by parameter name.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// First well-formed number (optional sign, optional decimal part) in a
/// stretch of free text.
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("number pattern"));

/// Literal tokens accepted for boolean parameters, case-insensitive.
const TRUE_TOKENS: &[&str] = &["true", "yes", "y", "on", "1"];
const FALSE_TOKENS: &[&str] = &["false", "no", "n", "off", "0"];

/// Coerce raw extracted text into a value of the declared kind.
///
/// `raw` is the model's literal answer for one parameter; `name` is used
/// only for error attribution. An empty (post-trim) answer counts as
/// missing, which is a [`ParamError::MissingRequired`] for required
/// parameters and simply absent for optional ones; the caller decides.
pub fn coerce(name: &str, kind: ParamKind, raw: &str) -> Result<ParamValue, ParamError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParamError::MissingRequired { name: name.into() });
    }

    match kind {
        ParamKind::String => Ok(ParamValue::Text(trimmed.to_string())),
        ParamKind::Number => extract_number(trimmed)
            .map(ParamValue::Number)
            .ok_or_else(|| ParamError::Coercion {
                name: name.into(),
                kind: "number",
                raw: trimmed.to_string(),
            }),
        ParamKind::Boolean => extract_bool(trimmed)
            .map(ParamValue::Flag)
            .ok_or_else(|| ParamError::Coercion {
                name: name.into(),
                kind: "boolean",
                raw: trimmed.to_string(),
            }),
    }
}

/// Pull the first well-formed number out of free text.
pub fn extract_number(text: &str) -> Option<f64> {
    NUMBER_RE.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Match the whole trimmed text, or failing that its first token, against
/// the closed truthy/falsy token sets.
pub fn extract_bool(text: &str) -> Option<bool> {
    let lowered = text.trim().to_lowercase();
    let candidates = [
        lowered.as_str(),
        lowered.split_whitespace().next().unwrap_or(""),
    ];
    for candidate in candidates {
        let candidate = candidate.trim_matches(|c: char| !c.is_alphanumeric());
        if TRUE_TOKENS.contains(&candidate) {
            return Some(true);
        }
        if FALSE_TOKENS.contains(&candidate) {
            return Some(false);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_passthrough_trims() {
        let value = coerce("expression", ParamKind::String, "  2 + 2  ").unwrap();
        assert_eq!(value, ParamValue::Text("2 + 2".into()));
    }

    #[test]
    fn test_number_from_prose() {
        let value = coerce("number", ParamKind::Number, "the number is 144, I think").unwrap();
        assert_eq!(value, ParamValue::Number(144.0));

        let value = coerce("number", ParamKind::Number, "-3.5 degrees").unwrap();
        assert_eq!(value, ParamValue::Number(-3.5));
    }

    #[test]
    fn test_number_round_trip() {
        for n in [0.0, 42.0, -7.25, 100000.5] {
            let value = coerce("n", ParamKind::Number, &n.to_string()).unwrap();
            assert_eq!(value, ParamValue::Number(n));
        }
    }

    #[test]
    fn test_number_without_digits_is_coercion_error() {
        let err = coerce("number", ParamKind::Number, "no digits here").unwrap_err();
        assert!(matches!(err, ParamError::Coercion { .. }));
    }

    #[test]
    fn test_empty_text_is_missing_not_zero() {
        let err = coerce("number", ParamKind::Number, "   ").unwrap_err();
        assert!(matches!(err, ParamError::MissingRequired { .. }));
    }

    #[test]
    fn test_boolean_tokens_case_insensitive() {
        for raw in ["true", "YES", "y", "On", "1"] {
            assert_eq!(
                coerce("flag", ParamKind::Boolean, raw).unwrap(),
                ParamValue::Flag(true),
                "raw = {raw}"
            );
        }
        for raw in ["False", "no", "N", "off", "0"] {
            assert_eq!(
                coerce("flag", ParamKind::Boolean, raw).unwrap(),
                ParamValue::Flag(false),
                "raw = {raw}"
            );
        }
    }

    #[test]
    fn test_boolean_first_token_and_punctuation() {
        assert_eq!(
            coerce("flag", ParamKind::Boolean, "Yes, definitely").unwrap(),
            ParamValue::Flag(true)
        );
        let err = coerce("flag", ParamKind::Boolean, "maybe").unwrap_err();
        assert!(matches!(err, ParamError::Coercion { .. }));
    }
}
