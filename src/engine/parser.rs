//! Lenient parsing of model responses.
//!
//! The model is asked for a bare YES/NO (activation) or a literal value
//! (extraction), but real responses come wrapped in prose, punctuation, and
//! the occasional code fence. The verdict parser is a tagged type rather
//! than a boolean so fail-closed handling is explicit and testable without
//! a gateway: `Unparseable` is its own outcome, and the engine maps it to
//! not-activated.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Outcome of reading an activation response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// The model affirmed activation.
    Affirmed,
    /// The model declined activation.
    Denied,
    /// No affirmative or negative token could be found.
    Unparseable,
}

static AFFIRM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(yes|activate|affirmative)\b").expect("affirm pattern"));
static DENY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(no|skip|negative)\b").expect("deny pattern"));

/// Read an activation response, taking whichever recognized token appears
/// first. Anything else is `Unparseable`.
pub fn parse_verdict(response: &str) -> Verdict {
    let affirm = AFFIRM_RE.find(response).map(|m| m.start());
    let deny = DENY_RE.find(response).map(|m| m.start());
    match (affirm, deny) {
        (Some(a), Some(d)) => {
            if a <= d {
                Verdict::Affirmed
            } else {
                Verdict::Denied
            }
        }
        (Some(_), None) => Verdict::Affirmed,
        (None, Some(_)) => Verdict::Denied,
        (None, None) => Verdict::Unparseable,
    }
}

/// Clean an extraction response down to the literal value: strip code
/// fences, matching quote pairs, and an `Answer:`-style prefix. An empty
/// result means the model produced no value.
pub fn clean_extraction(response: &str) -> String {
    let mut text = response.trim();

    // Fenced block: keep the inside, dropping an optional language tag line.
    if text.starts_with("```") {
        let inner = text.trim_start_matches('`');
        let inner = match inner.split_once('\n') {
            Some((first_line, rest)) if !first_line.trim().is_empty() && !rest.is_empty() => rest,
            _ => inner,
        };
        text = inner.trim_end_matches('`').trim();
    }

    static PREFIX_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)^(answer|value|result)\s*[:=]\s*").expect("prefix pattern"));
    let text = PREFIX_RE.replace(text, "");
    let text = text.trim();

    // Strip one matching pair of surrounding quotes.
    let text = if text.len() >= 2 {
        let bytes = text.as_bytes();
        let (first, last) = (bytes[0], bytes[text.len() - 1]);
        if first == last && (first == b'"' || first == b'\'' || first == b'`') {
            &text[1..text.len() - 1]
        } else {
            text
        }
    } else {
        text
    };

    text.trim().to_string()
}
