//! Placeholder templates
//!
//! Agent and task text may contain `{name}` placeholders. Names are restricted
//! to ASCII letters, digits and underscores and match greedily, so `{namex}`
//! never matches the key `name`. A backslash before a brace (`\{`, `\}`)
//! yields a literal brace whether or not the enclosed name is known.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\([{}])|\{([A-Za-z0-9_]+)\}").expect("placeholder pattern is valid")
});

/// A value that can be substituted into a placeholder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    /// Text value
    Text(String),
    /// Whole number
    Integer(i64),
    /// Floating point number
    Float(f64),
}

/// Lookup table of placeholder name to value
pub type Input = HashMap<String, InputValue>;

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputValue::Text(text) => f.write_str(text),
            InputValue::Integer(n) => write!(f, "{}", n),
            InputValue::Float(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        InputValue::Text(value.to_string())
    }
}

impl From<String> for InputValue {
    fn from(value: String) -> Self {
        InputValue::Text(value)
    }
}

impl From<i64> for InputValue {
    fn from(value: i64) -> Self {
        InputValue::Integer(value)
    }
}

impl From<i32> for InputValue {
    fn from(value: i32) -> Self {
        InputValue::Integer(value.into())
    }
}

impl From<u32> for InputValue {
    fn from(value: u32) -> Self {
        InputValue::Integer(value.into())
    }
}

impl From<f64> for InputValue {
    fn from(value: f64) -> Self {
        InputValue::Float(value)
    }
}

/// Substitute every known `{name}` in `template` with its value
///
/// Unknown placeholders are returned verbatim, braces included. Escaped
/// braces are unescaped.
pub fn resolve(template: &str, input: &Input) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            if let Some(brace) = caps.get(1) {
                return brace.as_str().to_string();
            }
            let name = &caps[2];
            match input.get(name) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Collect the placeholder names referenced by `template`
///
/// Escaped braces do not count as placeholders.
pub fn placeholders(template: &str) -> BTreeSet<String> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|caps| caps.get(2).map(|name| name.as_str().to_string()))
        .collect()
}
