//! Keyword arguments supplied to template resolution
//!
//! Values are kept as integers, floats or strings so that format
//! specifications such as `{plateid:06d}` can be applied faithfully.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{PathError, PathResult};

/// A single keyword value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeywordValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl KeywordValue {
    /// Parse user text, producing an integer only for canonical decimal forms
    ///
    /// `"8485"` becomes `Int(8485)` while `"0123"`, `"+5"` and `"v3_1_1"` stay strings,
    /// so the original text can always be reproduced.
    pub fn parse(text: &str) -> Self {
        if is_canonical_int(text) {
            if let Ok(value) = text.parse::<i64>() {
                return KeywordValue::Int(value);
            }
        }
        KeywordValue::Str(text.to_string())
    }

    /// Parse text captured for an integer-typed field, accepting zero padding
    pub fn parse_padded_int(text: &str) -> Self {
        let digits = text.strip_prefix('-').unwrap_or(text);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(value) = text.parse::<i64>() {
                return KeywordValue::Int(value);
            }
        }
        Self::parse(text)
    }

    /// Integer view, parsing strings when they hold a number
    pub fn as_int(&self) -> Option<i64> {
        match self {
            KeywordValue::Int(value) => Some(*value),
            KeywordValue::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            KeywordValue::Float(_) => None,
            KeywordValue::Str(text) => text.trim().parse().ok(),
        }
    }

    /// Float view, parsing strings when they hold a number
    pub fn as_float(&self) -> Option<f64> {
        match self {
            KeywordValue::Int(value) => Some(*value as f64),
            KeywordValue::Float(value) => Some(*value),
            KeywordValue::Str(text) => text.trim().parse().ok(),
        }
    }

    /// Whether the value is a shell-style wildcard rather than a concrete value
    pub fn is_wildcard(&self) -> bool {
        matches!(self, KeywordValue::Str(text) if text.contains('*') || text.contains('?'))
    }

    /// Integer view that fails with a descriptive error
    pub fn require_int(&self, key: &str) -> PathResult<i64> {
        self.as_int().ok_or_else(|| PathError::InvalidKeywordValue {
            key: key.to_string(),
            value: self.to_string(),
            reason: "expected an integer".to_string(),
        })
    }
}

fn is_canonical_int(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    match digits.as_bytes() {
        [] => false,
        [b'0'] => text == "0",
        [first, rest @ ..] => {
            *first != b'0' && first.is_ascii_digit() && rest.iter().all(u8::is_ascii_digit)
        }
    }
}

impl fmt::Display for KeywordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeywordValue::Int(value) => write!(f, "{}", value),
            KeywordValue::Float(value) => write!(f, "{}", value),
            KeywordValue::Str(value) => f.write_str(value),
        }
    }
}

impl From<i64> for KeywordValue {
    fn from(value: i64) -> Self {
        KeywordValue::Int(value)
    }
}

impl From<i32> for KeywordValue {
    fn from(value: i32) -> Self {
        KeywordValue::Int(value.into())
    }
}

impl From<u32> for KeywordValue {
    fn from(value: u32) -> Self {
        KeywordValue::Int(value.into())
    }
}

impl From<f64> for KeywordValue {
    fn from(value: f64) -> Self {
        KeywordValue::Float(value)
    }
}

impl From<&str> for KeywordValue {
    fn from(value: &str) -> Self {
        KeywordValue::Str(value.to_string())
    }
}

impl From<String> for KeywordValue {
    fn from(value: String) -> Self {
        KeywordValue::Str(value)
    }
}

/// Named keyword arguments for a resolution call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keywords(BTreeMap<String, KeywordValue>);

impl Keywords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    ///
    /// ```rust
    /// use sas_sync::app::path::Keywords;
    ///
    /// let kw = Keywords::new().with("plate", 8485).with("ifu", "1901");
    /// assert_eq!(kw.len(), 2);
    /// ```
    pub fn with(mut self, key: impl Into<String>, value: impl Into<KeywordValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<KeywordValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&KeywordValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// String form of a value, if present
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.0.get(key).map(|value| value.to_string())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &KeywordValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse `key=value` pairs as given on the command line
    pub fn parse_pairs<I, S>(pairs: I) -> PathResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keywords = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| PathError::InvalidKeywordValue {
                    key: pair.to_string(),
                    value: String::new(),
                    reason: "expected key=value".to_string(),
                })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(PathError::InvalidKeywordValue {
                    key: pair.to_string(),
                    value: value.to_string(),
                    reason: "empty keyword name".to_string(),
                });
            }
            keywords.insert(key, KeywordValue::parse(value.trim()));
        }
        Ok(keywords)
    }
}

impl FromIterator<(String, KeywordValue)> for Keywords {
    fn from_iter<T: IntoIterator<Item = (String, KeywordValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
