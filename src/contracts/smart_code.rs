//! Smart code classification strings
//!
//! Every classified record carries a smart code of the form
//! `HERA.<DOMAIN>.<MODULE>.<TYPE>.<SUBTYPE>.v<N>`. Business-rule dispatch
//! keys off these strings, so malformed codes are rejected at the edge
//! rather than stored.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::types::{HeraError, Result};

/// Minimum dot-separated segments: HERA + domain + module + type + subtype + vN
const MIN_SEGMENTS: usize = 6;

/// A validated smart code
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SmartCode(String);

impl SmartCode {
    /// Parse and validate a smart code string
    pub fn parse(code: &str) -> Result<Self> {
        let segments: Vec<&str> = code.split('.').collect();

        if segments.len() < MIN_SEGMENTS {
            return Err(HeraError::SmartCode(format!(
                "{code}: expected at least {MIN_SEGMENTS} segments, got {}",
                segments.len()
            )));
        }

        if segments[0] != "HERA" {
            return Err(HeraError::SmartCode(format!(
                "{code}: must start with HERA"
            )));
        }

        let version = segments[segments.len() - 1];
        let digits = version.strip_prefix('v').unwrap_or("");
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(HeraError::SmartCode(format!(
                "{code}: version segment must be v<N>, got {version}"
            )));
        }

        for segment in &segments[1..segments.len() - 1] {
            if segment.is_empty()
                || !segment
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
            {
                return Err(HeraError::SmartCode(format!(
                    "{code}: segment {segment:?} must be uppercase alphanumeric"
                )));
            }
        }

        Ok(Self(code.to_string()))
    }

    /// The raw code string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Version number from the trailing `v<N>` segment
    pub fn version(&self) -> u32 {
        self.0
            .rsplit('.')
            .next()
            .and_then(|v| v.strip_prefix('v'))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }

    /// The domain segment (second segment, e.g. `SALON`)
    pub fn domain(&self) -> &str {
        self.0.split('.').nth(1).unwrap_or("")
    }
}

impl fmt::Display for SmartCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SmartCode {
    type Err = HeraError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for SmartCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SmartCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SmartCode::parse(&raw).map_err(de::Error::custom)
    }
}
