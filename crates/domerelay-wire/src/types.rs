use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::MAX_NAME_CHARS;
use crate::error::{Result, WireError};

/// Relay-assigned player id.
///
/// Allocated once per peer connection in strictly increasing order and never
/// reused for the lifetime of the relay process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A numeric field carried through the relay as written.
///
/// The token must parse as a finite number, but it is never re-rendered:
/// `0.123456789012` and `-5` leave the relay exactly as they arrived.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Number(String);

impl Number {
    /// An integer value.
    pub fn integer(value: i64) -> Self {
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The token parsed as a float, for range checks.
    pub(crate) fn value(&self) -> f64 {
        // Construction guarantees a finite float.
        self.0.parse().unwrap_or(f64::NAN)
    }
}

impl FromStr for Number {
    type Err = WireError;

    fn from_str(token: &str) -> Result<Self> {
        if token.is_empty() || token.chars().any(char::is_whitespace) {
            return Err(WireError::InvalidValue(format!(
                "not a number token: {token:?}"
            )));
        }
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Self(token.to_string())),
            _ => Err(WireError::InvalidValue(format!(
                "not a finite number: {token:?}"
            ))),
        }
    }
}

impl TryFrom<f64> for Number {
    type Error = WireError;

    fn try_from(value: f64) -> Result<Self> {
        if value.is_finite() {
            Ok(Self(value.to_string()))
        } else {
            Err(WireError::InvalidValue(format!("not a finite number: {value}")))
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A peer's display name: trimmed, non-empty, bounded, no control characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DisplayName(String);

impl DisplayName {
    /// Trim `raw` and check it.
    pub fn new(raw: &str) -> Result<Self> {
        check_name(raw).map_err(WireError::InvalidValue)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared by [`DisplayName::new`] and the frame parser, which reports the
/// reason against the frame's tag instead.
pub(crate) fn check_name(raw: &str) -> std::result::Result<DisplayName, String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("missing name".to_string());
    }
    let chars = name.chars().count();
    if chars > MAX_NAME_CHARS {
        return Err(format!(
            "name too long ({chars} chars, max {MAX_NAME_CHARS})"
        ));
    }
    if name.chars().any(char::is_control) {
        return Err("name contains control characters".to_string());
    }
    Ok(DisplayName(name.to_string()))
}
