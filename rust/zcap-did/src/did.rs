//! DID (Decentralized Identifier) string type.

use crate::error::DidParseError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A [Decentralized Identifier][spec] string.
///
/// Wraps a raw DID string like `did:key:z6Mk...`, optionally carrying a
/// fragment (`did:key:z6Mk...#z6Mk...`) when it names a verification
/// method rather than a bare identity.
///
/// [spec]: https://www.w3.org/TR/did-core/
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Did(String);

impl Did {
    /// Get the raw DID string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the DID method name (e.g. `"key"` for `did:key:...`).
    #[must_use]
    pub fn method(&self) -> &str {
        let after_prefix = &self.0["did:".len()..];
        after_prefix.split(':').next().unwrap_or_default()
    }

    /// Returns the method-specific identifier, without any fragment.
    #[must_use]
    pub fn identifier(&self) -> &str {
        let after_prefix = &self.0["did:".len()..];
        let after_method = after_prefix
            .split_once(':')
            .map_or(after_prefix, |(_, rest)| rest);
        after_method
            .split_once('#')
            .map_or(after_method, |(id, _)| id)
    }

    /// Returns this DID with any fragment removed.
    ///
    /// A verification-method identifier like `did:key:z6Mk...#z6Mk...`
    /// resolves to the controlling DID `did:key:z6Mk...`.
    #[must_use]
    pub fn without_fragment(&self) -> Did {
        match self.0.split_once('#') {
            Some((base, _)) => Did(base.to_string()),
            None => self.clone(),
        }
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Did {
    type Err = DidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with("did:") {
            return Err(DidParseError(format!("expected did: prefix, got: {s}")));
        }
        // Must have at least did:method:identifier
        let rest = &s["did:".len()..];
        if !rest.contains(':') {
            return Err(DidParseError(format!(
                "expected did:method:identifier, got: {s}"
            )));
        }
        Ok(Did(s.to_string()))
    }
}

impl TryFrom<String> for Did {
    type Error = DidParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Serialize for Did {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
