use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A human-readable alias for a grid coordinate.
///
/// Addresses look like URL paths (`"Book/Page100"`, `"Book/Chapter5"`) and
/// are the only names users ever see; coordinates stay internal. An address
/// is case-sensitive and compared byte-wise after normalization.
///
/// Construction goes through [`CellAddress::parse`], which normalizes the
/// raw string (trims whitespace, strips enclosing `/`, collapses repeated
/// `/`) and rejects anything that cannot serve as a stable name: empty
/// strings, control characters, interior whitespace, or anything longer
/// than [`CellAddress::MAX_LEN`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellAddress(String);

impl CellAddress {
    /// Upper bound on the normalized length, in bytes.
    pub const MAX_LEN: usize = 512;

    /// Parse and normalize a raw address string.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let trimmed = raw.trim();
        let mut normalized = String::with_capacity(trimmed.len());
        let mut prev_slash = true; // swallows leading slashes
        for ch in trimmed.chars() {
            if ch == '/' {
                if !prev_slash {
                    normalized.push('/');
                }
                prev_slash = true;
                continue;
            }
            if ch.is_control() {
                return Err(TypeError::InvalidAddress(format!(
                    "control character {:?} in {raw:?}",
                    ch
                )));
            }
            if ch.is_whitespace() {
                return Err(TypeError::InvalidAddress(format!(
                    "whitespace inside {raw:?}"
                )));
            }
            normalized.push(ch);
            prev_slash = false;
        }
        if normalized.ends_with('/') {
            normalized.pop();
        }
        if normalized.is_empty() {
            return Err(TypeError::InvalidAddress("empty address".to_string()));
        }
        if normalized.len() > Self::MAX_LEN {
            return Err(TypeError::InvalidAddress(format!(
                "address exceeds {} bytes",
                Self::MAX_LEN
            )));
        }
        Ok(Self(normalized))
    }

    /// The normalized address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments between `/` separators.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Debug for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellAddress({:?})", self.0)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CellAddress {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for CellAddress {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for CellAddress {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CellAddress> for String {
    fn from(value: CellAddress) -> Self {
        value.0
    }
}
