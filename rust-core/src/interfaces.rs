// Definitions that are used throughout all modules

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ErrorKind, MsymError};

/// Fixed-capacity ASCII name as it crosses the engine boundary.
///
/// `CAP` includes the terminating NUL, so a `FixedName<4>` holds at most three
/// characters. Construction rejects non-ASCII text, interior NULs and names that
/// do not fit.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedName<const CAP: usize> {
    bytes: [u8; CAP],
}

/// Element label, at most 3 characters.
pub type ElementName = FixedName<4>;
/// Basis function label, at most 7 characters.
pub type BasisFunctionName = FixedName<8>;
/// Point group symbol, at most 7 characters.
pub type PointGroupName = FixedName<8>;

impl<const CAP: usize> FixedName<CAP> {
    /// Maximum number of characters.
    pub const MAX_LEN: usize = CAP - 1;

    pub fn new(name: &str) -> Result<Self, MsymError> {
        if !name.is_ascii() {
            return Err(MsymError::new(
                ErrorKind::InvalidInput,
                format!("Name {name:?} contains non-ASCII characters"),
            ));
        }
        if name.len() > Self::MAX_LEN {
            return Err(MsymError::new(
                ErrorKind::InvalidInput,
                format!(
                    "Name {name:?} is longer than {} characters",
                    Self::MAX_LEN
                ),
            ));
        }
        if name.bytes().any(|b| b == 0) {
            return Err(MsymError::new(
                ErrorKind::InvalidInput,
                format!("Name {name:?} contains a NUL byte"),
            ));
        }
        let mut bytes = [0u8; CAP];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Ok(Self { bytes })
    }

    /// Read a NUL-terminated name out of a raw buffer.
    pub fn from_buffer(buffer: &[u8]) -> Result<Self, MsymError> {
        let len = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
        let text = std::str::from_utf8(&buffer[..len]).map_err(|_| {
            MsymError::new(ErrorKind::InvalidInput, "Name buffer is not valid ASCII")
        })?;
        Self::new(text)
    }

    pub fn empty() -> Self {
        Self { bytes: [0u8; CAP] }
    }

    pub fn as_str(&self) -> &str {
        let len = self.len();
        // Only ASCII is ever written into the buffer
        std::str::from_utf8(&self.bytes[..len]).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.bytes.iter().position(|&b| b == 0).unwrap_or(CAP)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes[0] == 0
    }

    /// The raw, NUL-padded buffer.
    pub fn as_bytes_with_nul(&self) -> &[u8; CAP] {
        &self.bytes
    }
}

impl<const CAP: usize> Default for FixedName<CAP> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<const CAP: usize> fmt::Debug for FixedName<CAP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl<const CAP: usize> fmt::Display for FixedName<CAP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const CAP: usize> Serialize for FixedName<CAP> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de, const CAP: usize> Deserialize<'de> for FixedName<CAP> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::new(&text).map_err(serde::de::Error::custom)
    }
}
