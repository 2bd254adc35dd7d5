//! Opaque holder/voter address — a fixed 20-byte account identifier, matching the
//! EVM account width used by all three initial protocols.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An opaque on-chain account identifier.
///
/// `Ord` is derived directly from the byte array, giving the lexicographic
/// tie-break order the data model requires for holder ranks (§3) and voting-block
/// ordering (§4.7) for free.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Error returned when parsing a hex-encoded address fails.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid address '{0}': expected 40 hex characters, optionally 0x-prefixed")]
pub struct AddressParseError(pub String);

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|_| AddressParseError(s.to_string()))?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| AddressParseError(s.to_string()))?;
        Ok(Address(arr))
    }
}
