use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::HashError;

/// A 256-bit digest identifying a block.
///
/// Difficulty is measured in leading hex *characters* (nibbles), matching
/// the ledger's "count of leading `'0'` hex characters" difficulty rule —
/// not leading zero bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    /// Creates a zeroed hash
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Creates a hash from a 32-byte array
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes of the hash
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Computes the SHA-256 hash of the provided data
    #[must_use]
    pub fn sha256(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let result = hasher.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result);
        Self(hash)
    }

    /// Checks if the hash satisfies the specified difficulty
    /// (number of leading zero hex characters)
    #[must_use]
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        self.leading_zero_hex_chars() >= difficulty
    }

    /// Counts the number of leading `'0'` hex characters in this hash
    #[must_use]
    pub fn leading_zero_hex_chars(&self) -> u32 {
        let mut count = 0;
        for &byte in &self.0 {
            let hi = byte >> 4;
            let lo = byte & 0x0f;
            if hi != 0 {
                break;
            }
            count += 1;
            if lo != 0 {
                break;
            }
            count += 1;
        }
        count
    }

    pub fn from_hex(hex_string: &str) -> Result<Self, HashError> {
        let bytes =
            hex::decode(hex_string).map_err(|e| HashError::InvalidHex(e.to_string()))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| HashError::InvalidHex(hex_string.to_string()))?;
        Ok(Self(array))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
