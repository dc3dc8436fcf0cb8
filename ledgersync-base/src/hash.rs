use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A 32-byte cryptographic hash: a ledger's identity, a SHAMap root, or a
/// node-id's target. Zero is the distinguished "not yet known" value used
/// throughout the acquisition protocol (an empty tx-root or account-root
/// hash means the corresponding tree is empty, not merely unfetched).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Hash256> {
        if bytes.len() != 32 {
            return None;
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(bytes);
        Some(Hash256(out))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn sha256(data: &[u8]) -> Hash256 {
        let digest = Sha256::digest(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Hash256(out)
    }
}

impl Default for Hash256 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Hash256(bytes)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_is_zero() {
        assert!(Hash256::ZERO.is_zero());
        assert!(!Hash256::sha256(b"x").is_zero());
    }

    #[test]
    fn from_slice_checks_length() {
        assert!(Hash256::from_slice(&[0u8; 31]).is_none());
        assert!(Hash256::from_slice(&[0u8; 33]).is_none());
        assert!(Hash256::from_slice(&[0u8; 32]).is_some());
    }

    #[test]
    fn debug_is_hex() {
        let h = Hash256([0xabu8; 32]);
        assert_eq!(format!("{:?}", h), "ab".repeat(32));
    }
}
