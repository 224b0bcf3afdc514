//! Address - 20-byte account identifiers
//!
//! Signers, recipients, asset tokens and wallets are all identified by an
//! `Address`. The all-zero address is the null account and is never a valid
//! signer, recipient or asset.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of an address in bytes
pub const ADDRESS_LEN: usize = 20;

/// Errors that can occur when parsing addresses
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Address must be {expected} hex digits, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid hex in address: {0}")]
    InvalidHex(String),
}

/// Account identifier
///
/// # Examples
/// ```
/// use multisig_core::Address;
///
/// let addr: Address = "0x06D97198756295A96C2158a23963306f507b2f69".parse().unwrap();
/// assert_eq!(addr.to_string(), "0x06d97198756295a96c2158a23963306f507b2f69");
/// assert!(!addr.is_zero());
/// assert!(Address::ZERO.is_zero());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The null account
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);

    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Address with every byte set to `byte` (handy for fixtures)
    pub const fn repeat_byte(byte: u8) -> Self {
        Self([byte; ADDRESS_LEN])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    /// Derive an address from arbitrary parts.
    ///
    /// Takes the last 20 bytes of SHA-256 over the concatenated parts.
    /// Deterministic: the same parts always yield the same address.
    pub fn derive(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        let digest = hasher.finalize();

        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[digest.len() - ADDRESS_LEN..]);
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        if digits.len() != ADDRESS_LEN * 2 {
            return Err(AddressError::InvalidLength {
                expected: ADDRESS_LEN * 2,
                actual: digits.len(),
            });
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| AddressError::InvalidHex(e.to_string()))?;

        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.to_string()
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_case() {
        let lower: Address = "0x06d97198756295a96c2158a23963306f507b2f69".parse().unwrap();
        let mixed: Address = "0x06D97198756295A96C2158a23963306f507b2f69".parse().unwrap();
        assert_eq!(lower, mixed);
    }

    #[test]
    fn test_parse_without_prefix() {
        let addr: Address = "1111111111111111111111111111111111111111".parse().unwrap();
        assert_eq!(addr, Address::repeat_byte(0x11));
    }

    #[test]
    fn test_display_roundtrip() {
        let addr = Address::repeat_byte(0xab);
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn test_invalid_length() {
        let result: Result<Address, _> = "0x1234".parse();
        assert!(matches!(
            result,
            Err(AddressError::InvalidLength { expected: 40, actual: 4 })
        ));
    }

    #[test]
    fn test_invalid_hex() {
        let result: Result<Address, _> = "0xzz11111111111111111111111111111111111111".parse();
        assert!(matches!(result, Err(AddressError::InvalidHex(_))));
    }

    #[test]
    fn test_zero_address() {
        let zero: Address = "0x0000000000000000000000000000000000000000".parse().unwrap();
        assert!(zero.is_zero());
        assert_eq!(zero, Address::ZERO);
        assert!(!Address::repeat_byte(1).is_zero());
    }

    #[test]
    fn test_derive_is_deterministic() {
        let factory = Address::repeat_byte(7);
        let a = Address::derive(&[factory.as_bytes(), &1u64.to_be_bytes()]);
        let b = Address::derive(&[factory.as_bytes(), &1u64.to_be_bytes()]);
        let c = Address::derive(&[factory.as_bytes(), &2u64.to_be_bytes()]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_zero());
    }

    #[test]
    fn test_serde_as_string() {
        let addr = Address::repeat_byte(0x22);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x2222222222222222222222222222222222222222\"");

        let bad: Result<Address, _> = serde_json::from_str("\"0x22\"");
        assert!(bad.is_err());
    }
}
