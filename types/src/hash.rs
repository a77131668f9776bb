//! Content-addressed dataset identifier.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A 32-byte content hash supplied by the storage collaborator.
///
/// The registry never reads dataset bytes; it only compares these hashes.
/// Hex on human-readable formats, raw bytes otherwise.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashParseError {
    #[error("content hash must be 64 hex characters, got {0}")]
    InvalidLength(usize),

    #[error("content hash is not valid hex: {0}")]
    InvalidHex(String),
}

impl ContentHash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for ContentHash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() != 64 {
            return Err(HashParseError::InvalidLength(s.len()));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| HashParseError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Self)
        }
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_prefix() {
        let hex = "ab".repeat(32);
        let plain: ContentHash = hex.parse().unwrap();
        let prefixed: ContentHash = format!("0x{hex}").parse().unwrap();
        assert_eq!(plain, prefixed);
        assert_eq!(plain.as_bytes(), &[0xab; 32]);
    }

    #[test]
    fn rejects_short_input() {
        assert_eq!(
            "abcd".parse::<ContentHash>(),
            Err(HashParseError::InvalidLength(4))
        );
    }

    #[test]
    fn json_is_hex_bincode_is_raw() {
        let hash = ContentHash::new([0x01; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
        assert_eq!(serde_json::from_str::<ContentHash>(&json).unwrap(), hash);

        let bytes = bincode::serialize(&hash).unwrap();
        assert_eq!(bytes, vec![0x01; 32]);
        assert_eq!(bincode::deserialize::<ContentHash>(&bytes).unwrap(), hash);
    }

    #[test]
    fn rejects_non_hex() {
        let bad = "zz".repeat(32);
        assert!(matches!(
            bad.parse::<ContentHash>(),
            Err(HashParseError::InvalidHex(_))
        ));
    }
}
