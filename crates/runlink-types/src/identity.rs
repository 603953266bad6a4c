//! Identity types for Runlink
//!
//! Byte identities are fixed-width wrappers rendered as `0x`-prefixed hex, so
//! they read the same in logs, payloads and snapshots. Label identities are
//! requester-chosen strings.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::error::OracleError;

/// Compute the keccak-256 digest of `data`
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// Macro to generate fixed-width hex identity types
macro_rules! define_hex_type {
    ($name:ident, $len:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(into = "String", try_from = "String")]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Width in bytes
            pub const LEN: usize = $len;

            /// Create from raw bytes
            pub fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Get the raw bytes
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Parse from hex (with or without `0x` prefix)
            pub fn parse(s: &str) -> Result<Self, OracleError> {
                let raw = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(raw)
                    .map_err(|e| OracleError::invalid_input(stringify!($name), e.to_string()))?;
                let bytes: [u8; $len] = bytes.try_into().map_err(|_| {
                    OracleError::invalid_input(
                        stringify!($name),
                        format!("expected {} bytes", $len),
                    )
                })?;
                Ok(Self(bytes))
            }

            /// Convert to `0x`-prefixed hex
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = OracleError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.to_hex()
            }
        }

        impl TryFrom<String> for $name {
            type Error = OracleError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }
    };
}

/// Macro to generate requester-chosen label types
macro_rules! define_label_type {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

define_hex_type!(Address, 20, "Account or contract identity (caller, requester, consumer, token, broker)");
define_hex_type!(RequestId, 32, "Internal request identifier derived from requester and external id");
define_hex_type!(Selector, 4, "Callback entry point selector");

define_label_type!(ExternalId, "Requester-visible request identifier, unique per requester");
define_label_type!(SpecId, "Identifier of the off-chain job specification to run");

impl Address {
    /// The zero address; never a valid owner or payout target
    pub const ZERO: Address = Address([0u8; 20]);

    /// Deterministic address for a human-readable label
    pub fn from_label(label: &str) -> Self {
        let digest = keccak256(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Self(bytes)
    }

    /// Random address
    pub fn random() -> Self {
        Self(rand::random())
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl RequestId {
    /// Derive the internal id for `external_id` as chosen by `requester`
    ///
    /// The requester contributes a fixed-width prefix, so two requesters can
    /// never produce the same preimage for different external ids.
    pub fn derive(requester: &Address, external_id: &ExternalId) -> Self {
        let mut preimage = Vec::with_capacity(Address::LEN + external_id.0.len());
        preimage.extend_from_slice(requester.as_bytes());
        preimage.extend_from_slice(external_id.0.as_bytes());
        Self(keccak256(&preimage))
    }
}

impl Selector {
    /// Selector for a function signature such as `fulfill(bytes32,bytes32)`
    pub fn from_signature(signature: &str) -> Self {
        let digest = keccak256(signature.as_bytes());
        Self([digest[0], digest[1], digest[2], digest[3]])
    }
}
