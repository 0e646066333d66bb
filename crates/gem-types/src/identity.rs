use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Stable identity of one interface contract.
///
/// Every interface contract carries exactly one `InterfaceId`, embedded as a
/// constant next to the contract's definition. Two identities are equal iff
/// they name the same contract version. Dispatch on identities is always an
/// exact match; there is no range or prefix matching.
///
/// The all-ones value is reserved for [`InterfaceId::GENERIC`], the universal
/// base capability every object implements.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceId(u64);

impl InterfaceId {
    /// Identity of the universal base capability.
    pub const GENERIC: Self = Self(u64::MAX);

    /// Create an identity from a literal value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Mint an identity from a contract name, e.g. `"gem.Counter.v1"`.
    ///
    /// The same name always produces the same identity. Intended for
    /// generating the literal that is then pasted into the contract as a
    /// constant; the result never collides with [`InterfaceId::GENERIC`].
    pub fn derive(name: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"gem-interface-v1:");
        hasher.update(name.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        let value = u64::from_be_bytes(bytes);
        if value == u64::MAX {
            Self(value - 1)
        } else {
            Self(value)
        }
    }

    /// The raw 64-bit value.
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns `true` for the universal base capability.
    pub const fn is_generic(self) -> bool {
        self.0 == u64::MAX
    }

    /// Hex-encoded value (16 characters, big-endian).
    pub fn to_hex(self) -> String {
        hex::encode(self.0.to_be_bytes())
    }

    /// Parse from 16 hex characters, with or without the `iid:` prefix.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let s = s.strip_prefix("iid:").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 8 {
            return Err(TypeError::InvalidLength {
                expected: 8,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&bytes);
        Ok(Self(u64::from_be_bytes(arr)))
    }
}

impl fmt::Debug for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterfaceId({})", self.to_hex())
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "iid:{}", self.to_hex())
    }
}

impl From<u64> for InterfaceId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<InterfaceId> for u64 {
    fn from(id: InterfaceId) -> Self {
        id.0
    }
}
