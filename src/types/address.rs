//! Wallet Addresses

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::VaultError;

const ADDRESS_BYTES: usize = 20;

/// EVM wallet address, stored as lowercase `0x`-prefixed hex.
///
/// Users are identified by the address the external authentication flow
/// vouched for; no checksum or signature validation happens here.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build an address from raw bytes
    pub fn from_bytes(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// Short form for log lines, e.g. `0x1234…abcd`
    pub fn short(&self) -> String {
        format!("{}…{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl FromStr for Address {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| VaultError::InvalidAddress(format!("missing 0x prefix: {}", s)))?;

        let bytes = hex::decode(body)
            .map_err(|e| VaultError::InvalidAddress(format!("{}: {}", s, e)))?;

        if bytes.len() != ADDRESS_BYTES {
            return Err(VaultError::InvalidAddress(format!(
                "{}: expected {} bytes, got {}",
                s,
                ADDRESS_BYTES,
                bytes.len()
            )));
        }

        Ok(Self(format!("0x{}", body.to_lowercase())))
    }
}

impl TryFrom<String> for Address {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}
