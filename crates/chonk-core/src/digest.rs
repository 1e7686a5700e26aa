//! Hex digests over arbitrary byte strings.
//!
//! Two algorithms are offered: SHA-256 for everything that has to look like a real
//! chain, and 64-bit FNV-1a as a cheap, non-cryptographic fallback that makes hash
//! collisions and weak avalanche behaviour easy to show side by side.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{fmt, str::FromStr};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Simple,
}

impl HashAlgorithm {
    pub fn hex_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => crate::constants::SHA256_HEX_SIZE,
            HashAlgorithm::Simple => crate::constants::SIMPLE_HEX_SIZE,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha256 => f.write_str("sha256"),
            HashAlgorithm::Simple => f.write_str("simple"),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "simple" | "fnv" => Ok(HashAlgorithm::Simple),
            other => Err(format!("unknown hash algorithm `{other}`")),
        }
    }
}

/// Lowercase hex digest of `message`.
pub fn digest(message: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(message)),
        HashAlgorithm::Simple => format!("{:016x}", fnv1a64(message)),
    }
}

fn fnv1a64(message: &[u8]) -> u64 {
    message.iter().fold(FNV_OFFSET_BASIS, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}
