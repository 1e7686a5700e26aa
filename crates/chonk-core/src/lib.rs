//! Core of the CHONK9K chain visualizers: a toy proof-of-work chain, a cooperative
//! nonce miner and a multi-algorithm consensus simulator.

pub mod chain;
pub mod config;
pub mod consensus;
pub mod constants;
pub mod digest;
pub mod error;
pub mod mine;
pub mod random;
pub mod schedule;

pub use digest::{digest, HashAlgorithm};
pub use error::{ChainError, ConfigError, DigestError};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Transaction {
    /// Unsigned transfer. The id is derived from the transfer fields so identical
    /// transfers share an id.
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: u64, timestamp: u64) -> Self {
        let from = from.into();
        let to = to.into();
        let mut hasher = Sha256::new();
        hasher.update(format!("{from}|{to}|{amount}|{timestamp}").as_bytes());
        let mut id = hex::encode(hasher.finalize());
        id.truncate(constants::TX_ID_HEX_SIZE);
        Self {
            id,
            from,
            to,
            amount,
            timestamp,
            signature: None,
        }
    }

    pub fn signed(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    Valid,
    Invalid,
    Mining,
    Pending,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub nonce: u64,
    pub previous_hash: String,
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub miner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u32>,
    pub status: BlockStatus,
}

impl Block {
    /// A fresh block awaiting its proof of work: empty hash, nonce 0, status `mining`.
    pub fn new(
        index: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<String>,
    ) -> Self {
        Self {
            index,
            timestamp,
            transactions,
            nonce: 0,
            previous_hash: previous_hash.into(),
            hash: String::new(),
            miner: None,
            difficulty: None,
            status: BlockStatus::Mining,
        }
    }

    pub fn with_miner(mut self, miner: impl Into<String>) -> Self {
        self.miner = Some(miner.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn fields(&self) -> BlockFields<'_> {
        BlockFields {
            index: self.index,
            timestamp: self.timestamp,
            transactions: &self.transactions,
            nonce: self.nonce,
            previous_hash: &self.previous_hash,
        }
    }

    pub fn compute_hash(&self, algorithm: HashAlgorithm) -> Result<String, DigestError> {
        compute_hash(&self.fields(), algorithm)
    }

    /// A block without a recorded difficulty carries no proof-of-work requirement.
    pub fn required_difficulty(&self) -> u32 {
        self.difficulty.unwrap_or(0)
    }
}

/// The hashed portion of a block. `hash`, `status`, `miner` and `difficulty` are not
/// part of the hash input.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockFields<'a> {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: &'a [Transaction],
    pub nonce: u64,
    pub previous_hash: &'a str,
}

impl BlockFields<'_> {
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// JSON with fixed key order (struct declaration order).
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, DigestError> {
        Ok(serde_json::to_vec(self)?)
    }
}

pub fn compute_hash(fields: &BlockFields<'_>, algorithm: HashAlgorithm) -> Result<String, DigestError> {
    Ok(digest(&fields.canonical_bytes()?, algorithm))
}

/// True iff the stored hash starts with `difficulty` `'0'` characters.
pub fn is_valid(block: &Block, difficulty: u32) -> bool {
    pow::meets_difficulty(&block.hash, difficulty)
}

pub mod pow {
    /// Number of leading `'0'` characters of a hex digest.
    pub fn leading_zeros(hash: &str) -> usize {
        hash.bytes().take_while(|b| *b == b'0').count()
    }

    pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
        leading_zeros(hash) >= difficulty as usize
    }
}
