use crate::{
    constants::GENESIS_PREVIOUS_HASH,
    is_valid,
    mine::{mine_with, MineOutcome, MineProgress, NonceSearchOptions},
    Block, BlockStatus, ChainError, DigestError, HashAlgorithm, Transaction,
};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Why a block ended up with the status it has after verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCheck {
    Genesis,
    Ok,
    BrokenLink,
    HashMismatch,
    InsufficientWork,
}

impl BlockCheck {
    pub fn passed(self) -> bool {
        matches!(self, BlockCheck::Genesis | BlockCheck::Ok)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub valid: bool,
    pub blocks: Vec<Block>,
    pub checks: Vec<BlockCheck>,
}

impl Verification {
    pub fn invalid_indices(&self) -> Vec<u64> {
        self.blocks
            .iter()
            .filter(|b| b.status == BlockStatus::Invalid)
            .map(|b| b.index)
            .collect()
    }
}

/// Verify a chain hashed with SHA-256. See [`verify_with`].
pub fn verify(chain: &[Block]) -> Result<Verification, DigestError> {
    verify_with(chain, HashAlgorithm::Sha256)
}

/// Walk the whole chain and stamp every block `valid` or `invalid`.
///
/// The input is left untouched; the returned copy carries the new statuses. The first
/// block is trusted as genesis. Every later block must point at its predecessor's
/// stored hash, hash to its stored hash, and meet its own difficulty. Checking never
/// stops at the first failure.
pub fn verify_with(chain: &[Block], algorithm: HashAlgorithm) -> Result<Verification, DigestError> {
    let mut blocks = chain.to_vec();
    let mut checks = Vec::with_capacity(blocks.len());

    for i in 0..blocks.len() {
        let check = if i == 0 {
            BlockCheck::Genesis
        } else if blocks[i].previous_hash != blocks[i - 1].hash {
            BlockCheck::BrokenLink
        } else if blocks[i].compute_hash(algorithm)? != blocks[i].hash {
            BlockCheck::HashMismatch
        } else if !is_valid(&blocks[i], blocks[i].required_difficulty()) {
            BlockCheck::InsufficientWork
        } else {
            BlockCheck::Ok
        };
        if !check.passed() {
            debug!(index = blocks[i].index, ?check, "block failed verification");
        }
        blocks[i].status = if check.passed() {
            BlockStatus::Valid
        } else {
            BlockStatus::Invalid
        };
        checks.push(check);
    }

    let valid = checks.iter().all(|c| c.passed());
    Ok(Verification {
        valid,
        blocks,
        checks,
    })
}

/// Index 0, no transactions, previous hash `"0"`. Already hashed and marked valid.
pub fn genesis_block(timestamp: u64, algorithm: HashAlgorithm) -> Result<Block, DigestError> {
    let mut genesis = Block::new(0, timestamp, vec![], GENESIS_PREVIOUS_HASH).with_miner("genesis");
    genesis.hash = genesis.compute_hash(algorithm)?;
    genesis.status = BlockStatus::Valid;
    Ok(genesis)
}

/// The interactive demo chain: a pending pool, a miner, and tamper controls.
#[derive(Clone, Debug)]
pub struct ToyChain {
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
    difficulty: u32,
    algorithm: HashAlgorithm,
}

impl ToyChain {
    pub fn new(difficulty: u32, algorithm: HashAlgorithm) -> Result<Self, DigestError> {
        Self::with_genesis_timestamp(difficulty, algorithm, 0)
    }

    pub fn with_genesis_timestamp(
        difficulty: u32,
        algorithm: HashAlgorithm,
        timestamp: u64,
    ) -> Result<Self, DigestError> {
        Ok(Self {
            blocks: vec![genesis_block(timestamp, algorithm)?],
            pending: Vec::new(),
            difficulty,
            algorithm,
        })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn set_difficulty(&mut self, difficulty: u32) {
        self.difficulty = difficulty;
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn tip(&self) -> &Block {
        // genesis is always present
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn height(&self) -> u64 {
        self.tip().index
    }

    pub fn submit(&mut self, tx: Transaction) {
        self.pending.push(tx);
    }

    /// The block that mining would start from: the whole pending pool on top of the tip.
    pub fn candidate(&self, miner: &str, timestamp: u64) -> Block {
        Block::new(
            self.height() + 1,
            timestamp,
            self.pending.clone(),
            self.tip().hash.clone(),
        )
        .with_miner(miner)
        .with_difficulty(self.difficulty)
    }

    /// Mine the pending pool into a new block. The block is appended only when the
    /// search succeeds; otherwise the pool stays as it was.
    pub fn mine_pending<F>(
        &mut self,
        miner: &str,
        timestamp: u64,
        max_iterations: u64,
        on_progress: F,
    ) -> Result<MineOutcome, ChainError>
    where
        F: FnMut(&MineProgress),
    {
        let options = NonceSearchOptions {
            difficulty: self.difficulty,
            max_iterations,
            algorithm: self.algorithm,
            ..NonceSearchOptions::default()
        };
        self.mine_pending_with(miner, timestamp, options, on_progress)
    }

    pub fn mine_pending_with<F>(
        &mut self,
        miner: &str,
        timestamp: u64,
        options: NonceSearchOptions,
        on_progress: F,
    ) -> Result<MineOutcome, ChainError>
    where
        F: FnMut(&MineProgress),
    {
        let mut block = self.candidate(miner, timestamp);
        let outcome = mine_with(&mut block, options, on_progress)?;
        if outcome.found {
            info!(index = block.index, txs = block.transactions.len(), "block appended");
            self.pending.clear();
            self.blocks.push(block);
        }
        Ok(outcome)
    }

    /// Append a block produced elsewhere, e.g. by a [`crate::mine::NonceSearch`]
    /// driven step by step. Transactions it contains leave the pending pool.
    pub fn append(&mut self, block: Block) {
        self.pending.retain(|tx| !block.transactions.contains(tx));
        self.blocks.push(block);
    }

    /// Overwrite a transaction amount without touching any hash.
    pub fn tamper_amount(&mut self, block: usize, tx: usize, amount: u64) -> Result<(), ChainError> {
        let target = self
            .blocks
            .get_mut(block)
            .ok_or(ChainError::UnknownBlock(block))?;
        let entry = target
            .transactions
            .get_mut(tx)
            .ok_or(ChainError::UnknownTransaction { block, tx })?;
        warn!(block, tx, from = entry.amount, to = amount, "tampering with transaction");
        entry.amount = amount;
        Ok(())
    }

    /// Recompute one block's stored hash from its fields. Nonce, links and downstream
    /// blocks are left alone.
    pub fn rehash(&mut self, block: usize) -> Result<(), ChainError> {
        let algorithm = self.algorithm;
        let target = self
            .blocks
            .get_mut(block)
            .ok_or(ChainError::UnknownBlock(block))?;
        target.hash = target.compute_hash(algorithm)?;
        Ok(())
    }

    /// Verify and keep the resulting statuses.
    pub fn verify(&mut self) -> Result<Verification, ChainError> {
        let verification = verify_with(&self.blocks, self.algorithm)?;
        self.blocks = verification.blocks.clone();
        Ok(verification)
    }
}
