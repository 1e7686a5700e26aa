use crate::{
    compute_hash, constants::PROGRESS_INTERVAL, constants::MINE_BATCH_SIZE,
    pow::meets_difficulty, Block, BlockStatus, DigestError, HashAlgorithm,
};
use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{debug, info};

/// Payload handed to progress callbacks while a search runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MineProgress {
    pub nonce: u64,
    pub hash: String,
    pub found: bool,
    pub attempts: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MineOutcome {
    pub nonce: u64,
    pub hash: String,
    pub found: bool,
    pub attempts: u64,
    pub cancelled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchState {
    Running(MineProgress),
    Done(MineOutcome),
}

/// Shared stop flag, checked between batches only.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Resumable nonce search over a single block.
///
/// The block is mutated in place: every attempt writes the candidate nonce and hash,
/// and a successful search flips the status to `valid`. Work happens only inside
/// [`NonceSearch::step`], so a caller decides how much to do before yielding.
#[derive(Debug)]
pub struct NonceSearch {
    block: Block,
    difficulty: u32,
    max_iterations: u64,
    algorithm: HashAlgorithm,
    progress_interval: u64,
    next_nonce: u64,
    attempts: u64,
    reported: u64,
    cancel: CancelToken,
    outcome: Option<MineOutcome>,
}

impl NonceSearch {
    pub fn new(mut block: Block, difficulty: u32, max_iterations: u64) -> Self {
        let next_nonce = block.nonce;
        block.status = BlockStatus::Mining;
        block.difficulty = Some(difficulty);
        Self {
            block,
            difficulty,
            max_iterations,
            algorithm: HashAlgorithm::default(),
            progress_interval: PROGRESS_INTERVAL,
            next_nonce,
            attempts: 0,
            reported: 0,
            cancel: CancelToken::new(),
            outcome: None,
        }
    }

    pub fn starting_at(mut self, nonce: u64) -> Self {
        self.next_nonce = nonce;
        self
    }

    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_progress_interval(mut self, every: u64) -> Self {
        self.progress_interval = every.max(1);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn into_block(self) -> Block {
        self.block
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn outcome(&self) -> Option<&MineOutcome> {
        self.outcome.as_ref()
    }

    /// Try up to `batch` nonces. Cancellation is observed on entry.
    pub fn step<F>(&mut self, batch: u64, mut on_progress: F) -> Result<SearchState, DigestError>
    where
        F: FnMut(&MineProgress),
    {
        if let Some(outcome) = &self.outcome {
            return Ok(SearchState::Done(outcome.clone()));
        }
        if self.cancel.is_cancelled() {
            debug!(attempts = self.attempts, "nonce search cancelled");
            return Ok(SearchState::Done(self.finish(false, true, &mut on_progress)));
        }

        for _ in 0..batch {
            if self.attempts >= self.max_iterations {
                break;
            }
            let nonce = self.next_nonce;
            let hash = compute_hash(&self.block.fields().with_nonce(nonce), self.algorithm)?;
            self.attempts += 1;
            self.block.nonce = nonce;
            self.block.hash = hash;

            if meets_difficulty(&self.block.hash, self.difficulty) {
                return Ok(SearchState::Done(self.finish(true, false, &mut on_progress)));
            }
            if self.attempts % self.progress_interval == 0 {
                self.reported = self.attempts;
                on_progress(&self.progress(false));
            }
            self.next_nonce = nonce.wrapping_add(1);
        }

        if self.attempts >= self.max_iterations {
            return Ok(SearchState::Done(self.finish(false, false, &mut on_progress)));
        }
        debug!(
            index = self.block.index,
            attempts = self.attempts,
            nonce = self.block.nonce,
            "mining batch done"
        );
        Ok(SearchState::Running(self.progress(false)))
    }

    fn progress(&self, found: bool) -> MineProgress {
        MineProgress {
            nonce: self.block.nonce,
            hash: self.block.hash.clone(),
            found,
            attempts: self.attempts,
        }
    }

    fn finish<F>(&mut self, found: bool, cancelled: bool, on_progress: &mut F) -> MineOutcome
    where
        F: FnMut(&MineProgress),
    {
        if found {
            self.block.status = BlockStatus::Valid;
            info!(
                index = self.block.index,
                nonce = self.block.nonce,
                attempts = self.attempts,
                hash = %self.block.hash,
                "mined block"
            );
        } else if !cancelled {
            debug!(
                index = self.block.index,
                attempts = self.attempts,
                "iteration budget exhausted"
            );
        }
        if self.attempts > 0 && self.attempts != self.reported {
            self.reported = self.attempts;
            on_progress(&self.progress(found));
        }
        let outcome = MineOutcome {
            nonce: self.block.nonce,
            hash: self.block.hash.clone(),
            found,
            attempts: self.attempts,
            cancelled,
        };
        self.outcome = Some(outcome.clone());
        outcome
    }
}

/// Run a search on `block` to completion, batch by batch, updating it in place.
///
/// Returns `found = false` with the last attempted nonce and hash once
/// `max_iterations` attempts are spent.
pub fn mine<F>(
    block: &mut Block,
    difficulty: u32,
    max_iterations: u64,
    on_progress: F,
) -> Result<MineOutcome, DigestError>
where
    F: FnMut(&MineProgress),
{
    mine_with(
        block,
        NonceSearchOptions {
            difficulty,
            max_iterations,
            ..NonceSearchOptions::default()
        },
        on_progress,
    )
}

#[derive(Clone, Debug)]
pub struct NonceSearchOptions {
    pub difficulty: u32,
    pub max_iterations: u64,
    pub batch_size: u64,
    pub progress_interval: u64,
    pub algorithm: HashAlgorithm,
    pub cancel: Option<CancelToken>,
}

impl Default for NonceSearchOptions {
    fn default() -> Self {
        Self {
            difficulty: crate::constants::DEFAULT_DIFFICULTY,
            max_iterations: crate::constants::DEFAULT_MAX_ITERATIONS,
            batch_size: MINE_BATCH_SIZE,
            progress_interval: PROGRESS_INTERVAL,
            algorithm: HashAlgorithm::default(),
            cancel: None,
        }
    }
}

impl NonceSearchOptions {
    pub fn search(&self, block: Block) -> NonceSearch {
        let search = NonceSearch::new(block, self.difficulty, self.max_iterations)
            .with_algorithm(self.algorithm)
            .with_progress_interval(self.progress_interval);
        match &self.cancel {
            Some(token) => search.with_cancel(token.clone()),
            None => search,
        }
    }
}

pub fn mine_with<F>(
    block: &mut Block,
    options: NonceSearchOptions,
    mut on_progress: F,
) -> Result<MineOutcome, DigestError>
where
    F: FnMut(&MineProgress),
{
    let mut search = options.search(block.clone());
    let batch = options.batch_size.max(1);
    let outcome = loop {
        if let SearchState::Done(outcome) = search.step(batch, &mut on_progress)? {
            break outcome;
        }
    };
    *block = search.into_block();
    Ok(outcome)
}
