pub const SHA256_HEX_SIZE: usize = 64;
pub const SIMPLE_HEX_SIZE: usize = 16;
pub const TX_ID_HEX_SIZE: usize = 16;
pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const MAX_DIFFICULTY: u32 = SHA256_HEX_SIZE as u32;

pub const DEFAULT_DIFFICULTY: u32 = 2;
pub const DEFAULT_MAX_ITERATIONS: u64 = 100_000;
pub const MINE_BATCH_SIZE: u64 = 100;
pub const PROGRESS_INTERVAL: u64 = 10;

pub const DEFAULT_NODE_COUNT: usize = 7;
pub const ROUND_DURATION_MS: u64 = 3_000;
pub const ELECTION_DELAY_FRACTION: f64 = 0.5;
pub const PBFT_PHASE_FRACTIONS: [f64; 3] = [0.2, 0.4, 0.6];
pub const PBFT_FAULT_PROBABILITY: f64 = 0.1;
pub const MIN_DPOS_DELEGATES: usize = 3;

pub const STAKE_RANGE: (u64, u64) = (100, 1_000);
pub const COMPUTING_RANGE: (u64, u64) = (10, 100);
pub const NETWORK_DELAY_RANGE_MS: (u64, u64) = (20, 300);
