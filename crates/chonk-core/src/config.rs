use crate::{
    consensus::ConsensusAlgorithm,
    constants::*,
    mine::NonceSearchOptions,
    ConfigError, HashAlgorithm,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub miner: MinerConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()?;
        self.miner.validate()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub algorithm: ConsensusAlgorithm,
    pub node_count: usize,
    pub round_ms: u64,
    /// Fraction of the round spent in the working state before PoW/PoS/DPoS elect.
    pub election_delay: f64,
    /// Pre-prepare, prepare and commit offsets as fractions of the round.
    pub pbft_phases: [f64; 3],
    pub fault_probability: f64,
    pub stake_range: (u64, u64),
    pub computing_range: (u64, u64),
    pub network_delay_ms: (u64, u64),
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            algorithm: ConsensusAlgorithm::default(),
            node_count: DEFAULT_NODE_COUNT,
            round_ms: ROUND_DURATION_MS,
            election_delay: ELECTION_DELAY_FRACTION,
            pbft_phases: PBFT_PHASE_FRACTIONS,
            fault_probability: PBFT_FAULT_PROBABILITY,
            stake_range: STAKE_RANGE,
            computing_range: COMPUTING_RANGE,
            network_delay_ms: NETWORK_DELAY_RANGE_MS,
        }
    }
}

impl SimulationConfig {
    pub fn round_duration(&self) -> Duration {
        Duration::from_millis(self.round_ms)
    }

    pub fn election_delay(&self) -> Duration {
        self.fraction_of_round(self.election_delay)
    }

    pub fn pbft_phase_delays(&self) -> [Duration; 3] {
        self.pbft_phases.map(|f| self.fraction_of_round(f))
    }

    fn fraction_of_round(&self, fraction: f64) -> Duration {
        Duration::from_millis((self.round_ms as f64 * fraction).round() as u64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_count == 0 {
            return Err(ConfigError::NoNodes);
        }
        if self.round_ms == 0 {
            return Err(ConfigError::ZeroRoundDuration);
        }
        check_fraction("election_delay", self.election_delay)?;
        for f in self.pbft_phases {
            check_fraction("pbft phase", f)?;
        }
        if !self.pbft_phases.windows(2).all(|w| w[0] < w[1]) {
            return Err(ConfigError::UnorderedPhases);
        }
        if !(0.0..=1.0).contains(&self.fault_probability) {
            return Err(ConfigError::FaultProbability(self.fault_probability));
        }
        check_range("stake", self.stake_range)?;
        check_range("computing", self.computing_range)?;
        check_range("network delay", self.network_delay_ms)
    }
}

fn check_fraction(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::FractionOutOfRange { name, value })
    }
}

fn check_range(name: &'static str, (low, high): (u64, u64)) -> Result<(), ConfigError> {
    if low <= high {
        Ok(())
    } else {
        Err(ConfigError::EmptyRange { name, low, high })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    pub difficulty: u32,
    pub max_iterations: u64,
    pub batch_size: u64,
    pub progress_interval: u64,
    pub algorithm: HashAlgorithm,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            batch_size: MINE_BATCH_SIZE,
            progress_interval: PROGRESS_INTERVAL,
            algorithm: HashAlgorithm::Sha256,
        }
    }
}

impl MinerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Zero("batch_size"));
        }
        if self.progress_interval == 0 {
            return Err(ConfigError::Zero("progress_interval"));
        }
        let max = self.algorithm.hex_len() as u32;
        if self.difficulty > max {
            return Err(ConfigError::DifficultyTooHigh {
                difficulty: self.difficulty,
                max: max.min(MAX_DIFFICULTY),
            });
        }
        Ok(())
    }

    pub fn options(&self) -> NonceSearchOptions {
        NonceSearchOptions {
            difficulty: self.difficulty,
            max_iterations: self.max_iterations,
            batch_size: self.batch_size,
            progress_interval: self.progress_interval,
            algorithm: self.algorithm,
            cancel: None,
        }
    }
}
