//! Leader-election simulator for the consensus visualizer.
//!
//! A fixed roster of nodes runs one round per interval under one of four algorithms.
//! The simulator is a plain state machine driven by virtual time; see
//! [`simulator::Simulator`].

pub mod election;
pub mod node;
pub mod simulator;

pub use node::{ConsensusNode, NodeState, NodeView, Position};
pub use simulator::{RoundOutcome, RoundPhase, Simulator, Snapshot, SubscriptionId};

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusAlgorithm {
    #[default]
    Pow,
    Pos,
    Dpos,
    Pbft,
}

impl ConsensusAlgorithm {
    pub const ALL: [ConsensusAlgorithm; 4] = [
        ConsensusAlgorithm::Pow,
        ConsensusAlgorithm::Pos,
        ConsensusAlgorithm::Dpos,
        ConsensusAlgorithm::Pbft,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ConsensusAlgorithm::Pow => "Proof of Work",
            ConsensusAlgorithm::Pos => "Proof of Stake",
            ConsensusAlgorithm::Dpos => "Delegated Proof of Stake",
            ConsensusAlgorithm::Pbft => "Practical Byzantine Fault Tolerance",
        }
    }
}

impl fmt::Display for ConsensusAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConsensusAlgorithm::Pow => "pow",
            ConsensusAlgorithm::Pos => "pos",
            ConsensusAlgorithm::Dpos => "dpos",
            ConsensusAlgorithm::Pbft => "pbft",
        };
        f.write_str(s)
    }
}

impl FromStr for ConsensusAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConsensusAlgorithm::ALL
            .into_iter()
            .find(|a| a.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown consensus algorithm `{s}` (pow, pos, dpos, pbft)"))
    }
}
