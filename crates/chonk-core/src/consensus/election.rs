//! Leader selection rules, kept free of any timing so they can be checked directly.

use super::{ConsensusNode, NodeState};
use crate::{constants::MIN_DPOS_DELEGATES, random::RandomSource};

/// Cumulative-weight draw: `r` uniform in `[0, total)`, walk the weights subtracting
/// each from `r`, first one to take it to zero or below wins. Zero weights never win
/// unless every weight is zero, in which case the pick is uniform.
pub fn weighted_pick<R>(weights: &[u64], rng: &mut R) -> Option<usize>
where
    R: RandomSource + ?Sized,
{
    if weights.is_empty() {
        return None;
    }
    let total: u64 = weights.iter().sum();
    if total == 0 {
        let i = (rng.next_f64() * weights.len() as f64) as usize;
        return Some(i.min(weights.len() - 1));
    }

    let mut r = rng.next_f64() * total as f64;
    for (i, &w) in weights.iter().enumerate() {
        if w == 0 {
            continue;
        }
        r -= w as f64;
        if r <= 0.0 {
            return Some(i);
        }
    }
    // float slack: fall back to the last node that could have won
    weights.iter().rposition(|w| *w > 0)
}

/// Top `max(3, n / 2)` nodes by stake, capped at `n`. Equal stakes keep roster order.
pub fn delegates(nodes: &[ConsensusNode]) -> Vec<usize> {
    let count = MIN_DPOS_DELEGATES.max(nodes.len() / 2).min(nodes.len());
    let mut order: Vec<usize> = (0..nodes.len()).collect();
    order.sort_by(|a, b| nodes[*b].stake.cmp(&nodes[*a].stake));
    order.truncate(count);
    order
}

pub fn dpos_leader(delegates: &[usize], round: u64) -> Option<usize> {
    if delegates.is_empty() {
        return None;
    }
    Some(delegates[(round % delegates.len() as u64) as usize])
}

pub fn pbft_leader(node_count: usize, round: u64) -> Option<usize> {
    if node_count == 0 {
        return None;
    }
    Some((round % node_count as u64) as usize)
}

/// `ceil(2n / 3)`.
pub fn quorum(node_count: usize) -> usize {
    (2 * node_count).div_ceil(3)
}

/// Each non-leader independently fails with `probability`. Returns how many failed.
pub fn inject_faults<R>(nodes: &mut [ConsensusNode], probability: f64, rng: &mut R) -> usize
where
    R: RandomSource + ?Sized,
{
    let mut failed = 0;
    for node in nodes.iter_mut().filter(|n| n.state != NodeState::Leader) {
        if rng.chance(probability) {
            node.state = NodeState::Failed;
            failed += 1;
        }
    }
    failed
}

pub fn participants(nodes: &[ConsensusNode]) -> usize {
    nodes.iter().filter(|n| n.is_participating()).count()
}
