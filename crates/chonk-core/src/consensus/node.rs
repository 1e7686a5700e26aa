use crate::{config::SimulationConfig, random::RandomSource};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const LAYOUT_CENTER: f64 = 50.0;
const LAYOUT_RADIUS: f64 = 40.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    #[default]
    Pending,
    Leader,
    Validator,
    Mining,
    Staking,
    Failed,
}

/// Layout coordinates in percent of the drawing area.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsensusNode {
    pub id: usize,
    pub position: Position,
    pub state: NodeState,
    pub stake: u64,
    pub computing: u64,
    pub delay_ms: u64,
}

impl ConsensusNode {
    /// Only the round leader is selected, so a failed node can never be.
    pub fn is_selected(&self) -> bool {
        self.state == NodeState::Leader
    }

    pub fn is_participating(&self) -> bool {
        matches!(self.state, NodeState::Leader | NodeState::Validator)
    }
}

/// Render-side view of a node with the derived `selected` flag spelled out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: usize,
    pub position: Position,
    pub state: NodeState,
    pub selected: bool,
    pub stake: u64,
    pub computing: u64,
    pub delay_ms: u64,
}

impl From<&ConsensusNode> for NodeView {
    fn from(node: &ConsensusNode) -> Self {
        Self {
            id: node.id,
            position: node.position,
            state: node.state,
            selected: node.is_selected(),
            stake: node.stake,
            computing: node.computing,
            delay_ms: node.delay_ms,
        }
    }
}

/// A fresh roster laid out on a circle, every node `pending`, attributes drawn from
/// the configured ranges.
pub fn initialize_nodes<R>(count: usize, config: &SimulationConfig, rng: &mut R) -> Vec<ConsensusNode>
where
    R: RandomSource + ?Sized,
{
    (0..count)
        .map(|id| {
            let angle = 2.0 * PI * id as f64 / count as f64 - PI / 2.0;
            ConsensusNode {
                id,
                position: Position {
                    x: LAYOUT_CENTER + LAYOUT_RADIUS * angle.cos(),
                    y: LAYOUT_CENTER + LAYOUT_RADIUS * angle.sin(),
                },
                state: NodeState::Pending,
                stake: rng.range_inclusive(config.stake_range.0, config.stake_range.1),
                computing: rng.range_inclusive(config.computing_range.0, config.computing_range.1),
                delay_ms: rng.range_inclusive(config.network_delay_ms.0, config.network_delay_ms.1),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::seeded;

    #[test]
    fn roster_is_pending_and_in_range() {
        let config = SimulationConfig::default();
        let nodes = initialize_nodes(9, &config, &mut seeded(3));
        assert_eq!(nodes.len(), 9);
        for (i, node) in nodes.iter().enumerate() {
            assert_eq!(node.id, i);
            assert_eq!(node.state, NodeState::Pending);
            assert!(!node.is_selected());
            assert!((config.stake_range.0..=config.stake_range.1).contains(&node.stake));
            assert!((config.computing_range.0..=config.computing_range.1).contains(&node.computing));
            assert!((config.network_delay_ms.0..=config.network_delay_ms.1).contains(&node.delay_ms));
            assert!((10.0..=90.0).contains(&node.position.x));
            assert!((10.0..=90.0).contains(&node.position.y));
        }
    }

    #[test]
    fn first_node_sits_at_the_top() {
        let nodes = initialize_nodes(4, &SimulationConfig::default(), &mut seeded(0));
        assert!((nodes[0].position.x - 50.0).abs() < 1e-9);
        assert!((nodes[0].position.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn selection_follows_state() {
        let mut node = initialize_nodes(1, &SimulationConfig::default(), &mut seeded(0)).remove(0);
        node.state = NodeState::Failed;
        assert!(!node.is_selected());
        assert!(!NodeView::from(&node).selected);
        node.state = NodeState::Leader;
        assert!(NodeView::from(&node).selected);
        assert!(node.is_participating());
    }
}
