use chonk_core::{
    config::SimulationConfig,
    consensus::{ConsensusAlgorithm, NodeState, RoundPhase, Simulator, Snapshot},
};
use std::{cell::RefCell, rc::Rc, time::Duration};

fn sim(algorithm: ConsensusAlgorithm, nodes: usize, seed: u64) -> Simulator {
    let config = SimulationConfig {
        algorithm,
        node_count: nodes,
        ..SimulationConfig::default()
    };
    Simulator::seeded(config, seed).unwrap()
}

#[test]
fn every_algorithm_makes_progress() {
    for algorithm in ConsensusAlgorithm::ALL {
        let mut sim = sim(algorithm, 7, 42);
        sim.start();
        sim.advance(Duration::from_secs(30));
        assert_eq!(sim.round(), 10, "{algorithm}");
        assert!(sim.block_height() <= sim.round());
        if algorithm != ConsensusAlgorithm::Pbft {
            assert_eq!(sim.block_height(), 10, "{algorithm}");
        }
    }
}

#[test]
fn failed_nodes_are_never_selected() {
    let mut sim = sim(ConsensusAlgorithm::Pbft, 10, 7);
    let snapshots: Rc<RefCell<Vec<Snapshot>>> = Rc::default();
    let sink = Rc::clone(&snapshots);
    sim.subscribe(move |s| sink.borrow_mut().push(s.clone()));
    sim.start();
    sim.advance(Duration::from_secs(60));
    let snapshots = snapshots.borrow();
    assert!(!snapshots.is_empty());
    for snapshot in snapshots.iter() {
        assert!(snapshot.nodes.iter().filter(|n| n.selected).count() <= 1);
        for node in &snapshot.nodes {
            if node.state == NodeState::Failed {
                assert!(!node.selected);
            }
        }
    }
}

#[test]
fn pbft_height_tracks_quorum() {
    let mut cfg = SimulationConfig {
        algorithm: ConsensusAlgorithm::Pbft,
        node_count: 6,
        ..SimulationConfig::default()
    };
    cfg.fault_probability = 0.5;
    let mut sim = Simulator::seeded(cfg, 1234).unwrap();
    for _ in 0..200 {
        let before = sim.block_height();
        let outcome = sim.advance_round().unwrap();
        let expected = outcome.participants >= 4;
        assert_eq!(outcome.height_advanced, expected);
        assert_eq!(sim.block_height(), before + u64::from(expected));
        let phase = if expected {
            RoundPhase::Committed
        } else {
            RoundPhase::Failed
        };
        assert_eq!(sim.phase(), phase);
    }
}

#[test]
fn same_seed_same_history() {
    let run = |seed| {
        let mut sim = sim(ConsensusAlgorithm::Pos, 8, seed);
        (0..25)
            .filter_map(|_| sim.advance_round())
            .map(|o| o.leader)
            .collect::<Vec<_>>()
    };
    assert_eq!(run(5), run(5));
}
