use super::{
    election::{self, delegates, dpos_leader, pbft_leader, quorum, weighted_pick},
    node::initialize_nodes,
    ConsensusAlgorithm, ConsensusNode, NodeState, NodeView,
};
use crate::{
    config::SimulationConfig,
    random::{self, RandomSource},
    schedule::Scheduler,
    ConfigError,
};
use rand::rngs::StdRng;
use serde::Serialize;
use std::{fmt, time::Duration};
use tracing::{debug, info, trace, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    #[default]
    Idle,
    Working,
    PrePrepare,
    Prepare,
    Elected,
    Committed,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RoundTask {
    Start,
    Elect,
    PrePrepare,
    Prepare,
    Commit,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoundOutcome {
    /// Zero-based number of the round that just finished.
    pub round: u64,
    pub algorithm: ConsensusAlgorithm,
    pub leader: Option<usize>,
    pub participants: usize,
    pub height_advanced: bool,
    pub block_height: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub algorithm: ConsensusAlgorithm,
    pub round: u64,
    pub block_height: u64,
    pub running: bool,
    pub phase: RoundPhase,
    pub leader: Option<usize>,
    pub nodes: Vec<NodeView>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&Snapshot)>;

/// Consensus round state machine.
///
/// Time only moves through [`Simulator::advance`] / [`Simulator::advance_to`]. While
/// running, a `Start` task fires every round interval and schedules the algorithm's
/// phase tasks at fractions of that interval. Pausing, stopping, resizing the roster
/// or switching algorithm cancels everything still queued and moves the scheduler to
/// a new epoch; a task from an older epoch is dropped without touching state.
pub struct Simulator<R = StdRng> {
    config: SimulationConfig,
    rng: R,
    nodes: Vec<ConsensusNode>,
    round: u64,
    block_height: u64,
    running: bool,
    phase: RoundPhase,
    leader: Option<usize>,
    scheduler: Scheduler<RoundTask>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
    last_outcome: Option<RoundOutcome>,
}

impl<R> fmt::Debug for Simulator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("algorithm", &self.config.algorithm)
            .field("nodes", &self.nodes.len())
            .field("round", &self.round)
            .field("block_height", &self.block_height)
            .field("running", &self.running)
            .field("phase", &self.phase)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Simulator<StdRng> {
    pub fn from_entropy(config: SimulationConfig) -> Result<Self, ConfigError> {
        Self::new(config, random::from_entropy())
    }

    pub fn seeded(config: SimulationConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::new(config, random::seeded(seed))
    }
}

impl<R: RandomSource> Simulator<R> {
    pub fn new(config: SimulationConfig, mut rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let nodes = initialize_nodes(config.node_count, &config, &mut rng);
        Ok(Self {
            config,
            rng,
            nodes,
            round: 0,
            block_height: 0,
            running: false,
            phase: RoundPhase::Idle,
            leader: None,
            scheduler: Scheduler::new(),
            observers: Vec::new(),
            next_subscription: 0,
            last_outcome: None,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn algorithm(&self) -> ConsensusAlgorithm {
        self.config.algorithm
    }

    pub fn nodes(&self) -> &[ConsensusNode] {
        &self.nodes
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn leader(&self) -> Option<usize> {
        self.leader
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn epoch(&self) -> u64 {
        self.scheduler.epoch()
    }

    pub fn last_outcome(&self) -> Option<&RoundOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            algorithm: self.config.algorithm,
            round: self.round,
            block_height: self.block_height,
            running: self.running,
            phase: self.phase,
            leader: self.leader,
            nodes: self.nodes.iter().map(NodeView::from).collect(),
        }
    }

    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&Snapshot) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    /// Replace the roster with `count` fresh nodes. Counters restart from zero.
    pub fn initialize_nodes(&mut self, count: usize) -> Result<(), ConfigError> {
        if count == 0 {
            return Err(ConfigError::NoNodes);
        }
        self.config.node_count = count;
        self.reset();
        self.resume_if_running();
        self.notify();
        Ok(())
    }

    /// Switch algorithm. Whatever round was in flight is abandoned and the roster
    /// is rebuilt.
    pub fn set_algorithm(&mut self, algorithm: ConsensusAlgorithm) {
        info!(from = %self.config.algorithm, to = %algorithm, "switching consensus algorithm");
        self.config.algorithm = algorithm;
        self.reset();
        self.resume_if_running();
        self.notify();
    }

    /// Begin running rounds. The first round starts on the next advance.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.scheduler.schedule_after(Duration::ZERO, RoundTask::Start);
        info!(algorithm = %self.config.algorithm, nodes = self.nodes.len(), "simulation started");
        self.notify();
    }

    /// Stop scheduling rounds and drop the one in flight. Counters and roster stay;
    /// nodes go back to `pending`.
    pub fn pause(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.scheduler.cancel_all();
        self.set_all(NodeState::Pending);
        self.leader = None;
        self.phase = RoundPhase::Idle;
        info!(round = self.round, "simulation paused");
        self.notify();
    }

    /// Pause and reset: fresh roster, round and height back to zero.
    pub fn stop(&mut self) {
        self.running = false;
        self.reset();
        info!("simulation stopped");
        self.notify();
    }

    pub fn advance(&mut self, elapsed: Duration) {
        let now = self.scheduler.now() + elapsed;
        self.advance_to(now);
    }

    /// Fire every task due at or before `now`, in order.
    pub fn advance_to(&mut self, now: Duration) {
        self.advance_until(now, u64::MAX);
    }

    /// Like [`Simulator::advance_to`], but stop as soon as the round counter reaches
    /// `round_limit`. The clock then rests on the task that finished that round.
    pub fn advance_until(&mut self, now: Duration, round_limit: u64) {
        while self.round < round_limit {
            let Some(entry) = self.scheduler.pop_due(now) else {
                self.scheduler.set_now(now);
                return;
            };
            if !self.scheduler.is_current(&entry) {
                trace!(task = ?entry.task, epoch = entry.epoch, "dropping stale round task");
                continue;
            }
            self.apply(entry.task);
        }
    }

    /// Run one whole round right away, without waiting on the clock. Anything already
    /// queued is cancelled first; if the simulator is running the next round is
    /// scheduled one interval later.
    pub fn advance_round(&mut self) -> Option<RoundOutcome> {
        self.scheduler.cancel_all();
        let followups = self.begin_round();
        self.notify();
        let mut outcome = None;
        for (_, task) in followups {
            if let Some(done) = self.run_phase(task) {
                outcome = Some(done);
            }
            self.notify();
        }
        self.resume_after(self.config.round_duration());
        outcome
    }

    fn resume_if_running(&mut self) {
        self.resume_after(Duration::ZERO);
    }

    fn resume_after(&mut self, delay: Duration) {
        if self.running {
            self.scheduler.schedule_after(delay, RoundTask::Start);
        }
    }

    fn reset(&mut self) {
        let epoch = self.scheduler.cancel_all();
        self.nodes = initialize_nodes(self.config.node_count, &self.config, &mut self.rng);
        self.round = 0;
        self.block_height = 0;
        self.phase = RoundPhase::Idle;
        self.leader = None;
        self.last_outcome = None;
        debug!(epoch, nodes = self.nodes.len(), "simulator reset");
    }

    fn apply(&mut self, task: RoundTask) {
        match task {
            RoundTask::Start => {
                if !self.running {
                    return;
                }
                for (delay, task) in self.begin_round() {
                    self.scheduler.schedule_after(delay, task);
                }
                self.scheduler
                    .schedule_after(self.config.round_duration(), RoundTask::Start);
            }
            other => {
                self.run_phase(other);
            }
        }
        self.notify();
    }

    fn run_phase(&mut self, task: RoundTask) -> Option<RoundOutcome> {
        match task {
            RoundTask::Start => None,
            RoundTask::Elect => Some(self.elect()),
            RoundTask::PrePrepare => {
                self.pre_prepare();
                None
            }
            RoundTask::Prepare => {
                self.prepare();
                None
            }
            RoundTask::Commit => Some(self.commit()),
        }
    }

    /// Reset every node to `pending`, enter the working state and return the phase
    /// tasks for this round with their offsets from the round start.
    fn begin_round(&mut self) -> Vec<(Duration, RoundTask)> {
        for node in &mut self.nodes {
            node.state = NodeState::Pending;
        }
        self.leader = None;
        self.phase = RoundPhase::Working;
        debug!(round = self.round, algorithm = %self.config.algorithm, "round started");

        match self.config.algorithm {
            ConsensusAlgorithm::Pow => {
                self.set_all(NodeState::Mining);
                vec![(self.config.election_delay(), RoundTask::Elect)]
            }
            ConsensusAlgorithm::Pos => {
                self.set_all(NodeState::Staking);
                vec![(self.config.election_delay(), RoundTask::Elect)]
            }
            ConsensusAlgorithm::Dpos => {
                for i in delegates(&self.nodes) {
                    self.nodes[i].state = NodeState::Validator;
                }
                vec![(self.config.election_delay(), RoundTask::Elect)]
            }
            ConsensusAlgorithm::Pbft => {
                self.leader = pbft_leader(self.nodes.len(), self.round);
                if let Some(leader) = self.leader {
                    self.nodes[leader].state = NodeState::Leader;
                }
                let [pre_prepare, prepare, commit] = self.config.pbft_phase_delays();
                vec![
                    (pre_prepare, RoundTask::PrePrepare),
                    (prepare, RoundTask::Prepare),
                    (commit, RoundTask::Commit),
                ]
            }
        }
    }

    fn set_all(&mut self, state: NodeState) {
        for node in &mut self.nodes {
            node.state = state;
        }
    }

    fn elect(&mut self) -> RoundOutcome {
        let leader = match self.config.algorithm {
            ConsensusAlgorithm::Pow => {
                let weights: Vec<u64> = self.nodes.iter().map(|n| n.computing).collect();
                weighted_pick(&weights, &mut self.rng)
            }
            ConsensusAlgorithm::Pos => {
                let weights: Vec<u64> = self.nodes.iter().map(|n| n.stake).collect();
                weighted_pick(&weights, &mut self.rng)
            }
            ConsensusAlgorithm::Dpos => dpos_leader(&delegates(&self.nodes), self.round),
            ConsensusAlgorithm::Pbft => self.leader,
        };

        if matches!(
            self.config.algorithm,
            ConsensusAlgorithm::Pow | ConsensusAlgorithm::Pos
        ) {
            self.set_all(NodeState::Validator);
        }
        if let Some(leader) = leader {
            self.nodes[leader].state = NodeState::Leader;
        }
        self.leader = leader;
        self.complete_round(true)
    }

    fn pre_prepare(&mut self) {
        let failed =
            election::inject_faults(&mut self.nodes, self.config.fault_probability, &mut self.rng);
        self.phase = RoundPhase::PrePrepare;
        debug!(round = self.round, failed, "pre-prepare");
    }

    fn prepare(&mut self) {
        for node in &mut self.nodes {
            if !matches!(node.state, NodeState::Failed | NodeState::Leader) {
                node.state = NodeState::Validator;
            }
        }
        self.phase = RoundPhase::Prepare;
        debug!(round = self.round, "prepare");
    }

    fn commit(&mut self) -> RoundOutcome {
        let participants = election::participants(&self.nodes);
        let needed = quorum(self.nodes.len());
        let committed = participants >= needed;
        if !committed {
            warn!(round = self.round, participants, needed, "pbft round missed quorum");
        }
        self.complete_round(committed)
    }

    fn complete_round(&mut self, height_advanced: bool) -> RoundOutcome {
        if height_advanced {
            self.block_height += 1;
        }
        let outcome = RoundOutcome {
            round: self.round,
            algorithm: self.config.algorithm,
            leader: self.leader,
            participants: election::participants(&self.nodes),
            height_advanced,
            block_height: self.block_height,
        };
        self.round += 1;
        self.phase = match (self.config.algorithm, height_advanced) {
            (ConsensusAlgorithm::Pbft, true) => RoundPhase::Committed,
            (ConsensusAlgorithm::Pbft, false) => RoundPhase::Failed,
            _ => RoundPhase::Elected,
        };
        info!(
            round = outcome.round,
            leader = ?outcome.leader,
            height = self.block_height,
            committed = height_advanced,
            "round complete"
        );
        self.last_outcome = Some(outcome.clone());
        outcome
    }

    fn notify(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for (_, observer) in &mut self.observers {
            observer(&snapshot);
        }
    }
}
