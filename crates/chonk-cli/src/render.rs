use chonk_core::{
    chain::Verification,
    consensus::{RoundOutcome, Simulator},
    mine::MineOutcome,
    random::RandomSource,
    Block, BlockStatus,
};

fn short(hash: &str) -> &str {
    &hash[..hash.len().min(16)]
}

pub fn mine_outcome(outcome: &MineOutcome, tip: &Block) {
    let verdict = match (outcome.found, outcome.cancelled) {
        (true, _) => "found",
        (false, true) => "cancelled",
        (false, false) => "not found",
    };
    println!("{verdict} after {} attempts", outcome.attempts);
    println!("nonce: {}", outcome.nonce);
    println!("hash:  {}", outcome.hash);
    println!("tip:   #{} ({} txs)", tip.index, tip.transactions.len());
}

pub fn verification(v: &Verification) {
    println!(
        "{:>3}  {:<8} {:<18} {:>8}  {:<16}  {:<16}",
        "#", "status", "check", "nonce", "hash", "previous"
    );
    for (block, check) in v.blocks.iter().zip(&v.checks) {
        let status = match block.status {
            BlockStatus::Valid => "valid",
            BlockStatus::Invalid => "INVALID",
            BlockStatus::Mining => "mining",
            BlockStatus::Pending => "pending",
        };
        println!(
            "{:>3}  {:<8} {:<18} {:>8}  {:<16}  {:<16}",
            block.index,
            status,
            format!("{check:?}"),
            block.nonce,
            short(&block.hash),
            short(&block.previous_hash),
        );
    }
    if v.valid {
        println!("chain valid");
    } else {
        println!("chain INVALID at {:?}", v.invalid_indices());
    }
}

pub fn roster<R: RandomSource>(sim: &Simulator<R>) {
    println!("{} with {} nodes", sim.algorithm().label(), sim.nodes().len());
    for node in sim.nodes() {
        println!(
            "  node-{:<3} stake {:>5}  compute {:>4}  delay {:>4}ms",
            node.id, node.stake, node.computing, node.delay_ms
        );
    }
}

pub fn round(outcome: &RoundOutcome, node_count: usize) {
    let leader = outcome
        .leader
        .map(|l| format!("node-{l}"))
        .unwrap_or_else(|| "-".into());
    let result = if outcome.height_advanced { "committed" } else { "no quorum" };
    println!(
        "round {:>4}  {:<4}  leader {:<8}  participants {}/{}  height {:>4}  {}",
        outcome.round,
        outcome.algorithm.to_string(),
        leader,
        outcome.participants,
        node_count,
        outcome.block_height,
        result
    );
}

pub fn summary<R: RandomSource>(sim: &Simulator<R>) {
    println!(
        "{} rounds, block height {}",
        sim.round(),
        sim.block_height()
    );
}
