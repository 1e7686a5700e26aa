#![allow(dead_code)]

use chonk_core::{chain::ToyChain, HashAlgorithm, Transaction};

pub const BASE_TS: u64 = 1_600_000_000;

pub fn sample_tx(i: u64) -> Transaction {
    Transaction::new(format!("user{i}"), format!("user{}", i + 1), 10 + i, BASE_TS + i * 100)
}

/// Genesis plus `blocks` mined blocks, two transactions each.
pub fn build_chain(blocks: u64, difficulty: u32) -> ToyChain {
    let mut chain = ToyChain::new(difficulty, HashAlgorithm::Sha256).expect("genesis");
    for i in 0..blocks {
        chain.submit(sample_tx(2 * i));
        chain.submit(sample_tx(2 * i + 1).signed(format!("sig-{i}")));
        let outcome = chain
            .mine_pending("rig-1", BASE_TS + 1_000 + i, 1_000_000, |_| {})
            .expect("mining");
        assert!(outcome.found, "block {i} not mined within budget");
    }
    chain
}
