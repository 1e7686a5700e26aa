//! Property tests for hashing, mining and verification.

use chonk_core::{
    chain::{verify, ToyChain},
    compute_hash, is_valid,
    mine::mine,
    pow::leading_zeros,
    Block, BlockStatus, HashAlgorithm, Transaction,
};
use proptest::prelude::*;

fn block(index: u64, timestamp: u64, amount: u64, nonce: u64) -> Block {
    let mut block = Block::new(
        index,
        timestamp,
        vec![Transaction::new("alice", "bob", amount, timestamp)],
        "0",
    );
    block.nonce = nonce;
    block
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_hash_is_deterministic(
        index in 0u64..1_000,
        timestamp in 0u64..u64::MAX,
        amount in 0u64..u64::MAX,
        nonce in 0u64..u64::MAX,
    ) {
        let b = block(index, timestamp, amount, nonce);
        for algorithm in [HashAlgorithm::Sha256, HashAlgorithm::Simple] {
            let first = compute_hash(&b.fields(), algorithm).unwrap();
            prop_assert_eq!(&first, &compute_hash(&b.fields(), algorithm).unwrap());
            prop_assert_eq!(first.len(), algorithm.hex_len());
        }
    }

    #[test]
    fn prop_mine_terminates_within_budget(
        difficulty in 0u32..=3,
        budget in 0u64..400,
        amount in 0u64..1_000,
        start in 0u64..1_000_000,
    ) {
        let mut b = block(1, 1_600_000_000, amount, start);
        let outcome = mine(&mut b, difficulty, budget, |_| {}).unwrap();
        prop_assert!(outcome.attempts <= budget);
        if outcome.found {
            prop_assert!(leading_zeros(&outcome.hash) >= difficulty as usize);
            prop_assert_eq!(b.compute_hash(HashAlgorithm::Sha256).unwrap(), outcome.hash.clone());
            prop_assert_eq!(b.status, BlockStatus::Valid);
        } else {
            prop_assert_eq!(outcome.attempts, budget);
        }
        if difficulty == 0 && budget > 0 {
            prop_assert!(outcome.found);
            prop_assert_eq!(outcome.nonce, start);
        }
    }

    #[test]
    fn prop_valid_blocks_meet_their_difficulty(
        difficulty in 0u32..=2,
        amounts in proptest::collection::vec(1u64..500, 1..4),
        tamper in proptest::option::of((0usize..4, 1u64..500)),
    ) {
        let mut chain = ToyChain::new(difficulty, HashAlgorithm::Sha256).unwrap();
        for (i, amount) in amounts.iter().enumerate() {
            chain.submit(Transaction::new("a", "b", *amount, i as u64));
            let outcome = chain.mine_pending("rig", i as u64, 1_000_000, |_| {}).unwrap();
            prop_assert!(outcome.found);
        }
        if let Some((index, amount)) = tamper {
            let index = 1 + index % amounts.len();
            chain.tamper_amount(index, 0, amount).unwrap();
        }
        let verification = verify(chain.blocks()).unwrap();
        for b in &verification.blocks[1..] {
            if b.status == BlockStatus::Valid {
                prop_assert!(is_valid(b, b.required_difficulty()));
                prop_assert!(is_valid(b, difficulty));
            }
        }
        prop_assert_eq!(
            verification.valid,
            verification.blocks.iter().all(|b| b.status == BlockStatus::Valid)
        );
    }
}
