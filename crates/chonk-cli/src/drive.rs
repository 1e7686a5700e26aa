//! Async drivers: the core only does bounded chunks of work, these loops decide when
//! to run the next chunk.

use anyhow::Result;
use chonk_core::{
    consensus::{RoundOutcome, Simulator},
    mine::{CancelToken, MineOutcome, MineProgress, NonceSearchOptions, SearchState},
    random::RandomSource,
    Block,
};
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, warn};

const TICK: Duration = Duration::from_millis(50);

/// Mine `block` one batch at a time, yielding to the runtime between batches.
/// Ctrl-C cancels the search at the next batch boundary.
pub async fn mine_block(
    options: NonceSearchOptions,
    block: Block,
    show_progress: bool,
) -> Result<(Block, MineOutcome)> {
    let cancel = CancelToken::new();
    let batch = options.batch_size.max(1);
    let mut search = options.search(block).with_cancel(cancel.clone());
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut report = |p: &MineProgress| {
        if show_progress {
            eprint!("\rnonce {:>10}  {}", p.nonce, p.hash);
        }
    };
    let outcome = loop {
        match search.step(batch, &mut report)? {
            SearchState::Done(outcome) => break outcome,
            SearchState::Running(progress) => {
                debug!(attempts = progress.attempts, "yielding between batches");
                tokio::task::yield_now().await;
            }
        }
    };
    watcher.abort();
    if show_progress {
        eprintln!();
    }
    if outcome.cancelled {
        warn!(attempts = outcome.attempts, "mining interrupted");
    }
    Ok((search.into_block(), outcome))
}

/// Run `rounds` rounds in virtual time, one round interval per step.
pub fn simulate_virtual<R, F>(sim: &mut Simulator<R>, rounds: u64, mut on_round: F) -> Result<u64>
where
    R: RandomSource,
    F: FnMut(&RoundOutcome) -> Result<()>,
{
    let step = sim.config().round_duration();
    let limit = sim.round() + rounds;
    let mut seen = 0;
    sim.start();
    while sim.round() < limit {
        let horizon = sim.now() + step;
        seen += run_rounds(sim, horizon, limit, &mut on_round)?;
    }
    sim.pause();
    Ok(seen)
}

/// Run `rounds` rounds against the wall clock, or fewer on Ctrl-C.
pub async fn simulate_realtime<R, F>(
    sim: &mut Simulator<R>,
    rounds: u64,
    mut on_round: F,
) -> Result<u64>
where
    R: RandomSource,
    F: FnMut(&RoundOutcome) -> Result<()>,
{
    let mut ticker = interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let limit = sim.round() + rounds;
    let base = sim.now();
    let started = Instant::now();
    let mut seen = 0;
    sim.start();
    while sim.round() < limit {
        tokio::select! {
            _ = ticker.tick() => {
                seen += run_rounds(sim, base + started.elapsed(), limit, &mut on_round)?;
            }
            res = &mut ctrl_c => {
                res?;
                warn!(completed = seen, "simulation interrupted");
                break;
            }
        }
    }
    sim.pause();
    Ok(seen)
}

/// Advance to `now` one round at a time, handing over every round that finishes on
/// the way and never going past round `limit`.
fn run_rounds<R, F>(sim: &mut Simulator<R>, now: Duration, limit: u64, on_round: &mut F) -> Result<u64>
where
    R: RandomSource,
    F: FnMut(&RoundOutcome) -> Result<()>,
{
    let mut reported = 0;
    while sim.round() < limit {
        let before = sim.round();
        sim.advance_until(now, before + 1);
        if sim.round() == before {
            break;
        }
        if let Some(outcome) = sim.last_outcome() {
            on_round(outcome)?;
            reported += 1;
        }
    }
    Ok(reported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chonk_core::{config::SimulationConfig, consensus::ConsensusAlgorithm};

    fn fast_sim(round_ms: u64) -> Simulator {
        let config = SimulationConfig {
            algorithm: ConsensusAlgorithm::Pow,
            node_count: 3,
            round_ms,
            ..SimulationConfig::default()
        };
        Simulator::seeded(config, 1).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn realtime_reports_every_round_when_rounds_outpace_ticks() {
        let mut sim = fast_sim(5);
        let mut reported = Vec::new();
        let completed = simulate_realtime(&mut sim, 3, |o| {
            reported.push(o.round);
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(completed, 3);
        assert_eq!(reported, vec![0, 1, 2]);
        assert_eq!(sim.round(), 3);
        assert_eq!(sim.block_height(), 3);
        assert!(!sim.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn realtime_waits_for_slow_rounds() {
        let mut sim = fast_sim(200);
        let mut reported = Vec::new();
        let completed = simulate_realtime(&mut sim, 2, |o| {
            reported.push(o.round);
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(completed, 2);
        assert_eq!(reported, vec![0, 1]);
        assert_eq!(sim.round(), 2);
    }

    #[test]
    fn virtual_runs_exactly_the_requested_rounds() {
        for round_ms in [1, 5, 3_000] {
            let mut sim = fast_sim(round_ms);
            let mut reported = Vec::new();
            let completed = simulate_virtual(&mut sim, 4, |o| {
                reported.push(o.round);
                Ok(())
            })
            .unwrap();
            assert_eq!(completed, 4);
            assert_eq!(reported, vec![0, 1, 2, 3], "round_ms {round_ms}");
            assert_eq!(sim.round(), 4);
        }
    }

    #[test]
    fn callback_errors_stop_the_run() {
        let mut sim = fast_sim(5);
        let err = simulate_virtual(&mut sim, 4, |o| {
            if o.round == 1 {
                anyhow::bail!("sink closed");
            }
            Ok(())
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "sink closed");
        assert_eq!(sim.round(), 2);
    }
}
