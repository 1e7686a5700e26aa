mod drive;
mod render;

use anyhow::{bail, Context, Result};
use chonk_core::{
    chain::ToyChain,
    config::Config,
    consensus::{ConsensusAlgorithm, RoundOutcome, Simulator},
    digest,
    pow::{leading_zeros, meets_difficulty},
    Block, HashAlgorithm, Transaction,
};
use clap::{Parser, Subcommand};
use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "chonk")]
#[command(about = "Toy chain, miner and consensus simulators behind the CHONK9K visualizers")]
struct Cli {
    /// JSON config file with `simulation` and `miner` sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hash a string and count its leading zeros
    Hash {
        input: String,
        #[arg(long)]
        algorithm: Option<HashAlgorithm>,
        /// Report whether the digest meets this difficulty
        #[arg(long, default_value_t = 0)]
        difficulty: u32,
    },
    /// Mine a single block on top of a genesis block
    Mine {
        #[arg(long)]
        difficulty: Option<u32>,
        #[arg(long)]
        max_iterations: Option<u64>,
        #[arg(long)]
        algorithm: Option<HashAlgorithm>,
        /// Transaction as FROM:TO:AMOUNT, repeatable
        #[arg(long = "tx", value_parser = parse_tx)]
        txs: Vec<Transaction>,
        #[arg(long)]
        json: bool,
    },
    /// Build a small chain, optionally tamper with it, and verify it
    Chain {
        #[arg(long, default_value_t = 3)]
        blocks: u64,
        #[arg(long)]
        difficulty: Option<u32>,
        /// Overwrite an amount as BLOCK:TX:AMOUNT, repeatable
        #[arg(long, value_parser = parse_tamper)]
        tamper: Vec<Tamper>,
        /// Recompute the stored hash of every tampered block
        #[arg(long)]
        rehash: bool,
        #[arg(long)]
        json: bool,
    },
    /// Run the consensus simulator
    Simulate {
        #[arg(long)]
        algorithm: Option<ConsensusAlgorithm>,
        #[arg(long)]
        nodes: Option<usize>,
        #[arg(long, default_value_t = 5)]
        rounds: u64,
        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
        /// Pace rounds on the wall clock instead of virtual time
        #[arg(long)]
        realtime: bool,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug)]
struct Tamper {
    block: usize,
    tx: usize,
    amount: u64,
}

fn parse_tx(s: &str) -> Result<Transaction, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let [from, to, amount] = parts.as_slice() else {
        return Err(format!("expected FROM:TO:AMOUNT, got `{s}`"));
    };
    let amount = amount
        .parse::<u64>()
        .map_err(|e| format!("bad amount `{amount}`: {e}"))?;
    Ok(Transaction::new(*from, *to, amount, unix_now()))
}

fn parse_tamper(s: &str) -> Result<Tamper, String> {
    let nums = s
        .split(':')
        .map(|p| p.parse::<u64>().map_err(|e| format!("bad number `{p}`: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match nums.as_slice() {
        [block, tx, amount] => Ok(Tamper {
            block: *block as usize,
            tx: *tx as usize,
            amount: *amount,
        }),
        _ => Err(format!("expected BLOCK:TX:AMOUNT, got `{s}`")),
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = load_config(cli.config.as_deref())?;

    match cli.cmd {
        Command::Hash {
            input,
            algorithm,
            difficulty,
        } => {
            let algorithm = algorithm.unwrap_or(config.miner.algorithm);
            let hex = digest(input.as_bytes(), algorithm);
            println!("algorithm:     {algorithm}");
            println!("digest:        {hex}");
            println!("leading zeros: {}", leading_zeros(&hex));
            let verdict = if meets_difficulty(&hex, difficulty) { "yes" } else { "no" };
            println!("difficulty {difficulty}:  {verdict}");
        }
        Command::Mine {
            difficulty,
            max_iterations,
            algorithm,
            txs,
            json,
        } => {
            if let Some(d) = difficulty {
                config.miner.difficulty = d;
            }
            if let Some(n) = max_iterations {
                config.miner.max_iterations = n;
            }
            if let Some(a) = algorithm {
                config.miner.algorithm = a;
            }
            config.miner.validate()?;

            let mut chain = ToyChain::new(config.miner.difficulty, config.miner.algorithm)?;
            for tx in txs {
                chain.submit(tx);
            }
            let candidate: Block = chain.candidate("cli", unix_now());
            let (block, outcome) = drive::mine_block(config.miner.options(), candidate, !json).await?;
            if outcome.found {
                chain.append(block);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                render::mine_outcome(&outcome, chain.tip());
            }
        }
        Command::Chain {
            blocks,
            difficulty,
            tamper,
            rehash,
            json,
        } => {
            if let Some(d) = difficulty {
                config.miner.difficulty = d;
            }
            config.miner.validate()?;

            let mut chain = ToyChain::new(config.miner.difficulty, config.miner.algorithm)?;
            let base = unix_now();
            for i in 0..blocks {
                chain.submit(Transaction::new("chonk-dev", format!("holder-{i}"), 9_000 + i, base + i));
                chain.submit(Transaction::new(format!("holder-{i}"), "chonk-dev", 1 + i, base + i));
                let outcome =
                    chain.mine_pending_with("cli", base + i, config.miner.options(), |_| {})?;
                if !outcome.found {
                    bail!(
                        "block {} not mined within {} iterations",
                        i + 1,
                        config.miner.max_iterations
                    );
                }
            }
            for t in &tamper {
                chain.tamper_amount(t.block, t.tx, t.amount)?;
                if rehash {
                    chain.rehash(t.block)?;
                }
            }
            let verification = chain.verify()?;
            info!(valid = verification.valid, blocks = chain.blocks().len(), "chain verified");
            if json {
                println!("{}", serde_json::to_string_pretty(&verification)?);
            } else {
                render::verification(&verification);
            }
        }
        Command::Simulate {
            algorithm,
            nodes,
            rounds,
            seed,
            realtime,
            json,
        } => {
            if let Some(a) = algorithm {
                config.simulation.algorithm = a;
            }
            if let Some(n) = nodes {
                config.simulation.node_count = n;
            }
            config.simulation.validate()?;

            let mut sim = match seed {
                Some(seed) => Simulator::seeded(config.simulation.clone(), seed)?,
                None => Simulator::from_entropy(config.simulation.clone())?,
            };
            if !json {
                render::roster(&sim);
            }
            let node_count = sim.nodes().len();
            let print = |outcome: &RoundOutcome| -> Result<()> {
                if json {
                    println!("{}", serde_json::to_string(outcome)?);
                } else {
                    render::round(outcome, node_count);
                }
                Ok(())
            };
            let completed = if realtime {
                drive::simulate_realtime(&mut sim, rounds, print).await?
            } else {
                drive::simulate_virtual(&mut sim, rounds, print)?
            };
            info!(completed, "simulation finished");
            if json {
                println!("{}", serde_json::to_string(&sim.snapshot())?);
            } else {
                render::summary(&sim);
            }
            sim.stop();
        }
    }
    Ok(())
}
