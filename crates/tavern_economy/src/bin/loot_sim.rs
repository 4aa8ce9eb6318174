//! Lootbox simulator - runs seeded pulls against a configuration and prints
//! what a player would have collected.
//!
//! Usage:
//!   cargo run --release --bin loot_sim -- --config data/economy.toml --size medium --pulls 10000
//!   cargo run --release --bin loot_sim -- --size large --journal /tmp/player.tldg

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tavern_economy::{
    Currency, EconomyConfig, EconomyResult, EconomySession, ItemId, JournalStore, LedgerStore,
    LootStatistics, MemoryStore, SeededRandom,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Size {
    Small,
    Medium,
    Large,
}

impl From<Size> for Currency {
    fn from(size: Size) -> Self {
        match size {
            Size::Small => Self::SmallLootBox,
            Size::Medium => Self::MediumLootBox,
            Size::Large => Self::LargeLootBox,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Simulate lootbox pulls for economy tuning")]
struct Args {
    /// Economy configuration file.
    #[arg(short, long, default_value = "data/economy.toml")]
    config: PathBuf,

    /// Lootbox size to open.
    #[arg(short, long, value_enum, default_value = "small")]
    size: Size,

    /// Number of boxes to open.
    #[arg(short, long, default_value = "1000")]
    pulls: u32,

    /// RNG seed.
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Persist the ledger to a journal file instead of memory.
    #[arg(long)]
    journal: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        tracing::error!(error = %e, "simulation failed");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> EconomyResult<()> {
    let config = EconomyConfig::from_toml_file(&args.config)?;
    let rng = SeededRandom::from_seed(args.seed);

    match &args.journal {
        Some(path) => {
            let store = JournalStore::open(path)?;
            simulate(EconomySession::new(config, store, rng)?, args)
        }
        None => simulate(EconomySession::new(config, MemoryStore::new(), rng)?, args),
    }
}

fn simulate<S: LedgerStore>(
    mut session: EconomySession<S, SeededRandom>,
    args: &Args,
) -> EconomyResult<()> {
    let size = Currency::from(args.size);
    let mut stats = LootStatistics::new();

    for _ in 0..args.pulls {
        let bundle = session.open_loot_box(size)?;
        stats.record(&bundle);
        session.drain_events();
    }

    println!("{size:?} x {} (seed {})", stats.pulls, args.seed);
    println!("  empty pulls: {}", stats.empty_pulls);
    for currency in Currency::BALANCES {
        println!(
            "  {currency:?}: total {} avg {:.2}",
            stats.currency_totals.get(&currency).copied().unwrap_or(0),
            stats.average(currency)
        );
    }

    let ledger = session.ledger();
    let progression = session.config().progression();
    for item in ItemId::ALL {
        let owned = ledger.owned(item);
        println!(
            "  {item:?}: {owned} pieces, unlocked {:?}",
            progression.unlocked_materials(item, owned)?
        );
    }

    Ok(())
}
