//! # Tavern Economy
//!
//! Reward economy engine for Endless Tavern: lootboxes, the shop, the spin
//! wheel, and armor progression.
//!
//! ## Design Principles
//!
//! 1. **Unsigned balances** - a balance can never go negative, a failed debit changes nothing
//! 2. **Injected randomness** - every draw goes through [`RandomSource`], so a seed replays a session
//! 3. **Save-on-write** - the ledger is persisted once per completed operation, never mid-way
//! 4. **External configuration** - all reward tables live in TOML files
//!
//! ## Example
//!
//! ```rust,ignore
//! use tavern_economy::{Currency, EconomyConfig, EconomySession, MemoryStore, SeededRandom};
//!
//! let config = EconomyConfig::from_toml_file("data/economy.toml")?;
//! let mut session = EconomySession::new(config, MemoryStore::new(), SeededRandom::from_seed(7))?;
//!
//! session.grant(Currency::Coin, 500)?;
//! let outcome = session.purchase("small_loot_box")?;
//!
//! for event in session.drain_events() {
//!     display.show(event);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod currency;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod loot;
pub mod progression;
pub mod random;
pub mod reveal;
pub mod session;
pub mod shop;
pub mod spin;
pub mod store;

pub use config::EconomyConfig;
pub use currency::{Currency, ItemId};
pub use error::{EconomyError, EconomyResult};
pub use journal::JournalStore;
pub use ledger::Ledger;
pub use loot::{
    grant_items, ItemGrant, LootResolver, LootStatistics, RewardBundle, RewardPool, RewardRoll,
    YieldRange,
};
pub use progression::{Material, NextTier, Progress, ProgressionTable, ProgressionTier};
pub use random::{RandomSource, ScriptedRandom, SeededRandom};
pub use reveal::{reveal_all, Reveal, RevealCursor, RevealedEntry, RewardRevealSequencer};
pub use session::{EconomyEvent, EconomySession, PurchaseOutcome};
pub use shop::{Offer, PurchaseEngine, PurchaseReceipt, ShopCatalog};
pub use spin::{SpinOutcome, SpinResolver, SpinWheelConfig};
pub use store::{LedgerSnapshot, LedgerStore, MemoryStore};
