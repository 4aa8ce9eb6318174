//! # Ledger Persistence
//!
//! The ledger hands a complete [`LedgerSnapshot`] to its store after every
//! mutating operation. Stores never see a half-applied operation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::currency::{Currency, ItemId};
use crate::error::EconomyResult;

/// Full persisted economic state of one player.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Coin balance.
    pub coins: u32,
    /// Ticket balance.
    pub tickets: u32,
    /// Gem balance.
    pub gems: u32,
    /// Armor pieces owned per set. Absent means zero.
    pub owned: BTreeMap<ItemId, u32>,
}

impl LedgerSnapshot {
    /// Balance of a currency; zero for non-balance categories.
    #[must_use]
    pub fn balance(&self, currency: Currency) -> u32 {
        match currency {
            Currency::Coin => self.coins,
            Currency::Ticket => self.tickets,
            Currency::Gem => self.gems,
            _ => 0,
        }
    }

    /// Pieces owned of an armor set.
    #[must_use]
    pub fn owned(&self, item: ItemId) -> u32 {
        self.owned.get(&item).copied().unwrap_or(0)
    }
}

/// Persistence collaborator of the ledger.
pub trait LedgerStore {
    /// Loads the last saved snapshot, `None` for a new player.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Persistence` if the store cannot be read.
    fn load(&mut self) -> EconomyResult<Option<LedgerSnapshot>>;

    /// Saves a full snapshot, replacing the previous one.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Persistence` if the write fails.
    fn save(&mut self, snapshot: &LedgerSnapshot) -> EconomyResult<()>;
}

/// In-memory store. Keeps the last snapshot and counts saves.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    saved: Option<LedgerSnapshot>,
    save_count: usize,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds a snapshot.
    #[must_use]
    pub fn with_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            saved: Some(snapshot),
            save_count: 0,
        }
    }

    /// The last saved snapshot.
    #[must_use]
    pub fn saved(&self) -> Option<&LedgerSnapshot> {
        self.saved.as_ref()
    }

    /// How many times `save` ran.
    #[must_use]
    pub const fn save_count(&self) -> usize {
        self.save_count
    }
}

impl LedgerStore for MemoryStore {
    fn load(&mut self) -> EconomyResult<Option<LedgerSnapshot>> {
        Ok(self.saved.clone())
    }

    fn save(&mut self, snapshot: &LedgerSnapshot) -> EconomyResult<()> {
        self.saved = Some(snapshot.clone());
        self.save_count += 1;
        Ok(())
    }
}
