//! # Ledger
//!
//! The only mutable economic state of a session: three currency balances and
//! the armor pieces owned per set.
//!
//! ## Guarantees
//!
//! 1. **No negatives**: balances are unsigned and `debit` checks first
//! 2. **All-or-nothing**: a failed `debit` leaves every value untouched
//! 3. **Save-on-write**: callers run `persist()` once per completed operation

use crate::currency::{Currency, ItemId};
use crate::error::{EconomyError, EconomyResult};
use crate::store::{LedgerSnapshot, LedgerStore};

/// Number of spendable balances.
const BALANCE_COUNT: usize = Currency::BALANCES.len();

/// Number of armor sets.
const ITEM_COUNT: usize = ItemId::ALL.len();

/// Currency balances and owned armor pieces, backed by a store.
#[derive(Debug)]
pub struct Ledger<S> {
    /// Indexed by `Currency as usize` for Coin, Ticket, Gem.
    balances: [u32; BALANCE_COUNT],
    /// Indexed by `ItemId as usize`.
    owned: [u32; ITEM_COUNT],
    store: S,
}

impl<S: LedgerStore> Ledger<S> {
    /// Creates an empty ledger without reading the store.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            balances: [0; BALANCE_COUNT],
            owned: [0; ITEM_COUNT],
            store,
        }
    }

    /// Loads the ledger from its store; a new player starts at zero.
    ///
    /// # Errors
    ///
    /// Returns the store's error if loading fails.
    pub fn load(mut store: S) -> EconomyResult<Self> {
        let snapshot = store.load()?.unwrap_or_default();
        tracing::debug!(?snapshot, "ledger loaded");
        Ok(Self::from_snapshot(&snapshot, store))
    }

    /// Builds a ledger holding `snapshot`.
    #[must_use]
    pub fn from_snapshot(snapshot: &LedgerSnapshot, store: S) -> Self {
        let mut ledger = Self::new(store);
        for currency in Currency::BALANCES {
            ledger.balances[currency as usize] = snapshot.balance(currency);
        }
        for item in ItemId::ALL {
            ledger.owned[item as usize] = snapshot.owned(item);
        }
        ledger
    }

    /// Current balance; zero for lootbox sizes and `Other`.
    #[inline]
    #[must_use]
    pub fn balance(&self, currency: Currency) -> u32 {
        if currency.is_balance() {
            self.balances[currency as usize]
        } else {
            0
        }
    }

    /// Pieces owned of an armor set.
    #[inline]
    #[must_use]
    pub fn owned(&self, item: ItemId) -> u32 {
        self.owned[item as usize]
    }

    /// Whether `price` of `currency` can be paid right now.
    #[inline]
    #[must_use]
    pub fn can_afford(&self, currency: Currency, price: u32) -> bool {
        price <= self.balance(currency)
    }

    /// Adds to a balance. Lootbox sizes and `Other` are not balances and are
    /// ignored.
    pub fn credit(&mut self, currency: Currency, amount: u32) {
        if !currency.is_balance() {
            tracing::debug!(?currency, amount, "credit ignored: not a balance");
            return;
        }
        let slot = &mut self.balances[currency as usize];
        *slot = slot.saturating_add(amount);
    }

    /// Subtracts from a balance.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InsufficientFunds` without touching any value
    /// if `amount` exceeds the balance.
    pub fn debit(&mut self, currency: Currency, amount: u32) -> EconomyResult<()> {
        let available = self.balance(currency);
        if amount > available {
            return Err(EconomyError::InsufficientFunds {
                currency,
                required: amount,
                available,
            });
        }
        if currency.is_balance() {
            self.balances[currency as usize] = available - amount;
        }
        Ok(())
    }

    /// Adds armor pieces. The progression cap is the caller's concern.
    pub fn add_owned(&mut self, item: ItemId, amount: u32) {
        let slot = &mut self.owned[item as usize];
        *slot = slot.saturating_add(amount);
    }

    /// Copies the full state out.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            coins: self.balances[Currency::Coin as usize],
            tickets: self.balances[Currency::Ticket as usize],
            gems: self.balances[Currency::Gem as usize],
            owned: ItemId::ALL
                .iter()
                .filter(|item| self.owned[**item as usize] > 0)
                .map(|item| (*item, self.owned[*item as usize]))
                .collect(),
        }
    }

    /// Hands the full state to the store.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the save fails.
    pub fn persist(&mut self) -> EconomyResult<()> {
        let snapshot = self.snapshot();
        self.store.save(&snapshot)
    }

    /// The persistence collaborator.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the persistence collaborator.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consumes the ledger, returning its store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }
}
