//! # Economy Session
//!
//! The single entry point the game calls. A session owns the player's
//! ledger, the configuration, and the random source, and sequences the
//! multi-step flows:
//!
//! ```text
//! purchase("small_loot_box")
//!     │
//!     ├─> PurchaseEngine::purchase ── debit + persist
//!     │
//!     └─> LootResolver::resolve ───── roll + credit + persist (per box)
//!             │
//!             ▼
//!     EconomyEvent buffer ──> drained by the display layer
//! ```
//!
//! Display code never subscribes to anything; it drains the event buffer
//! after each call.

use crate::config::EconomyConfig;
use crate::currency::{Currency, ItemId};
use crate::error::{EconomyError, EconomyResult};
use crate::ledger::Ledger;
use crate::loot::RewardBundle;
use crate::progression::Progress;
use crate::random::RandomSource;
use crate::shop::{PurchaseEngine, PurchaseReceipt};
use crate::spin::SpinOutcome;
use crate::store::LedgerStore;

// ============================================================================
// Events
// ============================================================================

/// Something the display layer should react to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EconomyEvent {
    /// A shop offer was bought.
    Purchased {
        /// Offer name.
        offer: String,
        /// What the purchase delivered.
        receipt: PurchaseReceipt,
    },
    /// A lootbox was opened.
    LootBoxOpened {
        /// Lootbox size.
        size: Currency,
        /// What it contained.
        bundle: RewardBundle,
    },
    /// The spin wheel stopped.
    SpinCompleted {
        /// Segment and payout.
        outcome: SpinOutcome,
    },
    /// A bonus reward was granted outside the shop.
    Granted {
        /// Currency granted.
        currency: Currency,
        /// Amount granted.
        amount: u32,
    },
}

/// Result of [`EconomySession::purchase`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseOutcome {
    /// What the purchase delivered.
    pub receipt: PurchaseReceipt,
    /// Contents of every lootbox opened as part of the purchase.
    pub opened: Vec<RewardBundle>,
}

// ============================================================================
// Session
// ============================================================================

/// One player's economy.
#[derive(Debug)]
pub struct EconomySession<S, R> {
    config: EconomyConfig,
    ledger: Ledger<S>,
    rng: R,
    events: Vec<EconomyEvent>,
}

impl<S: LedgerStore, R: RandomSource> EconomySession<S, R> {
    /// Loads the player's ledger from `store` and starts a session.
    ///
    /// # Errors
    ///
    /// Returns the store's error if loading fails.
    pub fn new(config: EconomyConfig, store: S, rng: R) -> EconomyResult<Self> {
        let ledger = Ledger::load(store)?;
        Ok(Self {
            config,
            ledger,
            rng,
            events: Vec::new(),
        })
    }

    /// Opens one lootbox of `size`.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` if the size has no pool
    /// or a progression table is missing; the ledger is unchanged then.
    pub fn open_loot_box(&mut self, size: Currency) -> EconomyResult<RewardBundle> {
        let pool = self.config.pool(size)?;
        let bundle = self
            .config
            .loot_resolver()
            .resolve(pool, &mut self.ledger, &mut self.rng)?;

        tracing::info!(?size, empty = bundle.is_empty(), "lootbox opened");
        self.events.push(EconomyEvent::LootBoxOpened {
            size,
            bundle: bundle.clone(),
        });
        Ok(bundle)
    }

    /// Buys a named offer. Lootbox rewards are opened right away.
    ///
    /// # Errors
    ///
    /// - `EconomyError::ConfigurationMissing` for an unknown offer, or for a
    ///   lootbox size without a pool (checked before paying)
    /// - `EconomyError::InsufficientFunds` with nothing changed
    /// - `EconomyError::InvalidOffer` for an `Other` reward
    pub fn purchase(&mut self, offer_name: &str) -> EconomyResult<PurchaseOutcome> {
        let offer = *self.config.shop().offer(offer_name)?;
        if offer.reward_currency.is_loot_box() {
            self.config.pool(offer.reward_currency)?;
        }

        let receipt = PurchaseEngine::purchase(&offer, &mut self.ledger)?;
        self.events.push(EconomyEvent::Purchased {
            offer: offer_name.to_string(),
            receipt,
        });

        let mut opened = Vec::new();
        if let PurchaseReceipt::LootBoxPending { size, count } = receipt {
            for _ in 0..count {
                opened.push(self.open_loot_box(size)?);
            }
        }

        Ok(PurchaseOutcome { receipt, opened })
    }

    /// Pays for and resolves one spin.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` without a wheel, or
    /// `EconomyError::InsufficientFunds` when the spin cannot be paid.
    pub fn spin(&mut self) -> EconomyResult<SpinOutcome> {
        let outcome = self
            .config
            .spin_resolver()?
            .spin(&mut self.ledger, &mut self.rng)?;
        self.events.push(EconomyEvent::SpinCompleted {
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    /// Credits a bonus reward (minigame payout, daily gift) and saves.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidOffer` for a lootbox size or `Other`,
    /// with nothing saved or reported, or the store's error if persisting
    /// fails.
    pub fn grant(&mut self, currency: Currency, amount: u32) -> EconomyResult<()> {
        if !currency.is_balance() {
            return Err(EconomyError::InvalidOffer(format!(
                "{currency:?} cannot be granted as a balance"
            )));
        }
        self.ledger.credit(currency, amount);
        self.ledger.persist()?;
        self.events.push(EconomyEvent::Granted { currency, amount });
        Ok(())
    }

    /// Which shop offers the player can afford right now.
    #[must_use]
    pub fn affordability(&self) -> Vec<(String, bool)> {
        self.config.shop().affordability(&self.ledger)
    }

    /// Unlock progress of an armor set.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` if the set has no tiers.
    pub fn progress(&self, item: ItemId) -> EconomyResult<Progress> {
        self.config
            .progression()
            .progress(item, self.ledger.owned(item))
    }

    /// The player's ledger.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// Takes every event raised since the last drain.
    pub fn drain_events(&mut self) -> Vec<EconomyEvent> {
        std::mem::take(&mut self.events)
    }

    /// Ends the session, returning the ledger's store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.ledger.into_store()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loot::{RewardPool, RewardRoll, YieldRange};
    use crate::progression::{Material, ProgressionTable, ProgressionTier};
    use crate::random::{ScriptedRandom, SeededRandom};
    use crate::shop::{Offer, ShopCatalog};
    use crate::spin::SpinWheelConfig;
    use crate::store::{LedgerSnapshot, MemoryStore};

    fn create_test_config() -> EconomyConfig {
        let tiers = vec![
            ProgressionTier { material: Material::Bronze, price: 0, threshold: 10 },
            ProgressionTier { material: Material::Silver, price: 100, threshold: 30 },
        ];
        let progression =
            ProgressionTable::new(ItemId::ALL.map(|item| (item, tiers.clone()))).unwrap();

        let pool = RewardPool {
            coins: RewardRoll::new(100.0, 10, 10),
            items: RewardRoll::new(100.0, 4, 4),
            ..RewardPool::default()
        };
        let wheel = SpinWheelConfig {
            gems: YieldRange::new(2, 2),
            ..SpinWheelConfig::new(vec![Currency::Gem])
        };
        let shop = ShopCatalog::new()
            .with_offer("box", Offer::new(Currency::Coin, 50, Currency::SmallLootBox, 2))
            .with_offer("gems", Offer::new(Currency::Coin, 100, Currency::Gem, 5))
            .with_offer("medium", Offer::new(Currency::Coin, 1, Currency::MediumLootBox, 1));

        EconomyConfig::new(2, progression)
            .unwrap()
            .with_pool(Currency::SmallLootBox, pool)
            .unwrap()
            .with_spin_wheel(wheel)
            .unwrap()
            .with_shop(shop)
            .unwrap()
    }

    fn session_with(coins: u32) -> EconomySession<MemoryStore, SeededRandom> {
        let store = MemoryStore::with_snapshot(LedgerSnapshot {
            coins,
            ..LedgerSnapshot::default()
        });
        EconomySession::new(create_test_config(), store, SeededRandom::from_seed(9)).unwrap()
    }

    #[test]
    fn test_session_loads_ledger() {
        let session = session_with(75);
        assert_eq!(session.ledger().balance(Currency::Coin), 75);
    }

    #[test]
    fn test_purchase_loot_box_opens_each_box() {
        let mut session = session_with(60);
        let outcome = session.purchase("box").unwrap();

        assert_eq!(
            outcome.receipt,
            PurchaseReceipt::LootBoxPending { size: Currency::SmallLootBox, count: 2 }
        );
        assert_eq!(outcome.opened.len(), 2);
        assert_eq!(session.ledger().balance(Currency::Coin), 10 + 10 + 10);
        assert_eq!(session.ledger().store().save_count(), 3);

        let events = session.drain_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], EconomyEvent::Purchased { .. }));
        assert!(matches!(events[1], EconomyEvent::LootBoxOpened { .. }));
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_purchase_without_pool_fails_before_paying() {
        let mut session = session_with(5);
        let result = session.purchase("medium");
        assert!(matches!(result, Err(EconomyError::ConfigurationMissing(_))));
        assert_eq!(session.ledger().balance(Currency::Coin), 5);
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_purchase_insufficient_funds() {
        let mut session = session_with(40);
        let result = session.purchase("gems");
        assert!(matches!(result, Err(EconomyError::InsufficientFunds { .. })));
        assert_eq!(session.ledger().store().save_count(), 0);
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_spin_and_grant() {
        let config = create_test_config();
        let mut session =
            EconomySession::new(config, MemoryStore::new(), ScriptedRandom::new()).unwrap();

        assert!(matches!(session.spin(), Err(EconomyError::InsufficientFunds { .. })));

        session.grant(Currency::Ticket, 5).unwrap();
        let outcome = session.spin().unwrap();
        assert_eq!(outcome.category, Currency::Gem);
        assert_eq!(session.ledger().balance(Currency::Gem), 2);
        assert_eq!(session.ledger().balance(Currency::Ticket), 0);

        let events = session.drain_events();
        assert_eq!(
            events[0],
            EconomyEvent::Granted { currency: Currency::Ticket, amount: 5 }
        );
        assert!(matches!(events[1], EconomyEvent::SpinCompleted { .. }));
    }

    #[test]
    fn test_progress_and_affordability() {
        let mut session = session_with(100);
        session.open_loot_box(Currency::SmallLootBox).unwrap();

        let owned: u32 = ItemId::ALL.iter().map(|i| session.ledger().owned(*i)).sum();
        assert_eq!(owned, 4);

        for item in ItemId::ALL {
            let progress = session.progress(item).unwrap();
            assert!(matches!(progress, Progress::InProgress { target: 10, .. }));
        }

        let affordable = session.affordability();
        assert!(affordable.iter().all(|(_, ok)| *ok));
    }

    #[test]
    fn test_grant_rejects_non_balance() {
        let mut session = session_with(0);
        let before = session.ledger().snapshot();

        for currency in [Currency::LargeLootBox, Currency::Other] {
            let result = session.grant(currency, 3);
            assert!(matches!(result, Err(EconomyError::InvalidOffer(_))));
        }

        assert_eq!(session.ledger().snapshot(), before);
        assert_eq!(session.ledger().store().save_count(), 0);
        assert!(session.drain_events().is_empty());
    }
}
