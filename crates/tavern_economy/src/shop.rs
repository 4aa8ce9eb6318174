//! # Shop
//!
//! Priced offers and the purchase flow. A purchase debits first; a failed
//! debit ends the request with nothing changed and nothing saved.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::currency::Currency;
use crate::error::{EconomyError, EconomyResult};
use crate::ledger::Ledger;
use crate::store::LedgerStore;

/// A priced shop offer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    /// Currency the price is paid in.
    pub price_currency: Currency,
    /// Price.
    pub price: u32,
    /// What the player receives: a balance or a lootbox size.
    pub reward_currency: Currency,
    /// How much of it.
    pub reward_quantity: u32,
}

impl Offer {
    /// Creates an offer.
    #[must_use]
    pub const fn new(
        price_currency: Currency,
        price: u32,
        reward_currency: Currency,
        reward_quantity: u32,
    ) -> Self {
        Self {
            price_currency,
            price,
            reward_currency,
            reward_quantity,
        }
    }

    /// Checks that the offer can be paid and delivered.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidOffer` if the price is not in a balance
    /// currency or the reward is `Other`.
    pub fn validate(&self) -> EconomyResult<()> {
        if !self.price_currency.is_balance() {
            return Err(EconomyError::InvalidOffer(format!(
                "price in {:?} cannot be paid",
                self.price_currency
            )));
        }
        if self.reward_currency == Currency::Other {
            return Err(EconomyError::InvalidOffer(
                "Other is not a rewardable currency".to_string(),
            ));
        }
        Ok(())
    }
}

/// What a completed purchase delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PurchaseReceipt {
    /// A balance was credited.
    Credited {
        /// Balance credited.
        currency: Currency,
        /// Amount credited.
        amount: u32,
    },
    /// Lootboxes were bought and still have to be opened.
    LootBoxPending {
        /// Lootbox size.
        size: Currency,
        /// Number of boxes.
        count: u32,
    },
}

/// Runs purchases against a ledger.
#[derive(Clone, Copy, Debug, Default)]
pub struct PurchaseEngine;

impl PurchaseEngine {
    /// Debits the price and delivers the reward, then persists once.
    ///
    /// Lootbox rewards are not credited; the receipt tells the caller which
    /// pool to open and how often.
    ///
    /// # Errors
    ///
    /// - `EconomyError::InvalidOffer` before any debit for an `Other` reward
    /// - `EconomyError::InsufficientFunds` with no change and no save
    /// - the store's error if persisting fails
    pub fn purchase<S: LedgerStore>(
        offer: &Offer,
        ledger: &mut Ledger<S>,
    ) -> EconomyResult<PurchaseReceipt> {
        offer.validate()?;
        ledger.debit(offer.price_currency, offer.price)?;

        let receipt = if offer.reward_currency.is_loot_box() {
            PurchaseReceipt::LootBoxPending {
                size: offer.reward_currency,
                count: offer.reward_quantity,
            }
        } else {
            ledger.credit(offer.reward_currency, offer.reward_quantity);
            PurchaseReceipt::Credited {
                currency: offer.reward_currency,
                amount: offer.reward_quantity,
            }
        };

        ledger.persist()?;

        tracing::info!(
            price_currency = ?offer.price_currency,
            price = offer.price,
            ?receipt,
            "purchase completed"
        );

        Ok(receipt)
    }
}

/// Named offers loaded from configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopCatalog {
    #[serde(default)]
    offers: BTreeMap<String, Offer>,
}

impl ShopCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an offer.
    #[must_use]
    pub fn with_offer(mut self, name: impl Into<String>, offer: Offer) -> Self {
        self.offers.insert(name.into(), offer);
        self
    }

    /// Looks up an offer by name.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` for an unknown name.
    pub fn offer(&self, name: &str) -> EconomyResult<&Offer> {
        self.offers
            .get(name)
            .ok_or_else(|| EconomyError::ConfigurationMissing(format!("shop offer {name:?}")))
    }

    /// Offers in name order.
    pub fn offers(&self) -> impl Iterator<Item = (&str, &Offer)> {
        self.offers.iter().map(|(name, offer)| (name.as_str(), offer))
    }

    /// Number of offers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    /// True when the catalog has no offers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    /// Whether each offer is affordable with the ledger's current balances.
    pub fn affordability<S: LedgerStore>(&self, ledger: &Ledger<S>) -> Vec<(String, bool)> {
        self.offers
            .iter()
            .map(|(name, offer)| {
                (name.clone(), ledger.can_afford(offer.price_currency, offer.price))
            })
            .collect()
    }

    /// Validates every offer.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` naming the first bad offer.
    pub fn validate(&self) -> EconomyResult<()> {
        for (name, offer) in &self.offers {
            offer
                .validate()
                .map_err(|e| EconomyError::InvalidConfig(format!("offer {name:?}: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn funded(currency: Currency, amount: u32) -> Ledger<MemoryStore> {
        let mut ledger = Ledger::new(MemoryStore::new());
        ledger.credit(currency, amount);
        ledger
    }

    #[test]
    fn test_purchase_credits_reward() {
        let mut ledger = funded(Currency::Coin, 600);
        let offer = Offer::new(Currency::Coin, 500, Currency::Gem, 5);

        let receipt = PurchaseEngine::purchase(&offer, &mut ledger).unwrap();
        assert_eq!(
            receipt,
            PurchaseReceipt::Credited { currency: Currency::Gem, amount: 5 }
        );
        assert_eq!(ledger.balance(Currency::Coin), 100);
        assert_eq!(ledger.balance(Currency::Gem), 5);
        assert_eq!(ledger.store().save_count(), 1);
    }

    #[test]
    fn test_insufficient_funds_changes_nothing() {
        let mut ledger = funded(Currency::Coin, 40);
        let before = ledger.snapshot();
        let offer = Offer::new(Currency::Coin, 100, Currency::Gem, 5);

        let result = PurchaseEngine::purchase(&offer, &mut ledger);
        assert_eq!(
            result,
            Err(EconomyError::InsufficientFunds {
                currency: Currency::Coin,
                required: 100,
                available: 40,
            })
        );
        assert_eq!(ledger.snapshot(), before);
        assert_eq!(ledger.store().save_count(), 0);
    }

    #[test]
    fn test_loot_box_reward_is_pending() {
        let mut ledger = funded(Currency::Gem, 30);
        let offer = Offer::new(Currency::Gem, 25, Currency::LargeLootBox, 1);

        let receipt = PurchaseEngine::purchase(&offer, &mut ledger).unwrap();
        assert_eq!(
            receipt,
            PurchaseReceipt::LootBoxPending { size: Currency::LargeLootBox, count: 1 }
        );
        assert_eq!(ledger.balance(Currency::Gem), 5);
        assert_eq!(ledger.balance(Currency::LargeLootBox), 0);
        assert_eq!(ledger.store().save_count(), 1);
    }

    #[test]
    fn test_other_reward_rejected_before_debit() {
        let mut ledger = funded(Currency::Coin, 1_000);
        let offer = Offer::new(Currency::Coin, 10, Currency::Other, 1);

        let result = PurchaseEngine::purchase(&offer, &mut ledger);
        assert!(matches!(result, Err(EconomyError::InvalidOffer(_))));
        assert_eq!(ledger.balance(Currency::Coin), 1_000);
        assert_eq!(ledger.store().save_count(), 0);
    }

    #[test]
    fn test_free_offer() {
        let mut ledger = funded(Currency::Coin, 0);
        let offer = Offer::new(Currency::Coin, 0, Currency::Ticket, 3);
        PurchaseEngine::purchase(&offer, &mut ledger).unwrap();
        assert_eq!(ledger.balance(Currency::Ticket), 3);
    }

    #[test]
    fn test_catalog_lookup_and_affordability() {
        let catalog = ShopCatalog::new()
            .with_offer("gems_small", Offer::new(Currency::Coin, 500, Currency::Gem, 5))
            .with_offer("tickets", Offer::new(Currency::Coin, 50, Currency::Ticket, 5));
        let ledger = funded(Currency::Coin, 100);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.offer("tickets").unwrap().price, 50);
        assert!(matches!(
            catalog.offer("missing"),
            Err(EconomyError::ConfigurationMissing(_))
        ));
        assert_eq!(
            catalog.affordability(&ledger),
            vec![("gems_small".to_string(), false), ("tickets".to_string(), true)]
        );
    }

    #[test]
    fn test_catalog_validation() {
        let catalog = ShopCatalog::new()
            .with_offer("bad", Offer::new(Currency::SmallLootBox, 1, Currency::Gem, 1));
        assert!(matches!(catalog.validate(), Err(EconomyError::InvalidConfig(_))));
    }
}
