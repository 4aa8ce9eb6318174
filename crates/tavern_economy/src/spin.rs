//! # Spin Wheel
//!
//! A spin costs a fixed price, lands uniformly on one of the configured
//! segments, and pays out either a currency amount or armor pieces. Armor
//! pieces follow the same cap-and-convert rule as lootboxes.

use serde::{Deserialize, Serialize};

use crate::currency::Currency;
use crate::error::{EconomyError, EconomyResult};
use crate::ledger::Ledger;
use crate::loot::{grant_items, RewardBundle, YieldRange};
use crate::progression::ProgressionTable;
use crate::random::RandomSource;
use crate::store::LedgerStore;

const fn default_price() -> u32 {
    5
}

const fn default_price_currency() -> Currency {
    Currency::Ticket
}

/// Spin wheel configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinWheelConfig {
    /// Cost of one spin.
    #[serde(default = "default_price")]
    pub price: u32,
    /// Currency the cost is paid in.
    #[serde(default = "default_price_currency")]
    pub price_currency: Currency,
    /// Wheel segments. Repeating a category makes it more likely.
    pub segments: Vec<Currency>,
    /// Coin payout.
    #[serde(default)]
    pub coins: YieldRange,
    /// Ticket payout.
    #[serde(default)]
    pub tickets: YieldRange,
    /// Gem payout.
    #[serde(default)]
    pub gems: YieldRange,
    /// Armor piece payout.
    #[serde(default)]
    pub items: YieldRange,
}

impl SpinWheelConfig {
    /// Creates a wheel with the default price and empty payout ranges.
    #[must_use]
    pub fn new(segments: Vec<Currency>) -> Self {
        Self {
            price: default_price(),
            price_currency: default_price_currency(),
            segments,
            coins: YieldRange::default(),
            tickets: YieldRange::default(),
            gems: YieldRange::default(),
            items: YieldRange::default(),
        }
    }

    /// Payout range of a segment category.
    #[must_use]
    pub const fn range(&self, category: Currency) -> Option<YieldRange> {
        match category {
            Currency::Coin => Some(self.coins),
            Currency::Ticket => Some(self.tickets),
            Currency::Gem => Some(self.gems),
            Currency::Other => Some(self.items),
            _ => None,
        }
    }

    /// Checks the price and every segment.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` for a non-balance price, a
    /// lootbox segment, or an inverted range.
    pub fn validate(&self) -> EconomyResult<()> {
        if !self.price_currency.is_balance() {
            return Err(EconomyError::InvalidConfig(format!(
                "spin price in {:?} cannot be paid",
                self.price_currency
            )));
        }
        if let Some(bad) = self.segments.iter().find(|c| c.is_loot_box()) {
            return Err(EconomyError::InvalidConfig(format!(
                "spin segment {bad:?} is not a payout category"
            )));
        }
        for (name, range) in [
            ("coins", self.coins),
            ("tickets", self.tickets),
            ("gems", self.gems),
            ("items", self.items),
        ] {
            if range.min > range.max {
                return Err(EconomyError::InvalidConfig(format!(
                    "spin {name} range {}..={} is inverted",
                    range.min, range.max
                )));
            }
        }
        Ok(())
    }
}

/// Result of one spin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpinOutcome {
    /// Segment category the wheel landed on.
    pub category: Currency,
    /// What was granted.
    pub bundle: RewardBundle,
}

/// Resolves spins of one wheel.
#[derive(Clone, Copy, Debug)]
pub struct SpinResolver<'a> {
    wheel: &'a SpinWheelConfig,
    progression: &'a ProgressionTable,
    conversion_rate: u32,
}

impl<'a> SpinResolver<'a> {
    /// Creates a resolver.
    #[must_use]
    pub fn new(
        wheel: &'a SpinWheelConfig,
        progression: &'a ProgressionTable,
        conversion_rate: u32,
    ) -> Self {
        Self {
            wheel,
            progression,
            conversion_rate: conversion_rate.max(1),
        }
    }

    /// Picks a segment uniformly.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` for an empty wheel.
    pub fn choose_category(
        segments: &[Currency],
        rng: &mut impl RandomSource,
    ) -> EconomyResult<Currency> {
        let Some(last) = segments.len().checked_sub(1) else {
            return Err(EconomyError::ConfigurationMissing(
                "spin wheel has no segments".to_string(),
            ));
        };
        #[allow(clippy::cast_possible_truncation)]
        let index = rng.uniform_int(0, last as u32) as usize;
        Ok(segments[index.min(last)])
    }

    /// Picks a segment and rolls its payout without touching the ledger.
    ///
    /// # Errors
    ///
    /// - `EconomyError::ConfigurationMissing` for an empty wheel or a
    ///   missing progression table
    /// - `EconomyError::InvalidConfig` if the wheel lands on a lootbox
    pub fn roll<S: LedgerStore>(
        &self,
        ledger: &Ledger<S>,
        rng: &mut impl RandomSource,
    ) -> EconomyResult<SpinOutcome> {
        let category = Self::choose_category(&self.wheel.segments, rng)?;
        let range = self.wheel.range(category).ok_or_else(|| {
            EconomyError::InvalidConfig(format!("spin landed on {category:?}"))
        })?;

        let mut bundle = RewardBundle::new();
        let quantity = range.roll(rng);
        if category == Currency::Other {
            let grant = grant_items(quantity, ledger, self.progression, self.conversion_rate, rng)?;
            grant.fold_into(&mut bundle);
        } else {
            bundle.add_currency(category, quantity);
        }

        tracing::debug!(?category, quantity, "spin rolled");
        Ok(SpinOutcome { category, bundle })
    }

    /// Pays for a spin, resolves it, and persists once.
    ///
    /// # Errors
    ///
    /// `EconomyError::InsufficientFunds` before the wheel turns, or any error
    /// of [`SpinResolver::roll`]. The ledger is unchanged on every error
    /// except a failing store.
    pub fn spin<S: LedgerStore>(
        &self,
        ledger: &mut Ledger<S>,
        rng: &mut impl RandomSource,
    ) -> EconomyResult<SpinOutcome> {
        let (currency, price) = (self.wheel.price_currency, self.wheel.price);
        if !ledger.can_afford(currency, price) {
            return Err(EconomyError::InsufficientFunds {
                currency,
                required: price,
                available: ledger.balance(currency),
            });
        }

        let outcome = self.roll(ledger, rng)?;
        ledger.debit(currency, price)?;
        outcome.bundle.apply_to(ledger);
        ledger.persist()?;

        tracing::info!(category = ?outcome.category, "spin completed");
        Ok(outcome)
    }
}
