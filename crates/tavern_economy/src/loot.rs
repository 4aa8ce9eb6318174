//! # Lootbox Resolver
//!
//! **Independent Bernoulli gates per reward category**
//!
//! A lootbox pull runs one trial per currency (Coin, Ticket, Gem, in that
//! order) and one for armor pieces. Each successful trial rolls a quantity in
//! its configured inclusive range.
//!
//! ## Armor Overflow
//!
//! Armor pieces only go to sets still below their progression cap. The part
//! of a roll that would push a set past its cap, or the whole roll when every
//! set is capped, is converted to gems at `armor_to_gem_conversion_rate`
//! pieces per gem (floor). The spin wheel reuses [`grant_items`] for the same
//! rule.
//!
//! ## Ordering
//!
//! The bundle is rolled completely before the ledger is touched, then applied
//! currency-first and persisted once. A configuration error therefore never
//! leaves a half-granted pull behind.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::currency::{Currency, ItemId};
use crate::error::EconomyResult;
use crate::ledger::Ledger;
use crate::progression::ProgressionTable;
use crate::random::RandomSource;
use crate::store::LedgerStore;

/// Inclusive quantity range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldRange {
    /// Smallest quantity.
    pub min: u32,
    /// Largest quantity.
    pub max: u32,
}

impl YieldRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Rolls a quantity in the range.
    pub fn roll(self, rng: &mut impl RandomSource) -> u32 {
        rng.uniform_int(self.min, self.max)
    }
}

/// Drop chance and quantity range of one reward category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardRoll {
    /// Drop chance in percent, `[0, 100]`. Zero never drops.
    pub probability: f32,
    /// Smallest quantity.
    pub min: u32,
    /// Largest quantity.
    pub max: u32,
}

impl RewardRoll {
    /// Creates a roll.
    #[must_use]
    pub const fn new(probability: f32, min: u32, max: u32) -> Self {
        Self { probability, min, max }
    }

    /// A category that never drops.
    #[must_use]
    pub const fn never() -> Self {
        Self::new(0.0, 0, 0)
    }

    /// The quantity range.
    #[must_use]
    pub const fn range(&self) -> YieldRange {
        YieldRange::new(self.min, self.max)
    }

    /// Runs the Bernoulli gate and, on success, rolls the quantity.
    ///
    /// A zero or NaN probability fails without consuming a draw. A draw equal
    /// to the probability passes.
    pub fn pull(&self, rng: &mut impl RandomSource) -> Option<u32> {
        if self.probability.is_nan() || self.probability <= 0.0 {
            return None;
        }
        let draw = rng.uniform_percent();
        if draw > self.probability {
            return None;
        }
        Some(self.range().roll(rng))
    }
}

/// Reward table of one lootbox size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardPool {
    /// Coin drop.
    #[serde(default = "RewardRoll::never")]
    pub coins: RewardRoll,
    /// Ticket drop.
    #[serde(default = "RewardRoll::never")]
    pub tickets: RewardRoll,
    /// Gem drop.
    #[serde(default = "RewardRoll::never")]
    pub gems: RewardRoll,
    /// Armor piece drop.
    #[serde(default = "RewardRoll::never")]
    pub items: RewardRoll,
}

impl RewardPool {
    /// The roll of a balance currency; `None` for any other category.
    #[must_use]
    pub const fn currency_roll(&self, currency: Currency) -> Option<&RewardRoll> {
        match currency {
            Currency::Coin => Some(&self.coins),
            Currency::Ticket => Some(&self.tickets),
            Currency::Gem => Some(&self.gems),
            _ => None,
        }
    }
}

/// What a pull, spin, or purchase granted. Only positive amounts are present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewardBundle {
    currency: BTreeMap<Currency, u32>,
    items: BTreeMap<ItemId, u32>,
}

impl RewardBundle {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing dropped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.currency.is_empty() && self.items.is_empty()
    }

    /// Amount of a currency; zero if it did not drop.
    #[must_use]
    pub fn currency(&self, currency: Currency) -> u32 {
        self.currency.get(&currency).copied().unwrap_or(0)
    }

    /// Pieces of an armor set; zero if none dropped.
    #[must_use]
    pub fn item(&self, item: ItemId) -> u32 {
        self.items.get(&item).copied().unwrap_or(0)
    }

    /// Whether a currency is present.
    #[must_use]
    pub fn has_currency(&self, currency: Currency) -> bool {
        self.currency.contains_key(&currency)
    }

    /// Currency entries in enum order.
    pub fn currencies(&self) -> impl Iterator<Item = (Currency, u32)> + '_ {
        self.currency.iter().map(|(c, q)| (*c, *q))
    }

    /// Armor entries in enum order.
    pub fn items(&self) -> impl Iterator<Item = (ItemId, u32)> + '_ {
        self.items.iter().map(|(i, q)| (*i, *q))
    }

    /// Total armor pieces.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items.values().fold(0, |acc, q| acc.saturating_add(*q))
    }

    /// Adds currency, merging with an existing entry. Zero is ignored.
    pub fn add_currency(&mut self, currency: Currency, amount: u32) {
        if amount == 0 {
            return;
        }
        let entry = self.currency.entry(currency).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Adds armor pieces, merging with an existing entry. Zero is ignored.
    pub fn add_item(&mut self, item: ItemId, amount: u32) {
        if amount == 0 {
            return;
        }
        let entry = self.items.entry(item).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Credits the bundle to a ledger, currency first. Does not persist.
    pub fn apply_to<S: LedgerStore>(&self, ledger: &mut Ledger<S>) {
        for (currency, amount) in self.currencies() {
            ledger.credit(currency, amount);
        }
        for (item, amount) in self.items() {
            ledger.add_owned(item, amount);
        }
    }
}

/// Outcome of one armor-piece roll after the overflow split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemGrant {
    /// Set that received pieces; `None` when every set was capped.
    pub item: Option<ItemId>,
    /// Quantity rolled.
    pub rolled: u32,
    /// Pieces granted to `item`.
    pub granted: u32,
    /// Pieces converted to gems.
    pub converted: u32,
    /// Gems produced by the conversion.
    pub gems: u32,
}

impl ItemGrant {
    /// Folds the grant into a bundle.
    pub fn fold_into(&self, bundle: &mut RewardBundle) {
        if let Some(item) = self.item {
            bundle.add_item(item, self.granted);
        }
        bundle.add_currency(Currency::Gem, self.gems);
    }
}

/// Picks a set below its cap and splits `quantity` between it and gems.
///
/// Shared by the lootbox and the spin wheel. Consumes one integer draw when
/// at least one set is eligible, none otherwise.
///
/// # Errors
///
/// Returns `EconomyError::ConfigurationMissing` if any armor set has no
/// progression tiers.
pub fn grant_items<S: LedgerStore>(
    quantity: u32,
    ledger: &Ledger<S>,
    progression: &ProgressionTable,
    conversion_rate: u32,
    rng: &mut impl RandomSource,
) -> EconomyResult<ItemGrant> {
    let rate = conversion_rate.max(1);
    let eligible = progression.eligible_items(|item| ledger.owned(item))?;

    if eligible.is_empty() {
        tracing::debug!(quantity, "every armor set capped, converting the whole roll");
        return Ok(ItemGrant {
            item: None,
            rolled: quantity,
            granted: 0,
            converted: quantity,
            gems: quantity / rate,
        });
    }

    #[allow(clippy::cast_possible_truncation)]
    let last = (eligible.len() - 1) as u32;
    let index = rng.uniform_int(0, last).min(last) as usize;
    let item = eligible[index];

    let cap = progression.max_threshold(item)?;
    let room = cap.saturating_sub(ledger.owned(item));
    let granted = quantity.min(room);
    let converted = quantity - granted;

    tracing::debug!(?item, quantity, granted, converted, "armor pieces split");

    Ok(ItemGrant {
        item: Some(item),
        rolled: quantity,
        granted,
        converted,
        gems: converted / rate,
    })
}

/// Resolves lootbox pulls against a progression table.
#[derive(Clone, Copy, Debug)]
pub struct LootResolver<'a> {
    progression: &'a ProgressionTable,
    conversion_rate: u32,
}

impl<'a> LootResolver<'a> {
    /// Creates a resolver. A conversion rate of zero is treated as one.
    #[must_use]
    pub fn new(progression: &'a ProgressionTable, conversion_rate: u32) -> Self {
        Self {
            progression,
            conversion_rate: conversion_rate.max(1),
        }
    }

    /// Armor pieces per gem.
    #[must_use]
    pub const fn conversion_rate(&self) -> u32 {
        self.conversion_rate
    }

    /// Rolls a bundle without touching the ledger.
    ///
    /// Draw order: Coin gate and amount, Ticket gate and amount, Gem gate and
    /// amount, armor gate and amount, armor set pick.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` if the armor roll succeeds
    /// and a set has no progression tiers.
    pub fn roll<S: LedgerStore>(
        &self,
        pool: &RewardPool,
        ledger: &Ledger<S>,
        rng: &mut impl RandomSource,
    ) -> EconomyResult<RewardBundle> {
        let mut bundle = RewardBundle::new();

        for currency in Currency::BALANCES {
            let Some(roll) = pool.currency_roll(currency) else {
                continue;
            };
            if let Some(amount) = roll.pull(rng) {
                tracing::debug!(?currency, amount, "currency dropped");
                bundle.add_currency(currency, amount);
            }
        }

        if let Some(quantity) = pool.items.pull(rng) {
            let grant = grant_items(quantity, ledger, self.progression, self.conversion_rate, rng)?;
            grant.fold_into(&mut bundle);
        }

        Ok(bundle)
    }

    /// Rolls a bundle, credits it, and persists the ledger once.
    ///
    /// The returned bundle is exactly what was granted.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` before any mutation if a
    /// progression table is missing, or the store's error if persisting fails.
    pub fn resolve<S: LedgerStore>(
        &self,
        pool: &RewardPool,
        ledger: &mut Ledger<S>,
        rng: &mut impl RandomSource,
    ) -> EconomyResult<RewardBundle> {
        let bundle = self.roll(pool, ledger, rng)?;
        bundle.apply_to(ledger);
        ledger.persist()?;
        Ok(bundle)
    }
}

/// Aggregated results over many pulls.
#[derive(Clone, Debug, Default)]
pub struct LootStatistics {
    /// Pulls recorded.
    pub pulls: u64,
    /// Pulls that granted nothing.
    pub empty_pulls: u64,
    /// Total per currency.
    pub currency_totals: BTreeMap<Currency, u64>,
    /// Total per armor set.
    pub item_totals: BTreeMap<ItemId, u64>,
}

impl LootStatistics {
    /// Creates empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one bundle.
    pub fn record(&mut self, bundle: &RewardBundle) {
        self.pulls += 1;
        if bundle.is_empty() {
            self.empty_pulls += 1;
        }
        for (currency, amount) in bundle.currencies() {
            *self.currency_totals.entry(currency).or_insert(0) += u64::from(amount);
        }
        for (item, amount) in bundle.items() {
            *self.item_totals.entry(item).or_insert(0) += u64::from(amount);
        }
    }

    /// Average amount of a currency per pull.
    #[must_use]
    pub fn average(&self, currency: Currency) -> f64 {
        if self.pulls == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let average = self.currency_totals.get(&currency).copied().unwrap_or(0) as f64
            / self.pulls as f64;
        average
    }
}
