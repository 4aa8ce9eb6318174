//! # Economy Configuration
//!
//! Everything the engine reads but never changes: reward pools per lootbox
//! size, armor progression, the spin wheel, shop offers, and the armor to
//! gem conversion rate. Loaded once from TOML and validated up front.
//!
//! ```toml
//! armor_to_gem_conversion_rate = 2
//!
//! [loot_boxes.SmallLootBox]
//! coins = { probability = 100.0, min = 20, max = 50 }
//! items = { probability = 30.0, min = 5, max = 10 }
//!
//! [[progression]]
//! item = "Armor0"
//! tiers = [{ material = "Bronze", threshold = 10 }, { material = "Silver", price = 100, threshold = 25 }]
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::currency::{Currency, ItemId};
use crate::error::{EconomyError, EconomyResult};
use crate::loot::{LootResolver, RewardPool, RewardRoll};
use crate::progression::{ProgressionTable, ProgressionTier};
use crate::shop::ShopCatalog;
use crate::spin::{SpinResolver, SpinWheelConfig};

/// TOML document layout.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    armor_to_gem_conversion_rate: u32,
    #[serde(default)]
    loot_boxes: BTreeMap<String, RewardPool>,
    #[serde(default)]
    progression: Vec<ProgressionEntry>,
    #[serde(default)]
    spin_wheel: Option<SpinWheelConfig>,
    #[serde(default)]
    shop: ShopCatalog,
}

#[derive(Deserialize)]
struct ProgressionEntry {
    item: ItemId,
    tiers: Vec<ProgressionTier>,
}

/// Validated, immutable economy configuration.
#[derive(Clone, Debug)]
pub struct EconomyConfig {
    conversion_rate: u32,
    pools: BTreeMap<Currency, RewardPool>,
    progression: ProgressionTable,
    spin_wheel: Option<SpinWheelConfig>,
    shop: ShopCatalog,
}

impl EconomyConfig {
    /// Creates a configuration with no pools, wheel, or offers.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` if the conversion rate is zero.
    pub fn new(conversion_rate: u32, progression: ProgressionTable) -> EconomyResult<Self> {
        if conversion_rate == 0 {
            return Err(EconomyError::InvalidConfig(
                "armor_to_gem_conversion_rate must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            conversion_rate,
            pools: BTreeMap::new(),
            progression,
            spin_wheel: None,
            shop: ShopCatalog::new(),
        })
    }

    /// Adds the reward pool of a lootbox size.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` if `size` is not a lootbox size
    /// or a roll is out of range.
    pub fn with_pool(mut self, size: Currency, pool: RewardPool) -> EconomyResult<Self> {
        if !size.is_loot_box() {
            return Err(EconomyError::InvalidConfig(format!(
                "{size:?} is not a lootbox size"
            )));
        }
        for (name, roll) in [
            ("coins", &pool.coins),
            ("tickets", &pool.tickets),
            ("gems", &pool.gems),
            ("items", &pool.items),
        ] {
            validate_roll(roll).map_err(|reason| {
                EconomyError::InvalidConfig(format!("{size:?}.{name}: {reason}"))
            })?;
        }
        self.pools.insert(size, pool);
        Ok(self)
    }

    /// Sets the spin wheel.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` if the wheel fails validation.
    pub fn with_spin_wheel(mut self, wheel: SpinWheelConfig) -> EconomyResult<Self> {
        wheel.validate()?;
        self.spin_wheel = Some(wheel);
        Ok(self)
    }

    /// Sets the shop catalog.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` if an offer is invalid.
    pub fn with_shop(mut self, shop: ShopCatalog) -> EconomyResult<Self> {
        shop.validate()?;
        self.shop = shop;
        Ok(self)
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` on a parse or validation failure.
    pub fn from_toml_str(source: &str) -> EconomyResult<Self> {
        let file: ConfigFile = toml::from_str(source)
            .map_err(|e| EconomyError::InvalidConfig(format!("TOML parse error: {e}")))?;

        let progression =
            ProgressionTable::new(file.progression.into_iter().map(|e| (e.item, e.tiers)))?;

        let mut config = Self::new(file.armor_to_gem_conversion_rate, progression)?;
        for (key, pool) in file.loot_boxes {
            let size = key.parse::<Currency>()?;
            config = config.with_pool(size, pool)?;
        }
        if let Some(wheel) = file.spin_wheel {
            config = config.with_spin_wheel(wheel)?;
        }
        config.with_shop(file.shop)
    }

    /// Reads, parses, and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` if the file cannot be read or
    /// is invalid.
    pub fn from_toml_file(path: impl AsRef<Path>) -> EconomyResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            EconomyError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!(
            path = %path.display(),
            pools = config.pools.len(),
            offers = config.shop.len(),
            "economy configuration loaded"
        );
        Ok(config)
    }

    /// Armor pieces per gem.
    #[must_use]
    pub const fn conversion_rate(&self) -> u32 {
        self.conversion_rate
    }

    /// Reward pool of a lootbox size.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` if the size has no pool.
    pub fn pool(&self, size: Currency) -> EconomyResult<&RewardPool> {
        self.pools
            .get(&size)
            .ok_or_else(|| EconomyError::ConfigurationMissing(format!("reward pool for {size:?}")))
    }

    /// Armor progression.
    #[must_use]
    pub const fn progression(&self) -> &ProgressionTable {
        &self.progression
    }

    /// Spin wheel.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` if no wheel is configured.
    pub fn spin_wheel(&self) -> EconomyResult<&SpinWheelConfig> {
        self.spin_wheel
            .as_ref()
            .ok_or_else(|| EconomyError::ConfigurationMissing("spin wheel".to_string()))
    }

    /// Shop catalog.
    #[must_use]
    pub const fn shop(&self) -> &ShopCatalog {
        &self.shop
    }

    /// Lootbox resolver bound to this configuration.
    #[must_use]
    pub fn loot_resolver(&self) -> LootResolver<'_> {
        LootResolver::new(&self.progression, self.conversion_rate)
    }

    /// Spin resolver bound to this configuration.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` if no wheel is configured.
    pub fn spin_resolver(&self) -> EconomyResult<SpinResolver<'_>> {
        Ok(SpinResolver::new(
            self.spin_wheel()?,
            &self.progression,
            self.conversion_rate,
        ))
    }
}

fn validate_roll(roll: &RewardRoll) -> Result<(), String> {
    if !(0.0..=100.0).contains(&roll.probability) {
        return Err(format!("probability {} outside [0, 100]", roll.probability));
    }
    if roll.min > roll.max {
        return Err(format!("range {}..={} is inverted", roll.min, roll.max));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::Material;

    const SAMPLE: &str = r#"
armor_to_gem_conversion_rate = 2

[loot_boxes.SmallLootBox]
coins = { probability = 100.0, min = 20, max = 50 }
tickets = { probability = 50.0, min = 1, max = 2 }
items = { probability = 30.0, min = 5, max = 10 }

[loot_boxes.LargeLootBox]
gems = { probability = 40.0, min = 5, max = 15 }

[[progression]]
item = "Armor0"
tiers = [
    { material = "Silver", price = 100, threshold = 25 },
    { material = "Bronze", threshold = 10 },
]

[spin_wheel]
segments = ["Coin", "Ticket", "Other"]
coins = { min = 10, max = 100 }
items = { min = 3, max = 6 }

[shop.offers.gems_small]
price_currency = "Coin"
price = 500
reward_currency = "Gem"
reward_quantity = 5
"#;

    #[test]
    fn test_parse_sample() {
        let config = EconomyConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.conversion_rate(), 2);
        let small = config.pool(Currency::SmallLootBox).unwrap();
        assert_eq!(small.coins, RewardRoll::new(100.0, 20, 50));
        assert_eq!(small.gems, RewardRoll::never());
        assert_eq!(config.pool(Currency::LargeLootBox).unwrap().gems.max, 15);
        assert!(matches!(
            config.pool(Currency::MediumLootBox),
            Err(EconomyError::ConfigurationMissing(_))
        ));

        let tiers = config.progression().tiers(ItemId::Armor0).unwrap();
        assert_eq!(tiers[0].material, Material::Bronze);
        assert_eq!(config.progression().max_threshold(ItemId::Armor0), Ok(25));

        let wheel = config.spin_wheel().unwrap();
        assert_eq!(wheel.price, 5);
        assert_eq!(wheel.price_currency, Currency::Ticket);
        assert_eq!(wheel.segments.len(), 3);

        assert_eq!(config.shop().offer("gems_small").unwrap().reward_quantity, 5);
    }

    #[test]
    fn test_zero_conversion_rate_rejected() {
        let result = EconomyConfig::from_toml_str("armor_to_gem_conversion_rate = 0");
        assert!(matches!(result, Err(EconomyError::InvalidConfig(_))));
    }

    #[test]
    fn test_probability_out_of_range_rejected() {
        let source = r#"
armor_to_gem_conversion_rate = 1
[loot_boxes.MediumLootBox]
coins = { probability = 120.0, min = 1, max = 2 }
"#;
        assert!(matches!(
            EconomyConfig::from_toml_str(source),
            Err(EconomyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let source = r#"
armor_to_gem_conversion_rate = 1
[loot_boxes.MediumLootBox]
items = { probability = 10.0, min = 9, max = 2 }
"#;
        assert!(matches!(
            EconomyConfig::from_toml_str(source),
            Err(EconomyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_pool_key_must_be_lootbox() {
        let source = r#"
armor_to_gem_conversion_rate = 1
[loot_boxes.Gem]
coins = { probability = 10.0, min = 1, max = 2 }
"#;
        assert!(matches!(
            EconomyConfig::from_toml_str(source),
            Err(EconomyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_non_increasing_thresholds_rejected() {
        let source = r#"
armor_to_gem_conversion_rate = 1
[[progression]]
item = "Armor1"
tiers = [{ material = "Bronze", threshold = 10 }, { material = "Gold", threshold = 10 }]
"#;
        assert!(matches!(
            EconomyConfig::from_toml_str(source),
            Err(EconomyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_wheel_is_configuration_missing() {
        let config = EconomyConfig::new(1, ProgressionTable::default()).unwrap();
        assert!(matches!(
            config.spin_resolver(),
            Err(EconomyError::ConfigurationMissing(_))
        ));
    }

    #[test]
    fn test_bundled_reference_config_is_valid() {
        let source = include_str!("../data/economy.toml");
        let config = EconomyConfig::from_toml_str(source).unwrap();
        for size in Currency::LOOT_BOXES {
            assert!(config.pool(size).is_ok());
        }
        for item in ItemId::ALL {
            assert!(config.progression().max_threshold(item).is_ok());
        }
        assert!(config.spin_wheel().is_ok());
        assert!(!config.shop().is_empty());
    }
}
