//! Currency and collectible identifiers.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::EconomyError;

/// Every reward category the shop and the reward tables know about.
///
/// Only [`Currency::BALANCES`] are spendable. Lootbox sizes key the reward
/// pools, and `Other` stands for the armor-piece slot on the spin wheel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Currency {
    /// Soft currency earned in minigames.
    Coin = 0,
    /// Spin wheel and tournament tickets.
    Ticket = 1,
    /// Premium currency.
    Gem = 2,
    /// Small lootbox.
    SmallLootBox = 3,
    /// Medium lootbox.
    MediumLootBox = 4,
    /// Large lootbox.
    LargeLootBox = 5,
    /// Anything that is not a currency (armor pieces).
    Other = 6,
}

impl Currency {
    /// The real balances, in reveal order.
    pub const BALANCES: [Self; 3] = [Self::Coin, Self::Ticket, Self::Gem];

    /// The lootbox sizes.
    pub const LOOT_BOXES: [Self; 3] = [Self::SmallLootBox, Self::MediumLootBox, Self::LargeLootBox];

    /// Returns true for Coin, Ticket and Gem.
    #[inline]
    #[must_use]
    pub const fn is_balance(self) -> bool {
        matches!(self, Self::Coin | Self::Ticket | Self::Gem)
    }

    /// Returns true for the three lootbox sizes.
    #[inline]
    #[must_use]
    pub const fn is_loot_box(self) -> bool {
        matches!(self, Self::SmallLootBox | Self::MediumLootBox | Self::LargeLootBox)
    }
}

/// A progression-gated collectible (one armor set).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ItemId {
    /// First armor set.
    Armor0 = 0,
    /// Second armor set.
    Armor1 = 1,
    /// Third armor set.
    Armor2 = 2,
}

impl ItemId {
    /// Every armor set, in declaration order.
    pub const ALL: [Self; 3] = [Self::Armor0, Self::Armor1, Self::Armor2];

    /// Converts from u8.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Armor0),
            1 => Some(Self::Armor1),
            2 => Some(Self::Armor2),
            _ => None,
        }
    }
}

impl FromStr for Currency {
    type Err = EconomyError;

    /// Parses the variant name, as used for lootbox pool keys.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "Coin" => Ok(Self::Coin),
            "Ticket" => Ok(Self::Ticket),
            "Gem" => Ok(Self::Gem),
            "SmallLootBox" => Ok(Self::SmallLootBox),
            "MediumLootBox" => Ok(Self::MediumLootBox),
            "LargeLootBox" => Ok(Self::LargeLootBox),
            "Other" => Ok(Self::Other),
            _ => Err(EconomyError::InvalidConfig(format!("unknown currency {name:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_and_loot_box_partition() {
        for c in Currency::BALANCES {
            assert!(c.is_balance());
            assert!(!c.is_loot_box());
        }
        for c in Currency::LOOT_BOXES {
            assert!(c.is_loot_box());
            assert!(!c.is_balance());
        }
        assert!(!Currency::Other.is_balance());
        assert!(!Currency::Other.is_loot_box());
    }

    #[test]
    fn test_item_id_from_u8() {
        for item in ItemId::ALL {
            assert_eq!(ItemId::from_u8(item as u8), Some(item));
        }
        assert_eq!(ItemId::from_u8(3), None);
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("MediumLootBox".parse::<Currency>(), Ok(Currency::MediumLootBox));
        assert_eq!("Gem".parse::<Currency>(), Ok(Currency::Gem));
        assert!("gem".parse::<Currency>().is_err());
    }
}
