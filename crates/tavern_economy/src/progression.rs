//! # Armor Progression
//!
//! Every armor set unlocks materials as the player accumulates pieces.
//! Thresholds are cumulative and strictly increasing by material rank; the
//! last one is the set's progression cap. Past the cap, pieces have no unlock
//! value and the loot resolver converts them to gems instead.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::currency::ItemId;
use crate::error::{EconomyError, EconomyResult};

/// Material tier of an armor set, in rank order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Material {
    /// Rank 0, unlocks the armor set itself.
    Bronze = 0,
    /// Rank 1.
    Silver = 1,
    /// Rank 2.
    Gold = 2,
    /// Rank 3.
    Diamond = 3,
}

/// One unlock step of an armor set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionTier {
    /// Material unlocked by this tier.
    pub material: Material,
    /// Upgrade price shown on the customization screen.
    #[serde(default)]
    pub price: u32,
    /// Cumulative pieces owned to unlock this tier.
    pub threshold: u32,
}

/// Next unlock for a given owned quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextTier {
    /// The next material and the pieces it requires.
    Threshold {
        /// Material that unlocks next.
        material: Material,
        /// Cumulative pieces required.
        threshold: u32,
    },
    /// Every material is unlocked.
    Complete,
}

/// Progress toward the next unlock, for the armor button slider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    /// `owned` out of `target` pieces.
    InProgress {
        /// Pieces owned.
        owned: u32,
        /// Pieces needed for the next material.
        target: u32,
    },
    /// Nothing left to unlock.
    Complete,
}

impl Progress {
    /// Slider fill in `[0, 1]`.
    #[must_use]
    pub fn ratio(self) -> f32 {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::InProgress { owned, target } if target > 0 => owned as f32 / target as f32,
            Self::InProgress { .. } => 0.0,
            Self::Complete => 1.0,
        }
    }
}

/// Immutable threshold table, one tier list per armor set.
#[derive(Clone, Debug, Default)]
pub struct ProgressionTable {
    tiers: HashMap<ItemId, Vec<ProgressionTier>>,
}

impl ProgressionTable {
    /// Builds a table, sorting each tier list by material.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConfig` if an item appears twice, has no
    /// tiers, repeats a material, or its thresholds are not strictly increasing.
    pub fn new(
        entries: impl IntoIterator<Item = (ItemId, Vec<ProgressionTier>)>,
    ) -> EconomyResult<Self> {
        let mut tiers = HashMap::new();

        for (item, mut list) in entries {
            if list.is_empty() {
                return Err(EconomyError::InvalidConfig(format!(
                    "{item:?} has no progression tiers"
                )));
            }

            list.sort_by_key(|t| t.material);

            for pair in list.windows(2) {
                if pair[0].material == pair[1].material {
                    return Err(EconomyError::InvalidConfig(format!(
                        "{item:?} lists {:?} twice",
                        pair[0].material
                    )));
                }
                if pair[1].threshold <= pair[0].threshold {
                    return Err(EconomyError::InvalidConfig(format!(
                        "{item:?} thresholds must increase: {:?}={} then {:?}={}",
                        pair[0].material, pair[0].threshold, pair[1].material, pair[1].threshold
                    )));
                }
            }

            if tiers.insert(item, list).is_some() {
                return Err(EconomyError::InvalidConfig(format!(
                    "{item:?} configured twice"
                )));
            }
        }

        Ok(Self { tiers })
    }

    /// Returns the tier list of an item, lowest rank first.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` if the item has no entry.
    pub fn tiers(&self, item: ItemId) -> EconomyResult<&[ProgressionTier]> {
        self.tiers
            .get(&item)
            .map(Vec::as_slice)
            .ok_or_else(|| EconomyError::ConfigurationMissing(format!("progression tiers for {item:?}")))
    }

    /// First threshold strictly greater than `owned`, or `Complete`.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` if the item has no entry.
    pub fn tier_for_owned(&self, item: ItemId, owned: u32) -> EconomyResult<NextTier> {
        let next = self
            .tiers(item)?
            .iter()
            .find(|t| t.threshold > owned)
            .map_or(NextTier::Complete, |t| NextTier::Threshold {
                material: t.material,
                threshold: t.threshold,
            });
        Ok(next)
    }

    /// The progression cap of an item.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` if the item has no entry.
    pub fn max_threshold(&self, item: ItemId) -> EconomyResult<u32> {
        // Construction guarantees a non-empty list.
        Ok(self.tiers(item)?.last().map_or(0, |t| t.threshold))
    }

    /// Pieces needed to unlock a specific material.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` if the item or the
    /// material is not configured.
    pub fn threshold(&self, item: ItemId, material: Material) -> EconomyResult<u32> {
        self.find(item, material).map(|t| t.threshold)
    }

    /// Upgrade price of a specific material.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` if the item or the
    /// material is not configured.
    pub fn upgrade_price(&self, item: ItemId, material: Material) -> EconomyResult<u32> {
        self.find(item, material).map(|t| t.price)
    }

    /// Whether `owned` pieces unlock `material`.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` if the item or the
    /// material is not configured.
    pub fn is_material_unlocked(
        &self,
        item: ItemId,
        material: Material,
        owned: u32,
    ) -> EconomyResult<bool> {
        Ok(owned >= self.threshold(item, material)?)
    }

    /// Whether the armor set itself is unlocked (its lowest tier is reached).
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` if the item has no entry.
    pub fn is_item_unlocked(&self, item: ItemId, owned: u32) -> EconomyResult<bool> {
        Ok(self.tiers(item)?.first().is_some_and(|t| owned >= t.threshold))
    }

    /// Materials unlocked by `owned` pieces, lowest rank first.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` if the item has no entry.
    pub fn unlocked_materials(&self, item: ItemId, owned: u32) -> EconomyResult<Vec<Material>> {
        Ok(self
            .tiers(item)?
            .iter()
            .take_while(|t| owned >= t.threshold)
            .map(|t| t.material)
            .collect())
    }

    /// Progress toward the next unlock.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` if the item has no entry.
    pub fn progress(&self, item: ItemId, owned: u32) -> EconomyResult<Progress> {
        Ok(match self.tier_for_owned(item, owned)? {
            NextTier::Threshold { threshold, .. } => Progress::InProgress {
                owned,
                target: threshold,
            },
            NextTier::Complete => Progress::Complete,
        })
    }

    /// Items that still have unlock value at the given owned quantities.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ConfigurationMissing` if any item has no entry.
    pub fn eligible_items(&self, owned: impl Fn(ItemId) -> u32) -> EconomyResult<Vec<ItemId>> {
        let mut eligible = Vec::with_capacity(ItemId::ALL.len());
        for item in ItemId::ALL {
            if owned(item) < self.max_threshold(item)? {
                eligible.push(item);
            }
        }
        Ok(eligible)
    }

    fn find(&self, item: ItemId, material: Material) -> EconomyResult<&ProgressionTier> {
        self.tiers(item)?
            .iter()
            .find(|t| t.material == material)
            .ok_or_else(|| {
                EconomyError::ConfigurationMissing(format!("{material:?} tier for {item:?}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(material: Material, threshold: u32) -> ProgressionTier {
        ProgressionTier {
            material,
            price: 0,
            threshold,
        }
    }

    fn create_test_table() -> ProgressionTable {
        let tiers = vec![
            tier(Material::Gold, 30),
            tier(Material::Bronze, 10),
            tier(Material::Diamond, 50),
            tier(Material::Silver, 20),
        ];
        ProgressionTable::new(ItemId::ALL.map(|item| (item, tiers.clone()))).unwrap()
    }

    #[test]
    fn test_tiers_sorted_by_material() {
        let table = create_test_table();
        let materials: Vec<_> = table.tiers(ItemId::Armor0).unwrap().iter().map(|t| t.material).collect();
        assert_eq!(
            materials,
            vec![Material::Bronze, Material::Silver, Material::Gold, Material::Diamond]
        );
    }

    #[test]
    fn test_tier_for_owned() {
        let table = create_test_table();
        assert_eq!(
            table.tier_for_owned(ItemId::Armor0, 0).unwrap(),
            NextTier::Threshold { material: Material::Bronze, threshold: 10 }
        );
        // Strictly greater: exactly 10 moves on to Silver.
        assert_eq!(
            table.tier_for_owned(ItemId::Armor0, 10).unwrap(),
            NextTier::Threshold { material: Material::Silver, threshold: 20 }
        );
        assert_eq!(
            table.tier_for_owned(ItemId::Armor0, 49).unwrap(),
            NextTier::Threshold { material: Material::Diamond, threshold: 50 }
        );
        assert_eq!(table.tier_for_owned(ItemId::Armor0, 50).unwrap(), NextTier::Complete);
        assert_eq!(table.tier_for_owned(ItemId::Armor0, 80).unwrap(), NextTier::Complete);
    }

    #[test]
    fn test_max_threshold() {
        let table = create_test_table();
        assert_eq!(table.max_threshold(ItemId::Armor2).unwrap(), 50);
    }

    #[test]
    fn test_missing_item_is_configuration_missing() {
        let table = ProgressionTable::new([(ItemId::Armor0, vec![tier(Material::Bronze, 5)])]).unwrap();
        assert!(matches!(
            table.max_threshold(ItemId::Armor1),
            Err(EconomyError::ConfigurationMissing(_))
        ));
        assert!(matches!(
            table.threshold(ItemId::Armor0, Material::Gold),
            Err(EconomyError::ConfigurationMissing(_))
        ));
    }

    #[test]
    fn test_rejects_non_increasing_thresholds() {
        let result = ProgressionTable::new([(
            ItemId::Armor0,
            vec![tier(Material::Bronze, 10), tier(Material::Silver, 10)],
        )]);
        assert!(matches!(result, Err(EconomyError::InvalidConfig(_))));

        let result = ProgressionTable::new([(ItemId::Armor0, vec![])]);
        assert!(matches!(result, Err(EconomyError::InvalidConfig(_))));
    }

    #[test]
    fn test_unlocks_and_progress() {
        let table = create_test_table();

        assert!(!table.is_item_unlocked(ItemId::Armor1, 9).unwrap());
        assert!(table.is_item_unlocked(ItemId::Armor1, 10).unwrap());
        assert!(table.is_material_unlocked(ItemId::Armor1, Material::Silver, 25).unwrap());
        assert!(!table.is_material_unlocked(ItemId::Armor1, Material::Gold, 25).unwrap());
        assert_eq!(
            table.unlocked_materials(ItemId::Armor1, 30).unwrap(),
            vec![Material::Bronze, Material::Silver, Material::Gold]
        );

        let progress = table.progress(ItemId::Armor1, 15).unwrap();
        assert_eq!(progress, Progress::InProgress { owned: 15, target: 20 });
        assert!((progress.ratio() - 0.75).abs() < f32::EPSILON);
        assert!((table.progress(ItemId::Armor1, 50).unwrap().ratio() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_eligible_items() {
        let table = create_test_table();
        let eligible = table
            .eligible_items(|item| if item == ItemId::Armor1 { 50 } else { 3 })
            .unwrap();
        assert_eq!(eligible, vec![ItemId::Armor0, ItemId::Armor2]);
    }
}
