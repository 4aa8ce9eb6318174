//! # Reward Reveal
//!
//! The display layer shows a bundle one entry per tap, always in the order
//! Coin, Ticket, Gem, then armor sets in `ItemId` order. Absent entries are
//! skipped. Once everything is shown the sequencer stays `Done`.

use crate::currency::{Currency, ItemId};
use crate::loot::RewardBundle;

/// Reveal slots: three balances followed by every armor set.
const SLOT_COUNT: usize = Currency::BALANCES.len() + ItemId::ALL.len();

/// One revealed line of a bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealedEntry {
    /// A currency amount.
    Currency {
        /// Which currency.
        currency: Currency,
        /// How much.
        amount: u32,
    },
    /// Armor pieces.
    Item {
        /// Which set.
        item: ItemId,
        /// How many pieces.
        amount: u32,
    },
}

/// Result of one `advance`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reveal {
    /// Show this entry.
    Entry(RevealedEntry),
    /// Nothing left.
    Done,
}

/// Cursor state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealCursor {
    /// Next slot to inspect.
    Revealing {
        /// Slot index.
        position: usize,
    },
    /// Terminal.
    Done,
}

/// Walks a bundle in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewardRevealSequencer {
    cursor: RevealCursor,
}

impl Default for RewardRevealSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl RewardRevealSequencer {
    /// Starts at the first slot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cursor: RevealCursor::Revealing { position: 0 },
        }
    }

    /// Returns the next present entry, or `Done`.
    pub fn advance(&mut self, bundle: &RewardBundle) -> Reveal {
        while let RevealCursor::Revealing { position } = self.cursor {
            let next = position + 1;
            self.cursor = if next < SLOT_COUNT {
                RevealCursor::Revealing { position: next }
            } else {
                RevealCursor::Done
            };

            if let Some(entry) = entry_at(bundle, position) {
                return Reveal::Entry(entry);
            }
        }
        Reveal::Done
    }

    /// True once every slot has been passed.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self.cursor, RevealCursor::Done)
    }

    /// Next slot index; equals the slot count when done.
    #[must_use]
    pub const fn position(&self) -> usize {
        match self.cursor {
            RevealCursor::Revealing { position } => position,
            RevealCursor::Done => SLOT_COUNT,
        }
    }

    /// Current cursor.
    #[must_use]
    pub const fn cursor(&self) -> RevealCursor {
        self.cursor
    }

    /// Back to the first slot, for the next bundle.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

fn entry_at(bundle: &RewardBundle, position: usize) -> Option<RevealedEntry> {
    let balances = Currency::BALANCES.len();
    if position < balances {
        let currency = Currency::BALANCES[position];
        let amount = bundle.currency(currency);
        return (amount > 0).then_some(RevealedEntry::Currency { currency, amount });
    }
    let item = *ItemId::ALL.get(position - balances)?;
    let amount = bundle.item(item);
    (amount > 0).then_some(RevealedEntry::Item { item, amount })
}

/// Every entry of a bundle in display order.
#[must_use]
pub fn reveal_all(bundle: &RewardBundle) -> Vec<RevealedEntry> {
    let mut sequencer = RewardRevealSequencer::new();
    let mut entries = Vec::new();
    while let Reveal::Entry(entry) = sequencer.advance(bundle) {
        entries.push(entry);
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveal_order() {
        let mut bundle = RewardBundle::new();
        bundle.add_item(ItemId::Armor2, 4);
        bundle.add_currency(Currency::Gem, 3);
        bundle.add_currency(Currency::Coin, 25);
        bundle.add_item(ItemId::Armor0, 1);

        let mut sequencer = RewardRevealSequencer::new();
        assert_eq!(
            sequencer.advance(&bundle),
            Reveal::Entry(RevealedEntry::Currency { currency: Currency::Coin, amount: 25 })
        );
        assert_eq!(
            sequencer.advance(&bundle),
            Reveal::Entry(RevealedEntry::Currency { currency: Currency::Gem, amount: 3 })
        );
        assert_eq!(
            sequencer.advance(&bundle),
            Reveal::Entry(RevealedEntry::Item { item: ItemId::Armor0, amount: 1 })
        );
        assert_eq!(
            sequencer.advance(&bundle),
            Reveal::Entry(RevealedEntry::Item { item: ItemId::Armor2, amount: 4 })
        );
        assert!(sequencer.is_done());
        assert_eq!(sequencer.advance(&bundle), Reveal::Done);
        assert_eq!(sequencer.advance(&bundle), Reveal::Done);
    }

    #[test]
    fn test_empty_bundle_is_done_immediately() {
        let mut sequencer = RewardRevealSequencer::new();
        assert_eq!(sequencer.advance(&RewardBundle::new()), Reveal::Done);
        assert!(sequencer.is_done());
        assert_eq!(sequencer.position(), SLOT_COUNT);
    }

    #[test]
    fn test_position_is_monotonic() {
        let mut bundle = RewardBundle::new();
        bundle.add_currency(Currency::Ticket, 1);
        bundle.add_currency(Currency::Gem, 1);

        let mut sequencer = RewardRevealSequencer::new();
        let mut last = sequencer.position();
        while sequencer.advance(&bundle) != Reveal::Done {
            assert!(sequencer.position() > last);
            last = sequencer.position();
        }
        assert_eq!(sequencer.cursor(), RevealCursor::Done);

        sequencer.reset();
        assert_eq!(sequencer.position(), 0);
    }

    #[test]
    fn test_reveal_all_matches_bundle() {
        let mut bundle = RewardBundle::new();
        bundle.add_currency(Currency::Ticket, 2);
        bundle.add_item(ItemId::Armor1, 6);

        let entries = reveal_all(&bundle);
        assert_eq!(
            entries,
            vec![
                RevealedEntry::Currency { currency: Currency::Ticket, amount: 2 },
                RevealedEntry::Item { item: ItemId::Armor1, amount: 6 },
            ]
        );
    }
}
