use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::{SharedCard, VmeCard};

/// Ordered membership of the cards attached to one bus.
///
/// The registry holds weak handles only: cards are owned by their slots, and clearing the
/// registry never drops a card.
#[derive(Default)]
pub struct SlotRegistry {
    cards: Vec<Weak<RefCell<dyn VmeCard>>>,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `card`. Duplicates are not detected.
    pub fn append(&mut self, card: &SharedCard) {
        self.cards.push(Rc::downgrade(card));
    }

    /// Drops all membership. Safe to call on an empty registry.
    pub fn detach_all(&mut self) {
        self.cards.clear();
    }

    /// Live cards in attach order.
    pub fn iter(&self) -> impl Iterator<Item = SharedCard> + '_ {
        self.cards.iter().filter_map(Weak::upgrade)
    }

    /// The first attached card configured for `slot`.
    ///
    /// Slot 0 means unassigned and never matches. A card that is mutably borrowed at the time of
    /// the call (e.g. the one asking for its siblings) is skipped.
    pub fn lookup(&self, slot: u32) -> Option<SharedCard> {
        if slot == 0 {
            return None;
        }
        self.iter().find(|card| {
            card.try_borrow()
                .is_ok_and(|card| card.binding().slot() == slot)
        })
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl core::fmt::Debug for SlotRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SlotRegistry")
            .field("cards", &self.len())
            .finish()
    }
}
