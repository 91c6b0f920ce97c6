use bus_space::Offset;

use crate::SharedCard;

/// A numbered backplane position holding at most one card.
///
/// The slot owns its card. At start it hands its bus tag, its own tag and its number to the card
/// so the card can attach itself.
pub struct VmeSlot {
    tag: String,
    bus_tag: String,
    slot: u32,
    card: Option<SharedCard>,
}

impl VmeSlot {
    pub fn new(tag: impl Into<String>, bus_tag: impl Into<String>, slot: u32) -> Self {
        Self {
            tag: tag.into(),
            bus_tag: bus_tag.into(),
            slot,
            card: None,
        }
    }

    pub fn with_card(mut self, card: SharedCard) -> Self {
        self.card = Some(card);
        self
    }

    /// Plugs `card` in, returning any card previously held.
    pub fn insert_card(&mut self, card: SharedCard) -> Option<SharedCard> {
        self.card.replace(card)
    }

    pub fn card(&self) -> Option<&SharedCard> {
        self.card.as_ref()
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn bus_tag(&self) -> &str {
        &self.bus_tag
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Copies this slot's bus association into the held card.
    pub fn configure_card(&self) {
        tracing::debug!(slot = %self.tag, bus = %self.bus_tag, "configure card");
        if let Some(card) = &self.card {
            let mut card = card.borrow_mut();
            let binding = card.binding_mut();
            binding.set_bus_tag(self.bus_tag.clone(), self.tag.clone());
            binding.set_slot(self.slot);
        }
    }

    /// The held card, if it attached to its bus. Unattached cards are inert.
    fn attached_card(&self) -> Option<&SharedCard> {
        self.card
            .as_ref()
            .filter(|card| card.borrow().binding().is_attached())
    }

    /// D8 read through the slot connector; an empty slot or detached card reads zero.
    pub fn read8(&self, offset: Offset) -> u8 {
        self.attached_card()
            .map_or(0, |card| card.borrow_mut().read8(offset))
    }

    pub fn write8(&self, offset: Offset, data: u8) {
        match self.attached_card() {
            Some(card) => card.borrow_mut().write8(offset, data),
            None => tracing::trace!(slot = %self.tag, "write8 offset={offset:08x} dropped"),
        }
    }
}

impl core::fmt::Debug for VmeSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VmeSlot")
            .field("tag", &self.tag)
            .field("bus_tag", &self.bus_tag)
            .field("slot", &self.slot)
            .field("card", &self.card.as_ref().map(|c| c.borrow().name().to_owned()))
            .finish()
    }
}
