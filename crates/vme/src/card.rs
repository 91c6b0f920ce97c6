use std::cell::{OnceCell, RefCell};
use std::rc::{Rc, Weak};

use bus_space::Offset;

use crate::{DeviceLookup, SharedVmeBus, VmeBus, VmeError};

pub type SharedCard = Rc<RefCell<dyn VmeCard>>;

/// Per-card bus association.
///
/// The bus tag and slot are written by the slot that holds the card before start. The bus
/// back-reference is written once, by [`attach`], and never changes afterwards.
#[derive(Debug, Default)]
pub struct CardBinding {
    bus_tag: Option<String>,
    slot_tag: Option<String>,
    slot: u32,
    bus: OnceCell<Weak<RefCell<VmeBus>>>,
}

impl CardBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bus_tag(bus_tag: impl Into<String>) -> Self {
        Self {
            bus_tag: Some(bus_tag.into()),
            ..Self::default()
        }
    }

    pub fn set_bus_tag(&mut self, bus_tag: impl Into<String>, slot_tag: impl Into<String>) {
        self.bus_tag = Some(bus_tag.into());
        self.slot_tag = Some(slot_tag.into());
    }

    pub fn set_slot(&mut self, slot: u32) {
        self.slot = slot;
    }

    pub fn bus_tag(&self) -> Option<&str> {
        self.bus_tag.as_deref()
    }

    pub fn slot_tag(&self) -> Option<&str> {
        self.slot_tag.as_deref()
    }

    /// Slot number; 0 means unassigned.
    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn is_attached(&self) -> bool {
        self.bus.get().is_some()
    }

    /// The bus this card is attached to, while that bus is alive.
    pub fn bus(&self) -> Option<SharedVmeBus> {
        self.bus.get().and_then(Weak::upgrade)
    }
}

/// The capability every pluggable card provides to the backplane.
pub trait VmeCard {
    fn binding(&self) -> &CardBinding;
    fn binding_mut(&mut self) -> &mut CardBinding;

    /// Short type name used in logs.
    fn name(&self) -> &str {
        "vme_card"
    }

    /// D8 read through the slot. Inert cards read as zero.
    fn read8(&mut self, offset: Offset) -> u8 {
        tracing::trace!(card = self.name(), "read8 offset={offset:08x}");
        0
    }

    fn write8(&mut self, offset: Offset, data: u8) {
        tracing::trace!(card = self.name(), "write8 offset={offset:08x} data={data:02x} ignored");
    }

    /// Start hook: publish this card's ranges on the bus it attached to.
    fn install(&mut self, _bus: &VmeBus) -> Result<(), VmeError> {
        Ok(())
    }
}

/// Resolves the card's bus tag and appends the card to that bus.
///
/// Returns `false` without touching anything if the card has no bus tag, the tag does not name
/// a live bus, or the card is already attached. An unresolved card stays inert for its lifetime.
pub fn attach(card: &SharedCard, devices: &dyn DeviceLookup) -> bool {
    let bus = {
        let c = card.borrow();
        let binding = c.binding();
        if binding.is_attached() {
            tracing::warn!(card = c.name(), "card already attached");
            return false;
        }
        let Some(tag) = binding.bus_tag() else {
            tracing::debug!(card = c.name(), "no bus tag; card stays detached");
            return false;
        };
        let Some(bus) = devices.vme_bus(tag) else {
            tracing::debug!(card = c.name(), bus = tag, "bus not found; card stays detached");
            return false;
        };
        bus
    };

    bus.borrow_mut().add_card(card);
    let bound = card
        .borrow()
        .binding()
        .bus
        .set(Rc::downgrade(&bus))
        .is_ok();
    debug_assert!(bound, "attach state checked above");
    bound
}

/// A card with no peripheral logic: reads zero and ignores writes.
#[derive(Debug, Default)]
pub struct GenericCard {
    binding: CardBinding,
}

impl GenericCard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bus_tag(bus_tag: impl Into<String>) -> Self {
        Self {
            binding: CardBinding::with_bus_tag(bus_tag),
        }
    }

    pub fn into_shared(self) -> SharedCard {
        Rc::new(RefCell::new(self))
    }
}

impl VmeCard for GenericCard {
    fn binding(&self) -> &CardBinding {
        &self.binding
    }

    fn binding_mut(&mut self) -> &mut CardBinding {
        &mut self.binding
    }

    fn name(&self) -> &str {
        "generic"
    }
}
