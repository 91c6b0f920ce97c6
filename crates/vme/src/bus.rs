use std::cell::RefCell;
use std::rc::Rc;

use bus_space::{BusData, Offset, ReadHandler, SharedAddressSpace, WriteHandler};

use crate::{
    resolve, AddressModifier, DeviceLookup, ResolvedSpace, SharedCard, SlotRegistry, SpaceSource,
    VmeError,
};

pub type SharedVmeBus = Rc<RefCell<VmeBus>>;

/// Truncates a lane mask to the data lines of a `width`-bit bus.
///
/// Only 16, 24 and 32-bit buses exist on the backplane; any other width is rejected.
/// `data_bits` is the handler width, used for error reporting only.
pub fn truncate_mask(width: u8, mask: u32, data_bits: u8) -> Result<u32, VmeError> {
    match width {
        16 => Ok(mask & 0x0000_FFFF),
        24 => Ok(mask & 0x00FF_FFFF),
        32 => Ok(mask),
        _ => Err(VmeError::UnsupportedBusWidth { width, data_bits }),
    }
}

/// One backplane instance (the P1 data transfer bus).
pub struct VmeBus {
    tag: String,
    source: SpaceSource,
    resolved: Option<ResolvedSpace>,
    cards: SlotRegistry,
}

impl VmeBus {
    pub fn new(tag: impl Into<String>, source: SpaceSource) -> Self {
        Self {
            tag: tag.into(),
            source,
            resolved: None,
            cards: SlotRegistry::new(),
        }
    }

    /// A bus that allocates its own 32-bit space.
    pub fn with_own_space(tag: impl Into<String>) -> Self {
        Self::new(tag, SpaceSource::default())
    }

    /// A bus that installs into the program space of processor `cpu_tag`.
    pub fn with_owner_space(tag: impl Into<String>, cpu_tag: impl Into<String>) -> Self {
        Self::new(tag, SpaceSource::owner(cpu_tag))
    }

    pub fn into_shared(self) -> SharedVmeBus {
        Rc::new(RefCell::new(self))
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn source(&self) -> &SpaceSource {
        &self.source
    }

    /// Resolves the address space this bus routes into. Runs once per bus lifetime.
    pub fn start(&mut self, devices: &dyn DeviceLookup) -> Result<(), VmeError> {
        if self.resolved.is_some() {
            return Err(VmeError::AlreadyStarted {
                bus: self.tag.clone(),
            });
        }
        let resolved = resolve(&self.tag, &self.source, devices)?;
        tracing::debug!(
            bus = %self.tag,
            space = %resolved.space().borrow().name(),
            width = resolved.width(),
            "bus started"
        );
        self.resolved = Some(resolved);
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.resolved.is_some()
    }

    pub fn resolved(&self) -> Option<&ResolvedSpace> {
        self.resolved.as_ref()
    }

    /// The resolved space, shared with the bus master that issues accesses into it.
    pub fn space(&self) -> Option<&SharedAddressSpace> {
        self.resolved.as_ref().map(ResolvedSpace::space)
    }

    /// Data width of the resolved space in bits.
    pub fn data_width(&self) -> Option<u8> {
        self.resolved.as_ref().map(ResolvedSpace::width)
    }

    pub fn add_card(&mut self, card: &SharedCard) {
        tracing::debug!(bus = %self.tag, card = card.borrow().name(), "add card");
        self.cards.append(card);
    }

    pub fn cards(&self) -> &SlotRegistry {
        &self.cards
    }

    pub fn cards_mut(&mut self) -> &mut SlotRegistry {
        &mut self.cards
    }

    /// Sibling discovery: the card attached in `slot`, if any.
    pub fn card_in_slot(&self, slot: u32) -> Option<SharedCard> {
        self.cards.lookup(slot)
    }

    /// Publishes a D8/D16/D32 device over `[start, end]` for the modifier `amod`.
    ///
    /// Only single-cycle A16/A24/A32 modifiers are accepted. `mask` is truncated to the resolved
    /// bus width before it reaches the address space. Overlapping installs are not detected
    /// here.
    pub fn install_device<T: BusData>(
        &self,
        amod: AddressModifier,
        start: Offset,
        end: Offset,
        read: ReadHandler<T>,
        write: WriteHandler<T>,
        mask: u32,
    ) -> Result<(), VmeError> {
        tracing::debug!(bus = %self.tag, %amod, data_bits = T::BITS, "install device");

        // TODO: route block transfer and MBLT modifiers once multi-cycle transfers are modelled.
        if !amod.is_supported() {
            return Err(VmeError::UnsupportedAddressModifier {
                amod,
                data_bits: T::BITS,
            });
        }

        let resolved = self.resolved.as_ref().ok_or_else(|| VmeError::NotStarted {
            bus: self.tag.clone(),
        })?;
        let mask = truncate_mask(resolved.width(), mask, T::BITS)?;

        tracing::trace!(
            bus = %self.tag,
            width = resolved.width(),
            "forward {start:#010x}..={end:#010x} mask={mask:#010x}"
        );
        resolved
            .space()
            .borrow_mut()
            .install_readwrite_handler(start, end, read, write, mask)?;
        Ok(())
    }

    pub fn install_device8(
        &self,
        amod: AddressModifier,
        start: Offset,
        end: Offset,
        read: ReadHandler<u8>,
        write: WriteHandler<u8>,
        mask: u32,
    ) -> Result<(), VmeError> {
        self.install_device(amod, start, end, read, write, mask)
    }

    pub fn install_device16(
        &self,
        amod: AddressModifier,
        start: Offset,
        end: Offset,
        read: ReadHandler<u16>,
        write: WriteHandler<u16>,
        mask: u32,
    ) -> Result<(), VmeError> {
        self.install_device(amod, start, end, read, write, mask)
    }

    pub fn install_device32(
        &self,
        amod: AddressModifier,
        start: Offset,
        end: Offset,
        read: ReadHandler<u32>,
        write: WriteHandler<u32>,
        mask: u32,
    ) -> Result<(), VmeError> {
        self.install_device(amod, start, end, read, write, mask)
    }
}

impl Drop for VmeBus {
    fn drop(&mut self) {
        tracing::trace!(bus = %self.tag, "detach all cards");
        self.cards.detach_all();
    }
}

impl core::fmt::Debug for VmeBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VmeBus")
            .field("tag", &self.tag)
            .field("source", &self.source)
            .field("width", &self.data_width())
            .field("cards", &self.cards)
            .finish()
    }
}
