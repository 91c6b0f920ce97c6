use std::cell::RefCell;
use std::rc::Rc;

use bus_space::{BusData, Endianness, Offset, ReadHandler, WriteHandler};
use vme::{AddressModifier, CardBinding, SharedCard, VmeBus, VmeCard, VmeError};

use crate::{CardConfig, CatalogError};

type SharedMemory = Rc<RefCell<Vec<u8>>>;

/// A memory board: `size` bytes decoded at `base` for one address modifier.
///
/// Multi-byte accesses use the byte order of the space the bus routes into.
#[derive(Debug)]
pub struct RamCard {
    binding: CardBinding,
    amod: AddressModifier,
    base: u32,
    data_bits: u8,
    mem: SharedMemory,
}

impl RamCard {
    pub fn new(
        amod: AddressModifier,
        base: u32,
        size: u32,
        data_bits: u8,
    ) -> Result<Self, CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidOption {
            card: "ram".to_owned(),
            reason,
        };

        if size == 0 {
            return Err(invalid("size must be non-zero".to_owned()));
        }
        if base.checked_add(size - 1).is_none() {
            return Err(invalid(format!(
                "{size:#x} bytes at {base:#010x} overflow the address range"
            )));
        }
        if let Some(bits) = amod.address_bits().filter(|&bits| bits < 32) {
            let end = u64::from(base) + u64::from(size) - 1;
            if end >> bits != 0 {
                return Err(invalid(format!(
                    "{size:#x} bytes at {base:#010x} exceed the {bits}-bit range of {amod}"
                )));
            }
        }
        if !matches!(data_bits, 8 | 16 | 32) {
            return Err(invalid(format!("unsupported data width {data_bits}")));
        }

        Ok(Self {
            binding: CardBinding::new(),
            amod,
            base,
            data_bits,
            mem: Rc::new(RefCell::new(vec![0; size as usize])),
        })
    }

    /// Defaults: A24 non-privileged data access, D16.
    pub fn from_config(config: &CardConfig) -> Result<Self, CatalogError> {
        Self::new(
            config.amod.unwrap_or(AddressModifier::A24_SC),
            config.base,
            config.size,
            config.data_width.unwrap_or(16),
        )
    }

    pub fn into_shared(self) -> SharedCard {
        Rc::new(RefCell::new(self))
    }

    pub fn amod(&self) -> AddressModifier {
        self.amod
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn size(&self) -> u32 {
        self.mem.borrow().len() as u32
    }

    /// Last address decoded by the board.
    pub fn end(&self) -> u32 {
        self.base + (self.size() - 1)
    }

    fn install_width<T: BusData>(
        &self,
        bus: &VmeBus,
        endianness: Endianness,
    ) -> Result<(), VmeError> {
        let (read, write) = ram_handlers::<T>(&self.mem, endianness);
        bus.install_device::<T>(self.amod, self.base, self.end(), read, write, u32::MAX)
    }
}

/// Bit position of byte `i` of a `bytes`-wide access.
fn lane_shift(endianness: Endianness, bytes: usize, i: usize) -> usize {
    match endianness {
        Endianness::Big => 8 * (bytes - 1 - i),
        Endianness::Little => 8 * i,
    }
}

/// Handlers over `mem`. Bytes past the end of memory read as zero and drop writes.
fn ram_handlers<T: BusData>(
    mem: &SharedMemory,
    endianness: Endianness,
) -> (ReadHandler<T>, WriteHandler<T>) {
    let read_mem = Rc::clone(mem);
    let write_mem = Rc::clone(mem);

    let read: ReadHandler<T> = Box::new(move |offset: Offset, _mem_mask: T| {
        let mem = read_mem.borrow();
        let value = (0..T::BYTES).fold(0u32, |acc, i| {
            let byte = mem.get(offset as usize + i).copied().unwrap_or(0);
            acc | (u32::from(byte) << lane_shift(endianness, T::BYTES, i))
        });
        T::from_u32(value)
    });

    let write: WriteHandler<T> = Box::new(move |offset: Offset, data: T, mem_mask: T| {
        let mut mem = write_mem.borrow_mut();
        let (data, mask) = (data.to_u32(), mem_mask.to_u32());
        for i in 0..T::BYTES {
            let shift = lane_shift(endianness, T::BYTES, i);
            let lane = (mask >> shift) as u8;
            if let Some(byte) = mem.get_mut(offset as usize + i) {
                *byte = (*byte & !lane) | ((data >> shift) as u8 & lane);
            }
        }
    });

    (read, write)
}

impl VmeCard for RamCard {
    fn binding(&self) -> &CardBinding {
        &self.binding
    }

    fn binding_mut(&mut self) -> &mut CardBinding {
        &mut self.binding
    }

    fn name(&self) -> &str {
        "ram"
    }

    fn read8(&mut self, offset: Offset) -> u8 {
        self.mem.borrow().get(offset as usize).copied().unwrap_or(0)
    }

    fn write8(&mut self, offset: Offset, data: u8) {
        if let Some(byte) = self.mem.borrow_mut().get_mut(offset as usize) {
            *byte = data;
        }
    }

    fn install(&mut self, bus: &VmeBus) -> Result<(), VmeError> {
        let endianness = bus
            .space()
            .map_or(Endianness::Big, |space| space.borrow().endianness());
        tracing::debug!(
            bus = bus.tag(),
            amod = %self.amod,
            "ram {:#010x}..={:#010x} D{}",
            self.base,
            self.end(),
            self.data_bits
        );
        match self.data_bits {
            8 => self.install_width::<u8>(bus, endianness),
            32 => self.install_width::<u32>(bus, endianness),
            _ => self.install_width::<u16>(bus, endianness),
        }
    }
}
