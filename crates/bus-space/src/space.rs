use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{BusData, HandlerPair, ReadHandler, WriteHandler};

/// Bus address / range offset. Backplane addresses never exceed 32 bits.
pub type Offset = u32;

pub type SharedAddressSpace = Rc<RefCell<AddressSpace>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpaceError {
    #[error("{space}: empty range start=0x{start:08x} end=0x{end:08x}")]
    EmptyRange {
        space: String,
        start: Offset,
        end: Offset,
    },

    #[error("{space}: range end 0x{end:08x} exceeds the {addr_width}-bit address bus")]
    OutOfRange {
        space: String,
        end: Offset,
        addr_width: u8,
    },
}

/// Byte order multi-byte handlers on a space use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    #[default]
    Big,
    Little,
}

/// Static description of an address space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceConfig {
    pub name: String,
    pub endianness: Endianness,
    /// Native data bus width in bits.
    pub data_width: u8,
    /// Address bus width in bits (at most 32).
    pub addr_width: u8,
    /// Value returned by reads that no handler claims.
    pub unmap_value: u32,
}

impl SpaceConfig {
    pub fn new(name: impl Into<String>, data_width: u8, addr_width: u8) -> Self {
        Self {
            name: name.into(),
            endianness: Endianness::Big,
            data_width,
            addr_width,
            unmap_value: 0,
        }
    }

    /// The 32-bit data / 32-bit address space a backplane allocates for itself.
    pub fn vme_a32() -> Self {
        Self::new("VME A32", 32, 32)
    }

    fn addr_mask(&self) -> Offset {
        match self.addr_width {
            0 => 0,
            w if w >= 32 => Offset::MAX,
            w => (1 << w) - 1,
        }
    }
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self::vme_a32()
    }
}

/// One installed registration, as seen by inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub start: Offset,
    /// Inclusive.
    pub end: Offset,
    /// Handler data width in bits (8/16/32).
    pub width: u8,
    pub mask: u32,
}

impl Mapping {
    fn contains(&self, addr: Offset) -> bool {
        addr >= self.start && addr <= self.end
    }
}

struct Entry {
    mapping: Mapping,
    handlers: HandlerPair,
}

/// A dispatch target for width-qualified memory-mapped accesses.
pub struct AddressSpace {
    config: SpaceConfig,
    addr_mask: Offset,
    entries: Vec<Entry>,
}

impl AddressSpace {
    pub fn new(config: SpaceConfig) -> Self {
        let addr_mask = config.addr_mask();
        Self {
            config,
            addr_mask,
            entries: Vec::new(),
        }
    }

    pub fn new_shared(config: SpaceConfig) -> SharedAddressSpace {
        Rc::new(RefCell::new(Self::new(config)))
    }

    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn endianness(&self) -> Endianness {
        self.config.endianness
    }

    pub fn data_width(&self) -> u8 {
        self.config.data_width
    }

    pub fn addr_width(&self) -> u8 {
        self.config.addr_width
    }

    /// Installed registrations in install order.
    pub fn mappings(&self) -> impl Iterator<Item = Mapping> + '_ {
        self.entries.iter().map(|e| e.mapping)
    }

    /// Installs a read/write handler pair over `[start, end]` on the data lanes in `mask`.
    ///
    /// Later installs shadow earlier ones where they overlap. A zero mask is accepted; such a
    /// mapping participates in no data lanes and never matches an access.
    pub fn install_readwrite_handler<T: BusData>(
        &mut self,
        start: Offset,
        end: Offset,
        read: ReadHandler<T>,
        write: WriteHandler<T>,
        mask: u32,
    ) -> Result<(), SpaceError> {
        if start > end {
            return Err(SpaceError::EmptyRange {
                space: self.config.name.clone(),
                start,
                end,
            });
        }
        if end & !self.addr_mask != 0 {
            return Err(SpaceError::OutOfRange {
                space: self.config.name.clone(),
                end,
                addr_width: self.config.addr_width,
            });
        }

        let mapping = Mapping {
            start,
            end,
            width: T::BITS,
            mask,
        };
        tracing::trace!(
            space = %self.config.name,
            width = T::BITS,
            "install read/write handler {start:#010x}..={end:#010x} mask={mask:#010x}"
        );
        self.entries.push(Entry {
            mapping,
            handlers: T::into_handlers(read, write),
        });
        Ok(())
    }

    /// Finds the newest entry serving `addr` at width `T` whose lanes overlap `mem_mask`.
    ///
    /// Returns the entry index and the effective lane mask.
    fn find<T: BusData>(&self, addr: Offset, mem_mask: T) -> Option<(usize, T)> {
        self.entries
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, e)| e.mapping.width == T::BITS && e.mapping.contains(addr))
            .find_map(|(idx, e)| {
                let lanes = T::from_u32(e.mapping.mask) & mem_mask;
                (lanes != T::ZERO).then_some((idx, lanes))
            })
    }

    pub fn read<T: BusData>(&mut self, addr: Offset, mem_mask: T) -> T {
        let addr = addr & self.addr_mask;
        let Some((idx, lanes)) = self.find(addr, mem_mask) else {
            tracing::trace!(
                space = %self.config.name,
                width = T::BITS,
                "unmapped read at {addr:#010x}"
            );
            return T::from_u32(self.config.unmap_value);
        };
        let entry = &mut self.entries[idx];
        let offset = addr - entry.mapping.start;
        match T::handlers(&mut entry.handlers) {
            Some((read, _)) => read(offset, lanes) & lanes,
            None => T::from_u32(self.config.unmap_value),
        }
    }

    pub fn write<T: BusData>(&mut self, addr: Offset, data: T, mem_mask: T) {
        let addr = addr & self.addr_mask;
        let Some((idx, lanes)) = self.find(addr, mem_mask) else {
            tracing::trace!(
                space = %self.config.name,
                width = T::BITS,
                "unmapped write at {addr:#010x} dropped (data={data:#x})"
            );
            return;
        };
        let entry = &mut self.entries[idx];
        let offset = addr - entry.mapping.start;
        if let Some((_, write)) = T::handlers(&mut entry.handlers) {
            write(offset, data & lanes, lanes);
        }
    }

    pub fn read_u8(&mut self, addr: Offset) -> u8 {
        self.read(addr, u8::ALL)
    }

    pub fn read_u16(&mut self, addr: Offset) -> u16 {
        self.read(addr, u16::ALL)
    }

    pub fn read_u32(&mut self, addr: Offset) -> u32 {
        self.read(addr, u32::ALL)
    }

    pub fn write_u8(&mut self, addr: Offset, data: u8) {
        self.write(addr, data, u8::ALL)
    }

    pub fn write_u16(&mut self, addr: Offset, data: u16) {
        self.write(addr, data, u16::ALL)
    }

    pub fn write_u32(&mut self, addr: Offset, data: u32) {
        self.write(addr, data, u32::ALL)
    }
}

impl core::fmt::Debug for AddressSpace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AddressSpace")
            .field("config", &self.config)
            .field("mappings", &self.entries.len())
            .finish()
    }
}
