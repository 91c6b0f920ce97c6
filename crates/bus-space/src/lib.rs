//! Memory-mapped address spaces with width-qualified read/write handlers.
//!
//! An [`AddressSpace`] is the dispatch target a bus master issues accesses against. Devices
//! publish inclusive address ranges via [`AddressSpace::install_readwrite_handler`], each with a
//! data-lane mask. Accesses are routed to the most recently installed handler whose range
//! contains the address, whose width matches the access width and whose mask overlaps the
//! access mask. Unclaimed reads float to the configured unmap value and unclaimed writes are
//! dropped.
//!
//! Spaces are shared between a processor and any bus that borrows it, so they are handed out as
//! [`SharedAddressSpace`] (`Rc<RefCell<_>>`). Everything here is single-threaded.

#![forbid(unsafe_code)]

mod data;
mod space;

pub use data::{BusData, ReadHandler, WriteHandler};
pub use space::{
    AddressSpace, Endianness, Mapping, Offset, SharedAddressSpace, SpaceConfig, SpaceError,
};

#[cfg(test)]
mod tests;
