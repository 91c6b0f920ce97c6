//! VME/Versabus backplane core.
//!
//! A [`VmeBus`] routes memory-mapped accesses from a bus master into handlers published by the
//! cards plugged into its slots. At start the bus resolves which [`bus_space::AddressSpace`] it
//! routes into: either one it allocates for itself or the program space of an owning processor
//! (see [`SpaceSource`]). Cards then call [`VmeBus::install_device`] to publish their ranges for a
//! given [`AddressModifier`]; the bus gates unsupported modifiers and truncates the lane mask to
//! the resolved bus width before forwarding the registration.
//!
//! Only single-access cycles (A16/A24/A32 SC) are routed. Block transfers, arbitration,
//! interrupts and the P2 connector are not modelled.
//!
//! Start-up is two-phase: everything is constructed with unresolved tags, then a host that
//! implements [`DeviceLookup`] starts each bus and attaches each card.

#![forbid(unsafe_code)]

mod amod;
mod bus;
mod card;
mod error;
mod lookup;
mod registry;
mod slot;
mod space;

pub use amod::{AddressModifier, ParseAddressModifierError};
pub use bus::{truncate_mask, SharedVmeBus, VmeBus};
pub use card::{attach, CardBinding, GenericCard, SharedCard, VmeCard};
pub use error::VmeError;
pub use lookup::DeviceLookup;
pub use registry::SlotRegistry;
pub use slot::VmeSlot;
pub use space::{resolve, ResolvedSpace, SpaceSource, DEFAULT_OWNER_TAG};

#[cfg(test)]
mod tests;
