//! Host machine for VME backplanes.
//!
//! This crate composes processors ([`Cpu`]), backplanes ([`vme::VmeBus`]) and slots holding
//! cards into a [`Machine`], and owns the start sequence the bus core relies on:
//!
//! 1. every bus resolves its address space (own, or borrowed from a processor by tag);
//! 2. every slot hands its bus tag to its card and the card attaches to that bus;
//! 3. every attached card publishes its address ranges.
//!
//! Machines are described by a JSON [`MachineConfig`]; card types are looked up in a
//! [`CardCatalog`].

#![forbid(unsafe_code)]

mod cards;
mod catalog;
mod config;
mod cpu;
mod error;
mod machine;

pub use cards::RamCard;
pub use catalog::{CardCatalog, CardFactory, CatalogError};
pub use config::{BusConfig, CardConfig, CpuConfig, MachineConfig, SlotConfig};
pub use cpu::Cpu;
pub use error::MachineError;
pub use machine::Machine;
