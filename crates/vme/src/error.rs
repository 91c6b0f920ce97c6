use bus_space::SpaceError;
use thiserror::Error;

use crate::AddressModifier;

/// Configuration errors raised while starting a bus or installing devices on it.
///
/// All of these are fatal for machine start-up; none is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmeError {
    #[error("VME D{data_bits}: unsupported address modifier {amod}")]
    UnsupportedAddressModifier { amod: AddressModifier, data_bits: u8 },

    #[error("VME D{data_bits}: bus width {width} not supported")]
    UnsupportedBusWidth { width: u8, data_bits: u8 },

    #[error("VME bus {bus}: owner cpu {cpu_tag:?} not found")]
    OwnerNotFound { bus: String, cpu_tag: String },

    #[error("VME bus {bus}: address space is not resolved yet; start the bus before installing devices")]
    NotStarted { bus: String },

    #[error("VME bus {bus}: address space already resolved")]
    AlreadyStarted { bus: String },

    #[error(transparent)]
    Space(#[from] SpaceError),
}
