use bus_space::{AddressSpace, SharedAddressSpace, SpaceConfig};
use serde::{Deserialize, Serialize};

use crate::{DeviceLookup, VmeError};

/// Processor tag a bus borrows from when none is configured.
pub const DEFAULT_OWNER_TAG: &str = "maincpu";

/// Where a bus gets the address space it routes into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceSource {
    /// The bus allocates and decodes its own space.
    Own(SpaceConfig),
    /// The bus installs straight into the program space of the processor `cpu`.
    ///
    /// This skips modifier decoding on a separate space entirely, which is what boards without
    /// arbitration want.
    Owner {
        #[serde(default = "default_owner_tag")]
        cpu: String,
    },
}

fn default_owner_tag() -> String {
    DEFAULT_OWNER_TAG.to_owned()
}

impl SpaceSource {
    pub fn owner(cpu: impl Into<String>) -> Self {
        Self::Owner { cpu: cpu.into() }
    }
}

impl Default for SpaceSource {
    fn default() -> Self {
        Self::Own(SpaceConfig::vme_a32())
    }
}

/// The outcome of start-time resolution. Immutable for the life of the bus.
#[derive(Debug, Clone)]
pub struct ResolvedSpace {
    space: SharedAddressSpace,
    width: u8,
    owner: Option<String>,
}

impl ResolvedSpace {
    pub fn space(&self) -> &SharedAddressSpace {
        &self.space
    }

    /// Data width in bits, captured at resolution time.
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Tag of the processor the space is borrowed from, or `None` for an owned space.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }
}

/// Resolves the address space for the bus tagged `bus_tag`.
pub fn resolve(
    bus_tag: &str,
    source: &SpaceSource,
    devices: &dyn DeviceLookup,
) -> Result<ResolvedSpace, VmeError> {
    match source {
        SpaceSource::Own(config) => {
            tracing::debug!(bus = bus_tag, space = %config.name, "using own address space");
            let space = AddressSpace::new_shared(config.clone());
            Ok(ResolvedSpace {
                space,
                width: config.data_width,
                owner: None,
            })
        }
        SpaceSource::Owner { cpu } => {
            tracing::debug!(bus = bus_tag, cpu = %cpu, "using owner address space");
            let space =
                devices
                    .cpu_program_space(cpu)
                    .ok_or_else(|| VmeError::OwnerNotFound {
                        bus: bus_tag.to_owned(),
                        cpu_tag: cpu.clone(),
                    })?;
            let width = space.borrow().data_width();
            Ok(ResolvedSpace {
                space,
                width,
                owner: Some(cpu.clone()),
            })
        }
    }
}
