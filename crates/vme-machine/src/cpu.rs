use bus_space::{AddressSpace, SharedAddressSpace, SpaceConfig};

use crate::CpuConfig;

/// A bus master. Only its program space is modelled; instruction execution is not.
#[derive(Debug)]
pub struct Cpu {
    tag: String,
    program: SharedAddressSpace,
}

impl Cpu {
    pub fn new(tag: impl Into<String>, program: SpaceConfig) -> Self {
        Self {
            tag: tag.into(),
            program: AddressSpace::new_shared(program),
        }
    }

    pub fn from_config(config: &CpuConfig) -> Self {
        Self::new(config.tag.clone(), config.program.clone())
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn program_space(&self) -> &SharedAddressSpace {
        &self.program
    }
}
