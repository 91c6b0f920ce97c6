mod bus;
#[cfg(not(target_arch = "wasm32"))]
mod proptest_install;

use std::cell::RefCell;
use std::collections::HashMap;

use bus_space::{AddressSpace, SharedAddressSpace, SpaceConfig};

use crate::{DeviceLookup, SharedVmeBus};

/// Minimal tag registry standing in for a host machine.
#[derive(Default)]
pub(crate) struct TestHost {
    pub buses: RefCell<HashMap<String, SharedVmeBus>>,
    pub cpus: RefCell<HashMap<String, SharedAddressSpace>>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bus(&self, bus: SharedVmeBus) -> SharedVmeBus {
        let tag = bus.borrow().tag().to_owned();
        self.buses.borrow_mut().insert(tag, bus.clone());
        bus
    }

    pub fn add_cpu(&self, tag: &str, data_width: u8, addr_width: u8) -> SharedAddressSpace {
        let space = AddressSpace::new_shared(SpaceConfig::new(
            format!("{tag} program"),
            data_width,
            addr_width,
        ));
        self.cpus.borrow_mut().insert(tag.to_owned(), space.clone());
        space
    }
}

impl DeviceLookup for TestHost {
    fn vme_bus(&self, tag: &str) -> Option<SharedVmeBus> {
        self.buses.borrow().get(tag).cloned()
    }

    fn cpu_program_space(&self, tag: &str) -> Option<SharedAddressSpace> {
        self.cpus.borrow().get(tag).cloned()
    }
}
