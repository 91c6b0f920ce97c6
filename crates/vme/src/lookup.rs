use bus_space::SharedAddressSpace;

use crate::SharedVmeBus;

/// Tag-to-device resolution provided by the host machine.
///
/// Lookups happen during the start phase only, after every device has been constructed.
pub trait DeviceLookup {
    /// The backplane registered under `tag`, if any.
    fn vme_bus(&self, tag: &str) -> Option<SharedVmeBus>;

    /// The program address space of the processor registered under `tag`, if any.
    fn cpu_program_space(&self, tag: &str) -> Option<SharedAddressSpace>;
}
