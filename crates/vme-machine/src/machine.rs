use std::collections::HashSet;
use std::rc::Rc;

use bus_space::SharedAddressSpace;
use vme::{attach, DeviceLookup, SharedVmeBus, VmeBus, VmeSlot};

use crate::{CardCatalog, Cpu, MachineConfig, MachineError};

/// Processors, backplanes and slots, wired together by tag.
#[derive(Debug, Default)]
pub struct Machine {
    cpus: Vec<Cpu>,
    buses: Vec<SharedVmeBus>,
    slots: Vec<VmeSlot>,
    tags: HashSet<String>,
    started: bool,
}

impl Machine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an unstarted machine. Cards are created through `catalog`.
    ///
    /// A slot naming a bus that does not exist is accepted; its card stays detached.
    pub fn from_config(config: &MachineConfig, catalog: &CardCatalog) -> Result<Self, MachineError> {
        let mut machine = Self::new();
        for cpu in &config.cpus {
            machine.add_cpu(Cpu::from_config(cpu))?;
        }
        for bus in &config.buses {
            machine.add_bus(VmeBus::new(bus.tag.clone(), bus.space.clone()))?;
        }
        for slot in &config.slots {
            let mut vme_slot = VmeSlot::new(slot.tag.clone(), slot.bus.clone(), slot.slot);
            if let Some(card) = &slot.card {
                let card = catalog.create(card).map_err(|source| MachineError::Card {
                    slot: slot.tag.clone(),
                    source,
                })?;
                vme_slot.insert_card(card);
            }
            machine.add_slot(vme_slot)?;
        }
        Ok(machine)
    }

    fn claim_tag(&mut self, tag: &str) -> Result<(), MachineError> {
        if !self.tags.insert(tag.to_owned()) {
            return Err(MachineError::DuplicateTag(tag.to_owned()));
        }
        Ok(())
    }

    pub fn add_cpu(&mut self, cpu: Cpu) -> Result<(), MachineError> {
        self.claim_tag(cpu.tag())?;
        self.cpus.push(cpu);
        Ok(())
    }

    pub fn add_bus(&mut self, bus: VmeBus) -> Result<SharedVmeBus, MachineError> {
        self.claim_tag(bus.tag())?;
        let bus = bus.into_shared();
        self.buses.push(Rc::clone(&bus));
        Ok(bus)
    }

    pub fn add_slot(&mut self, slot: VmeSlot) -> Result<(), MachineError> {
        self.claim_tag(slot.tag())?;
        self.slots.push(slot);
        Ok(())
    }

    /// Runs the start sequence: buses resolve their spaces, slots configure and attach their
    /// cards, then every attached card installs its ranges in registry order.
    ///
    /// Any failure is fatal; a machine that failed to start cannot be started again.
    pub fn start(&mut self) -> Result<(), MachineError> {
        if self.started {
            return Err(MachineError::AlreadyStarted);
        }
        self.started = true;
        let this = &*self;

        for bus in &this.buses {
            bus.borrow_mut().start(this)?;
        }

        for slot in &this.slots {
            slot.configure_card();
            if let Some(card) = slot.card() {
                attach(card, this);
            }
        }

        for bus in &this.buses {
            let bus = bus.borrow();
            for card in bus.cards().iter() {
                card.borrow_mut().install(&bus)?;
            }
        }

        tracing::info!(
            cpus = self.cpus.len(),
            buses = self.buses.len(),
            slots = self.slots.len(),
            "machine started"
        );
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn cpus(&self) -> &[Cpu] {
        &self.cpus
    }

    pub fn cpu(&self, tag: &str) -> Option<&Cpu> {
        self.cpus.iter().find(|cpu| cpu.tag() == tag)
    }

    /// Program space of processor `tag`, as seen by software running on it.
    pub fn cpu_space(&self, tag: &str) -> Option<SharedAddressSpace> {
        self.cpu(tag).map(|cpu| Rc::clone(cpu.program_space()))
    }

    pub fn buses(&self) -> &[SharedVmeBus] {
        &self.buses
    }

    pub fn bus(&self, tag: &str) -> Option<SharedVmeBus> {
        self.buses
            .iter()
            .find(|bus| bus.borrow().tag() == tag)
            .cloned()
    }

    pub fn slots(&self) -> &[VmeSlot] {
        &self.slots
    }

    pub fn slot(&self, tag: &str) -> Option<&VmeSlot> {
        self.slots.iter().find(|slot| slot.tag() == tag)
    }
}

impl DeviceLookup for Machine {
    fn vme_bus(&self, tag: &str) -> Option<SharedVmeBus> {
        self.bus(tag)
    }

    fn cpu_program_space(&self, tag: &str) -> Option<SharedAddressSpace> {
        self.cpu_space(tag)
    }
}
