use std::cell::RefCell;
use std::rc::Rc;

use bus_space::{Mapping, SpaceConfig};

use super::TestHost;
use crate::{AddressModifier, SpaceSource, VmeBus, VmeError};

fn noop_u16() -> (bus_space::ReadHandler<u16>, bus_space::WriteHandler<u16>) {
    (Box::new(|_, _| 0), Box::new(|_, _, _| {}))
}

fn mappings(bus: &VmeBus) -> Vec<Mapping> {
    bus.space().unwrap().borrow().mappings().collect()
}

#[test]
fn own_space_a32_forwards_full_mask_and_dispatches() {
    let host = TestHost::new();
    let bus = host.add_bus(VmeBus::with_own_space("vme").into_shared());
    bus.borrow_mut().start(&host).unwrap();
    assert_eq!(bus.borrow().data_width(), Some(32));

    let log = Rc::new(RefCell::new(Vec::new()));
    let (rlog, wlog) = (log.clone(), log.clone());
    bus.borrow()
        .install_device32(
            AddressModifier::A32_SC,
            0x1000,
            0x100F,
            Box::new(move |offset, _| {
                rlog.borrow_mut().push(("r", offset, 0));
                0xCAFE_F00D
            }),
            Box::new(move |offset, data, _| wlog.borrow_mut().push(("w", offset, data))),
            0xFFFF_FFFF,
        )
        .unwrap();

    let bus = bus.borrow();
    assert_eq!(
        mappings(&bus),
        vec![Mapping {
            start: 0x1000,
            end: 0x100F,
            width: 32,
            mask: 0xFFFF_FFFF,
        }]
    );

    let space = bus.space().unwrap();
    assert_eq!(space.borrow_mut().read_u32(0x1004), 0xCAFE_F00D);
    space.borrow_mut().write_u32(0x1004, 0x1234_5678);
    assert_eq!(
        log.borrow().as_slice(),
        &[("r", 4, 0), ("w", 4, 0x1234_5678)]
    );
}

#[test]
fn borrowed_16_bit_space_truncates_mask_to_zero() {
    let host = TestHost::new();
    let cpu = host.add_cpu("maincpu", 16, 24);
    let bus = host.add_bus(VmeBus::with_owner_space("vme", "maincpu").into_shared());
    bus.borrow_mut().start(&host).unwrap();

    let (r, w) = noop_u16();
    bus.borrow()
        .install_device16(AddressModifier::A16_SC, 0x2000, 0x2001, r, w, 0xFFFF_0000)
        .unwrap();

    // The registration lands in the processor's own program space.
    let installed: Vec<_> = cpu.borrow().mappings().collect();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].mask, 0x0000);
    assert_eq!(bus.borrow().resolved().unwrap().owner(), Some("maincpu"));
}

#[test]
fn block_transfer_modifier_fails_before_forwarding() {
    let host = TestHost::new();
    let bus = host.add_bus(VmeBus::with_own_space("vme").into_shared());
    bus.borrow_mut().start(&host).unwrap();

    let err = bus
        .borrow()
        .install_device8(
            AddressModifier::A32_BLT,
            0x0,
            0xFF,
            Box::new(|_, _| 0),
            Box::new(|_, _, _| {}),
            0xFF,
        )
        .unwrap_err();
    assert_eq!(
        err,
        VmeError::UnsupportedAddressModifier {
            amod: AddressModifier::A32_BLT,
            data_bits: 8,
        }
    );
    assert!(mappings(&bus.borrow()).is_empty());
}

#[test]
fn modifier_gate_runs_before_start_check() {
    let bus = VmeBus::with_own_space("vme");
    let (r, w) = noop_u16();
    let err = bus
        .install_device(AddressModifier::A24_BLT, 0, 1, r, w, 0xFFFF)
        .unwrap_err();
    assert!(matches!(err, VmeError::UnsupportedAddressModifier { .. }));
}

#[test]
fn install_before_start_is_rejected() {
    let bus = VmeBus::with_own_space("vme");
    let (r, w) = noop_u16();
    let err = bus
        .install_device(AddressModifier::A24_SC, 0, 1, r, w, 0xFFFF)
        .unwrap_err();
    assert_eq!(err, VmeError::NotStarted { bus: "vme".into() });
}

#[test]
fn missing_owner_cpu_is_fatal() {
    let host = TestHost::new();
    let bus = host.add_bus(VmeBus::with_owner_space("vme", "nocpu").into_shared());
    let err = bus.borrow_mut().start(&host).unwrap_err();
    assert_eq!(
        err,
        VmeError::OwnerNotFound {
            bus: "vme".into(),
            cpu_tag: "nocpu".into(),
        }
    );
    assert!(!bus.borrow().is_started());
}

#[test]
fn second_start_is_rejected_and_keeps_first_resolution() {
    let host = TestHost::new();
    let bus = host.add_bus(VmeBus::with_own_space("vme").into_shared());
    bus.borrow_mut().start(&host).unwrap();
    let first = bus.borrow().space().unwrap().clone();

    let err = bus.borrow_mut().start(&host).unwrap_err();
    assert_eq!(err, VmeError::AlreadyStarted { bus: "vme".into() });
    assert!(Rc::ptr_eq(&first, bus.borrow().space().unwrap()));
}

#[test]
fn resolution_is_not_affected_by_later_owner_changes() {
    let host = TestHost::new();
    let original = host.add_cpu("maincpu", 16, 24);
    let bus = host.add_bus(VmeBus::with_owner_space("vme", "maincpu").into_shared());
    bus.borrow_mut().start(&host).unwrap();

    // Re-point the tag at a 32-bit processor after start.
    let replacement = host.add_cpu("maincpu", 32, 32);

    for _ in 0..3 {
        let (r, w) = noop_u16();
        bus.borrow()
            .install_device16(AddressModifier::A24_SC, 0x10, 0x11, r, w, 0xFFFF_FFFF)
            .unwrap();
    }

    assert_eq!(bus.borrow().data_width(), Some(16));
    let masks: Vec<u32> = original.borrow().mappings().map(|m| m.mask).collect();
    assert_eq!(masks, vec![0xFFFF; 3]);
    assert_eq!(replacement.borrow().mappings().count(), 0);
}

#[test]
fn unsupported_resolved_width_is_rejected_at_install() {
    let host = TestHost::new();
    let bus = host.add_bus(
        VmeBus::new("vme", SpaceSource::Own(SpaceConfig::new("odd", 8, 16))).into_shared(),
    );
    bus.borrow_mut().start(&host).unwrap();

    let (r, w) = noop_u16();
    let err = bus
        .borrow()
        .install_device(AddressModifier::A16_SC, 0, 1, r, w, 0xFF)
        .unwrap_err();
    assert_eq!(
        err,
        VmeError::UnsupportedBusWidth {
            width: 8,
            data_bits: 16,
        }
    );
}

#[test]
fn address_space_rejections_surface_as_space_errors() {
    let host = TestHost::new();
    let _cpu = host.add_cpu("maincpu", 16, 16);
    let bus = host.add_bus(VmeBus::with_owner_space("vme", "maincpu").into_shared());
    bus.borrow_mut().start(&host).unwrap();

    let (r, w) = noop_u16();
    let err = bus
        .borrow()
        .install_device(AddressModifier::A24_SC, 0x00F0_0000, 0x00F0_00FF, r, w, 0xFFFF)
        .unwrap_err();
    assert!(matches!(err, VmeError::Space(_)));
}

#[test]
fn space_source_config_round_trips_through_json() {
    let own: SpaceSource = serde_json::from_str(r#"{ "own": { "name": "VME A24", "data_width": 16, "addr_width": 24 } }"#).unwrap();
    assert_eq!(own, SpaceSource::Own(SpaceConfig::new("VME A24", 16, 24)));

    let owner: SpaceSource = serde_json::from_str(r#"{ "owner": {} }"#).unwrap();
    assert_eq!(owner, SpaceSource::owner("maincpu"));
}
