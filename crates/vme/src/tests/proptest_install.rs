use bus_space::SpaceConfig;
use proptest::prelude::*;

use super::TestHost;
use crate::{truncate_mask, AddressModifier, SpaceSource, VmeBus, VmeError};

fn started_bus(width: u8) -> VmeBus {
    let host = TestHost::new();
    let mut bus = VmeBus::new("vme", SpaceSource::Own(SpaceConfig::new("vme", width, 32)));
    bus.start(&host).unwrap();
    bus
}

proptest! {
    #[test]
    fn forwarded_mask_is_truncated_to_bus_width(
        mask in any::<u32>(),
        width in prop::sample::select(vec![16u8, 24, 32]),
        amod in prop::sample::select(vec![
            AddressModifier::A16_SC,
            AddressModifier::A24_SC,
            AddressModifier::A32_SC,
        ]),
    ) {
        let bus = started_bus(width);
        bus.install_device8(amod, 0x100, 0x1FF, Box::new(|_, _| 0), Box::new(|_, _, _| {}), mask)
            .unwrap();

        let expected = (u64::from(mask) & ((1u64 << width) - 1)) as u32;
        let installed: Vec<u32> = bus.space().unwrap().borrow().mappings().map(|m| m.mask).collect();
        prop_assert_eq!(installed, vec![expected]);
        prop_assert_eq!(truncate_mask(width, mask, 8), Ok(expected));
    }

    #[test]
    fn unsupported_modifiers_always_fail(
        code in 0u8..=0x3F,
        mask in any::<u32>(),
        start in any::<u32>(),
        len in 0u32..0x1000,
        width in prop::sample::select(vec![16u8, 24, 32]),
    ) {
        let amod = AddressModifier::new(code);
        prop_assume!(!matches!(code, 0x09 | 0x29 | 0x39));

        let bus = started_bus(width);
        let end = start.saturating_add(len);
        let err = bus
            .install_device16(amod, start, end, Box::new(|_, _| 0), Box::new(|_, _, _| {}), mask)
            .unwrap_err();
        let is_modifier_error = matches!(err, VmeError::UnsupportedAddressModifier { .. });
        prop_assert!(is_modifier_error);
        prop_assert_eq!(bus.space().unwrap().borrow().mappings().count(), 0);
    }
}
