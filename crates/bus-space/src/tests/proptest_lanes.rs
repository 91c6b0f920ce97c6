use crate::{AddressSpace, SpaceConfig};
use proptest::prelude::*;

proptest! {
    #[test]
    fn read_data_never_escapes_installed_lanes(mask in any::<u32>(), value in any::<u32>(), addr in 0u32..0x40) {
        let mut space = AddressSpace::new(SpaceConfig::vme_a32());
        space
            .install_readwrite_handler::<u32>(
                0x10,
                0x2F,
                Box::new(move |_, _| value),
                Box::new(|_, _, _| {}),
                mask,
            )
            .unwrap();

        let data = space.read_u32(addr);
        if (0x10..=0x2F).contains(&addr) {
            prop_assert_eq!(data, value & mask);
        } else {
            prop_assert_eq!(data, 0);
        }
    }
}
