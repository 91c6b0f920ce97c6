use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// A VME address modifier code (AM5..AM0).
///
/// The code selects the address width and cycle type of a transfer. Any 6-bit value can be
/// represented; the named constants cover the codes defined by the standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "AmodRepr", into = "u8")]
pub struct AddressModifier(u8);

impl AddressModifier {
    pub const A32_MBLT: Self = Self(0x08);
    /// A32 non-privileged data access (single cycle).
    pub const A32_SC: Self = Self(0x09);
    pub const A32_PRG: Self = Self(0x0A);
    pub const A32_BLT: Self = Self(0x0B);
    pub const A32_SUP_MBLT: Self = Self(0x0C);
    pub const A32_SUP_SC: Self = Self(0x0D);
    pub const A32_SUP_PRG: Self = Self(0x0E);
    pub const A32_SUP_BLT: Self = Self(0x0F);
    /// A16 non-privileged access (single cycle).
    pub const A16_SC: Self = Self(0x29);
    pub const A16_SUP: Self = Self(0x2D);
    pub const A24_MBLT: Self = Self(0x38);
    /// A24 non-privileged data access (single cycle).
    pub const A24_SC: Self = Self(0x39);
    pub const A24_PRG: Self = Self(0x3A);
    pub const A24_BLT: Self = Self(0x3B);
    pub const A24_SUP_MBLT: Self = Self(0x3C);
    pub const A24_SUP_SC: Self = Self(0x3D);
    pub const A24_SUP_PRG: Self = Self(0x3E);
    pub const A24_SUP_BLT: Self = Self(0x3F);

    const NAMED: [(&'static str, Self); 18] = [
        ("A32_MBLT", Self::A32_MBLT),
        ("A32_SC", Self::A32_SC),
        ("A32_PRG", Self::A32_PRG),
        ("A32_BLT", Self::A32_BLT),
        ("A32_SUP_MBLT", Self::A32_SUP_MBLT),
        ("A32_SUP_SC", Self::A32_SUP_SC),
        ("A32_SUP_PRG", Self::A32_SUP_PRG),
        ("A32_SUP_BLT", Self::A32_SUP_BLT),
        ("A16_SC", Self::A16_SC),
        ("A16_SUP", Self::A16_SUP),
        ("A24_MBLT", Self::A24_MBLT),
        ("A24_SC", Self::A24_SC),
        ("A24_PRG", Self::A24_PRG),
        ("A24_BLT", Self::A24_BLT),
        ("A24_SUP_MBLT", Self::A24_SUP_MBLT),
        ("A24_SUP_SC", Self::A24_SUP_SC),
        ("A24_SUP_PRG", Self::A24_SUP_PRG),
        ("A24_SUP_BLT", Self::A24_SUP_BLT),
    ];

    /// Wraps a raw code. Only the low six bits are driven on the backplane.
    pub const fn new(code: u8) -> Self {
        Self(code & 0x3F)
    }

    pub const fn code(self) -> u8 {
        self.0
    }

    /// Address lines qualified by this modifier, if the code is a standard one.
    pub fn address_bits(self) -> Option<u8> {
        match self.0 {
            0x08..=0x0F => Some(32),
            0x29 | 0x2D => Some(16),
            0x38..=0x3F => Some(24),
            _ => None,
        }
    }

    /// Codes 0x10..=0x1F are reserved for user-defined cycles.
    pub fn is_user_defined(self) -> bool {
        (0x10..=0x1F).contains(&self.0)
    }

    /// Whether the bus routes this modifier (non-privileged single-access cycles only).
    pub fn is_supported(self) -> bool {
        matches!(self, Self::A16_SC | Self::A24_SC | Self::A32_SC)
    }

    pub fn name(self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(_, amod)| *amod == self)
            .map(|(name, _)| *name)
    }
}

impl fmt::Display for AddressModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "AM{:02x} ({name})", self.0),
            None if self.is_user_defined() => write!(f, "AM{:02x} (user defined)", self.0),
            None => write!(f, "AM{:02x}", self.0),
        }
    }
}

impl From<AddressModifier> for u8 {
    fn from(amod: AddressModifier) -> Self {
        amod.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address modifier {0:?} (expected a name such as \"A24_SC\" or a code 0x00..=0x3F)")]
pub struct ParseAddressModifierError(String);

impl FromStr for AddressModifier {
    type Err = ParseAddressModifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some((_, amod)) = Self::NAMED
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
        {
            return Ok(*amod);
        }
        let code = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => u8::from_str_radix(hex, 16),
            None => trimmed.parse::<u8>(),
        }
        .map_err(|_| ParseAddressModifierError(s.to_owned()))?;
        Self::try_from(code).map_err(|_| ParseAddressModifierError(s.to_owned()))
    }
}

impl TryFrom<u8> for AddressModifier {
    type Error = ParseAddressModifierError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        if code > 0x3F {
            return Err(ParseAddressModifierError(format!("{code:#04x}")));
        }
        Ok(Self(code))
    }
}

/// Config files may spell modifiers by name or by numeric code.
#[derive(Deserialize)]
#[serde(untagged)]
enum AmodRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<AmodRepr> for AddressModifier {
    type Error = ParseAddressModifierError;

    fn try_from(repr: AmodRepr) -> Result<Self, Self::Error> {
        match repr {
            AmodRepr::Code(code) => Self::try_from(code),
            AmodRepr::Name(name) => name.parse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_single_cycle_non_privileged_codes_are_supported() {
        let supported: Vec<u8> = (0u8..=0x3F)
            .map(AddressModifier::new)
            .filter(|amod| amod.is_supported())
            .map(AddressModifier::code)
            .collect();
        assert_eq!(supported, vec![0x09, 0x29, 0x39]);
    }

    #[test]
    fn address_bits_follow_code_groups() {
        assert_eq!(AddressModifier::A16_SC.address_bits(), Some(16));
        assert_eq!(AddressModifier::A24_SUP_BLT.address_bits(), Some(24));
        assert_eq!(AddressModifier::A32_MBLT.address_bits(), Some(32));
        assert_eq!(AddressModifier::new(0x15).address_bits(), None);
        assert!(AddressModifier::new(0x15).is_user_defined());
    }

    #[test]
    fn parses_names_and_codes() {
        assert_eq!("a24_sc".parse::<AddressModifier>().unwrap(), AddressModifier::A24_SC);
        assert_eq!("0x0b".parse::<AddressModifier>().unwrap(), AddressModifier::A32_BLT);
        assert_eq!("41".parse::<AddressModifier>().unwrap(), AddressModifier::A16_SC);
        assert!("0x40".parse::<AddressModifier>().is_err());
        assert!("A64_SC".parse::<AddressModifier>().is_err());
    }

    #[test]
    fn display_includes_name_when_known() {
        assert_eq!(AddressModifier::A32_SC.to_string(), "AM09 (A32_SC)");
        assert_eq!(AddressModifier::new(0x12).to_string(), "AM12 (user defined)");
        assert_eq!(AddressModifier::new(0x20).to_string(), "AM20");
    }

    #[test]
    fn serde_accepts_name_or_code() {
        let by_name: AddressModifier = serde_json::from_str(r#""A16_SC""#).unwrap();
        let by_code: AddressModifier = serde_json::from_str("57").unwrap();
        assert_eq!(by_name, AddressModifier::A16_SC);
        assert_eq!(by_code, AddressModifier::A24_SC);
        assert_eq!(serde_json::to_string(&AddressModifier::A32_SC).unwrap(), "9");
        assert!(serde_json::from_str::<AddressModifier>("200").is_err());
    }
}
