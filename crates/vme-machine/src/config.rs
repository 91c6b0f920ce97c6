use std::path::Path;

use bus_space::SpaceConfig;
use serde::{Deserialize, Deserializer, Serialize};
use vme::{AddressModifier, SpaceSource};

use crate::MachineError;

/// Full machine description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub cpus: Vec<CpuConfig>,
    pub buses: Vec<BusConfig>,
    pub slots: Vec<SlotConfig>,
}

impl MachineConfig {
    pub fn from_json(json: &str) -> Result<Self, MachineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, MachineError> {
        let json = std::fs::read_to_string(path).map_err(|source| MachineError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, MachineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// A 68000 single-board host with the backplane wired into its program space, a 64 KiB
    /// D16 memory board at A24 `0x10_0000` and an empty generic card.
    pub fn sys68k_defaults() -> Self {
        Self {
            cpus: vec![CpuConfig::default()],
            buses: vec![BusConfig {
                tag: "vme".to_owned(),
                space: SpaceSource::owner(vme::DEFAULT_OWNER_TAG),
            }],
            slots: vec![
                SlotConfig {
                    tag: "slot1".to_owned(),
                    bus: "vme".to_owned(),
                    slot: 1,
                    card: Some(CardConfig {
                        amod: Some(AddressModifier::A24_SC),
                        base: 0x10_0000,
                        size: 0x1_0000,
                        data_width: Some(16),
                        ..CardConfig::new("ram")
                    }),
                },
                SlotConfig {
                    tag: "slot2".to_owned(),
                    bus: "vme".to_owned(),
                    slot: 2,
                    card: Some(CardConfig::new("generic")),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuConfig {
    pub tag: String,
    #[serde(default = "default_program_space")]
    pub program: SpaceConfig,
}

fn default_program_space() -> SpaceConfig {
    SpaceConfig::new("program", 16, 24)
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            tag: vme::DEFAULT_OWNER_TAG.to_owned(),
            program: default_program_space(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    pub tag: String,
    #[serde(default)]
    pub space: SpaceSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub tag: String,
    pub bus: String,
    /// Backplane position; 0 leaves the card unassigned.
    #[serde(default)]
    pub slot: u32,
    #[serde(default)]
    pub card: Option<CardConfig>,
}

/// Card type plus the options the built-in cards understand.
///
/// Addresses may be written as JSON numbers or as `"0x..."` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amod: Option<AddressModifier>,
    #[serde(default, deserialize_with = "de_u32")]
    pub base: u32,
    #[serde(default, deserialize_with = "de_u32")]
    pub size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_width: Option<u8>,
}

impl CardConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            amod: None,
            base: 0,
            size: 0,
            data_width: None,
        }
    }
}

fn de_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(u32),
        Str(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Int(value) => Ok(value),
        Repr::Str(s) => {
            let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
                None => s.replace('_', "").parse(),
            };
            parsed.map_err(|_| serde::de::Error::custom(format!("invalid address {s:?}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_addresses_and_named_modifiers() {
        let config = MachineConfig::from_json(
            r#"{
                "cpus": [{ "tag": "maincpu" }],
                "buses": [{ "tag": "vme", "space": { "owner": { "cpu": "maincpu" } } }],
                "slots": [
                    { "tag": "slot1", "bus": "vme", "slot": 1,
                      "card": { "type": "ram", "amod": "A24_SC", "base": "0x20_0000", "size": 4096, "data_width": 16 } },
                    { "tag": "slot2", "bus": "vme" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.cpus, vec![CpuConfig::default()]);
        assert_eq!(config.buses[0].space, SpaceSource::owner("maincpu"));
        let card = config.slots[0].card.as_ref().unwrap();
        assert_eq!(card.kind, "ram");
        assert_eq!(card.amod, Some(AddressModifier::A24_SC));
        assert_eq!(card.base, 0x20_0000);
        assert_eq!(card.size, 4096);
        assert_eq!(config.slots[1].slot, 0);
        assert!(config.slots[1].card.is_none());
    }

    #[test]
    fn bus_space_defaults_to_own_a32() {
        let config = MachineConfig::from_json(r#"{ "buses": [{ "tag": "vme" }] }"#).unwrap();
        assert_eq!(config.buses[0].space, SpaceSource::Own(SpaceConfig::vme_a32()));
    }

    #[test]
    fn rejects_malformed_addresses() {
        let err = MachineConfig::from_json(
            r#"{ "slots": [{ "tag": "s", "bus": "vme", "card": { "type": "ram", "base": "0xZZ" } }] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, MachineError::Config(_)));
    }

    #[test]
    fn defaults_survive_a_json_round_trip() {
        let config = MachineConfig::sys68k_defaults();
        let json = config.to_json_pretty().unwrap();
        assert_eq!(MachineConfig::from_json(&json).unwrap(), config);
    }
}
