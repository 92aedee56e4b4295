use crate::part::{DEFAULT_BUS_ADDRESS, PartNumber};
use serde::Deserialize;

/// Static description of one FRAM chip on the bus.
///
/// Deserializable so hosts can keep it in whatever config file format they
/// already use; missing fields fall back to the MB85RC128A at 0x50.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FramConfig {
    pub part_number: PartNumber,
    pub bus_address: u8,
}

impl Default for FramConfig {
    fn default() -> Self {
        Self {
            part_number: PartNumber::default(),
            bus_address: DEFAULT_BUS_ADDRESS,
        }
    }
}

impl FramConfig {
    pub fn new(part_number: PartNumber) -> Self {
        Self {
            part_number,
            ..Self::default()
        }
    }
}
