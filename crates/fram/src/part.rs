//! Chip variants and the fixed address map derived from them.
//!
//! All FRAM parts share the same layout: a control block of
//! [`MAX_CHUNK_SIZE`] bytes at address 0, followed by the allocatable
//! region up to the part's top address.

use serde::Deserialize;

/// Largest logical transfer accepted by the storage device, and the size of
/// the reserved control block.
pub const MAX_CHUNK_SIZE: usize = 128;

/// Bytes moved per transport call. Kept below the bus limit to leave headroom.
pub const TRANSPORT_CHUNK_SIZE: usize = 30;

/// Hard per-transaction limit of the serial bus buffer.
pub const TRANSPORT_PROTOCOL_LIMIT: usize = 32;

/// Bus address the MB85RC family answers on with all address pins low.
pub const DEFAULT_BUS_ADDRESS: u8 = 0x50;

/// First byte of the device address space.
pub const BASE_ADDRESS: u32 = 0x0000;

/// Supported MB85RC parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartNumber {
    /// 8KB
    Mb85rc64,
    /// 16KB, older model
    #[default]
    Mb85rc128a,
    /// 16KB, newer model
    Mb85rc128b,
    /// 32KB, older model
    Mb85rc256a,
    /// 32KB, newer model
    Mb85rc256b,
    /// 32KB
    Mb85rc256v,
    /// 64KB
    Mb85rc512t,
}

impl PartNumber {
    pub const ALL: [PartNumber; 7] = [
        PartNumber::Mb85rc64,
        PartNumber::Mb85rc128a,
        PartNumber::Mb85rc128b,
        PartNumber::Mb85rc256a,
        PartNumber::Mb85rc256b,
        PartNumber::Mb85rc256v,
        PartNumber::Mb85rc512t,
    ];

    /// Highest valid byte address of the part.
    pub const fn top_address(self) -> u32 {
        match self {
            PartNumber::Mb85rc64 => 0x1FFF,
            PartNumber::Mb85rc128a | PartNumber::Mb85rc128b => 0x3FFF,
            PartNumber::Mb85rc256a | PartNumber::Mb85rc256b | PartNumber::Mb85rc256v => 0x7FFF,
            PartNumber::Mb85rc512t => 0xFFFF,
        }
    }

    pub const fn capacity_bytes(self) -> usize {
        (self.top_address() - BASE_ADDRESS) as usize + 1
    }
}
