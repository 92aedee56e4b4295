/// Persisted ring buffer pointers.
///
/// Layout on the chip (little-endian, bit-exact across restarts):
///
/// ```text
/// offset 0: u32 checksum = metadata_address + tail + head
/// offset 4: u32 tail
/// offset 8: u32 head
/// ```
///
/// The trailer sits directly after the ring's last slot. A checksum that
/// does not match means the region was never initialized (or was
/// clobbered), and the ring starts over empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingPointers {
    pub checksum: u32,
    pub tail: u32,
    pub head: u32,
}

impl RingPointers {
    pub const SIZE: usize = 12;

    /// Pointers with a checksum bound to `metadata_address`.
    pub fn sealed(metadata_address: u32, tail: u32, head: u32) -> Self {
        Self {
            checksum: Self::checksum_for(metadata_address, tail, head),
            tail,
            head,
        }
    }

    pub fn checksum_for(metadata_address: u32, tail: u32, head: u32) -> u32 {
        metadata_address.wrapping_add(tail).wrapping_add(head)
    }

    pub fn is_consistent(&self, metadata_address: u32) -> bool {
        self.checksum == Self::checksum_for(metadata_address, self.tail, self.head)
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.checksum.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.tail.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.head.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        let word = |at: usize| {
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        Self {
            checksum: word(0),
            tail: word(4),
            head: word(8),
        }
    }
}
