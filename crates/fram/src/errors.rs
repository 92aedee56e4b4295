use crate::transport::TransportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FramError {
    #[error("Bad start address: {address:#06x} (valid range {base:#06x}..={top:#06x})")]
    BadStartAddress { address: u32, base: u32, top: u32 },

    #[error("Bad number of bytes: {len} (must be 1..={max})")]
    BadNumberOfBytes { len: usize, max: usize },

    #[error("Bad finish address: {finish:#06x} exceeds top address {top:#06x}")]
    BadFinishAddress { finish: u32, top: u32 },

    #[error("Out of FRAM memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: u32, available: u32 },

    #[error("Element size {size} must be smaller than the {max} byte chunk size")]
    ElementTooBig { size: usize, max: usize },

    #[error("Element size must be non-zero")]
    EmptyElement,

    #[error("Element payload of {len} bytes does not fit a {size} byte slot")]
    ElementTooLong { len: usize, size: usize },

    #[error("Bad array index: {index} (array has {count} elements)")]
    BadArrayIndex { index: u32, count: u32 },

    #[error("Bad ring indices: tail {tail}, head {head} (ring has {slots} slots)")]
    BadRingIndices { tail: u32, head: u32, slots: u32 },

    #[error("Ring buffer used before initialize()")]
    RingNotInitialized,

    #[error("FRAM not responding at bus address {bus_address:#04x}: {source}")]
    BadResponse {
        bus_address: u8,
        #[source]
        source: TransportError,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Bus lock poisoned")]
    BusPoisoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        let err = FramError::BadStartAddress {
            address: 0x4000,
            base: 0,
            top: 0x3FFF,
        };
        assert_eq!(
            err.to_string(),
            "Bad start address: 0x4000 (valid range 0x0000..=0x3fff)",
            "BadStartAddress should show the address and the valid range"
        );

        let err = FramError::BadNumberOfBytes { len: 0, max: 128 };
        assert_eq!(
            err.to_string(),
            "Bad number of bytes: 0 (must be 1..=128)",
            "BadNumberOfBytes should show the requested length"
        );

        let err = FramError::OutOfMemory {
            requested: 64,
            available: 10,
        };
        assert_eq!(
            err.to_string(),
            "Out of FRAM memory: requested 64 bytes, 10 available"
        );

        let err = FramError::BadResponse {
            bus_address: 0x50,
            source: TransportError::Nack,
        };
        assert_eq!(
            err.to_string(),
            "FRAM not responding at bus address 0x50: Device did not acknowledge"
        );
    }

    #[test]
    fn test_error_conversion_from_transport_error() {
        fn fails() -> Result<(), TransportError> {
            Err(TransportError::ChunkTooLarge { len: 40, max: 32 })
        }

        fn uses_question_mark() -> Result<(), FramError> {
            fails()?;
            Ok(())
        }

        match uses_question_mark() {
            Err(FramError::Transport(TransportError::ChunkTooLarge { len, max })) => {
                assert_eq!(len, 40);
                assert_eq!(max, 32);
            }
            other => panic!("Expected Transport variant, got {:?}", other),
        }
    }
}
