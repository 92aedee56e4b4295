//! Block transport: the bus-level collaborator below the storage device.
//!
//! A transport moves at most [`TRANSPORT_PROTOCOL_LIMIT`] bytes per call
//! between a 16-bit device address and a caller buffer. It knows nothing
//! about allocation or layout; [`crate::FramDevice`] does all chunking and
//! bounds checking before a call reaches it.

use crate::part::{DEFAULT_BUS_ADDRESS, PartNumber, TRANSPORT_PROTOCOL_LIMIT};
use std::io;
use std::ops::Range;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Device did not acknowledge")]
    Nack,

    #[error("Chunk of {len} bytes exceeds bus limit of {max}")]
    ChunkTooLarge { len: usize, max: usize },

    #[error("Transfer of {len} bytes at {address:#06x} runs past the end of the chip")]
    OutOfRange { address: u16, len: usize },
}

/// A transport shared between every user of the same physical bus.
///
/// The storage device holds the lock for a whole logical transfer, so other
/// holders of the same bus can never interleave with a multi-chunk read or
/// write.
pub type SharedBus<T> = Arc<Mutex<T>>;

pub fn shared<T: BlockTransport>(transport: T) -> SharedBus<T> {
    Arc::new(Mutex::new(transport))
}

pub trait BlockTransport {
    /// One-time liveness check against the chip's bus address.
    fn probe(&mut self, bus_address: u8) -> Result<(), TransportError>;

    /// Fill `buf` with the bytes starting at `address`.
    fn read_chunk(&mut self, address: u16, buf: &mut [u8]) -> Result<(), TransportError>;

    /// Store `data` starting at `address`.
    fn write_chunk(&mut self, address: u16, data: &[u8]) -> Result<(), TransportError>;
}

/// Validate one bus transaction against a chip image of `capacity` bytes and
/// return the byte range it touches.
pub(crate) fn chunk_span(
    address: u16,
    len: usize,
    capacity: usize,
) -> Result<Range<usize>, TransportError> {
    if len > TRANSPORT_PROTOCOL_LIMIT {
        return Err(TransportError::ChunkTooLarge {
            len,
            max: TRANSPORT_PROTOCOL_LIMIT,
        });
    }
    let start = address as usize;
    let end = start + len;
    if end > capacity {
        return Err(TransportError::OutOfRange { address, len });
    }
    Ok(start..end)
}

/// RAM-backed chip image. Contents live as long as the value does, so
/// sharing one instance between successive devices models a power cycle of
/// the host while the chip keeps its data.
pub struct MemoryTransport {
    cells: Vec<u8>,
    bus_address: u8,
    transactions: u64,
}

impl MemoryTransport {
    pub fn new(part_number: PartNumber) -> Self {
        Self {
            cells: vec![0; part_number.capacity_bytes()],
            bus_address: DEFAULT_BUS_ADDRESS,
            transactions: 0,
        }
    }

    pub fn with_bus_address(mut self, bus_address: u8) -> Self {
        self.bus_address = bus_address;
        self
    }

    pub fn contents(&self) -> &[u8] {
        &self.cells
    }

    /// Direct access to the chip image, bypassing the bus. Used to simulate
    /// corruption or inspect persisted layouts.
    pub fn contents_mut(&mut self) -> &mut [u8] {
        &mut self.cells
    }

    /// Number of read/write transactions served so far.
    pub fn transactions(&self) -> u64 {
        self.transactions
    }
}

impl BlockTransport for MemoryTransport {
    fn probe(&mut self, bus_address: u8) -> Result<(), TransportError> {
        if bus_address == self.bus_address {
            Ok(())
        } else {
            Err(TransportError::Nack)
        }
    }

    fn read_chunk(&mut self, address: u16, buf: &mut [u8]) -> Result<(), TransportError> {
        let span = chunk_span(address, buf.len(), self.cells.len())?;
        buf.copy_from_slice(&self.cells[span]);
        self.transactions += 1;
        Ok(())
    }

    fn write_chunk(&mut self, address: u16, data: &[u8]) -> Result<(), TransportError> {
        let span = chunk_span(address, data.len(), self.cells.len())?;
        self.cells[span].copy_from_slice(data);
        self.transactions += 1;
        Ok(())
    }
}
