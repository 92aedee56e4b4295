use crate::config::FramConfig;
use crate::errors::FramError;
use crate::part::{BASE_ADDRESS, MAX_CHUNK_SIZE, PartNumber, TRANSPORT_CHUNK_SIZE};
use crate::transport::{BlockTransport, SharedBus, shared};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, MutexGuard};

/// Bounds-checked, chunked access to one FRAM chip plus a grow-only
/// allocator over its address space.
///
/// Address map:
///
/// ```text
/// BASE_ADDRESS            bottom_address                      top_address
/// |-- control block ------|-- allocatable (bump, grow-only) --|
///     MAX_CHUNK_SIZE bytes    next_free_byte only moves right
/// ```
///
/// The allocation cursor lives only in memory. After a restart the same
/// allocation sequence must be replayed in the same order to land on the
/// same regions.
pub struct FramDevice<T: BlockTransport> {
    bus: SharedBus<T>,
    part_number: PartNumber,
    bus_address: u8,
    bottom_address: u32,
    top_address: u32,
    next_free_byte: AtomicU32,
}

impl<T: BlockTransport> FramDevice<T> {
    /// Take sole ownership of `transport` with the default bus address.
    pub fn new(transport: T, part_number: PartNumber) -> Self {
        Self::from_config(shared(transport), &FramConfig::new(part_number))
    }

    /// Attach to a bus that may also be used by others.
    pub fn from_config(bus: SharedBus<T>, config: &FramConfig) -> Self {
        let bottom_address = BASE_ADDRESS + MAX_CHUNK_SIZE as u32;
        Self {
            bus,
            part_number: config.part_number,
            bus_address: config.bus_address,
            bottom_address,
            top_address: config.part_number.top_address(),
            next_free_byte: AtomicU32::new(bottom_address),
        }
    }

    /// Probe the chip once before first use.
    pub fn begin(&self) -> Result<(), FramError> {
        let mut bus = self.lock_bus()?;
        bus.probe(self.bus_address).map_err(|source| {
            tracing::warn!(
                "FRAM at bus address {:#04x} did not respond: {}",
                self.bus_address,
                source
            );
            FramError::BadResponse {
                bus_address: self.bus_address,
                source,
            }
        })
    }

    pub fn part_number(&self) -> PartNumber {
        self.part_number
    }

    pub fn bus_address(&self) -> u8 {
        self.bus_address
    }

    pub fn max_chunk_size(&self) -> usize {
        MAX_CHUNK_SIZE
    }

    pub fn base_address(&self) -> u32 {
        BASE_ADDRESS
    }

    /// First allocatable byte, directly after the control block.
    pub fn bottom_address(&self) -> u32 {
        self.bottom_address
    }

    pub fn top_address(&self) -> u32 {
        self.top_address
    }

    pub fn next_free_byte(&self) -> u32 {
        self.next_free_byte.load(Ordering::Acquire)
    }

    pub fn control_block_size(&self) -> usize {
        MAX_CHUNK_SIZE
    }

    /// Number of whole `MAX_CHUNK_SIZE` buffers above the control block.
    pub fn buffer_count(&self) -> u32 {
        (self.top_address - self.bottom_address + 1) / MAX_CHUNK_SIZE as u32
    }

    /// Another handle on the bus this device talks through.
    pub fn bus(&self) -> SharedBus<T> {
        Arc::clone(&self.bus)
    }

    pub fn read(&self, start: u32, len: usize) -> Result<Vec<u8>, FramError> {
        self.check_range(start, len)?;
        let mut buf = vec![0u8; len];
        self.read_into(start, &mut buf)?;
        Ok(buf)
    }

    /// Fill `buf` from the chip starting at `start`.
    ///
    /// The transfer is split into transport calls of at most
    /// [`TRANSPORT_CHUNK_SIZE`] bytes, issued in increasing address order
    /// while the bus is held. No atomicity across chunks.
    pub fn read_into(&self, start: u32, buf: &mut [u8]) -> Result<(), FramError> {
        let first = self.check_range(start, buf.len())?;
        let mut bus = self.lock_bus()?;

        for (i, chunk) in buf.chunks_mut(TRANSPORT_CHUNK_SIZE).enumerate() {
            let address = first + (i * TRANSPORT_CHUNK_SIZE) as u16;
            tracing::trace!("read chunk {:#06x} ({} bytes)", address, chunk.len());
            bus.read_chunk(address, chunk)?;
        }
        Ok(())
    }

    /// Store `data` on the chip starting at `start`, chunked like `read_into`.
    pub fn write(&self, start: u32, data: &[u8]) -> Result<(), FramError> {
        let first = self.check_range(start, data.len())?;
        let mut bus = self.lock_bus()?;

        for (i, chunk) in data.chunks(TRANSPORT_CHUNK_SIZE).enumerate() {
            let address = first + (i * TRANSPORT_CHUNK_SIZE) as u16;
            tracing::trace!("write chunk {:#06x} ({} bytes)", address, chunk.len());
            bus.write_chunk(address, chunk)?;
        }
        Ok(())
    }

    /// Hand out `number_of_bytes` from the bump allocator.
    ///
    /// Returns the start of the new region. Fails without moving the cursor
    /// if the region would reach the top address. Nothing is ever freed.
    pub fn allocate_memory(&self, number_of_bytes: u32) -> Result<u32, FramError> {
        let top = self.top_address;
        let result = self
            .next_free_byte
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                next.checked_add(number_of_bytes).filter(|&end| end < top)
            });

        match result {
            Ok(start) => {
                tracing::debug!("Allocated {} bytes at {:#06x}", number_of_bytes, start);
                Ok(start)
            }
            Err(next) => Err(FramError::OutOfMemory {
                requested: number_of_bytes,
                available: top.saturating_sub(next).saturating_sub(1),
            }),
        }
    }

    /// Zero everything above the control block.
    ///
    /// Stops at the first failed write and returns its error; the control
    /// block is never touched.
    pub fn format(&self) -> Result<(), FramError> {
        let zeros = [0u8; MAX_CHUNK_SIZE];
        let mut address = self.bottom_address;

        while address < self.top_address {
            if let Err(e) = self.write(address, &zeros) {
                tracing::warn!("Format aborted at {:#06x}: {}", address, e);
                return Err(e);
            }
            address += MAX_CHUNK_SIZE as u32;
        }

        tracing::info!(
            "Formatted {:?} ({:#06x}..={:#06x})",
            self.part_number,
            self.bottom_address,
            self.top_address
        );
        Ok(())
    }

    /// The control block's layout belongs entirely to the caller.
    pub fn read_control_block(&self) -> Result<[u8; MAX_CHUNK_SIZE], FramError> {
        let mut block = [0u8; MAX_CHUNK_SIZE];
        self.read_into(BASE_ADDRESS, &mut block)?;
        Ok(block)
    }

    pub fn write_control_block(&self, block: &[u8; MAX_CHUNK_SIZE]) -> Result<(), FramError> {
        self.write(BASE_ADDRESS, block)
    }

    /// Validate a logical transfer and return its first bus address.
    fn check_range(&self, start: u32, len: usize) -> Result<u16, FramError> {
        if !(BASE_ADDRESS..=self.top_address).contains(&start) {
            return Err(FramError::BadStartAddress {
                address: start,
                base: BASE_ADDRESS,
                top: self.top_address,
            });
        }
        if len == 0 || len > MAX_CHUNK_SIZE {
            return Err(FramError::BadNumberOfBytes {
                len,
                max: MAX_CHUNK_SIZE,
            });
        }
        let finish = start + len as u32 - 1;
        if finish > self.top_address {
            return Err(FramError::BadFinishAddress {
                finish,
                top: self.top_address,
            });
        }
        // Every part's top address fits in 16 bits.
        Ok(start as u16)
    }

    fn lock_bus(&self) -> Result<MutexGuard<'_, T>, FramError> {
        self.bus.lock().map_err(|_| FramError::BusPoisoned)
    }
}
