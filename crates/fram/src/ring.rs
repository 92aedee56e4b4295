//! Power-cycle-safe circular queue of fixed-size elements.
//!
//! Region layout (one bump allocation):
//!
//! ```text
//! start_address                                  metadata_address   end_address
//! |-- slot 0 --|-- slot 1 --| ... |-- slot N --|-- RingPointers --|
//!     element_size bytes each, N+1 slots            12 bytes
//! ```
//!
//! One slot always stays empty so `tail == head` means "empty" and
//! `head + 1 == tail` (mod N+1) means "full". Every mutation rewrites the
//! trailer, so after a reset [`FramRing::initialize`] picks up the pointers
//! of the last completed operation. Element bytes themselves may be torn by
//! a power cut; only the trailer is guaranteed to be either consistent or
//! recognisably invalid.

use crate::array::{check_element_size, slot_image};
use crate::device::FramDevice;
use crate::errors::FramError;
use crate::header::RingPointers;
use crate::part::MAX_CHUNK_SIZE;
use crate::transport::BlockTransport;

/// Which path [`FramRing::initialize`] took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingRecovery {
    /// The trailer was valid and its pointers were adopted.
    Recovered,
    /// No valid trailer was found; the ring starts empty.
    Reset,
}

pub struct FramRing<'a, T: BlockTransport> {
    device: &'a FramDevice<T>,
    element_count: u32,
    element_size: usize,
    start_address: u32,
    end_address: u32,
    metadata_address: u32,
    tail: u32,
    head: u32,
    initialized: bool,
}

impl<'a, T: BlockTransport> FramRing<'a, T> {
    /// Allocate a ring holding up to `element_count` elements.
    ///
    /// The region must be allocated in the same order on every start so the
    /// ring lands on the same addresses and finds its trailer again.
    pub fn new(
        device: &'a FramDevice<T>,
        element_count: u32,
        element_size: usize,
    ) -> Result<Self, FramError> {
        check_element_size(element_size)?;
        let region_bytes = element_count
            .saturating_add(1)
            .saturating_mul(element_size as u32)
            .saturating_add(RingPointers::SIZE as u32);
        let start_address = device.allocate_memory(region_bytes)?;
        let end_address = start_address + region_bytes;

        Ok(Self {
            device,
            element_count,
            element_size,
            start_address,
            end_address,
            metadata_address: end_address - RingPointers::SIZE as u32,
            tail: 0,
            head: 0,
            initialized: false,
        })
    }

    /// Load and validate the persisted pointers, then write them back.
    ///
    /// Must be called once, after the bus is up, before any other
    /// operation. A missing or inconsistent trailer is not an error: the
    /// ring is treated as brand new and starts empty.
    pub fn initialize(&mut self) -> Result<RingRecovery, FramError> {
        let mut raw = [0u8; RingPointers::SIZE];
        self.device.read_into(self.metadata_address, &mut raw)?;
        let stored = RingPointers::from_bytes(&raw);

        let slots = self.slot_count();
        let recovery = if !stored.is_consistent(self.metadata_address) {
            tracing::warn!(
                "No valid ring pointers at {:#06x}, starting empty",
                self.metadata_address
            );
            RingRecovery::Reset
        } else if stored.tail >= slots || stored.head >= slots {
            tracing::warn!(
                "Ring pointers at {:#06x} out of range (tail {}, head {}, {} slots), resetting",
                self.metadata_address,
                stored.tail,
                stored.head,
                slots
            );
            RingRecovery::Reset
        } else {
            RingRecovery::Recovered
        };

        let (tail, head) = match recovery {
            RingRecovery::Recovered => (stored.tail, stored.head),
            RingRecovery::Reset => (0, 0),
        };
        self.commit(tail, head)?;
        self.initialized = true;

        if recovery == RingRecovery::Recovered {
            tracing::info!(
                "Recovered ring at {:#06x}: tail {}, head {} ({} queued)",
                self.start_address,
                self.tail,
                self.head,
                self.len()
            );
        }
        Ok(recovery)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_empty(&self) -> bool {
        self.tail == self.head
    }

    pub fn is_full(&self) -> bool {
        self.advance(self.head) == self.tail
    }

    /// Number of queued elements.
    pub fn len(&self) -> u32 {
        (self.head + self.slot_count() - self.tail) % self.slot_count()
    }

    /// Logical capacity; one more slot is reserved on the chip.
    pub fn capacity(&self) -> u32 {
        self.element_count
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    pub fn start_address(&self) -> u32 {
        self.start_address
    }

    /// One past the last byte of the region, trailer included.
    pub fn end_address(&self) -> u32 {
        self.end_address
    }

    pub fn metadata_address(&self) -> u32 {
        self.metadata_address
    }

    /// Append an element, overwriting the oldest one when full.
    pub fn push(&mut self, element: &[u8]) -> Result<(), FramError> {
        self.ensure_initialized()?;
        let slot = slot_image(element, self.element_size)?;
        let was_full = self.is_full();

        self.device.write(self.slot_address(self.head), &slot[..self.element_size])?;

        let tail = if was_full {
            tracing::trace!("Ring at {:#06x} full, dropping oldest", self.start_address);
            self.advance(self.tail)
        } else {
            self.tail
        };
        self.commit(tail, self.advance(self.head))
    }

    pub fn push_element(&mut self, element: &[u8]) -> Result<(), FramError> {
        self.push(element)
    }

    /// Remove and return the oldest element.
    pub fn pop(&mut self) -> Result<Option<Vec<u8>>, FramError> {
        self.pop_front()
    }

    pub fn pop_front(&mut self) -> Result<Option<Vec<u8>>, FramError> {
        self.ensure_initialized()?;
        if self.is_empty() {
            return Ok(None);
        }
        let element = self.read_slot(self.tail)?;
        self.commit(self.advance(self.tail), self.head)?;
        Ok(Some(element))
    }

    /// Remove and return the newest element.
    pub fn pop_back(&mut self) -> Result<Option<Vec<u8>>, FramError> {
        self.ensure_initialized()?;
        if self.is_empty() {
            return Ok(None);
        }
        let last = self.retreat(self.head);
        let element = self.read_slot(last)?;
        self.commit(self.tail, last)?;
        Ok(Some(element))
    }

    pub fn peek_front(&self) -> Result<Option<Vec<u8>>, FramError> {
        self.ensure_initialized()?;
        if self.is_empty() {
            return Ok(None);
        }
        self.read_slot(self.tail).map(Some)
    }

    pub fn peek_back(&self) -> Result<Option<Vec<u8>>, FramError> {
        self.ensure_initialized()?;
        if self.is_empty() {
            return Ok(None);
        }
        self.read_slot(self.retreat(self.head)).map(Some)
    }

    /// Zero every physical slot (the spare one included) and empty the ring.
    pub fn clear(&mut self) -> Result<(), FramError> {
        self.ensure_initialized()?;
        let zeros = [0u8; MAX_CHUNK_SIZE];
        for slot in 0..self.slot_count() {
            self.device.write(self.slot_address(slot), &zeros[..self.element_size])?;
        }
        self.commit(0, 0)
    }

    /// Raw `(tail, head)` slot indices.
    pub fn indices(&self) -> (u32, u32) {
        (self.tail, self.head)
    }

    /// Overwrite the raw slot indices and persist them.
    ///
    /// Bypasses push/pop bookkeeping entirely; meant for recovery tooling
    /// that knows which slots hold live data.
    pub fn set_indices(&mut self, tail: u32, head: u32) -> Result<(), FramError> {
        self.ensure_initialized()?;
        let slots = self.slot_count();
        if tail >= slots || head >= slots {
            return Err(FramError::BadRingIndices { tail, head, slots });
        }
        self.commit(tail, head)
    }

    fn slot_count(&self) -> u32 {
        self.element_count + 1
    }

    fn advance(&self, index: u32) -> u32 {
        (index + 1) % self.slot_count()
    }

    fn retreat(&self, index: u32) -> u32 {
        (index + self.slot_count() - 1) % self.slot_count()
    }

    fn slot_address(&self, index: u32) -> u32 {
        self.start_address + index * self.element_size as u32
    }

    fn read_slot(&self, index: u32) -> Result<Vec<u8>, FramError> {
        self.device.read(self.slot_address(index), self.element_size)
    }

    /// Persist `(tail, head)`, then adopt them. A failed write leaves the
    /// in-memory pointers matching what the chip last accepted.
    fn commit(&mut self, tail: u32, head: u32) -> Result<(), FramError> {
        let pointers = RingPointers::sealed(self.metadata_address, tail, head);
        self.device.write(self.metadata_address, &pointers.to_bytes())?;
        self.tail = tail;
        self.head = head;
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<(), FramError> {
        if self.initialized {
            Ok(())
        } else {
            Err(FramError::RingNotInitialized)
        }
    }
}
