use crate::part::{DEFAULT_BUS_ADDRESS, PartNumber};
use crate::transport::{BlockTransport, TransportError, chunk_span};
use memmap2::{MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::path::Path;

/// File-backed chip image.
///
/// The file plays the role of the FRAM die: it survives process restarts,
/// so a device reopened with [`MmapTransport::open_existing`] sees exactly
/// what the previous process left behind.
pub struct MmapTransport {
    mmap: MmapMut,
    bus_address: u8,
}

impl MmapTransport {
    /// Create or open an image file and blank it.
    ///
    /// Creates the file if it doesn't exist, expands it if undersized.
    /// Every byte of the part's address space is reset to 0, like a freshly
    /// delivered chip.
    ///
    /// Use `open_existing()` instead if you want to preserve the contents.
    pub fn create_and_init(
        path: impl AsRef<Path>,
        part_number: PartNumber,
    ) -> Result<Self, TransportError> {
        let size = part_number.capacity_bytes();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        // Only resize if the file is smaller than needed
        if file.metadata()?.len() < size as u64 {
            file.set_len(size as u64)?;
        }

        let mut mmap = unsafe { MmapOptions::new().len(size).map_mut(&file)? };
        mmap.fill(0);

        Ok(Self {
            mmap,
            bus_address: DEFAULT_BUS_ADDRESS,
        })
    }

    /// Open an existing image file and preserve its contents.
    ///
    /// Use this when a process restarts and should pick up the chip state
    /// left by the previous run.
    ///
    /// Returns an error if the file doesn't exist.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let mmap = unsafe { MmapOptions::new().map_mut(&file)? };

        Ok(Self {
            mmap,
            bus_address: DEFAULT_BUS_ADDRESS,
        })
    }

    pub fn with_bus_address(mut self, bus_address: u8) -> Self {
        self.bus_address = bus_address;
        self
    }

    pub fn capacity(&self) -> usize {
        self.mmap.len()
    }

    pub fn flush(&mut self) -> Result<(), TransportError> {
        self.mmap.flush()?;
        Ok(())
    }
}

impl BlockTransport for MmapTransport {
    fn probe(&mut self, bus_address: u8) -> Result<(), TransportError> {
        if bus_address == self.bus_address {
            Ok(())
        } else {
            Err(TransportError::Nack)
        }
    }

    fn read_chunk(&mut self, address: u16, buf: &mut [u8]) -> Result<(), TransportError> {
        let span = chunk_span(address, buf.len(), self.mmap.len())?;
        buf.copy_from_slice(&self.mmap[span]);
        Ok(())
    }

    fn write_chunk(&mut self, address: u16, data: &[u8]) -> Result<(), TransportError> {
        let span = chunk_span(address, data.len(), self.mmap.len())?;
        self.mmap[span].copy_from_slice(data);
        Ok(())
    }
}
