use crate::device::FramDevice;
use crate::errors::FramError;
use crate::part::MAX_CHUNK_SIZE;
use crate::transport::BlockTransport;

/// Fixed-size records laid out back to back in one allocated region.
///
/// Element `i` lives at `start_address + i * element_size`.
pub struct FramArray<'a, T: BlockTransport> {
    device: &'a FramDevice<T>,
    element_count: u32,
    element_size: usize,
    start_address: u32,
}

impl<'a, T: BlockTransport> FramArray<'a, T> {
    /// Allocate `element_count * element_size` bytes on `device`.
    ///
    /// `element_size` must be non-zero and strictly smaller than the
    /// device's max chunk size.
    pub fn new(
        device: &'a FramDevice<T>,
        element_count: u32,
        element_size: usize,
    ) -> Result<Self, FramError> {
        check_element_size(element_size)?;
        let start_address =
            device.allocate_memory(element_count.saturating_mul(element_size as u32))?;

        Ok(Self {
            device,
            element_count,
            element_size,
            start_address,
        })
    }

    pub fn start_address(&self) -> u32 {
        self.start_address
    }

    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    pub fn read_element(&self, index: u32) -> Result<Vec<u8>, FramError> {
        let address = self.element_address(index)?;
        self.device.read(address, self.element_size)
    }

    /// Store `data` in slot `index`, zero-padding payloads shorter than the
    /// element size.
    pub fn write_element(&self, index: u32, data: &[u8]) -> Result<(), FramError> {
        let address = self.element_address(index)?;
        let slot = slot_image(data, self.element_size)?;
        self.device.write(address, &slot[..self.element_size])
    }

    fn element_address(&self, index: u32) -> Result<u32, FramError> {
        if index >= self.element_count {
            return Err(FramError::BadArrayIndex {
                index,
                count: self.element_count,
            });
        }
        Ok(self.start_address + index * self.element_size as u32)
    }
}

/// An element has to fit a single logical transfer with room to spare.
pub(crate) fn check_element_size(element_size: usize) -> Result<(), FramError> {
    if element_size == 0 {
        return Err(FramError::EmptyElement);
    }
    if element_size >= MAX_CHUNK_SIZE {
        return Err(FramError::ElementTooBig {
            size: element_size,
            max: MAX_CHUNK_SIZE,
        });
    }
    Ok(())
}

/// Copy `data` into a zeroed slot buffer; only the first `element_size`
/// bytes are meaningful.
pub(crate) fn slot_image(
    data: &[u8],
    element_size: usize,
) -> Result<[u8; MAX_CHUNK_SIZE], FramError> {
    if data.len() > element_size {
        return Err(FramError::ElementTooLong {
            len: data.len(),
            size: element_size,
        });
    }
    let mut slot = [0u8; MAX_CHUNK_SIZE];
    slot[..data.len()].copy_from_slice(data);
    Ok(slot)
}
