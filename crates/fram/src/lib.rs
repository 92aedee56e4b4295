//! Persistent storage on serial ferroelectric RAM.
//!
//! Layers, each only talking to the one below:
//!
//! ```text
//! FramRing / FramArray   typed regions, slot arithmetic
//!        |
//! FramDevice             bounds checks, 30 byte chunking, bump allocator
//!        |
//! BlockTransport         raw bus transactions (MemoryTransport, MmapTransport, ...)
//! ```

pub mod array;
pub mod config;
pub mod device;
pub mod errors;
pub mod header;
pub mod mmap_transport;
pub mod part;
pub mod ring;
pub mod transport;

pub use array::FramArray;
pub use config::FramConfig;
pub use device::FramDevice;
pub use errors::FramError;
pub use header::RingPointers;
pub use mmap_transport::MmapTransport;
pub use part::{MAX_CHUNK_SIZE, PartNumber, TRANSPORT_CHUNK_SIZE};
pub use ring::{FramRing, RingRecovery};
pub use transport::{BlockTransport, MemoryTransport, SharedBus, TransportError, shared};
