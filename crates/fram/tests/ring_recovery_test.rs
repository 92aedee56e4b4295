use common::{Environment, setup_logging};
use fram::{
    FramArray, FramConfig, FramDevice, FramRing, MemoryTransport, MmapTransport, PartNumber,
    RingPointers, RingRecovery, SharedBus, shared,
};
use tempfile::tempdir;

fn init_logging() {
    // Every test in this binary calls this; only the first install wins.
    let _ = setup_logging(Environment::Development);
}

/// Replays the allocation sequence an application performs at every start.
fn boot(bus: &SharedBus<MemoryTransport>) -> FramDevice<MemoryTransport> {
    let device = FramDevice::from_config(bus.clone(), &FramConfig::new(PartNumber::Mb85rc128a));
    device.begin().expect("FRAM should answer on the default address");
    device
}

/// Scenario: 16KB part, 4 x 8 byte ring, five single-byte pushes.
#[test]
fn test_fifth_push_evicts_first_element() {
    init_logging();
    let device = FramDevice::new(
        MemoryTransport::new(PartNumber::Mb85rc128a),
        PartNumber::Mb85rc128a,
    );
    assert_eq!(device.top_address(), 0x3FFF);

    let mut ring = FramRing::new(&device, 4, 8).unwrap();
    assert_eq!(ring.start_address(), 128);
    assert_eq!(ring.end_address() - ring.start_address(), 5 * 8 + 12);
    ring.initialize().unwrap();

    for value in 1..=4u8 {
        ring.push(&[value]).unwrap();
    }
    assert!(ring.is_full(), "Logical capacity 4 is reached before the 5th push");

    ring.push(&[5]).unwrap();

    let mut expected = vec![0u8; 8];
    expected[0] = 2;
    assert_eq!(
        ring.pop().unwrap(),
        Some(expected),
        "Element {{1}} should have been evicted"
    );
}

#[test]
fn test_restart_recovers_pointers_from_shared_bus() {
    init_logging();
    let bus = shared(MemoryTransport::new(PartNumber::Mb85rc128a));

    let last_indices = {
        let device = boot(&bus);
        let config_table = FramArray::new(&device, 4, 16).unwrap();
        let mut ring = FramRing::new(&device, 6, 10).unwrap();
        assert_eq!(ring.initialize().unwrap(), RingRecovery::Reset);

        config_table.write_element(0, b"settings v1").unwrap();
        for element in ["e1", "e2", "e3", "e4"] {
            ring.push(element.as_bytes()).unwrap();
        }
        ring.indices()
    }; // Power cycle: all in-memory state is gone, the chip keeps its data.

    let device = boot(&bus);
    assert_eq!(device.next_free_byte(), 128, "Allocation cursor is not persisted");
    let config_table = FramArray::new(&device, 4, 16).unwrap();
    let mut ring = FramRing::new(&device, 6, 10).unwrap();

    assert_eq!(ring.initialize().unwrap(), RingRecovery::Recovered);
    assert_eq!(ring.indices(), last_indices);
    assert_eq!(ring.len(), 4);

    let mut e1 = b"e1".to_vec();
    e1.resize(10, 0);
    assert_eq!(ring.pop().unwrap(), Some(e1));
    assert_eq!(&config_table.read_element(0).unwrap()[..11], b"settings v1");
}

#[test]
fn test_restart_recovers_from_file_backed_chip() {
    init_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("fram.img");

    {
        let transport = MmapTransport::create_and_init(&path, PartNumber::Mb85rc256v).unwrap();
        let device = FramDevice::new(transport, PartNumber::Mb85rc256v);
        device.begin().unwrap();
        let mut ring = FramRing::new(&device, 3, 4).unwrap();
        ring.initialize().unwrap();

        // Wrap around twice so the recovered pointers are non-trivial.
        for i in 0..9u32 {
            ring.push(&i.to_le_bytes()).unwrap();
        }
        ring.pop_front().unwrap();
        device.bus().lock().unwrap().flush().unwrap();
    }

    let transport = MmapTransport::open_existing(&path).unwrap();
    let device = FramDevice::new(transport, PartNumber::Mb85rc256v);
    let mut ring = FramRing::new(&device, 3, 4).unwrap();

    assert_eq!(ring.initialize().unwrap(), RingRecovery::Recovered);
    assert_eq!(ring.len(), 2);
    assert_eq!(ring.pop().unwrap(), Some(7u32.to_le_bytes().to_vec()));
    assert_eq!(ring.pop().unwrap(), Some(8u32.to_le_bytes().to_vec()));
    assert_eq!(ring.pop().unwrap(), None);
}

#[test]
fn test_corrupted_trailer_resets_to_empty() {
    init_logging();
    let bus = shared(MemoryTransport::new(PartNumber::Mb85rc128a));

    let metadata_address = {
        let device = boot(&bus);
        let mut ring = FramRing::new(&device, 4, 8).unwrap();
        ring.initialize().unwrap();
        ring.push(&[1]).unwrap();
        ring.push(&[2]).unwrap();
        ring.metadata_address() as usize
    };

    // Flip the stored head without fixing the checksum.
    bus.lock().unwrap().contents_mut()[metadata_address + 8] ^= 0x03;

    let device = boot(&bus);
    let mut ring = FramRing::new(&device, 4, 8).unwrap();
    assert_eq!(ring.initialize().unwrap(), RingRecovery::Reset);
    assert_eq!(ring.indices(), (0, 0));
    assert!(ring.is_empty());

    let trailer: [u8; RingPointers::SIZE] = bus.lock().unwrap().contents()
        [metadata_address..metadata_address + RingPointers::SIZE]
        .try_into()
        .unwrap();
    assert_eq!(
        RingPointers::from_bytes(&trailer),
        RingPointers::sealed(metadata_address as u32, 0, 0),
        "initialize() should commit the reset pointers"
    );
}

#[test]
fn test_consistent_but_out_of_range_trailer_resets() {
    init_logging();
    let bus = shared(MemoryTransport::new(PartNumber::Mb85rc128a));
    let device = boot(&bus);
    let mut ring = FramRing::new(&device, 4, 8).unwrap();

    let forged = RingPointers::sealed(ring.metadata_address(), 9, 2);
    device.write(ring.metadata_address(), &forged.to_bytes()).unwrap();

    assert_eq!(ring.initialize().unwrap(), RingRecovery::Reset);
    assert_eq!(ring.indices(), (0, 0));
}

#[test]
fn test_changed_allocation_order_does_not_adopt_foreign_trailer() {
    init_logging();
    let bus = shared(MemoryTransport::new(PartNumber::Mb85rc128a));

    {
        let device = boot(&bus);
        let mut ring = FramRing::new(&device, 4, 8).unwrap();
        ring.initialize().unwrap();
        ring.push(&[1]).unwrap();
    }

    // Next boot allocates something else first, shifting the ring.
    let device = boot(&bus);
    device.allocate_memory(12).unwrap();
    let mut ring = FramRing::new(&device, 4, 8).unwrap();

    assert_eq!(
        ring.initialize().unwrap(),
        RingRecovery::Reset,
        "A trailer is only valid at the address it was sealed for"
    );
}

#[test]
fn test_set_indices_survives_restart() {
    init_logging();
    let bus = shared(MemoryTransport::new(PartNumber::Mb85rc128a));

    {
        let device = boot(&bus);
        let mut ring = FramRing::new(&device, 4, 8).unwrap();
        ring.initialize().unwrap();
        ring.set_indices(2, 4).unwrap();
    }

    let device = boot(&bus);
    let mut ring = FramRing::new(&device, 4, 8).unwrap();
    assert_eq!(ring.initialize().unwrap(), RingRecovery::Recovered);
    assert_eq!(ring.indices(), (2, 4));
    assert_eq!(ring.len(), 2);
}
