use keen64_hal::{
    assets::MemoryAssets,
    bank::Variant,
    device::{memory::MemoryDevice, BLOCK_SIZE},
    fs::{FileSystem, Handle},
    layout,
    table::{FileSpec, FileTable, SeekFrom, PRESENCE_MAGIC},
    StorageError,
};

fn boot(variant: Variant, device: MemoryDevice) -> FileSystem<MemoryDevice, MemoryAssets> {
    FileSystem::startup(device, variant, &layout::EP4_FILES, MemoryAssets::new()).unwrap()
}

fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

#[test]
fn config_write_then_full_read() {
    let variant = Variant::SRAM_768K;
    let mut fs = boot(variant, MemoryDevice::new(&variant));

    let cfg = fs.create_user_file("CONFIG.CK4").unwrap();
    assert_eq!(fs.write(cfg, &[0xAA; 10]), Ok(10));
    fs.seek_to(cfg, 0).unwrap();

    let mut buf = vec![0xFFu8; 2048];
    assert_eq!(fs.read(cfg, &mut buf), Ok(2048));
    assert!(buf[..10].iter().all(|&b| b == 0xAA));
    assert!(buf[10..].iter().all(|&b| b == 0));
}

#[test]
fn round_trip_at_awkward_offsets() {
    let variant = Variant::SRAM_768K;
    let mut fs = boot(variant, MemoryDevice::new(&variant));
    let save = fs.create_user_file("SAVEGAM0.CK4").unwrap();

    // offsets around block and bank edges of the payload
    let cases = [(0u32, 1usize), (3, 509), (511, 2), (1000, 4000), (0x8000 - 2056 - 7, 33)];
    for (offset, len) in cases {
        let data = pattern(len, offset as u8);
        fs.seek_to(save, offset).unwrap();
        assert_eq!(fs.write(save, &data), Ok(len));

        fs.seek_to(save, offset).unwrap();
        let mut back = vec![0u8; len];
        assert_eq!(fs.read(save, &mut back), Ok(len));
        assert_eq!(back, data, "offset {:#x} len {}", offset, len);
    }
}

#[test]
fn chunking_does_not_change_contents() {
    let variant = Variant::SRAM_768K;
    let data = pattern(3000, 7);

    let mut whole = boot(variant, MemoryDevice::new(&variant));
    let h = whole.create_user_file("SAVEGAM0.CK4").unwrap();
    whole.seek_to(h, 100).unwrap();
    whole.write(h, &data).unwrap();

    let mut pieces = boot(variant, MemoryDevice::new(&variant));
    let h = pieces.create_user_file("SAVEGAM0.CK4").unwrap();
    pieces.seek_to(h, 100).unwrap();
    for chunk in data.chunks(37) {
        assert_eq!(pieces.write(h, chunk), Ok(chunk.len()));
    }

    let (a, _) = whole.into_parts();
    let (b, _) = pieces.into_parts();
    assert_eq!(a.image(), b.image());
}

#[test]
fn fresh_file_reads_as_zeroes_over_old_data() {
    let variant = Variant::SRAM_768K;
    let garbage = vec![0x5Cu8; variant.capacity as usize];
    let mut fs = boot(variant, MemoryDevice::from_image(&variant, &garbage));

    assert!(!fs.is_user_file_present("CONFIG.CK4"));
    let cfg = fs.create_user_file("CONFIG.CK4").unwrap();
    let data = {
        fs.close(cfg).unwrap();
        fs.load_user_file("CONFIG.CK4").unwrap()
    };
    assert!(data.iter().all(|&b| b == 0));

    // the other region is left alone
    let (device, _) = fs.into_parts();
    assert_eq!(device.image()[4 + 2048], 0x5C);
}

#[test]
fn presence_is_read_back_from_the_device() {
    let variant = Variant::SRAM_768K;
    let mut fs = boot(variant, MemoryDevice::new(&variant));
    assert_eq!(fs.open_user_file("SAVEGAM0.CK4"), Err(StorageError::NotPresent));
    let save = fs.create_user_file("SAVEGAM0.CK4").unwrap();
    fs.write_u16_le(save, &[1, 2, 3]).unwrap();
    fs.close(save).unwrap();

    let (device, _) = fs.into_parts();
    let start = 4 + layout::CONFIG_SIZE as usize;
    assert_eq!(&device.image()[start..start + 4], &PRESENCE_MAGIC);

    let mut fs = boot(variant, device);
    assert!(fs.is_user_file_present("SAVEGAM0.CK4"));
    assert!(!fs.is_user_file_present("CONFIG.CK4"));
    let save = fs.open_user_file("savegam0.ck4").unwrap();
    let mut words = [0u16; 3];
    assert_eq!(fs.read_u16_le(save, &mut words), Ok(3));
    assert_eq!(words, [1, 2, 3]);
}

#[test]
fn cursor_stays_inside_the_file() {
    let variant = Variant::SRAM_768K;
    let mut fs = boot(variant, MemoryDevice::new(&variant));
    let cfg = fs.create_user_file("CONFIG.CK4").unwrap();
    let save = fs.create_user_file("SAVEGAM0.CK4").unwrap();
    fs.write(save, b"slot").unwrap();

    fs.seek_to(cfg, 2040).unwrap();
    assert_eq!(fs.write(cfg, &[0x11; 64]), Ok(8));
    assert_eq!(fs.write(cfg, &[0x11; 64]), Ok(0));
    assert_eq!(fs.seek(cfg, SeekFrom::Current(100)), Ok(2048));
    assert_eq!(fs.seek(cfg, SeekFrom::Current(-4096)), Ok(0));

    fs.seek_to(save, 0).unwrap();
    let mut buf = [0u8; 4];
    fs.read(save, &mut buf).unwrap();
    assert_eq!(&buf, b"slot");
}

#[test]
fn transfers_never_cross_a_bank() {
    // MemoryDevice panics on a transfer that straddles banks, so writing a
    // range across every bank boundary exercises the block split.
    let variant = Variant::SRAM_1M.without_markers();
    let files = [FileSpec::new("ALL", 0x20000)];
    let mut table = FileTable::mount(MemoryDevice::new(&variant), variant, &files).unwrap();
    let all = table.open_for_write("ALL").unwrap();

    for boundary in [0x8000u32, 0x10000, 0x18000] {
        let data = pattern(3 * BLOCK_SIZE, boundary as u8);
        table.seek(all, SeekFrom::Start(boundary - 700)).unwrap();
        assert_eq!(table.write(all, &data), Ok(data.len()));

        let image = table.io().device().image();
        let start = (boundary - 700) as usize;
        assert_eq!(&image[start..start + data.len()], &data[..]);
    }
}

#[test]
fn invalid_handles_are_rejected() {
    let variant = Variant::SRAM_768K;
    let mut fs = boot(variant, MemoryDevice::new(&variant));
    let mut buf = [0u8; 4];
    assert_eq!(fs.read(Handle::User(0), &mut buf), Err(StorageError::InvalidHandle));
    assert_eq!(fs.write(Handle::User(9), &buf), Err(StorageError::InvalidHandle));
    assert_eq!(fs.file_size(Handle::User(0)), Err(StorageError::InvalidHandle));
    assert_eq!(fs.create_user_file("SAVEGAM9.CK4"), Err(StorageError::NotFound));
}

#[test]
fn device_hang_surfaces_as_timeout() {
    let variant = Variant::SRAM_768K;
    let mut device = MemoryDevice::new(&variant);
    device.hang_after(2);
    let mut fs = boot(variant, device);
    assert_eq!(fs.create_user_file("CONFIG.CK4"), Err(StorageError::DeviceTimeout));
}
