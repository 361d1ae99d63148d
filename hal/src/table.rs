//! # Save File Table
//!
//! Named save files are fixed regions of the device, laid out back to back
//! in the order they are declared. Slot 0 is a zero-sized sentinel so that
//! index 0 never names a file.
//!
//! ```text
//! | KEEN | CONFIG.CK4 payload (2048) | KEEN | SAVEGAM0.CK4 payload ... |
//!   ^ marker                           ^ marker
//! ```
//!
//! On variants with presence markers, the 4 marker bytes sit in front of
//! the payload and are not counted in the file's size. A region whose
//! marker is missing has never been created: it can be opened for writing
//! (which zero-fills it and stamps the marker) but not for reading.

use heapless::Vec;
use log::{debug, warn};

use crate::{bank::Variant, device::SaveDevice, sector::SectorIo, Result, StorageError};

/// Table slots, including the sentinel.
pub const MAX_FILES: usize = 8;

pub const MAX_NAME_LEN: usize = 16;

pub const PRESENCE_MAGIC: [u8; 4] = *b"KEEN";
pub const MARKER_LEN: u32 = PRESENCE_MAGIC.len() as u32;

/// Zero-fill chunk used when creating a file.
const ZERO_CHUNK: usize = 64;

/// A compiled-in save file declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileSpec {
    name: &'static str,
    size: u32,
}

impl FileSpec {
    /// Panics if `name` is longer than [`MAX_NAME_LEN`]; in a `const`
    /// table that is a build error.
    pub const fn new(name: &'static str, size: u32) -> Self {
        assert!(name.len() <= MAX_NAME_LEN, "save file name too long");
        Self { name, size }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn size(&self) -> u32 {
        self.size
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionState {
    /// No presence marker; contents are whatever the device held.
    Uninitialized,
    Initialized,
}

#[derive(Debug)]
pub struct FileEntry {
    spec: FileSpec,
    start: u32,
    cursor: u32,
    state: RegionState,
}

impl FileEntry {
    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn size(&self) -> u32 {
        self.spec.size
    }

    /// Physical offset of the region, marker included.
    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn state(&self) -> RegionState {
        self.state
    }

    fn remaining(&self) -> u32 {
        self.spec.size - self.cursor
    }
}

/// Seek origin, cursor clamped to `[0, size]` afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekFrom {
    Start(u32),
    Current(i64),
    End(i64),
}

pub struct FileTable<D> {
    io: SectorIo<D>,
    entries: Vec<FileEntry, MAX_FILES>,
    marker_len: u32,
}

impl<D: SaveDevice> FileTable<D> {
    /// Lay `files` out on `device` and probe which regions exist.
    pub fn mount(device: D, variant: Variant, files: &[FileSpec]) -> Result<Self> {
        let marker_len = variant.marker_len();
        let mut entries = Vec::new();
        let sentinel = FileEntry {
            spec: FileSpec::new("", 0),
            start: 0,
            cursor: 0,
            state: RegionState::Initialized,
        };
        entries.push(sentinel).map_err(|_| StorageError::TableFull)?;

        let mut start = 0u32;
        for spec in files {
            let entry = FileEntry {
                spec: *spec,
                start,
                cursor: 0,
                state: RegionState::Uninitialized,
            };
            entries.push(entry).map_err(|_| StorageError::TableFull)?;
            start = start
                .checked_add(marker_len + spec.size())
                .ok_or(StorageError::OutOfBounds)?;
        }
        if start > variant.capacity {
            warn!("save table needs {:#x} bytes, device has {:#x}", start, variant.capacity);
            return Err(StorageError::OutOfBounds);
        }

        let mut table = Self { io: SectorIo::new(device, &variant), entries, marker_len };
        for index in 1..table.entries.len() {
            table.entries[index].state = table.probe(index)?;
            debug!(
                "save file {} at {:#x}: {:?}",
                table.entries[index].name(),
                table.entries[index].start,
                table.entries[index].state
            );
        }
        Ok(table)
    }

    /// Slot of the first file called `name`, ignoring ASCII case.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, entry)| entry.name().eq_ignore_ascii_case(name))
            .map(|(index, _)| index)
    }

    /// Physical offset of the region at `index`: the sum of all regions
    /// declared before it.
    pub fn region_start(&self, index: usize) -> Result<u32> {
        Ok(self.entry(index)?.start)
    }

    pub fn entry(&self, index: usize) -> Result<&FileEntry> {
        match index {
            0 => Err(StorageError::InvalidHandle),
            _ => self.entries.get(index).ok_or(StorageError::InvalidHandle),
        }
    }

    /// Declared files, sentinel excluded.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries[1..]
    }

    /// Bytes of the device the table occupies, markers included.
    pub fn extent(&self) -> u32 {
        self.entries()
            .last()
            .map_or(0, |last| last.start + self.marker_len + last.size())
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.resolve(name)
            .is_some_and(|index| self.entries[index].state == RegionState::Initialized)
    }

    /// Open an existing file. The cursor starts at 0.
    pub fn open_for_read(&mut self, name: &str) -> Result<usize> {
        let index = self.resolve(name).ok_or(StorageError::NotFound)?;
        let entry = &mut self.entries[index];
        if entry.state != RegionState::Initialized {
            debug!("{} has not been created", entry.name());
            return Err(StorageError::NotPresent);
        }
        entry.cursor = 0;
        Ok(index)
    }

    /// Open a file for writing, creating it first if needed. A freshly
    /// created file reads back as all zeroes. The cursor starts at 0.
    pub fn open_for_write(&mut self, name: &str) -> Result<usize> {
        let index = self.resolve(name).ok_or(StorageError::NotFound)?;
        if self.entries[index].state == RegionState::Uninitialized {
            self.create(index)?;
        }
        self.entries[index].cursor = 0;
        Ok(index)
    }

    pub fn seek(&mut self, index: usize, pos: SeekFrom) -> Result<u32> {
        let entry = self.entry_mut(index)?;
        let size = entry.size() as i64;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(delta) => (entry.cursor as i64).saturating_add(delta),
            SeekFrom::End(delta) => size.saturating_add(delta),
        };
        entry.cursor = target.clamp(0, size) as u32;
        Ok(entry.cursor)
    }

    /// Read up to `dst.len()` bytes at the cursor. Returns how many were
    /// read, which is short at the end of the file.
    pub fn read(&mut self, index: usize, dst: &mut [u8]) -> Result<usize> {
        let (offset, count) = self.span(index, dst.len())?;
        self.io.read_range(&mut dst[..count], offset)?;
        self.entries[index].cursor += count as u32;
        Ok(count)
    }

    /// Write up to `src.len()` bytes at the cursor. Never runs into the
    /// next region: returns a short count at the end of the file.
    pub fn write(&mut self, index: usize, src: &[u8]) -> Result<usize> {
        let (offset, count) = self.span(index, src.len())?;
        if count < src.len() {
            let name = self.entries[index].name();
            debug!("{}: write clamped to {} of {} bytes", name, count, src.len());
        }
        self.io.write_range(&src[..count], offset)?;
        self.entries[index].cursor += count as u32;
        Ok(count)
    }

    /// Rewind the cursor. Nothing reaches the device.
    pub fn close(&mut self, index: usize) -> Result<()> {
        self.entry_mut(index)?.cursor = 0;
        Ok(())
    }

    pub fn io(&self) -> &SectorIo<D> {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut SectorIo<D> {
        &mut self.io
    }

    pub fn into_device(self) -> D {
        self.io.into_device()
    }

    fn entry_mut(&mut self, index: usize) -> Result<&mut FileEntry> {
        match index {
            0 => Err(StorageError::InvalidHandle),
            _ => self.entries.get_mut(index).ok_or(StorageError::InvalidHandle),
        }
    }

    /// Physical offset of the cursor and the clamped length for an access.
    fn span(&self, index: usize, len: usize) -> Result<(u32, usize)> {
        let entry = self.entry(index)?;
        if entry.state != RegionState::Initialized {
            return Err(StorageError::NotPresent);
        }
        let count = len.min(entry.remaining() as usize);
        Ok((entry.start + self.marker_len + entry.cursor, count))
    }

    fn probe(&mut self, index: usize) -> Result<RegionState> {
        if self.marker_len == 0 {
            return Ok(RegionState::Initialized);
        }
        let mut marker = [0u8; PRESENCE_MAGIC.len()];
        self.io.read_range(&mut marker, self.entries[index].start)?;
        Ok(match marker == PRESENCE_MAGIC {
            true => RegionState::Initialized,
            false => RegionState::Uninitialized,
        })
    }

    fn create(&mut self, index: usize) -> Result<()> {
        let entry = &self.entries[index];
        let payload = entry.start + self.marker_len;
        let end = payload + entry.size();
        debug!("creating {} ({} bytes)", entry.name(), entry.size());

        // the marker goes last so an interrupted create stays uninitialized
        let zeros = [0u8; ZERO_CHUNK];
        let mut offset = payload;
        while offset < end {
            let count = ((end - offset) as usize).min(ZERO_CHUNK);
            self.io.write_range(&zeros[..count], offset)?;
            offset += count as u32;
        }
        self.io.write_range(&PRESENCE_MAGIC, self.entries[index].start)?;

        self.entries[index].state = RegionState::Initialized;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::memory::{MemoryDevice, BLANK};

    const FILES: [FileSpec; 2] =
        [FileSpec::new("CONFIG.CK4", 2048), FileSpec::new("SAVEGAM0.CK4", 4096)];

    fn mount(variant: Variant) -> FileTable<MemoryDevice> {
        FileTable::mount(MemoryDevice::new(&variant), variant, &FILES).unwrap()
    }

    #[test]
    fn regions_follow_declaration_order() {
        let table = mount(Variant::SRAM_256K);
        assert_eq!(table.region_start(1), Ok(0));
        assert_eq!(table.region_start(2), Ok(4 + 2048));
        assert_eq!(table.region_start(0), Err(StorageError::InvalidHandle));
        assert_eq!(table.region_start(3), Err(StorageError::InvalidHandle));
    }

    #[test]
    fn regions_without_markers_pack_tightly() {
        let table = mount(Variant::SRAM_256K.without_markers());
        assert_eq!(table.region_start(2), Ok(2048));
        assert!(table.is_present("CONFIG.CK4"));
    }

    #[test]
    fn resolve_ignores_case_and_sentinel() {
        let table = mount(Variant::SRAM_256K);
        assert_eq!(table.resolve("config.ck4"), Some(1));
        assert_eq!(table.resolve("SaveGam0.Ck4"), Some(2));
        assert_eq!(table.resolve(""), None);
        assert_eq!(table.resolve("SAVEGAM1.CK4"), None);
    }

    #[test]
    fn create_zero_fills_and_stamps_marker() {
        let mut table = mount(Variant::SRAM_256K);
        let index = table.open_for_write("CONFIG.CK4").unwrap();
        assert_eq!(table.entry(index).unwrap().state(), RegionState::Initialized);

        let image = table.io().device().image();
        assert_eq!(&image[..4], &PRESENCE_MAGIC);
        assert!(image[4..4 + 2048].iter().all(|&b| b == 0));
        // next region untouched
        assert_eq!(image[4 + 2048], BLANK);
    }

    #[test]
    fn reopening_does_not_clear() {
        let mut table = mount(Variant::SRAM_256K);
        let index = table.open_for_write("CONFIG.CK4").unwrap();
        table.write(index, b"hello").unwrap();
        let index = table.open_for_write("CONFIG.CK4").unwrap();
        assert_eq!(table.entry(index).unwrap().cursor(), 0);

        let mut buf = [0u8; 5];
        table.read(index, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn seek_saturates() {
        let mut table = mount(Variant::SRAM_256K);
        let index = table.open_for_write("CONFIG.CK4").unwrap();
        assert_eq!(table.seek(index, SeekFrom::Start(5000)), Ok(2048));
        assert_eq!(table.seek(index, SeekFrom::Current(-100)), Ok(1948));
        assert_eq!(table.seek(index, SeekFrom::Current(-5000)), Ok(0));
        assert_eq!(table.seek(index, SeekFrom::End(-48)), Ok(2000));
        assert_eq!(table.seek(index, SeekFrom::End(10)), Ok(2048));
        assert_eq!(table.seek(index, SeekFrom::Current(i64::MAX)), Ok(2048));
    }

    #[test]
    fn read_and_write_clamp_at_end() {
        let mut table = mount(Variant::SRAM_256K);
        let index = table.open_for_write("CONFIG.CK4").unwrap();
        table.seek(index, SeekFrom::End(-3)).unwrap();
        assert_eq!(table.write(index, &[0xEE; 10]), Ok(3));
        assert_eq!(table.entry(index).unwrap().cursor(), 2048);

        // the following region's marker bytes stay blank
        let next = table.region_start(2).unwrap() as usize;
        assert_eq!(&table.io().device().image()[next..next + 4], &[BLANK; 4]);

        table.seek(index, SeekFrom::End(-2)).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(table.read(index, &mut buf), Ok(2));
        assert_eq!(&buf[..2], &[0xEE, 0xEE]);
        assert_eq!(table.read(index, &mut buf), Ok(0));
    }

    #[test]
    fn uncreated_file_cannot_be_read() {
        let mut table = mount(Variant::SRAM_256K);
        assert_eq!(table.open_for_read("CONFIG.CK4"), Err(StorageError::NotPresent));
        assert_eq!(table.open_for_read("NOPE"), Err(StorageError::NotFound));
        let mut buf = [0u8; 4];
        assert_eq!(table.read(1, &mut buf), Err(StorageError::NotPresent));
    }

    #[test]
    fn presence_survives_remount() {
        let variant = Variant::SRAM_256K;
        let mut table = mount(variant);
        table.open_for_write("SAVEGAM0.CK4").unwrap();
        let device = table.into_device();

        let table = FileTable::mount(device, variant, &FILES).unwrap();
        assert!(table.is_present("SAVEGAM0.CK4"));
        assert!(!table.is_present("CONFIG.CK4"));
    }

    #[test]
    fn close_rewinds() {
        let mut table = mount(Variant::SRAM_256K);
        let index = table.open_for_write("CONFIG.CK4").unwrap();
        table.write(index, &[1; 100]).unwrap();
        table.close(index).unwrap();
        assert_eq!(table.entry(index).unwrap().cursor(), 0);
        assert_eq!(table.close(0), Err(StorageError::InvalidHandle));
    }

    #[test]
    fn rejects_layout_larger_than_device() {
        let variant = Variant::SRAM_256K;
        let files = [FileSpec::new("BIG", 0x8000)];
        let result = FileTable::mount(MemoryDevice::new(&variant), variant, &files);
        assert!(matches!(result, Err(StorageError::OutOfBounds)));
    }

    #[test]
    #[should_panic(expected = "save file name too long")]
    fn rejects_long_names() {
        let _ = FileSpec::new("SAVEGAME_SLOT_0.CK4", 16);
    }

    #[test]
    fn extent_covers_every_region() {
        let table = mount(Variant::SRAM_256K);
        assert_eq!(table.extent(), 4 + 2048 + 4 + 4096);
        assert_eq!(mount(Variant::SRAM_256K.without_markers()).extent(), 2048 + 4096);
    }

    #[test]
    fn rejects_too_many_files() {
        let variant = Variant::SRAM_256K;
        let files = [FileSpec::new("F", 16); MAX_FILES];
        let result = FileTable::mount(MemoryDevice::new(&variant), variant, &files);
        assert!(matches!(result, Err(StorageError::TableFull)));
    }

    #[test]
    fn interrupted_create_stays_uninitialized() {
        let variant = Variant::SRAM_256K;
        let mut table = mount(variant);
        table.io_mut().device_mut().hang_after(3);
        assert_eq!(table.open_for_write("CONFIG.CK4"), Err(StorageError::DeviceTimeout));
        assert_eq!(table.entry(1).unwrap().state(), RegionState::Uninitialized);
    }
}
