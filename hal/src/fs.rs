//! # Files
//!
//! The file API the engine core uses. Two kinds of file sit behind one
//! [`Handle`]:
//!
//! - **User files** (config, save games) live in SRAM through the
//!   [`FileTable`]. They can be read, written and seeked within their
//!   fixed size.
//! - **Asset files** come from the ROM filesystem and are read-only;
//!   writes to them always return 0.
//!
//! ```ignore
//! let h = fs.create_user_file("SAVEGAM0.CK4")?;
//! fs.write_u16_le(h, &[level, lives])?;
//! fs.print(h, format_args!("{}", name))?;
//! fs.close(h)?;
//!
//! let map = fs.open_keen_file("GAMEMAPS.CK4")?;
//! let len = fs.file_size(map)?;
//! ```
//!
//! Counts returned by `read`/`write` and the integer helpers are short at
//! the end of a file. That is not an error; compare against what you asked
//! for.

use core::fmt::{self, Write};

use alloc::{vec, vec::Vec};
use heapless::String;
use log::{debug, warn};

use crate::{
    assets::{AssetFs, AssetHandle},
    bank::Variant,
    device::SaveDevice,
    fmtbuf::LineBuffer,
    table::{FileSpec, FileTable, SeekFrom, MAX_NAME_LEN},
    Result, StorageError,
};

/// Longest line [`FileSystem::print`] writes.
pub const PRINT_LEN: usize = 64;

/// Staging size for the integer helpers.
const IO_CHUNK: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handle {
    /// Slot in the save file table.
    User(u8),
    /// Handle from the asset filesystem.
    Asset(AssetHandle),
}

pub struct FileSystem<D, A> {
    table: FileTable<D>,
    assets: A,
    active_assets: u32,
}

impl<D: SaveDevice, A: AssetFs> FileSystem<D, A> {
    /// Mount the save table on `device` and take over `assets`.
    pub fn startup(device: D, variant: Variant, files: &[FileSpec], assets: A) -> Result<Self> {
        let table = FileTable::mount(device, variant, files)?;
        debug!("fs: {} save files on {:#x} bytes", table.entries().len(), variant.capacity);
        Ok(Self { table, assets, active_assets: 0 })
    }

    /// Open a file shipped with the original game.
    pub fn open_keen_file(&mut self, name: &str) -> Result<Handle> {
        match self.assets.open(name) {
            Some(handle) => {
                self.active_assets += 1;
                Ok(Handle::Asset(handle))
            }
            None => {
                debug!("error opening {}", name);
                Err(StorageError::AssetUnavailable)
            }
        }
    }

    /// Open a file added by the port (episode definitions and the like).
    /// Same storage as [`open_keen_file`](Self::open_keen_file).
    pub fn open_omni_file(&mut self, name: &str) -> Result<Handle> {
        self.open_keen_file(name)
    }

    pub fn is_keen_file_present(&mut self, name: &str) -> bool {
        match self.assets.open(name) {
            Some(handle) => {
                self.assets.close(handle);
                true
            }
            None => {
                debug!("{} is NOT present", name);
                false
            }
        }
    }

    pub fn is_omni_file_present(&mut self, name: &str) -> bool {
        self.is_keen_file_present(name)
    }

    /// Whether the asset filesystem carries the game data for episode
    /// extension `ext` (e.g. `"CK4"`).
    pub fn is_good_omni_path(&mut self, ext: &str) -> bool {
        let action = adjust_extension("ACTION.CK4", ext);
        if !self.is_omni_file_present(&action) {
            return false;
        }
        debug!("omni path is OK");
        true
    }

    /// Whether save storage is usable: the table fits the device and the
    /// device answers a read.
    pub fn is_good_user_path(&mut self) -> bool {
        let capacity = self.table.io().capacity();
        if self.table.extent() > capacity {
            warn!("save table needs {:#x} bytes, device has {:#x}", self.table.extent(), capacity);
            return false;
        }
        let mut first = [0u8; 1];
        match self.table.io_mut().read_range(&mut first, 0) {
            Ok(()) => {
                debug!("user path is OK");
                true
            }
            Err(err) => {
                warn!("save media unusable: {}", err);
                false
            }
        }
    }

    /// Open an existing save file for reading and writing.
    pub fn open_user_file(&mut self, name: &str) -> Result<Handle> {
        let index = self.table.open_for_read(name)?;
        Ok(Handle::User(index as u8))
    }

    /// Open a save file, creating it (all zeroes) if it does not exist.
    pub fn create_user_file(&mut self, name: &str) -> Result<Handle> {
        let index = self.table.open_for_write(name)?;
        Ok(Handle::User(index as u8))
    }

    pub fn is_user_file_present(&self, name: &str) -> bool {
        self.table.is_present(name)
    }

    pub fn is_file_valid(&self, handle: Handle) -> bool {
        match handle {
            Handle::User(index) => self.table.entry(index as usize).is_ok(),
            Handle::Asset(handle) => handle > 0,
        }
    }

    pub fn read(&mut self, handle: Handle, buf: &mut [u8]) -> Result<usize> {
        match handle {
            Handle::User(index) => self.table.read(index as usize, buf),
            Handle::Asset(handle) => {
                let read = self.assets.read(handle, buf);
                if read != buf.len() {
                    debug!("read byte mismatch {} {}", read, buf.len());
                }
                Ok(read)
            }
        }
    }

    pub fn write(&mut self, handle: Handle, buf: &[u8]) -> Result<usize> {
        match handle {
            Handle::User(index) => self.table.write(index as usize, buf),
            Handle::Asset(_) => Ok(0),
        }
    }

    /// Move to `offset` from the start of the file, returning the previous
    /// position. User files clamp `offset` to their size.
    pub fn seek_to(&mut self, handle: Handle, offset: u32) -> Result<u32> {
        match handle {
            Handle::User(index) => {
                let previous = self.table.entry(index as usize)?.cursor();
                self.table.seek(index as usize, SeekFrom::Start(offset))?;
                Ok(previous)
            }
            Handle::Asset(handle) => {
                let previous = self.assets.tell(handle);
                self.assets.seek(handle, offset);
                Ok(previous)
            }
        }
    }

    /// Seek relative to start, cursor or end, returning the new position.
    pub fn seek(&mut self, handle: Handle, pos: SeekFrom) -> Result<u32> {
        match handle {
            Handle::User(index) => self.table.seek(index as usize, pos),
            Handle::Asset(handle) => {
                let size = self.assets.size(handle) as i64;
                let target = match pos {
                    SeekFrom::Start(offset) => offset as i64,
                    SeekFrom::Current(delta) => {
                        (self.assets.tell(handle) as i64).saturating_add(delta)
                    }
                    SeekFrom::End(delta) => size.saturating_add(delta),
                };
                let target = target.clamp(0, size) as u32;
                self.assets.seek(handle, target);
                Ok(target)
            }
        }
    }

    pub fn file_size(&self, handle: Handle) -> Result<u32> {
        match handle {
            Handle::User(index) => Ok(self.table.entry(index as usize)?.size()),
            Handle::Asset(handle) => Ok(self.assets.size(handle)),
        }
    }

    /// Release `handle`. For user files this only rewinds the cursor.
    pub fn close(&mut self, handle: Handle) -> Result<()> {
        match handle {
            Handle::User(index) => self.table.close(index as usize),
            Handle::Asset(handle) => {
                self.assets.close(handle);
                self.active_assets = self.active_assets.saturating_sub(1);
                debug!("active files {}", self.active_assets);
                Ok(())
            }
        }
    }

    /// Read a whole save file into memory.
    pub fn load_user_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let handle = self.open_user_file(name)?;
        let size = self.file_size(handle)? as usize;
        let mut data = vec![0; size];
        let read = self.read(handle, &mut data);
        self.close(handle)?;
        if read? != size {
            return Err(StorageError::ShortRead);
        }
        Ok(data)
    }

    /// Formatted write, cut off at [`PRINT_LEN`] bytes.
    pub fn print(&mut self, handle: Handle, args: fmt::Arguments<'_>) -> Result<usize> {
        let mut line = LineBuffer::<PRINT_LEN>::new();
        let _ = line.write_fmt(args);
        self.write(handle, line.as_bytes())
    }

    pub fn read_u8s(&mut self, handle: Handle, out: &mut [u8]) -> Result<usize> {
        self.read(handle, out)
    }

    pub fn read_u16_le(&mut self, handle: Handle, out: &mut [u16]) -> Result<usize> {
        self.read_le(handle, out, u16::from_le_bytes)
    }

    pub fn read_u32_le(&mut self, handle: Handle, out: &mut [u32]) -> Result<usize> {
        self.read_le(handle, out, u32::from_le_bytes)
    }

    pub fn write_u8s(&mut self, handle: Handle, values: &[u8]) -> Result<usize> {
        self.write(handle, values)
    }

    pub fn write_u16_le(&mut self, handle: Handle, values: &[u16]) -> Result<usize> {
        self.write_le(handle, values, u16::to_le_bytes)
    }

    pub fn write_u32_le(&mut self, handle: Handle, values: &[u32]) -> Result<usize> {
        self.write_le(handle, values, u32::to_le_bytes)
    }

    /// Booleans stored as 16-bit words; any non-zero word reads as `true`.
    pub fn read_bools_from_16le(&mut self, handle: Handle, out: &mut [bool]) -> Result<usize> {
        self.read_le(handle, out, |bytes: [u8; 2]| u16::from_le_bytes(bytes) != 0)
    }

    pub fn write_bools_to_16le(&mut self, handle: Handle, values: &[bool]) -> Result<usize> {
        self.write_le(handle, values, |value: bool| (value as u16).to_le_bytes())
    }

    pub fn table(&self) -> &FileTable<D> {
        &self.table
    }

    pub fn assets(&self) -> &A {
        &self.assets
    }

    pub fn into_parts(self) -> (D, A) {
        (self.table.into_device(), self.assets)
    }

    fn read_le<T, const W: usize>(
        &mut self,
        handle: Handle,
        out: &mut [T],
        decode: fn([u8; W]) -> T,
    ) -> Result<usize> {
        let mut chunk = [0u8; IO_CHUNK];
        let mut count = 0;
        for elements in out.chunks_mut(IO_CHUNK / W) {
            let want = elements.len() * W;
            let got = self.read(handle, &mut chunk[..want])?;
            for (element, bytes) in elements.iter_mut().zip(chunk[..got].chunks_exact(W)) {
                let mut raw = [0u8; W];
                raw.copy_from_slice(bytes);
                *element = decode(raw);
                count += 1;
            }
            if got < want {
                break;
            }
        }
        Ok(count)
    }

    fn write_le<T: Copy, const W: usize>(
        &mut self,
        handle: Handle,
        values: &[T],
        encode: fn(T) -> [u8; W],
    ) -> Result<usize> {
        let mut chunk = [0u8; IO_CHUNK];
        let mut count = 0;
        for elements in values.chunks(IO_CHUNK / W) {
            for (bytes, value) in chunk.chunks_exact_mut(W).zip(elements) {
                bytes.copy_from_slice(&encode(*value));
            }
            let want = elements.len() * W;
            let got = self.write(handle, &chunk[..want])?;
            count += got / W;
            if got < want {
                break;
            }
        }
        Ok(count)
    }
}

/// Swap the 3-character extension of `name` for `ext`, e.g.
/// `CONFIG.CK4` -> `CONFIG.CK5`.
pub fn adjust_extension(name: &str, ext: &str) -> String<MAX_NAME_LEN> {
    let stem = name.get(..name.len().saturating_sub(3)).unwrap_or("");
    let mut adjusted = String::new();
    for c in stem.chars().chain(ext.chars().take(3)) {
        if adjusted.push(c).is_err() {
            break;
        }
    }
    adjusted
}
