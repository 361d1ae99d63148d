//! # Read-Only Asset Files
//!
//! Game data (maps, graphics, audio) is packed into a DragonFS image in
//! cartridge ROM. It can be opened, read and seeked, never written.

use alloc::vec::Vec;

/// Native handle handed out by an [`AssetFs`]. Positive when valid.
pub type AssetHandle = i32;

pub trait AssetFs {
    fn open(&mut self, path: &str) -> Option<AssetHandle>;
    /// Read at the file position; returns bytes read, short at end of file.
    fn read(&mut self, handle: AssetHandle, dst: &mut [u8]) -> usize;
    /// Move the file position to `offset`.
    fn seek(&mut self, handle: AssetHandle, offset: u32);
    fn tell(&self, handle: AssetHandle) -> u32;
    fn size(&self, handle: AssetHandle) -> u32;
    fn close(&mut self, handle: AssetHandle);
}

/// libdragon's DragonFS.
#[cfg(target_arch = "mips")]
pub struct DragonFs;

#[cfg(target_arch = "mips")]
impl DragonFs {
    /// Mount the filesystem appended to the ROM.
    ///
    /// # Safety
    ///
    /// Call once, before any other DragonFS access.
    pub unsafe fn init() -> crate::Result<Self> {
        match unsafe { crate::sys::dfs_init(crate::sys::DFS_DEFAULT_LOCATION) } {
            0 => Ok(DragonFs),
            err => {
                log::warn!("dfs_init failed: {}", err);
                Err(crate::StorageError::AssetUnavailable)
            }
        }
    }
}

#[cfg(target_arch = "mips")]
impl AssetFs for DragonFs {
    fn open(&mut self, path: &str) -> Option<AssetHandle> {
        let mut cpath = heapless::Vec::<u8, 32>::new();
        cpath.extend_from_slice(path.as_bytes()).ok()?;
        cpath.push(0).ok()?;
        let handle = unsafe { crate::sys::dfs_open(cpath.as_ptr() as *const core::ffi::c_char) };
        (handle > 0).then_some(handle)
    }

    fn read(&mut self, handle: AssetHandle, dst: &mut [u8]) -> usize {
        let buf = dst.as_mut_ptr() as *mut core::ffi::c_void;
        let read = unsafe { crate::sys::dfs_read(buf, 1, dst.len() as i32, handle as u32) };
        read.max(0) as usize
    }

    fn seek(&mut self, handle: AssetHandle, offset: u32) {
        unsafe { crate::sys::dfs_seek(handle as u32, offset as i32, crate::sys::SEEK_SET) };
    }

    fn tell(&self, handle: AssetHandle) -> u32 {
        unsafe { crate::sys::dfs_tell(handle as u32) }.max(0) as u32
    }

    fn size(&self, handle: AssetHandle) -> u32 {
        unsafe { crate::sys::dfs_size(handle as u32) }.max(0) as u32
    }

    fn close(&mut self, handle: AssetHandle) {
        unsafe { crate::sys::dfs_close(handle as u32) };
    }
}

/// Assets held in memory, for tests and host tools.
#[derive(Default)]
pub struct MemoryAssets {
    files: Vec<(&'static str, &'static [u8])>,
    open: Vec<Option<(usize, u32)>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &'static str, data: &'static [u8]) -> Self {
        self.files.push((name, data));
        self
    }

    pub fn open_count(&self) -> usize {
        self.open.iter().filter(|slot| slot.is_some()).count()
    }

    fn slot(&self, handle: AssetHandle) -> Option<(usize, u32)> {
        let index = usize::try_from(handle).ok()?.checked_sub(1)?;
        self.open.get(index).copied().flatten()
    }

    fn slot_mut(&mut self, handle: AssetHandle) -> Option<&mut (usize, u32)> {
        let index = usize::try_from(handle).ok()?.checked_sub(1)?;
        self.open.get_mut(index)?.as_mut()
    }
}

impl AssetFs for MemoryAssets {
    fn open(&mut self, path: &str) -> Option<AssetHandle> {
        let file = self.files.iter().position(|(name, _)| *name == path)?;
        let slot = match self.open.iter().position(Option::is_none) {
            Some(free) => free,
            None => {
                self.open.push(None);
                self.open.len() - 1
            }
        };
        self.open[slot] = Some((file, 0));
        Some(slot as AssetHandle + 1)
    }

    fn read(&mut self, handle: AssetHandle, dst: &mut [u8]) -> usize {
        let Some((file, pos)) = self.slot(handle) else {
            return 0;
        };
        let data = self.files[file].1;
        let start = (pos as usize).min(data.len());
        let count = dst.len().min(data.len() - start);
        dst[..count].copy_from_slice(&data[start..start + count]);
        if let Some(slot) = self.slot_mut(handle) {
            slot.1 += count as u32;
        }
        count
    }

    fn seek(&mut self, handle: AssetHandle, offset: u32) {
        let Some((file, _)) = self.slot(handle) else {
            return;
        };
        let len = self.files[file].1.len() as u32;
        if let Some(slot) = self.slot_mut(handle) {
            slot.1 = offset.min(len);
        }
    }

    fn tell(&self, handle: AssetHandle) -> u32 {
        self.slot(handle).map_or(0, |(_, pos)| pos)
    }

    fn size(&self, handle: AssetHandle) -> u32 {
        self.slot(handle).map_or(0, |(file, _)| self.files[file].1.len() as u32)
    }

    fn close(&mut self, handle: AssetHandle) {
        if let Some(index) = usize::try_from(handle).ok().and_then(|h| h.checked_sub(1)) {
            if let Some(slot) = self.open.get_mut(index) {
                *slot = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_and_seeks() {
        let mut assets = MemoryAssets::new().with_file("EGAHEAD.CK4", b"abcdefgh");
        let handle = assets.open("EGAHEAD.CK4").unwrap();
        assert!(handle > 0);
        assert_eq!(assets.size(handle), 8);

        let mut buf = [0u8; 5];
        assert_eq!(assets.read(handle, &mut buf), 5);
        assert_eq!(&buf, b"abcde");
        assert_eq!(assets.read(handle, &mut buf), 3);
        assert_eq!(assets.tell(handle), 8);

        assets.seek(handle, 2);
        assert_eq!(assets.read(handle, &mut buf[..2]), 2);
        assert_eq!(&buf[..2], b"cd");
    }

    #[test]
    fn missing_file_does_not_open() {
        let mut assets = MemoryAssets::new();
        assert_eq!(assets.open("GAMEMAPS.CK4"), None);
    }

    #[test]
    fn handles_are_reused_after_close() {
        let mut assets = MemoryAssets::new().with_file("A", b"1").with_file("B", b"2");
        let a = assets.open("A").unwrap();
        let b = assets.open("B").unwrap();
        assert_ne!(a, b);
        assets.close(a);
        assert_eq!(assets.open_count(), 1);
        assert_eq!(assets.open("B"), Some(a));
        assert_eq!(assets.read(0, &mut [0u8; 1]), 0);
    }
}
