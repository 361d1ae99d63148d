//! libdragon entry points used by the target-only backends.

use core::ffi::{c_char, c_int, c_void};

/// `DEBUG_FEATURE_LOG_ISVIEWER` from `debug.h`.
pub const DEBUG_FEATURE_LOG_ISVIEWER: u32 = 1 << 1;

/// `DFS_DEFAULT_LOCATION` from `dragonfs.h`.
pub const DFS_DEFAULT_LOCATION: u32 = 0xB010_1000;

pub const SEEK_SET: c_int = 0;

unsafe extern "C" {
    pub unsafe fn disable_interrupts();
    pub unsafe fn enable_interrupts();

    pub unsafe fn data_cache_hit_writeback_invalidate(addr: *mut c_void, length: u32);
    pub unsafe fn data_cache_hit_invalidate(addr: *mut c_void, length: u32);

    pub unsafe fn debug_init(features: u32) -> bool;
    pub unsafe fn debugf(fmt: *const c_char, ...);

    pub unsafe fn dfs_init(base_fs_loc: u32) -> c_int;
    pub unsafe fn dfs_open(path: *const c_char) -> c_int;
    pub unsafe fn dfs_read(buf: *mut c_void, size: c_int, count: c_int, handle: u32) -> c_int;
    pub unsafe fn dfs_seek(handle: u32, offset: c_int, origin: c_int) -> c_int;
    pub unsafe fn dfs_tell(handle: u32) -> c_int;
    pub unsafe fn dfs_size(handle: u32) -> c_int;
    pub unsafe fn dfs_close(handle: u32) -> c_int;
}
