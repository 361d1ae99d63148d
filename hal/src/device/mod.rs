//! # Save Device Transfers
//!
//! The lowest layer: move one aligned block between the staging buffer and
//! the device. Everything above works in byte ranges and never touches the
//! bus itself.
//!
//! Two implementations:
//!
//! - [`PiSram`](pi_sram::PiSram): PI DMA against cartridge SRAM.
//! - [`MemoryDevice`](memory::MemoryDevice): a RAM image with the same
//!   contract, used by tests and the host save tool.

pub mod memory;
pub mod pi_sram;

use crate::Result;

/// Size of one transfer block, and of the staging buffer.
pub const BLOCK_SIZE: usize = 512;

/// DMA length and address granularity.
pub const DMA_ALIGN: usize = 16;

/// The single scratch buffer every transfer goes through.
///
/// 16-byte aligned so a transfer never shares a data cache line with
/// anything else.
#[repr(C, align(16))]
pub struct StagingBuffer(pub [u8; BLOCK_SIZE]);

impl StagingBuffer {
    pub const fn new() -> Self {
        Self([0; BLOCK_SIZE])
    }
}

impl Default for StagingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Device -> staging buffer.
    Read,
    /// Staging buffer -> device.
    Write,
}

/// A block device reachable only by DMA.
pub trait SaveDevice {
    /// Move the first `len` bytes of `staging` to or from bus `address`.
    ///
    /// Blocks until the transfer has retired. `len` must be a non-zero
    /// multiple of [`DMA_ALIGN`] no larger than [`BLOCK_SIZE`], and
    /// `address` must be [`DMA_ALIGN`]-aligned; anything else panics.
    fn transfer(
        &mut self,
        direction: Direction,
        staging: &mut StagingBuffer,
        address: u32,
        len: usize,
    ) -> Result<()>;
}

/// Panics unless `address`/`len` describe a legal DMA.
#[inline(always)]
pub(crate) fn check_transfer(address: u32, len: usize) {
    assert!(
        len > 0 && len % DMA_ALIGN == 0 && len <= BLOCK_SIZE,
        "illegal DMA length {}",
        len
    );
    assert!(
        address as usize % DMA_ALIGN == 0,
        "unaligned DMA address {:#010x}",
        address
    );
}
