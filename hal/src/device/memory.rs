//! RAM-backed save device.
//!
//! Behaves like the PI path as far as callers can tell: same length and
//! alignment checks, bus addresses decoded through the variant's
//! [`AddressMap`]. Also keeps counters so tests can see what actually hit
//! the device.

use alloc::{boxed::Box, vec};

use crate::{
    bank::{AddressMap, Variant},
    device::{check_transfer, Direction, SaveDevice, StagingBuffer},
    Result, StorageError,
};

/// Fill value of a device that has never been written.
pub const BLANK: u8 = 0xFF;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub reads: u32,
    pub writes: u32,
}

pub struct MemoryDevice {
    image: Box<[u8]>,
    map: AddressMap,
    stats: TransferStats,
    hang_after: Option<u32>,
}

impl MemoryDevice {
    /// A blank device of `variant`'s size.
    pub fn new(variant: &Variant) -> Self {
        Self::with_image(variant, vec![BLANK; variant.capacity as usize].into_boxed_slice())
    }

    /// A device preloaded with `bytes`, padded with [`BLANK`] or truncated
    /// to the variant's size.
    pub fn from_image(variant: &Variant, bytes: &[u8]) -> Self {
        let mut image = vec![BLANK; variant.capacity as usize].into_boxed_slice();
        let len = bytes.len().min(image.len());
        image[..len].copy_from_slice(&bytes[..len]);
        Self::with_image(variant, image)
    }

    fn with_image(variant: &Variant, image: Box<[u8]>) -> Self {
        Self {
            image,
            map: variant.map,
            stats: TransferStats::default(),
            hang_after: None,
        }
    }

    /// Linear contents of the device.
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    pub fn stats(&self) -> TransferStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = TransferStats::default();
    }

    /// After `transfers` more successful transfers, behave like a PI whose
    /// busy bit never clears.
    pub fn hang_after(&mut self, transfers: u32) {
        self.hang_after = Some(transfers);
    }
}

impl SaveDevice for MemoryDevice {
    fn transfer(
        &mut self,
        direction: Direction,
        staging: &mut StagingBuffer,
        address: u32,
        len: usize,
    ) -> Result<()> {
        check_transfer(address, len);

        let start = self.map.unmap(address) as usize;
        let end = start + len;
        assert!(end <= self.image.len(), "DMA past end of device: {:#x}..{:#x}", start, end);
        assert_eq!(
            self.map.unmap(address + len as u32 - 1) as usize,
            end - 1,
            "DMA at {:#010x} crosses a bank boundary",
            address
        );

        match self.hang_after {
            Some(0) => {
                log::warn!("simulated PI hang at {:#010x}", address);
                return Err(StorageError::DeviceTimeout);
            }
            Some(ref mut remaining) => *remaining -= 1,
            None => {}
        }

        match direction {
            Direction::Read => {
                staging.0[..len].copy_from_slice(&self.image[start..end]);
                self.stats.reads += 1;
            }
            Direction::Write => {
                self.image[start..end].copy_from_slice(&staging.0[..len]);
                self.stats.writes += 1;
            }
        }
        Ok(())
    }
}
