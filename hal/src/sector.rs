//! # Byte-Range Access
//!
//! [`SectorIo`] turns arbitrary `(offset, len)` requests into whole-block
//! transfers. Partial blocks are read into the staging buffer, patched and
//! written back; a write that covers a block exactly skips the read.
//!
//! ```text
//!            offset                          offset + len
//!               v                                 v
//! | block n    |###|        block n+1        |#| block n+2 ...
//!   RMW: read, patch, write    write only      RMW
//! ```
//!
//! Blocks never straddle a bank because the bank size is a multiple of
//! [`BLOCK_SIZE`].

use crate::{
    bank::{AddressMap, Variant},
    device::{Direction, SaveDevice, StagingBuffer, BLOCK_SIZE},
    Result, StorageError,
};

const BLOCK_MASK: u32 = !(BLOCK_SIZE as u32 - 1);

pub struct SectorIo<D> {
    device: D,
    map: AddressMap,
    capacity: u32,
    staging: StagingBuffer,
}

impl<D: SaveDevice> SectorIo<D> {
    pub fn new(device: D, variant: &Variant) -> Self {
        assert!(
            variant.capacity % BLOCK_SIZE as u32 == 0,
            "capacity {:#x} is not a whole number of blocks",
            variant.capacity
        );
        if let Some(bank) = variant.map.bank_size() {
            assert!(bank % BLOCK_SIZE as u32 == 0, "bank size {:#x} splits a block", bank);
        }
        Self {
            device,
            map: variant.map,
            capacity: variant.capacity,
            staging: StagingBuffer::new(),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    /// Fill `dst` from linear offset `offset`.
    pub fn read_range(&mut self, dst: &mut [u8], offset: u32) -> Result<()> {
        self.check_range(offset, dst.len())?;

        let mut offset = offset;
        let mut done = 0;
        while done < dst.len() {
            let block = offset & BLOCK_MASK;
            let within = (offset - block) as usize;
            let count = (BLOCK_SIZE - within).min(dst.len() - done);

            self.transfer_block(Direction::Read, block)?;
            dst[done..done + count].copy_from_slice(&self.staging.0[within..within + count]);

            done += count;
            offset += count as u32;
        }
        Ok(())
    }

    /// Store `src` at linear offset `offset`, leaving every byte outside
    /// the range untouched.
    pub fn write_range(&mut self, src: &[u8], offset: u32) -> Result<()> {
        self.check_range(offset, src.len())?;

        let mut offset = offset;
        let mut done = 0;
        while done < src.len() {
            let block = offset & BLOCK_MASK;
            let within = (offset - block) as usize;
            let count = (BLOCK_SIZE - within).min(src.len() - done);

            if count != BLOCK_SIZE {
                self.transfer_block(Direction::Read, block)?;
            }
            self.staging.0[within..within + count].copy_from_slice(&src[done..done + count]);
            self.transfer_block(Direction::Write, block)?;

            done += count;
            offset += count as u32;
        }
        Ok(())
    }

    fn check_range(&self, offset: u32, len: usize) -> Result<()> {
        let end = (offset as u64) + (len as u64);
        if end > self.capacity as u64 {
            log::warn!("save access {:#x}+{:#x} past capacity {:#x}", offset, len, self.capacity);
            return Err(StorageError::OutOfBounds);
        }
        Ok(())
    }

    #[inline(always)]
    fn transfer_block(&mut self, direction: Direction, block: u32) -> Result<()> {
        let address = self.map.map(block);
        self.device.transfer(direction, &mut self.staging, address, BLOCK_SIZE)
    }
}
