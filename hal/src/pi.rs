//! # Peripheral Interface Registers
//!
//! The PI is the N64's cartridge bus DMA engine. Cartridge SRAM is mapped
//! in PI domain 2 and cannot be read or written by the CPU directly; every
//! access is a DMA between RDRAM and the cartridge.
//!
//! ## Register Layout (`$A460_0000`)
//!
//! | Offset | Name         | Description                                   |
//! |--------|--------------|-----------------------------------------------|
//! | `$00`  | DRAM_ADDR    | RDRAM address (physical, 8-byte aligned)      |
//! | `$04`  | CART_ADDR    | Cartridge bus address                         |
//! | `$08`  | RD_LEN       | Length - 1; writing starts RDRAM -> cartridge |
//! | `$0C`  | WR_LEN       | Length - 1; writing starts cartridge -> RDRAM |
//! | `$10`  | STATUS       | Read: [`PiStatus`]. Write: [`PiControl`]      |
//! | `$14`  | BSD_DOM1_*   | Domain 1 timing (ROM), four registers         |
//! | `$24`  | BSD_DOM2_*   | Domain 2 timing (SRAM), four registers        |
//!
//! The length registers are named from the cartridge's point of view, so
//! "read" means the cartridge reads from RDRAM.

use volatile_register::RW;

use crate::{Result, StorageError};

/// Uncached KSEG1 address of the PI register block.
pub const PI_BASE: usize = 0xA460_0000;

/// Cartridge bus address of SRAM (PI domain 2).
pub const SRAM_BASE: u32 = 0x0800_0000;

/// Domain 2 timings used by every retail SRAM cartridge.
pub const SRAM_LATENCY: u32 = 0x05;
pub const SRAM_PULSE_WIDTH: u32 = 0x0C;
pub const SRAM_PAGE_SIZE: u32 = 0x0D;
pub const SRAM_RELEASE: u32 = 0x02;

/// Polls of `STATUS` before a transfer is considered hung. A 512-byte
/// SRAM transfer retires in well under ten thousand polls.
pub const DEFAULT_POLL_LIMIT: u32 = 1_000_000;

bitflags::bitflags! {
    /// Value read back from `STATUS`.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct PiStatus: u32 {
        /// A DMA is in progress.
        const DMA_BUSY  = 0b0001;
        /// A CPU I/O access to the cartridge bus is in progress.
        const IO_BUSY   = 0b0010;
        /// The last DMA was started while the PI was busy.
        const ERROR     = 0b0100;
        /// A DMA completed and raised the PI interrupt.
        const INTERRUPT = 0b1000;
    }

    /// Value written to `STATUS`.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct PiControl: u32 {
        /// Abort any DMA and reset the controller.
        const RESET           = 0b01;
        /// Acknowledge the PI interrupt.
        const CLEAR_INTERRUPT = 0b10;
    }
}

impl PiStatus {
    #[inline(always)]
    pub fn is_busy(self) -> bool {
        self.intersects(PiStatus::DMA_BUSY | PiStatus::IO_BUSY)
    }
}

/// PI hardware layout at [`PI_BASE`].
#[repr(C)]
pub struct PiRegisters {
    pub dram_addr: RW<u32>,
    pub cart_addr: RW<u32>,
    pub rd_len: RW<u32>,
    pub wr_len: RW<u32>,
    pub status: RW<u32>,
    pub dom1_latency: RW<u32>,
    pub dom1_pulse_width: RW<u32>,
    pub dom1_page_size: RW<u32>,
    pub dom1_release: RW<u32>,
    pub dom2_latency: RW<u32>,
    pub dom2_pulse_width: RW<u32>,
    pub dom2_page_size: RW<u32>,
    pub dom2_release: RW<u32>,
}

impl PiRegisters {
    /// Get a reference to the PI registers at `$A460_0000`.
    ///
    /// # Safety
    ///
    /// Only meaningful on the console, and the caller must be the sole
    /// owner of the PI for the lifetime of the reference.
    #[inline(always)]
    pub unsafe fn new() -> &'static mut PiRegisters {
        unsafe { &mut *(PI_BASE as *mut PiRegisters) }
    }

    #[inline(always)]
    pub fn status(&self) -> PiStatus {
        PiStatus::from_bits_truncate(self.status.read())
    }

    /// Program domain 2 for SRAM access.
    pub fn configure_sram_timing(&mut self) {
        unsafe {
            self.dom2_latency.write(SRAM_LATENCY);
            self.dom2_pulse_width.write(SRAM_PULSE_WIDTH);
            self.dom2_page_size.write(SRAM_PAGE_SIZE);
            self.dom2_release.write(SRAM_RELEASE);
        }
    }
}

/// The register accesses a save transfer makes.
///
/// [`PiRegisters`] is the hardware; anything else stands in for it.
pub trait PiPort {
    fn status(&self) -> PiStatus;
    fn control(&mut self, control: PiControl);
    fn set_dram_addr(&mut self, address: u32);
    fn set_cart_addr(&mut self, address: u32);
    /// Start a cartridge -> RDRAM transfer of `len` bytes (`WR_LEN`).
    fn start_to_dram(&mut self, len: u32);
    /// Start an RDRAM -> cartridge transfer of `len` bytes (`RD_LEN`).
    fn start_to_cart(&mut self, len: u32);
    fn configure_sram_timing(&mut self);
}

impl PiPort for PiRegisters {
    #[inline(always)]
    fn status(&self) -> PiStatus {
        PiRegisters::status(self)
    }

    #[inline(always)]
    fn control(&mut self, control: PiControl) {
        unsafe { self.status.write(control.bits()) }
    }

    #[inline(always)]
    fn set_dram_addr(&mut self, address: u32) {
        unsafe { self.dram_addr.write(address) }
    }

    #[inline(always)]
    fn set_cart_addr(&mut self, address: u32) {
        unsafe { self.cart_addr.write(address) }
    }

    #[inline(always)]
    fn start_to_dram(&mut self, len: u32) {
        unsafe { self.wr_len.write(len - 1) }
    }

    #[inline(always)]
    fn start_to_cart(&mut self, len: u32) {
        unsafe { self.rd_len.write(len - 1) }
    }

    fn configure_sram_timing(&mut self) {
        PiRegisters::configure_sram_timing(self)
    }
}

impl<P: PiPort + ?Sized> PiPort for &mut P {
    fn status(&self) -> PiStatus {
        (**self).status()
    }

    fn control(&mut self, control: PiControl) {
        (**self).control(control)
    }

    fn set_dram_addr(&mut self, address: u32) {
        (**self).set_dram_addr(address)
    }

    fn set_cart_addr(&mut self, address: u32) {
        (**self).set_cart_addr(address)
    }

    fn start_to_dram(&mut self, len: u32) {
        (**self).start_to_dram(len)
    }

    fn start_to_cart(&mut self, len: u32) {
        (**self).start_to_cart(len)
    }

    fn configure_sram_timing(&mut self) {
        (**self).configure_sram_timing()
    }
}

/// Spin until `status` reports the PI idle, giving up after `limit` polls.
pub fn wait_while_busy(mut status: impl FnMut() -> PiStatus, limit: u32) -> Result<()> {
    for _ in 0..limit {
        if !status().is_busy() {
            return Ok(());
        }
    }
    log::warn!("PI still busy after {} polls", limit);
    Err(StorageError::DeviceTimeout)
}

/// Translate a KSEG0/KSEG1 pointer to the physical address the PI expects.
#[inline(always)]
pub fn physical_address(ptr: *const u8) -> u32 {
    (ptr as usize as u32) & 0x1FFF_FFFF
}
