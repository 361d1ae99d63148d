//! Cartridge SRAM over PI DMA.
//!
//! Interrupts stay masked from the first busy-wait until the interrupt is
//! acknowledged, on every exit. A transfer that never retires resets the
//! PI before reporting [`DeviceTimeout`](crate::StorageError::DeviceTimeout).

use core::sync::atomic::{fence, Ordering};

use log::warn;

use crate::{
    device::{check_transfer, Direction, SaveDevice, StagingBuffer},
    irq::{InterruptGate, IrqGuard},
    pi::{physical_address, wait_while_busy, PiControl, PiPort, PiRegisters, DEFAULT_POLL_LIMIT},
    Result,
};

/// Orders register writes as the PI sees them.
#[inline(always)]
fn barrier() {
    fence(Ordering::SeqCst);
}

#[cfg(target_arch = "mips")]
#[inline(always)]
fn writeback_invalidate(buffer: *mut u8, len: usize) {
    unsafe { crate::sys::data_cache_hit_writeback_invalidate(buffer.cast(), len as u32) }
}

#[cfg(target_arch = "mips")]
#[inline(always)]
fn invalidate(buffer: *mut u8, len: usize) {
    unsafe { crate::sys::data_cache_hit_invalidate(buffer.cast(), len as u32) }
}

// host memory is coherent with the stand-in bus
#[cfg(not(target_arch = "mips"))]
fn writeback_invalidate(_buffer: *mut u8, _len: usize) {}

#[cfg(not(target_arch = "mips"))]
fn invalidate(_buffer: *mut u8, _len: usize) {}

/// Console SRAM behind libdragon's interrupt control.
#[cfg(target_arch = "mips")]
pub type ConsoleSram = PiSram<crate::irq::Libdragon>;

pub struct PiSram<G: InterruptGate, R: PiPort = &'static mut PiRegisters> {
    port: R,
    gate: G,
    poll_limit: u32,
}

impl<G: InterruptGate> PiSram<G> {
    /// Take the PI and set domain 2 up for SRAM.
    ///
    /// # Safety
    ///
    /// Console only. There must be no other `PiSram` alive, and nothing
    /// outside an interrupt handler masked by `gate` may start PI DMA.
    pub unsafe fn new(gate: G) -> Self {
        Self::with_port(gate, unsafe { PiRegisters::new() })
    }
}

impl<G: InterruptGate, R: PiPort> PiSram<G, R> {
    /// Drive SRAM through `port`, programming its domain 2 timing.
    pub fn with_port(gate: G, mut port: R) -> Self {
        {
            let _irq = IrqGuard::new(&gate);
            port.configure_sram_timing();
        }
        Self { port, gate, poll_limit: DEFAULT_POLL_LIMIT }
    }

    /// Polls of `STATUS` before a transfer reports
    /// [`DeviceTimeout`](crate::StorageError::DeviceTimeout).
    pub fn with_poll_limit(mut self, limit: u32) -> Self {
        self.poll_limit = limit;
        self
    }
}

impl<G: InterruptGate, R: PiPort> SaveDevice for PiSram<G, R> {
    fn transfer(
        &mut self,
        direction: Direction,
        staging: &mut StagingBuffer,
        address: u32,
        len: usize,
    ) -> Result<()> {
        check_transfer(address, len);

        let buffer = staging.0.as_mut_ptr();
        let port = &mut self.port;
        let _irq = IrqGuard::new(&self.gate);

        wait_while_busy(|| port.status(), self.poll_limit)?;

        // dirty lines would be written over the DMA result, or never reach RDRAM
        writeback_invalidate(buffer, len);
        barrier();

        port.set_dram_addr(physical_address(buffer));
        barrier();
        port.set_cart_addr(address);
        barrier();
        match direction {
            Direction::Read => port.start_to_dram(len as u32),
            Direction::Write => port.start_to_cart(len as u32),
        }
        barrier();

        if let Err(err) = wait_while_busy(|| port.status(), self.poll_limit) {
            warn!("resetting PI after stuck transfer at {:#010x}", address);
            port.control(PiControl::RESET | PiControl::CLEAR_INTERRUPT);
            barrier();
            return Err(err);
        }

        if direction == Direction::Read {
            invalidate(buffer, len);
        }

        port.control(PiControl::CLEAR_INTERRUPT);
        barrier();
        Ok(())
    }
}
