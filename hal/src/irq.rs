//! # Interrupt Masking
//!
//! The audio timer interrupt also drives PI DMA. A save transfer must not
//! be interleaved with it: both share the one DMA engine, and the staging
//! buffer is not reentrant. Hold an [`IrqGuard`] across register
//! programming and the busy-wait, and nowhere else.
//!
//! ```ignore
//! let _irq = IrqGuard::new(&gate);
//! // program PI registers, wait for completion
//! // interrupts come back when `_irq` is dropped
//! ```

use core::cell::Cell;

/// Something that can mask and unmask CPU interrupts.
///
/// Implementations must nest: two `disable` calls followed by one `enable`
/// leaves interrupts masked.
pub trait InterruptGate {
    fn disable(&self);
    fn enable(&self);
}

impl<G: InterruptGate + ?Sized> InterruptGate for &G {
    #[inline(always)]
    fn disable(&self) {
        (**self).disable()
    }

    #[inline(always)]
    fn enable(&self) {
        (**self).enable()
    }
}

/// Masks interrupts for as long as it is alive.
pub struct IrqGuard<'a, G: InterruptGate> {
    gate: &'a G,
}

impl<'a, G: InterruptGate> IrqGuard<'a, G> {
    #[inline(always)]
    pub fn new(gate: &'a G) -> Self {
        gate.disable();
        Self { gate }
    }
}

impl<'a, G: InterruptGate> Drop for IrqGuard<'a, G> {
    #[inline(always)]
    fn drop(&mut self) {
        self.gate.enable();
    }
}

/// libdragon's nesting `disable_interrupts` / `enable_interrupts`.
#[cfg(target_arch = "mips")]
#[derive(Clone, Copy, Debug, Default)]
pub struct Libdragon;

#[cfg(target_arch = "mips")]
impl InterruptGate for Libdragon {
    #[inline(always)]
    fn disable(&self) {
        unsafe { crate::sys::disable_interrupts() }
    }

    #[inline(always)]
    fn enable(&self) {
        unsafe { crate::sys::enable_interrupts() }
    }
}

/// Nesting counter standing in for the CPU on the host.
#[derive(Debug, Default)]
pub struct HostGate {
    depth: Cell<u32>,
}

impl HostGate {
    pub const fn new() -> Self {
        Self { depth: Cell::new(0) }
    }

    pub fn is_masked(&self) -> bool {
        self.depth.get() > 0
    }
}

impl InterruptGate for HostGate {
    fn disable(&self) {
        self.depth.set(self.depth.get() + 1);
    }

    fn enable(&self) {
        let depth = self.depth.get();
        assert!(depth > 0, "interrupts enabled more often than disabled");
        self.depth.set(depth - 1);
    }
}
