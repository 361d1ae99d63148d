//! # keen64 HAL: files and save storage
//!
//! The file backend the engine core calls into on the N64. Read-only game
//! data comes from DragonFS in the cartridge ROM; config and save games live
//! in battery-backed cartridge SRAM, which the CPU can only reach through
//! Peripheral Interface (PI) DMA.
//!
//! ## Layers
//!
//! ```text
//! FileSystem        open/read/write/seek/size/close, Handle::{User, Asset}
//!   └─ FileTable    name -> region, cursor, presence marker
//!       └─ SectorIo byte ranges -> whole aligned blocks (read-modify-write)
//!           └─ AddressMap  linear offset -> banked PI address
//!               └─ SaveDevice::transfer  one DMA, interrupts masked
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use keen64_hal::{bank::Variant, fs::FileSystem, layout};
//!
//! let device = unsafe { PiSram::new(Libdragon) };
//! let assets = unsafe { DragonFs::init()? };
//! let mut fs = FileSystem::startup(device, Variant::SRAM_768K, layout::default_files(), assets)?;
//!
//! let cfg = fs.create_user_file("CONFIG.CK4")?;
//! fs.write(cfg, &settings)?;
//! fs.close(cfg)?;
//! ```
//!
//! ## Save Layout
//!
//! Regions are packed in declaration order. Each one starts with a 4-byte
//! presence marker (on variants that use markers) followed by its payload.
//! Nothing on the device describes the layout; it is fixed at build time.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod assets;
pub mod bank;
pub mod device;
pub mod error;
pub mod fmtbuf;
pub mod fs;
pub mod irq;
pub mod layout;
pub mod logger;
pub mod pi;
pub mod sector;
pub mod table;

#[cfg(target_arch = "mips")]
pub(crate) mod sys;

pub use error::{Result, StorageError};
