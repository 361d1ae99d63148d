//! # SRAM Banking
//!
//! 256 Kbit SRAM is one flat 32 KiB window at `$0800_0000`. The larger
//! parts are built from several 32 KiB chips and select the chip with
//! cartridge address bits 18-19, so consecutive banks are 256 KiB apart
//! on the bus:
//!
//! ```text
//! linear offset   bus address
//! $00000-$07FFF   $0800_0000-$0800_7FFF   bank 0
//! $08000-$0FFFF   $0804_0000-$0804_7FFF   bank 1
//! $10000-$17FFF   $0808_0000-$0808_7FFF   bank 2
//! ```
//!
//! The rest of the crate works in linear offsets; only the transfer call
//! sees bus addresses.

use bit_field::BitField;

use crate::pi::SRAM_BASE;

/// Width of the bank-select field.
pub const BANK_SELECT_BITS: usize = 2;

/// How linear offsets land on the cartridge bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressMap {
    /// One window, offset added to `base`.
    Flat { base: u32 },
    /// `1 << bank_shift` byte banks, bank index packed at `select_shift`.
    Banked { base: u32, bank_shift: u8, select_shift: u8 },
}

impl AddressMap {
    /// Bus address of `linear`.
    pub fn map(&self, linear: u32) -> u32 {
        match *self {
            AddressMap::Flat { base } => base + linear,
            AddressMap::Banked { base, bank_shift, select_shift } => {
                let bank = linear >> bank_shift;
                debug_assert!(
                    bank < (1 << BANK_SELECT_BITS),
                    "offset {:#x} past last bank",
                    linear
                );
                let select = select_shift as usize;
                let mut address = linear.get_bits(0..bank_shift as usize);
                address.set_bits(select..select + BANK_SELECT_BITS, bank);
                base + address
            }
        }
    }

    /// Linear offset of a bus address produced by [`map`](Self::map).
    pub fn unmap(&self, address: u32) -> u32 {
        match *self {
            AddressMap::Flat { base } => address - base,
            AddressMap::Banked { base, bank_shift, select_shift } => {
                let address = address - base;
                let select = select_shift as usize;
                let bank = address.get_bits(select..select + BANK_SELECT_BITS);
                (bank << bank_shift) | address.get_bits(0..bank_shift as usize)
            }
        }
    }

    /// Bank size in bytes, `None` for flat devices.
    pub fn bank_size(&self) -> Option<u32> {
        match *self {
            AddressMap::Flat { .. } => None,
            AddressMap::Banked { bank_shift, .. } => Some(1 << bank_shift),
        }
    }
}

/// A save device revision: how it is addressed, how big it is, and
/// whether regions carry a presence marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Variant {
    pub map: AddressMap,
    pub capacity: u32,
    pub presence_marker: bool,
}

impl Variant {
    /// 256 Kbit: one 32 KiB window.
    pub const SRAM_256K: Variant = Variant {
        map: AddressMap::Flat { base: SRAM_BASE },
        capacity: 0x8000,
        presence_marker: true,
    };

    /// 768 Kbit: three 32 KiB banks.
    pub const SRAM_768K: Variant = Variant::banked(3);

    /// 1 Mbit: four 32 KiB banks.
    pub const SRAM_1M: Variant = Variant::banked(4);

    const fn banked(banks: u32) -> Variant {
        Variant {
            map: AddressMap::Banked { base: SRAM_BASE, bank_shift: 15, select_shift: 18 },
            capacity: banks << 15,
            presence_marker: true,
        }
    }

    /// Same device, regions without presence markers. Every declared file
    /// counts as existing.
    pub const fn without_markers(self) -> Variant {
        Variant { presence_marker: false, ..self }
    }

    /// Bytes each region spends on its marker.
    pub const fn marker_len(&self) -> u32 {
        if self.presence_marker { crate::table::MARKER_LEN } else { 0 }
    }
}
