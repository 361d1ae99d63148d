//! Save tables shipped with each episode build.
//!
//! All three episodes use 768 Kbit SRAM: a 2 KiB config file followed by
//! one save slot that takes most of the rest.

use crate::table::FileSpec;

pub const CONFIG_SIZE: u32 = 2048;
pub const SAVEGAME_SIZE: u32 = 98304 - 4096;

pub const EP4_FILES: [FileSpec; 2] = [
    FileSpec::new("CONFIG.CK4", CONFIG_SIZE),
    FileSpec::new("SAVEGAM0.CK4", SAVEGAME_SIZE),
];

pub const EP5_FILES: [FileSpec; 2] = [
    FileSpec::new("CONFIG.CK5", CONFIG_SIZE),
    FileSpec::new("SAVEGAM0.CK5", SAVEGAME_SIZE),
];

pub const EP6_FILES: [FileSpec; 2] = [
    FileSpec::new("CONFIG.CK6", CONFIG_SIZE),
    FileSpec::new("SAVEGAM0.CK6", SAVEGAME_SIZE),
];

/// Table for `episode` (4, 5 or 6).
pub fn episode_files(episode: u8) -> Option<&'static [FileSpec]> {
    match episode {
        4 => Some(&EP4_FILES),
        5 => Some(&EP5_FILES),
        6 => Some(&EP6_FILES),
        _ => None,
    }
}

/// Table of the episode this crate was built for (`ep4`/`ep5`/`ep6`
/// feature; the highest one wins if several are enabled).
pub fn default_files() -> &'static [FileSpec] {
    if cfg!(feature = "ep6") {
        &EP6_FILES
    } else if cfg!(feature = "ep5") {
        &EP5_FILES
    } else {
        &EP4_FILES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::Variant;

    #[test]
    fn every_episode_fits_768k() {
        let variant = Variant::SRAM_768K;
        for episode in 4..=6 {
            let files = episode_files(episode).unwrap();
            let used: u32 = files.iter().map(|f| f.size() + variant.marker_len()).sum();
            assert!(used <= variant.capacity, "episode {} needs {:#x}", episode, used);
        }
    }

    #[test]
    fn unknown_episode() {
        assert!(episode_files(1).is_none());
    }
}
