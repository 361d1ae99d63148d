use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use keen64_hal::{
    bank::Variant,
    device::memory::{MemoryDevice, BLANK},
    table::{FileSpec, FileTable, RegionState},
};
use tracing::{debug, info, warn};

/// Which device and save table an image is read with.
pub struct Layout {
    pub variant: Variant,
    pub files: &'static [FileSpec],
}

#[derive(Debug, PartialEq, Eq)]
pub struct Listing {
    pub name: &'static str,
    pub size: u32,
    pub start: u32,
    pub present: bool,
}

fn mount(layout: &Layout, image: &Path) -> Result<FileTable<MemoryDevice>> {
    let bytes = fs::read(image).with_context(|| format!("reading {}", image.display()))?;
    if bytes.len() != layout.variant.capacity as usize {
        warn!(
            "{} is {} bytes, expected {}; padding or truncating",
            image.display(),
            bytes.len(),
            layout.variant.capacity
        );
    }
    let device = MemoryDevice::from_image(&layout.variant, &bytes);
    FileTable::mount(device, layout.variant, layout.files)
        .with_context(|| format!("mounting save table on {}", image.display()))
}

fn store(table: FileTable<MemoryDevice>, image: &Path) -> Result<()> {
    let device = table.into_device();
    debug!("{:?}", device.stats());
    fs::write(image, device.image()).with_context(|| format!("writing {}", image.display()))
}

pub fn list(layout: &Layout, image: &Path) -> Result<Vec<Listing>> {
    let table = mount(layout, image)?;
    Ok(table
        .entries()
        .iter()
        .map(|entry| Listing {
            name: entry.name(),
            size: entry.size(),
            start: entry.start(),
            present: entry.state() == RegionState::Initialized,
        })
        .collect())
}

pub fn format(layout: &Layout, image: &Path) -> Result<()> {
    let blank = vec![BLANK; layout.variant.capacity as usize];
    fs::write(image, blank).with_context(|| format!("writing {}", image.display()))?;
    info!("formatted {} ({} bytes)", image.display(), layout.variant.capacity);
    Ok(())
}

pub fn create(layout: &Layout, image: &Path, name: &str) -> Result<()> {
    let mut table = mount(layout, image)?;
    let existed = table.is_present(name);
    table
        .open_for_write(name)
        .with_context(|| format!("creating {}", name))?;
    if existed {
        info!("{} already exists", name);
    }
    store(table, image)
}

pub fn export(layout: &Layout, image: &Path, name: &str, output: &Path) -> Result<()> {
    let mut table = mount(layout, image)?;
    let index = table.open_for_read(name).with_context(|| format!("opening {}", name))?;
    let mut data = vec![0u8; table.entry(index)?.size() as usize];
    let read = table.read(index, &mut data)?;
    if read != data.len() {
        bail!("short read of {}: {} of {} bytes", name, read, data.len());
    }
    fs::write(output, &data).with_context(|| format!("writing {}", output.display()))?;
    info!("exported {} to {}", name, output.display());
    Ok(())
}

pub fn import(layout: &Layout, image: &Path, name: &str, input: &Path) -> Result<()> {
    let contents = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let mut table = mount(layout, image)?;
    let index = table.open_for_write(name).with_context(|| format!("opening {}", name))?;

    let size = table.entry(index)?.size() as usize;
    if contents.len() > size {
        bail!("{} is {} bytes but {} holds only {}", input.display(), contents.len(), name, size);
    }
    let mut data = vec![0u8; size];
    data[..contents.len()].copy_from_slice(&contents);
    table.write(index, &data)?;
    store(table, image)
}
