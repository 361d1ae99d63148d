/// Errors surfaced by the file and save storage layers.
///
/// Unknown names and bad handles are configuration errors the caller is
/// expected to check for. Bad transfer lengths or alignment are bugs in
/// the backend wiring and panic instead of showing up here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// No save file with that name is declared in the file table.
    #[error("no save file with that name is declared")]
    NotFound,
    /// The save file is declared but has never been created.
    #[error("save file has never been created")]
    NotPresent,
    /// The handle does not refer to a file this backend knows about.
    #[error("handle does not refer to an open file")]
    InvalidHandle,
    /// An access reached past the end of save media, or the declared
    /// files do not fit on it.
    #[error("access beyond the end of save media")]
    OutOfBounds,
    /// More files were declared than the table has slots for.
    #[error("too many save files declared")]
    TableFull,
    /// The PI stayed busy past the poll limit.
    #[error("save media did not finish the transfer in time")]
    DeviceTimeout,
    /// The asset filesystem refused to open the file.
    #[error("asset file could not be opened")]
    AssetUnavailable,
    /// A whole-file load returned fewer bytes than the file size.
    #[error("file ended before its declared size")]
    ShortRead,
}

pub type Result<T> = core::result::Result<T, StorageError>;
