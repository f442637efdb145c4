use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum WorldDiffError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Bit width above 16, or an entry count the padding rule cannot repair.
    #[error("Malformed palette: {0}")]
    MalformedPalette(String),

    /// A persisted tree is missing a field or holds the wrong tag type.
    #[error("Unexpected tag shape: {0}")]
    UnexpectedTag(String),

    #[error("Unsupported data version: {0}")]
    UnsupportedVersion(i32),

    #[error("Section y={y} outside of {min}..={max}")]
    SectionOutOfRange { y: i32, min: i8, max: i8 },

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Registry error: {0}")]
    RegistryError(String),

    #[error("Region error in {path:?}: {msg}")]
    RegionError { path: PathBuf, msg: String },

    #[error("Column layouts differ: {0} vs {1}")]
    VersionMismatch(&'static str, &'static str),
}

impl WorldDiffError {
    pub fn unexpected_tag(msg: impl Into<String>) -> Self {
        WorldDiffError::UnexpectedTag(msg.into())
    }

    pub fn region(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        WorldDiffError::RegionError {
            path: path.into(),
            msg: msg.into(),
        }
    }
}
