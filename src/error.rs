//! Library-wide error and result types.

use std::fmt;
use std::io;

use uuid::Uuid;

/// Result alias used throughout luniikit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Error messages are kept intentionally terse; callers that need richer
/// context should wrap `Error` in their own type.
#[derive(Debug)]
pub enum Error {
    /// A format version is present in the data but not supported by this
    /// parser.
    UnsupportedVersion(u16),
    /// The buffer ended before all expected bytes could be read.
    UnexpectedEof,
    /// An offset or index field would read outside the valid region.
    InvalidRange,
    /// A structural constraint was violated (message describes which one).
    Parse(&'static str),
    /// Ciphering failed. Distinct from [`Error::Io`] so callers can report
    /// "pack unreadable" rather than a generic I/O problem.
    Cipher(&'static str),
    /// The pack is already present in the device pack index.
    DuplicatePack(Uuid),
    /// The pack is absent from the device pack index.
    PackNotFound(Uuid),
    /// A reorder position lies outside the pack index.
    BadPosition { position: usize, len: usize },
    /// The device storage area is unavailable or could not be prepared.
    Storage(&'static str),
    /// An underlying I/O operation failed.
    Io(io::Error),
    /// The `md` metadata document could not be read or written.
    Metadata(serde_yaml::Error),
    /// The portable `project.json` document could not be read or written.
    Project(serde_json::Error),
    /// The backup archive could not be produced.
    Archive(zip::result::ZipError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedVersion(v) => write!(f, "unsupported version: {v}"),
            Error::UnexpectedEof => write!(f, "unexpected end of buffer"),
            Error::InvalidRange => write!(f, "invalid offset or index"),
            Error::Parse(s) => write!(f, "parse error: {s}"),
            Error::Cipher(s) => write!(f, "cipher error: {s}"),
            Error::DuplicatePack(uuid) => write!(f, "pack already in index: {uuid}"),
            Error::PackNotFound(uuid) => write!(f, "pack not in index: {uuid}"),
            Error::BadPosition { position, len } => {
                write!(f, "position {position} out of bounds for index of {len}")
            }
            Error::Storage(s) => write!(f, "storage error: {s}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Metadata(e) => write!(f, "metadata error: {e}"),
            Error::Project(e) => write!(f, "project document error: {e}"),
            Error::Archive(e) => write!(f, "archive error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Metadata(e) => Some(e),
            Error::Project(e) => Some(e),
            Error::Archive(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Metadata(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Project(e)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Archive(e)
    }
}
