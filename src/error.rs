use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::dict::{DecodeError, DictError};
use crate::header::Magic;

/// How far a failure reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// One logical header is unusable; skip it and keep reading.
    Minor,
    /// The archive cannot be read any further from this point.
    Fatal,
}

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Cannot open volume {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("{0} is not a regular file")]
    NotRegularFile(PathBuf),
    #[error("No volume is open")]
    NoVolumeOpen,
    #[error("Archive has an invalid base path: {0}")]
    InvalidBasePath(PathBuf),
    #[error("Invalid header magic {found}: not a valid archive, or created with a different version")]
    InvalidMagic { found: String },
    #[error("Unexpected header: found {found}, expected {expected}")]
    UnexpectedMagic { found: Magic, expected: Magic },
    #[error("Bad header checksum: stored {stored:#010x}, computed {computed:#010x}")]
    HeaderChecksum { stored: u32, computed: u32 },
    #[error("Malformed header: {0}")]
    Malformed(#[from] DecodeError),
    #[error("Header is missing a required field: {0}")]
    Field(#[from] DictError),
    #[error("Archive id mismatch: found {found:08x}, expected {expected:08x}")]
    ArchiveIdMismatch { found: u32, expected: u32 },
    #[error("Wrong volume number in {path}: found {found}, expected {expected}")]
    VolumeNumber { path: PathBuf, found: u32, expected: u32 },
    #[error("Archive uses file format {found:?}, this session expects {expected:?}")]
    FileFormat { found: String, expected: String },
    #[error("Block size {size} exceeds the maximum of {max} bytes")]
    BlockTooLarge { size: u32, max: u32 },
    #[error("No header marker found within {scanned} bytes")]
    ResyncLimit { scanned: u64 },
}

impl ReadError {
    pub fn severity(&self) -> Severity {
        match self {
            ReadError::HeaderChecksum { .. } => Severity::Minor,
            _ => Severity::Fatal,
        }
    }

    pub fn is_minor(&self) -> bool {
        self.severity() == Severity::Minor
    }

    /// The underlying stream ended in the middle of a read.
    pub fn is_eof(&self) -> bool {
        matches!(self, ReadError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}
