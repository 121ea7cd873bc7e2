//! Streaming archive reader.
//!
//! [`ArchiveReader`] ties one reading session to the volume chain of an
//! archive. Every call is a blocking, in-order read on the currently open
//! volume; there is no random access.
//!
//! # Volume lifecycle
//! ```text
//! new(base) ─► open_volume ─► read_volume_header ─► read_header / read_block …
//!                  ▲                                         │
//!                  └──── next_volume ◄──── close_volume ◄────┘ (volume footer)
//! ```
//! Opening and advancing are separate steps so that a caller can, for
//! example, wait for removable media between them.

use std::io::Seek;
use std::path::{Path, PathBuf};

use crate::block::{read_block, BlockRead};
use crate::dict::Dictionary;
use crate::error::ReadError;
use crate::header::{read_header, Header};
use crate::session::{ReaderOptions, SessionState};
use crate::volume::{read_volume_header, VolumeFile, VolumeHeader};

#[derive(Debug)]
pub struct ArchiveReader {
    volume:  VolumeFile,
    session: SessionState,
}

impl ArchiveReader {
    /// Position a new session on volume 0 of `base_path`. Nothing is opened.
    pub fn new(base_path: impl Into<PathBuf>, options: ReaderOptions) -> Result<Self, ReadError> {
        Ok(Self {
            volume:  VolumeFile::new(base_path)?,
            session: SessionState::new(options),
        })
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn volume_index(&self) -> u32 {
        self.volume.index()
    }

    pub fn volume_path(&self) -> &Path {
        self.volume.path()
    }

    /// Byte offset within the open volume.
    pub fn position(&mut self) -> Result<u64, ReadError> {
        Ok(self.volume.file_mut()?.stream_position()?)
    }

    pub fn open_volume(&mut self) -> Result<(), ReadError> {
        self.volume.open()
    }

    pub fn close_volume(&mut self) -> Result<(), ReadError> {
        self.volume.close()
    }

    pub fn next_volume(&mut self) -> Result<(), ReadError> {
        self.volume.advance()
    }

    /// Read and validate the volume header at the start of the open volume.
    pub fn read_volume_header(&mut self) -> Result<VolumeHeader, ReadError> {
        let expected = self.volume.index();
        let path = self.volume.path().to_path_buf();
        let file = self.volume.file_mut()?;
        read_volume_header(file, &mut self.session, expected, &path)
    }

    pub fn read_header(&mut self, allow_resync: bool) -> Result<Header, ReadError> {
        let file = self.volume.file_mut()?;
        read_header(file, &self.session, allow_resync)
    }

    pub fn read_block(&mut self, block_header: &Dictionary, skip: bool) -> Result<BlockRead, ReadError> {
        let file = self.volume.file_mut()?;
        read_block(file, block_header, skip)
    }
}
