//! Header framing shared by volume headers, block headers and every other
//! structural record in the stream.
//!
//! ```text
//! magic[8] | archive_id:u32 | filesystem_id:u16 | dictionary frame
//! ```
//!
//! See [`crate::dict`] for the dictionary frame. A filesystem id of
//! [`FILESYSTEM_NONE`] marks a header that belongs to no filesystem.

use std::fmt;
use std::io::{self, Read, Seek, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;

use crate::dict::Dictionary;
use crate::error::ReadError;
use crate::recovery::scanner;
use crate::session::SessionState;

pub const MAGIC_LEN: usize = 8;

/// Filesystem id written on headers not tied to any filesystem.
pub const FILESYSTEM_NONE: u16 = 0xffff;

// ── Magic markers ─────────────────────────────────────────────────────────────

/// Every structural marker this build recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Magic {
    Main,
    VolumeHeader,
    VolumeFooter,
    FilesystemInfo,
    FilesystemBegin,
    DirsInfo,
    Object,
    BlockHeader,
    FileFooter,
    DataFile,
}

impl Magic {
    pub const ALL: [Magic; 10] = [
        Magic::Main,
        Magic::VolumeHeader,
        Magic::VolumeFooter,
        Magic::FilesystemInfo,
        Magic::FilesystemBegin,
        Magic::DirsInfo,
        Magic::Object,
        Magic::BlockHeader,
        Magic::FileFooter,
        Magic::DataFile,
    ];

    pub fn bytes(self) -> &'static [u8; MAGIC_LEN] {
        match self {
            Magic::Main            => b"FsA0MaIn",
            Magic::VolumeHeader    => b"FsAvOlHd",
            Magic::VolumeFooter    => b"FsAvOlFt",
            Magic::FilesystemInfo  => b"FsAfSiNf",
            Magic::FilesystemBegin => b"FsAfSbEg",
            Magic::DirsInfo        => b"FsAdIrSt",
            Magic::Object          => b"FsAoBjTt",
            Magic::BlockHeader     => b"FsAbLkHd",
            Magic::FileFooter      => b"FsAfIlFt",
            Magic::DataFile        => b"FsAdAtFi",
        }
    }

    pub fn from_bytes(raw: &[u8; MAGIC_LEN]) -> Option<Self> {
        Magic::ALL.into_iter().find(|m| m.bytes() == raw)
    }

    /// Short name for reports and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Magic::Main            => "main",
            Magic::VolumeHeader    => "volume-header",
            Magic::VolumeFooter    => "volume-footer",
            Magic::FilesystemInfo  => "filesystem-info",
            Magic::FilesystemBegin => "filesystem-begin",
            Magic::DirsInfo        => "dirs-info",
            Magic::Object          => "object",
            Magic::BlockHeader     => "block-header",
            Magic::FileFooter      => "file-footer",
            Magic::DataFile        => "data-file",
        }
    }
}

impl fmt::Display for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.bytes()))
    }
}

// ── Header ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Header {
    pub magic:      Magic,
    pub archive_id: u32,
    /// `None` when the header carries [`FILESYSTEM_NONE`].
    pub filesystem: Option<u16>,
    pub dict:       Dictionary,
    /// Stream offset of the magic marker.
    pub offset:     u64,
    /// Bytes skipped by the resync scanner before the marker was found.
    pub skipped:    u64,
}

/// Read the next header from `reader`.
///
/// An unrecognised magic is fatal unless `allow_resync` is set, in which case
/// the stream is scanned forward one byte at a time for the next marker. A
/// header whose archive id disagrees with the one latched in `session` is
/// fatal. A dictionary checksum mismatch is minor.
pub fn read_header<R: Read + Seek>(
    reader:       &mut R,
    session:      &SessionState,
    allow_resync: bool,
) -> Result<Header, ReadError> {
    let start = reader.stream_position()?;
    let mut raw = [0u8; MAGIC_LEN];
    reader.read_exact(&mut raw)?;

    let (magic, offset) = match Magic::from_bytes(&raw) {
        Some(magic) => (magic, start),
        None if !allow_resync => {
            return Err(ReadError::InvalidMagic { found: hex::encode(raw) });
        }
        None => {
            let hit = scanner::resync(reader, start, session.options.max_resync_distance)?;
            (hit.magic, hit.offset)
        }
    };

    let archive_id = reader.read_u32::<LittleEndian>()?;
    if let Some(&expected) = session.archive_id.get() {
        if archive_id != expected {
            return Err(ReadError::ArchiveIdMismatch { found: archive_id, expected });
        }
    }

    let filesystem = match reader.read_u16::<LittleEndian>()? {
        FILESYSTEM_NONE => None,
        id => Some(id),
    };

    let dict = Dictionary::read_frame(&mut *reader)?;
    debug!("read {magic} header at offset {offset} (fs={filesystem:?})");

    Ok(Header { magic, archive_id, filesystem, dict, offset, skipped: offset - start })
}

/// Write one header in the framing [`read_header`] consumes.
pub fn write_header<W: Write>(
    mut writer: W,
    magic:      Magic,
    archive_id: u32,
    filesystem: Option<u16>,
    dict:       &Dictionary,
) -> io::Result<()> {
    writer.write_all(magic.bytes())?;
    writer.write_u32::<LittleEndian>(archive_id)?;
    writer.write_u16::<LittleEndian>(filesystem.unwrap_or(FILESYSTEM_NONE))?;
    dict.write_frame(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;
    use std::io::Cursor;

    fn encoded(magic: Magic, archive_id: u32, fs: Option<u16>) -> Vec<u8> {
        let mut d = Dictionary::new();
        d.add_u32(0, 1, 77);
        let mut out = Vec::new();
        write_header(&mut out, magic, archive_id, fs, &d).unwrap();
        out
    }

    #[test]
    fn magic_literals_are_distinct() {
        for (i, a) in Magic::ALL.iter().enumerate() {
            assert_eq!(Magic::from_bytes(a.bytes()), Some(*a));
            for b in &Magic::ALL[i + 1..] {
                assert_ne!(a.bytes(), b.bytes());
            }
        }
        assert_eq!(Magic::from_bytes(b"NotMagic"), None);
    }

    #[test]
    fn reads_a_header() {
        let bytes = encoded(Magic::BlockHeader, 0x1234_5678, Some(2));
        let session = SessionState::default();
        let h = read_header(&mut Cursor::new(&bytes), &session, false).unwrap();
        assert_eq!(h.magic, Magic::BlockHeader);
        assert_eq!(h.archive_id, 0x1234_5678);
        assert_eq!(h.filesystem, Some(2));
        assert_eq!(h.dict.get_u32(0, 1).unwrap(), 77);
        assert_eq!((h.offset, h.skipped), (0, 0));
    }

    #[test]
    fn sentinel_filesystem_is_none() {
        let bytes = encoded(Magic::Main, 1, None);
        let h = read_header(&mut Cursor::new(&bytes), &SessionState::default(), false).unwrap();
        assert_eq!(h.filesystem, None);
    }

    #[test]
    fn bad_magic_without_resync_is_fatal() {
        let mut bytes = b"garbage!".to_vec();
        bytes.extend(encoded(Magic::Main, 1, None));
        let err = read_header(&mut Cursor::new(&bytes), &SessionState::default(), false).unwrap_err();
        assert!(matches!(err, ReadError::InvalidMagic { .. }));
        assert_eq!(err.severity(), Severity::Fatal);
    }

    #[test]
    fn bad_magic_with_resync_finds_next_header() {
        let mut bytes = vec![0xee; 13];
        bytes.extend(encoded(Magic::Object, 1, Some(0)));
        let h = read_header(&mut Cursor::new(&bytes), &SessionState::default(), true).unwrap();
        assert_eq!(h.magic, Magic::Object);
        assert_eq!((h.offset, h.skipped), (13, 13));
    }

    #[test]
    fn foreign_archive_id_is_fatal() {
        let bytes = encoded(Magic::BlockHeader, 0xbbbb, None);
        let mut session = SessionState::default();
        session.archive_id.check_or_establish(0xaaaa).unwrap();
        let err = read_header(&mut Cursor::new(&bytes), &session, true).unwrap_err();
        assert!(matches!(err, ReadError::ArchiveIdMismatch { found: 0xbbbb, expected: 0xaaaa }));
    }

    #[test]
    fn corrupt_dictionary_is_minor_and_stream_moves_past_it() {
        let mut bytes = encoded(Magic::BlockHeader, 1, None);
        let first_len = bytes.len();
        bytes[MAGIC_LEN + 6 + 3] ^= 0xff;
        bytes.extend(encoded(Magic::FileFooter, 1, None));

        let mut cur = Cursor::new(&bytes);
        let session = SessionState::default();
        let err = read_header(&mut cur, &session, true).unwrap_err();
        assert!(err.is_minor());
        assert_eq!(cur.position() as usize, first_len);
        assert_eq!(read_header(&mut cur, &session, true).unwrap().magic, Magic::FileFooter);
    }
}
