//! Marker resynchronisation after a header could not be trusted.
//!
//! Starting at the offset where a magic read failed, every candidate offset
//! `p, p+1, p+2, ...` is tried in turn: the stream is positioned there and a
//! magic-sized window is read and compared against the known markers. The
//! first hit wins and leaves the stream just past the marker.
//!
//! The scan is unbounded unless the caller passes a limit; on a fully corrupt
//! volume it runs until the end of the stream, which surfaces as an
//! `UnexpectedEof` I/O error.

use std::io::{Read, Seek, SeekFrom};

use log::warn;

use crate::error::ReadError;
use crate::header::{Magic, MAGIC_LEN};

/// Where the scanner found the next marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resync {
    pub magic:   Magic,
    /// Offset of the first marker byte.
    pub offset:  u64,
    /// Single-byte advances taken from the starting offset.
    pub skipped: u64,
}

/// Scan forward from `start` for the next recognised marker.
///
/// `limit` caps how many single-byte advances are allowed; exceeding it
/// fails with [`ReadError::ResyncLimit`]. Seek and read failures are fatal.
pub fn resync<R: Read + Seek>(
    reader: &mut R,
    start:  u64,
    limit:  Option<u64>,
) -> Result<Resync, ReadError> {
    let mut window = [0u8; MAGIC_LEN];
    let mut pos = start;

    loop {
        let skipped = pos - start;
        if matches!(limit, Some(max) if skipped > max) {
            return Err(ReadError::ResyncLimit { scanned: skipped });
        }

        reader.seek(SeekFrom::Start(pos))?;
        reader.read_exact(&mut window)?;

        if let Some(magic) = Magic::from_bytes(&window) {
            if skipped > 0 {
                warn!("skipped {skipped} corrupt byte(s) before {magic} marker at offset {pos}");
            }
            return Ok(Resync { magic, offset: pos, skipped });
        }
        pos += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream(garbage: usize, magic: Magic) -> Vec<u8> {
        let mut v: Vec<u8> = (0..garbage).map(|i| (i * 31 + 7) as u8).collect();
        v.extend_from_slice(magic.bytes());
        v.extend_from_slice(b"tail");
        v
    }

    #[test]
    fn marker_at_start_takes_no_advance() {
        let mut cur = Cursor::new(stream(0, Magic::Main));
        let hit = resync(&mut cur, 0, None).unwrap();
        assert_eq!(hit, Resync { magic: Magic::Main, offset: 0, skipped: 0 });
        assert_eq!(cur.position(), MAGIC_LEN as u64);
    }

    #[test]
    fn garbage_is_skipped_byte_by_byte() {
        let mut cur = Cursor::new(stream(37, Magic::BlockHeader));
        let hit = resync(&mut cur, 0, None).unwrap();
        assert_eq!(hit.skipped, 37);
        assert_eq!(hit.offset, 37);
        assert_eq!(cur.position(), 37 + MAGIC_LEN as u64);
    }

    #[test]
    fn starts_from_given_offset() {
        let mut data = stream(5, Magic::Object);
        data.extend(stream(3, Magic::FileFooter));
        let second_start = (5 + MAGIC_LEN + 4) as u64;
        let mut cur = Cursor::new(data);
        let hit = resync(&mut cur, second_start, None).unwrap();
        assert_eq!(hit.magic, Magic::FileFooter);
        assert_eq!(hit.skipped, 3);
    }

    #[test]
    fn no_marker_runs_into_eof() {
        let mut cur = Cursor::new(vec![0u8; 64]);
        let err = resync(&mut cur, 0, None).unwrap_err();
        assert!(err.is_eof());
    }

    #[test]
    fn limit_is_enforced() {
        let mut cur = Cursor::new(stream(20, Magic::Main));
        let err = resync(&mut cur, 0, Some(19)).unwrap_err();
        assert!(matches!(err, ReadError::ResyncLimit { scanned: 20 }));

        let mut cur = Cursor::new(stream(20, Magic::Main));
        assert_eq!(resync(&mut cur, 0, Some(20)).unwrap().skipped, 20);
    }
}
