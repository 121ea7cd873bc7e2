//! Per-archive reading session and its configuration.

use crate::codec::{CompressAlgo, CryptAlgo};

/// A value fixed by the first volume read and required to match afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Latch<T> {
    Unset,
    Established(T),
}

impl<T> Default for Latch<T> {
    fn default() -> Self {
        Latch::Unset
    }
}

/// A later value that disagreed with the latched one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch<T> {
    pub found:    T,
    pub expected: T,
}

impl<T: PartialEq + Clone> Latch<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Latch::Unset => None,
            Latch::Established(v) => Some(v),
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Latch::Established(_))
    }

    /// `Unset -> Established(value)` on first use; afterwards `value` must
    /// equal the latched value and the latch never changes.
    pub fn check_or_establish(&mut self, value: T) -> Result<(), Mismatch<T>> {
        match self {
            Latch::Unset => {
                *self = Latch::Established(value);
                Ok(())
            }
            Latch::Established(cur) if *cur == value => Ok(()),
            Latch::Established(cur) => Err(Mismatch { found: value, expected: cur.clone() }),
        }
    }
}

// ── ReaderOptions ─────────────────────────────────────────────────────────────

/// Caller-supplied settings for [`crate::io_stream::ArchiveReader`].
#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    pub compress_algo:       CompressAlgo,
    pub crypt_algo:          CryptAlgo,
    pub compress_level:      Option<i32>,
    /// Farthest the resync scanner may move past a bad marker. `None` scans
    /// until a marker or the end of the volume.
    pub max_resync_distance: Option<u64>,
}

// ── SessionState ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub archive_id:      Latch<u32>,
    pub file_format:     Latch<String>,
    /// Version of the program that wrote the archive; first value seen wins.
    pub creator_version: Option<String>,
    pub options:         ReaderOptions,
}

impl SessionState {
    pub fn new(options: ReaderOptions) -> Self {
        Self { options, ..Self::default() }
    }
}
