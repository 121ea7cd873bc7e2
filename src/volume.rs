//! Volume chaining: path derivation, the open volume handle, and the
//! volume header/footer records that tie volumes into one archive.
//!
//! # Naming
//! Volume 0 is the base path itself (canonicalised when possible). Volume
//! `n > 0` drops the last two bytes of the base path and appends `n`, zero
//! padded to two digits below 100: `backup.fsa` → `backup.f01` … `backup.f99`,
//! `backup.f100`. Base paths shorter than four bytes are rejected.

use std::fs::{self, File};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use log::debug;

use crate::dict::Dictionary;
use crate::error::ReadError;
use crate::header::{read_header, Header, Magic};
use crate::session::SessionState;

/// Volume-header dictionary keys (section 0).
pub const VOLHEAD_VOLNUM:     u16 = 1;
pub const VOLHEAD_ARCHID:     u16 = 2;
pub const VOLHEAD_FILEFORMAT: u16 = 3;
pub const VOLHEAD_PROGVER:    u16 = 4;

/// Volume-footer dictionary keys (section 0).
pub const VOLFOOT_VOLNUM:  u16 = 1;
pub const VOLFOOT_ARCHID:  u16 = 2;
pub const VOLFOOT_LASTVOL: u16 = 3;

const MIN_BASE_PATH_LEN: usize = 4;

// ── Path derivation ───────────────────────────────────────────────────────────

/// Path of volume `index` for the archive at `base`.
pub fn volume_path(base: &Path, index: u32) -> Result<PathBuf, ReadError> {
    if base.as_os_str().len() < MIN_BASE_PATH_LEN {
        return Err(ReadError::InvalidBasePath(base.to_path_buf()));
    }
    if index == 0 {
        return Ok(fs::canonicalize(base).unwrap_or_else(|_| base.to_path_buf()));
    }
    let suffix = if index < 100 { format!("{index:02}") } else { index.to_string() };
    Ok(replace_last_two(base, &suffix))
}

#[cfg(unix)]
fn replace_last_two(base: &Path, suffix: &str) -> PathBuf {
    use std::ffi::OsString;
    use std::os::unix::ffi::{OsStrExt, OsStringExt};

    let bytes = base.as_os_str().as_bytes();
    let mut out = bytes[..bytes.len() - 2].to_vec();
    out.extend_from_slice(suffix.as_bytes());
    PathBuf::from(OsString::from_vec(out))
}

#[cfg(not(unix))]
fn replace_last_two(base: &Path, suffix: &str) -> PathBuf {
    let mut s: Vec<char> = base.to_string_lossy().chars().collect();
    s.truncate(s.len().saturating_sub(2));
    let mut out: String = s.into_iter().collect();
    out.push_str(suffix);
    PathBuf::from(out)
}

// ── VolumeFile ────────────────────────────────────────────────────────────────

/// The current volume of an archive: index, derived path and open handle.
#[derive(Debug)]
pub struct VolumeFile {
    base_path: PathBuf,
    index:     u32,
    path:      PathBuf,
    file:      Option<File>,
}

impl VolumeFile {
    /// Position on volume 0 without opening it.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, ReadError> {
        let base_path = base_path.into();
        let path = volume_path(&base_path, 0)?;
        Ok(Self { base_path, index: 0, path, file: None })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Open the current volume read-only. It must be a regular file.
    pub fn open(&mut self) -> Result<(), ReadError> {
        let open_err = |source| ReadError::Open { path: self.path.clone(), source };
        let file = File::open(&self.path).map_err(open_err)?;
        let meta = file.metadata().map_err(open_err)?;
        if !meta.is_file() {
            return Err(ReadError::NotRegularFile(self.path.clone()));
        }
        debug!("opened volume {} at {}", self.index, self.path.display());
        self.file = Some(file);
        Ok(())
    }

    /// Release the advisory lock and close the handle.
    pub fn close(&mut self) -> Result<(), ReadError> {
        let file = self.file.take().ok_or(ReadError::NoVolumeOpen)?;
        release_lock(&file);
        debug!("closed volume {}", self.index);
        Ok(())
    }

    /// Move to the next volume index. The new volume is not opened.
    pub fn advance(&mut self) -> Result<(), ReadError> {
        let next = self.index + 1;
        self.path = volume_path(&self.base_path, next)?;
        self.index = next;
        debug!("advanced to volume {} ({})", self.index, self.path.display());
        Ok(())
    }

    pub fn file_mut(&mut self) -> Result<&mut File, ReadError> {
        self.file.as_mut().ok_or(ReadError::NoVolumeOpen)
    }
}

#[cfg(unix)]
fn release_lock(file: &File) {
    use std::os::unix::io::AsRawFd;

    // SAFETY: the descriptor belongs to `file`, which outlives the call.
    let rc = unsafe { libc::lockf(file.as_raw_fd(), libc::F_ULOCK, 0) };
    if rc != 0 {
        debug!("advisory unlock failed: {}", std::io::Error::last_os_error());
    }
}

#[cfg(not(unix))]
fn release_lock(_: &File) {}

// ── Volume header / footer ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeHeader {
    pub archive_id:      u32,
    pub volume:          u32,
    pub file_format:     String,
    pub creator_version: String,
}

impl VolumeHeader {
    pub fn from_header(header: &Header) -> Result<Self, ReadError> {
        if header.magic != Magic::VolumeHeader {
            return Err(ReadError::UnexpectedMagic { found: header.magic, expected: Magic::VolumeHeader });
        }
        let d = &header.dict;
        Ok(Self {
            archive_id:      d.get_u32(0, VOLHEAD_ARCHID)?,
            volume:          d.get_u32(0, VOLHEAD_VOLNUM)?,
            file_format:     d.get_string(0, VOLHEAD_FILEFORMAT)?,
            creator_version: d.get_string(0, VOLHEAD_PROGVER)?,
        })
    }

    pub fn to_dict(&self) -> Dictionary {
        let mut d = Dictionary::new();
        d.add_u32(0, VOLHEAD_ARCHID, self.archive_id);
        d.add_u32(0, VOLHEAD_VOLNUM, self.volume);
        d.add_string(0, VOLHEAD_FILEFORMAT, &self.file_format);
        d.add_string(0, VOLHEAD_PROGVER, &self.creator_version);
        d
    }

    /// Check this header against the session and latch the archive id and
    /// file format on the first volume.
    pub fn admit(&self, session: &mut SessionState, expected_volume: u32, path: &Path) -> Result<(), ReadError> {
        session
            .archive_id
            .check_or_establish(self.archive_id)
            .map_err(|m| ReadError::ArchiveIdMismatch { found: m.found, expected: m.expected })?;

        if self.volume != expected_volume {
            return Err(ReadError::VolumeNumber {
                path:     path.to_path_buf(),
                found:    self.volume,
                expected: expected_volume,
            });
        }

        session
            .file_format
            .check_or_establish(self.file_format.clone())
            .map_err(|m| ReadError::FileFormat { found: m.found, expected: m.expected })?;

        if session.creator_version.is_none() {
            session.creator_version = Some(self.creator_version.clone());
        }
        Ok(())
    }
}

/// Read the volume header at the current position of `reader` and admit it
/// into `session`. Resync is never attempted here.
pub fn read_volume_header<R: Read + Seek>(
    reader:          &mut R,
    session:         &mut SessionState,
    expected_volume: u32,
    path:            &Path,
) -> Result<VolumeHeader, ReadError> {
    let header = read_header(reader, session, false)?;
    let vh = VolumeHeader::from_header(&header)?;
    vh.admit(session, expected_volume, path)?;
    debug!(
        "volume {} of archive {:08x} (format {}, created by {})",
        vh.volume, vh.archive_id, vh.file_format, vh.creator_version
    );
    Ok(vh)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeFooter {
    pub volume:     u32,
    pub archive_id: u32,
    pub last:       bool,
}

impl VolumeFooter {
    pub fn from_header(header: &Header) -> Result<Self, ReadError> {
        if header.magic != Magic::VolumeFooter {
            return Err(ReadError::UnexpectedMagic { found: header.magic, expected: Magic::VolumeFooter });
        }
        let d = &header.dict;
        Ok(Self {
            volume:     d.get_u32(0, VOLFOOT_VOLNUM)?,
            archive_id: d.get_u32(0, VOLFOOT_ARCHID)?,
            last:       d.get_u32(0, VOLFOOT_LASTVOL)? != 0,
        })
    }

    pub fn to_dict(&self) -> Dictionary {
        let mut d = Dictionary::new();
        d.add_u32(0, VOLFOOT_VOLNUM, self.volume);
        d.add_u32(0, VOLFOOT_ARCHID, self.archive_id);
        d.add_u32(0, VOLFOOT_LASTVOL, self.last as u32);
        d
    }
}
