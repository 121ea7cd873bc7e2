//! Typed key/value dictionary carried by every header.
//!
//! # Frame layout
//!
//! ```text
//! header_len:u16 | header_bytes[header_len] | fletcher32:u32
//! header_bytes = record_count:u16 | record*
//! record       = type:u8 | section:u8 | key:u16 | size:u16 | data[size]
//! ```
//!
//! All integers are little-endian. The checksum covers `header_bytes` only.
//! A checksum mismatch is reported as a minor (skippable) error; a frame that
//! passes the checksum but whose records overrun the buffer is fatal.

pub mod cursor;

use std::io::{self, Read, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};
use thiserror::Error;

use crate::checksum::fletcher32;
use crate::error::ReadError;
pub use cursor::{DecodeError, FrameCursor};

// ── Record types ──────────────────────────────────────────────────────────────

/// On-disk type tag of a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Null,
    U8,
    U16,
    U32,
    U64,
    S8,
    S16,
    S32,
    S64,
    Data,
    String,
    /// Tag not known to this build; the payload is kept verbatim.
    Unknown(u8),
}

impl RecordType {
    pub fn tag(self) -> u8 {
        match self {
            RecordType::Null       => 0,
            RecordType::U8         => 1,
            RecordType::U16        => 2,
            RecordType::U32        => 3,
            RecordType::U64        => 4,
            RecordType::S8         => 5,
            RecordType::S16        => 6,
            RecordType::S32        => 7,
            RecordType::S64        => 8,
            RecordType::Data       => 9,
            RecordType::String     => 10,
            RecordType::Unknown(t) => t,
        }
    }
}

impl From<u8> for RecordType {
    fn from(tag: u8) -> Self {
        match tag {
            0  => RecordType::Null,
            1  => RecordType::U8,
            2  => RecordType::U16,
            3  => RecordType::U32,
            4  => RecordType::U64,
            5  => RecordType::S8,
            6  => RecordType::S16,
            7  => RecordType::S32,
            8  => RecordType::S64,
            9  => RecordType::Data,
            10 => RecordType::String,
            t  => RecordType::Unknown(t),
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DictError {
    #[error("No record for section {section} key {key}")]
    Missing { section: u8, key: u16 },
    #[error("Record {section}/{key} has type {found:?}, expected {expected:?}")]
    TypeMismatch { section: u8, key: u16, expected: RecordType, found: RecordType },
    #[error("Record {section}/{key} holds {found} byte(s), expected {expected}")]
    SizeMismatch { section: u8, key: u16, expected: usize, found: usize },
}

// ── Record ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub kind:    RecordType,
    pub section: u8,
    pub key:     u16,
    pub data:    Vec<u8>,
}

impl Record {
    /// Size of the per-record prefix (type, section, key, size).
    pub const PREFIX_LEN: usize = 6;

    fn decode(cur: &mut FrameCursor<'_>) -> Result<Self, DecodeError> {
        let kind    = RecordType::from(cur.read_u8()?);
        let section = cur.read_u8()?;
        let key     = cur.read_u16()?;
        let size    = cur.read_u16()? as usize;
        let data    = cur.take(size)?.to_vec();
        Ok(Self { kind, section, key, data })
    }
}

// ── Dictionary ────────────────────────────────────────────────────────────────

/// Ordered collection of records. Lookups return the first match; duplicate
/// `(section, key)` pairs are not rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    records: Vec<Record>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn insert(&mut self, kind: RecordType, section: u8, key: u16, data: impl Into<Vec<u8>>) {
        self.records.push(Record { kind, section, key, data: data.into() });
    }

    pub fn add_u16(&mut self, section: u8, key: u16, value: u16) {
        self.insert(RecordType::U16, section, key, value.to_le_bytes());
    }

    pub fn add_u32(&mut self, section: u8, key: u16, value: u32) {
        self.insert(RecordType::U32, section, key, value.to_le_bytes());
    }

    pub fn add_u64(&mut self, section: u8, key: u16, value: u64) {
        self.insert(RecordType::U64, section, key, value.to_le_bytes());
    }

    /// Strings are stored NUL-terminated.
    pub fn add_string(&mut self, section: u8, key: u16, value: &str) {
        let mut data = Vec::with_capacity(value.len() + 1);
        data.extend_from_slice(value.as_bytes());
        data.push(0);
        self.insert(RecordType::String, section, key, data);
    }

    pub fn get(&self, section: u8, key: u16) -> Option<&Record> {
        self.records.iter().find(|r| r.section == section && r.key == key)
    }

    fn get_sized(&self, section: u8, key: u16, kind: RecordType, size: usize) -> Result<&[u8], DictError> {
        let rec = self.get(section, key).ok_or(DictError::Missing { section, key })?;
        if rec.kind != kind {
            return Err(DictError::TypeMismatch { section, key, expected: kind, found: rec.kind });
        }
        if rec.data.len() != size {
            return Err(DictError::SizeMismatch { section, key, expected: size, found: rec.data.len() });
        }
        Ok(&rec.data)
    }

    pub fn get_u16(&self, section: u8, key: u16) -> Result<u16, DictError> {
        self.get_sized(section, key, RecordType::U16, 2).map(LittleEndian::read_u16)
    }

    pub fn get_u32(&self, section: u8, key: u16) -> Result<u32, DictError> {
        self.get_sized(section, key, RecordType::U32, 4).map(LittleEndian::read_u32)
    }

    pub fn get_u64(&self, section: u8, key: u16) -> Result<u64, DictError> {
        self.get_sized(section, key, RecordType::U64, 8).map(LittleEndian::read_u64)
    }

    /// Raw payload of a record regardless of its type tag.
    pub fn get_data(&self, section: u8, key: u16) -> Result<&[u8], DictError> {
        self.get(section, key)
            .map(|r| r.data.as_slice())
            .ok_or(DictError::Missing { section, key })
    }

    /// Text up to the first NUL; invalid UTF-8 is replaced.
    pub fn get_string(&self, section: u8, key: u16) -> Result<String, DictError> {
        let data = self.get_data(section, key)?;
        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        Ok(String::from_utf8_lossy(&data[..end]).into_owned())
    }

    // ── Wire codec ──────────────────────────────────────────────────────────

    /// Parse the checksummed region of a frame (`record_count | record*`).
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut cur = FrameCursor::new(buf);
        let count = cur.read_u16()?;
        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            records.push(Record::decode(&mut cur)?);
        }
        Ok(Self { records })
    }

    /// Read a complete frame: length, body, checksum. The checksum is
    /// verified before any record is parsed.
    pub fn read_frame<R: Read>(mut reader: R) -> Result<Self, ReadError> {
        let len = reader.read_u16::<LittleEndian>()? as usize;
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body)?;
        let stored   = reader.read_u32::<LittleEndian>()?;
        let computed = fletcher32(&body);

        if stored != computed {
            warn!("bad checksum for header: stored={stored:#010x} computed={computed:#010x}");
            return Err(ReadError::HeaderChecksum { stored, computed });
        }

        let dict = Self::decode(&body)?;
        debug!("decoded header dictionary: {} record(s), {len} byte(s)", dict.len());
        Ok(dict)
    }

    /// Serialize `record_count | record*`.
    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let count = u16::try_from(self.records.len())
            .map_err(|_| invalid_input("too many records for one header"))?;
        let size: usize = self.records.iter().map(|r| Record::PREFIX_LEN + r.data.len()).sum();
        let mut out = Vec::with_capacity(2 + size);
        out.write_u16::<LittleEndian>(count)?;
        for rec in &self.records {
            let size = u16::try_from(rec.data.len())
                .map_err(|_| invalid_input("record payload exceeds 65535 bytes"))?;
            out.write_u8(rec.kind.tag())?;
            out.write_u8(rec.section)?;
            out.write_u16::<LittleEndian>(rec.key)?;
            out.write_u16::<LittleEndian>(size)?;
            out.write_all(&rec.data)?;
        }
        Ok(out)
    }

    /// Write a complete frame: length, body, checksum.
    pub fn write_frame<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let body = self.encode()?;
        let len = u16::try_from(body.len())
            .map_err(|_| invalid_input("header exceeds 65535 bytes"))?;
        writer.write_u16::<LittleEndian>(len)?;
        writer.write_all(&body)?;
        writer.write_u32::<LittleEndian>(fletcher32(&body))?;
        Ok(())
    }
}

fn invalid_input(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg.to_string())
}
