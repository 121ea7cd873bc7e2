//! Data blocks: the header fields that describe a stored payload, and the
//! read that verifies it.
//!
//! A payload whose Fletcher-32 does not match is never handed out as data.
//! The caller gets `real_size` zero bytes instead and the stream is moved
//! back to the start of the payload, so the next header read resyncs through
//! the damaged region.

use std::io::{Read, Seek, SeekFrom};

use log::warn;
use serde::Serialize;

use crate::checksum::fletcher32;
use crate::codec::{decode_payload, CodecError, CompressAlgo, CryptAlgo};
use crate::dict::Dictionary;
use crate::error::ReadError;

/// Largest logical (uncompressed) block a header may declare.
pub const MAX_BLOCK_SIZE: u32 = 32 * 1024 * 1024;

/// Block-header dictionary keys (section 0).
pub const BLKHEAD_REALSIZE:     u16 = 1;
pub const BLKHEAD_OFFSET:       u16 = 2;
pub const BLKHEAD_COMPRESSALGO: u16 = 3;
pub const BLKHEAD_ENCRYPTALGO:  u16 = 4;
pub const BLKHEAD_ARSIZE:       u16 = 5;
pub const BLKHEAD_COMPSIZE:     u16 = 6;
pub const BLKHEAD_ARCSUM:       u16 = 7;

/// Outcome of the payload checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumStatus {
    /// Not checked (the block was skipped).
    #[default]
    Unknown,
    Ok,
    Corrupt,
}

/// Fields of a block header dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMeta {
    /// Logical (uncompressed) size.
    pub real_size:       u32,
    /// Offset of the block in the logical stream of its file.
    pub offset:          u64,
    pub compress_algo:   CompressAlgo,
    pub crypt_algo:      CryptAlgo,
    /// Bytes stored in the archive after compression and encryption.
    pub archive_size:    u32,
    /// Bytes after compression, before encryption.
    pub compressed_size: u32,
    /// Fletcher-32 of the `archive_size` stored bytes.
    pub checksum:        u32,
}

impl BlockMeta {
    pub fn from_dict(d: &Dictionary) -> Result<Self, ReadError> {
        let offset    = d.get_u64(0, BLKHEAD_OFFSET)?;
        let real_size = d.get_u32(0, BLKHEAD_REALSIZE)?;
        if real_size > MAX_BLOCK_SIZE {
            return Err(ReadError::BlockTooLarge { size: real_size, max: MAX_BLOCK_SIZE });
        }
        Ok(Self {
            real_size,
            offset,
            compress_algo:   CompressAlgo::from_id(d.get_u16(0, BLKHEAD_COMPRESSALGO)?),
            crypt_algo:      CryptAlgo::from_id(d.get_u16(0, BLKHEAD_ENCRYPTALGO)?),
            archive_size:    d.get_u32(0, BLKHEAD_ARSIZE)?,
            compressed_size: d.get_u32(0, BLKHEAD_COMPSIZE)?,
            checksum:        d.get_u32(0, BLKHEAD_ARCSUM)?,
        })
    }

    pub fn to_dict(&self) -> Dictionary {
        let mut d = Dictionary::new();
        d.add_u32(0, BLKHEAD_REALSIZE, self.real_size);
        d.add_u64(0, BLKHEAD_OFFSET, self.offset);
        d.add_u16(0, BLKHEAD_COMPRESSALGO, self.compress_algo.id());
        d.add_u16(0, BLKHEAD_ENCRYPTALGO, self.crypt_algo.id());
        d.add_u32(0, BLKHEAD_ARSIZE, self.archive_size);
        d.add_u32(0, BLKHEAD_COMPSIZE, self.compressed_size);
        d.add_u32(0, BLKHEAD_ARCSUM, self.checksum);
        d
    }
}

/// A block read from the archive, owned by whoever consumes it next.
///
/// For a verified block `data` holds the `archive_size` stored bytes; for a
/// corrupt block it holds `real_size` zero bytes.
#[derive(Debug, Clone)]
pub struct BlockInfo {
    pub meta: BlockMeta,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub struct BlockRead {
    pub status: ChecksumStatus,
    /// `None` when the block was skipped.
    pub info:   Option<BlockInfo>,
}

impl BlockRead {
    /// Plain logical bytes of the block: decoded when verified, the zero
    /// substitute when corrupt, `None` when skipped.
    pub fn into_payload(self) -> Result<Option<Vec<u8>>, CodecError> {
        let Some(info) = self.info else { return Ok(None) };
        match self.status {
            ChecksumStatus::Corrupt => Ok(Some(info.data)),
            _ => {
                let m = info.meta;
                decode_payload(&info.data, m.compress_algo, m.crypt_algo, m.real_size as usize).map(Some)
            }
        }
    }
}

/// Read the payload that follows a block header.
///
/// With `skip` the stream is moved past the stored bytes and nothing is
/// allocated. Otherwise the stored bytes are read and checksummed; on a
/// mismatch the payload is replaced with `real_size` zeroes and the stream
/// is moved back to the start of the stored bytes so that the next header
/// read can resync inside the damaged region.
pub fn read_block<R: Read + Seek>(
    reader: &mut R,
    dict:   &Dictionary,
    skip:   bool,
) -> Result<BlockRead, ReadError> {
    let meta = BlockMeta::from_dict(dict)?;

    if skip {
        reader.seek(SeekFrom::Current(meta.archive_size as i64))?;
        return Ok(BlockRead { status: ChecksumStatus::Unknown, info: None });
    }

    let mut data = vec![0u8; meta.archive_size as usize];
    reader.read_exact(&mut data)?;

    if fletcher32(&data) == meta.checksum {
        return Ok(BlockRead { status: ChecksumStatus::Ok, info: Some(BlockInfo { meta, data }) });
    }

    warn!("block is corrupt at offset={}, blksize={}", meta.offset, meta.real_size);
    drop(data);
    let zeroed = vec![0u8; meta.real_size as usize];
    reader.seek(SeekFrom::Current(-(meta.archive_size as i64)))?;
    Ok(BlockRead { status: ChecksumStatus::Corrupt, info: Some(BlockInfo { meta, data: zeroed }) })
}
