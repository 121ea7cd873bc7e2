//! Compression and encryption algorithm ids carried in block headers, plus a
//! small registry of the decompressors this build provides.
//!
//! # Identity rules
//! Algorithms are identified on disk by a `u16`. The ids are frozen: an id is
//! never reused, even for an algorithm this build cannot decode. Ids `0`
//! ("null") mean the field was never set; id `1` ("none") means the payload
//! is stored verbatim.
//!
//! Decoding never falls back to another algorithm. A block whose algorithm
//! is not in the registry fails with [`CodecError::Unavailable`].

use std::io::{self, Read};

use thiserror::Error;

// ── Algorithm ids ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressAlgo {
    #[default]
    Null,
    None,
    Lzo,
    Gzip,
    Bzip2,
    Lzma,
    Lz4,
    Zstd,
    Unknown(u16),
}

impl CompressAlgo {
    pub fn id(self) -> u16 {
        match self {
            CompressAlgo::Null       => 0,
            CompressAlgo::None       => 1,
            CompressAlgo::Lzo        => 2,
            CompressAlgo::Gzip       => 3,
            CompressAlgo::Bzip2      => 4,
            CompressAlgo::Lzma       => 5,
            CompressAlgo::Lz4        => 6,
            CompressAlgo::Zstd       => 7,
            CompressAlgo::Unknown(i) => i,
        }
    }

    pub fn from_id(id: u16) -> Self {
        match id {
            0 => CompressAlgo::Null,
            1 => CompressAlgo::None,
            2 => CompressAlgo::Lzo,
            3 => CompressAlgo::Gzip,
            4 => CompressAlgo::Bzip2,
            5 => CompressAlgo::Lzma,
            6 => CompressAlgo::Lz4,
            7 => CompressAlgo::Zstd,
            i => CompressAlgo::Unknown(i),
        }
    }

    /// Human-readable name (diagnostics only, never parsed from disk).
    pub fn name(self) -> &'static str {
        match self {
            CompressAlgo::Null       => "null",
            CompressAlgo::None       => "none",
            CompressAlgo::Lzo        => "lzo",
            CompressAlgo::Gzip       => "gzip",
            CompressAlgo::Bzip2      => "bzip2",
            CompressAlgo::Lzma       => "lzma",
            CompressAlgo::Lz4        => "lz4",
            CompressAlgo::Zstd       => "zstd",
            CompressAlgo::Unknown(_) => "unknown",
        }
    }

    /// Parse from a CLI string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none"  => Some(CompressAlgo::None),
            "lzo"   => Some(CompressAlgo::Lzo),
            "gzip"  => Some(CompressAlgo::Gzip),
            "bzip2" => Some(CompressAlgo::Bzip2),
            "lzma"  => Some(CompressAlgo::Lzma),
            "lz4"   => Some(CompressAlgo::Lz4),
            "zstd"  => Some(CompressAlgo::Zstd),
            _       => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CryptAlgo {
    #[default]
    Null,
    None,
    Blowfish,
    Unknown(u16),
}

impl CryptAlgo {
    pub fn id(self) -> u16 {
        match self {
            CryptAlgo::Null       => 0,
            CryptAlgo::None       => 1,
            CryptAlgo::Blowfish   => 2,
            CryptAlgo::Unknown(i) => i,
        }
    }

    pub fn from_id(id: u16) -> Self {
        match id {
            0 => CryptAlgo::Null,
            1 => CryptAlgo::None,
            2 => CryptAlgo::Blowfish,
            i => CryptAlgo::Unknown(i),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CryptAlgo::Null       => "null",
            CryptAlgo::None       => "none",
            CryptAlgo::Blowfish   => "blowfish",
            CryptAlgo::Unknown(_) => "unknown",
        }
    }

    /// `true` when the payload is stored without encryption.
    pub fn is_plain(self) -> bool {
        matches!(self, CryptAlgo::Null | CryptAlgo::None)
    }
}

// ── Error type ────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Decompression error: {0}")]
    Decompression(String),
    /// The algorithm id is valid on disk but this build cannot decode it.
    #[error("Algorithm {name} (id {id}) is not available in this build")]
    Unavailable { name: &'static str, id: u16 },
    #[error("Decoded {found} byte(s), block header declares {expected}")]
    SizeMismatch { expected: usize, found: usize },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Codec trait ───────────────────────────────────────────────────────────────

pub trait Codec: Send + Sync {
    /// Inflate `data` into exactly `real_size` bytes.
    fn decompress(&self, data: &[u8], real_size: usize) -> Result<Vec<u8>, CodecError>;
}

// ── Built-in decoders ─────────────────────────────────────────────────────────

pub struct NoneCodec;
impl Codec for NoneCodec {
    fn decompress(&self, data: &[u8], _: usize) -> Result<Vec<u8>, CodecError> { Ok(data.to_vec()) }
}

/// zlib stream (the "gzip" id predates the naming cleanup).
pub struct GzipCodec;
impl Codec for GzipCodec {
    fn decompress(&self, data: &[u8], real_size: usize) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(real_size);
        flate2::read::ZlibDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        Ok(out)
    }
}

/// xz container.
pub struct LzmaCodec;
impl Codec for LzmaCodec {
    fn decompress(&self, data: &[u8], real_size: usize) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(real_size);
        lzma_rs::xz_decompress(&mut io::Cursor::new(data), &mut out)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        Ok(out)
    }
}

/// Raw LZ4 block without a size prefix.
pub struct Lz4Codec;
impl Codec for Lz4Codec {
    fn decompress(&self, data: &[u8], real_size: usize) -> Result<Vec<u8>, CodecError> {
        lz4_flex::decompress(data, real_size).map_err(|e| CodecError::Decompression(e.to_string()))
    }
}

pub struct ZstdCodec;
impl Codec for ZstdCodec {
    fn decompress(&self, data: &[u8], real_size: usize) -> Result<Vec<u8>, CodecError> {
        zstd::bulk::decompress(data, real_size).map_err(|e| CodecError::Decompression(e.to_string()))
    }
}

// ── Factory ───────────────────────────────────────────────────────────────────

/// Resolve an algorithm to a built-in decoder.
pub fn get_codec(algo: CompressAlgo) -> Result<Box<dyn Codec>, CodecError> {
    match algo {
        CompressAlgo::None => Ok(Box::new(NoneCodec)),
        CompressAlgo::Gzip => Ok(Box::new(GzipCodec)),
        CompressAlgo::Lzma => Ok(Box::new(LzmaCodec)),
        CompressAlgo::Lz4  => Ok(Box::new(Lz4Codec)),
        CompressAlgo::Zstd => Ok(Box::new(ZstdCodec)),
        other => Err(CodecError::Unavailable { name: other.name(), id: other.id() }),
    }
}

/// Decrypt (when needed) and decompress one verified payload, checking that
/// the result has the size the block header declared.
pub fn decode_payload(
    data:      &[u8],
    compress:  CompressAlgo,
    crypt:     CryptAlgo,
    real_size: usize,
) -> Result<Vec<u8>, CodecError> {
    if !crypt.is_plain() {
        return Err(CodecError::Unavailable { name: crypt.name(), id: crypt.id() });
    }
    let out = get_codec(compress)?.decompress(data, real_size)?;
    if out.len() != real_size {
        return Err(CodecError::SizeMismatch { expected: real_size, found: out.len() });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn ids_are_stable() {
        for id in 0..10u16 {
            assert_eq!(CompressAlgo::from_id(id).id(), id);
            assert_eq!(CryptAlgo::from_id(id).id(), id);
        }
        assert_eq!(CompressAlgo::from_name("ZSTD"), Some(CompressAlgo::Zstd));
        assert_eq!(CompressAlgo::from_name("brotli"), None);
    }

    #[test]
    fn zstd_payload_decodes() {
        let plain = b"zstd block payload zstd block payload".repeat(8);
        let packed = zstd::encode_all(&plain[..], 3).unwrap();
        let out = decode_payload(&packed, CompressAlgo::Zstd, CryptAlgo::None, plain.len()).unwrap();
        assert_eq!(out, plain);
    }

    #[test]
    fn lz4_raw_block_decodes() {
        let plain = b"lz4 lz4 lz4 lz4 lz4 lz4".to_vec();
        let packed = lz4_flex::compress(&plain);
        let out = decode_payload(&packed, CompressAlgo::Lz4, CryptAlgo::Null, plain.len()).unwrap();
        assert_eq!(out, plain);
    }

    #[test]
    fn zlib_payload_decodes() {
        let plain = b"gzip id carries a zlib stream".to_vec();
        let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(&plain).unwrap();
        let packed = enc.finish().unwrap();
        let out = decode_payload(&packed, CompressAlgo::Gzip, CryptAlgo::None, plain.len()).unwrap();
        assert_eq!(out, plain);
    }

    #[test]
    fn unavailable_algorithms_fail_hard() {
        let err = decode_payload(b"x", CompressAlgo::Bzip2, CryptAlgo::None, 1).unwrap_err();
        assert!(matches!(err, CodecError::Unavailable { id: 4, .. }));
        let err = decode_payload(b"x", CompressAlgo::None, CryptAlgo::Blowfish, 1).unwrap_err();
        assert!(matches!(err, CodecError::Unavailable { id: 2, .. }));
    }

    #[test]
    fn size_is_checked() {
        let err = decode_payload(b"abc", CompressAlgo::None, CryptAlgo::None, 4).unwrap_err();
        assert!(matches!(err, CodecError::SizeMismatch { expected: 4, found: 3 }));
    }
}
