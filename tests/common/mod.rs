#![allow(dead_code)]

use fsa_reader::block::BlockMeta;
use fsa_reader::codec::{CompressAlgo, CryptAlgo};
use fsa_reader::header::{write_header, Magic};
use fsa_reader::volume::{VolumeFooter, VolumeHeader};
use fsa_reader::{fletcher32, Dictionary};
use std::path::Path;

pub const FORMAT: &str = "FsArCh_002";

/// Builds the bytes of one volume file.
pub struct VolumeBuilder {
    pub bytes:      Vec<u8>,
    pub archive_id: u32,
}

impl VolumeBuilder {
    pub fn new(archive_id: u32, volume: u32) -> Self {
        Self::with_header(archive_id, archive_id, volume, FORMAT)
    }

    /// `header_id` goes into the volume-header dictionary, `frame_id` into
    /// the header framing of every record of this volume.
    pub fn with_header(frame_id: u32, header_id: u32, volume: u32, format: &str) -> Self {
        let vh = VolumeHeader {
            archive_id:      header_id,
            volume,
            file_format:     format.to_string(),
            creator_version: "0.8.7".to_string(),
        };
        let mut b = Self { bytes: Vec::new(), archive_id: frame_id };
        b.header(Magic::VolumeHeader, None, &vh.to_dict());
        b
    }

    pub fn header(&mut self, magic: Magic, fs: Option<u16>, dict: &Dictionary) -> &mut Self {
        write_header(&mut self.bytes, magic, self.archive_id, fs, dict).unwrap();
        self
    }

    pub fn marker(&mut self, magic: Magic) -> &mut Self {
        let mut d = Dictionary::new();
        d.add_u32(0, 1, 0);
        self.header(magic, None, &d)
    }

    /// Block stored without compression; returns the payload's offset in
    /// the volume.
    pub fn plain_block(&mut self, fs: u16, offset: u64, payload: &[u8]) -> usize {
        self.block(fs, offset, payload, payload.len() as u32, CompressAlgo::None)
    }

    pub fn block(&mut self, fs: u16, offset: u64, stored: &[u8], real_size: u32, algo: CompressAlgo) -> usize {
        let meta = BlockMeta {
            real_size,
            offset,
            compress_algo:   algo,
            crypt_algo:      CryptAlgo::None,
            archive_size:    stored.len() as u32,
            compressed_size: stored.len() as u32,
            checksum:        fletcher32(stored),
        };
        self.header(Magic::BlockHeader, Some(fs), &meta.to_dict());
        let at = self.bytes.len();
        self.bytes.extend_from_slice(stored);
        at
    }

    pub fn footer(&mut self, volume: u32, last: bool) -> &mut Self {
        let f = VolumeFooter { volume, archive_id: self.archive_id, last };
        self.header(Magic::VolumeFooter, None, &f.to_dict())
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, &self.bytes).unwrap();
    }
}
