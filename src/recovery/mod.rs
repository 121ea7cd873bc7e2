//! Whole-archive scan: walks every volume and every header, verifying each
//! block, and reports how much of the archive is readable.
//!
//! # Failure handling
//! | Condition | Effect |
//! |-----------|--------|
//! | Header checksum mismatch | counted in `corrupt_headers`, scan continues with resync |
//! | Block checksum mismatch | counted in `blocks_corrupt`, scan resyncs inside the block |
//! | Stream ends mid-header or mid-block | `truncated = true`, scan stops |
//! | Block compressed with another algorithm than configured | counted in `algo_mismatches`, logged |
//! | Footer names another volume or archive | counted in `inconsistent_footers`, logged |
//! | Anything else | returned as the error |

pub mod scanner;

use std::collections::BTreeMap;

use log::{info, warn};
use serde::Serialize;

use crate::block::ChecksumStatus;
use crate::codec::CompressAlgo;
use crate::error::ReadError;
use crate::header::Magic;
use crate::io_stream::ArchiveReader;
use crate::volume::VolumeFooter;

pub use scanner::{resync, Resync};

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Blocks of these filesystems are skipped without being read.
    pub skip_filesystems: Vec<u16>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub volumes:              u32,
    pub archive_id:           Option<u32>,
    pub file_format:          Option<String>,
    pub creator_version:      Option<String>,
    /// Valid headers seen, by marker name.
    pub headers:              BTreeMap<String, usize>,
    pub corrupt_headers:      usize,
    pub blocks_ok:            usize,
    pub blocks_corrupt:       usize,
    pub blocks_skipped:       usize,
    /// Bytes passed over by the resync scanner.
    pub resynced_bytes:       u64,
    /// Logical bytes of blocks that passed their checksum.
    pub recoverable_bytes:    u64,
    /// Blocks whose compression differs from `ReaderOptions::compress_algo`.
    pub algo_mismatches:      usize,
    /// Footers whose volume number or archive id disagree with the volume
    /// they close.
    pub inconsistent_footers: usize,
    /// The last volume ended without a final footer.
    pub truncated:            bool,
}

impl ScanReport {
    /// No corruption and no truncation was found.
    pub fn is_clean(&self) -> bool {
        self.corrupt_headers == 0
            && self.blocks_corrupt == 0
            && self.resynced_bytes == 0
            && self.inconsistent_footers == 0
            && !self.truncated
    }

    /// Summary line for display.
    pub fn summary(&self) -> String {
        format!(
            "{} volume(s), {} header(s) ({} corrupt), blocks: {} ok / {} corrupt / {} skipped, \
             {} byte(s) resynced, {:.2} MiB recoverable{}",
            self.volumes,
            self.headers.values().sum::<usize>(),
            self.corrupt_headers,
            self.blocks_ok,
            self.blocks_corrupt,
            self.blocks_skipped,
            self.resynced_bytes,
            self.recoverable_bytes as f64 / 1024.0 / 1024.0,
            if self.truncated { ", TRUNCATED" } else { "" },
        )
    }
}

/// Scan the whole archive behind `reader`, starting at its current volume.
pub fn scan_archive(reader: &mut ArchiveReader, opts: &ScanOptions) -> Result<ScanReport, ReadError> {
    let mut report = ScanReport::default();

    reader.open_volume()?;
    reader.read_volume_header()?;
    report.volumes = 1;

    loop {
        let header = match reader.read_header(true) {
            Ok(h) => h,
            Err(e) if e.is_minor() => {
                report.corrupt_headers += 1;
                continue;
            }
            Err(e) if e.is_eof() => {
                warn!("volume {} ended before its footer", reader.volume_index());
                report.truncated = true;
                reader.close_volume()?;
                break;
            }
            Err(e) => return Err(e),
        };

        report.resynced_bytes += header.skipped;
        *report.headers.entry(header.magic.name().to_string()).or_default() += 1;

        match header.magic {
            Magic::BlockHeader => {
                let skip = header
                    .filesystem
                    .is_some_and(|fs| opts.skip_filesystems.contains(&fs));
                let read = match reader.read_block(&header.dict, skip) {
                    Ok(r) => r,
                    Err(e) if e.is_eof() => {
                        warn!("volume {} ended inside a block payload", reader.volume_index());
                        report.truncated = true;
                        reader.close_volume()?;
                        break;
                    }
                    Err(e) => return Err(e),
                };
                if let Some(info) = &read.info {
                    let expected = reader.session().options.compress_algo;
                    if expected != CompressAlgo::Null && info.meta.compress_algo != expected {
                        warn!(
                            "block at offset {} is compressed with {}, expected {}",
                            info.meta.offset,
                            info.meta.compress_algo.name(),
                            expected.name(),
                        );
                        report.algo_mismatches += 1;
                    }
                }
                match read.status {
                    ChecksumStatus::Ok => {
                        report.blocks_ok += 1;
                        if let Some(info) = &read.info {
                            report.recoverable_bytes += info.meta.real_size as u64;
                        }
                    }
                    ChecksumStatus::Corrupt => report.blocks_corrupt += 1,
                    ChecksumStatus::Unknown => report.blocks_skipped += 1,
                }
            }
            Magic::VolumeFooter => {
                let footer = VolumeFooter::from_header(&header)?;
                let volume = reader.volume_index();
                let archive_id = reader.session().archive_id.get().copied();
                if footer.volume != volume || archive_id.is_some_and(|id| id != footer.archive_id) {
                    warn!(
                        "footer of volume {volume} names volume {} of archive {:08x}",
                        footer.volume, footer.archive_id,
                    );
                    report.inconsistent_footers += 1;
                }
                reader.close_volume()?;
                if footer.last {
                    break;
                }
                reader.next_volume()?;
                reader.open_volume()?;
                reader.read_volume_header()?;
                report.volumes += 1;
            }
            _ => {}
        }
    }

    let session = reader.session();
    report.archive_id      = session.archive_id.get().copied();
    report.file_format     = session.file_format.get().cloned();
    report.creator_version = session.creator_version.clone();

    info!("scan finished: {}", report.summary());
    Ok(report)
}
