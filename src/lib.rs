pub mod checksum;
pub mod dict;
pub mod error;
pub mod header;
pub mod session;
pub mod codec;
pub mod block;
pub mod volume;
pub mod recovery;
pub mod io_stream;
pub mod lookup;

pub use checksum::fletcher32;
pub use dict::{Dictionary, Record, RecordType};
pub use error::{ReadError, Severity};
pub use header::{read_header, write_header, Header, Magic};
pub use session::{Latch, ReaderOptions, SessionState};
pub use codec::{CompressAlgo, CryptAlgo};
pub use block::{read_block, BlockInfo, BlockMeta, BlockRead, ChecksumStatus};
pub use volume::{volume_path, VolumeFile, VolumeFooter, VolumeHeader};
pub use recovery::{scan_archive, ScanOptions, ScanReport};
pub use io_stream::ArchiveReader;
pub use lookup::TwoKeyMap;
