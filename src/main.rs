use clap::{ArgAction, Parser, Subcommand};
use fsa_reader::codec::{CompressAlgo, CryptAlgo};
use fsa_reader::io_stream::ArchiveReader;
use fsa_reader::recovery::{scan_archive, ScanOptions};
use fsa_reader::session::ReaderOptions;
use fsa_reader::volume::volume_path;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fsa-probe", about = "Inspect and verify multi-volume filesystem archives")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the file name of a volume
    Path {
        archive: PathBuf,
        volume:  u32,
    },
    /// Show the volume header of the first volume
    Info {
        archive: PathBuf,
    },
    /// Walk every volume, verify every block and report corruption
    Scan {
        archive: PathBuf,
        /// Skip the blocks of this filesystem id (repeatable)
        #[arg(long = "skip-fs")]
        skip_fs: Vec<u16>,
        /// Give up resynchronising after this many bytes
        #[arg(long)]
        max_resync: Option<u64>,
        /// Expected block compression (none, gzip, lzma, lz4, zstd ...);
        /// blocks compressed otherwise are reported
        #[arg(short, long, value_parser = parse_compress)]
        compress: Option<CompressAlgo>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {

        // ── Path ─────────────────────────────────────────────────────────────
        Commands::Path { archive, volume } => {
            println!("{}", volume_path(&archive, volume)?.display());
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { archive } => {
            let mut reader = ArchiveReader::new(&archive, ReaderOptions::default())?;
            reader.open_volume()?;
            let vh = reader.read_volume_header()?;
            reader.close_volume()?;

            println!("── Archive ──────────────────────────────────────────────");
            println!("  Path           {}", reader.volume_path().display());
            println!("  Archive id     {:08x}", vh.archive_id);
            println!("  Volume         {}", vh.volume);
            println!("  File format    {}", vh.file_format);
            println!("  Created by     {}", vh.creator_version);
        }

        // ── Scan ─────────────────────────────────────────────────────────────
        Commands::Scan { archive, skip_fs, max_resync, compress, json } => {
            let options = ReaderOptions {
                compress_algo:       compress.unwrap_or_default(),
                crypt_algo:          CryptAlgo::Null,
                compress_level:      None,
                max_resync_distance: max_resync,
            };
            let mut reader = ArchiveReader::new(&archive, options)?;
            let report = scan_archive(&mut reader, &ScanOptions { skip_filesystems: skip_fs })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Archive: {}", archive.display());
                if let Some(id) = report.archive_id {
                    println!("  Archive id     {id:08x}");
                }
                for (name, count) in &report.headers {
                    println!("  {name:<18} {count:>8}");
                }
                if report.algo_mismatches > 0 {
                    println!("  {:<18} {:>8}", "Other compression", report.algo_mismatches);
                }
                if report.inconsistent_footers > 0 {
                    println!("  {:<18} {:>8}", "Bad footers", report.inconsistent_footers);
                }
                println!("{}", report.summary());
            }
            if !report.is_clean() {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

fn parse_compress(s: &str) -> Result<CompressAlgo, String> {
    CompressAlgo::from_name(s).ok_or_else(|| format!("unknown compression '{s}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_flag_rejects_unknown_names() {
        assert_eq!(parse_compress("zstd"), Ok(CompressAlgo::Zstd));
        assert_eq!(parse_compress("LZ4"), Ok(CompressAlgo::Lz4));
        assert!(parse_compress("brotli").is_err());

        let cli = Cli::try_parse_from(["fsa-probe", "scan", "a.fsa", "--compress", "gzip"]).unwrap();
        assert!(matches!(cli.command, Commands::Scan { compress: Some(CompressAlgo::Gzip), .. }));
        assert!(Cli::try_parse_from(["fsa-probe", "scan", "a.fsa", "--compress", "brotli"]).is_err());
    }
}
