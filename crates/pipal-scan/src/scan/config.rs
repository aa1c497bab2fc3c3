use crate::scan::streaming::retry::RetryPolicy;
use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use core::time::Duration;
use std::path::PathBuf;

/// Smallest overlap that lets the owning chunk see every palindrome of
/// [`pipal::MIN_RADIUS`] whole, wherever its center falls.
pub const MIN_OVERLAP: usize = 2 * (pipal::MIN_RADIUS + 1);

/// Command line of the `pipal-scan` binary.
///
/// Every option can also be set through the environment variable named in its
/// help text, or a `.env` file in the working directory.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pipal-scan",
    version,
    about = "Scan stored digits of pi for long palindromes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scan the digit stream in overlapping chunks and write one result file
    /// per chunk.
    Scan(ScanArgs),
    /// Filter scan results down to prime candidates and verify them against
    /// the stored digits.
    Candidates(CandidateArgs),
}

/// Runtime configuration for the `scan` subcommand.
///
/// These settings control where digits come from, how the stream is cut into
/// chunks, and how much work runs concurrently.
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// First digit offset to scan. To resume an interrupted run, pass the
    /// id of the first missing chunk minus the overlap.
    ///
    /// Environment variable: `START_OFFSET`
    #[arg(short = 's', long = "start", env = "START_OFFSET", default_value_t = 0)]
    pub start: u64,

    /// JSON manifest listing every stored block.
    ///
    /// Environment variable: `CATALOG_PATH`
    #[arg(long, env = "CATALOG_PATH", default_value = "catalog.json")]
    pub catalog: PathBuf,

    /// Directory the block objects are read from. Object names in the
    /// manifest are relative to it.
    ///
    /// Environment variable: `BUCKET_DIR`
    #[arg(long, env = "BUCKET_DIR", default_value = ".")]
    pub bucket_dir: PathBuf,

    /// Directory that receives one `batch-<id>.txt` file per chunk.
    ///
    /// Environment variable: `OUTPUT_DIR`
    #[arg(long, env = "OUTPUT_DIR", default_value = "full_results")]
    pub output_dir: PathBuf,

    /// Digits per chunk.
    ///
    /// Environment variable: `CHUNK_SIZE`
    #[arg(long, env = "CHUNK_SIZE", default_value_t = 100_000_000)]
    pub chunk_size: usize,

    /// Digits shared by consecutive chunks, so palindromes straddling a
    /// chunk boundary are still seen whole. Palindromes shorter than
    /// `overlap - 2` digits are reported exactly once; longer ones near a
    /// boundary may be cut short or missed. At least [`MIN_OVERLAP`].
    ///
    /// Environment variable: `CHUNK_OVERLAP`
    #[arg(long, env = "CHUNK_OVERLAP", default_value_t = 1_000)]
    pub overlap: usize,

    /// Radius every expansion starts from, and the margin of centers skipped
    /// at both ends of a chunk. The first chunk of a run always uses 0. Must
    /// stay below [`pipal::MIN_RADIUS`].
    ///
    /// Environment variable: `SAFE_OFFSET`
    #[arg(long, env = "SAFE_OFFSET", default_value_t = 1)]
    pub safe_offset: usize,

    /// Number of concurrent chunk workers.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = 150)]
    pub num_workers: usize,

    /// Capacity of the queue between the chunk planner and the workers.
    ///
    /// Environment variable: `QUEUE_CAPACITY`
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = 150)]
    pub queue_capacity: usize,

    /// Attempts per chunk fetch, including the first.
    ///
    /// Environment variable: `MAX_ATTEMPTS`
    #[arg(long, env = "MAX_ATTEMPTS", default_value_t = 3)]
    pub max_attempts: u32,

    /// Delay before the first retry; each later retry doubles it.
    ///
    /// Environment variable: `INITIAL_BACKOFF_MS`
    #[arg(long, env = "INITIAL_BACKOFF_MS", default_value_t = 1_000)]
    pub initial_backoff_ms: u64,

    /// Serve ranged reads through a page cache shared by every worker for
    /// the whole run, so the digits two neighbouring chunks share are
    /// fetched once.
    ///
    /// Environment variable: `PAGE_CACHE`
    #[arg(long, env = "PAGE_CACHE", default_value_t = false)]
    pub cache: bool,

    /// Page size of the read cache, in bytes.
    ///
    /// Environment variable: `CACHE_PAGE_SIZE`
    #[arg(long, env = "CACHE_PAGE_SIZE", default_value_t = pipal::DEFAULT_PAGE_SIZE)]
    pub cache_page_size: u64,

    /// Pages kept by the shared cache.
    ///
    /// Environment variable: `CACHE_PAGES`
    #[arg(long, env = "CACHE_PAGES", default_value_t = pipal::DEFAULT_PAGE_CAPACITY)]
    pub cache_pages: u64,
}

/// Page cache settings for chunk readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub page_size: u64,
    pub pages: u64,
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub start: u64,
    pub catalog: PathBuf,
    pub bucket_dir: PathBuf,
    pub output_dir: PathBuf,
    pub chunk_size: usize,
    pub overlap: usize,
    pub safe_offset: usize,
    pub num_workers: usize,
    pub queue_capacity: usize,
    pub retry: RetryPolicy,
    pub cache: Option<CacheConfig>,
}

impl TryFrom<ScanArgs> for ScanConfig {
    type Error = anyhow::Error;

    fn try_from(args: ScanArgs) -> Result<Self, Self::Error> {
        if args.num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }
        if args.queue_capacity == 0 {
            bail!("QUEUE_CAPACITY must be greater than 0");
        }
        if args.chunk_size == 0 {
            bail!("CHUNK_SIZE must be greater than 0");
        }
        if args.overlap >= args.chunk_size {
            bail!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                args.overlap,
                args.chunk_size
            );
        }
        if args.overlap < MIN_OVERLAP {
            bail!(
                "CHUNK_OVERLAP ({}) must be at least {MIN_OVERLAP} so boundary palindromes are seen whole",
                args.overlap
            );
        }
        if args.safe_offset >= pipal::MIN_RADIUS {
            bail!(
                "SAFE_OFFSET ({}) must be smaller than the minimum radius {}",
                args.safe_offset,
                pipal::MIN_RADIUS
            );
        }
        if args.max_attempts == 0 {
            bail!("MAX_ATTEMPTS must be at least 1");
        }
        if args.cache && (args.cache_page_size == 0 || args.cache_pages == 0) {
            bail!("CACHE_PAGE_SIZE and CACHE_PAGES must be greater than 0");
        }

        Ok(Self {
            start: args.start,
            catalog: args.catalog,
            bucket_dir: args.bucket_dir,
            output_dir: args.output_dir,
            chunk_size: args.chunk_size,
            overlap: args.overlap,
            safe_offset: args.safe_offset,
            num_workers: args.num_workers,
            queue_capacity: args.queue_capacity,
            retry: RetryPolicy::new(
                args.max_attempts,
                Duration::from_millis(args.initial_backoff_ms),
            ),
            cache: args.cache.then_some(CacheConfig {
                page_size: args.cache_page_size,
                pages: args.cache_pages,
            }),
        })
    }
}

/// Runtime configuration for the `candidates` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CandidateArgs {
    /// Directory holding the `batch-*.txt` files written by `scan`.
    ///
    /// Environment variable: `OUTPUT_DIR`
    #[arg(long, env = "OUTPUT_DIR", default_value = "full_results")]
    pub results_dir: PathBuf,

    /// Shortest palindrome kept.
    ///
    /// Environment variable: `MIN_CANDIDATE_SIZE`
    #[arg(long, env = "MIN_CANDIDATE_SIZE", default_value_t = 25)]
    pub min_size: usize,

    /// Manifest used to re-read each candidate. Validation is skipped when
    /// not given.
    ///
    /// Environment variable: `CATALOG_PATH`
    #[arg(long, env = "CATALOG_PATH")]
    pub catalog: Option<PathBuf>,

    /// Directory the block objects are read from.
    ///
    /// Environment variable: `BUCKET_DIR`
    #[arg(long, env = "BUCKET_DIR", default_value = ".")]
    pub bucket_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CandidateConfig {
    pub results_dir: PathBuf,
    pub min_size: usize,
    pub catalog: Option<PathBuf>,
    pub bucket_dir: PathBuf,
}

impl TryFrom<CandidateArgs> for CandidateConfig {
    type Error = anyhow::Error;

    fn try_from(args: CandidateArgs) -> Result<Self, Self::Error> {
        if args.min_size == 0 {
            bail!("MIN_CANDIDATE_SIZE must be greater than 0");
        }
        Ok(Self {
            results_dir: args.results_dir,
            min_size: args.min_size,
            catalog: args.catalog,
            bucket_dir: args.bucket_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Command {
        Cli::try_parse_from(core::iter::once("pipal-scan").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    fn scan_args(args: &[&str]) -> ScanArgs {
        match parse(&[&["scan"][..], args].concat()) {
            Command::Scan(args) => args,
            Command::Candidates(_) => unreachable!(),
        }
    }

    #[test]
    fn defaults_match_production_run() {
        let config = ScanConfig::try_from(scan_args(&[])).unwrap();
        assert_eq!(config.start, 0);
        assert_eq!(config.chunk_size, 100_000_000);
        assert_eq!(config.overlap, 1_000);
        assert_eq!(config.safe_offset, 1);
        assert_eq!(config.num_workers, 150);
        assert_eq!(config.queue_capacity, 150);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_backoff, Duration::from_secs(1));
        assert_eq!(config.output_dir, PathBuf::from("full_results"));
        assert!(config.cache.is_none());
    }

    #[test]
    fn short_start_flag_and_cache() {
        let config =
            ScanConfig::try_from(scan_args(&["-s", "4200", "--cache", "--cache-pages", "8"]))
                .unwrap();
        assert_eq!(config.start, 4_200);
        assert_eq!(
            config.cache,
            Some(CacheConfig {
                page_size: pipal::DEFAULT_PAGE_SIZE,
                pages: 8
            })
        );
    }

    #[test]
    fn rejects_unusable_settings() {
        for bad in [
            &["--num-workers", "0"][..],
            &["--queue-capacity", "0"],
            &["--chunk-size", "100", "--overlap", "100"],
            &["--chunk-size", "100", "--overlap", "10"],
            &["--overlap", "19"],
            &["--safe-offset", "9"],
            &["--safe-offset", "40"],
            &["--max-attempts", "0"],
        ] {
            assert!(ScanConfig::try_from(scan_args(bad)).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn smallest_overlap_is_accepted() {
        let config = ScanConfig::try_from(scan_args(&[
            "--chunk-size",
            "100",
            "--overlap",
            "20",
            "--safe-offset",
            "8",
        ]))
        .unwrap();
        assert_eq!(config.overlap, MIN_OVERLAP);
        assert_eq!(config.safe_offset, pipal::MIN_RADIUS - 1);
    }

    #[test]
    fn candidates_subcommand() {
        let Command::Candidates(args) = parse(&["candidates", "--min-size", "31"]) else {
            panic!("expected candidates");
        };
        let config = CandidateConfig::try_from(args).unwrap();
        assert_eq!(config.min_size, 31);
        assert!(config.catalog.is_none());
    }
}
