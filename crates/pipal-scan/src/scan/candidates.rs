//! Post-processing of scan output.
//!
//! Reads every `batch-*.txt` file a scan wrote, keeps long palindromes whose
//! last digit can end a prime (anything but 0, 2, 4, 5, 6, 8), and optionally
//! reads each one back from the stored digits to confirm its offset.

use crate::scan::config::CandidateConfig;
use anyhow::Context;
use pipal::{
    Bucket, CachedReader, CatalogManifest, DigitReader, Error, FsBucket, PalindromeRecord, RawRead,
};
use serde::Serialize;
use std::{path::Path, sync::Arc};
use tokio::fs;

/// Last digits that rule out a prime.
const EVEN_OR_FIVE: &[u8] = b"024568";

/// One line of the candidate report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub size: usize,
    /// Zero-based offset of the first digit.
    pub offset: u64,
    pub palindrome: String,
    /// Whether the stored digits at `offset` match; `None` when not checked.
    pub validated: Option<bool>,
}

impl From<PalindromeRecord> for Candidate {
    fn from(record: PalindromeRecord) -> Self {
        Self {
            size: record.length,
            offset: record.offset(),
            palindrome: record.text,
            validated: None,
        }
    }
}

/// Parses one output line, `<chunk_start>, <center>, <text>, <length>`.
pub fn parse_record(line: &str) -> Option<PalindromeRecord> {
    let mut fields = line.split(',').map(str::trim);
    let record = PalindromeRecord {
        chunk_start: fields.next()?.parse().ok()?,
        center: fields.next()?.parse().ok()?,
        text: fields.next()?.to_string(),
        length: fields.next()?.parse().ok()?,
    };
    if fields.next().is_some() || record.text.len() != record.length || record.length == 0 {
        return None;
    }
    Some(record)
}

/// Whether `record` is long enough and ends in a digit a prime can end in.
pub fn is_candidate(record: &PalindromeRecord, min_size: usize) -> bool {
    record.length >= min_size
        && record
            .text
            .as_bytes()
            .last()
            .is_some_and(|d| !EVEN_OR_FIVE.contains(d))
}

/// Reads every record from the `batch-*.txt` files in `dir`. Malformed lines
/// are skipped.
pub async fn load_records(dir: &Path) -> anyhow::Result<Vec<PalindromeRecord>> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to list {}", dir.display()))?;
    let mut records = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !(name.starts_with("batch-") && name.ends_with(".txt")) {
            continue;
        }

        let text = fs::read_to_string(entry.path())
            .await
            .with_context(|| format!("failed to read {name}"))?;
        for (_line_no, line) in text.lines().enumerate() {
            match parse_record(line) {
                Some(record) => records.push(record),
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Skipping malformed line {} of {name}: {line:?}", _line_no + 1);
                }
            }
        }
    }

    Ok(records)
}

/// Filters `records` down to candidates, largest first. Ties are ordered by
/// offset.
pub fn select_candidates(records: Vec<PalindromeRecord>, min_size: usize) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = records
        .into_iter()
        .filter(|r| is_candidate(r, min_size))
        .map(Candidate::from)
        .collect();
    candidates.sort_by(|a, b| b.size.cmp(&a.size).then(a.offset.cmp(&b.offset)));
    candidates
}

/// Reads the candidate's digits back and records whether they match.
///
/// A candidate reaching past the stored digits is marked invalid.
pub async fn validate<R: RawRead>(
    reader: &DigitReader<R>,
    candidate: &mut Candidate,
) -> pipal::Result<()> {
    let mut digits = vec![0; candidate.size];
    let matches = match reader.read_at(&mut digits, candidate.offset).await {
        Ok(_) => digits == candidate.palindrome.as_bytes(),
        Err(Error::OutOfRange { .. }) => false,
        Err(e) => return Err(e),
    };
    candidate.validated = Some(matches);
    Ok(())
}

/// Checks every candidate against the catalog in `bucket`.
pub async fn validate_all<B: Bucket>(
    manifest: CatalogManifest,
    bucket: Arc<B>,
    candidates: &mut [Candidate],
) -> anyhow::Result<()> {
    let set = manifest.into_result_set()?;
    let reader = DigitReader::new(CachedReader::new(set.reader(bucket)));
    for candidate in candidates.iter_mut() {
        validate(&reader, candidate)
            .await
            .with_context(|| format!("failed to validate offset {}", candidate.offset))?;
        #[cfg(feature = "tracing")]
        if candidate.validated == Some(false) {
            tracing::warn!(
                "Candidate at offset {} does not match the stored digits",
                candidate.offset
            );
        }
    }
    Ok(())
}

/// Builds the candidate report described by `config`.
pub async fn run(config: &CandidateConfig) -> anyhow::Result<Vec<Candidate>> {
    let records = load_records(&config.results_dir).await?;
    let _found = records.len();
    let mut candidates = select_candidates(records, config.min_size);

    #[cfg(feature = "tracing")]
    tracing::info!(
        "{} of {_found} palindromes are candidates of at least {} digits",
        candidates.len(),
        config.min_size
    );

    if let Some(catalog) = &config.catalog {
        let manifest = CatalogManifest::load(catalog)
            .await
            .with_context(|| format!("failed to load catalog {}", catalog.display()))?;
        let bucket = Arc::new(FsBucket::new(&config.bucket_dir));
        validate_all(manifest, bucket, &mut candidates).await?;
    }

    Ok(candidates)
}
