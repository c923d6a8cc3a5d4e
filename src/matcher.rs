use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result type for pair-matching operations
pub type Result<T> = std::result::Result<T, MatchError>;

/// Error types for pair-matching operations
#[derive(thiserror::Error, Debug)]
pub enum MatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Duplicate {kind} entry for \"{key}\": {entry}")]
    DuplicateEntry {
        key: String,
        kind: String,
        entry: String,
    },
}

/// Filename pattern for lecture segment files. Group 1 is the lecture key,
/// group 2 is the segment kind (audio or video).
const SEGMENT_PATTERN: &str = r"^(\d{4}-\d{2}-\d{2} - Lecture \d+.*?)_(audio|video)\.m4s$";

/// Container extension for muxed output files
const OUTPUT_EXTENSION: &str = "mp4";

/// How to handle a second audio (or video) entry for the same lecture key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Keep the entry observed last (original behavior)
    Overwrite,
    /// Fail the scan with a `DuplicateEntry` error
    Reject,
}

/// How to handle a lecture key that has only one of its two segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncompletePolicy {
    /// Drop the key without comment (original behavior)
    Ignore,
    /// Drop the key but log a warning naming it
    Warn,
}

/// One matched audio/video pair, ready to be muxed into a single output file.
/// Immutable once created; `output_name` is the lecture key plus the fixed
/// container extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuxJob {
    pub audio_path: PathBuf,
    pub video_path: PathBuf,
    pub output_name: String,
}

/// Per-key accumulator filled as the scan discovers matching entries
#[derive(Debug, Default)]
struct PairCandidate {
    audio: Option<String>,
    video: Option<String>,
}

/// Scans a directory listing for paired lecture segments
#[derive(Debug, Clone)]
pub struct PairMatcher {
    pattern: Regex,
    duplicates: DuplicatePolicy,
    incomplete: IncompletePolicy,
}

impl PairMatcher {
    pub fn new(duplicates: DuplicatePolicy, incomplete: IncompletePolicy) -> Self {
        Self {
            pattern: Regex::new(SEGMENT_PATTERN).unwrap(),
            duplicates,
            incomplete,
        }
    }

    /// Scan `input_dir` (non-recursive) and return one job per complete
    /// audio/video pair. Holds no state between calls; re-scanning an
    /// unchanged folder yields an identical job list.
    pub async fn match_pairs(&self, input_dir: &Path) -> Result<Vec<MuxJob>> {
        let mut entries = tokio::fs::read_dir(input_dir).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        let jobs = self.pair_up(names, input_dir)?;
        info!("🔍 Found {} matching pairs in {}", jobs.len(), input_dir.display());
        Ok(jobs)
    }

    /// Group a directory listing into complete pairs. Entries that do not
    /// match the segment pattern are ignored. Jobs are sorted by output name
    /// so the result is independent of listing order.
    pub fn pair_up(
        &self,
        entries: impl IntoIterator<Item = String>,
        input_dir: &Path,
    ) -> Result<Vec<MuxJob>> {
        let mut candidates: HashMap<String, PairCandidate> = HashMap::new();

        for entry in entries {
            let Some(captures) = self.pattern.captures(&entry) else {
                continue;
            };
            let key = captures[1].to_string();
            let kind = &captures[2];

            let candidate = candidates.entry(key.clone()).or_default();
            let slot = match kind {
                "audio" => &mut candidate.audio,
                _ => &mut candidate.video,
            };

            if let Some(previous) = slot.replace(entry.clone()) {
                match self.duplicates {
                    DuplicatePolicy::Overwrite => {
                        debug!("Duplicate {} entry for \"{}\": {} replaces {}", kind, key, entry, previous);
                    }
                    DuplicatePolicy::Reject => {
                        return Err(MatchError::DuplicateEntry {
                            key,
                            kind: kind.to_string(),
                            entry,
                        });
                    }
                }
            }
        }

        let mut jobs = Vec::new();
        for (key, candidate) in candidates {
            match (candidate.audio, candidate.video) {
                (Some(audio), Some(video)) => {
                    jobs.push(MuxJob {
                        audio_path: input_dir.join(audio),
                        video_path: input_dir.join(video),
                        output_name: format!("{}.{}", key, OUTPUT_EXTENSION),
                    });
                }
                (audio, _) => {
                    if self.incomplete == IncompletePolicy::Warn {
                        let missing = if audio.is_none() { "audio" } else { "video" };
                        warn!("Incomplete pair for \"{}\": missing {} segment", key, missing);
                    }
                }
            }
        }

        jobs.sort_by(|a, b| a.output_name.cmp(&b.output_name));
        Ok(jobs)
    }
}

impl Default for PairMatcher {
    fn default() -> Self {
        Self::new(DuplicatePolicy::Overwrite, IncompletePolicy::Ignore)
    }
}
