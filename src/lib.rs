/// Lecture Segment Muxer
///
/// Scans a folder for paired audio/video segment files produced by a
/// lecture-capture tool, matches them by filename, and muxes each pair into
/// a single file through concurrent ffmpeg invocations.

pub mod config;
pub mod error;
pub mod matcher;
pub mod muxer;
pub mod processing;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::MuxerError;
pub use crate::matcher::{DuplicatePolicy, IncompletePolicy, MatchError, MuxJob, PairMatcher};
pub use crate::muxer::{JobOutcome, JobResult, MuxInvoker};
pub use crate::processing::{BatchProcessor, BatchState, BatchSummary};
