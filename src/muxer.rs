use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{MuxerError, Result};
use crate::matcher::MuxJob;

/// Outcome of one mux invocation. Failure carries the captured diagnostic
/// output of the external process, or the spawn error text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    Success,
    Failure(String),
}

/// Record of one completed invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub output_name: String,
    pub elapsed: Duration,
    pub outcome: JobOutcome,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        self.outcome == JobOutcome::Success
    }
}

/// Wraps the external muxing tool. Combines one video stream and one audio
/// stream into a single container, copying video and re-encoding audio to
/// AAC. The argument order and literal flag values are part of the contract.
#[derive(Debug, Clone)]
pub struct MuxInvoker {
    program: String,
}

impl MuxInvoker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Check that the external tool can be started at all. Must pass before
    /// any batch work is attempted.
    pub async fn probe(&self) -> Result<()> {
        let result = tokio::process::Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match result {
            Ok(_) => {
                debug!("Probed external muxer: {}", self.program);
                Ok(())
            }
            Err(e) => Err(MuxerError::ToolUnavailable(format!(
                "{}: {}",
                self.program, e
            ))),
        }
    }

    /// Run one mux invocation to completion, overwriting any existing file at
    /// the output path. Every failure mode, non-zero exit, spawn failure or
    /// output-capture error, is folded into `JobOutcome::Failure`; this never
    /// returns an error past its own boundary.
    pub async fn invoke(&self, job: &MuxJob, output_dir: &Path) -> JobResult {
        let start = Instant::now();
        let output_path = output_dir.join(&job.output_name);

        debug!("🎬 Muxing {} + {} -> {}",
              job.video_path.display(),
              job.audio_path.display(),
              output_path.display());

        let result = tokio::process::Command::new(&self.program)
            .arg("-i")
            .arg(&job.video_path)
            .arg("-i")
            .arg(&job.audio_path)
            .args(["-c:v", "copy", "-c:a", "aac", "-map", "0:v:0", "-map", "1:a:0", "-y"])
            .arg(&output_path)
            .stdin(Stdio::null())
            .output()
            .await;

        let outcome = match result {
            Ok(output) if output.status.success() => JobOutcome::Success,
            Ok(output) => JobOutcome::Failure(String::from_utf8_lossy(&output.stderr).into_owned()),
            Err(e) => JobOutcome::Failure(format!("Failed to start {}: {}", self.program, e)),
        };

        let elapsed = start.elapsed();
        if outcome == JobOutcome::Success {
            info!("✅ Muxed {} in {:.2}s", job.output_name, elapsed.as_secs_f64());
        }

        JobResult {
            output_name: job.output_name.clone(),
            elapsed,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn dummy_job() -> MuxJob {
        MuxJob {
            audio_path: PathBuf::from("/nonexistent/a_audio.m4s"),
            video_path: PathBuf::from("/nonexistent/a_video.m4s"),
            output_name: "a.mp4".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_tool_is_failure_not_panic() {
        let invoker = MuxInvoker::new("definitely-not-a-real-muxer");
        let result = invoker.invoke(&dummy_job(), Path::new("/tmp")).await;
        assert!(!result.is_success());
        assert!(matches!(result.outcome, JobOutcome::Failure(ref msg) if msg.contains("Failed to start")));
    }

    #[tokio::test]
    async fn test_probe_missing_tool() {
        let invoker = MuxInvoker::new("definitely-not-a-real-muxer");
        assert!(matches!(
            invoker.probe().await,
            Err(MuxerError::ToolUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_probe_present_tool() {
        // Any spawnable binary counts as available; exit code is not checked.
        let invoker = MuxInvoker::new("true");
        assert!(invoker.probe().await.is_ok());
    }
}
