use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::matcher::{DuplicatePolicy, IncompletePolicy};

/// Configuration for the lecture segment muxer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Pair matching settings
    pub matching: MatchingConfig,

    /// External muxer settings
    pub muxing: MuxingConfig,

    /// Output and reporting settings
    pub output: OutputConfig,

    /// Performance and resource settings
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// How to treat a second entry for the same lecture key and kind
    pub duplicates: DuplicatePolicy,

    /// How to treat lecture keys with only one of the two segments
    pub incomplete: IncompletePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuxingConfig {
    /// Program name or path of the external muxing tool
    pub ffmpeg_program: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Filename of the JSON batch report written into the output folder
    pub report_filename: String,

    /// Log level
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Maximum number of concurrent workers (0 = twice the hardware
    /// parallelism, capped by the job count)
    pub max_workers: usize,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_paths = [
            "lecture-muxer.toml",
            "config/lecture-muxer.toml",
            "~/.config/lecture-muxer/config.toml",
            "/etc/lecture-muxer/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        // Try environment variables
        if let Ok(config) = Self::from_env() {
            return Ok(config);
        }

        Err(anyhow!("No configuration file found"))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(workers) = std::env::var("LECTURE_MUXER_WORKERS") {
            config.performance.max_workers = workers.parse().unwrap_or(0);
        }

        if let Ok(program) = std::env::var("LECTURE_MUXER_FFMPEG") {
            config.muxing.ffmpeg_program = program;
        }

        if let Ok(log_level) = std::env::var("LECTURE_MUXER_LOG_LEVEL") {
            config.output.log_level = log_level;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.muxing.ffmpeg_program.trim().is_empty() {
            return Err(anyhow!("ffmpeg_program must not be empty"));
        }

        if self.output.report_filename.trim().is_empty() {
            return Err(anyhow!("report_filename must not be empty"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            matching: MatchingConfig {
                duplicates: DuplicatePolicy::Overwrite,
                incomplete: IncompletePolicy::Ignore,
            },
            muxing: MuxingConfig {
                ffmpeg_program: "ffmpeg".to_string(),
            },
            output: OutputConfig {
                report_filename: "mux_results.json".to_string(),
                log_level: "info".to_string(),
            },
            performance: PerformanceConfig {
                max_workers: 0, // Auto-size from hardware parallelism
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.performance.max_workers = workers;
        self
    }

    pub fn with_ffmpeg_program(mut self, program: impl Into<String>) -> Self {
        self.config.muxing.ffmpeg_program = program.into();
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.config.matching.duplicates = policy;
        self
    }

    pub fn with_incomplete_policy(mut self, policy: IncompletePolicy) -> Self {
        self.config.matching.incomplete = policy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
