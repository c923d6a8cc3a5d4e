use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use tracing::{error, info, warn};

use lecture_muxer::config::Config;
use lecture_muxer::matcher::PairMatcher;
use lecture_muxer::muxer::MuxInvoker;
use lecture_muxer::processing::BatchProcessor;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("lecture_muxer=info,warn")
        .init();

    let matches = Command::new("Lecture Segment Muxer")
        .version("0.1.0")
        .about("Muxes paired lecture-capture audio/video segments into single files")
        .arg(
            Arg::new("input-dir")
                .short('i')
                .long("input-dir")
                .value_name("DIR")
                .help("Folder containing the audio/video segment files")
                .required(true)
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Folder for the muxed output files")
                .default_value("./output")
        )
        .arg(
            Arg::new("workers")
                .short('w')
                .long("workers")
                .value_name("NUM")
                .help("Number of parallel workers (0 = auto)")
                .default_value("0")
        )
        .arg(
            Arg::new("list-only")
                .short('l')
                .long("list-only")
                .help("List matched pairs without processing them")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
        )
        .get_matches();

    let input_dir = PathBuf::from(matches.get_one::<String>("input-dir").unwrap());
    let output_dir = PathBuf::from(matches.get_one::<String>("output-dir").unwrap());
    let workers: usize = matches.get_one::<String>("workers").unwrap().parse()?;
    let list_only = matches.get_flag("list-only");
    let verbose = matches.get_flag("verbose");

    if verbose {
        info!("Verbose logging enabled");
    }

    // Load configuration
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });
    config.validate()?;

    if workers > 0 {
        config.performance.max_workers = workers;
    }

    info!("🚀 Lecture Segment Muxer starting...");
    info!("📁 Input directory: {}", input_dir.display());
    info!("📂 Output directory: {}", output_dir.display());

    // Validate input directory
    if !input_dir.exists() {
        error!("Input directory does not exist: {}", input_dir.display());
        return Err(anyhow::anyhow!("Input directory not found"));
    }

    // The external tool must be reachable before any work is attempted
    let invoker = MuxInvoker::new(&config.muxing.ffmpeg_program);
    if let Err(e) = invoker.probe().await {
        error!("{}. Install FFmpeg and make sure it is on the PATH.", e);
        return Err(e.into());
    }

    // Scan for complete audio/video pairs
    let matcher = PairMatcher::new(config.matching.duplicates, config.matching.incomplete);
    let jobs = matcher.match_pairs(&input_dir).await?;

    for job in &jobs {
        info!("  🎞  {} + {} -> {}",
              job.video_path.file_name().unwrap_or_default().to_string_lossy(),
              job.audio_path.file_name().unwrap_or_default().to_string_lossy(),
              job.output_name);
    }

    if list_only {
        info!("Found {} pairs, nothing processed (--list-only)", jobs.len());
        return Ok(());
    }

    if jobs.is_empty() {
        return Err(anyhow::anyhow!(
            "No matching audio/video pairs found in {}",
            input_dir.display()
        ));
    }

    let processor = BatchProcessor::new(&config, invoker, output_dir);
    info!("🔧 Workers: {}", processor.worker_count(jobs.len()));

    // Collect per-job failures for the end-of-batch recap
    let mut failures: Vec<(String, String)> = Vec::new();
    let summary = processor
        .run_batch(
            jobs,
            |completed, total| info!("📊 Progress: {}/{} files completed", completed, total),
            |output_name, message| {
                failures.push((output_name.to_string(), message.to_string()));
            },
        )
        .await?;

    // Print results
    info!("🎉 Processing completed in {:.2}s", summary.total_time.as_secs_f64());
    info!("✅ Successful: {}", summary.successful);
    info!("❌ Failed: {}", summary.failed);
    info!("📊 Success rate: {:.1}%",
        if summary.total > 0 {
            summary.successful as f64 / summary.total as f64 * 100.0
        } else {
            0.0
        }
    );

    for (output_name, message) in &failures {
        error!("Failed to mux {}: {}", output_name, message.lines().last().unwrap_or(message));
    }

    Ok(())
}
