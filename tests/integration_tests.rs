use lecture_muxer::{
    BatchProcessor, ConfigBuilder, MuxInvoker, MuxJob, MuxerError, PairMatcher,
};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::fs;

fn make_jobs(count: usize) -> Vec<MuxJob> {
    (0..count)
        .map(|i| MuxJob {
            audio_path: PathBuf::from(format!("/in/2024-01-10 - Lecture {}_audio.m4s", i + 1)),
            video_path: PathBuf::from(format!("/in/2024-01-10 - Lecture {}_video.m4s", i + 1)),
            output_name: format!("2024-01-10 - Lecture {}.mp4", i + 1),
        })
        .collect()
}

#[tokio::test]
async fn test_matcher_emits_only_complete_pairs() {
    let temp_dir = TempDir::new().unwrap();

    fs::write(temp_dir.path().join("2024-01-10 - Lecture 1_audio.m4s"), b"a").await.unwrap();
    fs::write(temp_dir.path().join("2024-01-10 - Lecture 1_video.m4s"), b"v").await.unwrap();
    fs::write(temp_dir.path().join("2024-01-11 - Lecture 2_video.m4s"), b"v").await.unwrap();
    fs::write(temp_dir.path().join("readme.txt"), b"notes").await.unwrap();

    let matcher = PairMatcher::default();
    let jobs = matcher.match_pairs(temp_dir.path()).await.unwrap();

    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].output_name, "2024-01-10 - Lecture 1.mp4");
    assert_eq!(
        jobs[0].audio_path,
        temp_dir.path().join("2024-01-10 - Lecture 1_audio.m4s")
    );
    assert_eq!(
        jobs[0].video_path,
        temp_dir.path().join("2024-01-10 - Lecture 1_video.m4s")
    );
}

#[tokio::test]
async fn test_matcher_rescan_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();

    for i in 1..=3 {
        let key = format!("2024-02-0{} - Lecture {}", i, i);
        fs::write(temp_dir.path().join(format!("{}_audio.m4s", key)), b"a").await.unwrap();
        fs::write(temp_dir.path().join(format!("{}_video.m4s", key)), b"v").await.unwrap();
    }

    let matcher = PairMatcher::default();
    let first = matcher.match_pairs(temp_dir.path()).await.unwrap();
    let second = matcher.match_pairs(temp_dir.path()).await.unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_matcher_skips_directories() {
    let temp_dir = TempDir::new().unwrap();

    // A directory whose name matches the pattern must not fill a slot
    fs::create_dir(temp_dir.path().join("2024-01-10 - Lecture 1_audio.m4s")).await.unwrap();
    fs::write(temp_dir.path().join("2024-01-10 - Lecture 1_video.m4s"), b"v").await.unwrap();

    let matcher = PairMatcher::default();
    let jobs = matcher.match_pairs(temp_dir.path()).await.unwrap();
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn test_batch_all_jobs_succeed() {
    let temp_dir = TempDir::new().unwrap();
    let output_dir = temp_dir.path().join("out");

    let config = ConfigBuilder::new().with_workers(2).build();
    let processor = BatchProcessor::new(&config, MuxInvoker::new("true"), output_dir);

    let mut progress = Vec::new();
    let mut errors = Vec::new();
    let summary = processor
        .run_batch(
            make_jobs(3),
            |completed, total| progress.push((completed, total)),
            |name, message| errors.push((name.to_string(), message.to_string())),
        )
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.successful, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    assert!(errors.is_empty());

    let state = processor.state();
    assert!(!state.is_running());
    assert_eq!(state.completed(), state.total());
}

#[tokio::test]
async fn test_batch_with_all_failures_still_completes() {
    let temp_dir = TempDir::new().unwrap();

    let config = ConfigBuilder::new().with_workers(2).build();
    let processor = BatchProcessor::new(
        &config,
        MuxInvoker::new("false"),
        temp_dir.path().join("out"),
    );

    let mut errors = Vec::new();
    let summary = processor
        .run_batch(make_jobs(4), |_, _| {}, |name, _| errors.push(name.to_string()))
        .await
        .unwrap();

    assert_eq!(summary.total, 4);
    assert_eq!(summary.successful, 0);
    assert_eq!(summary.failed, 4);
    assert_eq!(errors.len(), 4);

    let mut expected: Vec<String> = make_jobs(4).into_iter().map(|j| j.output_name).collect();
    errors.sort();
    expected.sort();
    assert_eq!(errors, expected);
}

#[tokio::test]
async fn test_batch_with_missing_tool_reports_every_job() {
    let temp_dir = TempDir::new().unwrap();

    let config = ConfigBuilder::new().with_workers(2).build();
    let processor = BatchProcessor::new(
        &config,
        MuxInvoker::new("definitely-not-a-real-muxer"),
        temp_dir.path().join("out"),
    );

    let summary = processor
        .run_batch(make_jobs(2), |_, _| {}, |_, _| {})
        .await
        .unwrap();

    assert_eq!(summary.failed, 2);
    assert!(summary.results.iter().all(|r| !r.is_success()));
}

#[tokio::test]
async fn test_empty_job_list_is_a_configuration_error() {
    let temp_dir = TempDir::new().unwrap();

    let config = ConfigBuilder::new().build();
    let processor = BatchProcessor::new(
        &config,
        MuxInvoker::new("true"),
        temp_dir.path().join("out"),
    );

    let result = processor.run_batch(Vec::new(), |_, _| {}, |_, _| {}).await;
    assert!(matches!(result, Err(MuxerError::Configuration(_))));
    assert!(!processor.state().is_running());
}

#[tokio::test]
async fn test_batch_report_written_to_output_dir() {
    let temp_dir = TempDir::new().unwrap();
    let output_dir = temp_dir.path().join("out");

    let config = ConfigBuilder::new().build();
    let processor = BatchProcessor::new(&config, MuxInvoker::new("true"), output_dir.clone());

    processor
        .run_batch(make_jobs(2), |_, _| {}, |_, _| {})
        .await
        .unwrap();

    let report = fs::read_to_string(output_dir.join("mux_results.json")).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(parsed["total"], 2);
    assert_eq!(parsed["successful"], 2);
    assert_eq!(parsed["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_second_batch_rejected_while_running() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let script = temp_dir.path().join("slow-muxer.sh");
    fs::write(&script, "#!/bin/sh\nsleep 0.5\nexit 0\n").await.unwrap();
    let mut perms = std::fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).unwrap();

    let config = ConfigBuilder::new().with_workers(1).build();
    let invoker = MuxInvoker::new(script.to_string_lossy());
    let processor = Arc::new(BatchProcessor::new(
        &config,
        invoker,
        temp_dir.path().join("out"),
    ));
    let state = processor.state();

    let background = {
        let processor = Arc::clone(&processor);
        tokio::spawn(async move { processor.run_batch(make_jobs(1), |_, _| {}, |_, _| {}).await })
    };

    // Wait for the first batch to claim the running flag
    while !state.is_running() {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let second = processor.run_batch(make_jobs(1), |_, _| {}, |_, _| {}).await;
    assert!(matches!(second, Err(MuxerError::BatchInProgress)));

    let first = background.await.unwrap().unwrap();
    assert_eq!(first.total, 1);
    assert_eq!(first.successful, 1);
}
