//! End-to-end runs over synthetic frames with an injected face detection

use std::f64::consts::PI;
use std::sync::Arc;

use bpcam_signals::predict::{BpModel, Estimator};
use bpcam_signals::vision::{ExternalFaceDetector, FaceDetection, Frame, MemoryFrameSource};
use bpcam_signals::{BpCategory, BpConfig, BpPipeline, BpPredictor, PipelineError, PredictionSource, RawSignal};

const FPS: f64 = 30.0;
const PULSE_HZ: f64 = 1.2;

/// Frames whose green channel pulses at `PULSE_HZ`
fn pulsing_frames(n: usize) -> Vec<Frame> {
    (0..n)
        .map(|i| {
            let t = i as f64 / FPS;
            let green = (120.0 + 4.0 * (2.0 * PI * PULSE_HZ * t).sin()).round() as u8;
            Frame::filled(64, 64, [90, green, 70], t)
        })
        .collect()
}

fn face() -> ExternalFaceDetector {
    ExternalFaceDetector::new(vec![FaceDetection::from_bbox([8.0, 8.0, 48.0, 48.0], 1.0)])
}

fn fallback_pipeline(config: BpConfig) -> BpPipeline {
    BpPipeline::with_predictor(config, Arc::new(BpPredictor::fallback_only()))
}

#[test]
fn test_five_seconds_of_pulse() {
    let pipeline = fallback_pipeline(BpConfig::default());
    let mut source = MemoryFrameSource::new(pulsing_frames(150));

    let outcome = pipeline.run(&mut source, face()).unwrap();
    let features = outcome.estimate.features;

    assert_eq!(outcome.stats.frames, 150);
    assert_eq!(outcome.stats.localized, 150);
    assert_eq!(outcome.estimate.samples, 150);
    assert!((outcome.estimate.fs - FPS).abs() < 1e-9);
    assert!(
        (features.dominant_frequency - PULSE_HZ).abs() <= 0.2,
        "dominant {}",
        features.dominant_frequency
    );
    assert!((4..=8).contains(&features.num_peaks), "peaks {}", features.num_peaks);
    assert!((features.mean_peak_interval - 1.0 / PULSE_HZ).abs() < 0.15);
    assert!(outcome.estimate.prediction.source.is_fallback());
    assert_eq!(outcome.artifacts.len(), 0);
}

#[test]
fn test_parallel_run_matches_sequential() {
    let pipeline = fallback_pipeline(BpConfig::default());

    let mut source = MemoryFrameSource::new(pulsing_frames(120));
    let sequential = pipeline.run(&mut source, face()).unwrap();
    let mut source = MemoryFrameSource::new(pulsing_frames(120));
    let parallel = pipeline.run_parallel(&mut source, face()).unwrap();

    assert_eq!(parallel.estimate.features, sequential.estimate.features);
    assert_eq!(parallel.stats, sequential.stats);
}

#[test]
fn test_features_are_bit_identical_across_runs() {
    let pipeline = fallback_pipeline(BpConfig::default());
    let run = || {
        let mut source = MemoryFrameSource::new(pulsing_frames(150));
        pipeline.run(&mut source, face()).unwrap().estimate.features
    };

    let first = run().to_array().map(f64::to_bits);
    let second = run().to_array().map(f64::to_bits);
    assert_eq!(first, second);
}

#[test]
fn test_no_face_reports_localization_counts() {
    let pipeline = fallback_pipeline(BpConfig::default());
    let mut source = MemoryFrameSource::new(pulsing_frames(40));

    let err = pipeline.run(&mut source, ExternalFaceDetector::default()).unwrap_err();
    match err {
        PipelineError::InsufficientSignal {
            samples,
            required,
            frames,
            localized,
            longest_miss_streak,
        } => {
            assert_eq!(samples, 0);
            assert_eq!(required, 30);
            assert_eq!(frames, 40);
            assert_eq!(localized, 0);
            assert_eq!(longest_miss_streak, 40);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_minimum_sample_boundary() {
    let pipeline = fallback_pipeline(BpConfig::default());

    let mut source = MemoryFrameSource::new(pulsing_frames(29));
    let err = pipeline.run(&mut source, face()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InsufficientSignal {
            samples: 29,
            required: 30,
            ..
        }
    ));

    let mut source = MemoryFrameSource::new(pulsing_frames(30));
    let outcome = pipeline.run(&mut source, face()).unwrap();
    assert_eq!(outcome.estimate.samples, 30);
}

#[test]
fn test_model_artifact_drives_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("bp_predictor.bin");
    BpModel::new(
        "linear-2024.1",
        None,
        Estimator::Linear {
            systolic: vec![0.0; 11],
            diastolic: vec![0.0; 11],
            intercept: [118.0, 76.0],
        },
    )
    .save(&model_path)
    .unwrap();

    let mut config = BpConfig::default();
    config.model.path = Some(model_path);
    let pipeline = BpPipeline::new(config);
    let mut source = MemoryFrameSource::new(pulsing_frames(90));
    let outcome = pipeline.run(&mut source, face()).unwrap();

    assert_eq!(
        outcome.estimate.prediction.source,
        PredictionSource::Model {
            version: "linear-2024.1".to_string()
        }
    );
    assert_eq!(outcome.reading().systolic, 118.0);
    assert_eq!(outcome.reading().diastolic, 76.0);
    assert_eq!(outcome.reading().category, BpCategory::Normal);
}

#[test]
fn test_corrupt_model_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("bp_predictor.bin");
    std::fs::write(&model_path, b"\x00\x01garbage").unwrap();

    let mut config = BpConfig::default();
    config.model.path = Some(model_path);
    let pipeline = BpPipeline::new(config);
    let mut source = MemoryFrameSource::new(pulsing_frames(90));
    let outcome = pipeline.run(&mut source, face()).unwrap();

    let features = outcome.estimate.features;
    assert!(matches!(
        outcome.estimate.prediction.source,
        PredictionSource::Fallback { .. }
    ));
    assert_eq!(outcome.reading().systolic, 120.0 + 10.0 * features.mean_amplitude);
    assert_eq!(outcome.reading().diastolic, 80.0 + 5.0 * features.dominant_frequency);
}

#[test]
fn test_artifacts_replay_offline() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = BpConfig::default();
    config.output.dir = Some(dir.path().to_path_buf());
    config.output.features_log = Some(dir.path().join("training.csv"));
    let pipeline = fallback_pipeline(config);

    let mut source = MemoryFrameSource::new(pulsing_frames(150));
    let outcome = pipeline.run(&mut source, face()).unwrap();

    let signal_csv = dir.path().join("rppg_signal_memory.csv");
    assert!(outcome.artifacts.contains(&signal_csv));
    assert!(dir.path().join("features_memory.csv").exists());

    let header = std::fs::read_to_string(&signal_csv).unwrap();
    assert!(header.starts_with("Time (s),Green Avg (rPPG Proxy)"));

    // Reading the dumped signal reproduces the live estimate exactly
    let raw = RawSignal::read_csv(&signal_csv).unwrap();
    let offline = pipeline.estimate(&raw).unwrap();
    assert_eq!(offline.features, outcome.estimate.features);
    assert_eq!(offline.reading, *outcome.reading());
}
