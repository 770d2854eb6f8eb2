//! Test: Failures stop one recording, never the batch

use crate::helpers::*;
use sara::backend::SubprocessBackend;
use sara::core::{OutputLayout, PipelineError, SettingsError, StageError};
use sara::persistence::{Settings, SettingsStore};
use sara::StageKind;

#[test]
fn test_backend_failure_skips_to_next_recording() {
    let ws = Workspace::with_recordings(&["cell01.tif", "cell02.tif", "cell03.tif"]);
    ws.write_settings(&standard_settings());
    let recordings = vec![
        ws.recording("cell01.tif"),
        ws.recording("cell02.tif"),
        ws.recording("cell03.tif"),
    ];

    let layout = OutputLayout::new(&ws.out_dir, "sara");
    let backend = MockBackend::new().failing("segment", "cell02");
    let (orchestrator, log) = orchestrator_with_log(backend);
    let report = orchestrator.run_batch(&recordings, &ws.settings_file, &layout);

    assert_eq!(report.succeeded.len(), 2);
    assert_eq!(report.failed.len(), 1);
    let failure = &report.failed[0];
    assert!(failure.recording.ends_with("cell02.tif"));
    assert_eq!(failure.stage, Some(StageKind::Segment));
    assert!(failure.error.contains("segment rejected cell02"));

    assert_eq!(failed_recordings(&log), vec![(failure.recording.clone(), Some(StageKind::Segment))]);

    // Motion correction for the failed recording persisted before segmentation failed
    let copy = SettingsStore::load(&layout.settings_copy_for(&recordings[1])).unwrap();
    assert!(copy.contains("corrected_path"));
    assert!(!copy.contains("roi_count"));
    assert!(!layout.signals_dir().join("cell02.csv").exists());
    assert!(layout.signals_dir().join("cell03.csv").is_file());
}

#[test]
fn test_missing_key_fails_that_stage_only() {
    let ws = Workspace::with_recordings(&["cell01.tif"]);
    let settings: Settings = standard_settings()
        .iter()
        .filter(|(key, _)| *key != "rotate")
        .collect();
    ws.write_settings(&settings);

    let layout = OutputLayout::new(&ws.out_dir, "sara");
    let recording = ws.recording("cell01.tif");
    let (orchestrator, log) = orchestrator_with_log(MockBackend::new());
    let err = orchestrator.replay(&recording, &ws.settings_file, &layout).unwrap_err();

    match &err {
        PipelineError::Stage { stage, source, .. } => {
            assert_eq!(*stage, StageKind::Visualize);
            assert!(matches!(source, StageError::Settings(SettingsError::MissingKey(key)) if key == "rotate"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(completed_stages(&log), vec![StageKind::MotionCorrect, StageKind::Segment]);
    assert!(!orchestrator.backend().calls().iter().any(|call| call == "render"));
}

#[test]
fn test_undecodable_value_is_reported_with_key() {
    let ws = Workspace::with_recordings(&["cell01.tif"]);
    let mut settings = standard_settings();
    settings.set("components", "lots");
    ws.write_settings(&settings);

    let layout = OutputLayout::new(&ws.out_dir, "sara");
    let (orchestrator, _log) = orchestrator_with_log(MockBackend::new());
    let err = orchestrator
        .replay(&ws.recording("cell01.tif"), &ws.settings_file, &layout)
        .unwrap_err();

    assert_eq!(err.stage(), Some(StageKind::Segment));
    assert!(err.to_string().contains("components"));
}

#[test]
fn test_replay_refuses_directory_in_place_of_file() {
    let ws = Workspace::with_recordings(&["cell01.tif"]);
    ws.write_settings(&standard_settings());

    let layout = OutputLayout::new(&ws.out_dir, "sara");
    std::fs::create_dir_all(layout.plots_dir().join("cell01.png")).unwrap();

    let (orchestrator, _log) = orchestrator_with_log(MockBackend::new());
    let err = orchestrator
        .replay(&ws.recording("cell01.tif"), &ws.settings_file, &layout)
        .unwrap_err();

    match err {
        PipelineError::Stage {
            stage: StageKind::Visualize,
            source: StageError::Conflict(path),
            ..
        } => assert!(path.ends_with("cell01.png")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_missing_shared_settings_fails_before_any_stage() {
    let ws = Workspace::with_recordings(&["cell01.tif", "cell02.tif"]);
    let recordings = vec![ws.recording("cell01.tif"), ws.recording("cell02.tif")];

    let layout = OutputLayout::new(&ws.out_dir, "sara");
    let (orchestrator, log) = orchestrator_with_log(MockBackend::new());
    let report = orchestrator.run_batch(&recordings, &ws.settings_file, &layout);

    assert_eq!(report.failed.len(), 2);
    assert!(report.failed.iter().all(|failure| failure.stage.is_none()));
    assert!(orchestrator.backend().calls().is_empty());
    assert!(completed_stages(&log).is_empty());
}

#[test]
fn test_unavailable_backend_fails_motion_correction() {
    let ws = Workspace::with_recordings(&["cell01.tif"]);
    ws.write_settings(&standard_settings());

    let layout = OutputLayout::new(&ws.out_dir, "sara");
    let backend = SubprocessBackend::new(ws.dir.path().join("no-such-backend").to_string_lossy(), Vec::new());
    let (orchestrator, _log) = orchestrator_with_log(backend);
    let report = orchestrator.run_batch(&[ws.recording("cell01.tif")], &ws.settings_file, &layout);

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].stage, Some(StageKind::MotionCorrect));
}
