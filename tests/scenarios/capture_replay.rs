//! Test: Capture once, replay elsewhere with identical parameters

use crate::helpers::*;
use sara::core::OutputLayout;
use sara::execution::PipelineEvent;
use sara::persistence::SettingsStore;
use sara::prompt::Prompter;
use sara::stages::ConfigSource;
use sara::{PipelineStage, StageKind};
use std::io::Cursor;

/// Accept every default up to and including the motion targets
const MOTION_DEFAULTS: &str = "\n\n\n\n\n";

#[test]
fn test_capture_persists_every_parameter_in_stage_order() {
    let ws = Workspace::with_recordings(&["mouse1/cell01.tif"]);
    let recording = ws.recording("mouse1/cell01.tif");
    let targets = OutputLayout::new(ws.dir.path().join("capture"), "sara").targets_for(&recording);
    let captured = ws.dir.path().join("captured.csv");

    let input = format!("{}3\n0.4\n15\n90\ny\nn\n\n\ny\n1.5\n\n", MOTION_DEFAULTS);
    let mut output = Vec::new();
    let mut prompter = Prompter::new(Cursor::new(input), &mut output);

    let (orchestrator, log) = orchestrator_with_log(MockBackend::new());
    let summary = orchestrator
        .run(&mut ConfigSource::Capture(&mut prompter), targets.clone(), &captured)
        .unwrap();
    drop(prompter);

    assert_eq!(summary.stage, PipelineStage::Done);
    assert_eq!(summary.regions, 3);
    assert_eq!(completed_stages(&log), StageKind::ALL.to_vec());

    let settings = SettingsStore::load(&captured).unwrap();
    assert_eq!(
        settings.keys().collect::<Vec<_>>(),
        vec![
            "mc_strategy",
            "max_displacement",
            "corrected_path",
            "dataset_dir",
            "components",
            "mu",
            "overlap_per",
            "roi_count",
            "rotate",
            "flip_x",
            "flip_y",
            "plot_path",
            "frames_to_time",
            "seconds_per_frame",
            "signal_path",
        ]
    );
    assert_eq!(settings.get("mc_strategy").unwrap(), "plane_translation_2d");
    assert_eq!(settings.get_list::<u32>("max_displacement").unwrap(), vec![50, 50]);
    assert_eq!(settings.get("components").unwrap(), "3");
    assert_eq!(settings.get("mu").unwrap(), "0.4");
    assert_eq!(settings.get("overlap_per").unwrap(), "0.15");
    assert_eq!(settings.get("rotate").unwrap(), "90");
    assert!(settings.get_bool("flip_x").unwrap());
    assert!(!settings.get_bool("flip_y").unwrap());
    assert_eq!(settings.get("seconds_per_frame").unwrap(), "1.5");

    // Outputs land on the defaults offered at each prompt
    assert!(targets.corrected_path.is_file());
    assert!(targets.plot_path.is_file());
    let signal = std::fs::read_to_string(&targets.signal_path).unwrap();
    assert!(signal.starts_with("time\t"));
    assert!(signal.ends_with("1.5\t0.5\n3\t0.5\n"));
}

#[test]
fn test_replay_reproduces_captured_requests() {
    let ws = Workspace::with_recordings(&["mouse1/cell01.tif", "mouse1/cell02.tif"]);
    let first = ws.recording("mouse1/cell01.tif");
    let second = ws.recording("mouse1/cell02.tif");
    let targets = OutputLayout::new(ws.dir.path().join("capture"), "sara").targets_for(&first);
    let captured = ws.dir.path().join("captured.csv");

    let input = format!("{}7\n0.3\n40\n-90\nn\ny\n\n\nn\n\n", MOTION_DEFAULTS);
    let mut output = Vec::new();
    let mut prompter = Prompter::new(Cursor::new(input), &mut output);

    let (orchestrator, _log) = orchestrator_with_log(MockBackend::new());
    orchestrator
        .run(&mut ConfigSource::Capture(&mut prompter), targets, &captured)
        .unwrap();
    drop(prompter);
    let captured_before = SettingsStore::load(&captured).unwrap();

    let layout = OutputLayout::new(&ws.out_dir, "sara");
    let summary = orchestrator.replay(&second, &captured, &layout).unwrap();
    assert_eq!(summary.stage, PipelineStage::Done);

    let backend = orchestrator.backend();
    let motion = backend.motion_requests();
    assert_eq!(motion.len(), 2);
    assert_eq!(motion[0].strategy, motion[1].strategy);
    assert_eq!(motion[0].max_displacement, motion[1].max_displacement);
    assert!(motion[1].recording.ends_with("cell02.tif"));

    let segment = backend.segment_requests();
    assert_eq!(segment[0], segment[1]);
    assert_eq!(segment[1].components, 7);

    let renders = backend.renders();
    assert_eq!(renders[0].transform, renders[1].transform);
    assert_eq!(renders[1].transform.rotation(), 270);

    // Replay writes derived paths to the per-recording copy only
    assert_eq!(SettingsStore::load(&captured).unwrap(), captured_before);
    let copy = SettingsStore::load(&layout.settings_copy_for(&second)).unwrap();
    assert!(copy.get("corrected_path").unwrap().ends_with("cell02.tif"));
    assert_eq!(copy.get("roi_count").unwrap(), "3");
}

#[test]
fn test_invalid_answers_are_asked_again() {
    let ws = Workspace::with_recordings(&["cell01.tif"]);
    let recording = ws.recording("cell01.tif");
    let targets = OutputLayout::new(&ws.out_dir, "sara").targets_for(&recording);
    let captured = ws.dir.path().join("captured.csv");

    // components "many", mu "2" and rotation "45" are each rejected once
    let input = format!("{}many\n3\n2\n0.5\n\n45\n0\n\n\n\n\n\n\n", MOTION_DEFAULTS);
    let mut output = Vec::new();
    let mut prompter = Prompter::new(Cursor::new(input), &mut output);

    let (orchestrator, _log) = orchestrator_with_log(MockBackend::new());
    orchestrator
        .run(&mut ConfigSource::Capture(&mut prompter), targets, &captured)
        .unwrap();
    drop(prompter);

    let settings = SettingsStore::load(&captured).unwrap();
    assert_eq!(settings.get("components").unwrap(), "3");
    assert_eq!(settings.get("mu").unwrap(), "0.5");
    assert_eq!(settings.get("rotate").unwrap(), "0");
    assert!(!settings.get_bool("frames_to_time").unwrap());
}

#[test]
fn test_interactive_plot_reports_clicked_regions() {
    let ws = Workspace::with_recordings(&["cell01.tif"]);
    let recording = ws.recording("cell01.tif");
    let targets = OutputLayout::new(&ws.out_dir, "sara").targets_for(&recording);
    let captured = ws.dir.path().join("captured.csv");

    let input = format!("{}\n\n\n0\nn\nn\nn\nn\n\n", MOTION_DEFAULTS);
    let mut output = Vec::new();
    let mut prompter = Prompter::new(Cursor::new(input), &mut output);

    let backend = MockBackend::new().with_clicks(vec![[5.0, 5.0], [20.0, 5.0], [100.0, 5.0]]);
    let (orchestrator, log) = orchestrator_with_log(backend);
    orchestrator
        .run(&mut ConfigSource::Capture(&mut prompter), targets.clone(), &captured)
        .unwrap();
    drop(prompter);

    let identified: Vec<_> = log
        .borrow()
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::RegionIdentified { region, .. } => Some(*region),
            _ => None,
        })
        .collect();
    assert_eq!(identified, vec![Some(0), Some(1), None]);

    assert!(!targets.plot_path.exists());
    assert!(!SettingsStore::load(&captured).unwrap().contains("plot_path"));
}

#[test]
fn test_no_correction_strategy_round_trip() {
    let ws = Workspace::with_recordings(&["cell01.tif", "cell02.tif"]);
    let first = ws.recording("cell01.tif");
    let targets = OutputLayout::new(ws.dir.path().join("capture"), "sara").targets_for(&first);
    let captured = ws.dir.path().join("captured.csv");

    // "No Correction" is listed second and asks for no displacement bounds
    let input = "2\n\n\n\n\n\n0\n\n\n\n\n\n\n";
    let mut output = Vec::new();
    let mut prompter = Prompter::new(Cursor::new(input), &mut output);

    let (orchestrator, _log) = orchestrator_with_log(MockBackend::new());
    orchestrator
        .run(&mut ConfigSource::Capture(&mut prompter), targets, &captured)
        .unwrap();
    drop(prompter);

    let settings = SettingsStore::load(&captured).unwrap();
    assert_eq!(settings.get("mc_strategy").unwrap(), "none");
    assert!(!settings.contains("max_displacement"));

    let layout = OutputLayout::new(&ws.out_dir, "sara");
    orchestrator.replay(&ws.recording("cell02.tif"), &captured, &layout).unwrap();

    let calls = orchestrator.backend().calls();
    assert_eq!(calls.iter().filter(|call| *call == "create_dataset").count(), 2);
    assert!(!calls.iter().any(|call| call == "correct_motion"));
}

#[test]
fn test_capture_keeps_unrelated_keys() {
    let ws = Workspace::with_recordings(&["cell01.tif"]);
    let recording = ws.recording("cell01.tif");
    let targets = OutputLayout::new(&ws.out_dir, "sara").targets_for(&recording);
    let captured = ws.dir.path().join("captured.csv");
    SettingsStore::merge_update(&captured, [("operator", "alice"), ("mu", "0.9")]).unwrap();

    let input = format!("{}\n\n\n\n\n\n\n\n\n\n", MOTION_DEFAULTS);
    let mut output = Vec::new();
    let mut prompter = Prompter::new(Cursor::new(input), &mut output);

    let (orchestrator, _log) = orchestrator_with_log(MockBackend::new());
    orchestrator
        .run(&mut ConfigSource::Capture(&mut prompter), targets, &captured)
        .unwrap();
    drop(prompter);

    let settings = SettingsStore::load(&captured).unwrap();
    let keys: Vec<_> = settings.keys().take(2).collect();
    assert_eq!(keys, vec!["operator", "mu"]);
    assert_eq!(settings.get("operator").unwrap(), "alice");
    assert_eq!(settings.get("mu").unwrap(), "0.5");
}
