//! Test: Sweep files cover the parameter grid and replay like captured settings

use crate::helpers::*;
use sara::core::{OutputLayout, SweepError};
use sara::persistence::{Settings, SettingsStore};
use sara::sweep::{decode_filename, default_parameters, SweepPlan};
use std::collections::HashSet;
use std::fs;

fn ranges() -> Settings {
    [
        ("mu_start", "0.3"),
        ("mu_stop", "0.7"),
        ("mu_step", "0.2"),
        ("overlap_per_start", "0"),
        ("overlap_per_stop", "0.4"),
        ("overlap_per_step", "0.2"),
        ("components_start", "10"),
        ("components_stop", "30"),
        ("components_step", "10"),
    ]
    .into_iter()
    .collect()
}

#[test]
fn test_sweep_writes_one_file_per_grid_point() {
    let ws = Workspace::with_recordings(&[]);
    let params_file = ws.dir.path().join("params.csv");
    SettingsStore::save(&params_file, &ranges()).unwrap();
    let params = SettingsStore::load(&params_file).unwrap();

    let plan = SweepPlan::new(&standard_settings(), default_parameters(&params).unwrap()).unwrap();
    let outdir = ws.dir.path().join("sweep");
    let mut written = Vec::new();
    let count = plan
        .write_all(&outdir, |point, path| written.push((point.filename.clone(), path.to_path_buf())))
        .unwrap();

    assert_eq!(count, 8);
    assert_eq!(fs::read_dir(&outdir).unwrap().count(), 8);
    let names: HashSet<_> = written.iter().map(|(name, _)| name.clone()).collect();
    assert_eq!(names.len(), 8);
    assert!(names.contains("mu30op0c10"));
    assert!(names.contains("mu50op20c20"));

    for (name, path) in &written {
        let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(file_name, format!("{}.csv", name));

        let settings = SettingsStore::load(path).unwrap();
        let decoded = decode_filename(&file_name, plan.parameters()).unwrap();
        let mu: f64 = settings.get_parsed("mu").unwrap();
        let overlap: f64 = settings.get_parsed("overlap_per").unwrap();
        let components: f64 = settings.get_parsed("components").unwrap();
        assert_eq!(decoded, vec![(mu * 100.0).round(), (overlap * 100.0).round(), components]);

        // Everything not swept comes from the defaults, in the same order
        assert_eq!(
            settings.keys().collect::<Vec<_>>(),
            standard_settings().keys().collect::<Vec<_>>()
        );
        assert_eq!(settings.get("rotate").unwrap(), "90");
    }
}

#[test]
fn test_sweep_refuses_non_empty_output() {
    let ws = Workspace::with_recordings(&[]);
    let outdir = ws.dir.path().join("sweep");
    fs::create_dir_all(&outdir).unwrap();
    fs::write(outdir.join("keep.txt"), "previous run").unwrap();

    let plan = SweepPlan::new(&standard_settings(), default_parameters(&ranges()).unwrap()).unwrap();
    let mut calls = 0;
    let err = plan.write_all(&outdir, |_, _| calls += 1).unwrap_err();

    assert!(matches!(err, SweepError::OutputNotEmpty(_)));
    assert_eq!(calls, 0);
    assert_eq!(fs::read_dir(&outdir).unwrap().count(), 1);
}

#[test]
fn test_generated_file_replays() {
    let ws = Workspace::with_recordings(&["cell01.tif"]);
    let plan = SweepPlan::new(&standard_settings(), default_parameters(&ranges()).unwrap()).unwrap();
    let outdir = ws.dir.path().join("sweep");
    plan.write_all(&outdir, |_, _| {}).unwrap();

    let point = plan
        .points()
        .iter()
        .find(|point| point.filename == "mu50op20c20")
        .unwrap();
    let settings_file = SweepPlan::path_for(&outdir, point);

    let layout = OutputLayout::new(&ws.out_dir, "sara");
    let (orchestrator, _log) = orchestrator_with_log(MockBackend::new());
    orchestrator
        .replay(&ws.recording("cell01.tif"), &settings_file, &layout)
        .unwrap();

    let request = &orchestrator.backend().segment_requests()[0];
    assert_eq!(request.components, 20);
    assert!((request.mu - 0.5).abs() < 1e-9);
    assert!((request.overlap_per - 0.2).abs() < 1e-9);
}
