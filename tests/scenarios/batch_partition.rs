//! Test: Job ids map onto recordings deterministically and workers stay isolated

use crate::helpers::*;
use sara::core::{OutputLayout, PartitionError};
use sara::execution::{JobSelection, Partition, LIST_SENTINEL};
use sara::persistence::SettingsStore;
use sara::PipelineStage;

const RECORDINGS: [&str; 4] = [
    "mouse2/Drug/cell01.tif",
    "mouse1/Control/cell02.TIF",
    "mouse1/Control/cell01.tif",
    "mouse1/Drug/cell03.tif",
];

fn run_job(ws: &Workspace, partition: &Partition, job_id: i64) -> MockBackend {
    let recording = match partition.select(job_id).unwrap() {
        JobSelection::Run(recording) => recording.clone(),
        JobSelection::List(_) => panic!("job {} listed instead of running", job_id),
    };
    let layout = OutputLayout::new(&ws.out_dir, "sara");
    let (orchestrator, _log) = orchestrator_with_log(MockBackend::new());
    let summary = orchestrator.replay(&recording, &ws.settings_file, &layout).unwrap();
    assert_eq!(summary.stage, PipelineStage::Done);
    orchestrator.into_backend()
}

#[test]
fn test_job_ids_follow_sorted_paths() {
    let ws = Workspace::with_recordings(&RECORDINGS);
    std::fs::write(ws.data_root.join("mouse1/notes.txt"), "not a recording").unwrap();

    let partition = Partition::discover(&ws.data_root, "tif").unwrap();
    let relative: Vec<String> = partition
        .recordings()
        .iter()
        .map(|r| {
            r.path()
                .strip_prefix(&ws.data_root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    assert_eq!(
        relative,
        vec![
            "mouse1/Control/cell01.tif",
            "mouse1/Control/cell02.TIF",
            "mouse1/Drug/cell03.tif",
            "mouse2/Drug/cell01.tif",
        ]
    );

    // A second enumeration assigns the same ids
    let again = Partition::discover(&ws.data_root, "tif").unwrap();
    for job_id in 1..=4 {
        assert_eq!(partition.select(job_id).unwrap(), again.select(job_id).unwrap());
    }
}

#[test]
fn test_each_worker_touches_only_its_recording() {
    let ws = Workspace::with_recordings(&RECORDINGS);
    ws.write_settings(&standard_settings());
    let partition = Partition::discover(&ws.data_root, "tif").unwrap();

    let backend = run_job(&ws, &partition, 3);
    let motion = backend.motion_requests();
    assert_eq!(motion.len(), 1);
    assert!(motion[0].recording.ends_with("mouse1/Drug/cell03.tif"));

    let layout = OutputLayout::new(&ws.out_dir, "sara");
    let mut corrected: Vec<_> = std::fs::read_dir(layout.corrected_dir())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    corrected.sort();
    assert_eq!(corrected, vec!["cell03.tif"]);

    // The shared settings file is never written by a worker
    assert_eq!(SettingsStore::load(&ws.settings_file).unwrap(), standard_settings());
}

#[test]
fn test_workers_write_disjoint_settings_copies() {
    let ws = Workspace::with_recordings(&["a/cell01.tif", "a/cell02.tif"]);
    ws.write_settings(&standard_settings());
    let partition = Partition::discover(&ws.data_root, "tif").unwrap();

    run_job(&ws, &partition, 1);
    run_job(&ws, &partition, 2);

    let layout = OutputLayout::new(&ws.out_dir, "sara");
    let first = SettingsStore::load(&layout.settings_copy_for(&ws.recording("a/cell01.tif"))).unwrap();
    let second = SettingsStore::load(&layout.settings_copy_for(&ws.recording("a/cell02.tif"))).unwrap();
    assert!(first.get("signal_path").unwrap().ends_with("cell01.csv"));
    assert!(second.get("signal_path").unwrap().ends_with("cell02.csv"));
    assert!(layout.signals_dir().join("cell01.csv").is_file());
    assert!(layout.signals_dir().join("cell02.csv").is_file());
}

#[test]
fn test_rerunning_a_job_overwrites_its_outputs() {
    let ws = Workspace::with_recordings(&["cell01.tif"]);
    ws.write_settings(&standard_settings());
    let partition = Partition::discover(&ws.data_root, "tif").unwrap();

    run_job(&ws, &partition, 1);
    run_job(&ws, &partition, 1);

    let layout = OutputLayout::new(&ws.out_dir, "sara");
    let signal = std::fs::read_to_string(layout.signals_dir().join("cell01.csv")).unwrap();
    assert!(signal.starts_with("time\t"));
}

#[test]
fn test_listing_sentinel_runs_nothing() {
    let ws = Workspace::with_recordings(&RECORDINGS);
    let partition = Partition::discover(&ws.data_root, "tif").unwrap();

    match partition.select(LIST_SENTINEL).unwrap() {
        JobSelection::List(recordings) => assert_eq!(recordings.len(), 4),
        JobSelection::Run(recording) => panic!("sentinel selected {}", recording),
    }

    let mut out = Vec::new();
    partition.write_listing(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 5);
    assert_eq!(text.lines().last(), Some("4 recordings found"));
    assert!(!ws.out_dir.exists());
}

#[test]
fn test_job_ids_outside_range_are_rejected() {
    let ws = Workspace::with_recordings(&RECORDINGS);
    let partition = Partition::discover(&ws.data_root, "tif").unwrap();

    for job_id in [0, 5, -7] {
        match partition.select(job_id) {
            Err(PartitionError::JobOutOfRange { job_id: rejected, count }) => {
                assert_eq!(rejected, job_id);
                assert_eq!(count, 4);
            }
            other => panic!("job {} gave {:?}", job_id, other),
        }
    }
}

#[test]
fn test_batch_over_whole_partition() {
    let ws = Workspace::with_recordings(&RECORDINGS);
    ws.write_settings(&standard_settings());
    let partition = Partition::discover(&ws.data_root, "tif").unwrap();

    let layout = OutputLayout::new(&ws.out_dir, "sara");
    let (orchestrator, log) = orchestrator_with_log(MockBackend::new());
    let report = orchestrator.run_batch(partition.recordings(), &ws.settings_file, &layout);

    assert!(report.is_success());
    assert_eq!(report.succeeded.len(), 4);
    assert_eq!(completed_stages(&log).len(), 16);

    // Outputs are named by stem, so the two cell01 recordings share targets
    assert_eq!(partition.duplicate_stems(), vec!["cell01".to_string()]);
    assert_eq!(
        report.succeeded[0].targets.signal_path,
        report.succeeded[3].targets.signal_path
    );
}
