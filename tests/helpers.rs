//! Test utility functions for sara

#![allow(dead_code)]

use sara::backend::{
    AnalysisBackend, BackendError, Dataset, MotionRequest, RenderOutcome, RenderRequest, RenderTarget,
    SegmentRequest, Signal, StillImage,
};
use sara::core::{ImageSize, Point, Recording, Region, Ring};
use sara::execution::{PipelineEvent, PipelineOrchestrator};
use sara::persistence::{Settings, SettingsStore};
use sara::stages::StageOptions;
use sara::StageKind;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

/// Backend that writes placeholder artifacts and records every request
#[derive(Default)]
pub struct MockBackend {
    calls: RefCell<Vec<String>>,
    motion_requests: RefCell<Vec<MotionRequest>>,
    segment_requests: RefCell<Vec<SegmentRequest>>,
    renders: RefCell<Vec<RenderRequest>>,
    failures: Vec<(String, String)>,
    clicks: Vec<Point>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `operation` whenever one of its paths contains `needle`
    pub fn failing(mut self, operation: &str, needle: &str) -> Self {
        self.failures.push((operation.to_string(), needle.to_string()));
        self
    }

    /// Points the operator "clicks" in interactive renders
    pub fn with_clicks(mut self, clicks: Vec<Point>) -> Self {
        self.clicks = clicks;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn motion_requests(&self) -> Vec<MotionRequest> {
        self.motion_requests.borrow().clone()
    }

    pub fn segment_requests(&self) -> Vec<SegmentRequest> {
        self.segment_requests.borrow().clone()
    }

    pub fn renders(&self) -> Vec<RenderRequest> {
        self.renders.borrow().clone()
    }

    fn enter(&self, operation: &str, paths: &[&Path]) -> Result<(), BackendError> {
        self.calls.borrow_mut().push(operation.to_string());
        for (failing, needle) in &self.failures {
            if failing == operation && paths.iter().any(|p| p.to_string_lossy().contains(needle.as_str())) {
                return Err(BackendError::Analysis(format!("{} rejected {}", operation, needle)));
            }
        }
        Ok(())
    }
}

fn write(path: &Path, content: &str) -> Result<(), BackendError> {
    fs::write(path, content).map_err(|e| BackendError::Analysis(e.to_string()))
}

pub fn square(x: f64, y: f64, side: f64) -> Ring {
    vec![[x, y], [x + side, y], [x + side, y + side], [x, y + side]]
}

impl AnalysisBackend for MockBackend {
    fn correct_motion(&self, request: &MotionRequest) -> Result<Dataset, BackendError> {
        self.enter("correct_motion", &[&request.recording, &request.dataset_dir])?;
        self.motion_requests.borrow_mut().push(request.clone());
        write(&request.dataset_dir.join("dataset.json"), "{}")?;
        Ok(Dataset {
            dir: request.dataset_dir.clone(),
            frames: 3,
        })
    }

    fn create_dataset(&self, recording: &Path, dataset_dir: &Path) -> Result<Dataset, BackendError> {
        self.enter("create_dataset", &[recording, dataset_dir])?;
        write(&dataset_dir.join("dataset.json"), "{}")?;
        Ok(Dataset {
            dir: dataset_dir.to_path_buf(),
            frames: 3,
        })
    }

    fn export_frames(&self, dataset: &Dataset, target: &Path) -> Result<(), BackendError> {
        self.enter("export_frames", &[&dataset.dir, target])?;
        write(target, "frames")
    }

    fn load_dataset(&self, dataset_dir: &Path) -> Result<Dataset, BackendError> {
        self.enter("load_dataset", &[dataset_dir])?;
        Ok(Dataset {
            dir: dataset_dir.to_path_buf(),
            frames: 3,
        })
    }

    fn segment(&self, dataset: &Dataset, request: &SegmentRequest) -> Result<Vec<Vec<Ring>>, BackendError> {
        self.enter("segment", &[&dataset.dir])?;
        self.segment_requests.borrow_mut().push(request.clone());
        Ok(vec![
            vec![square(0.0, 0.0, 10.0)],
            vec![square(15.0, 0.0, 10.0)],
            vec![square(60.0, 60.0, 10.0)],
        ])
    }

    fn still_image(&self, dataset: &Dataset) -> Result<StillImage, BackendError> {
        self.enter("still_image", &[&dataset.dir])?;
        Ok(StillImage {
            path: None,
            size: ImageSize {
                width: 128.0,
                height: 128.0,
            },
        })
    }

    fn render(&self, request: &RenderRequest) -> Result<RenderOutcome, BackendError> {
        match &request.target {
            RenderTarget::File(path) => {
                self.enter("render", &[path])?;
                write(path, "png")?;
            }
            RenderTarget::Interactive => self.enter("render", &[])?,
        }
        self.renders.borrow_mut().push(request.clone());
        Ok(RenderOutcome {
            clicks: self.clicks.clone(),
        })
    }

    fn extract_signal(&self, dataset: &Dataset, regions: &[Region]) -> Result<Signal, BackendError> {
        self.enter("extract_signal", &[&dataset.dir])?;
        Ok(Signal {
            regions: regions.len(),
            frames: dataset.frames,
        })
    }

    fn export_signal(&self, dataset: &Dataset, signal: &Signal, target: &Path) -> Result<(), BackendError> {
        self.enter("export_signal", &[&dataset.dir, target])?;
        let mut content = String::from("frame");
        for roi in 0..signal.regions {
            content.push_str(&format!("\troi{}", roi));
        }
        content.push_str("\nlabel\ttag\n\t\n");
        for frame in 0..signal.frames {
            content.push_str(&format!("{}\t0.5\n", frame));
        }
        write(target, &content)
    }
}

/// Settings that replay cleanly through all four stages
pub fn standard_settings() -> Settings {
    [
        ("mc_strategy", "plane_translation_2d"),
        ("max_displacement", "20,20"),
        ("components", "3"),
        ("mu", "0.5"),
        ("overlap_per", "0.1"),
        ("rotate", "90"),
        ("flip_x", "false"),
        ("flip_y", "true"),
        ("frames_to_time", "true"),
        ("seconds_per_frame", "2"),
    ]
    .into_iter()
    .collect()
}

/// Temporary data root, output root and shared settings file
pub struct Workspace {
    pub dir: TempDir,
    pub data_root: PathBuf,
    pub out_dir: PathBuf,
    pub settings_file: PathBuf,
}

impl Workspace {
    /// Create empty recordings at the given paths relative to the data root
    pub fn with_recordings(recordings: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let data_root = dir.path().join("data");
        for relative in recordings {
            let path = data_root.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"recording").unwrap();
        }
        let out_dir = dir.path().join("out");
        let settings_file = dir.path().join("settings.csv");
        Self {
            dir,
            data_root,
            out_dir,
            settings_file,
        }
    }

    pub fn write_settings(&self, settings: &Settings) {
        SettingsStore::save(&self.settings_file, settings).unwrap();
    }

    pub fn recording(&self, relative: &str) -> Recording {
        Recording::new(self.data_root.join(relative))
    }
}

pub type EventLog = Rc<RefCell<Vec<PipelineEvent>>>;

/// Orchestrator over `backend` whose events are collected into the returned log
pub fn orchestrator_with_log<B: AnalysisBackend>(backend: B) -> (PipelineOrchestrator<B>, EventLog) {
    let mut orchestrator = PipelineOrchestrator::new(backend, StageOptions::default());
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    orchestrator.add_event_handler(move |event| sink.borrow_mut().push(event));
    (orchestrator, log)
}

/// Stages that completed, in the order they completed
pub fn completed_stages(log: &EventLog) -> Vec<StageKind> {
    log.borrow()
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::StageCompleted { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect()
}

/// Recordings reported as failed, with the stage they failed in
pub fn failed_recordings(log: &EventLog) -> Vec<(PathBuf, Option<StageKind>)> {
    log.borrow()
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::RecordingFailed { recording, stage, .. } => Some((recording.clone(), *stage)),
            _ => None,
        })
        .collect()
}
