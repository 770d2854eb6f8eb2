//! Analysis backend reached through a subprocess
//!
//! Each operation runs `<command> <args...> <operation>`, writes one JSON
//! request to the child's stdin and reads one JSON envelope from its stdout:
//! `{"ok": <payload>}` on success or `{"error": "<message>"}` on failure.

use crate::backend::{
    AnalysisBackend, BackendError, Dataset, MotionRequest, RenderOutcome, RenderRequest,
    SegmentRequest, Signal, StillImage,
};
use crate::core::config::BackendConfig;
use crate::core::region::{Region, Ring};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::{self, ErrorKind, Write};
use std::path::Path;
use std::process::{ChildStdin, Command, Stdio};
use std::thread;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Envelope<T> {
    Ok(T),
    Error(String),
}

/// Backend client for an external analysis executable
#[derive(Debug, Clone)]
pub struct SubprocessBackend {
    command: String,
    args: Vec<String>,
}

impl SubprocessBackend {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone())
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Run one backend operation
    ///
    /// Blocks until the child exits; no timeout is applied.
    fn call<Req, Resp>(&self, operation: &str, request: &Req) -> Result<Resp, BackendError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(request)
            .map_err(|e| BackendError::Protocol(format!("Failed to encode request: {}", e)))?;
        debug!("Calling backend operation '{}' ({} bytes)", operation, payload.len());

        let spawn_error = |source| BackendError::Spawn {
            command: self.command.clone(),
            source,
        };

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg(operation)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // The request is fed from its own thread while stdout and stderr are
        // drained, so neither side can block on a full pipe
        let stdin = child.stdin.take();
        let (output, written) = thread::scope(|scope| {
            let writer = stdin.map(|stdin| scope.spawn(|| write_request(stdin, &payload)));
            let output = child.wait_with_output();
            let written = match writer {
                Some(handle) => handle
                    .join()
                    .unwrap_or_else(|_| Err(io::Error::new(ErrorKind::Other, "request writer panicked"))),
                None => Ok(()),
            };
            (output, written)
        });
        let output = output.map_err(spawn_error)?;
        written.map_err(spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            warn!("Backend '{}' exited with code {}: {}", operation, code, stderr);
            return Err(BackendError::Exit { code, stderr });
        }

        let envelope: Envelope<Resp> = serde_json::from_slice(&output.stdout).map_err(|e| {
            BackendError::Protocol(format!("'{}' returned invalid JSON: {}", operation, e))
        })?;

        match envelope {
            Envelope::Ok(response) => Ok(response),
            Envelope::Error(message) => Err(BackendError::Analysis(message)),
        }
    }
}

/// A backend may legitimately exit without reading its request
fn write_request(mut stdin: ChildStdin, payload: &[u8]) -> io::Result<()> {
    match stdin.write_all(payload) {
        Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e),
        _ => Ok(()),
    }
}

impl AnalysisBackend for SubprocessBackend {
    fn correct_motion(&self, request: &MotionRequest) -> Result<Dataset, BackendError> {
        self.call("correct_motion", request)
    }

    fn create_dataset(&self, recording: &Path, dataset_dir: &Path) -> Result<Dataset, BackendError> {
        self.call(
            "create_dataset",
            &json!({ "recording": recording, "dataset_dir": dataset_dir }),
        )
    }

    fn export_frames(&self, dataset: &Dataset, target: &Path) -> Result<(), BackendError> {
        self.call("export_frames", &json!({ "dataset": dataset, "target": target }))
    }

    fn load_dataset(&self, dataset_dir: &Path) -> Result<Dataset, BackendError> {
        self.call("load_dataset", &json!({ "dataset_dir": dataset_dir }))
    }

    fn segment(&self, dataset: &Dataset, request: &SegmentRequest) -> Result<Vec<Vec<Ring>>, BackendError> {
        self.call("segment", &json!({ "dataset": dataset, "parameters": request }))
    }

    fn still_image(&self, dataset: &Dataset) -> Result<StillImage, BackendError> {
        self.call("still_image", &json!({ "dataset": dataset }))
    }

    fn render(&self, request: &RenderRequest) -> Result<RenderOutcome, BackendError> {
        self.call("render", request)
    }

    fn extract_signal(&self, dataset: &Dataset, regions: &[Region]) -> Result<Signal, BackendError> {
        self.call("extract_signal", &json!({ "dataset": dataset, "regions": regions }))
    }

    fn export_signal(&self, dataset: &Dataset, signal: &Signal, target: &Path) -> Result<(), BackendError> {
        self.call(
            "export_signal",
            &json!({ "dataset": dataset, "signal": signal, "target": target }),
        )
    }
}
