use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

use super::model::FaceModelInfo;
use super::types::{AnalyzeRequest, ImageFaces, ImageOutput};
use crate::input::ImageEntry;

/// Source of detected faces for a batch of images.
///
/// Implementations must return exactly one [`ImageFaces`] per input image, in
/// input order.
pub trait FaceAnalyzer {
    fn analyze(&self, images: &[ImageEntry]) -> Result<Vec<ImageFaces>>;
}

/// Runs the InsightFace helper script as a subprocess, JSON over stdio.
#[derive(Debug, Clone)]
pub struct PythonFaceAnalyzer {
    python_path: PathBuf,
    script_path: PathBuf,
    model: FaceModelInfo,
    /// 0 selects the first GPU, -1 forces CPU
    ctx_id: i32,
}

impl PythonFaceAnalyzer {
    pub fn new(
        python_path: impl Into<PathBuf>,
        script_path: impl Into<PathBuf>,
        model: FaceModelInfo,
    ) -> Self {
        Self {
            python_path: python_path.into(),
            script_path: script_path.into(),
            model,
            ctx_id: -1,
        }
    }

    pub fn ctx_id(mut self, ctx_id: i32) -> Self {
        self.ctx_id = ctx_id;
        self
    }

    pub fn model(&self) -> &FaceModelInfo {
        &self.model
    }
}

impl FaceAnalyzer for PythonFaceAnalyzer {
    fn analyze(&self, images: &[ImageEntry]) -> Result<Vec<ImageFaces>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            images = images.len(),
            python = %self.python_path.display(),
            script = %self.script_path.display(),
            model = %self.model.name,
            "running face analyzer"
        );

        let request = AnalyzeRequest {
            images: images.iter().map(request_key).collect(),
        };
        let input_json =
            serde_json::to_string(&request).context("Failed to serialize image list to JSON")?;

        let mut child = Command::new(&self.python_path)
            .arg(&self.script_path)
            .arg("--model")
            .arg(&self.model.name)
            .arg("--det-size")
            .arg(self.model.det_size.to_string())
            .arg("--ctx-id")
            .arg(self.ctx_id.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| {
                format!(
                    "Failed to spawn face analyzer: {} {}",
                    self.python_path.display(),
                    self.script_path.display()
                )
            })?;

        // Dropping stdin at the end of this block closes the pipe.
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input_json.as_bytes())
                .context("Failed to write to face analyzer stdin")?;
        }

        let output = child
            .wait_with_output()
            .context("Failed to wait for face analyzer process")?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            bail!(
                "Face analyzer failed with exit code {:?}:\n{}",
                output.status.code(),
                stderr.trim()
            );
        }
        if !stderr.trim().is_empty() {
            debug!(stderr = %stderr.trim(), "face analyzer output");
        }

        decode_response(&output.stdout, images)
    }
}

fn request_key(entry: &ImageEntry) -> String {
    entry.path.to_string_lossy().into_owned()
}

/// Parse analyzer stdout and line it up with the request.
pub(crate) fn decode_response(stdout: &[u8], images: &[ImageEntry]) -> Result<Vec<ImageFaces>> {
    let outputs: Vec<ImageOutput> =
        serde_json::from_slice(stdout).context("Failed to parse face analyzer output as JSON")?;

    if outputs.len() != images.len() {
        bail!(
            "Face analyzer returned {} results for {} images",
            outputs.len(),
            images.len()
        );
    }

    images
        .iter()
        .zip(outputs)
        .map(|(entry, output)| {
            let expected = request_key(entry);
            if output.image != expected {
                bail!(
                    "Face analyzer result out of order: expected {}, got {}",
                    expected,
                    output.image
                );
            }
            if let Some(err) = &output.error {
                warn!(image = %entry.file_name, error = %err, "analyzer could not read image");
            }
            Ok(ImageFaces {
                faces: output.faces,
                error: output.error,
            })
        })
        .collect()
}
