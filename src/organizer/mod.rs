mod crop;


pub use crop::{clamp_to_image, CropRect};

use anyhow::{Context, Result};
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::embedder::BoundingBox;
use crate::input::ImageEntry;
use crate::security::PathSanitizer;

/// Default file name of the per-cluster face crop
pub const DEFAULT_REPRESENTATIVE_NAME: &str = "representante.jpg";

/// Writes the "one folder per cluster" layout under `output_dir`.
///
/// Deciding *whether* to copy or crop is the cluster handle's job; this only
/// performs the filesystem work once asked.
#[derive(Debug, Clone)]
pub struct ClusterOrganizer {
    output_dir: PathBuf,
    representative_name: String,
}

impl ClusterOrganizer {
    pub fn new(output_dir: impl Into<PathBuf>, representative_name: &str) -> Result<Self> {
        let representative_name = PathSanitizer::file_name(representative_name)
            .context("Invalid representative file name")?
            .to_string();

        Ok(Self {
            output_dir: output_dir.into(),
            representative_name,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the output root
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                self.output_dir.display()
            )
        })
    }

    /// Folder for the cluster with this label
    pub fn cluster_dir(&self, label: &str) -> Result<PathBuf> {
        let label = PathSanitizer::file_name(label).context("Invalid cluster label")?;
        Ok(self.output_dir.join(label))
    }

    fn ensure_cluster_dir(&self, label: &str) -> Result<PathBuf> {
        let dir = self.cluster_dir(label)?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cluster folder: {}", dir.display()))?;
        Ok(dir)
    }

    /// Copy the source photo into the cluster folder, keeping its file name.
    pub fn copy_source(&self, label: &str, image: &ImageEntry) -> Result<PathBuf> {
        let dir = self.ensure_cluster_dir(label)?;
        let name = PathSanitizer::file_name(&image.file_name).context("Invalid photo name")?;
        let dest = dir.join(name);

        fs::copy(&image.path, &dest).with_context(|| {
            format!(
                "Failed to copy {} to {}",
                image.path.display(),
                dest.display()
            )
        })?;

        info!(image = %image.file_name, cluster = %label, "copied photo");
        Ok(dest)
    }

    /// Crop the face out of `photo` and save it as the cluster representative.
    ///
    /// Returns `None` without writing anything when the clamped box is empty.
    pub fn save_representative(
        &self,
        label: &str,
        photo: &DynamicImage,
        bbox: &BoundingBox,
    ) -> Result<Option<PathBuf>> {
        let Some(rect) = clamp_to_image(bbox, photo.width(), photo.height()) else {
            debug!(cluster = %label, ?bbox, "face box is empty after clamping");
            return Ok(None);
        };

        let dir = self.ensure_cluster_dir(label)?;
        let dest = dir.join(&self.representative_name);

        let crop = photo.crop_imm(rect.x, rect.y, rect.width, rect.height);
        crop.to_rgb8()
            .save(&dest)
            .with_context(|| format!("Failed to write crop: {}", dest.display()))?;

        info!(cluster = %label, path = %dest.display(), "saved representative crop");
        Ok(Some(dest))
    }
}
