use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::clusterer::{ClusterId, ClusterRegistry};
use crate::config::Config;
use crate::embedder::FaceModelInfo;

/// Written into the output directory at the end of a run
pub const REPORT_FILE_NAME: &str = "clusters.json";

/// Counters collected while the pipeline runs
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RunStats {
    pub images_scanned: u32,
    pub images_with_faces: u32,
    pub images_without_faces: u32,
    pub images_failed: u32,
    pub faces_detected: u32,
    pub faces_assigned: u32,
    pub faces_rejected: u32,
    pub copies_written: u32,
    pub clusters: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRecord {
    pub file_name: String,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub id: ClusterId,
    pub label: String,
    pub member_count: usize,
    pub sources: Vec<SourceRecord>,
    pub representative: Option<PathBuf>,
}

/// Write-only summary of one run. Never read back.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub created_at: String,
    pub generator: String,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub threshold: f32,
    pub model: FaceModelInfo,
    pub stats: RunStats,
    pub clusters: Vec<ClusterSummary>,
}

impl RunReport {
    /// Snapshot the registry. `hashes` maps source file names to their
    /// SHA-256, `representatives` maps cluster ids to the crop written.
    pub fn new(
        config: &Config,
        registry: &ClusterRegistry,
        mut stats: RunStats,
        hashes: &HashMap<String, String>,
        representatives: &HashMap<ClusterId, PathBuf>,
    ) -> Self {
        stats.clusters = registry.len() as u32;

        let clusters = registry
            .clusters()
            .iter()
            .map(|cluster| ClusterSummary {
                id: cluster.id(),
                label: cluster.label().to_string(),
                member_count: cluster.member_count(),
                sources: cluster
                    .sources()
                    .iter()
                    .map(|name| SourceRecord {
                        file_name: name.clone(),
                        sha256: hashes.get(name).cloned().unwrap_or_default(),
                    })
                    .collect(),
                representative: representatives.get(&cluster.id()).cloned(),
            })
            .collect();

        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now().to_rfc3339(),
            generator: format!("facesort v{}", env!("CARGO_PKG_VERSION")),
            input_dir: config.input_dir.clone(),
            output_dir: config.output_dir.clone(),
            threshold: config.threshold,
            model: config.model.clone(),
            stats,
            clusters,
        }
    }

    /// Write the report as pretty JSON into `dir`
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(REPORT_FILE_NAME);
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write run report: {}", path.display()))?;
        Ok(path)
    }
}
