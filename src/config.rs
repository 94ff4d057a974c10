use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::clusterer::{
    RegistryConfig, DEFAULT_EMBEDDING_DIM, DEFAULT_LABEL_PREFIX, DEFAULT_NORM_TOLERANCE,
    DEFAULT_THRESHOLD,
};
use crate::embedder::FaceModelInfo;
use crate::input::{InputScanner, DEFAULT_EXTENSIONS, DEFAULT_MAX_FILE_SIZE};
use crate::organizer::DEFAULT_REPRESENTATIVE_NAME;

/// Run configuration. Every field has a default, so a config file only needs
/// the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Photos to classify
    pub input_dir: PathBuf,
    /// One folder per cluster is created here
    pub output_dir: PathBuf,
    /// L2 distance below which two faces are the same person
    pub threshold: f32,
    /// Embedding length; must match the model
    pub embedding_dim: usize,
    /// Reject embeddings whose norm is off by more than this (`null` disables)
    pub norm_tolerance: Option<f32>,
    /// Cluster folder prefix
    pub label_prefix: String,
    /// File name of the face crop written into each cluster folder
    pub representative_name: String,
    /// Accepted photo extensions
    pub extensions: Vec<String>,
    /// Descend into subdirectories of `input_dir`
    pub recursive: bool,
    /// Larger files are skipped
    pub max_file_size: u64,
    /// Interpreter for the face analyzer script
    pub python: PathBuf,
    /// Face analyzer script
    pub script: PathBuf,
    /// Face model pack
    pub model: FaceModelInfo,
    /// 0 uses the first GPU, -1 forces CPU
    pub ctx_id: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("fotos/input"),
            output_dir: PathBuf::from("fotos/clasificadas"),
            threshold: DEFAULT_THRESHOLD,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            norm_tolerance: Some(DEFAULT_NORM_TOLERANCE),
            label_prefix: DEFAULT_LABEL_PREFIX.to_string(),
            representative_name: DEFAULT_REPRESENTATIVE_NAME.to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            recursive: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            python: PathBuf::from("python3"),
            script: PathBuf::from("scripts/face_embed.py"),
            model: FaceModelInfo::default(),
            ctx_id: -1,
        }
    }
}

impl Config {
    /// Load a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            bail!("threshold must be a positive number, got {}", self.threshold);
        }
        if self.embedding_dim == 0 {
            bail!("embedding_dim must be greater than zero");
        }
        if self.model.dim != self.embedding_dim {
            bail!(
                "embedding_dim {} does not match model {} ({} dims)",
                self.embedding_dim,
                self.model.name,
                self.model.dim
            );
        }
        if self.model.max_batch == 0 {
            bail!("model.max_batch must be greater than zero");
        }
        if let Some(tolerance) = self.norm_tolerance {
            if !(tolerance.is_finite() && tolerance >= 0.0) {
                bail!("norm_tolerance must be a non-negative number, got {}", tolerance);
            }
        }
        if self.label_prefix.is_empty() {
            bail!("label_prefix must not be empty");
        }
        if self.extensions.is_empty() {
            bail!("at least one photo extension is required");
        }
        Ok(())
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::new(self.threshold, self.embedding_dim)
            .with_norm_tolerance(self.norm_tolerance)
            .with_label_prefix(self.label_prefix.clone())
    }

    pub fn scanner(&self) -> InputScanner {
        InputScanner::new()
            .extensions(&self.extensions)
            .recursive(self.recursive)
            .max_file_size(self.max_file_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_defaults_match_reference_setup() {
        let config = Config::default();
        assert_eq!(config.threshold, 1.1);
        assert_eq!(config.embedding_dim, 512);
        assert_eq!(config.input_dir, Path::new("fotos/input"));
        assert_eq!(config.output_dir, Path::new("fotos/clasificadas"));
        assert_eq!(config.representative_name, "representante.jpg");
        assert_eq!(config.extensions, vec!["jpg", "jpeg", "png", "bmp"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"threshold": 0.9, "recursive": true}"#).unwrap();
        assert_eq!(config.threshold, 0.9);
        assert!(config.recursive);
        assert_eq!(config.embedding_dim, 512);
        assert_eq!(config.model, FaceModelInfo::buffalo_l());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result: serde_json::Result<Config> = serde_json::from_str(r#"{"treshold": 0.9}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facesort.json");
        std::fs::write(&path, r#"{"label_prefix": "person", "norm_tolerance": null}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.label_prefix, "person");
        assert_eq!(config.norm_tolerance, None);

        let registry = config.registry_config();
        assert_eq!(registry.label_prefix, "person");
        assert_eq!(registry.norm_tolerance, None);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/no/such/facesort.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases: Vec<fn(&mut Config)> = vec![
            |c: &mut Config| c.threshold = 0.0,
            |c: &mut Config| c.threshold = f32::NAN,
            |c: &mut Config| c.embedding_dim = 0,
            |c: &mut Config| c.embedding_dim = 128,
            |c: &mut Config| c.model.max_batch = 0,
            |c: &mut Config| c.norm_tolerance = Some(-1.0),
            |c: &mut Config| c.label_prefix.clear(),
            |c: &mut Config| c.extensions.clear(),
        ];

        for mutate in cases {
            let mut config = Config::default();
            mutate(&mut config);
            assert!(config.validate().is_err(), "{:?} should be invalid", config);
        }
    }
}
