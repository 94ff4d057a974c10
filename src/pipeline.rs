use anyhow::{Context, Result};
use image::DynamicImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::clusterer::{ClusterId, ClusterRegistry, Embedding};
use crate::config::Config;
use crate::embedder::{Batcher, FaceAnalyzer, ImageFaces};
use crate::input::ImageEntry;
use crate::organizer::ClusterOrganizer;
use crate::report::{RunReport, RunStats};

/// What a finished run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub report_path: PathBuf,
}

/// Scan, analyze, cluster, organize.
///
/// Photos are processed one at a time in file-name order and every face goes
/// through [`ClusterRegistry::assign`] before the next one is looked at.
pub struct Pipeline<A> {
    config: Config,
    analyzer: A,
    registry: ClusterRegistry,
    organizer: ClusterOrganizer,
    stats: RunStats,
    /// file name -> sha256, for the report
    hashes: HashMap<String, String>,
    representatives: HashMap<ClusterId, PathBuf>,
}

impl<A: FaceAnalyzer> Pipeline<A> {
    pub fn new(config: Config, analyzer: A) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        let registry =
            ClusterRegistry::new(config.registry_config()).context("Invalid cluster settings")?;
        let organizer =
            ClusterOrganizer::new(config.output_dir.clone(), &config.representative_name)?;

        Ok(Self {
            config,
            analyzer,
            registry,
            organizer,
            stats: RunStats::default(),
            hashes: HashMap::new(),
            representatives: HashMap::new(),
        })
    }

    pub fn registry(&self) -> &ClusterRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Process every photo under the input directory and write the report.
    pub fn run(&mut self) -> Result<RunOutcome> {
        let scan = self
            .config
            .scanner()
            .scan(&self.config.input_dir)
            .context("Failed to scan input directory")?;
        info!(
            count = scan.images.len(),
            unreadable = scan.unreadable.len(),
            dir = %self.config.input_dir.display(),
            "found photos"
        );
        let images = scan.images;
        self.stats.images_scanned += (images.len() + scan.unreadable.len()) as u32;
        self.stats.images_failed += scan.unreadable.len() as u32;

        self.organizer.prepare()?;

        let batcher = Batcher::new(self.config.model.max_batch);
        for batch in batcher.split(&images) {
            let results = self.analyzer.analyze(batch)?;
            if results.len() != batch.len() {
                anyhow::bail!(
                    "Face analyzer returned {} results for {} images",
                    results.len(),
                    batch.len()
                );
            }

            for (image, faces) in batch.iter().zip(results) {
                self.process_image(image, faces)?;
            }
        }

        let report = RunReport::new(
            &self.config,
            &self.registry,
            self.stats.clone(),
            &self.hashes,
            &self.representatives,
        );
        let report_path = report.write_to_dir(self.organizer.output_dir())?;
        info!(
            clusters = report.stats.clusters,
            report = %report_path.display(),
            "classification complete"
        );

        Ok(RunOutcome {
            report,
            report_path,
        })
    }

    fn process_image(&mut self, image: &ImageEntry, result: ImageFaces) -> Result<()> {
        if let Some(err) = &result.error {
            self.stats.images_failed += 1;
            warn!(image = %image.file_name, error = %err, "could not read photo");
            return Ok(());
        }
        if result.faces.is_empty() {
            self.stats.images_without_faces += 1;
            info!(image = %image.file_name, "no faces detected");
            return Ok(());
        }

        self.stats.images_with_faces += 1;
        info!(image = %image.file_name, faces = result.faces.len(), "processing photo");
        self.hashes
            .insert(image.file_name.clone(), image.sha256.clone());

        let mut photo = LazyPhoto::new(&image.path);

        for face in result.faces {
            self.stats.faces_detected += 1;

            let embedding = match Embedding::normalize(face.embedding) {
                Ok(embedding) => embedding,
                Err(err) => {
                    self.stats.faces_rejected += 1;
                    warn!(image = %image.file_name, error = %err, "skipping face");
                    continue;
                }
            };

            let mut handle = match self.registry.assign(embedding) {
                Ok(handle) => handle,
                Err(err) => {
                    self.stats.faces_rejected += 1;
                    warn!(image = %image.file_name, error = %err, "skipping face");
                    continue;
                }
            };
            self.stats.faces_assigned += 1;

            if handle.created() {
                info!(cluster = %handle.label(), "new cluster created");
            } else {
                info!(
                    cluster = %handle.label(),
                    members = handle.member_count(),
                    "assigned to cluster"
                );
            }

            if handle.is_new_for_source(&image.file_name) {
                self.organizer.copy_source(handle.label(), image)?;
                handle.record_source(&image.file_name);
                self.stats.copies_written += 1;
            }

            if !handle.needs_representative() {
                continue;
            }

            let Some(decoded) = photo.get() else {
                continue;
            };
            let saved = self
                .organizer
                .save_representative(handle.label(), decoded, &face.bbox)?;
            match saved {
                Some(path) => {
                    handle.record_representative();
                    self.representatives.insert(handle.id(), path);
                }
                None => debug!(
                    cluster = %handle.label(),
                    "face box outside photo, representative still pending"
                ),
            }
        }

        Ok(())
    }
}

/// Photo decoded the first time a crop needs it. A failed decode is
/// remembered so later faces from the same photo do not retry it.
enum LazyPhoto<'a> {
    Pending(&'a Path),
    Ready(DynamicImage),
    Failed,
}

impl<'a> LazyPhoto<'a> {
    fn new(path: &'a Path) -> Self {
        LazyPhoto::Pending(path)
    }

    fn get(&mut self) -> Option<&DynamicImage> {
        if let LazyPhoto::Pending(path) = *self {
            *self = match image::open(path) {
                Ok(decoded) => LazyPhoto::Ready(decoded),
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "could not decode photo for the face crop"
                    );
                    LazyPhoto::Failed
                }
            };
        }

        match &*self {
            LazyPhoto::Ready(decoded) => Some(decoded),
            LazyPhoto::Pending(_) | LazyPhoto::Failed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::{BoundingBox, DetectedFace, FaceModelInfo};
    use crate::report::REPORT_FILE_NAME;
    use image::{Rgb, RgbImage};
    use std::cell::Cell;
    use tempfile::{tempdir, TempDir};

    /// Answers from a table keyed by file name
    struct FakeAnalyzer {
        table: HashMap<String, ImageFaces>,
        calls: Cell<usize>,
    }

    impl FakeAnalyzer {
        fn new() -> Self {
            Self {
                table: HashMap::new(),
                calls: Cell::new(0),
            }
        }

        fn faces(mut self, name: &str, faces: Vec<DetectedFace>) -> Self {
            self.table.insert(
                name.to_string(),
                ImageFaces {
                    faces,
                    error: None,
                },
            );
            self
        }

        fn broken(mut self, name: &str) -> Self {
            self.table.insert(
                name.to_string(),
                ImageFaces {
                    faces: Vec::new(),
                    error: Some("cannot identify image file".to_string()),
                },
            );
            self
        }
    }

    impl FaceAnalyzer for FakeAnalyzer {
        fn analyze(&self, images: &[ImageEntry]) -> Result<Vec<ImageFaces>> {
            self.calls.set(self.calls.get() + 1);
            Ok(images
                .iter()
                .map(|i| self.table.get(&i.file_name).cloned().unwrap_or_default())
                .collect())
        }
    }

    struct Failing;

    impl FaceAnalyzer for Failing {
        fn analyze(&self, _images: &[ImageEntry]) -> Result<Vec<ImageFaces>> {
            anyhow::bail!("model not loaded")
        }
    }

    fn face(embedding: Vec<f32>, bbox: [f32; 4]) -> DetectedFace {
        DetectedFace {
            bbox: BoundingBox::from(bbox),
            embedding,
            det_score: Some(0.99),
        }
    }

    fn write_photo(dir: &Path, name: &str) {
        RgbImage::from_pixel(32, 24, Rgb([200, 150, 100]))
            .save(dir.join(name))
            .unwrap();
    }

    struct Fixture {
        input: TempDir,
        output: TempDir,
    }

    impl Fixture {
        fn new(names: &[&str]) -> Self {
            let input = tempdir().unwrap();
            for name in names {
                write_photo(input.path(), name);
            }
            Self {
                input,
                output: tempdir().unwrap(),
            }
        }

        fn config(&self) -> Config {
            Config {
                input_dir: self.input.path().to_path_buf(),
                output_dir: self.output.path().join("sorted"),
                embedding_dim: 2,
                model: FaceModelInfo::new("fake", 2, 640, 2),
                ..Config::default()
            }
        }

        fn out(&self, rel: &str) -> PathBuf {
            self.output.path().join("sorted").join(rel)
        }
    }

    #[test]
    fn test_full_run() {
        let fx = Fixture::new(&["a.png", "b.png", "c.png", "d.png", "e.png"]);
        let analyzer = FakeAnalyzer::new()
            .faces(
                "a.png",
                vec![
                    face(vec![2.0, 0.0], [2.0, 2.0, 10.0, 10.0]),
                    face(vec![-1.0, 0.0], [-5.0, -5.0, 4.0, 4.0]),
                ],
            )
            .faces("b.png", vec![face(vec![0.99, 0.14], [0.0, 0.0, 8.0, 8.0])])
            .broken("d.png")
            .faces(
                "e.png",
                vec![
                    face(vec![1.0, 0.0, 0.0], [0.0, 0.0, 8.0, 8.0]),
                    face(vec![0.0, 0.0], [0.0, 0.0, 8.0, 8.0]),
                ],
            );

        let mut pipeline = Pipeline::new(fx.config(), analyzer).unwrap();
        let outcome = pipeline.run().unwrap();

        // 5 photos in batches of 2
        assert_eq!(pipeline.analyzer.calls.get(), 3);

        let stats = &outcome.report.stats;
        assert_eq!(stats.images_scanned, 5);
        assert_eq!(stats.images_with_faces, 3);
        assert_eq!(stats.images_without_faces, 1);
        assert_eq!(stats.images_failed, 1);
        assert_eq!(stats.faces_detected, 5);
        assert_eq!(stats.faces_assigned, 3);
        assert_eq!(stats.faces_rejected, 2);
        assert_eq!(stats.copies_written, 3);
        assert_eq!(stats.clusters, 2);

        let registry = pipeline.registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(1).unwrap().member_count(), 2);
        assert_eq!(registry.get(1).unwrap().sources(), &["a.png", "b.png"]);
        assert_eq!(registry.get(2).unwrap().sources(), &["a.png"]);

        assert!(fx.out("Persona_001/a.png").is_file());
        assert!(fx.out("Persona_001/b.png").is_file());
        assert!(fx.out("Persona_002/a.png").is_file());
        assert!(!fx.out("Persona_002/b.png").exists());

        let crop = image::open(fx.out("Persona_001/representante.jpg")).unwrap();
        assert_eq!((crop.width(), crop.height()), (8, 8));
        let crop = image::open(fx.out("Persona_002/representante.jpg")).unwrap();
        assert_eq!((crop.width(), crop.height()), (4, 4));

        assert_eq!(outcome.report_path, fx.out(REPORT_FILE_NAME));
        assert!(outcome.report_path.is_file());
        assert_eq!(outcome.report.clusters[0].sources[0].sha256.len(), 64);
    }

    #[test]
    fn test_same_photo_copied_once_per_cluster() {
        let fx = Fixture::new(&["group.png"]);
        let analyzer = FakeAnalyzer::new().faces(
            "group.png",
            vec![
                face(vec![1.0, 0.0], [0.0, 0.0, 8.0, 8.0]),
                face(vec![0.995, 0.0998], [10.0, 0.0, 18.0, 8.0]),
            ],
        );

        let mut pipeline = Pipeline::new(fx.config(), analyzer).unwrap();
        let outcome = pipeline.run().unwrap();

        assert_eq!(outcome.report.stats.clusters, 1);
        assert_eq!(outcome.report.stats.copies_written, 1);
        assert_eq!(pipeline.registry().get(1).unwrap().member_count(), 2);
    }

    #[test]
    fn test_representative_waits_for_usable_box() {
        let fx = Fixture::new(&["a.png", "b.png"]);
        let analyzer = FakeAnalyzer::new()
            .faces("a.png", vec![face(vec![0.0, 1.0], [100.0, 100.0, 120.0, 120.0])])
            .faces("b.png", vec![face(vec![0.1, 0.995], [4.0, 4.0, 10.0, 16.0])]);

        let mut pipeline = Pipeline::new(fx.config(), analyzer).unwrap();
        let outcome = pipeline.run().unwrap();

        assert_eq!(outcome.report.stats.clusters, 1);
        assert!(pipeline.registry().get(1).unwrap().has_representative());
        let crop = image::open(fx.out("Persona_001/representante.jpg")).unwrap();
        assert_eq!((crop.width(), crop.height()), (6, 12));
        assert_eq!(
            outcome.report.clusters[0].representative,
            Some(fx.out("Persona_001/representante.jpg"))
        );
    }

    #[test]
    fn test_analyzer_failure_aborts_run() {
        let fx = Fixture::new(&["a.png"]);
        let mut pipeline = Pipeline::new(fx.config(), Failing).unwrap();
        let err = pipeline.run().unwrap_err();
        assert!(err.to_string().contains("model not loaded"));
        assert!(!fx.out(REPORT_FILE_NAME).exists());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let fx = Fixture::new(&[]);
        let config = Config {
            threshold: -1.0,
            ..fx.config()
        };
        assert!(Pipeline::new(config, FakeAnalyzer::new()).is_err());
    }

    #[test]
    fn test_empty_input_writes_empty_report() {
        let fx = Fixture::new(&[]);
        let mut pipeline = Pipeline::new(fx.config(), FakeAnalyzer::new()).unwrap();
        let outcome = pipeline.run().unwrap();

        assert_eq!(outcome.report.stats.images_scanned, 0);
        assert!(outcome.report.clusters.is_empty());
        assert_eq!(pipeline.analyzer.calls.get(), 0);
        assert!(outcome.report_path.is_file());
    }

    #[test]
    fn test_failed_decode_is_not_retried() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();

        let mut photo = LazyPhoto::new(&path);
        assert!(photo.get().is_none());

        // a valid file appearing later is not picked up
        write_photo(dir.path(), "broken.png");
        assert!(photo.get().is_none());
        assert!(matches!(photo, LazyPhoto::Failed));
    }

    #[test]
    fn test_photo_decoded_once() {
        let dir = tempdir().unwrap();
        write_photo(dir.path(), "a.png");
        let path = dir.path().join("a.png");

        let mut photo = LazyPhoto::new(&path);
        assert_eq!(photo.get().map(|p| p.width()), Some(32));

        std::fs::remove_file(&path).unwrap();
        assert_eq!(photo.get().map(|p| p.height()), Some(24));
    }

    #[test]
    fn test_undecodable_photo_still_copied() {
        let fx = Fixture::new(&[]);
        std::fs::write(fx.input.path().join("a.png"), b"not a png").unwrap();
        let analyzer = FakeAnalyzer::new().faces(
            "a.png",
            vec![
                face(vec![1.0, 0.0], [0.0, 0.0, 8.0, 8.0]),
                face(vec![-1.0, 0.0], [0.0, 0.0, 8.0, 8.0]),
            ],
        );

        let mut pipeline = Pipeline::new(fx.config(), analyzer).unwrap();
        let outcome = pipeline.run().unwrap();

        assert_eq!(outcome.report.stats.clusters, 2);
        assert_eq!(outcome.report.stats.copies_written, 2);
        assert!(fx.out("Persona_001/a.png").is_file());
        assert!(!pipeline.registry().get(1).unwrap().has_representative());
        assert!(!pipeline.registry().get(2).unwrap().has_representative());
    }

    #[cfg(unix)]
    #[test]
    fn test_backslash_in_photo_name_is_copied() {
        let fx = Fixture::new(&["a.png", "b\\c.png", "d.png"]);
        let same = || vec![face(vec![1.0, 0.0], [0.0, 0.0, 8.0, 8.0])];
        let analyzer = FakeAnalyzer::new()
            .faces("a.png", same())
            .faces("b\\c.png", same())
            .faces("d.png", same());

        let mut pipeline = Pipeline::new(fx.config(), analyzer).unwrap();
        let outcome = pipeline.run().unwrap();

        assert_eq!(outcome.report.stats.copies_written, 3);
        assert!(fx.out("Persona_001/b\\c.png").is_file());
        assert_eq!(
            pipeline.registry().get(1).unwrap().sources(),
            &["a.png", "b\\c.png", "d.png"]
        );
        assert!(outcome.report_path.is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_unnamable_photo_counted_as_failed() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let fx = Fixture::new(&["a.png"]);
        write_photo(fx.input.path(), "placeholder.png");
        std::fs::rename(
            fx.input.path().join("placeholder.png"),
            fx.input.path().join(OsStr::from_bytes(b"caf\xE9.png")),
        )
        .unwrap();
        let analyzer =
            FakeAnalyzer::new().faces("a.png", vec![face(vec![1.0, 0.0], [0.0, 0.0, 8.0, 8.0])]);

        let mut pipeline = Pipeline::new(fx.config(), analyzer).unwrap();
        let outcome = pipeline.run().unwrap();

        let stats = &outcome.report.stats;
        assert_eq!(stats.images_scanned, 2);
        assert_eq!(stats.images_failed, 1);
        assert_eq!(stats.images_with_faces, 1);
        assert!(fx.out("Persona_001/a.png").is_file());
    }
}
