use anyhow::Result;
use clap::Parser;
use facesort::{Config, Pipeline, PythonFaceAnalyzer};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Sort photos into one folder per person
#[derive(Debug, Parser)]
#[command(name = "facesort", version, about)]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder with the photos to classify
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Folder that receives one subfolder per person
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// L2 distance below which two faces are the same person
    #[arg(short, long)]
    threshold: Option<f32>,

    /// Python interpreter for the face analyzer
    #[arg(long)]
    python: Option<PathBuf>,

    /// Face analyzer script
    #[arg(long)]
    script: Option<PathBuf>,

    /// InsightFace model pack name
    #[arg(long)]
    model: Option<String>,

    /// Embedding length produced by the model
    #[arg(long)]
    embedding_dim: Option<usize>,

    /// Detector input size
    #[arg(long)]
    det_size: Option<u32>,

    /// Photos sent to the analyzer per call
    #[arg(long)]
    batch_size: Option<usize>,

    /// Run the model on the first GPU
    #[arg(long)]
    gpu: bool,

    /// Include photos in subfolders
    #[arg(short, long)]
    recursive: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(input) = self.input {
            config.input_dir = input;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(python) = self.python {
            config.python = python;
        }
        if let Some(script) = self.script {
            config.script = script;
        }
        if let Some(model) = self.model {
            config.model.name = model;
        }
        if let Some(dim) = self.embedding_dim {
            config.embedding_dim = dim;
            config.model.dim = dim;
        }
        if let Some(det_size) = self.det_size {
            config.model.det_size = det_size;
        }
        if let Some(batch_size) = self.batch_size {
            config.model.max_batch = batch_size;
        }
        if self.gpu {
            config.ctx_id = 0;
        }
        if self.recursive {
            config.recursive = true;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config = cli.into_config()?;
    let analyzer = PythonFaceAnalyzer::new(&config.python, &config.script, config.model.clone())
        .ctx_id(config.ctx_id);

    let start = Instant::now();
    let mut pipeline = Pipeline::new(config, analyzer)?;
    let outcome = pipeline.run()?;
    let stats = &outcome.report.stats;

    println!("\nClassification complete [{:.2}s]", start.elapsed().as_secs_f64());
    println!("Photos scanned:       {}", stats.images_scanned);
    println!("Photos with faces:    {}", stats.images_with_faces);
    println!("Photos without faces: {}", stats.images_without_faces);
    println!("Unreadable photos:    {}", stats.images_failed);
    println!("Faces detected:       {}", stats.faces_detected);
    println!("Faces skipped:        {}", stats.faces_rejected);
    println!("Report:               {}", outcome.report_path.display());
    println!("Total clusters: {}", stats.clusters);

    Ok(())
}
