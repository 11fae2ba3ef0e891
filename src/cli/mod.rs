// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::ReaderConfig;
use crate::pipeline::MeterReader;
use crate::vision::model_manager::{RecognitionEngine, VisionModelManager};

/// Water meter reading CLI
#[derive(Parser, Debug)]
#[command(name = "water-meter-ocr")]
#[command(version)]
#[command(about = "Read the counter value from a water meter photo", long_about = None)]
pub struct Cli {
    /// Image file to read
    pub image: PathBuf,

    /// TOML configuration file (`[reader]` table)
    #[arg(long, env = "METER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Text recognition backend: onnx or vlm
    #[arg(long, default_value = "onnx")]
    pub engine: RecognitionEngine,

    /// Pretty-print the JSON result
    #[arg(long)]
    pub pretty: bool,

    /// Write the image with detections drawn to this PNG file
    #[arg(long)]
    pub annotated_out: Option<PathBuf>,
}

/// Load configuration: file (plus env overrides) when given, env otherwise
pub fn load_config(path: Option<&PathBuf>) -> Result<ReaderConfig> {
    let config = match path {
        Some(path) => ReaderConfig::from_file(path)?.with_env_overrides(),
        None => ReaderConfig::from_env(),
    };
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;

    let models = VisionModelManager::new(&config, cli.engine).await?;
    let mut reader = MeterReader::new(models.recognizer(), config);
    if let Some(detector) = models.detector() {
        reader = reader.with_detector(detector);
    }

    let bytes = tokio::fs::read(&cli.image)
        .await
        .with_context(|| format!("Failed to read image {}", cli.image.display()))?;

    let result = reader.process_reading(&bytes).await;

    if let Some(path) = &cli.annotated_out {
        match &result.annotated_image {
            Some(png) => {
                tokio::fs::write(path, png)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Annotated image written to {}", path.display());
            }
            None => warn!("No detections to annotate; {} not written", path.display()),
        }
    }

    let json = if cli.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", json);

    Ok(())
}
