// src/batch.rs
use anyhow::{bail, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{OptionsOverride, ProcessingOptions};
use crate::processing::indices::{IndexCalculator, EVI, NDI, SAVI};
use crate::processing::{BlockProcessor, RunSummary};

#[derive(Deserialize, Serialize, Debug)]
pub struct BatchConfig {
    #[serde(default)]
    pub global: OptionsOverride,
    pub operations: Vec<Operation>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Ndvi,
    Ndwi,
    Ndsi,
    Savi,
    Evi,
}

impl IndexKind {
    /// Number of band numbers an operation of this kind must list.
    pub fn band_count(&self) -> usize {
        match self {
            IndexKind::Evi => 3,
            _ => 2,
        }
    }
}

#[derive(Deserialize, Serialize, Debug)]
pub struct Operation {
    #[serde(rename = "type")]
    pub index: IndexKind,
    pub input: PathBuf,
    /// 1-based band numbers: `[red, nir]` for NDVI, `[green, nir]` for NDWI,
    /// `[green, swir]` for NDSI, `[nir, red]` for SAVI, `[nir, red, blue]` for EVI.
    pub bands: Vec<usize>,
    pub output: PathBuf,
    pub soil_factor: Option<f64>,
    pub input_scale: Option<f64>,
    #[serde(flatten)]
    pub overrides: OptionsOverride,
}

impl Operation {
    pub fn calculator(&self) -> Result<Box<dyn IndexCalculator>> {
        if self.bands.len() != self.index.band_count() {
            bail!(
                "{:?} expects {} band numbers, got {:?}",
                self.index,
                self.index.band_count(),
                self.bands
            );
        }

        let scale = self.input_scale.unwrap_or(1.0);
        let calculator: Box<dyn IndexCalculator> = match self.index {
            IndexKind::Ndvi => Box::new(NDI::ndvi()),
            IndexKind::Ndwi => Box::new(NDI::ndwi()),
            IndexKind::Ndsi => Box::new(NDI::ndsi()),
            IndexKind::Savi => {
                Box::new(SAVI::new(0, 1, self.soil_factor.unwrap_or(0.5), None).with_input_scale(scale))
            }
            IndexKind::Evi => Box::new(EVI::new(0, 1, 2, None).with_input_scale(scale)),
        };
        Ok(calculator)
    }
}

pub fn load_batch(config_path: &Path) -> Result<BatchConfig> {
    let config_content = fs::read_to_string(config_path)
        .with_context(|| format!("reading batch config {}", config_path.display()))?;
    let config: BatchConfig = serde_json::from_str(&config_content)
        .with_context(|| format!("parsing batch config {}", config_path.display()))?;
    Ok(config)
}

/// Run every operation of a batch file in order, stopping at the first failure.
pub fn process_batch(config_path: &Path, base: &ProcessingOptions) -> Result<Vec<RunSummary>> {
    let config = load_batch(config_path)?;
    let global = config.global.apply(base);

    info!("Starting batch processing with {} operations", config.operations.len());

    let mut summaries = Vec::with_capacity(config.operations.len());
    for (i, op) in config.operations.iter().enumerate() {
        info!(
            "[{}/{}] {:?} {} -> {}",
            i + 1,
            config.operations.len(),
            op.index,
            op.input.display(),
            op.output.display()
        );

        let calculator = op.calculator()?;
        let processor = BlockProcessor::new(op.overrides.apply(&global));
        let summary = processor
            .process(calculator.as_ref(), &op.input, &op.bands, &op.output)
            .with_context(|| format!("operation {} ({:?})", i + 1, op.index))?;
        summaries.push(summary);
    }

    info!("Batch processing complete");
    Ok(summaries)
}
