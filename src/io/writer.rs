// src/io/writer.rs
use gdal::raster::{Buffer, RasterCreationOptions};
use gdal::{Dataset, DriverManager, DriverType, Metadata};
use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{BandBlock, RasterProfile, RasterSink};
use crate::error::{RasterCalcError, Result};
use crate::tiling::{Block, Extent};

/// Storage options for the destination raster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputOptions {
    #[serde(default = "default_compress")]
    pub compress: String,
    #[serde(default = "default_compress_level")]
    pub compress_level: u8,
}

fn default_compress() -> String {
    "DEFLATE".to_string()
}

fn default_compress_level() -> u8 {
    6
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            compress: default_compress(),
            compress_level: default_compress_level(),
        }
    }
}

impl OutputOptions {
    /// GTiff creation options for a destination tiled like `profile`.
    pub fn creation_options(&self, profile: &RasterProfile) -> Vec<String> {
        let mut options = Vec::new();
        let compress = self.compress.to_uppercase();

        if compress != "NONE" {
            options.push(format!("COMPRESS={}", compress));

            match compress.as_str() {
                "DEFLATE" => options.push(format!("ZLEVEL={}", self.compress_level.min(9))),
                "ZSTD" => options.push(format!("ZSTD_LEVEL={}", self.compress_level.min(22))),
                _ => {}
            }
        }

        // GTiff only accepts tile edges that are multiples of 16
        let (block_x, block_y) = profile.block_size;
        if block_x % 16 == 0 && block_y % 16 == 0 && block_x > 0 && block_y > 0 {
            options.push("TILED=YES".to_string());
            options.push(format!("BLOCKXSIZE={}", block_x));
            options.push(format!("BLOCKYSIZE={}", block_y));
        } else {
            warn!(
                "Tile size {}x{} is not a multiple of 16, writing striped output",
                block_x, block_y
            );
        }

        options
    }
}

/// GDAL-backed single-band `Float64` destination.
pub struct GdalSink {
    path: PathBuf,
    extent: Extent,
    dataset: Mutex<Dataset>,
}

impl GdalSink {
    /// Create `path` fresh from an output profile (see `RasterProfile::for_output`).
    pub fn create<P: AsRef<Path>>(
        path: P,
        profile: &RasterProfile,
        options: &OutputOptions,
        description: &str,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let context = || format!("creating {}", path.display());

        let driver = match DriverManager::get_output_driver_for_dataset_name(&path, DriverType::Raster) {
            Some(driver) => driver,
            None => DriverManager::get_driver_by_name("GTiff")
                .map_err(|e| RasterCalcError::unavailable(context(), e))?,
        };

        let creation_options = RasterCreationOptions::from_iter(options.creation_options(profile));
        debug!("Creating {} with driver {}", path.display(), driver.short_name());

        let mut dataset = driver
            .create_with_band_type_with_options::<f64, _>(
                &path,
                profile.width,
                profile.height,
                1,
                &creation_options,
            )
            .map_err(|e| RasterCalcError::unavailable(context(), e))?;

        if let Some(projection) = &profile.projection {
            dataset
                .set_projection(projection)
                .map_err(|e| RasterCalcError::unavailable(context(), e))?;
        }
        if let Some(geo_transform) = &profile.geo_transform {
            dataset
                .set_geo_transform(geo_transform)
                .map_err(|e| RasterCalcError::unavailable(context(), e))?;
        }

        {
            let mut band = dataset
                .rasterband(1)
                .map_err(|e| RasterCalcError::unavailable(context(), e))?;
            band.set_no_data_value(Some(f64::NAN))
                .map_err(|e| RasterCalcError::unavailable(context(), e))?;
            band.set_description(description)
                .map_err(|e| RasterCalcError::unavailable(context(), e))?;
        }

        Ok(Self {
            extent: profile.extent(),
            path,
            dataset: Mutex::new(dataset),
        })
    }
}

impl RasterSink for GdalSink {
    type Finalized = PathBuf;

    fn extent(&self) -> Extent {
        self.extent
    }

    fn write_block(&self, block: &Block, output: &BandBlock) -> Result<()> {
        block.check_within(self.extent)?;
        if output.shape() != block.shape() {
            return Err(RasterCalcError::invalid(format!(
                "output shape {:?} does not match block {}",
                output.shape(),
                block
            )));
        }

        let context = || format!("writing block {} to {}", block, self.path.display());
        let samples: Vec<f64> = output.to_storage().iter().copied().collect();
        let mut buffer = Buffer::new(block.window_size(), samples);

        // GDAL handles do not take concurrent positional writes; blocks are disjoint
        // so the lock only serializes the call, never the data.
        let dataset = self.dataset.lock();
        let mut band = dataset
            .rasterband(1)
            .map_err(|e| RasterCalcError::unavailable(context(), e))?;
        band.write(block.window(), block.window_size(), &mut buffer)
            .map_err(|e| RasterCalcError::unavailable(context(), e))
    }

    fn finalize(self) -> Result<PathBuf> {
        let mut dataset = self.dataset.into_inner();
        dataset
            .flush_cache()
            .map_err(|e| RasterCalcError::unavailable(format!("flushing {}", self.path.display()), e))?;
        drop(dataset);
        Ok(self.path)
    }
}
