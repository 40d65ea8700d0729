// src/io/reader.rs
use gdal::Dataset;
use log::debug;
use ndarray::Array2;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use super::{BandBlock, RasterProfile, RasterSource};
use crate::error::{RasterCalcError, Result};
use crate::tiling::Block;

/// GDAL-backed source raster.
///
/// GDAL handles are not safe to share between threads, so each handle sits
/// behind its own lock and workers call `try_clone` to get a private one.
pub struct GdalSource {
    path: PathBuf,
    dataset: Mutex<Dataset>,
    profile: RasterProfile,
}

impl GdalSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dataset = Dataset::open(&path)
            .map_err(|e| RasterCalcError::unavailable(format!("opening {}", path.display()), e))?;
        let profile = read_profile(&dataset, &path)?;

        debug!(
            "Opened {}: {}x{}, {} bands of {}",
            path.display(),
            profile.width,
            profile.height,
            profile.band_count,
            profile.data_type
        );

        Ok(Self {
            path,
            dataset: Mutex::new(dataset),
            profile,
        })
    }
}

fn read_profile(dataset: &Dataset, path: &Path) -> Result<RasterProfile> {
    let (width, height) = dataset.raster_size();
    let band_count = dataset.raster_count();

    // Zero-band rasters are legal in GDAL; they are rejected later by `run`.
    let (data_type, block_size, nodata) = if band_count > 0 {
        let band = dataset
            .rasterband(1)
            .map_err(|e| RasterCalcError::unavailable(format!("reading band 1 of {}", path.display()), e))?;
        (
            format!("{:?}", band.band_type()),
            band.block_size(),
            band.no_data_value(),
        )
    } else {
        ("Unknown".to_string(), (0, 0), None)
    };

    let projection = dataset.projection();

    Ok(RasterProfile {
        width,
        height,
        band_count,
        data_type,
        block_size,
        projection: (!projection.is_empty()).then_some(projection),
        geo_transform: dataset.geo_transform().ok(),
        nodata,
    })
}

impl RasterSource for GdalSource {
    fn profile(&self) -> &RasterProfile {
        &self.profile
    }

    fn read_block(&self, block: &Block, bands: &[usize]) -> Result<Vec<BandBlock>> {
        block.check_within(self.extent())?;

        let dataset = self.dataset.lock();
        let mut out = Vec::with_capacity(bands.len());

        for &index in bands {
            if index == 0 || index > self.profile.band_count {
                return Err(RasterCalcError::invalid(format!(
                    "band {} requested from {} which has {} bands",
                    index,
                    self.path.display(),
                    self.profile.band_count
                )));
            }

            let context = || format!("reading band {} block {} of {}", index, block, self.path.display());
            let band = dataset
                .rasterband(index)
                .map_err(|e| RasterCalcError::unavailable(context(), e))?;
            let buffer = band
                .read_as::<f64>(block.window(), block.window_size(), block.window_size(), None)
                .map_err(|e| RasterCalcError::unavailable(context(), e))?;

            let data = Array2::from_shape_vec(block.shape(), buffer.data().to_vec())
                .map_err(|e| RasterCalcError::unavailable(context(), e))?;
            out.push(BandBlock::from_samples(data, band.no_data_value()));
        }

        Ok(out)
    }

    fn try_clone(&self) -> Result<Self> {
        let dataset = Dataset::open(&self.path)
            .map_err(|e| RasterCalcError::unavailable(format!("reopening {}", self.path.display()), e))?;
        Ok(Self {
            path: self.path.clone(),
            dataset: Mutex::new(dataset),
            profile: self.profile.clone(),
        })
    }
}
