// src/processing/indices/ndi.rs
use ndarray::{Array2, Zip};

use super::{ensure_same_shape, finish, guarded_ratio, input, IndexCalculator};
use crate::error::Result;
use crate::io::BandBlock;

/// Normalized Difference Index (NDI) calculator: `(A - B) / (A + B)`
pub struct NDI {
    band_a_index: usize,
    band_b_index: usize,
    name: String,
}

impl NDI {
    pub fn new(band_a_index: usize, band_b_index: usize, name: Option<String>) -> Self {
        Self {
            band_a_index,
            band_b_index,
            name: name.unwrap_or_else(|| "NDI".to_string()),
        }
    }

    /// NDVI over inputs ordered `[red, nir]`: `(NIR - Red) / (NIR + Red)`.
    pub fn ndvi() -> Self {
        Self::new(1, 0, Some("NDVI".to_string()))
    }

    /// NDWI over inputs ordered `[green, nir]`.
    pub fn ndwi() -> Self {
        Self::new(0, 1, Some("NDWI".to_string()))
    }

    /// NDSI over inputs ordered `[green, swir]`.
    pub fn ndsi() -> Self {
        Self::new(0, 1, Some("NDSI".to_string()))
    }
}

impl IndexCalculator for NDI {
    fn calculate(&self, inputs: &[BandBlock]) -> Result<BandBlock> {
        let band_a = input(&self.name, inputs, self.band_a_index)?;
        let band_b = input(&self.name, inputs, self.band_b_index)?;
        ensure_same_shape(&self.name, &[band_a, band_b])?;

        let mut result = Array2::<f64>::zeros(band_a.shape());
        Zip::from(&mut result)
            .and(&band_a.data)
            .and(&band_b.data)
            .for_each(|out, &a, &b| *out = guarded_ratio(a - b, a + b));

        Ok(finish(result, &[band_a, band_b]))
    }

    fn required_bands(&self) -> usize {
        self.band_a_index.max(self.band_b_index) + 1
    }

    fn name(&self) -> &str {
        &self.name
    }
}
