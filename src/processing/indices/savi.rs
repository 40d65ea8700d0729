// src/processing/indices/savi.rs
use ndarray::{Array2, Zip};

use super::{ensure_same_shape, finish, guarded_ratio, input, IndexCalculator};
use crate::error::Result;
use crate::io::BandBlock;

/// Soil Adjusted Vegetation Index: `((NIR - Red) / (NIR + Red + L)) * (1 + L)`
pub struct SAVI {
    nir_index: usize,
    red_index: usize,
    soil_factor: f64,
    input_scale: f64,
    name: String,
}

impl SAVI {
    pub fn new(nir_index: usize, red_index: usize, soil_factor: f64, name: Option<String>) -> Self {
        Self {
            nir_index,
            red_index,
            soil_factor,
            input_scale: 1.0,
            name: name.unwrap_or_else(|| "SAVI".to_string()),
        }
    }

    /// Divide samples by `scale` first, e.g. 10000 for Sentinel-2 L2A digital numbers.
    /// L is a reflectance-space constant, so DN inputs give meaningless results otherwise.
    pub fn with_input_scale(mut self, scale: f64) -> Self {
        self.input_scale = scale;
        self
    }
}

impl IndexCalculator for SAVI {
    fn calculate(&self, inputs: &[BandBlock]) -> Result<BandBlock> {
        let nir = input(&self.name, inputs, self.nir_index)?;
        let red = input(&self.name, inputs, self.red_index)?;
        ensure_same_shape(&self.name, &[nir, red])?;

        let l = self.soil_factor;
        let scale = self.input_scale;
        let mut result = Array2::<f64>::zeros(nir.shape());
        Zip::from(&mut result)
            .and(&nir.data)
            .and(&red.data)
            .for_each(|out, &n, &r| {
                let (n, r) = (n / scale, r / scale);
                *out = guarded_ratio(n - r, n + r + l) * (1.0 + l);
            });

        Ok(finish(result, &[nir, red]))
    }

    fn required_bands(&self) -> usize {
        self.nir_index.max(self.red_index) + 1
    }

    fn name(&self) -> &str {
        &self.name
    }
}
