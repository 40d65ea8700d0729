// src/processing/indices/evi.rs
use ndarray::{Array2, Zip};

use super::{ensure_same_shape, finish, guarded_ratio, input, IndexCalculator};
use crate::error::Result;
use crate::io::BandBlock;

// EVI coefficients from MODIS documentation
const G: f64 = 2.5; // Gain factor
const L: f64 = 1.0; // Canopy background adjustment
const C1: f64 = 6.0; // Aerosol resistance (red)
const C2: f64 = 7.5; // Aerosol resistance (blue)

/// Enhanced Vegetation Index (EVI) calculator
pub struct EVI {
    nir_index: usize,
    red_index: usize,
    blue_index: usize,
    input_scale: f64,
    name: String,
}

impl EVI {
    pub fn new(nir_index: usize, red_index: usize, blue_index: usize, name: Option<String>) -> Self {
        Self {
            nir_index,
            red_index,
            blue_index,
            input_scale: 1.0,
            name: name.unwrap_or_else(|| "EVI".to_string()),
        }
    }

    /// See `SAVI::with_input_scale`.
    pub fn with_input_scale(mut self, scale: f64) -> Self {
        self.input_scale = scale;
        self
    }
}

impl IndexCalculator for EVI {
    fn calculate(&self, inputs: &[BandBlock]) -> Result<BandBlock> {
        let nir = input(&self.name, inputs, self.nir_index)?;
        let red = input(&self.name, inputs, self.red_index)?;
        let blue = input(&self.name, inputs, self.blue_index)?;
        ensure_same_shape(&self.name, &[nir, red, blue])?;

        let scale = self.input_scale;
        let mut result = Array2::<f64>::zeros(nir.shape());
        Zip::from(&mut result)
            .and(&nir.data)
            .and(&red.data)
            .and(&blue.data)
            .for_each(|out, &n, &r, &b| {
                let (n, r, b) = (n / scale, r / scale, b / scale);
                *out = G * guarded_ratio(n - r, n + C1 * r - C2 * b + L);
            });

        Ok(finish(result, &[nir, red, blue]))
    }

    fn required_bands(&self) -> usize {
        self.nir_index.max(self.red_index).max(self.blue_index) + 1
    }

    fn name(&self) -> &str {
        &self.name
    }
}
