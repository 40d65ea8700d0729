// src/processing/indices/mod.rs
pub mod evi;
pub mod ndi;
pub mod savi;

pub use evi::EVI;
pub use ndi::NDI;
pub use savi::SAVI;

use ndarray::{Array2, Zip};

use crate::error::{RasterCalcError, Result};
use crate::io::BandBlock;

/// Trait for spectral index calculators
pub trait IndexCalculator: Send + Sync {
    /// Calculate the index from the provided input bands. Must be pure: the
    /// same inputs always give bit-identical output.
    fn calculate(&self, inputs: &[BandBlock]) -> Result<BandBlock>;

    /// Return the number of required input bands
    fn required_bands(&self) -> usize;

    /// Return the name of the index
    fn name(&self) -> &str;
}

pub(crate) fn input<'a>(name: &str, inputs: &'a [BandBlock], index: usize) -> Result<&'a BandBlock> {
    inputs.get(index).ok_or_else(|| {
        RasterCalcError::invalid(format!(
            "{} needs input {} but only {} were provided",
            name,
            index,
            inputs.len()
        ))
    })
}

pub(crate) fn ensure_same_shape(name: &str, bands: &[&BandBlock]) -> Result<()> {
    let Some(first) = bands.first() else {
        return Ok(());
    };
    match bands.iter().find(|b| b.shape() != first.shape()) {
        Some(other) => Err(RasterCalcError::invalid(format!(
            "{} input shapes differ: {:?} vs {:?}",
            name,
            first.shape(),
            other.shape()
        ))),
        None => Ok(()),
    }
}

/// Attach the output validity mask: a pixel is valid only when the result is
/// finite and every input is valid there. Invalid pixels are set to NaN.
pub(crate) fn finish(mut data: Array2<f64>, inputs: &[&BandBlock]) -> BandBlock {
    let mut mask = data.mapv(f64::is_finite);
    for input in inputs {
        if let Some(input_mask) = &input.mask {
            Zip::from(&mut mask).and(input_mask).for_each(|valid, &ok| *valid &= ok);
        }
    }
    Zip::from(&mut data).and(&mask).for_each(|value, &valid| {
        if !valid {
            *value = f64::NAN;
        }
    });
    BandBlock {
        data,
        mask: Some(mask),
    }
}

/// Ratio that yields NaN instead of dividing by zero.
#[inline]
pub(crate) fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        f64::NAN
    } else {
        numerator / denominator
    }
}
