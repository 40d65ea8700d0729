use ndarray::{Array2, Zip};

use crate::error::{RasterCalcError, Result};

/// One band's samples for one block, with an optional validity mask.
///
/// `mask[[r, c]] == true` marks a valid sample. A missing mask means every
/// sample is valid.
#[derive(Debug, Clone, PartialEq)]
pub struct BandBlock {
    pub data: Array2<f64>,
    pub mask: Option<Array2<bool>>,
}

impl BandBlock {
    pub fn new(data: Array2<f64>) -> Self {
        Self { data, mask: None }
    }

    pub fn with_mask(data: Array2<f64>, mask: Array2<bool>) -> Result<Self> {
        if data.dim() != mask.dim() {
            return Err(RasterCalcError::invalid(format!(
                "mask shape {:?} does not match data shape {:?}",
                mask.dim(),
                data.dim()
            )));
        }
        Ok(Self {
            data,
            mask: Some(mask),
        })
    }

    /// Build from raw samples, masking NaN and samples equal to `nodata`.
    pub fn from_samples(data: Array2<f64>, nodata: Option<f64>) -> Self {
        let mask = data.mapv(|v| is_valid_sample(v, nodata));
        if mask.iter().all(|&valid| valid) {
            Self::new(data)
        } else {
            Self {
                data,
                mask: Some(mask),
            }
        }
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.mask.as_ref().map_or(true, |m| m[[row, col]])
    }

    pub fn valid_count(&self) -> usize {
        match &self.mask {
            Some(mask) => mask.iter().filter(|&&v| v).count(),
            None => self.data.len(),
        }
    }

    /// Samples as they are stored in a destination raster: invalid pixels become NaN.
    pub fn to_storage(&self) -> Array2<f64> {
        match &self.mask {
            Some(mask) => {
                let mut out = self.data.clone();
                Zip::from(&mut out).and(mask).for_each(|v, &valid| {
                    if !valid {
                        *v = f64::NAN;
                    }
                });
                out
            }
            None => self.data.clone(),
        }
    }
}

pub(crate) fn is_valid_sample(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return false;
    }
    match nodata {
        Some(nd) if nd.is_nan() => true,
        Some(nd) => value != nd,
        None => true,
    }
}
