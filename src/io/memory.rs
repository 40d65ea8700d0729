use std::sync::Arc;

use ndarray::{s, Array2};
use parking_lot::Mutex;

use super::{BandBlock, RasterProfile, RasterSink, RasterSource};
use crate::error::{RasterCalcError, Result};
use crate::tiling::{Block, Extent};

/// In-memory multi-band raster. Clones share the sample storage.
#[derive(Debug, Clone)]
pub struct MemRaster {
    bands: Arc<Vec<Array2<f64>>>,
    profile: RasterProfile,
}

impl MemRaster {
    /// All bands must share one `(rows, cols)` shape.
    pub fn from_bands(bands: Vec<Array2<f64>>, nodata: Option<f64>) -> Result<Self> {
        let (height, width) = bands.first().map(|b| b.dim()).unwrap_or((0, 0));
        if let Some(bad) = bands.iter().find(|b| b.dim() != (height, width)) {
            return Err(RasterCalcError::invalid(format!(
                "band shape {:?} differs from first band {:?}",
                bad.dim(),
                (height, width)
            )));
        }

        let profile = RasterProfile {
            width,
            height,
            band_count: bands.len(),
            data_type: "Float64".to_string(),
            block_size: (width, 1),
            projection: None,
            geo_transform: None,
            nodata,
        };

        Ok(Self {
            bands: Arc::new(bands),
            profile,
        })
    }

    pub fn band(&self, index: usize) -> Option<&Array2<f64>> {
        index.checked_sub(1).and_then(|i| self.bands.get(i))
    }
}

impl RasterSource for MemRaster {
    fn profile(&self) -> &RasterProfile {
        &self.profile
    }

    fn read_block(&self, block: &Block, bands: &[usize]) -> Result<Vec<BandBlock>> {
        block.check_within(self.extent())?;

        bands
            .iter()
            .map(|&index| {
                let band = self.band(index).ok_or_else(|| {
                    RasterCalcError::invalid(format!(
                        "band {} requested from a raster with {} bands",
                        index,
                        self.bands.len()
                    ))
                })?;
                let window = band
                    .slice(s![block.row_off..block.row_end(), block.col_off..block.col_end()])
                    .to_owned();
                Ok(BandBlock::from_samples(window, self.profile.nodata))
            })
            .collect()
    }

    fn try_clone(&self) -> Result<Self> {
        Ok(self.clone())
    }
}

/// What a finalized `MemSink` hands back.
#[derive(Debug, Clone)]
pub struct MemOutput {
    pub data: Array2<f64>,
    /// Blocks in the order they were written.
    pub written: Vec<Block>,
}

/// In-memory single-band float destination. Invalid pixels are stored as NaN.
#[derive(Debug)]
pub struct MemSink {
    extent: Extent,
    data: Mutex<Array2<f64>>,
    written: Mutex<Vec<Block>>,
}

impl MemSink {
    pub fn new(extent: Extent) -> Self {
        Self {
            extent,
            data: Mutex::new(Array2::from_elem((extent.height, extent.width), f64::NAN)),
            written: Mutex::new(Vec::new()),
        }
    }

    pub fn for_profile(profile: &RasterProfile) -> Self {
        Self::new(profile.extent())
    }
}

impl RasterSink for MemSink {
    type Finalized = MemOutput;

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

        let stored = output.to_storage();
        self.data
            .lock()
            .slice_mut(s![block.row_off..block.row_end(), block.col_off..block.col_end()])
            .assign(&stored);
        self.written.lock().push(*block);
        Ok(())
    }

    fn finalize(self) -> Result<MemOutput> {
        Ok(MemOutput {
            data: self.data.into_inner(),
            written: self.written.into_inner(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_band() -> MemRaster {
        let red = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let nir = array![[10.0, 20.0, 30.0], [40.0, 50.0, 60.0]];
        MemRaster::from_bands(vec![red, nir], None).unwrap()
    }

    #[test]
    fn test_read_block_in_requested_order() {
        let raster = two_band();
        let blocks = raster.read_block(&Block::new(1, 1, 1, 2), &[2, 1]).unwrap();
        assert_eq!(blocks[0].data, array![[50.0, 60.0]]);
        assert_eq!(blocks[1].data, array![[5.0, 6.0]]);
    }

    #[test]
    fn test_read_out_of_range_block() {
        let err = two_band().read_block(&Block::new(1, 2, 2, 2), &[1]).unwrap_err();
        assert!(matches!(err, RasterCalcError::OutOfRangeBlock { .. }));
    }

    #[test]
    fn test_read_missing_band() {
        let err = two_band().read_block(&Block::new(0, 0, 1, 1), &[3]).unwrap_err();
        assert!(matches!(err, RasterCalcError::InvalidInput(_)));
    }

    #[test]
    fn test_mismatched_band_shapes() {
        let err = MemRaster::from_bands(vec![Array2::zeros((2, 2)), Array2::zeros((2, 3))], None).unwrap_err();
        assert!(matches!(err, RasterCalcError::InvalidInput(_)));
    }

    #[test]
    fn test_sink_write_then_read_back() {
        let sink = MemSink::new(Extent::new(4, 3));
        let block = Block::new(1, 2, 2, 2);
        let output = BandBlock::new(array![[0.1, 0.2], [0.3, 0.4]]);
        sink.write_block(&block, &output).unwrap();

        let out = sink.finalize().unwrap();
        assert_eq!(out.written, vec![block]);

        let raster = MemRaster::from_bands(vec![out.data], Some(f64::NAN)).unwrap();
        let back = raster.read_block(&block, &[1]).unwrap();
        assert_eq!(back[0].data, output.data);
    }

    #[test]
    fn test_sink_rejects_shape_mismatch() {
        let sink = MemSink::new(Extent::new(4, 4));
        let err = sink
            .write_block(&Block::new(0, 0, 2, 2), &BandBlock::new(Array2::zeros((1, 2))))
            .unwrap_err();
        assert!(matches!(err, RasterCalcError::InvalidInput(_)));
    }
}
