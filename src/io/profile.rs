use serde::{Deserialize, Serialize};

use crate::tiling::{Extent, TileSize};

pub const OUTPUT_DATA_TYPE: &str = "Float64";

/// Metadata template of a raster: geometry, sample type and georeferencing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterProfile {
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    pub data_type: String,
    /// Native storage block size, `(x, y)`.
    pub block_size: (usize, usize),
    pub projection: Option<String>,
    pub geo_transform: Option<[f64; 6]>,
    pub nodata: Option<f64>,
}

impl RasterProfile {
    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    /// Profile of a single-band float destination with storage tiling matching `tile`.
    pub fn for_output(&self, tile: TileSize) -> RasterProfile {
        RasterProfile {
            width: self.width,
            height: self.height,
            band_count: 1,
            data_type: OUTPUT_DATA_TYPE.to_string(),
            block_size: (tile.cols, tile.rows),
            projection: self.projection.clone(),
            geo_transform: self.geo_transform,
            nodata: Some(f64::NAN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_profile_overrides() {
        let source = RasterProfile {
            width: 300,
            height: 200,
            band_count: 4,
            data_type: "UInt16".to_string(),
            block_size: (300, 1),
            projection: Some("EPSG:32633".to_string()),
            geo_transform: Some([500000.0, 10.0, 0.0, 4600000.0, 0.0, -10.0]),
            nodata: Some(0.0),
        };

        let out = source.for_output(TileSize::new(128, 256));
        assert_eq!(out.extent(), source.extent());
        assert_eq!(out.band_count, 1);
        assert_eq!(out.data_type, OUTPUT_DATA_TYPE);
        assert_eq!(out.block_size, (256, 128));
        assert_eq!(out.projection, source.projection);
        assert_eq!(out.geo_transform, source.geo_transform);
        assert!(out.nodata.unwrap().is_nan());
    }
}
