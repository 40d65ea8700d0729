use std::fmt;

use itertools::iproduct;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{RasterCalcError, Result};

/// Pixel dimensions of a raster grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    pub width: usize,
    pub height: usize,
}

impl Extent {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Nominal block dimensions used to partition an extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSize {
    pub rows: usize,
    pub cols: usize,
}

impl TileSize {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn square(size: usize) -> Self {
        Self::new(size, size)
    }
}

impl Default for TileSize {
    fn default() -> Self {
        Self::square(1024)
    }
}

/// A rectangular window of a raster grid. Carries coordinates only, no data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub row_off: usize,
    pub col_off: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Block {
    pub fn new(row_off: usize, col_off: usize, rows: usize, cols: usize) -> Self {
        Self {
            row_off,
            col_off,
            rows,
            cols,
        }
    }

    /// `(rows, cols)`, matching ndarray's shape order.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    pub fn row_end(&self) -> usize {
        self.row_off + self.rows
    }

    pub fn col_end(&self) -> usize {
        self.col_off + self.cols
    }

    /// GDAL window origin, `(x, y)`.
    pub fn window(&self) -> (isize, isize) {
        (self.col_off as isize, self.row_off as isize)
    }

    /// GDAL window size, `(x, y)`.
    pub fn window_size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn fits_within(&self, extent: Extent) -> bool {
        self.row_end() <= extent.height && self.col_end() <= extent.width
    }

    /// Fails with `OutOfRangeBlock` when the block reaches past `extent`.
    pub fn check_within(&self, extent: Extent) -> Result<()> {
        if self.fits_within(extent) {
            Ok(())
        } else {
            Err(RasterCalcError::OutOfRangeBlock {
                block: *self,
                extent,
            })
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} @ (row {}, col {})",
            self.rows, self.cols, self.row_off, self.col_off
        )
    }
}

/// Row-major partition of an extent into tile-sized blocks.
#[derive(Debug, Clone)]
pub struct BlockGrid {
    extent: Extent,
    tile: TileSize,
    pub blocks_x: usize,
    pub blocks_y: usize,
}

impl BlockGrid {
    pub fn new(extent: Extent, tile: TileSize) -> Result<Self> {
        if tile.rows == 0 || tile.cols == 0 {
            return Err(RasterCalcError::invalid(format!(
                "tile size must be non-zero, got {}x{}",
                tile.rows, tile.cols
            )));
        }

        let blocks_x = extent.width.div_ceil(tile.cols);
        let blocks_y = extent.height.div_ceil(tile.rows);

        debug!(
            "BlockGrid: {} raster, tile {}x{} -> {}x{} blocks",
            extent, tile.rows, tile.cols, blocks_x, blocks_y
        );

        Ok(Self {
            extent,
            tile,
            blocks_x,
            blocks_y,
        })
    }

    pub fn len(&self) -> usize {
        self.blocks_x * self.blocks_y
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block at grid position `(bx, by)`, clipped to the extent.
    pub fn block(&self, bx: usize, by: usize) -> Block {
        let row_off = by * self.tile.rows;
        let col_off = bx * self.tile.cols;
        let rows = self.tile.rows.min(self.extent.height - row_off);
        let cols = self.tile.cols.min(self.extent.width - col_off);
        Block::new(row_off, col_off, rows, cols)
    }

    pub fn iter(&self) -> impl Iterator<Item = Block> + '_ {
        iproduct!(0..self.blocks_y, 0..self.blocks_x).map(move |(by, bx)| self.block(bx, by))
    }
}

/// Partition `extent` into `tile_height x tile_width` blocks in row-major order.
pub fn enumerate_blocks(extent: Extent, tile_height: usize, tile_width: usize) -> Result<Vec<Block>> {
    let grid = BlockGrid::new(extent, TileSize::new(tile_height, tile_width))?;
    Ok(grid.iter().collect())
}
