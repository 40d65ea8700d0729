// src/io/mod.rs
pub mod band;
pub mod memory;
pub mod profile;
pub mod reader;
pub mod writer;

pub use band::BandBlock;
pub use memory::{MemRaster, MemSink};
pub use profile::RasterProfile;
pub use reader::GdalSource;
pub use writer::{GdalSink, OutputOptions};

use crate::error::Result;
use crate::tiling::{Block, Extent};

/// Readable raster. Implementations must hand out independent handles via
/// `try_clone` so that each worker can read without sharing one.
pub trait RasterSource: Send + Sync + Sized {
    fn profile(&self) -> &RasterProfile;

    /// Read the given 1-based bands for `block`, in the requested order.
    fn read_block(&self, block: &Block, bands: &[usize]) -> Result<Vec<BandBlock>>;

    fn try_clone(&self) -> Result<Self>;

    fn extent(&self) -> Extent {
        self.profile().extent()
    }
}

/// Single-band destination raster written block by block.
///
/// `write_block` may be called from many threads at once as long as the
/// blocks are disjoint.
pub trait RasterSink: Send + Sync + Sized {
    /// What `finalize` hands back once every block is persisted.
    type Finalized;

    fn extent(&self) -> Extent;

    fn write_block(&self, block: &Block, output: &BandBlock) -> Result<()>;

    fn finalize(self) -> Result<Self::Finalized>;
}
