// src/lib.rs
pub mod batch;
pub mod benchmark;
pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod processing;
pub mod tiling;

pub use error::{RasterCalcError, Result};
pub use processing::{run, DispatchStrategy};
pub use tiling::{enumerate_blocks, Block, Extent, TileSize};

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
