use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ProcessingOptions, DEFAULT_TILE_SIZE};
use crate::io::OutputOptions;
use crate::processing::StrategyKind;
use crate::tiling::TileSize;

#[derive(Parser)]
#[command(name = "tiled-ndvi")]
#[command(about = "Block-tiled spectral index calculator with serial, concurrent and parallel dispatch")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output file path
    #[arg(short, long, default_value = "output.tif", global = true)]
    pub output: PathBuf,

    /// Block edge length in pixels
    #[arg(short, long, default_value_t = DEFAULT_TILE_SIZE, global = true)]
    pub tile_size: usize,

    /// How blocks are scheduled
    #[arg(short, long, value_enum, default_value_t = StrategyKind::Serial, global = true)]
    pub strategy: StrategyKind,

    /// Worker count (default: 4 per core for concurrent, 1 per core for parallel)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Output compression (DEFLATE, ZSTD, LZW, NONE)
    #[arg(long, default_value = "DEFLATE", global = true)]
    pub compress: String,

    /// Compression level
    #[arg(long, default_value = "6", global = true)]
    pub compress_level: u8,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    pub fn processing_options(&self) -> ProcessingOptions {
        ProcessingOptions {
            tile_size: TileSize::square(self.tile_size),
            strategy: self.strategy.with_workers(self.workers),
            output: OutputOptions {
                compress: self.compress.clone(),
                compress_level: self.compress_level,
            },
        }
    }
}

/// A multi-band input raster.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Input raster path
    #[arg(short, long)]
    pub input: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Normalized Difference Vegetation Index: (NIR-RED)/(NIR+RED)
    Ndvi {
        #[command(flatten)]
        input: InputArgs,

        /// Red band number
        #[arg(short = 'r', long, default_value = "1")]
        red: usize,

        /// NIR band number
        #[arg(short = 'n', long, default_value = "4")]
        nir: usize,
    },

    /// Normalized Difference Water Index: (GREEN-NIR)/(GREEN+NIR)
    Ndwi {
        #[command(flatten)]
        input: InputArgs,

        /// Green band number
        #[arg(short = 'g', long)]
        green: usize,

        /// NIR band number
        #[arg(short = 'n', long)]
        nir: usize,
    },

    /// Soil Adjusted Vegetation Index
    Savi {
        #[command(flatten)]
        input: InputArgs,

        /// NIR band number
        #[arg(short = 'n', long)]
        nir: usize,

        /// Red band number
        #[arg(short = 'r', long)]
        red: usize,

        /// Soil adjustment factor
        #[arg(short = 'l', long, default_value = "0.5")]
        soil_factor: f64,

        /// Divide samples by this before computing (10000 for Sentinel-2 L2A)
        #[arg(long, default_value = "1.0")]
        input_scale: f64,
    },

    /// Enhanced Vegetation Index
    Evi {
        #[command(flatten)]
        input: InputArgs,

        /// NIR band number
        #[arg(short = 'n', long)]
        nir: usize,

        /// Red band number
        #[arg(short = 'r', long)]
        red: usize,

        /// Blue band number
        #[arg(short = 'b', long)]
        blue: usize,

        /// Divide samples by this before computing (10000 for Sentinel-2 L2A)
        #[arg(long, default_value = "1.0")]
        input_scale: f64,
    },

    /// Print the input raster profile as JSON
    Info {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Compute NDVI under every strategy and report speedups over serial
    Benchmark {
        #[command(flatten)]
        input: InputArgs,

        /// Red band number
        #[arg(short = 'r', long, default_value = "1")]
        red: usize,

        /// NIR band number
        #[arg(short = 'n', long, default_value = "4")]
        nir: usize,

        /// Print the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run the operations listed in a JSON batch file
    Batch {
        /// Batch configuration file
        config: PathBuf,
    },
}
