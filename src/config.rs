use serde::{Deserialize, Serialize};

use crate::io::OutputOptions;
use crate::processing::{DispatchStrategy, StrategyKind};
use crate::tiling::TileSize;

pub const DEFAULT_TILE_SIZE: usize = 1024;

/// Everything a file-to-file run needs besides the index and the paths.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOptions {
    pub tile_size: TileSize,
    pub strategy: DispatchStrategy,
    pub output: OutputOptions,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            tile_size: TileSize::square(DEFAULT_TILE_SIZE),
            strategy: DispatchStrategy::Serial,
            output: OutputOptions::default(),
        }
    }
}

/// Serialized form of `ProcessingOptions`, as found in batch files.
/// Every field is optional so that job entries can override selectively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsOverride {
    pub tile_size: Option<usize>,
    pub strategy: Option<StrategyKind>,
    pub workers: Option<usize>,
    pub compress: Option<String>,
    pub compress_level: Option<u8>,
}

impl OptionsOverride {
    /// Apply the fields that are set on top of `base`.
    pub fn apply(&self, base: &ProcessingOptions) -> ProcessingOptions {
        let mut options = base.clone();
        if let Some(size) = self.tile_size {
            options.tile_size = TileSize::square(size);
        }
        match (self.strategy, self.workers) {
            (Some(kind), workers) => options.strategy = kind.with_workers(workers),
            (None, Some(workers)) => {
                options.strategy = base.strategy.kind().with_workers(Some(workers));
            }
            (None, None) => {}
        }
        if let Some(compress) = &self.compress {
            options.output.compress = compress.clone();
        }
        if let Some(level) = self.compress_level {
            options.output.compress_level = level;
        }
        options
    }
}
