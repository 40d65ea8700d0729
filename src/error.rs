use thiserror::Error;

use crate::tiling::{Block, Extent};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RasterCalcError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Resource unavailable while {context}: {reason}")]
    ResourceUnavailable { context: String, reason: String },

    #[error("Block {block} lies outside raster extent {extent}")]
    OutOfRangeBlock { block: Block, extent: Extent },
}

impl RasterCalcError {
    pub fn invalid(message: impl Into<String>) -> Self {
        RasterCalcError::InvalidInput(message.into())
    }

    /// Wrap a storage-level failure with what was being attempted.
    pub fn unavailable(context: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        RasterCalcError::ResourceUnavailable {
            context: context.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RasterCalcError>;
