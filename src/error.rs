use thiserror::Error;

use crate::volume::BlockAddress;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VolumeMetaError {
    #[error("volume has no resolution levels")]
    NoResolutions,

    #[error("volume has {0} resolution levels, at most 256 are supported")]
    TooManyResolutions(usize),

    #[error("brick size must be non-zero in every dimension, got {0:?}")]
    InvalidBrickSize([u32; 3]),

    #[error("extent must be positive and finite in every dimension, got {0:?}")]
    InvalidExtent([f32; 3]),

    #[error("resolution level {level} has an invalid volume size {size:?}")]
    InvalidVolumeSize { level: usize, size: [u32; 3] },

    #[error(
        "resolution level {level} has {blocks:?} blocks per dimension, \
         at most 65536 per dimension and 2^32 - 1 in total are supported"
    )]
    TooManyBlocks { level: usize, blocks: [u32; 3] },

    #[error("volume size at resolution level {level} does not fit in 32 bits")]
    VolumeSizeOverflow { level: usize },

    #[error("channel {0} is out of range, at most 256 channels are supported")]
    InvalidChannel(u32),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheError {
    #[error("cache is full: no entry can be evicted to make room for {0:?}")]
    Full(BlockAddress),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoolError {
    #[error("pool size must be at least 1")]
    EmptyPool,

    #[error("item is already part of the pool")]
    AlreadyPooled,

    #[error("item is not part of the pool")]
    NotPooled,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid setting \"{name}\": {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("invalid volume meta data: {0}")]
    Volume(#[from] VolumeMetaError),
}
