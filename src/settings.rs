use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::SettingsError;
use crate::volume::BlockedVolumeMeta;

fn default_pool_size() -> usize {
    30
}

fn default_cache_capacity() -> usize {
    64
}

fn default_block_request_limit() -> usize {
    32
}

fn default_block_transfer_limit() -> usize {
    32
}

fn default_cache_time_to_live() -> u32 {
    300
}

fn one() -> f32 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct StreamingSettings {
    /// The number of vertex buffers neuron geometry is distributed over.
    /// More buffers mean more draw calls per frame but fewer neurons to repack per edit.
    #[serde(rename = "poolSize")]
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// The maximum number of blocks resident in memory.
    #[serde(rename = "cacheCapacity")]
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// How many blocks can be requested per frame.
    #[serde(rename = "blockRequestLimit")]
    #[serde(default = "default_block_request_limit")]
    pub block_request_limit: usize,

    /// How many blocks can be written to the cache per frame.
    #[serde(rename = "blockTransferLimit")]
    #[serde(default = "default_block_transfer_limit")]
    pub block_transfer_limit: usize,

    /// The number of frames a block can't be evicted after it has been written to the cache.
    #[serde(rename = "cacheTimeToLive")]
    #[serde(default = "default_cache_time_to_live")]
    pub cache_time_to_live: u32,

    /// Added to every neuron radius, in micrometers.
    #[serde(rename = "radiusOffset")]
    #[serde(default)]
    pub radius_offset: f32,

    /// Every neuron radius is multiplied by this.
    #[serde(rename = "radiusScale")]
    #[serde(default = "one")]
    pub radius_scale: f32,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            cache_capacity: default_cache_capacity(),
            block_request_limit: default_block_request_limit(),
            block_transfer_limit: default_block_transfer_limit(),
            cache_time_to_live: default_cache_time_to_live(),
            radius_offset: 0.0,
            radius_scale: one(),
        }
    }
}

impl StreamingSettings {
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_reader(reader)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.pool_size == 0 {
            return Err(SettingsError::Invalid {
                name: "poolSize",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.cache_capacity == 0 {
            return Err(SettingsError::Invalid {
                name: "cacheCapacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.radius_offset.is_finite() {
            return Err(SettingsError::Invalid {
                name: "radiusOffset",
                reason: format!("must be finite, got {}", self.radius_offset),
            });
        }
        if !self.radius_scale.is_finite() || self.radius_scale <= 0.0 {
            return Err(SettingsError::Invalid {
                name: "radiusScale",
                reason: format!("must be positive and finite, got {}", self.radius_scale),
            });
        }
        Ok(())
    }
}

pub fn volume_meta_from_json_str(json: &str) -> Result<BlockedVolumeMeta, SettingsError> {
    let meta: BlockedVolumeMeta = serde_json::from_str(json)?;
    meta.validate()?;
    Ok(meta)
}

pub fn volume_meta_from_path<P: AsRef<Path>>(path: P) -> Result<BlockedVolumeMeta, SettingsError> {
    let meta: BlockedVolumeMeta = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    meta.validate()?;
    Ok(meta)
}
