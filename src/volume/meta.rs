use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::VolumeMetaError;
use crate::util::extent::{box_volume, div_ceil};
use crate::volume::BlockTileResolution;

/// Block indices are packed into 16 bits per dimension.
pub const MAX_BLOCKS_PER_DIMENSION: u32 = 1 << 16;

/// Block indices within a level are linearized into 32 bits.
pub const MAX_BLOCKS_PER_LEVEL: u64 = u32::MAX as u64;

/// Resolution levels are packed into 8 bits.
pub const MAX_RESOLUTIONS: usize = 1 << 8;

#[readonly::make]
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ResolutionMeta {
    /// The size of the volume in voxels at this resolution.
    /// It is not necessarily a multiple of `BlockedVolumeMeta::brick_size`, the last block along
    /// each axis may be partially outside the volume.
    #[serde(rename = "volumeSize")]
    pub volume_size: UVec3,
}

impl ResolutionMeta {
    pub fn new(volume_size: UVec3) -> Self {
        Self { volume_size }
    }
}

#[readonly::make]
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct BlockedVolumeMeta {
    /// The size of a block in voxels. This is constant across all resolutions of the volume.
    #[serde(rename = "brickSize")]
    pub brick_size: UVec3,

    /// The world space position of the volume's minimum corner.
    #[serde(default)]
    pub origin: Vec3,

    /// The spatial extent of the volume in world space.
    pub extent: Vec3,

    /// The resolutions ordered from the coarsest (level 0) to the finest.
    pub resolutions: Vec<ResolutionMeta>,
}

impl BlockedVolumeMeta {
    pub fn new(
        brick_size: UVec3,
        origin: Vec3,
        extent: Vec3,
        resolutions: Vec<ResolutionMeta>,
    ) -> Result<Self, VolumeMetaError> {
        let meta = Self {
            brick_size,
            origin,
            extent,
            resolutions,
        };
        meta.validate()?;
        Ok(meta)
    }

    /// Creates an octree of `num_levels` levels over `extent` where each level doubles the number
    /// of voxels along every axis.
    pub fn octree(
        brick_size: UVec3,
        origin: Vec3,
        extent: Vec3,
        num_levels: u32,
    ) -> Result<Self, VolumeMetaError> {
        if num_levels as usize > MAX_RESOLUTIONS {
            return Err(VolumeMetaError::TooManyResolutions(num_levels as usize));
        }
        let resolutions = (0..num_levels)
            .map(|level| {
                1u32.checked_shl(level)
                    .and_then(|scale| {
                        Some(UVec3::new(
                            brick_size.x.checked_mul(scale)?,
                            brick_size.y.checked_mul(scale)?,
                            brick_size.z.checked_mul(scale)?,
                        ))
                    })
                    .map(ResolutionMeta::new)
                    .ok_or(VolumeMetaError::VolumeSizeOverflow {
                        level: level as usize,
                    })
            })
            .collect::<Result<Vec<ResolutionMeta>, VolumeMetaError>>()?;
        Self::new(brick_size, origin, extent, resolutions)
    }

    pub fn validate(&self) -> Result<(), VolumeMetaError> {
        if self.resolutions.is_empty() {
            return Err(VolumeMetaError::NoResolutions);
        }
        if self.resolutions.len() > MAX_RESOLUTIONS {
            return Err(VolumeMetaError::TooManyResolutions(self.resolutions.len()));
        }
        if self.brick_size.cmpeq(UVec3::ZERO).any() {
            return Err(VolumeMetaError::InvalidBrickSize(self.brick_size.to_array()));
        }
        if !self.extent.is_finite()
            || self.extent.cmple(Vec3::ZERO).any()
            || !self.origin.is_finite()
        {
            return Err(VolumeMetaError::InvalidExtent(self.extent.to_array()));
        }
        for (level, r) in self.resolutions.iter().enumerate() {
            if r.volume_size.cmpeq(UVec3::ZERO).any() {
                return Err(VolumeMetaError::InvalidVolumeSize {
                    level,
                    size: r.volume_size.to_array(),
                });
            }
            let blocks = div_ceil(r.volume_size, self.brick_size);
            if blocks.cmpgt(UVec3::splat(MAX_BLOCKS_PER_DIMENSION)).any()
                || box_volume(&blocks) > MAX_BLOCKS_PER_LEVEL
            {
                return Err(VolumeMetaError::TooManyBlocks {
                    level,
                    blocks: blocks.to_array(),
                });
            }
        }
        Ok(())
    }

    pub fn num_resolutions(&self) -> usize {
        self.resolutions.len()
    }

    pub fn finest_resolution(&self) -> BlockTileResolution {
        BlockTileResolution::new(self.resolutions.len().saturating_sub(1) as u32)
    }

    pub fn coarsest_resolution(&self) -> BlockTileResolution {
        BlockTileResolution::new(0)
    }

    pub fn resolution_levels(&self) -> impl Iterator<Item = BlockTileResolution> {
        (0..self.resolutions.len() as u32).map(BlockTileResolution::new)
    }

    /// The world space size of a voxel at the given level.
    pub fn spacing(&self, level: usize) -> Option<Vec3> {
        self.resolutions
            .get(level)
            .map(|r| self.extent / r.volume_size.as_vec3())
    }

    /// The world space size of a block at the given level.
    pub fn block_size(&self, level: usize) -> Option<Vec3> {
        self.spacing(level).map(|s| s * self.brick_size.as_vec3())
    }

    pub fn bricks_per_dimension(&self, level: usize) -> Option<UVec3> {
        self.resolutions
            .get(level)
            .map(|r| div_ceil(r.volume_size, self.brick_size))
    }

    pub fn number_of_bricks(&self, level: usize) -> Option<u64> {
        self.bricks_per_dimension(level).map(|b| box_volume(&b))
    }

    /// Returns true if `location` lies within `[origin, origin + extent)`.
    pub fn contains(&self, location: Vec3) -> bool {
        location.is_finite()
            && location.cmpge(self.origin).all()
            && location.cmplt(self.origin + self.extent).all()
    }

    /// Selects the coarsest resolution whose voxels are at most `spacing` large along every axis.
    /// Falls back to the finest resolution if no level is fine enough.
    pub fn resolution_for_spacing(&self, spacing: f32) -> BlockTileResolution {
        self.resolution_levels()
            .find(|r| {
                self.spacing(r.level as usize)
                    .map(|s| s.max_element() <= spacing)
                    .unwrap_or(false)
            })
            .unwrap_or_else(|| self.finest_resolution())
    }
}
