use glam::{UVec3, Vec3};

use crate::error::VolumeMetaError;
use crate::util::extent::{IndexToSubscript, ToSubscript};
use crate::volume::{BlockAddress, BlockTileKey, BlockTileResolution, BlockedVolumeMeta};

/// Channels are packed into 8 bits of a `BlockId`.
pub const MAX_CHANNELS: u32 = 1 << 8;

/// Resolves world space positions to blocks of a multi-resolution volume.
pub trait BlockTileSource {
    /// All resolutions of this source, from the coarsest to the finest.
    fn resolutions(&self) -> Vec<BlockTileResolution>;

    /// The finest resolution of this source.
    fn maximum_resolution(&self) -> BlockTileResolution;

    /// The world space edge lengths of a block at the given resolution, or `None` if the
    /// resolution is not part of this source.
    fn block_size(&self, resolution: BlockTileResolution) -> Option<Vec3>;

    /// The key of the block containing `location` at the given resolution, or `None` if the
    /// location lies outside the volume.
    fn block_key_at(&self, location: Vec3, resolution: BlockTileResolution)
        -> Option<BlockTileKey>;

    /// Reconstructs the key of an address handed out by this source.
    fn key_for_address(&self, address: &BlockAddress) -> Option<BlockTileKey>;
}

/// A `BlockTileSource` over a regular octree-like subdivision described by a `BlockedVolumeMeta`.
#[derive(Clone, Debug)]
pub struct OctreeBlockTileSource {
    meta: BlockedVolumeMeta,
    channel: u32,
}

impl OctreeBlockTileSource {
    pub fn new(meta: BlockedVolumeMeta) -> Result<Self, VolumeMetaError> {
        Self::with_channel(meta, 0)
    }

    pub fn with_channel(meta: BlockedVolumeMeta, channel: u32) -> Result<Self, VolumeMetaError> {
        if channel >= MAX_CHANNELS {
            return Err(VolumeMetaError::InvalidChannel(channel));
        }
        meta.validate()?;
        Ok(Self { meta, channel })
    }

    pub fn meta(&self) -> &BlockedVolumeMeta {
        &self.meta
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    fn key_for_subscript(
        &self,
        subscript: UVec3,
        resolution: BlockTileResolution,
        block_size: Vec3,
    ) -> BlockTileKey {
        let centroid = self.meta.origin + (subscript.as_vec3() + Vec3::splat(0.5)) * block_size;
        BlockTileKey::new(
            BlockAddress::new(subscript, resolution, self.channel),
            centroid,
        )
    }

    /// Enumerates all blocks of a resolution level in linear index order.
    pub fn block_keys(&self, resolution: BlockTileResolution) -> Vec<BlockTileKey> {
        let level = resolution.level as usize;
        match (
            self.meta.block_size(level),
            self.meta.bricks_per_dimension(level),
            self.meta
                .number_of_bricks(level)
                .and_then(|n| u32::try_from(n).ok()),
        ) {
            (Some(block_size), Some(blocks), Some(num_blocks)) => (0..num_blocks)
                .map(|i| {
                    self.key_for_subscript(blocks.index_to_subscript(i), resolution, block_size)
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Selects the coarsest resolution with voxels no larger than `spacing`.
    pub fn resolution_for_spacing(&self, spacing: f32) -> BlockTileResolution {
        self.meta.resolution_for_spacing(spacing)
    }
}

impl BlockTileSource for OctreeBlockTileSource {
    fn resolutions(&self) -> Vec<BlockTileResolution> {
        self.meta.resolution_levels().collect()
    }

    fn maximum_resolution(&self) -> BlockTileResolution {
        self.meta.finest_resolution()
    }

    fn block_size(&self, resolution: BlockTileResolution) -> Option<Vec3> {
        self.meta.block_size(resolution.level as usize)
    }

    fn block_key_at(
        &self,
        location: Vec3,
        resolution: BlockTileResolution,
    ) -> Option<BlockTileKey> {
        let level = resolution.level as usize;
        let block_size = self.meta.block_size(level)?;
        let blocks = self.meta.bricks_per_dimension(level)?;
        if !self.meta.contains(location) {
            return None;
        }
        let subscript = ((location - self.meta.origin) / block_size).to_subscript(blocks);
        Some(self.key_for_subscript(subscript, resolution, block_size))
    }

    fn key_for_address(&self, address: &BlockAddress) -> Option<BlockTileKey> {
        if address.channel != self.channel {
            return None;
        }
        let resolution = address.resolution();
        let level = resolution.level as usize;
        let block_size = self.meta.block_size(level)?;
        let blocks = self.meta.bricks_per_dimension(level)?;
        let subscript = address.subscript();
        if subscript.cmpge(blocks).any() {
            return None;
        }
        Some(self.key_for_subscript(subscript, resolution, block_size))
    }
}
