use glam::{UVec3, Vec3};
use modular_bitfield::prelude::*;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A level of detail in a multi-resolution volume.
/// Level 0 is the coarsest level, higher levels are finer and have smaller blocks.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
)]
pub struct BlockTileResolution {
    pub level: u32,
}

impl BlockTileResolution {
    pub fn new(level: u32) -> Self {
        Self { level }
    }

    pub fn is_finer_than(&self, other: &Self) -> bool {
        self.level > other.level
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct BlockAddress {
    /// x,y,z
    pub index: [u32; 3],
    pub level: u32,
    pub channel: u32,
}

impl BlockAddress {
    pub fn new(index: UVec3, resolution: BlockTileResolution, channel: u32) -> Self {
        Self {
            index: index.to_array(),
            level: resolution.level,
            channel,
        }
    }

    pub fn resolution(&self) -> BlockTileResolution {
        BlockTileResolution::new(self.level)
    }

    pub fn subscript(&self) -> UVec3 {
        UVec3::from_array(self.index)
    }

    pub fn id(&self) -> BlockId {
        BlockId::from(*self)
    }
}

#[bitfield]
#[derive(Copy, Clone)]
struct PackedBlockAddress {
    x: B16,
    y: B16,
    z: B16,
    level: B8,
    channel: B8,
}

/// A `BlockAddress` packed into 64 bits.
/// Indices are truncated to 16 bits, levels and channels to 8 bits. A validated
/// `BlockedVolumeMeta` never produces addresses exceeding these ranges.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct BlockId(u64);

impl BlockId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<BlockAddress> for BlockId {
    fn from(address: BlockAddress) -> Self {
        let packed = PackedBlockAddress::new()
            .with_x(address.index[0] as u16)
            .with_y(address.index[1] as u16)
            .with_z(address.index[2] as u16)
            .with_level(address.level as u8)
            .with_channel(address.channel as u8);
        Self(u64::from_le_bytes(packed.into_bytes()))
    }
}

impl From<BlockId> for BlockAddress {
    fn from(id: BlockId) -> Self {
        let packed = PackedBlockAddress::from_bytes(id.0.to_le_bytes());
        Self {
            index: [packed.x() as u32, packed.y() as u32, packed.z() as u32],
            level: packed.level() as u32,
            channel: packed.channel() as u32,
        }
    }
}

impl From<u64> for BlockId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Identifies a block and where its center lies in world space.
/// Two keys are equal if their addresses are equal.
#[derive(Copy, Clone, Debug, Deserialize, Serialize)]
pub struct BlockTileKey {
    address: BlockAddress,
    centroid: Vec3,
}

impl BlockTileKey {
    pub fn new(address: BlockAddress, centroid: Vec3) -> Self {
        Self { address, centroid }
    }

    pub fn address(&self) -> &BlockAddress {
        &self.address
    }

    pub fn id(&self) -> BlockId {
        self.address.id()
    }

    pub fn resolution(&self) -> BlockTileResolution {
        self.address.resolution()
    }

    pub fn centroid(&self) -> Vec3 {
        self.centroid
    }

    pub fn distance_squared(&self, point: Vec3) -> f32 {
        let d = self.centroid - point;
        d.dot(d)
    }
}

impl PartialEq for BlockTileKey {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for BlockTileKey {}

impl Hash for BlockTileKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

#[readonly::make]
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Block {
    pub data: Vec<u8>,
    pub min: u8,
    pub max: u8,
}

impl Block {
    pub fn new(data: Vec<u8>, min: u8, max: u8) -> Self {
        Self { data, min, max }
    }

    /// Creates a block and computes its value range from `data`.
    pub fn from_data(data: Vec<u8>) -> Self {
        let min = data.iter().copied().min().unwrap_or(0);
        let max = data.iter().copied().max().unwrap_or(0);
        Self { data, min, max }
    }

    /// A block that is known to contain nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}
