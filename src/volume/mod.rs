pub mod block;
pub mod data_source;
pub mod meta;
pub mod source;

pub use block::{Block, BlockAddress, BlockId, BlockTileKey, BlockTileResolution};
pub use data_source::{BlockDataSource, QueuedBlockDataSource};
pub use meta::{BlockedVolumeMeta, ResolutionMeta};
pub use source::{BlockTileSource, OctreeBlockTileSource};
