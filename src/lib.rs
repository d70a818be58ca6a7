pub mod cache;
pub mod chooser;
pub mod error;
pub mod input;
pub mod neuron;
pub mod settings;
pub mod streamer;
pub mod util;
pub mod vbo_pool;
pub mod volume;

pub use cache::BlockCache;
pub use chooser::{BlockChooser, NearestFinestBlockChooser};
pub use error::{CacheError, PoolError, SettingsError, VolumeMetaError};
pub use input::Input;
pub use neuron::{NeuronGeometry, NeuronVertex};
pub use settings::StreamingSettings;
pub use streamer::{BlockCacheUpdate, BlockStreamer};
pub use vbo_pool::{PoolItem, Vbo, VboId, VboPool};
pub use volume::{
    Block, BlockAddress, BlockDataSource, BlockId, BlockTileKey, BlockTileResolution,
    BlockTileSource, BlockedVolumeMeta, OctreeBlockTileSource, QueuedBlockDataSource,
};
