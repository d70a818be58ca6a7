use std::cmp::min;
use std::collections::VecDeque;
use std::fmt::Debug;

use crate::volume::{Block, BlockAddress, BlockedVolumeMeta};

/// Acquires blocks for a volume.
/// Requests are fire-and-forget: a source answers them at its own pace by making blocks
/// available to `poll_blocks`.
pub trait BlockDataSource: Debug {
    fn meta(&self) -> &BlockedVolumeMeta;

    fn enqueue_block(&mut self, block: (BlockAddress, Block));

    fn request_blocks(&mut self, block_addresses: Vec<BlockAddress>);

    fn poll_blocks(&mut self, limit: usize) -> Vec<(BlockAddress, Block)>;
}

/// A `BlockDataSource` that queues requests and responses in memory.
/// It is agnostic of the way blocks are actually acquired: a loader drains the requests via
/// `take_requests` and hands back blocks via `enqueue_block`.
#[derive(Debug)]
pub struct QueuedBlockDataSource {
    volume_meta: BlockedVolumeMeta,
    request_queue: VecDeque<BlockAddress>,
    block_queue: VecDeque<(BlockAddress, Block)>,
}

impl QueuedBlockDataSource {
    pub fn new(volume_meta: BlockedVolumeMeta) -> Self {
        Self {
            volume_meta,
            request_queue: VecDeque::new(),
            block_queue: VecDeque::new(),
        }
    }

    /// Drains all requests issued since the last call, oldest first.
    pub fn take_requests(&mut self) -> Vec<BlockAddress> {
        self.request_queue.drain(..).collect()
    }

    pub fn num_pending_requests(&self) -> usize {
        self.request_queue.len()
    }

    pub fn num_queued_blocks(&self) -> usize {
        self.block_queue.len()
    }
}

impl BlockDataSource for QueuedBlockDataSource {
    fn meta(&self) -> &BlockedVolumeMeta {
        &self.volume_meta
    }

    fn enqueue_block(&mut self, block: (BlockAddress, Block)) {
        self.block_queue.push_back(block);
    }

    fn request_blocks(&mut self, block_addresses: Vec<BlockAddress>) {
        self.request_queue.extend(block_addresses);
    }

    fn poll_blocks(&mut self, limit: usize) -> Vec<(BlockAddress, Block)> {
        let blocks_in_queue = self.block_queue.len();
        self.block_queue
            .drain(..min(limit, blocks_in_queue))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::BlockTileResolution;
    use glam::{UVec3, Vec3};

    fn data_source() -> QueuedBlockDataSource {
        let meta =
            BlockedVolumeMeta::octree(UVec3::splat(8), Vec3::ZERO, Vec3::splat(8.0), 2).unwrap();
        QueuedBlockDataSource::new(meta)
    }

    fn address(x: u32) -> BlockAddress {
        BlockAddress::new(UVec3::new(x, 0, 0), BlockTileResolution::new(1), 0)
    }

    #[test]
    fn requests_are_drained_in_order() {
        let mut source = data_source();
        source.request_blocks(vec![address(0), address(1)]);
        assert_eq!(source.num_pending_requests(), 2);
        assert_eq!(source.take_requests(), vec![address(0), address(1)]);
        assert_eq!(source.num_pending_requests(), 0);
    }

    #[test]
    fn poll_respects_limit() {
        let mut source = data_source();
        for x in 0..3 {
            source.enqueue_block((address(x), Block::from_data(vec![x as u8])));
        }
        let polled = source.poll_blocks(2);
        assert_eq!(polled.len(), 2);
        assert_eq!(polled[0].0, address(0));
        assert_eq!(source.num_queued_blocks(), 1);
        assert_eq!(source.poll_blocks(10).len(), 1);
        assert!(source.poll_blocks(10).is_empty());
    }
}
