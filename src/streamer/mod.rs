use glam::Vec3;
use instant::Instant;
use std::cmp::min;
use std::collections::HashSet;

use crate::cache::BlockCache;
use crate::chooser::BlockChooser;
use crate::input::Input;
use crate::settings::StreamingSettings;
use crate::util::vec_hash_map::VecHashMap;
use crate::volume::{Block, BlockAddress, BlockDataSource, BlockId, BlockTileKey, BlockTileSource};

/// The changes one call to `BlockStreamer::update` made to the set of resident blocks.
/// Mapped and unmapped blocks are grouped by their resolution level.
#[derive(Clone, Debug, Default)]
pub struct BlockCacheUpdate {
    requested: Vec<BlockAddress>,
    mapped: VecHashMap<u32, BlockAddress>,
    mapped_empty: Vec<BlockAddress>,
    unmapped: VecHashMap<u32, BlockAddress>,
    failed: Vec<BlockAddress>,
}

impl BlockCacheUpdate {
    pub fn is_empty(&self) -> bool {
        self.requested.is_empty()
            && self.mapped.is_empty()
            && self.mapped_empty.is_empty()
            && self.unmapped.is_empty()
            && self.failed.is_empty()
    }

    fn add_requested(&mut self, address: BlockAddress) {
        self.requested.push(address);
    }

    fn add_mapped(&mut self, address: BlockAddress) {
        self.mapped.insert(address.level, address);
    }

    fn add_mapped_empty(&mut self, address: BlockAddress) {
        self.mapped_empty.push(address);
    }

    fn add_unmapped(&mut self, address: BlockAddress) {
        self.unmapped.insert(address.level, address);
    }

    fn add_failed(&mut self, address: BlockAddress) {
        self.failed.push(address);
    }

    /// Blocks requested from the data source during this update.
    pub fn requested(&self) -> &Vec<BlockAddress> {
        &self.requested
    }

    /// Blocks written to the cache during this update.
    pub fn mapped(&self) -> &VecHashMap<u32, BlockAddress> {
        &self.mapped
    }

    /// Blocks that turned out to be empty. They are remembered but not cached.
    pub fn mapped_empty(&self) -> &Vec<BlockAddress> {
        &self.mapped_empty
    }

    /// Blocks evicted from the cache during this update.
    pub fn unmapped(&self) -> &VecHashMap<u32, BlockAddress> {
        &self.unmapped
    }

    /// Blocks that arrived but could not be written to the cache.
    /// They will be requested again if they are still desired.
    pub fn failed(&self) -> &Vec<BlockAddress> {
        &self.failed
    }
}

/// Streams the blocks around a moving focus point into a `BlockCache`.
///
/// Each frame, the chooser decides which blocks should be displayed. Blocks that are neither
/// resident nor already requested are requested from the data source, and blocks the data source
/// has made available since the last frame are written to the cache.
#[derive(Debug)]
pub struct BlockStreamer<S, D, C> {
    tile_source: S,
    data_source: D,
    chooser: C,
    cache: BlockCache,

    desired: Vec<BlockTileKey>,
    previous_focus: Option<Vec3>,

    requested_blocks: HashSet<BlockId>,
    empty_blocks: HashSet<BlockId>,

    // how many blocks can be requested per frame
    block_request_limit: usize,
    // how many blocks can be written to the cache per frame
    block_transfer_limit: usize,
}

impl<S, D, C> BlockStreamer<S, D, C>
where
    S: BlockTileSource,
    D: BlockDataSource,
    C: BlockChooser,
{
    pub fn new(tile_source: S, data_source: D, chooser: C, settings: &StreamingSettings) -> Self {
        Self {
            tile_source,
            data_source,
            chooser,
            cache: BlockCache::new(settings.cache_capacity, settings.cache_time_to_live),
            desired: Vec::new(),
            previous_focus: None,
            requested_blocks: HashSet::new(),
            empty_blocks: HashSet::new(),
            block_request_limit: settings.block_request_limit,
            block_transfer_limit: settings.block_transfer_limit,
        }
    }

    pub fn tile_source(&self) -> &S {
        &self.tile_source
    }

    pub fn data_source(&self) -> &D {
        &self.data_source
    }

    pub fn data_source_mut(&mut self) -> &mut D {
        &mut self.data_source
    }

    pub fn cache(&self) -> &BlockCache {
        &self.cache
    }

    /// The blocks chosen for the last focus point, nearest first.
    pub fn desired_blocks(&self) -> &[BlockTileKey] {
        self.desired.as_slice()
    }

    /// The desired blocks that are resident and can be displayed, nearest first.
    pub fn display_blocks(&self) -> Vec<(&BlockTileKey, &Block)> {
        self.desired
            .iter()
            .filter_map(|k| self.cache.get(k.address()).map(|b| (k, b)))
            .collect()
    }

    pub fn is_known_empty(&self, address: &BlockAddress) -> bool {
        self.empty_blocks.contains(&address.id())
    }

    pub fn num_requests_in_flight(&self) -> usize {
        self.requested_blocks.len()
    }

    pub fn update(&mut self, input: &Input) -> BlockCacheUpdate {
        let start = Instant::now();
        let frame = input.frame.number;

        self.desired = self
            .chooser
            .choose_blocks(&self.tile_source, input.focus, self.previous_focus);
        self.previous_focus = Some(input.focus);
        self.cache.mark_desired(&self.desired, input.focus, frame);

        let mut update_result = BlockCacheUpdate::default();
        self.request_missing_blocks(&mut update_result);
        self.process_new_blocks(frame, &mut update_result);

        log::debug!(
            "frame {} ({} ms after the last): {} desired, {} requested, {} mapped, {} unmapped, \
             {} failed, took {:?}",
            frame,
            input.time.delta,
            self.desired.len(),
            update_result.requested.len(),
            update_result.mapped.len(),
            update_result.unmapped.len(),
            update_result.failed.len(),
            start.elapsed()
        );

        update_result
    }

    fn request_missing_blocks(&mut self, update_result: &mut BlockCacheUpdate) {
        let mut block_addresses =
            Vec::with_capacity(min(self.desired.len(), self.block_request_limit));
        for key in self.desired.iter() {
            if block_addresses.len() >= self.block_request_limit {
                break;
            }
            let block_id = key.id();
            if !self.cache.contains(key.address())
                && !self.empty_blocks.contains(&block_id)
                && self.requested_blocks.insert(block_id)
            {
                block_addresses.push(*key.address());
            }
        }

        if !block_addresses.is_empty() {
            for address in block_addresses.iter() {
                update_result.add_requested(*address);
            }
            self.data_source.request_blocks(block_addresses);
        }
    }

    fn process_new_blocks(&mut self, frame: u32, update_result: &mut BlockCacheUpdate) {
        let blocks = self.data_source.poll_blocks(self.block_transfer_limit);

        for (address, block) in blocks {
            let block_id = address.id();
            if !self.requested_blocks.remove(&block_id) {
                log::warn!("dropping block {:?} that has not been requested", address);
                continue;
            }

            let key = match self.tile_source.key_for_address(&address) {
                Some(key) => key,
                None => {
                    log::warn!("dropping block {:?} outside of the volume", address);
                    continue;
                }
            };

            if block.is_empty() {
                self.empty_blocks.insert(block_id);
                update_result.add_mapped_empty(address);
                continue;
            }

            match self.cache.insert(key, block, frame) {
                Ok(evicted) => {
                    update_result.add_mapped(address);
                    if let Some(evicted) = evicted {
                        update_result.add_unmapped(evicted);
                    }
                }
                Err(error) => {
                    log::error!("Could not add block to cache: {}", error);
                    update_result.add_failed(address);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chooser::NearestFinestBlockChooser;
    use crate::volume::{BlockedVolumeMeta, OctreeBlockTileSource, QueuedBlockDataSource};
    use glam::UVec3;

    type Streamer =
        BlockStreamer<OctreeBlockTileSource, QueuedBlockDataSource, NearestFinestBlockChooser>;

    fn streamer(settings: &StreamingSettings) -> Streamer {
        // finest level: 4x4x4 blocks of edge length 10
        let meta =
            BlockedVolumeMeta::octree(UVec3::splat(16), Vec3::ZERO, Vec3::splat(40.0), 3).unwrap();
        BlockStreamer::new(
            OctreeBlockTileSource::new(meta.clone()).unwrap(),
            QueuedBlockDataSource::new(meta),
            NearestFinestBlockChooser::new(),
            settings,
        )
    }

    /// Answers all outstanding requests with a block filled with `value`.
    fn answer_requests(streamer: &mut Streamer, value: u8) -> usize {
        let requests = streamer.data_source_mut().take_requests();
        let n = requests.len();
        for address in requests {
            streamer
                .data_source_mut()
                .enqueue_block((address, Block::from_data(vec![value; 8])));
        }
        n
    }

    #[test]
    fn requests_desired_blocks_once() {
        let mut streamer = streamer(&StreamingSettings::default());
        let input = Input::new(Vec3::splat(19.0));

        let update = streamer.update(&input);
        assert_eq!(update.requested().len(), 8);
        assert_eq!(streamer.num_requests_in_flight(), 8);
        assert_eq!(streamer.data_source().num_pending_requests(), 8);

        // nothing has arrived yet, but nothing is requested twice either
        let update = streamer.update(&Input::from_last(&input));
        assert!(update.requested().is_empty());
        assert_eq!(streamer.data_source().num_pending_requests(), 8);
    }

    #[test]
    fn arriving_blocks_are_cached_and_displayed() {
        let mut streamer = streamer(&StreamingSettings::default());
        let input = Input::new(Vec3::splat(19.0));
        streamer.update(&input);
        assert_eq!(answer_requests(&mut streamer, 7), 8);

        let update = streamer.update(&Input::from_last(&input));
        assert_eq!(update.mapped().len(), 8);
        assert!(update.unmapped().is_empty());
        assert_eq!(streamer.cache().len(), 8);
        assert_eq!(streamer.num_requests_in_flight(), 0);

        let display = streamer.display_blocks();
        assert_eq!(display.len(), 8);
        assert_eq!(display[0].0.address().index, [1, 1, 1]);
        assert!(display.iter().all(|(_, b)| b.max == 7));
    }

    #[test]
    fn request_and_transfer_limits_are_respected() {
        let settings = StreamingSettings {
            block_request_limit: 3,
            block_transfer_limit: 2,
            ..Default::default()
        };
        let mut streamer = streamer(&settings);
        let input = Input::new(Vec3::splat(19.0));

        let update = streamer.update(&input);
        assert_eq!(update.requested().len(), 3);
        answer_requests(&mut streamer, 1);

        let input = Input::from_last(&input);
        let update = streamer.update(&input);
        assert_eq!(update.requested().len(), 3);
        assert_eq!(update.mapped().len(), 2);
        assert_eq!(streamer.data_source().num_queued_blocks(), 1);
    }

    #[test]
    fn empty_blocks_are_not_cached_or_requested_again() {
        let mut streamer = streamer(&StreamingSettings::default());
        let input = Input::new(Vec3::splat(19.0));
        streamer.update(&input);
        for address in streamer.data_source_mut().take_requests() {
            streamer
                .data_source_mut()
                .enqueue_block((address, Block::empty()));
        }

        let input = Input::from_last(&input);
        let update = streamer.update(&input);
        assert_eq!(update.mapped_empty().len(), 8);
        assert!(streamer.cache().is_empty());
        assert!(streamer.is_known_empty(streamer.desired_blocks()[0].address()));

        let update = streamer.update(&Input::from_last(&input));
        assert!(update.requested().is_empty());
        assert!(streamer.display_blocks().is_empty());
    }

    #[test]
    fn unrequested_blocks_are_dropped() {
        let mut streamer = streamer(&StreamingSettings::default());
        let address = streamer
            .tile_source()
            .block_key_at(Vec3::splat(1.0), streamer.tile_source().maximum_resolution())
            .map(|k| *k.address())
            .unwrap();
        streamer
            .data_source_mut()
            .enqueue_block((address, Block::from_data(vec![1])));

        let update = streamer.update(&Input::new(Vec3::splat(35.0)));
        assert!(update.mapped().is_empty());
        assert!(!streamer.cache().contains(&address));
    }

    #[test]
    fn moving_focus_evicts_far_blocks() {
        let settings = StreamingSettings {
            cache_capacity: 8,
            cache_time_to_live: 0,
            ..Default::default()
        };
        let mut streamer = streamer(&settings);
        let input = Input::new(Vec3::splat(11.0));
        streamer.update(&input);
        answer_requests(&mut streamer, 1);
        let input = Input::from_last(&input);
        streamer.update(&input);
        assert_eq!(streamer.cache().len(), 8);

        // move to the opposite corner of the volume
        let input = Input::from_last_with_focus(&input, Vec3::splat(29.0));
        let update = streamer.update(&input);
        let num_requested = update.requested().len();
        assert!(num_requested > 0);
        answer_requests(&mut streamer, 2);

        let update = streamer.update(&Input::from_last(&input));
        assert_eq!(update.mapped().len(), num_requested);
        assert_eq!(update.unmapped().len(), num_requested);
        assert!(update.failed().is_empty());
        assert_eq!(streamer.cache().len(), 8);
        assert_eq!(streamer.display_blocks().len(), 8);
    }

    #[test]
    fn full_cache_reports_failed_blocks() {
        let settings = StreamingSettings {
            cache_capacity: 8,
            cache_time_to_live: 1000,
            ..Default::default()
        };
        let mut streamer = streamer(&settings);
        let input = Input::new(Vec3::splat(11.0));
        streamer.update(&input);
        answer_requests(&mut streamer, 1);
        let input = Input::from_last(&input);
        streamer.update(&input);

        let input = Input::from_last_with_focus(&input, Vec3::splat(29.0));
        streamer.update(&input);
        answer_requests(&mut streamer, 2);
        let input = Input::from_last(&input);
        let update = streamer.update(&input);
        assert!(update.mapped().is_empty());
        assert!(!update.failed().is_empty());

        // failed blocks are requested again
        let update = streamer.update(&Input::from_last(&input));
        assert_eq!(update.requested().len(), 8);
    }
}
