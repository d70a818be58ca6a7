use glam::Vec3;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::error::CacheError;
use crate::volume::{Block, BlockAddress, BlockId, BlockTileKey};

#[derive(Clone, Debug)]
struct CacheEntry {
    key: BlockTileKey,
    block: Block,

    /// The frame this entry has been written to the cache.
    last_written: u32,

    /// The last frame this entry has been desired for display.
    last_used: u32,
}

/// Holds the blocks that are resident in memory.
///
/// When the cache is full, inserting a block evicts the entry farthest away from the current focus
/// point that is neither desired in the current frame nor younger than `time_to_live` frames.
#[derive(Clone, Debug)]
pub struct BlockCache {
    capacity: usize,

    // Each cache entry can't be evicted for `time_to_live` frames after it has been written.
    time_to_live: u32,

    entries: HashMap<BlockId, CacheEntry>,
    desired: HashSet<BlockId>,
    focus: Vec3,
    frame: u32,
}

impl BlockCache {
    pub fn new(capacity: usize, time_to_live: u32) -> Self {
        Self {
            capacity,
            time_to_live,
            entries: HashMap::with_capacity(capacity),
            desired: HashSet::new(),
            focus: Vec3::ZERO,
            frame: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn time_to_live(&self) -> u32 {
        self.time_to_live
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn focus(&self) -> Vec3 {
        self.focus
    }

    pub fn contains(&self, address: &BlockAddress) -> bool {
        self.entries.contains_key(&address.id())
    }

    pub fn get(&self, address: &BlockAddress) -> Option<&Block> {
        self.entries.get(&address.id()).map(|e| &e.block)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BlockTileKey, &Block)> {
        self.entries.values().map(|e| (&e.key, &e.block))
    }

    /// Records which blocks are wanted for display at `frame`.
    /// Desired blocks are never evicted during the same frame.
    pub fn mark_desired(&mut self, keys: &[BlockTileKey], focus: Vec3, frame: u32) {
        self.focus = focus;
        self.frame = frame;
        self.desired = keys.iter().map(|k| k.id()).collect();
        for id in self.desired.iter() {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.last_used = frame;
            }
        }
    }

    pub fn is_desired(&self, address: &BlockAddress) -> bool {
        self.desired.contains(&address.id())
    }

    /// The keys in `keys` that are not resident, in the given order.
    pub fn missing(&self, keys: &[BlockTileKey]) -> Vec<BlockTileKey> {
        keys.iter()
            .filter(|k| !self.entries.contains_key(&k.id()))
            .copied()
            .collect()
    }

    fn is_evictable(&self, id: &BlockId, entry: &CacheEntry, frame: u32) -> bool {
        !self.desired.contains(id)
            && (entry.last_written > frame || (frame - entry.last_written) > self.time_to_live)
    }

    /// Farthest from the focus first, then least recently used, then lowest id.
    fn eviction_candidate(&self, frame: u32) -> Option<BlockId> {
        self.entries
            .iter()
            .filter(|(id, entry)| self.is_evictable(id, entry, frame))
            .map(|(id, entry)| (*id, entry.key.distance_squared(self.focus), entry.last_used))
            .max_by(|(id1, d1, used1), (id2, d2, used2)| {
                d1.partial_cmp(d2)
                    .unwrap_or(Ordering::Equal)
                    .then(used2.cmp(used1))
                    .then(id2.cmp(id1))
            })
            .map(|(id, _, _)| id)
    }

    /// Writes a block to the cache.
    /// Returns the address of the block that had to be evicted to make room for it, if any.
    pub fn insert(
        &mut self,
        key: BlockTileKey,
        block: Block,
        frame: u32,
    ) -> Result<Option<BlockAddress>, CacheError> {
        let id = key.id();
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.block = block;
            entry.last_written = frame;
            entry.last_used = frame;
            return Ok(None);
        }

        let evicted = if self.is_full() {
            let victim = self
                .eviction_candidate(frame)
                .ok_or(CacheError::Full(*key.address()))?;
            let evicted = self.entries.remove(&victim).map(|e| *e.key.address());
            log::debug!("evicted {:?} to make room for {:?}", evicted, key.address());
            evicted
        } else {
            None
        };

        self.entries.insert(
            id,
            CacheEntry {
                key,
                block,
                last_written: frame,
                last_used: frame,
            },
        );
        Ok(evicted)
    }

    pub fn remove(&mut self, address: &BlockAddress) -> Option<Block> {
        self.entries.remove(&address.id()).map(|e| e.block)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.desired.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::BlockTileResolution;
    use glam::UVec3;

    fn key(x: u32) -> BlockTileKey {
        BlockTileKey::new(
            BlockAddress::new(UVec3::new(x, 0, 0), BlockTileResolution::new(0), 0),
            Vec3::new(x as f32 + 0.5, 0.5, 0.5),
        )
    }

    fn block(value: u8) -> Block {
        Block::from_data(vec![value; 4])
    }

    #[test]
    fn insert_and_get() {
        let mut cache = BlockCache::new(2, 0);
        assert_eq!(cache.insert(key(0), block(1), 0), Ok(None));
        assert!(cache.contains(key(0).address()));
        assert_eq!(cache.get(key(0).address()).unwrap().max, 1);
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_full());
    }

    #[test]
    fn reinserting_refreshes_entry() {
        let mut cache = BlockCache::new(1, 0);
        cache.insert(key(0), block(1), 0).unwrap();
        assert_eq!(cache.insert(key(0), block(2), 1), Ok(None));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(key(0).address()).unwrap().max, 2);
    }

    #[test]
    fn evicts_farthest_from_focus() {
        let mut cache = BlockCache::new(3, 0);
        for x in 0..3 {
            cache.insert(key(x), block(x as u8), 0).unwrap();
        }
        cache.mark_desired(&[key(3)], Vec3::new(3.5, 0.5, 0.5), 1);
        let evicted = cache.insert(key(3), block(3), 1).unwrap();
        assert_eq!(evicted, Some(*key(0).address()));
        assert!(!cache.contains(key(0).address()));
        assert!(cache.contains(key(3).address()));
    }

    #[test]
    fn desired_blocks_are_not_evicted() {
        let mut cache = BlockCache::new(2, 0);
        cache.insert(key(0), block(0), 0).unwrap();
        cache.insert(key(1), block(1), 0).unwrap();
        // key(0) is farthest away but desired
        cache.mark_desired(&[key(0), key(5)], Vec3::new(5.5, 0.5, 0.5), 1);
        let evicted = cache.insert(key(5), block(5), 1).unwrap();
        assert_eq!(evicted, Some(*key(1).address()));
    }

    #[test]
    fn young_entries_are_not_evicted() {
        let mut cache = BlockCache::new(1, 10);
        cache.insert(key(0), block(0), 0).unwrap();
        cache.mark_desired(&[key(1)], Vec3::ZERO, 5);
        assert_eq!(
            cache.insert(key(1), block(1), 5),
            Err(CacheError::Full(*key(1).address()))
        );
        cache.mark_desired(&[key(1)], Vec3::ZERO, 11);
        assert_eq!(cache.insert(key(1), block(1), 11), Ok(Some(*key(0).address())));
    }

    #[test]
    fn equidistant_entries_evict_least_recently_used() {
        let mut cache = BlockCache::new(2, 0);
        cache.insert(key(0), block(0), 0).unwrap();
        cache.insert(key(2), block(2), 0).unwrap();
        cache.mark_desired(&[key(2)], Vec3::new(1.5, 0.5, 0.5), 1);
        cache.mark_desired(&[], Vec3::new(1.5, 0.5, 0.5), 2);
        // both are one unit away from the focus, key(0) has not been used since frame 0
        assert_eq!(cache.insert(key(1), block(1), 2), Ok(Some(*key(0).address())));
    }

    #[test]
    fn missing_keeps_order() {
        let mut cache = BlockCache::new(4, 0);
        cache.insert(key(1), block(1), 0).unwrap();
        assert_eq!(cache.missing(&[key(2), key(1), key(0)]), vec![key(2), key(0)]);
    }

    #[test]
    fn remove_and_clear() {
        let mut cache = BlockCache::new(4, 0);
        cache.insert(key(1), block(1), 0).unwrap();
        cache.insert(key(2), block(2), 0).unwrap();
        assert!(cache.remove(key(1).address()).is_some());
        assert!(cache.remove(key(1).address()).is_none());
        cache.clear();
        assert!(cache.is_empty());
    }
}
