use glam::Vec3;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::volume::{BlockTileKey, BlockTileSource};

/// Decides which blocks should be displayed for a focus point.
pub trait BlockChooser {
    /// Returns the blocks to display for `focus`, most important first.
    fn choose_blocks(
        &self,
        source: &dyn BlockTileSource,
        focus: Vec3,
        previous_focus: Option<Vec3>,
    ) -> Vec<BlockTileKey>;
}

/// Chooses up to eight blocks of the finest resolution closest to the focus point.
///
/// The candidates are the blocks containing the 27 points `focus + (dx, dy, dz)` where each offset
/// is one of `{0, -size, +size}` along its axis. They are ranked by the squared distance of their
/// centroid to the focus point. Ties keep enumeration order.
#[derive(Copy, Clone, Debug, Default)]
pub struct NearestFinestBlockChooser;

impl NearestFinestBlockChooser {
    pub const MAX_BLOCKS: usize = 8;

    pub fn new() -> Self {
        Self
    }

    fn candidate_offsets(block_size: Vec3) -> impl Iterator<Item = Vec3> {
        let dxa = [0., -block_size.x, block_size.x];
        let dya = [0., -block_size.y, block_size.y];
        let dza = [0., -block_size.z, block_size.z];
        dxa.into_iter().flat_map(move |dx| {
            dya.into_iter()
                .flat_map(move |dy| dza.into_iter().map(move |dz| Vec3::new(dx, dy, dz)))
        })
    }
}

impl BlockChooser for NearestFinestBlockChooser {
    fn choose_blocks(
        &self,
        source: &dyn BlockTileSource,
        focus: Vec3,
        _previous_focus: Option<Vec3>,
    ) -> Vec<BlockTileKey> {
        let resolution = source.maximum_resolution();
        let block_size = match source.block_size(resolution) {
            Some(block_size) => block_size,
            None => {
                log::warn!("source has no block size for its maximum resolution {:?}", resolution);
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut candidates: Vec<(f32, BlockTileKey)> = Vec::with_capacity(27);
        for offset in Self::candidate_offsets(block_size) {
            let location = focus + offset;
            if let Some(key) = source.block_key_at(location, resolution) {
                if seen.insert(*key.address()) {
                    log::debug!("tile location = {}, tile centroid = {}", location, key.centroid());
                    candidates.push((key.distance_squared(focus), key));
                }
            }
        }

        // `sort_by` is stable, so equidistant blocks keep their enumeration order
        candidates.sort_by(|(d1, _), (d2, _)| d1.partial_cmp(d2).unwrap_or(Ordering::Equal));
        candidates
            .into_iter()
            .take(Self::MAX_BLOCKS)
            .map(|(_, key)| key)
            .collect()
    }
}
