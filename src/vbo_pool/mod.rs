use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::error::PoolError;
use crate::settings::StreamingSettings;

pub mod vbo;

pub use vbo::{PoolItem, Vbo, VboId};

pub const DEFAULT_POOL_SIZE: usize = 30;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RadiusUniforms {
    pub offset: f32,
    pub scale: f32,
}

impl Default for RadiusUniforms {
    fn default() -> Self {
        Self {
            offset: 0.0,
            scale: 1.0,
        }
    }
}

/// Distributes items over a fixed number of vertex buffers.
///
/// Editing one item requires repacking the whole buffer it lives in, while every buffer costs one
/// draw call. New items always go to the buffer with the fewest vertices, so buffers stay roughly
/// balanced. Buffers are indexed by their vertex count. Among equally full buffers, the one that
/// has least recently been filled is picked first.
#[derive(Debug)]
pub struct VboPool<T: PoolItem> {
    vbos: Vec<Vbo<T>>,
    by_vertex_count: BTreeMap<usize, VecDeque<VboId>>,
    item_vbos: HashMap<T::Id, VboId>,
    radius: RadiusUniforms,
}

impl<T: PoolItem> VboPool<T> {
    pub fn new(pool_size: usize) -> Result<Self, PoolError> {
        if pool_size == 0 {
            return Err(PoolError::EmptyPool);
        }
        let vbos: Vec<Vbo<T>> = (0..pool_size).map(|i| Vbo::new(VboId(i))).collect();
        let mut by_vertex_count = BTreeMap::new();
        by_vertex_count.insert(0, vbos.iter().map(|v| v.id()).collect::<VecDeque<VboId>>());
        Ok(Self {
            vbos,
            by_vertex_count,
            item_vbos: HashMap::new(),
            radius: RadiusUniforms::default(),
        })
    }

    pub fn from_settings(settings: &StreamingSettings) -> Result<Self, PoolError> {
        let mut pool = Self::new(settings.pool_size)?;
        pool.radius = RadiusUniforms {
            offset: settings.radius_offset,
            scale: settings.radius_scale,
        };
        Ok(pool)
    }

    pub fn pool_size(&self) -> usize {
        self.vbos.len()
    }

    /// One draw call per buffer, whether it holds anything or not.
    pub fn draw_call_count(&self) -> usize {
        self.vbos.len()
    }

    /// The number of pooled items.
    pub fn len(&self) -> usize {
        self.item_vbos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_vbos.is_empty()
    }

    pub fn contains(&self, id: T::Id) -> bool {
        self.item_vbos.contains_key(&id)
    }

    pub fn vbo_of(&self, id: T::Id) -> Option<VboId> {
        self.item_vbos.get(&id).copied()
    }

    pub fn get(&self, id: T::Id) -> Option<&T> {
        let vbo = self.item_vbos.get(&id)?;
        self.vbos[vbo.index()].items().iter().find(|i| i.id() == id)
    }

    pub fn vbo(&self, id: VboId) -> Option<&Vbo<T>> {
        self.vbos.get(id.index())
    }

    /// All buffers in the order they'd be filled.
    pub fn vbos(&self) -> impl Iterator<Item = &Vbo<T>> {
        self.by_vertex_count
            .values()
            .flat_map(|queue| queue.iter())
            .map(move |id| &self.vbos[id.index()])
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.vbos.iter().flat_map(|v| v.items().iter())
    }

    /// The total number of vertices over all buffers.
    pub fn vertex_count(&self) -> usize {
        self.vbos.iter().map(|v| v.vertex_count()).sum()
    }

    pub fn radius(&self) -> RadiusUniforms {
        self.radius
    }

    pub fn radius_offset(&self) -> f32 {
        self.radius.offset
    }

    pub fn set_radius_offset(&mut self, offset: f32) {
        self.radius.offset = offset;
    }

    pub fn radius_scale(&self) -> f32 {
        self.radius.scale
    }

    pub fn set_radius_scale(&mut self, scale: f32) {
        self.radius.scale = scale;
    }

    fn insert_vbo(&mut self, id: VboId) {
        let vertex_count = self.vbos[id.index()].vertex_count();
        self.by_vertex_count
            .entry(vertex_count)
            .or_insert_with(VecDeque::new)
            .push_back(id);
    }

    fn pop_emptiest_vbo(&mut self) -> Option<VboId> {
        let mut entry = self.by_vertex_count.first_entry()?;
        let id = entry.get_mut().pop_front();
        if entry.get().is_empty() {
            entry.remove();
        }
        id
    }

    /// Takes the buffer out of the index.
    /// Its vertex count must not have changed since it was inserted.
    fn detach_vbo(&mut self, id: VboId) {
        let vertex_count = self.vbos[id.index()].vertex_count();
        let mut now_empty = false;
        if let Some(queue) = self.by_vertex_count.get_mut(&vertex_count) {
            queue.retain(|v| *v != id);
            now_empty = queue.is_empty();
        }
        if now_empty {
            self.by_vertex_count.remove(&vertex_count);
        }
    }

    /// Adds an item to the buffer with the fewest vertices.
    pub fn add(&mut self, item: T) -> Result<VboId, PoolError> {
        if self.item_vbos.contains_key(&item.id()) {
            return Err(PoolError::AlreadyPooled);
        }
        let id = self.pop_emptiest_vbo().ok_or(PoolError::EmptyPool)?;
        self.item_vbos.insert(item.id(), id);
        self.vbos[id.index()].add(item);
        self.insert_vbo(id);
        Ok(id)
    }

    pub fn remove(&mut self, id: T::Id) -> Result<T, PoolError> {
        let vbo_id = *self.item_vbos.get(&id).ok_or(PoolError::NotPooled)?;
        self.detach_vbo(vbo_id);
        let removed = self.vbos[vbo_id.index()].remove(id);
        self.insert_vbo(vbo_id);
        match removed {
            Some(item) => {
                self.item_vbos.remove(&id);
                Ok(item)
            }
            None => {
                log::error!("item {:?} is indexed in {:?} but not stored there", id, vbo_id);
                self.item_vbos.remove(&id);
                Err(PoolError::NotPooled)
            }
        }
    }

    /// Swaps a pooled item for an updated version of itself, keeping it in its buffer.
    pub fn replace(&mut self, item: T) -> Result<T, PoolError> {
        let vbo_id = *self.item_vbos.get(&item.id()).ok_or(PoolError::NotPooled)?;
        self.detach_vbo(vbo_id);
        let replaced = self.vbos[vbo_id.index()].replace(item);
        self.insert_vbo(vbo_id);
        replaced.ok_or(PoolError::NotPooled)
    }

    pub fn clear(&mut self) {
        let pool_size = self.vbos.len();
        self.vbos = (0..pool_size).map(|i| Vbo::new(VboId(i))).collect();
        self.by_vertex_count.clear();
        self.by_vertex_count
            .insert(0, self.vbos.iter().map(|v| v.id()).collect());
        self.item_vbos.clear();
    }
}

impl<T> VboPool<T>
where
    T: PoolItem + Send,
    T::Vertex: Send,
{
    /// Repacks every buffer whose items changed. Returns the ids of the repacked buffers.
    pub fn rebuild_dirty(&mut self) -> Vec<VboId> {
        self.vbos
            .par_iter_mut()
            .filter(|v| v.is_dirty())
            .map(|v| {
                v.rebuild();
                v.id()
            })
            .collect()
    }
}
