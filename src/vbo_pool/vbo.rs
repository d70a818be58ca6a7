use std::fmt::Debug;
use std::hash::Hash;

/// Something that can be packed into a shared vertex buffer.
pub trait PoolItem {
    type Id: Copy + Eq + Hash + Debug;
    type Vertex: bytemuck::Pod + Debug;

    fn id(&self) -> Self::Id;

    fn vertices(&self) -> &[Self::Vertex];

    /// Pairs of indices into `vertices` that are drawn as connected primitives.
    fn edges(&self) -> &[[u32; 2]];

    fn vertex_count(&self) -> usize {
        self.vertices().len()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VboId(pub(crate) usize);

impl VboId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One vertex buffer holding the packed geometry of a variable number of items.
/// Each `Vbo` is drawn with one draw call per pass.
#[derive(Clone, Debug)]
pub struct Vbo<T: PoolItem> {
    id: VboId,
    items: Vec<T>,
    vertex_count: usize,

    vertices: Vec<T::Vertex>,
    edge_indices: Vec<u32>,

    /// Set if `items` changed since `vertices` and `edge_indices` have last been packed.
    dirty: bool,
}

impl<T: PoolItem> Vbo<T> {
    pub(crate) fn new(id: VboId) -> Self {
        Self {
            id,
            items: Vec::new(),
            vertex_count: 0,
            vertices: Vec::new(),
            edge_indices: Vec::new(),
            dirty: false,
        }
    }

    pub fn id(&self) -> VboId {
        self.id
    }

    pub fn items(&self) -> &[T] {
        self.items.as_slice()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The number of vertices of all items in this buffer, whether packed or not.
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn add(&mut self, item: T) {
        self.vertex_count += item.vertex_count();
        self.items.push(item);
        self.dirty = true;
    }

    pub(crate) fn remove(&mut self, id: T::Id) -> Option<T> {
        let position = self.items.iter().position(|i| i.id() == id)?;
        let item = self.items.remove(position);
        self.vertex_count -= item.vertex_count();
        self.dirty = true;
        Some(item)
    }

    /// Replaces the item with the same id, returning the old one.
    pub(crate) fn replace(&mut self, item: T) -> Option<T> {
        let position = self.items.iter().position(|i| i.id() == item.id())?;
        self.vertex_count -= self.items[position].vertex_count();
        self.vertex_count += item.vertex_count();
        self.dirty = true;
        Some(std::mem::replace(&mut self.items[position], item))
    }

    /// Packs the vertices of all items into one contiguous buffer.
    /// Edge indices are offset by the position of their item's first vertex.
    pub fn rebuild(&mut self) {
        self.vertices.clear();
        self.edge_indices.clear();
        self.vertices.reserve(self.vertex_count);
        for item in self.items.iter() {
            let base = self.vertices.len() as u32;
            self.vertices.extend_from_slice(item.vertices());
            self.edge_indices
                .extend(item.edges().iter().flat_map(|&[a, b]| [base + a, base + b]));
        }
        self.dirty = false;
    }

    pub fn vertices(&self) -> &[T::Vertex] {
        self.vertices.as_slice()
    }

    pub fn edge_indices(&self) -> &[u32] {
        self.edge_indices.as_slice()
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.vertices.as_slice())
    }

    pub fn edge_index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.edge_indices.as_slice())
    }
}
