use glam::Vec3;

use crate::vbo_pool::PoolItem;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct NeuronVertex {
    pub position: Vec3,
    pub radius: f32,
}

impl NeuronVertex {
    pub fn new(position: Vec3, radius: f32) -> Self {
        Self { position, radius }
    }
}

/// The renderable skeleton of a single traced neuron.
/// Anchors are vertices, parent-child links between anchors are edges.
#[derive(Clone, Debug, PartialEq)]
pub struct NeuronGeometry {
    id: u64,
    vertices: Vec<NeuronVertex>,
    edges: Vec<[u32; 2]>,
}

impl NeuronGeometry {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            vertices: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Appends an anchor and returns its index.
    pub fn add_anchor(&mut self, position: Vec3, radius: f32) -> u32 {
        self.vertices.push(NeuronVertex::new(position, radius));
        (self.vertices.len() - 1) as u32
    }

    /// Links two anchors.
    /// Returns false and leaves the neuron untouched if either index is out of range.
    pub fn connect(&mut self, parent: u32, child: u32) -> bool {
        let len = self.vertices.len() as u32;
        if parent >= len || child >= len {
            log::warn!(
                "neuron {}: can't connect anchors {} and {}, it only has {} anchors",
                self.id,
                parent,
                child,
                len
            );
            return false;
        }
        self.edges.push([parent, child]);
        true
    }

    pub fn anchors(&self) -> &[NeuronVertex] {
        self.vertices.as_slice()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

impl PoolItem for NeuronGeometry {
    type Id = u64;
    type Vertex = NeuronVertex;

    fn id(&self) -> u64 {
        self.id
    }

    fn vertices(&self) -> &[NeuronVertex] {
        self.vertices.as_slice()
    }

    fn edges(&self) -> &[[u32; 2]] {
        self.edges.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vbo_pool::{VboId, VboPool};

    fn chain(id: u64, anchors: usize) -> NeuronGeometry {
        let mut neuron = NeuronGeometry::new(id);
        for i in 0..anchors {
            let index = neuron.add_anchor(Vec3::new(i as f32, 0.0, 0.0), 1.0);
            if index > 0 {
                assert!(neuron.connect(index - 1, index));
            }
        }
        neuron
    }

    #[test]
    fn vertex_layout() {
        assert_eq!(std::mem::size_of::<NeuronVertex>(), 16);
        let v = NeuronVertex::new(Vec3::new(1.0, 2.0, 3.0), 4.0);
        assert_eq!(bytemuck::cast::<NeuronVertex, [f32; 4]>(v), [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn connect_checks_indices() {
        let mut neuron = chain(1, 3);
        assert_eq!(neuron.edge_count(), 2);
        assert!(!neuron.connect(0, 3));
        assert_eq!(neuron.edge_count(), 2);
    }

    #[test]
    fn neurons_are_pooled() {
        let mut pool = VboPool::new(2).unwrap();
        assert_eq!(pool.add(chain(10, 4)).unwrap(), VboId(0));
        assert_eq!(pool.add(chain(11, 2)).unwrap(), VboId(1));
        assert_eq!(pool.add(chain(12, 1)).unwrap(), VboId(1));
        pool.rebuild_dirty();

        let vbo = pool.vbo(VboId(1)).unwrap();
        assert_eq!(vbo.vertices().len(), 3);
        assert_eq!(vbo.edge_indices(), &[0, 1]);
        assert_eq!(vbo.vertex_bytes().len(), 3 * 16);

        pool.remove(10).unwrap();
        assert!(!pool.contains(10));
        assert_eq!(pool.vertex_count(), 3);
    }
}
