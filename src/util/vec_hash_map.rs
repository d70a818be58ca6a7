use std::collections::hash_map::{Entry, Iter};
use std::collections::HashMap;
use std::hash::Hash;

/// A `HashMap` that collects multiple values per key in insertion order.
#[derive(Clone, Debug)]
pub struct VecHashMap<K, V> {
    data: HashMap<K, Vec<V>>,
}

impl<K: Copy + Eq + Hash, V> VecHashMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: K, value: V) {
        match self.data.entry(key) {
            Entry::Vacant(e) => {
                e.insert(vec![value]);
            }
            Entry::Occupied(mut e) => e.get_mut().push(value),
        }
    }

    pub fn get(&self, key: &K) -> Option<&Vec<V>> {
        self.data.get(key)
    }

    pub fn iter(&self) -> Iter<'_, K, Vec<V>> {
        self.data.iter()
    }

    /// The total number of values over all keys.
    pub fn len(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.data.values().flatten()
    }
}

impl<K, V> Default for VecHashMap<K, V> {
    fn default() -> Self {
        Self {
            data: HashMap::new(),
        }
    }
}
