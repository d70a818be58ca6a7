pub mod extent;
pub mod vec_hash_map;
