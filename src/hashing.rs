//! This module provides deterministic `HashMap` and `HashSet` variants. The hashing data
//! structures in the standard library are randomly seeded per process, which would make
//! two runs with the same seed iterate the same table in different orders.
//!
//! The standard library `HashMap` has a `new` method, but `HashMap<K, V, S>` does not have a
//! `new` method by default. Use `HashMap::default()` instead to create a new hashmap with the
//! default hasher.
//!
//! The `hash_str` free function is used to derive per-stream seeds in `crate::random`.

use std::hash::Hasher;

use rustc_hash::FxHasher;

pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

/// A convenience method to compute the hash of a `&str`.
pub fn hash_str(data: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(data.as_bytes());
    hasher.finish()
}
