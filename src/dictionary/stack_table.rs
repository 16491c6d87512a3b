//! Content-addressed stack table.
//!
//! Stacks are looked up by an xxh3 hash of their location-index sequence.
//! A hash hit is only reused after the stored sequence compares equal, so two
//! different stacks that happen to share a hash still get their own slots.

use rustc_hash::FxHashMap;
use xxhash_rust::xxh3::Xxh3;

/// Hash function applied to a location-index sequence
pub type StackHasher = fn(&[i32]) -> u64;

/// xxh3 over the little-endian bytes of each location index
pub fn hash_locations(locations: &[i32]) -> u64 {
    let mut hasher = Xxh3::new();
    for index in locations {
        hasher.update(&index.to_le_bytes());
    }
    hasher.digest()
}

#[derive(Debug, Clone)]
pub struct StackTable {
    // slot 0 is the empty stack
    stacks: Vec<Vec<i32>>,
    buckets: FxHashMap<u64, Vec<usize>>,
    hasher: StackHasher,
    collisions: usize,
}

impl Default for StackTable {
    fn default() -> Self {
        Self::with_hasher(hash_locations)
    }
}

impl StackTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hasher(hasher: StackHasher) -> Self {
        Self {
            stacks: vec![Vec::new()],
            buckets: FxHashMap::default(),
            hasher,
            collisions: 0,
        }
    }

    /// Index of an already interned stack
    pub fn lookup(&self, locations: &[i32]) -> Option<usize> {
        if locations.is_empty() {
            return Some(0);
        }
        let bucket = self.buckets.get(&(self.hasher)(locations))?;
        bucket
            .iter()
            .copied()
            .find(|&candidate| self.stacks[candidate] == locations)
    }

    /// Index of the stack, allocating a slot the first time it is seen.
    /// The empty sequence is always index 0.
    pub fn intern(&mut self, locations: &[i32]) -> usize {
        if locations.is_empty() {
            return 0;
        }

        let hash = (self.hasher)(locations);
        let bucket = self.buckets.entry(hash).or_default();
        if let Some(&index) = bucket
            .iter()
            .find(|&&candidate| self.stacks[candidate] == locations)
        {
            return index;
        }
        if !bucket.is_empty() {
            self.collisions += 1;
        }

        let index = self.stacks.len();
        self.stacks.push(locations.to_vec());
        bucket.push(index);
        index
    }

    pub fn get(&self, index: usize) -> Option<&[i32]> {
        self.stacks.get(index).map(Vec::as_slice)
    }

    /// Number of slots, including the empty stack at 0
    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.len() <= 1
    }

    /// Hash hits that turned out to be different stacks
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    pub fn iter(&self) -> impl Iterator<Item = &[i32]> {
        self.stacks.iter().map(Vec::as_slice)
    }
}
