//! Per-thread hash table, timer arena, and call stack (§3, §4.3).
//!
//! Each thread owns exactly one [`PerThreadStore`]; nothing here is shared across
//! threads, which is what makes the hot path lock-free per thread (§5).

pub mod callstack;

#[cfg(test)]
mod test;

pub use callstack::{CallStack, StartDecision, ROOT_ID};

use crate::config::ROOT_NAME;
use crate::timer::{Timer, TimerId};

/// `(Σ name[i]·(i+1)) mod tablesize`, iterating at most `MAX_CHARS` bytes (§4.3). Simple
/// on purpose: bucket search (exact-key comparison) handles the rest.
pub fn hash_name(name: &str, tablesize: usize) -> usize {
    let mut sum: u64 = 0;
    for (i, b) in name.as_bytes().iter().enumerate() {
        sum = sum.wrapping_add((*b as u64).wrapping_mul(i as u64 + 1));
    }
    (sum % tablesize as u64) as usize
}

/// `(address >> 4) mod tablesize` — the right-shift defeats clustering from
/// function-alignment padding (§4.3).
pub fn hash_address(address: u64, tablesize: usize) -> usize {
    ((address >> 4) % tablesize as u64) as usize
}

/// An unordered collection of timer ids sharing a hash slot (§3's HashBucket), stored as
/// a dynamically grown dense array.
#[derive(Debug, Default, Clone)]
pub struct HashBucket {
    entries: Vec<TimerId>,
}

impl HashBucket {
    fn find(&self, mut matches: impl FnMut(TimerId) -> bool) -> Option<TimerId> {
        self.entries.iter().copied().find(|&id| matches(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One thread's view of the world: its timer arena, hash table, and call stack.
#[derive(Clone)]
pub struct PerThreadStore {
    /// Every timer created on this thread, in creation order; index 0 is always the
    /// sentinel root (§3's Lifecycle: "no timer is ever deleted while the library is live").
    pub arena: Vec<Timer>,
    buckets: Vec<HashBucket>,
    pub callstack: CallStack,
    pub max_name_len: usize,
    tablesize: usize,
}

impl PerThreadStore {
    pub fn new(tablesize: usize) -> PerThreadStore {
        let arena = vec![Timer::new(ROOT_NAME, None)];
        PerThreadStore {
            arena,
            buckets: vec![HashBucket::default(); tablesize.max(1)],
            callstack: CallStack::new(),
            max_name_len: 0,
            tablesize: tablesize.max(1),
        }
    }

    pub fn root(&self) -> &Timer {
        &self.arena[ROOT_ID]
    }

    pub fn timer(&self, id: TimerId) -> &Timer {
        &self.arena[id]
    }

    pub fn timer_mut(&mut self, id: TimerId) -> &mut Timer {
        &mut self.arena[id]
    }

    pub fn find_by_name(&self, name: &str) -> Option<TimerId> {
        let slot = hash_name(name, self.tablesize);
        self.buckets[slot].find(|id| self.arena[id].name.as_str() == name)
    }

    pub fn find_by_address(&self, address: u64) -> Option<TimerId> {
        let slot = hash_address(address, self.tablesize);
        self.buckets[slot].find(|id| self.arena[id].address == Some(address))
    }

    /// Resolves `name` to a timer id, creating and registering a new one if absent
    /// (§4.3 step 6: allocate, truncate, append to arena, append to bucket, update
    /// `max_name_len`).
    pub fn find_or_create_by_name(&mut self, name: &str) -> TimerId {
        if let Some(id) = self.find_by_name(name) {
            return id;
        }
        let timer = Timer::new(name, None);
        self.max_name_len = self.max_name_len.max(timer.name.len());
        let id = self.arena.len();
        let slot = hash_name(timer.name.as_str(), self.tablesize);
        self.arena.push(timer);
        self.buckets[slot].entries.push(id);
        id
    }

    /// Same as [`PerThreadStore::find_or_create_by_name`] for the instrument-address
    /// variant (§4.3): the name stored is the address rendered as lowercase hex.
    pub fn find_or_create_by_address(&mut self, address: u64) -> TimerId {
        if let Some(id) = self.find_by_address(address) {
            return id;
        }
        let name = format!("{address:x}");
        let timer = Timer::new(&name, Some(address));
        self.max_name_len = self.max_name_len.max(timer.name.len());
        let id = self.arena.len();
        let slot = hash_address(address, self.tablesize);
        self.arena.push(timer);
        self.buckets[slot].entries.push(id);
        id
    }

    /// Per-bucket occupancy, for the reporter's collision histogram (§4.8).
    pub fn collision_histogram(&self) -> Vec<usize> {
        self.buckets.iter().map(HashBucket::len).collect()
    }

    /// Rough byte estimate of this store's footprint, for the reporter's memory-usage
    /// diagnostic (§4.8). Not exact: it counts the arena and bucket vectors' capacities,
    /// not heap allocator bookkeeping overhead.
    pub fn memory_usage_bytes(&self) -> usize {
        let arena_bytes = self.arena.capacity() * std::mem::size_of::<Timer>();
        let bucket_bytes: usize = self
            .buckets
            .iter()
            .map(|b| b.entries.capacity() * std::mem::size_of::<TimerId>())
            .sum();
        arena_bytes + bucket_bytes
    }
}
