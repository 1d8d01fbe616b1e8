//! Open-addressed string interning table.
//!
//! Grounded on the teacher's `StringInternTable` (`gc/object_pool.rs`,
//! itself a port of Lua's `lstring.c` stringtable): linear probing over a
//! power-of-two bucket array keyed by the string's hash, so looking a
//! string up and inserting it share one probe sequence.
//!
//! `spec.md` §3 requires FNV-1a-32 hashing and that any two strings with
//! equal bytes are the same object; §9 notes this table holds *weak*
//! references -- entries are dropped during GC sweep if the string didn't
//! survive marking, not reference-counted.

use crate::gc::object_pool::{Arena, GcString, StringId};

#[inline]
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

pub struct StringInterner {
    buckets: Vec<Option<(u32, StringId)>>,
    count: usize,
    mask: usize,
}

impl StringInterner {
    const INITIAL_SIZE: usize = 64;
    const LOAD_FACTOR: f64 = 0.75;

    pub fn new() -> Self {
        Self {
            buckets: vec![None; Self::INITIAL_SIZE],
            count: 0,
            mask: Self::INITIAL_SIZE - 1,
        }
    }

    /// Returns the id of an existing string with identical bytes, or
    /// `None` along with nothing reserved (caller allocates then calls
    /// [`StringInterner::insert`]).
    pub fn find(&self, hash: u32, bytes: &[u8], strings: &Arena<GcString>) -> Option<StringId> {
        let mut idx = (hash as usize) & self.mask;
        let start = idx;
        loop {
            match self.buckets[idx] {
                None => return None,
                Some((stored_hash, id)) => {
                    if stored_hash == hash && strings.get(id.0).bytes.as_bytes() == bytes {
                        return Some(id);
                    }
                }
            }
            idx = (idx + 1) & self.mask;
            if idx == start {
                return None;
            }
        }
    }

    pub fn insert(&mut self, hash: u32, id: StringId) {
        self.maybe_grow();
        let mut idx = (hash as usize) & self.mask;
        while self.buckets[idx].is_some() {
            idx = (idx + 1) & self.mask;
        }
        self.buckets[idx] = Some((hash, id));
        self.count += 1;
    }

    /// Called during GC sweep: drop the weak reference to a string that
    /// did not survive marking. Never frees the arena slot itself --
    /// the sweep pass does that.
    pub fn remove(&mut self, hash: u32, id: StringId) {
        let mut idx = (hash as usize) & self.mask;
        let start = idx;
        loop {
            match self.buckets[idx] {
                None => return,
                Some((stored_hash, stored_id)) if stored_hash == hash && stored_id == id => {
                    self.buckets[idx] = None;
                    self.count -= 1;
                    self.rehash_from(idx);
                    return;
                }
                _ => {}
            }
            idx = (idx + 1) & self.mask;
            if idx == start {
                return;
            }
        }
    }

    /// Linear-probed tables need the slots after a tombstone rehashed,
    /// or a later lookup along the same probe chain can dead-end early.
    fn rehash_from(&mut self, start: usize) {
        let mut idx = (start + 1) & self.mask;
        while let Some((hash, id)) = self.buckets[idx] {
            self.buckets[idx] = None;
            self.count -= 1;
            self.insert(hash, id);
            idx = (idx + 1) & self.mask;
        }
    }

    fn maybe_grow(&mut self) {
        let threshold = (self.buckets.len() as f64 * Self::LOAD_FACTOR) as usize;
        if self.count < threshold {
            return;
        }
        let new_size = self.buckets.len() * 2;
        let old = std::mem::replace(&mut self.buckets, vec![None; new_size]);
        self.mask = new_size - 1;
        self.count = 0;
        for slot in old.into_iter().flatten() {
            self.insert(slot.0, slot.1);
        }
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}
