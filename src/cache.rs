//! Access-frequency ordered query cache.
//!
//! Keys are kept in a rank sequence. Every read bumps the key's hit counter
//! and moves it toward the head past every predecessor with as many or fewer
//! hits, so frequently read keys gather at the head. When a bounded cache is
//! full, inserting a new key evicts the tail.

use ahash::AHashMap;
use log::trace;

#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    hits: i64,
    rank: usize,
}

/// Query result cache keyed by raw query text.
#[derive(Debug, Clone)]
pub struct FrequencyCache<V> {
    capacity: Option<usize>,
    slots: AHashMap<String, Slot<V>>,
    ranks: Vec<String>,
}

impl<V> FrequencyCache<V> {
    /// Create a cache holding at most `capacity` entries, or unbounded for
    /// `None` or zero. An unbounded cache never reorders its keys.
    pub fn new(capacity: Option<usize>) -> Self {
        FrequencyCache {
            capacity: capacity.filter(|&c| c > 0),
            slots: AHashMap::new(),
            ranks: Vec::new(),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Look up `key`, counting the access.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        if self.capacity.is_some() {
            self.promote(key);
        }
        self.slots.get(key).map(|slot| &slot.value)
    }

    /// Store `value` under `key`.
    ///
    /// Overwriting an existing key keeps its rank and hit count.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();

        if let Some(slot) = self.slots.get_mut(&key) {
            slot.value = value;
            return;
        }

        let Some(capacity) = self.capacity else {
            self.slots.insert(
                key,
                Slot {
                    value,
                    hits: 0,
                    rank: 0,
                },
            );
            return;
        };

        if self.ranks.len() >= capacity {
            if let Some(evicted) = self.ranks.pop() {
                self.slots.remove(&evicted);
                trace!("evicted cached query {evicted:?}");
            }
        }

        let rank = self.ranks.len();
        self.ranks.push(key.clone());
        self.slots.insert(
            key.clone(),
            Slot {
                value,
                hits: -1,
                rank,
            },
        );
        self.promote(&key);
    }

    /// Drop every entry.
    pub fn reset(&mut self) {
        if !self.slots.is_empty() {
            trace!("reset query cache ({} entries)", self.slots.len());
        }
        self.slots.clear();
        self.ranks.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Keys from most to least frequently read. Empty for an unbounded cache.
    pub fn keys_by_rank(&self) -> &[String] {
        &self.ranks
    }

    fn promote(&mut self, key: &str) {
        let (old, hits) = match self.slots.get_mut(key) {
            Some(slot) => {
                slot.hits += 1;
                (slot.rank, slot.hits)
            }
            None => return,
        };

        let mut target = old;
        while target > 0 {
            let before = &self.ranks[target - 1];
            match self.slots.get(before) {
                Some(slot) if slot.hits <= hits => target -= 1,
                _ => break,
            }
        }

        if target == old {
            return;
        }

        self.ranks[target..=old].rotate_right(1);
        for rank in target..=old {
            if let Some(slot) = self.slots.get_mut(&self.ranks[rank]) {
                slot.rank = rank;
            }
        }
    }
}
