//! Open-addressing hash table shared by object tables and member tables.
//!
//! Keys are hashed to 128 bits; the low 64 bits pick the probe start and
//! collisions are resolved by linear probing. A slot matches only when both
//! the stored hash and the stored key are equal. Inserting an existing key
//! is rejected rather than overwriting. Iteration follows insertion order.

use std::borrow::Borrow;
use std::hash::{BuildHasher, BuildHasherDefault, Hash};

use rustc_hash::FxHasher;
use serde::ser::{Serialize, SerializeMap, Serializer};

pub const INITIAL_CAPACITY: usize = 5;

// max load factor 0.70, kept as a ratio to stay in integers
const LOAD_NUM: usize = 7;
const LOAD_DEN: usize = 10;

const LO_SEED: u64 = 0x243f_6a88_85a3_08d3;
const HI_SEED: u64 = 0x1319_8a2e_0370_7344;

/// 128-bit hash built from two independently seeded 64-bit passes.
pub fn hash128<Q: Hash + ?Sized>(key: &Q) -> u128 {
    let build = BuildHasherDefault::<FxHasher>::default();
    let lo = build.hash_one((LO_SEED, key));
    let hi = build.hash_one((HI_SEED, key));
    (u128::from(hi) << 64) | u128::from(lo)
}

#[derive(Debug, Clone)]
struct Entry<K, V> {
    hash: u128,
    key: K,
    value: V,
}

#[derive(Debug, Clone)]
pub struct Map<K, V> {
    slots: Vec<Option<Entry<K, V>>>,
    // occupied slot indices in insertion order; entries are never removed
    order: Vec<usize>,
}

impl<K, V> Default for Map<K, V> {
    fn default() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }
}

impl<K, V> Map<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity.max(1));
        slots.resize_with(capacity.max(1), || None);
        Self {
            slots,
            order: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order
            .iter()
            .filter_map(|&slot| self.slots[slot].as_ref())
            .map(|entry| (&entry.key, &entry.value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }
}

impl<K: Hash + Eq, V> Map<K, V> {
    /// Inserts `key` unless it is already present.
    ///
    /// Returns `false` (and drops `value`) for a duplicate; the stored entry
    /// is left untouched.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        if (self.len() + 1) * LOAD_DEN > self.slots.len() * LOAD_NUM {
            self.grow();
        }

        let hash = hash128(&key);
        let mut slot = self.probe_start(hash);
        loop {
            match &self.slots[slot] {
                None => {
                    self.slots[slot] = Some(Entry { hash, key, value });
                    self.order.push(slot);
                    return true;
                }
                Some(entry) if entry.hash == hash && entry.key == key => return false,
                Some(_) => slot = (slot + 1) % self.slots.len(),
            }
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key)
            .and_then(|slot| self.slots[slot].as_ref())
            .map(|entry| &entry.value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.find(key)?;
        self.slots[slot].as_mut().map(|entry| &mut entry.value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).is_some()
    }

    fn find<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash128(key);
        let mut slot = self.probe_start(hash);
        // at least one slot is always empty, so the probe terminates
        loop {
            match &self.slots[slot] {
                None => return None,
                Some(entry) if entry.hash == hash && <K as Borrow<Q>>::borrow(&entry.key) == key => {
                    return Some(slot);
                }
                Some(_) => slot = (slot + 1) % self.slots.len(),
            }
        }
    }

    fn probe_start(&self, hash: u128) -> usize {
        (hash as u64 % self.slots.len() as u64) as usize
    }

    /// Doubles capacity and re-inserts every entry through `insert`.
    fn grow(&mut self) {
        let capacity = self.slots.len() * 2;
        log::debug!("growing table from {} to {capacity} slots", self.slots.len());
        let mut old = std::mem::replace(self, Self::with_capacity(capacity));
        for slot in old.order {
            if let Some(entry) = old.slots[slot].take() {
                self.insert(entry.key, entry.value);
            }
        }
    }
}

impl<K: Hash + Eq, V: PartialEq> PartialEq for Map<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: Serialize, V: Serialize> Serialize for Map<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for Map<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
