//! Chained hash table storage for `Hash` values.
//!
//! The table never hashes or compares keys itself: callers compute hash
//! codes and run `==` through the runtime (which may execute user code),
//! then address entries by `(hash_code, position-in-chain)`. No borrow of
//! the table is held while user code runs.

use std::cell::RefCell;

use crate::value::Value;

/// Initial number of buckets. Always a power of two.
pub const INITIAL_CAPACITY: usize = 16;

#[derive(Debug)]
struct Entry {
    hash_code: i64,
    key: Value,
    value: Value,
    next: Option<Box<Entry>>,
}

#[derive(Debug)]
struct Table {
    buckets: Vec<Option<Box<Entry>>>,
    len: usize,
}

/// A shared hash table.
#[derive(Debug)]
pub struct Hash {
    table: RefCell<Table>,
}

impl Default for Hash {
    fn default() -> Self {
        Self::new()
    }
}

fn bucket_index(hash_code: i64, capacity: usize) -> usize {
    ((hash_code & 0x7FFF_FFFF) as usize) & (capacity - 1)
}

fn empty_buckets(capacity: usize) -> Vec<Option<Box<Entry>>> {
    std::iter::repeat_with(|| None).take(capacity).collect()
}

impl Table {
    fn chain(&self, hash_code: i64) -> impl Iterator<Item = &Entry> {
        let head = self.buckets[bucket_index(hash_code, self.buckets.len())].as_deref();
        std::iter::successors(head, |entry| entry.next.as_deref())
    }

    fn entry_mut(&mut self, hash_code: i64, position: usize) -> Option<&mut Entry> {
        let index = bucket_index(hash_code, self.buckets.len());
        let mut current = self.buckets[index].as_deref_mut();
        for _ in 0..position {
            current = current?.next.as_deref_mut();
        }
        current
    }

    /// Append at the tail of the chain so bucket order is insertion order.
    fn append(&mut self, entry: Box<Entry>) {
        let index = bucket_index(entry.hash_code, self.buckets.len());
        let mut slot = &mut self.buckets[index];
        while let Some(existing) = slot {
            slot = &mut existing.next;
        }
        *slot = Some(entry);
    }

    fn threshold(&self) -> usize {
        self.buckets.len() * 3 / 4
    }

    fn rehash(&mut self) {
        let capacity = self.buckets.len() * 2;
        let old = std::mem::replace(&mut self.buckets, empty_buckets(capacity));
        for mut head in old {
            while let Some(mut entry) = head {
                head = entry.next.take();
                self.append(entry);
            }
        }
        log::debug!("hash table grew to {capacity} buckets");
    }
}

impl Hash {
    pub fn new() -> Self {
        Self {
            table: RefCell::new(Table {
                buckets: empty_buckets(INITIAL_CAPACITY),
                len: 0,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.table.borrow().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of buckets.
    pub fn capacity(&self) -> usize {
        self.table.borrow().buckets.len()
    }

    /// Keys in the chain for `hash_code` carrying that same code, with
    /// their position in the chain.
    pub fn candidates(&self, hash_code: i64) -> Vec<(usize, Value)> {
        self.table
            .borrow()
            .chain(hash_code)
            .enumerate()
            .filter(|(_, entry)| entry.hash_code == hash_code)
            .map(|(position, entry)| (position, entry.key.clone()))
            .collect()
    }

    /// Value stored at a chain position previously returned by
    /// [`Hash::candidates`].
    pub fn value_at(&self, hash_code: i64, position: usize) -> Option<Value> {
        self.table
            .borrow()
            .chain(hash_code)
            .nth(position)
            .filter(|entry| entry.hash_code == hash_code)
            .map(|entry| entry.value.clone())
    }

    /// Overwrite the value at a chain position. Returns `false` if the
    /// position no longer holds an entry with `hash_code`.
    pub fn replace_at(&self, hash_code: i64, position: usize, value: Value) -> bool {
        let mut table = self.table.borrow_mut();
        match table.entry_mut(hash_code, position) {
            Some(entry) if entry.hash_code == hash_code => {
                entry.value = value;
                true
            }
            _ => false,
        }
    }

    /// Add a key known to be absent, growing the table past the load factor.
    pub fn insert_new(&self, hash_code: i64, key: Value, value: Value) {
        let mut table = self.table.borrow_mut();
        table.append(Box::new(Entry {
            hash_code,
            key,
            value,
            next: None,
        }));
        table.len += 1;
        if table.len > table.threshold() {
            table.rehash();
        }
    }

    /// Every `(key, value)` pair in bucket order.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        let table = self.table.borrow();
        table
            .buckets
            .iter()
            .flat_map(|head| std::iter::successors(head.as_deref(), |entry| entry.next.as_deref()))
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect()
    }
}
