use std::collections::HashMap;
use std::hash::Hash;

/// Index of an entry in the cache arena
type Handle = usize;

struct Entry<K, V> {
    key: K,
    value: V,
    /// Neighbour towards the most recently used end
    prev: Option<Handle>,
    /// Neighbour towards the least recently used end
    next: Option<Handle>,
}

/// Recency-ordered map backed by an arena of entries.
///
/// Entries are linked through arena handles rather than pointers, and a
/// hash index maps keys to handles. Freed handles are reused. The cache
/// never evicts on its own; the owner decides which entry to remove when
/// it is at capacity.
pub struct LruCache<K, V> {
    entries: Vec<Option<Entry<K, V>>>,
    free: Vec<Handle>,
    index: HashMap<K, Handle>,
    /// Most recently used entry
    head: Option<Handle>,
    /// Least recently used entry
    tail: Option<Handle>,
}

impl<K: Copy + Eq + Hash, V> LruCache<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free: Vec::new(),
            index: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    fn entry(&self, handle: Handle) -> &Entry<K, V> {
        self.entries[handle]
            .as_ref()
            .expect("indexed handle points at a live entry")
    }

    fn entry_mut(&mut self, handle: Handle) -> &mut Entry<K, V> {
        self.entries[handle]
            .as_mut()
            .expect("indexed handle points at a live entry")
    }

    /// Looks up a value and marks it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let handle = *self.index.get(key)?;
        self.detach(handle);
        self.push_front(handle);
        Some(&self.entry(handle).value)
    }

    /// Looks up a value without touching the recency order.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&h| &self.entry(h).value)
    }

    /// Inserts a value as most recently used, returning the previous value
    /// stored under the key.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&handle) = self.index.get(&key) {
            self.detach(handle);
            self.push_front(handle);
            return Some(std::mem::replace(&mut self.entry_mut(handle).value, value));
        }

        let entry = Entry {
            key,
            value,
            prev: None,
            next: None,
        };
        let handle = match self.free.pop() {
            Some(handle) => {
                self.entries[handle] = Some(entry);
                handle
            }
            None => {
                self.entries.push(Some(entry));
                self.entries.len() - 1
            }
        };

        self.index.insert(key, handle);
        self.push_front(handle);
        None
    }

    /// Removes a key and returns its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let handle = self.index.remove(key)?;
        self.detach(handle);
        let entry = self.entries[handle].take()?;
        self.free.push(handle);
        Some(entry.value)
    }

    /// Iterates entries from least to most recently used.
    pub fn iter_lru(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        let mut cursor = self.tail;
        std::iter::from_fn(move || {
            let entry = self.entry(cursor?);
            cursor = entry.prev;
            Some((&entry.key, &entry.value))
        })
    }

    /// Iterates entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.entries
            .iter()
            .flatten()
            .map(|entry| (&entry.key, &entry.value))
    }

    fn detach(&mut self, handle: Handle) {
        let (prev, next) = {
            let entry = self.entry(handle);
            (entry.prev, entry.next)
        };

        match prev {
            Some(p) => self.entry_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.entry_mut(n).prev = prev,
            None => self.tail = prev,
        }

        let entry = self.entry_mut(handle);
        entry.prev = None;
        entry.next = None;
    }

    fn push_front(&mut self, handle: Handle) {
        let old_head = self.head;
        {
            let entry = self.entry_mut(handle);
            entry.prev = None;
            entry.next = old_head;
        }
        if let Some(h) = old_head {
            self.entry_mut(h).prev = Some(handle);
        }
        self.head = Some(handle);
        if self.tail.is_none() {
            self.tail = Some(handle);
        }
    }
}

impl<K: Copy + Eq + Hash, V> Default for LruCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
