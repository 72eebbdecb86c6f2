use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::ptr::{self, NonNull};
use std::time::{Duration, Instant};

/// A single cache entry, carrying its own links in the recency list.
///
/// An entry is in the index iff it is linked between the sentinels.
struct Entry {
    key: String,
    value: Vec<u8>,
    /// Absolute expiry instant. `None` means the entry never expires.
    expires_at: Option<Instant>,
    prev: *mut Entry,
    next: *mut Entry,
}

impl Entry {
    fn new(key: String, value: Vec<u8>, expires_at: Option<Instant>) -> Self {
        Entry {
            key,
            value,
            expires_at,
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }
    }

    /// Creates a sentinel entry that only serves as a list anchor.
    fn sentinel() -> Self {
        Self::new(String::new(), Vec::new(), None)
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }
}

/// Index and recency list, guarded together by the cache lock.
///
/// `head` and `tail` are sentinel nodes; the most recently used entry sits
/// right after `head`, the least recently used right before `tail`. Every
/// pointer stored in the index refers to a heap entry owned by the list,
/// valid until `remove` hands it back to a `Box`.
struct CacheInner {
    index: HashMap<String, NonNull<Entry>>,
    head: NonNull<Entry>,
    tail: NonNull<Entry>,
}

// The raw pointers only ever travel with the Mutex guarding them.
unsafe impl Send for CacheInner {}

impl CacheInner {
    fn new() -> Self {
        let head = Box::into_raw(Box::new(Entry::sentinel()));
        let tail = Box::into_raw(Box::new(Entry::sentinel()));

        // SAFETY: both sentinels were just allocated and are valid.
        unsafe {
            (*head).next = tail;
            (*tail).prev = head;
        }

        CacheInner {
            index: HashMap::new(),
            // SAFETY: Box::into_raw never returns null.
            head: unsafe { NonNull::new_unchecked(head) },
            tail: unsafe { NonNull::new_unchecked(tail) },
        }
    }

    /// Unlinks `node` from the recency list without freeing it.
    ///
    /// # Safety
    /// `node` must be a non-sentinel entry currently linked in the list.
    unsafe fn detach(&mut self, node: NonNull<Entry>) {
        let node = node.as_ptr();
        (*(*node).prev).next = (*node).next;
        (*(*node).next).prev = (*node).prev;
    }

    /// Links `node` right after the head sentinel.
    ///
    /// # Safety
    /// `node` must be a valid entry that is not currently linked.
    unsafe fn attach_front(&mut self, node: NonNull<Entry>) {
        let head = self.head.as_ptr();
        let node = node.as_ptr();
        (*node).prev = head;
        (*node).next = (*head).next;
        (*(*head).next).prev = node;
        (*head).next = node;
    }

    /// Moves a linked entry to the front of the recency list.
    ///
    /// # Safety
    /// `node` must be a non-sentinel entry currently linked in the list.
    unsafe fn move_to_front(&mut self, node: NonNull<Entry>) {
        if (*self.head.as_ptr()).next == node.as_ptr() {
            return;
        }
        self.detach(node);
        self.attach_front(node);
    }

    /// Removes an entry from both the list and the index and frees it.
    ///
    /// # Safety
    /// `node` must be a non-sentinel entry currently linked and indexed.
    unsafe fn remove(&mut self, node: NonNull<Entry>) {
        self.detach(node);
        let entry = Box::from_raw(node.as_ptr());
        self.index.remove(&entry.key);
    }

    /// Removes the least recently used entry, if any.
    fn evict_lru(&mut self) {
        // SAFETY: tail.prev is either the head sentinel (empty list) or the
        // least recently used entry, linked and indexed.
        unsafe {
            let lru = (*self.tail.as_ptr()).prev;
            if lru != self.head.as_ptr() {
                self.remove(NonNull::new_unchecked(lru));
            }
        }
    }
}

impl Drop for CacheInner {
    fn drop(&mut self) {
        // SAFETY: walks the list exactly once, freeing each entry and then
        // the two sentinels; the index holds no owning references.
        unsafe {
            let mut cur = (*self.head.as_ptr()).next;
            while cur != self.tail.as_ptr() {
                let next = (*cur).next;
                drop(Box::from_raw(cur));
                cur = next;
            }
            drop(Box::from_raw(self.head.as_ptr()));
            drop(Box::from_raw(self.tail.as_ptr()));
        }
    }
}

/// Point-in-time view of the store, served on the metrics endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub load: f64,
}

/// Bounded LRU cache with per-entry TTL.
///
/// All operations are infallible: a miss, an expired entry, and a delete of
/// an absent key are ordinary negative results, and `set` always succeeds
/// (possibly evicting the least recently used entry). Every public
/// operation takes the single exclusive lock, `get` included, because a hit
/// reorders the recency list.
pub struct Cache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl Cache {
    /// Creates a cache holding at most `capacity` entries (clamped to >= 1).
    pub fn new(capacity: usize) -> Self {
        Cache {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner::new()),
        }
    }

    /// Looks up `key`, refreshing its recency on a hit.
    ///
    /// An entry whose expiry has passed is removed on the spot and reported
    /// as a miss.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock();

        let node = match inner.index.get(key) {
            Some(node) => *node,
            None => return None,
        };

        // SAFETY: pointers in the index are linked, non-sentinel entries.
        unsafe {
            if node.as_ref().is_expired(Instant::now()) {
                inner.remove(node);
                return None;
            }
            inner.move_to_front(node);
            Some(node.as_ref().value.clone())
        }
    }

    /// Stores `value` under `key`.
    ///
    /// An existing entry is rewritten in place (value and expiry) and moved
    /// to the front; a new entry is inserted at the front, evicting the tail
    /// when the store exceeds capacity. A `ttl` of `None` or zero means the
    /// entry never expires.
    pub fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) {
        let expires_at = ttl
            .filter(|ttl| !ttl.is_zero())
            .map(|ttl| Instant::now() + ttl);

        let mut inner = self.inner.lock();

        if let Some(node) = inner.index.get(key).copied() {
            // SAFETY: indexed entries are linked and exclusively ours under
            // the lock.
            unsafe {
                let entry = &mut *node.as_ptr();
                entry.value = value;
                entry.expires_at = expires_at;
                inner.move_to_front(node);
            }
            return;
        }

        let node = Box::into_raw(Box::new(Entry::new(key.to_owned(), value, expires_at)));
        // SAFETY: freshly allocated, unlinked entry.
        let node = unsafe { NonNull::new_unchecked(node) };
        unsafe { inner.attach_front(node) };
        inner.index.insert(key.to_owned(), node);

        if inner.index.len() > self.capacity {
            inner.evict_lru();
        }
    }

    /// Removes `key`, reporting whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        let mut inner = self.inner.lock();
        match inner.index.get(key).copied() {
            Some(node) => {
                // SAFETY: indexed entries are linked, non-sentinel.
                unsafe { inner.remove(node) };
                true
            }
            None => false,
        }
    }

    /// Sweeps out every expired entry and returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let mut inner = self.inner.lock();
        let now = Instant::now();

        let mut expired = Vec::new();
        // SAFETY: walking the list between the sentinels under the lock;
        // nothing is unlinked during the walk.
        unsafe {
            let mut cur = (*inner.head.as_ptr()).next;
            while cur != inner.tail.as_ptr() {
                if (*cur).is_expired(now) {
                    expired.push(NonNull::new_unchecked(cur));
                }
                cur = (*cur).next;
            }
            for node in &expired {
                inner.remove(*node);
            }
        }

        expired.len()
    }

    /// Current number of entries.
    pub fn size(&self) -> usize {
        self.inner.lock().index.len()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        // SAFETY: repeatedly removes the entry after the head sentinel until
        // only the sentinels remain.
        unsafe {
            loop {
                let first = (*inner.head.as_ptr()).next;
                if first == inner.tail.as_ptr() {
                    break;
                }
                inner.remove(NonNull::new_unchecked(first));
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let size = self.size();
        CacheStats {
            size,
            capacity: self.capacity,
            load: size as f64 / self.capacity as f64,
        }
    }
}

#[cfg(test)]
impl Cache {
    /// (index size, forward list length, backward list length).
    pub(crate) fn list_lengths(&self) -> (usize, usize, usize) {
        let inner = self.inner.lock();
        // SAFETY: walks between the sentinels in both directions under the
        // lock; the list is never torn while the lock is held.
        unsafe {
            let mut forward = 0;
            let mut cur = (*inner.head.as_ptr()).next;
            while cur != inner.tail.as_ptr() {
                forward += 1;
                cur = (*cur).next;
            }
            let mut backward = 0;
            let mut cur = (*inner.tail.as_ptr()).prev;
            while cur != inner.head.as_ptr() {
                backward += 1;
                cur = (*cur).prev;
            }
            (inner.index.len(), forward, backward)
        }
    }
}
