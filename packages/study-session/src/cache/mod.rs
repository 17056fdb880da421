pub mod keys;

use std::collections::{HashMap, VecDeque};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::config::MediaCacheConfig;

pub use keys::{normalize_search_text, MediaKey, MediaKind};

#[derive(Debug, Clone, PartialEq)]
pub enum MediaContent {
    Audio { url: String, cached: bool },
    Image(Bytes),
}

#[derive(Debug, Clone)]
pub struct MediaCacheEntry {
    pub content: MediaContent,
    pub inserted_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<MediaKey, MediaCacheEntry>,
    order: VecDeque<MediaKey>,
}

/// Process-wide media store shared across sessions. Holds at most
/// `capacity` entries; when full, the oldest `evict_ratio` share is
/// dropped before the next insert.
#[derive(Debug)]
pub struct MediaCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    evict_ratio: f64,
}

impl Default for MediaCache {
    fn default() -> Self {
        Self::new(MediaCacheConfig::default())
    }
}

impl MediaCache {
    pub fn new(config: MediaCacheConfig) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity: config.capacity.max(1),
            evict_ratio: config.evict_ratio.clamp(0.0, 1.0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &MediaKey) -> Option<MediaContent> {
        self.inner.lock().entries.get(key).map(|e| e.content.clone())
    }

    pub fn contains(&self, key: &MediaKey) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    pub fn insert(&self, key: MediaKey, content: MediaContent) {
        let mut inner = self.inner.lock();

        if inner.entries.contains_key(&key) {
            inner.order.retain(|k| k != &key);
        } else if inner.entries.len() >= self.capacity {
            let evicted = self.evict_oldest(&mut inner);
            tracing::debug!(evicted, capacity = self.capacity, "media cache eviction");
        }

        inner.order.push_back(key.clone());
        inner.entries.insert(
            key,
            MediaCacheEntry {
                content,
                inserted_at: Utc::now(),
            },
        );
    }

    fn evict_oldest(&self, inner: &mut CacheInner) -> usize {
        let target = ((inner.entries.len() as f64) * self.evict_ratio).ceil() as usize;
        let target = target.max(1).min(inner.entries.len());

        let mut evicted = 0;
        while evicted < target {
            let Some(key) = inner.order.pop_front() else {
                break;
            };
            if inner.entries.remove(&key).is_some() {
                evicted += 1;
            }
        }
        evicted
    }

    pub fn remove(&self, key: &MediaKey) -> bool {
        let mut inner = self.inner.lock();
        inner.order.retain(|k| k != key);
        inner.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}
