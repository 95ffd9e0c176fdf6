use std::collections::HashMap;

use crate::handles::Handle;

use super::key::CacheKey;
use super::loader::RequestId;

/// A loaded texture as the guest sees it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureInfo {
    pub texture: Handle,
    pub width: u32,
    pub height: u32,
}

/// State of one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    /// A load is in flight. Waiters are notified in arrival order.
    Pending { waiters: Vec<RequestId> },
    Ready(TextureInfo),
}

/// Outcome of registering a request against the cache.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Admission {
    /// The key is already loaded.
    Ready(TextureInfo),
    /// A load for the key is already in flight; the request joined it.
    Joined,
    /// First request for the key. The caller must start exactly one load.
    Started,
}

/// Per-context texture cache. No eviction; failed keys are removed so the
/// next request starts over.
#[derive(Debug, Default)]
pub struct TextureCache {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in `key`. `waiter` is `None` for sync requests,
    /// which poll the cache instead of waiting for a notification.
    pub fn request(&mut self, key: &CacheKey, waiter: Option<RequestId>) -> Admission {
        match self.entries.get_mut(key) {
            Some(CacheEntry::Ready(info)) => Admission::Ready(*info),
            Some(CacheEntry::Pending { waiters }) => {
                waiters.extend(waiter);
                Admission::Joined
            }
            None => {
                let waiters = waiter.into_iter().collect();
                self.entries.insert(key.clone(), CacheEntry::Pending { waiters });
                log::debug!("texture cache: {key} pending");
                Admission::Started
            }
        }
    }

    /// The loaded texture for `key`, if any.
    pub fn lookup(&self, key: &CacheKey) -> Option<TextureInfo> {
        match self.entries.get(key) {
            Some(CacheEntry::Ready(info)) => Some(*info),
            _ => None,
        }
    }

    pub fn entry(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn is_pending(&self, key: &CacheKey) -> bool {
        matches!(self.entries.get(key), Some(CacheEntry::Pending { .. }))
    }

    /// Marks `key` ready and returns its waiters, each exactly once.
    ///
    /// A key that is not pending returns no waiters and is left untouched.
    pub fn resolve(&mut self, key: &CacheKey, info: TextureInfo) -> Vec<RequestId> {
        let Some(entry) = self.entries.get_mut(key) else {
            return Vec::new();
        };
        if !matches!(entry, CacheEntry::Pending { .. }) {
            return Vec::new();
        }
        log::debug!("texture cache: {key} ready as {}", info.texture);
        match std::mem::replace(entry, CacheEntry::Ready(info)) {
            CacheEntry::Pending { waiters } => waiters,
            CacheEntry::Ready(_) => Vec::new(),
        }
    }

    /// Removes a pending `key` after a failed load and returns its waiters.
    pub fn fail(&mut self, key: &CacheKey) -> Vec<RequestId> {
        if !self.is_pending(key) {
            return Vec::new();
        }
        log::debug!("texture cache: {key} failed");
        match self.entries.remove(key) {
            Some(CacheEntry::Pending { waiters }) => waiters,
            _ => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of keys with a load in flight.
    pub fn pending_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e, CacheEntry::Pending { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureSource;

    fn key(s: &str) -> CacheKey {
        TextureSource::Url(s.into()).key()
    }

    const INFO: TextureInfo = TextureInfo { texture: 5, width: 64, height: 64 };

    #[test]
    fn second_request_joins_the_first() {
        let mut cache = TextureCache::new();
        let k = key("img:a");
        assert_eq!(cache.request(&k, Some(10)), Admission::Started);
        assert_eq!(cache.request(&k, Some(11)), Admission::Joined);
        assert_eq!(cache.resolve(&k, INFO), vec![10, 11]);
        assert_eq!(cache.lookup(&k), Some(INFO));
    }

    #[test]
    fn ready_key_admits_immediately() {
        let mut cache = TextureCache::new();
        let k = key("a.png");
        cache.request(&k, None);
        cache.resolve(&k, INFO);
        assert_eq!(cache.request(&k, Some(1)), Admission::Ready(INFO));
    }

    #[test]
    fn sync_requests_do_not_add_waiters() {
        let mut cache = TextureCache::new();
        let k = key("a.png");
        assert_eq!(cache.request(&k, None), Admission::Started);
        assert_eq!(cache.request(&k, None), Admission::Joined);
        assert_eq!(cache.request(&k, Some(3)), Admission::Joined);
        assert_eq!(cache.resolve(&k, INFO), vec![3]);
    }

    #[test]
    fn failure_removes_the_key() {
        let mut cache = TextureCache::new();
        let k = key("missing.png");
        cache.request(&k, Some(1));
        cache.request(&k, Some(2));
        assert_eq!(cache.fail(&k), vec![1, 2]);
        assert!(cache.entry(&k).is_none());
        assert_eq!(cache.request(&k, Some(3)), Admission::Started);
    }

    #[test]
    fn resolving_twice_notifies_once() {
        let mut cache = TextureCache::new();
        let k = key("a.png");
        cache.request(&k, Some(1));
        assert_eq!(cache.resolve(&k, INFO), vec![1]);
        assert!(cache.resolve(&k, INFO).is_empty());
        assert!(cache.fail(&k).is_empty());
        assert_eq!(cache.lookup(&k), Some(INFO));
    }

    #[test]
    fn pending_count_tracks_in_flight_keys() {
        let mut cache = TextureCache::new();
        cache.request(&key("a"), None);
        cache.request(&key("b"), None);
        cache.resolve(&key("a"), INFO);
        assert_eq!(cache.pending_count(), 1);
        assert_eq!(cache.len(), 2);
    }
}
