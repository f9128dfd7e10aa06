//! Images taken during this app session, for optimistic display.

use std::collections::HashMap;

use bytes::Bytes;

use super::job::JobId;

/// Buffers keyed by job identity. Entries live for the whole session; there
/// is no eviction.
#[derive(Debug, Default)]
pub struct SessionImageCache {
    entries: HashMap<JobId, Bytes>,
}

impl SessionImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, id: JobId, buffer: Bytes) {
        self.entries.insert(id, buffer);
    }

    pub fn get(&self, id: &JobId) -> Option<Bytes> {
        self.entries.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get() {
        let mut cache = SessionImageCache::new();
        let id = JobId::derive("a.png", "u1");
        cache.put(id.clone(), Bytes::from_static(b"png"));
        assert_eq!(cache.get(&id).as_deref(), Some(&b"png"[..]));
        assert!(cache.get(&JobId::derive("b.png", "u1")).is_none());
    }

    #[test]
    fn put_replaces_existing_buffer() {
        let mut cache = SessionImageCache::new();
        let id = JobId::derive("a.png", "u1");
        cache.put(id.clone(), Bytes::from_static(b"old"));
        cache.put(id.clone(), Bytes::from_static(b"new"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&id).as_deref(), Some(&b"new"[..]));
    }
}
