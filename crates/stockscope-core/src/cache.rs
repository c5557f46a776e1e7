//! Bounded in-memory cache for raw provider responses.
//!
//! Entries expire lazily: a stale entry stays in the LRU until it is
//! overwritten or evicted, but [`ResponseCache::get`] reports it as absent.

use std::fmt::{Display, Formatter};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{ProviderId, Symbol};

pub const DEFAULT_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_CAPACITY: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Quote,
    History,
}

impl RequestKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::History => "history",
        }
    }
}

/// Provider + symbol + request kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub provider: ProviderId,
    pub symbol: Symbol,
    pub kind: RequestKind,
}

impl CacheKey {
    pub fn new(provider: ProviderId, symbol: Symbol, kind: RequestKind) -> Self {
        Self {
            provider,
            symbol,
            kind,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.provider, self.symbol, self.kind.as_str())
    }
}

#[derive(Debug)]
struct Entry {
    body: Arc<str>,
    captured_at: Instant,
}

/// Shared response cache; clones share the same store.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    inner: Option<Arc<Mutex<LruCache<CacheKey, Entry>>>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        if ttl.is_zero() {
            return Self::disabled();
        }
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Some(Arc::new(Mutex::new(LruCache::new(capacity)))),
            ttl,
        }
    }

    /// A cache that stores nothing; every lookup misses.
    pub fn disabled() -> Self {
        Self {
            inner: None,
            ttl: Duration::ZERO,
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    pub const fn is_disabled(&self) -> bool {
        self.inner.is_none()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<str>> {
        let inner = self.inner.as_ref()?;
        let mut guard = inner.lock().await;
        let entry = guard.get(key)?;
        if entry.captured_at.elapsed() < self.ttl {
            Some(Arc::clone(&entry.body))
        } else {
            None
        }
    }

    pub async fn put(&self, key: CacheKey, body: impl Into<Arc<str>>) {
        let Some(inner) = self.inner.as_ref() else {
            return;
        };
        let entry = Entry {
            body: body.into(),
            captured_at: Instant::now(),
        };
        inner.lock().await.put(key, entry);
    }

    /// Number of stored entries, stale ones included.
    pub async fn len(&self) -> usize {
        match self.inner.as_ref() {
            Some(inner) => inner.lock().await.len(),
            None => 0,
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}
