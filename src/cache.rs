//! Bounded cache of compiled statements with least-used eviction.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::db::Prepare;
use crate::error::{GatewayError, GatewayResult};

/// A compiled handle plus its reuse counter.
#[derive(Debug, Clone)]
pub struct CachedStatement<H> {
    handle: H,
    usage: u64,
    /// Insertion order, used to break eviction ties.
    seq: u64,
}

impl<H: Clone> CachedStatement<H> {
    fn new(handle: H, seq: u64) -> Self {
        Self {
            handle,
            usage: 0,
            seq,
        }
    }

    fn reuse(&mut self) -> H {
        self.usage = self.usage.saturating_add(1);
        self.handle.clone()
    }

    pub fn usage(&self) -> u64 {
        self.usage
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub capacity: usize,
}

struct Inner<H> {
    entries: HashMap<String, CachedStatement<H>>,
    next_seq: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

pub struct PreparedStatementCache<P: Prepare> {
    preparer: Arc<P>,
    capacity: usize,
    inner: Mutex<Inner<P::Prepared>>,
}

impl<P: Prepare> PreparedStatementCache<P> {
    /// A capacity of zero is treated as one.
    pub fn new(preparer: Arc<P>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            preparer,
            capacity,
            inner: Mutex::new(Inner {
                entries: HashMap::with_capacity(capacity),
                next_seq: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    /// Cached handle for `cql`, compiling it on a miss.
    ///
    /// A hit bumps the usage counter. A fresh insert starts at zero. When the
    /// compile fails the cache is left untouched.
    pub async fn get_or_create(&self, cql: &str) -> GatewayResult<P::Prepared> {
        self.lookup(cql, true).await
    }

    /// Compile and insert each statement that is not cached yet. Already
    /// cached statements keep their usage count.
    pub async fn warm<S: AsRef<str>>(&self, statements: &[S]) -> GatewayResult<()> {
        for cql in statements {
            self.lookup(cql.as_ref(), false).await?;
        }
        Ok(())
    }

    async fn lookup(&self, cql: &str, count_reuse: bool) -> GatewayResult<P::Prepared> {
        {
            let mut inner = self.inner.lock().await;
            if let Some(handle) = inner.reuse(cql, count_reuse) {
                return Ok(handle);
            }
        }

        // compile without holding the lock
        let handle = self
            .preparer
            .prepare(cql)
            .await
            .map_err(GatewayError::prepare)?;

        let mut inner = self.inner.lock().await;
        // a concurrent miss on the same text may have won the race
        if let Some(existing) = inner.reuse(cql, count_reuse) {
            return Ok(existing);
        }
        inner.misses += 1;
        if inner.entries.len() >= self.capacity {
            inner.evict_least_used();
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .entries
            .insert(cql.to_string(), CachedStatement::new(handle.clone(), seq));
        debug!(size = inner.entries.len(), capacity = self.capacity, "cached prepared statement");
        Ok(handle)
    }

    pub async fn size(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn contains(&self, cql: &str) -> bool {
        self.inner.lock().await.entries.contains_key(cql)
    }

    /// Reuse count of a cached statement, `None` when absent.
    pub async fn usage(&self, cql: &str) -> Option<u64> {
        self.inner.lock().await.entries.get(cql).map(CachedStatement::usage)
    }

    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().await;
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            size: inner.entries.len(),
            capacity: self.capacity,
        }
    }
}

impl<H: Clone> Inner<H> {
    fn reuse(&mut self, cql: &str, count_reuse: bool) -> Option<H> {
        let entry = self.entries.get_mut(cql)?;
        if !count_reuse {
            return Some(entry.handle.clone());
        }
        let handle = entry.reuse();
        self.hits += 1;
        Some(handle)
    }

    /// Remove the entry with the smallest usage; ties go to the oldest insert.
    fn evict_least_used(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, e)| (e.usage, e.seq))
            .map(|(k, _)| k.clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
            self.evictions += 1;
            debug!(statement = %key, "evicted least used statement");
        }
    }
}
