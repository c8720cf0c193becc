// Copyright (C) 2025 Matías Salinas (support@fenden.com)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod redis_store;

pub use redis_store::RedisStore;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// The process-wide cache store, published once at startup — mirrors the
/// teacher's `OnceCell`-backed global statics (e.g. `CONFIG`, `CACHE_WRITER`).
pub static CACHE_STORE: OnceCell<Arc<dyn CacheStore>> = OnceCell::new();

/// Outcome of a cache read. `Unavailable` is kept distinct from `Miss` so
/// callers can decide policy (the coordinator folds it into "miss"), but
/// the store itself never fails the caller's request over it.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheGet {
    Hit(String),
    Miss,
    Unavailable,
}

/// Outcome of a write-if-absent lock attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AcquireResult {
    Acquired,
    NotAcquired,
    Unavailable,
}

/// The narrow interface the core needs from the shared key-value store:
/// `GET`, `SETEX`, `SET NX EX`, `DEL`. Implementations must swallow their
/// own transport errors into the `Unavailable`/best-effort variants above —
/// a store outage degrades performance, never correctness.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheGet;

    /// Best-effort; failures are logged and otherwise ignored.
    async fn setex(&self, key: &str, value: &str, ttl_secs: u64);

    async fn try_acquire(&self, key: &str, ttl_secs: u64) -> AcquireResult;

    /// Best-effort; failures are logged and otherwise ignored — the lock
    /// will simply expire at its TTL.
    async fn release(&self, key: &str);
}

/// An in-process `CacheStore` double for tests, with no external
/// dependencies. Mirrors the narrow interface exactly, including TTL
/// expiry and write-if-absent semantics, so single-flight and handler
/// tests can exercise real cache-hit/lock-contention paths without Redis.
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_live(entry: &(String, Option<Instant>)) -> bool {
        match entry.1 {
            Some(expires_at) => Instant::now() < expires_at,
            None => true,
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> CacheGet {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if Self::is_live(entry) => CacheGet::Hit(entry.0.clone()),
            Some(_) => {
                entries.remove(key);
                CacheGet::Miss
            }
            None => CacheGet::Miss,
        }
    }

    async fn setex(&self, key: &str, value: &str, ttl_secs: u64) {
        let mut entries = self.entries.lock().unwrap();
        let expires_at = Instant::now() + Duration::from_secs(ttl_secs);
        entries.insert(key.to_string(), (value.to_string(), Some(expires_at)));
    }

    async fn try_acquire(&self, key: &str, ttl_secs: u64) -> AcquireResult {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get(key) {
            if Self::is_live(entry) {
                return AcquireResult::NotAcquired;
            }
        }
        let expires_at = Instant::now() + Duration::from_secs(ttl_secs);
        entries.insert(key.to_string(), ("1".to_string(), Some(expires_at)));
        AcquireResult::Acquired
    }

    async fn release(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
    }
}

/// A `CacheStore` that always reports the store as down, used to test the
/// "store outage degrades performance, never correctness" policy.
pub struct AlwaysUnavailableStore;

#[async_trait]
impl CacheStore for AlwaysUnavailableStore {
    async fn get(&self, _key: &str) -> CacheGet {
        CacheGet::Unavailable
    }

    async fn setex(&self, _key: &str, _value: &str, _ttl_secs: u64) {}

    async fn try_acquire(&self, _key: &str, _ttl_secs: u64) -> AcquireResult {
        AcquireResult::Unavailable
    }

    async fn release(&self, _key: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn miss_then_hit_after_setex() {
        let store = InMemoryCacheStore::new();
        assert_eq!(store.get("cache:route:abc").await, CacheGet::Miss);
        store.setex("cache:route:abc", "{}", 60).await;
        assert_eq!(
            store.get("cache:route:abc").await,
            CacheGet::Hit("{}".to_string())
        );
    }

    #[tokio::test]
    async fn second_acquire_fails_while_first_holds_lock() {
        let store = InMemoryCacheStore::new();
        assert_eq!(
            store.try_acquire("lock:route:abc", 30).await,
            AcquireResult::Acquired
        );
        assert_eq!(
            store.try_acquire("lock:route:abc", 30).await,
            AcquireResult::NotAcquired
        );
    }

    #[tokio::test]
    async fn release_allows_reacquire() {
        let store = InMemoryCacheStore::new();
        store.try_acquire("lock:route:abc", 30).await;
        store.release("lock:route:abc").await;
        assert_eq!(
            store.try_acquire("lock:route:abc", 30).await,
            AcquireResult::Acquired
        );
    }

    #[tokio::test]
    async fn expired_lock_can_be_reacquired() {
        let store = InMemoryCacheStore::new();
        store.try_acquire("lock:route:abc", 0).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(
            store.try_acquire("lock:route:abc", 30).await,
            AcquireResult::Acquired
        );
    }

    #[tokio::test]
    async fn unavailable_store_always_reports_unavailable() {
        let store = AlwaysUnavailableStore;
        assert_eq!(store.get("k").await, CacheGet::Unavailable);
        assert_eq!(
            store.try_acquire("k", 30).await,
            AcquireResult::Unavailable
        );
    }
}
