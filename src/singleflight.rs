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

use std::time::{Duration, Instant};

use tracing::info;

use crate::cache::{AcquireResult, CacheGet, CacheStore};
use crate::config::{LOCK_MAX_WAIT_SEC, LOCK_SLEEP_MS, LOCK_TTL_SEC};
use crate::telemetry;

/// What a caller should do after contending for the per-fingerprint lock.
pub enum Decision {
    /// A peer (or the lock-unavailable degraded path) already has the
    /// answer cached; serve it directly.
    CacheHit(String),
    /// Proceed to call upstream. The caller must call [`release`] on every
    /// exit path once it does.
    CallUpstream,
}

fn lock_key(fingerprint: &str) -> String {
    format!("lock:{fingerprint}")
}

pub fn cache_key(fingerprint: &str) -> String {
    format!("cache:{fingerprint}")
}

/// Looks up `cache:<fingerprint>` directly, before any lock contention.
/// A store outage is treated as a miss.
pub async fn lookup(store: &dyn CacheStore, fingerprint: &str) -> Option<String> {
    match store.get(&cache_key(fingerprint)).await {
        CacheGet::Hit(body) => Some(body),
        CacheGet::Miss | CacheGet::Unavailable => None,
    }
}

/// Runs the acquire/wait protocol described in spec §4.4:
///
/// 1. Try to acquire `lock:<fingerprint>`.
/// 2. If acquired (or the store is unavailable, which degrades to
///    "proceed"), the caller becomes the leader and must call upstream.
/// 3. If not acquired, poll the cache every [`LOCK_SLEEP_MS`] until either
///    a payload appears or [`LOCK_MAX_WAIT_SEC`] elapses, then fall
///    through to calling upstream independently — duplicate work is
///    preferred over unbounded latency.
pub async fn acquire_or_wait(store: &dyn CacheStore, fingerprint: &str) -> Decision {
    match store.try_acquire(&lock_key(fingerprint), LOCK_TTL_SEC).await {
        AcquireResult::Acquired => Decision::CallUpstream,
        AcquireResult::Unavailable => Decision::CallUpstream,
        AcquireResult::NotAcquired => wait_for_cache(store, fingerprint).await,
    }
}

async fn wait_for_cache(store: &dyn CacheStore, fingerprint: &str) -> Decision {
    let deadline = Instant::now() + Duration::from_secs(LOCK_MAX_WAIT_SEC);
    let key = cache_key(fingerprint);

    loop {
        if let CacheGet::Hit(body) = store.get(&key).await {
            return Decision::CacheHit(body);
        }

        if Instant::now() >= deadline {
            info!("single-flight wait timed out for '{fingerprint}', calling upstream independently");
            let namespace = fingerprint.split(':').next().unwrap_or("unknown");
            telemetry::record_singleflight_timeout(namespace);
            return Decision::CallUpstream;
        }

        tokio::time::sleep(Duration::from_millis(LOCK_SLEEP_MS)).await;
    }
}

/// Publishes the final (possibly translated) body under `cache:<fingerprint>`.
/// Best-effort: a store failure here is logged by the store itself and
/// never surfaces to the caller.
pub async fn publish(store: &dyn CacheStore, fingerprint: &str, body: &str, ttl_secs: u64) {
    store.setex(&cache_key(fingerprint), body, ttl_secs).await;
}

/// Releases `lock:<fingerprint>`. Must be called on every exit path once
/// [`acquire_or_wait`] returned [`Decision::CallUpstream`], success or
/// failure alike — if it fails, the lock still expires at its TTL.
pub async fn release(store: &dyn CacheStore, fingerprint: &str) {
    store.release(&lock_key(fingerprint)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{AlwaysUnavailableStore, InMemoryCacheStore};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn leader_proceeds_to_upstream() {
        let store = InMemoryCacheStore::new();
        match acquire_or_wait(&store, "route:abc").await {
            Decision::CallUpstream => {}
            Decision::CacheHit(_) => panic!("first caller should be the leader"),
        }
    }

    #[tokio::test]
    async fn peer_waits_and_observes_published_result() {
        let store = Arc::new(InMemoryCacheStore::new());

        match acquire_or_wait(store.as_ref(), "route:abc").await {
            Decision::CallUpstream => {}
            Decision::CacheHit(_) => panic!("leader should win first"),
        }

        let publisher = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            publish(publisher.as_ref(), "route:abc", "{\"ok\":true}", 60).await;
        });

        match acquire_or_wait(store.as_ref(), "route:abc").await {
            Decision::CacheHit(body) => assert_eq!(body, "{\"ok\":true}"),
            Decision::CallUpstream => panic!("peer should have observed the published result"),
        }
    }

    #[tokio::test]
    async fn unavailable_store_degrades_to_call_upstream() {
        let store = AlwaysUnavailableStore;
        match acquire_or_wait(&store, "route:abc").await {
            Decision::CallUpstream => {}
            Decision::CacheHit(_) => panic!("unavailable store can never report a hit here"),
        }
    }

    #[tokio::test]
    async fn concurrent_identical_requests_single_flight_to_one_upstream_call() {
        let store = Arc::new(InMemoryCacheStore::new());
        let upstream_calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            let upstream_calls = upstream_calls.clone();
            handles.push(tokio::spawn(async move {
                if let Some(cached) = lookup(store.as_ref(), "table:abc").await {
                    return cached;
                }
                match acquire_or_wait(store.as_ref(), "table:abc").await {
                    Decision::CacheHit(body) => body,
                    Decision::CallUpstream => {
                        upstream_calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        let body = "{\"result\":42}".to_string();
                        publish(store.as_ref(), "table:abc", &body, 60).await;
                        release(store.as_ref(), "table:abc").await;
                        body
                    }
                }
            }));
        }

        let mut bodies = Vec::new();
        for handle in handles {
            bodies.push(handle.await.unwrap());
        }

        assert_eq!(upstream_calls.load(Ordering::SeqCst), 1);
        assert!(bodies.iter().all(|b| b == "{\"result\":42}"));
    }
}
