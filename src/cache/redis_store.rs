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

use async_trait::async_trait;
use bb8::Pool;
use bb8_redis::RedisConnectionManager;
use tracing::warn;

use super::{AcquireResult, CacheGet, CacheStore};

/// A Redis-backed `CacheStore`, pooled via `bb8` the way
/// `faradayio-geocode-csv`'s `key_value_stores::redis` wires its own
/// connection pool. Every fallible operation is logged and folded into the
/// `Unavailable`/best-effort variants `CacheStore` defines — the core never
/// sees a Redis error directly.
pub struct RedisStore {
    pool: Pool<RedisConnectionManager>,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, String> {
        let manager = RedisConnectionManager::new(redis_url)
            .map_err(|e| format!("could not create Redis connection manager: {e}"))?;
        let pool = Pool::builder()
            .build(manager)
            .await
            .map_err(|e| format!("could not create Redis connection pool: {e}"))?;
        Ok(RedisStore { pool })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> CacheGet {
        let mut conn = match self.pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Redis GET: could not obtain pooled connection: {e}");
                return CacheGet::Unavailable;
            }
        };

        match redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut *conn)
            .await
        {
            Ok(Some(value)) => CacheGet::Hit(value),
            Ok(None) => CacheGet::Miss,
            Err(e) => {
                warn!("Redis GET failed for '{key}': {e}");
                CacheGet::Unavailable
            }
        }
    }

    async fn setex(&self, key: &str, value: &str, ttl_secs: u64) {
        let mut conn = match self.pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Redis SETEX: could not obtain pooled connection: {e}");
                return;
            }
        };

        if let Err(e) = redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_secs)
            .arg(value)
            .query_async::<_, ()>(&mut *conn)
            .await
        {
            warn!("Redis SETEX failed for '{key}': {e}");
        }
    }

    async fn try_acquire(&self, key: &str, ttl_secs: u64) -> AcquireResult {
        let mut conn = match self.pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Redis SET NX: could not obtain pooled connection: {e}");
                return AcquireResult::Unavailable;
            }
        };

        match redis::cmd("SET")
            .arg(key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<_, Option<String>>(&mut *conn)
            .await
        {
            Ok(Some(_)) => AcquireResult::Acquired,
            Ok(None) => AcquireResult::NotAcquired,
            Err(e) => {
                warn!("Redis SET NX EX failed for '{key}': {e}");
                AcquireResult::Unavailable
            }
        }
    }

    async fn release(&self, key: &str) {
        let mut conn = match self.pool.get().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Redis DEL: could not obtain pooled connection: {e}");
                return;
            }
        };

        if let Err(e) = redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut *conn)
            .await
        {
            warn!("Redis DEL failed for '{key}': {e}");
        }
    }
}
