// SPDX-FileCopyrightText: 2026 Conecta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-lived result cache.
//!
//! The response consumer writes asynchronous provider results here and
//! synchronous callers poll for them by key.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::error::BusError;

#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), BusError>;
    async fn get(&self, key: &str) -> Result<Option<String>, BusError>;
}

/// In-memory cache with lazy expiry on read.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, (_, expires_at)| *expires_at > now);
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), BusError> {
        self.entries
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BusError> {
        let now = Instant::now();
        let hit = match self.entries.get(key) {
            Some(entry) if entry.1 > now => Some(entry.0.clone()),
            Some(_) => None,
            None => return Ok(None),
        };
        if hit.is_none() {
            self.entries.remove(key);
        }
        Ok(hit)
    }
}

#[cfg(feature = "redis")]
pub use self::redis_cache::RedisCache;

#[cfg(feature = "redis")]
mod redis_cache {
    use std::time::Duration;

    use async_trait::async_trait;
    use redis::AsyncCommands;
    use redis::aio::ConnectionManager;

    use super::ResultCache;
    use crate::error::BusError;

    /// `SET key value EX ttl` on Redis.
    #[derive(Clone)]
    pub struct RedisCache {
        conn: ConnectionManager,
    }

    impl RedisCache {
        pub fn new(conn: ConnectionManager) -> Self {
            Self { conn }
        }
    }

    #[async_trait]
    impl ResultCache for RedisCache {
        async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), BusError> {
            let mut conn = self.conn.clone();
            let seconds = ttl.as_secs().max(1);
            let _: () = conn.set_ex(key, value, seconds).await?;
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Option<String>, BusError> {
            let mut conn = self.conn.clone();
            let value: Option<String> = conn.get(key).await?;
            Ok(value)
        }
    }
}
