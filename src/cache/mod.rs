// 请求缓存模块
// 读操作按缓存键合并并发请求、在新鲜期内直接返回缓存；写操作成功后失效受影响的键。
// 进程内使用 moka，配置了 REDIS_URL 时再加一层 redis 共享缓存。
// 每个键带一个代数，失效时加一：失效前已经开始的加载只能写入旧代数的条目，之后的读取不会再命中或等待它。

pub mod keys;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;
use redis::{AsyncCommands, Client as RedisClient};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult};

pub use keys::{Mutation, QueryKey};

const MAX_ENTRIES: u64 = 10_000;

/// 内存条目的键：缓存键加代数
type MemoryKey = (String, u64);

#[derive(Debug, Clone)]
struct CachedValue {
    json: Arc<String>,
    ttl: Duration,
}

/// 每个条目按自己的新鲜期过期
struct FreshnessExpiry;

impl Expiry<MemoryKey, CachedValue> for FreshnessExpiry {
    fn expire_after_create(
        &self,
        _key: &MemoryKey,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

#[derive(Clone)]
pub struct QueryCache {
    memory: Cache<MemoryKey, CachedValue>,
    /// 只记录被失效过的键，未出现的键代数为 0
    generations: Arc<Mutex<HashMap<String, u64>>>,
    redis: Option<Arc<RedisClient>>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(None)
    }
}

impl QueryCache {
    pub fn new(redis: Option<Arc<RedisClient>>) -> Self {
        Self {
            memory: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .expire_after(FreshnessExpiry)
                .build(),
            generations: Arc::default(),
            redis,
        }
    }

    /// 按缓存键读取；未命中时执行 `fetch`，相同键的并发调用只会执行一次。失败结果不缓存。
    pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, fetch: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        self.fetch_with_freshness(key, key.freshness(), fetch).await
    }

    pub(crate) async fn fetch_with_freshness<T, F, Fut>(
        &self,
        key: &QueryKey,
        ttl: Duration,
        fetch: F,
    ) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let cache_key = key.cache_key();
        let generation = self.generation(&cache_key);

        let init = async {
            if let Some(cached) = self.redis_get(&cache_key).await {
                return Ok(cached);
            }
            let value = fetch().await?;
            let json = serde_json::to_string(&value)?;
            // 加载期间键已失效，结果可能是写入前的数据，不写入共享缓存
            if self.generation(&cache_key) == generation {
                self.redis_set(&cache_key, &json, ttl).await;
            }
            Ok::<_, AppError>(CachedValue {
                json: Arc::new(json),
                ttl,
            })
        };

        let entry = self
            .memory
            .entry((cache_key.clone(), generation))
            .or_try_insert_with(init)
            .await
            .map_err(|e| (*e).clone())?;

        if entry.is_fresh() {
            tracing::debug!("Query cache miss: {}", cache_key);
        } else {
            tracing::debug!("Query cache hit: {}", cache_key);
        }

        Ok(serde_json::from_str(&entry.into_value().json)?)
    }

    pub async fn invalidate(&self, key: &QueryKey) {
        let cache_key = key.cache_key();
        let previous = self.bump_generation(&cache_key);
        self.memory.invalidate(&(cache_key.clone(), previous)).await;

        if let Some(redis) = &self.redis {
            if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
                let result: Result<(), redis::RedisError> = conn.del(&cache_key).await;
                if let Err(e) = result {
                    tracing::warn!("Failed to delete {} from redis: {}", cache_key, e);
                }
            }
        }
        tracing::debug!("Query cache invalidated: {}", cache_key);
    }

    /// 写操作成功后调用，失效它影响到的所有键
    pub async fn invalidate_for(&self, mutation: &Mutation) {
        for key in mutation.invalidates() {
            self.invalidate(&key).await;
        }
    }

    fn generation(&self, cache_key: &str) -> u64 {
        match self.generations.lock() {
            Ok(generations) => generations.get(cache_key).copied().unwrap_or(0),
            Err(poisoned) => poisoned.into_inner().get(cache_key).copied().unwrap_or(0),
        }
    }

    /// 代数加一，返回旧代数
    fn bump_generation(&self, cache_key: &str) -> u64 {
        let mut generations = match self.generations.lock() {
            Ok(generations) => generations,
            Err(poisoned) => poisoned.into_inner(),
        };
        let current = generations.entry(cache_key.to_string()).or_insert(0);
        let previous = *current;
        *current += 1;
        previous
    }

    /// 从 redis 读取，同时取剩余有效期；redis 不可用时当作未命中
    async fn redis_get(&self, cache_key: &str) -> Option<CachedValue> {
        let redis = self.redis.as_ref()?;
        let mut conn = redis.get_multiplexed_async_connection().await.ok()?;

        let result: redis::RedisResult<(Option<String>, i64)> = redis::pipe()
            .get(cache_key)
            .pttl(cache_key)
            .query_async(&mut conn)
            .await;

        match result {
            Ok((Some(json), remaining_ms)) if remaining_ms > 0 => {
                tracing::debug!("Get {} from redis", cache_key);
                Some(CachedValue {
                    json: Arc::new(json),
                    ttl: Duration::from_millis(remaining_ms as u64),
                })
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Failed to read {} from redis: {}", cache_key, e);
                None
            }
        }
    }

    async fn redis_set(&self, cache_key: &str, json: &str, ttl: Duration) {
        let Some(redis) = &self.redis else {
            return;
        };
        if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
            let result: Result<(), redis::RedisError> =
                conn.set_ex(cache_key, json, ttl.as_secs().max(1)).await;
            match result {
                Ok(()) => tracing::debug!("Set {} to redis", cache_key),
                Err(e) => tracing::warn!("Failed to write {} to redis: {}", cache_key, e),
            }
        }
    }
}
