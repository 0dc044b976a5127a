use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient, aio::MultiplexedConnection};

use super::{SharedStore, StoreError};

/// 基于 Redis 的共享存储实现
///
/// 持有进程级的 Redis 客户端，每次操作获取一个多路复用的异步连接。
#[derive(Clone)]
pub struct RedisStore {
    redis: Arc<RedisClient>,
}

impl RedisStore {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }

    async fn conn(&self) -> Result<MultiplexedConnection, StoreError> {
        self.redis
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn zadd(&self, key: &str, score: i64, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .zadd(key, member, score)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn zremrangebyscore(&self, key: &str, min: i64, max: i64) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .zrembyscore(key, min, max)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn zcard(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn().await?;
        conn.zcard(key)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .set_ex(key, value, ttl_secs)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn().await?;
        conn.get(key)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn pexpire(&self, key: &str, ttl_ms: i64) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .pexpire(key, ttl_ms)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
