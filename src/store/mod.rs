use async_trait::async_trait;
use thiserror::Error;

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// 共享存储操作失败（连接中断、命令出错等），与"未命中/未通过"的正常结果区分开
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("shared store unavailable: {0}")]
    Unavailable(String),
}

/// 共享键值存储的原子操作集合
///
/// 限流器和缓存读取器都只依赖这组操作，生产环境由 Redis 实现，
/// 测试环境可以换成进程内的 [`MemoryStore`]。
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// 向有序集合添加一个 (score, member) 成员
    async fn zadd(&self, key: &str, score: i64, member: &str) -> Result<(), StoreError>;

    /// 删除有序集合中 score 在 [min, max] 范围内的所有成员
    async fn zremrangebyscore(&self, key: &str, min: i64, max: i64) -> Result<(), StoreError>;

    /// 返回有序集合的成员数量
    async fn zcard(&self, key: &str) -> Result<u64, StoreError>;

    /// 写入字符串值并设置过期时间（秒）
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError>;

    /// 读取字符串值，不存在（或已过期）时返回 None
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// 刷新整个 key 的过期时间（毫秒）
    async fn pexpire(&self, key: &str, ttl_ms: i64) -> Result<(), StoreError>;
}
