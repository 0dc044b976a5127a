use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{SharedStore, StoreError};

enum Value {
    Zset(HashMap<String, i64>),
    Str(String),
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// 进程内的共享存储实现，支持过期语义
///
/// 用于单元测试和没有 Redis 的本地开发，行为与 [`RedisStore`](super::RedisStore)
/// 保持一致：过期的 key 在下次访问时被惰性清除。
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn evict_if_expired(entries: &mut HashMap<String, Entry>, key: &str) {
    if entries.get(key).is_some_and(Entry::expired) {
        entries.remove(key);
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn zadd(&self, key: &str, score: i64, member: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        evict_if_expired(&mut entries, key);
        let entry = entries.entry(key.to_string()).or_insert(Entry {
            value: Value::Zset(HashMap::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Zset(members) => {
                members.insert(member.to_string(), score);
            }
            // 与 Redis 不同，类型冲突时直接替换，测试中不会出现这种用法
            Value::Str(_) => {
                entry.value = Value::Zset(HashMap::from([(member.to_string(), score)]));
            }
        }
        Ok(())
    }

    async fn zremrangebyscore(&self, key: &str, min: i64, max: i64) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        evict_if_expired(&mut entries, key);
        if let Some(Entry {
            value: Value::Zset(members),
            ..
        }) = entries.get_mut(key)
        {
            members.retain(|_, score| *score < min || *score > max);
        }
        Ok(())
    }

    async fn zcard(&self, key: &str) -> Result<u64, StoreError> {
        let mut entries = self.entries.lock().unwrap();
        evict_if_expired(&mut entries, key);
        match entries.get(key) {
            Some(Entry {
                value: Value::Zset(members),
                ..
            }) => Ok(members.len() as u64),
            _ => Ok(0),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs)),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().unwrap();
        evict_if_expired(&mut entries, key);
        match entries.get(key) {
            Some(Entry {
                value: Value::Str(value),
                ..
            }) => Ok(Some(value.clone())),
            _ => Ok(None),
        }
    }

    async fn pexpire(&self, key: &str, ttl_ms: i64) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        evict_if_expired(&mut entries, key);
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + Duration::from_millis(ttl_ms.max(0) as u64));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zset_removal_and_count() {
        let store = MemoryStore::new();
        store.zadd("k", 100, "a").await.unwrap();
        store.zadd("k", 200, "b").await.unwrap();
        store.zadd("k", 300, "c").await.unwrap();
        assert_eq!(store.zcard("k").await.unwrap(), 3);

        store.zremrangebyscore("k", 0, 200).await.unwrap();
        assert_eq!(store.zcard("k").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn zadd_same_member_does_not_duplicate() {
        let store = MemoryStore::new();
        store.zadd("k", 100, "a").await.unwrap();
        store.zadd("k", 150, "a").await.unwrap();
        assert_eq!(store.zcard("k").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn string_value_expires() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 1).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn pexpire_evicts_whole_key() {
        let store = MemoryStore::new();
        store.zadd("k", 100, "a").await.unwrap();
        store.pexpire("k", 50).await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(store.zcard("k").await.unwrap(), 0);
    }
}
