use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::store::{SharedStore, StoreError};
use crate::upstream::{Todo, TodoSource, UpstreamError};

/// 本次读取由哪条路径提供
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchSource {
    Cache,
    Upstream,
}

/// 一次读取的结果，`source` 和 `time_ms` 用于观测缓存效果
#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub source: FetchSource,
    pub data: Vec<Todo>,
    pub time_ms: u64,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("cache codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// 旁路缓存读取器
///
/// 读取时先查缓存槽，未命中才调用上游并以 TTL 回填。所有调用方共享同
/// 一个静态 cache key，写路径不做任何主动失效，读到的数据最多滞后一个
/// TTL，这是有意的取舍而不是缺陷。
#[derive(Clone)]
pub struct CacheAsideFetcher {
    store: Arc<dyn SharedStore>,
    upstream: Arc<dyn TodoSource>,
    cache_key: String,
    ttl_secs: u64,
}

impl CacheAsideFetcher {
    pub fn new(
        store: Arc<dyn SharedStore>,
        upstream: Arc<dyn TodoSource>,
        cache_key: &str,
        ttl_secs: u64,
    ) -> Self {
        Self {
            store,
            upstream,
            cache_key: cache_key.to_string(),
            ttl_secs,
        }
    }

    /// 读取 todo 列表，命中缓存时不接触上游
    ///
    /// 缓存槽一旦存在即视为新鲜，不与上游校验。上游失败时不写缓存，
    /// 已有的缓存槽也保持原样。冷缓存下并发未命中的调用各自回源、重复
    /// 回填，后写者覆盖先写者，不影响正确性。
    pub async fn fetch(&self) -> Result<FetchResult, FetchError> {
        let started = Instant::now();

        if let Some(cached) = self.store.get(&self.cache_key).await? {
            match serde_json::from_str::<Vec<Todo>>(&cached) {
                Ok(data) => {
                    return Ok(FetchResult {
                        source: FetchSource::Cache,
                        data,
                        time_ms: started.elapsed().as_millis() as u64,
                    });
                }
                // 槽里的内容解析不了就当作未命中，回源后覆盖掉
                Err(e) => {
                    tracing::warn!("cached value for {} is corrupt: {}", self.cache_key, e);
                }
            }
        }

        let data = self.upstream.get_all().await?;

        let serialized = serde_json::to_string(&data)?;
        self.store
            .set_ex(&self.cache_key, &serialized, self.ttl_secs)
            .await?;

        Ok(FetchResult {
            source: FetchSource::Upstream,
            data,
            time_ms: started.elapsed().as_millis() as u64,
        })
    }
}
