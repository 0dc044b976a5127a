use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::store::{SharedStore, StoreError};

/// 限流器默认的 key 前缀
const DEFAULT_KEY_PREFIX: &str = "ratelimit";

/// 单次限流检查的结果
///
/// `allowed = false` 是一个策略决定而不是错误，`remaining` 和 `reset_time`
/// 用于构造 429 响应的 Retry-After / X-RateLimit-Remaining 头。
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// 最早的计数事件过期的时间上界（毫秒时间戳）
    pub reset_time: i64,
}

/// 基于 Redis 有序集合的滑动窗口限流器
///
/// 每个标识符对应一个有序集合，score 为事件的毫秒时间戳。窗口随 "now"
/// 连续滑动，避免固定窗口在边界处放行双倍突发的问题。进程内不持有任何
/// 可变状态，多个实例通过不同的 `key_prefix` 共享同一个存储而互不干扰。
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn SharedStore>,
    window_ms: i64,
    max_requests: u32,
    key_prefix: String,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn SharedStore>,
        window_ms: i64,
        max_requests: u32,
        key_prefix: Option<&str>,
    ) -> Self {
        Self {
            store,
            window_ms,
            max_requests,
            key_prefix: key_prefix.unwrap_or(DEFAULT_KEY_PREFIX).to_string(),
        }
    }

    /// 检查一个标识符（通常是客户端 IP）是否允许新事件
    ///
    /// 先清理窗口外的旧事件并计数，只有允许时才记录本次事件并刷新整个
    /// key 的过期时间，被拒绝的调用不留任何痕迹，不会挤占后续配额。
    ///
    /// 计数和写入是两次独立的存储往返，同一标识符高并发时可能略微超出
    /// `max_requests`（见 DESIGN.md），存储层换成脚本实现即可收紧。
    pub async fn check_limit(&self, identifier: &str) -> Result<RateLimitDecision, StoreError> {
        let now = chrono::Utc::now().timestamp_millis();
        let window_start = now - self.window_ms;
        let key = format!("{}:{}", self.key_prefix, identifier);

        // 清理窗口外的事件，再统计窗口内剩下多少
        self.store.zremrangebyscore(&key, 0, window_start).await?;
        let count = self.store.zcard(&key).await?;

        let allowed = count < self.max_requests as u64;

        if allowed {
            // 同一毫秒内的重复 member 只会少记一次，无害
            self.store.zadd(&key, now, &now.to_string()).await?;
            self.store.pexpire(&key, self.window_ms).await?;
        }

        let remaining = (self.max_requests as u64).saturating_sub(count) as u32;

        Ok(RateLimitDecision {
            allowed,
            // 刚记录的事件本身也占用一个配额
            remaining: if allowed { remaining - 1 } else { remaining },
            reset_time: now + self.window_ms,
        })
    }
}

/// 按动作类型预置的三个限流器实例
///
/// key 前缀互不相同，因此同一个客户端在三类动作上的配额彼此独立。
#[derive(Clone)]
pub struct ActionLimiters {
    /// 读取 todo 列表
    pub fetch_todos: RateLimiter,
    /// 新增 todo
    pub add_todo: RateLimiter,
    /// 切换完成状态 / 删除
    pub todo_action: RateLimiter,
}

impl ActionLimiters {
    pub fn from_config(store: Arc<dyn SharedStore>, config: &Config) -> Self {
        let window_ms = config.rate_limit_window().as_millis() as i64;
        let max_requests = config.rate_limit_requests;
        Self {
            fetch_todos: RateLimiter::new(
                store.clone(),
                window_ms,
                max_requests,
                Some("ratelimit:fetch-todos"),
            ),
            add_todo: RateLimiter::new(
                store.clone(),
                window_ms,
                max_requests,
                Some("ratelimit:add-todo"),
            ),
            todo_action: RateLimiter::new(
                store,
                window_ms,
                max_requests,
                Some("ratelimit:todo-action"),
            ),
        }
    }
}
