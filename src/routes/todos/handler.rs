use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::{
    AppState,
    cache::FetchError,
    limiter::{RateLimitDecision, RateLimiter},
    store::StoreError,
    utils::{ClientId, error_codes, error_to_api_response, success_to_api_response},
};

use super::model::{CreateTodoRequest, CreateTodoResponse, ToggleTodoRequest};

/// 共享存储故障时限流采取拒绝策略（fail-closed），宁可误伤也不放行
fn store_unavailable(e: StoreError) -> Response {
    tracing::error!("shared store error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_to_api_response::<()>(error_codes::STORE_UNAVAILABLE, "共享存储暂时不可用".to_string()),
    )
        .into_response()
}

fn upstream_unavailable(msg: String) -> Response {
    tracing::error!("upstream error: {}", msg);
    (
        StatusCode::BAD_GATEWAY,
        error_to_api_response::<()>(error_codes::UPSTREAM_UNAVAILABLE, "上游服务暂时不可用".to_string()),
    )
        .into_response()
}

/// 构造 429 响应，带 Retry-After 和剩余配额头
fn rate_limited(decision: &RateLimitDecision) -> Response {
    let retry_after = ((decision.reset_time - Utc::now().timestamp_millis()).max(0) as u64)
        .div_ceil(1000);
    (
        StatusCode::TOO_MANY_REQUESTS,
        [
            (header::RETRY_AFTER, retry_after.to_string()),
            (
                HeaderName::from_static("x-ratelimit-remaining"),
                decision.remaining.to_string(),
            ),
        ],
        error_to_api_response::<()>(
            error_codes::RATE_LIMIT,
            format!("请求过于频繁，请在{}秒后重试", retry_after),
        ),
    )
        .into_response()
}

async fn admit(limiter: &RateLimiter, identifier: &str) -> Result<RateLimitDecision, Response> {
    limiter
        .check_limit(identifier)
        .await
        .map_err(store_unavailable)
}

/// GET /todos — 先过读取限流器，再走旁路缓存
#[axum::debug_handler]
pub async fn list_todos(State(state): State<AppState>, ClientId(ip): ClientId) -> Response {
    let decision = match admit(&state.limiters.fetch_todos, &ip).await {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    if !decision.allowed {
        return rate_limited(&decision);
    }

    match state.fetcher.fetch().await {
        Ok(result) => {
            tracing::debug!("todos served from {:?} in {}ms", result.source, result.time_ms);
            (StatusCode::OK, success_to_api_response(result)).into_response()
        }
        Err(FetchError::Upstream(e)) => upstream_unavailable(e.to_string()),
        Err(FetchError::Store(e)) => store_unavailable(e),
        Err(FetchError::Codec(e)) => {
            tracing::error!("cache codec error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<()>(
                    error_codes::INTERNAL_ERROR,
                    "内部服务器错误".to_string(),
                ),
            )
                .into_response()
        }
    }
}

/// POST /todos — 先过新增限流器，再写上游
#[axum::debug_handler]
pub async fn create_todo(
    State(state): State<AppState>,
    ClientId(ip): ClientId,
    Json(req): Json<CreateTodoRequest>,
) -> Response {
    let decision = match admit(&state.limiters.add_todo, &ip).await {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    if !decision.allowed {
        return rate_limited(&decision);
    }

    let text = req.text.trim();
    if text.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response::<()>(
                error_codes::VALIDATION_ERROR,
                "待办内容不能为空".to_string(),
            ),
        )
            .into_response();
    }

    match state.upstream.create(text).await {
        Ok(todo) => (
            StatusCode::OK,
            success_to_api_response(CreateTodoResponse { todo }),
        )
            .into_response(),
        Err(e) => upstream_unavailable(e.to_string()),
    }
}

/// PATCH /todos/{id} — 切换完成状态
#[axum::debug_handler]
pub async fn toggle_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ClientId(ip): ClientId,
    Json(req): Json<ToggleTodoRequest>,
) -> Response {
    let decision = match admit(&state.limiters.todo_action, &ip).await {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    if !decision.allowed {
        return rate_limited(&decision);
    }

    match state.upstream.toggle(&id, req.completed).await {
        Ok(()) => (StatusCode::OK, success_to_api_response(())).into_response(),
        Err(e) => upstream_unavailable(e.to_string()),
    }
}

/// DELETE /todos/{id}
#[axum::debug_handler]
pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ClientId(ip): ClientId,
) -> Response {
    let decision = match admit(&state.limiters.todo_action, &ip).await {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    if !decision.allowed {
        return rate_limited(&decision);
    }

    match state.upstream.delete(&id).await {
        Ok(()) => (StatusCode::OK, success_to_api_response(())).into_response(),
        Err(e) => upstream_unavailable(e.to_string()),
    }
}
