use axum::{
    Router,
    routing::{get, patch},
};

use crate::{AppState, middleware::log_errors};

pub mod todos;

/// 组装完整的应用路由，测试里也用它来构建被测应用
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/todos", get(todos::list_todos).post(todos::create_todo))
        .route(
            "/todos/{id}",
            patch(todos::toggle_todo).delete(todos::delete_todo),
        );

    let base_uri = state.config.api_base_uri.clone();
    Router::new()
        .nest(&base_uri, api)
        .layer(axum::middleware::from_fn(log_errors))
        .with_state(state)
}
