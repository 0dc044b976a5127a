use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 上游数据源中的待办事项
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Todo {
    pub id: String,
    pub text: String,
    pub completed: bool,
    /// 创建时间（毫秒时间戳）
    pub created_at: i64,
}

/// 上游请求失败（网络错误、非 2xx 响应、响应解析失败等）
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        UpstreamError::Unavailable(e.to_string())
    }
}

/// 上游数据源的请求/响应接口
///
/// 生产环境指向远端的 todo API，测试环境用可编排的假实现替代。
#[async_trait]
pub trait TodoSource: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Todo>, UpstreamError>;

    async fn create(&self, text: &str) -> Result<Todo, UpstreamError>;

    async fn toggle(&self, id: &str, completed: bool) -> Result<(), UpstreamError>;

    async fn delete(&self, id: &str) -> Result<(), UpstreamError>;
}

#[derive(Serialize)]
struct CreateTodoBody<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct ToggleTodoBody {
    completed: bool,
}

/// 通过 HTTP 访问上游 todo API 的客户端
#[derive(Clone)]
pub struct HttpTodoSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTodoSource {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl TodoSource for HttpTodoSource {
    async fn get_all(&self) -> Result<Vec<Todo>, UpstreamError> {
        let todos = self
            .client
            .get(self.url("/todos"))
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Todo>>()
            .await?;
        Ok(todos)
    }

    async fn create(&self, text: &str) -> Result<Todo, UpstreamError> {
        let todo = self
            .client
            .post(self.url("/todos"))
            .json(&CreateTodoBody { text })
            .send()
            .await?
            .error_for_status()?
            .json::<Todo>()
            .await?;
        Ok(todo)
    }

    async fn toggle(&self, id: &str, completed: bool) -> Result<(), UpstreamError> {
        self.client
            .patch(self.url(&format!("/todos/{}", id)))
            .json(&ToggleTodoBody { completed })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), UpstreamError> {
        self.client
            .delete(self.url(&format!("/todos/{}", id)))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
