use serde::{Deserialize, Serialize};

use crate::upstream::Todo;

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CreateTodoResponse {
    pub todo: Todo,
}

#[derive(Debug, Deserialize)]
pub struct ToggleTodoRequest {
    pub completed: bool,
}
