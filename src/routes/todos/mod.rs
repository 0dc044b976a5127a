mod handler;
mod model;

pub use handler::{create_todo, delete_todo, list_todos, toggle_todo};
pub use model::{CreateTodoRequest, CreateTodoResponse, ToggleTodoRequest};
