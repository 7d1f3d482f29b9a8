#![forbid(unsafe_code)]

use serde::Deserialize;
use todo_core::ids::TodoId;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CreateTodoRequest {
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct UpdateTodoRequest {
    pub id: TodoId,
    pub body: Option<String>,
    pub completed: Option<bool>,
}
