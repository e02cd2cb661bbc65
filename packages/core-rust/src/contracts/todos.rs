//! `Todos` service: four operations sharing one endpoint, selected by `fn`.

use serde::{Deserialize, Serialize};

use crate::operation::{Operation, OperationSelector, ServiceContract};
use crate::wire::Unit;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Workflow state of a todo item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Todo,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub deadline: String,
    pub description: String,
    pub status: Status,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTodosRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTodoRequest {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTodoRequest {
    pub deadline: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteTodoRequest {
    pub id: i64,
}

// ---------------------------------------------------------------------------
// Service and operations
// ---------------------------------------------------------------------------

/// Operation names, as they appear on the wire.
pub mod operation_names {
    pub const GET_TODOS: &str = "getTodos";
    pub const GET_TODO: &str = "getTodo";
    pub const ADD_TODO: &str = "addTodo";
    pub const DELETE_TODO: &str = "deleteTodo";
}

pub struct Todos;

impl ServiceContract for Todos {
    const NAME: &'static str = "Todos";
    const SELECTOR: OperationSelector = OperationSelector::Named { param: "fn" };
    const OPERATIONS: &'static [&'static str] = &[
        operation_names::GET_TODOS,
        operation_names::GET_TODO,
        operation_names::ADD_TODO,
        operation_names::DELETE_TODO,
    ];
}

/// Lists every stored todo.
pub struct GetTodos;

impl Operation for GetTodos {
    type Service = Todos;
    type Request = GetTodosRequest;
    type Response = Vec<Todo>;
    const NAME: &'static str = operation_names::GET_TODOS;
}

/// Fetches one todo by id.
pub struct GetTodo;

impl Operation for GetTodo {
    type Service = Todos;
    type Request = GetTodoRequest;
    type Response = Todo;
    const NAME: &'static str = operation_names::GET_TODO;
}

/// Stores a new todo and returns it with its assigned id.
pub struct AddTodo;

impl Operation for AddTodo {
    type Service = Todos;
    type Request = AddTodoRequest;
    type Response = Todo;
    const NAME: &'static str = operation_names::ADD_TODO;
}

/// Removes a todo. Deleting a missing id is not an error.
pub struct DeleteTodo;

impl Operation for DeleteTodo {
    type Service = Todos;
    type Request = DeleteTodoRequest;
    type Response = Unit;
    const NAME: &'static str = operation_names::DELETE_TODO;
}
