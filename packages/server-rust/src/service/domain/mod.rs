//! Demo services wired onto the generated contracts.
//!
//! `todos` keeps an in-memory todo list behind `TodoStore`; `echo` returns
//! its input. Both are mounted by the `cedar-demo` binary and exercised by
//! the integration tests.

pub mod echo;
pub mod todos;

pub use echo::{echo_service, register_echo};
pub use todos::{register_todos, todos_service, TodoStore};
