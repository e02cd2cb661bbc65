//! In-memory `Todos` service.

use std::collections::BTreeMap;
use std::sync::Arc;

use cedar_core::contracts::todos::{
    AddTodo, AddTodoRequest, DeleteTodo, DeleteTodoRequest, GetTodo, GetTodoRequest, GetTodos,
    GetTodosRequest, Status, Todo, Todos,
};
use cedar_core::Unit;
use parking_lot::Mutex;
use tracing::debug;

use crate::service::context::CallContext;
use crate::service::error::HandlerError;
use crate::service::rpc::RpcService;

#[derive(Debug, Default)]
struct TodoTable {
    seq: i64,
    rows: BTreeMap<i64, Todo>,
}

/// Todo list shared by every call to one `Todos` service.
///
/// Ids start at 1 and are never reused, even after a delete.
#[derive(Debug, Default)]
pub struct TodoStore {
    table: Mutex<TodoTable>,
}

impl TodoStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All todos in id order.
    #[must_use]
    pub fn list(&self) -> Vec<Todo> {
        self.table.lock().rows.values().cloned().collect()
    }

    #[must_use]
    pub fn get(&self, id: i64) -> Option<Todo> {
        self.table.lock().rows.get(&id).cloned()
    }

    /// Stores a new `todo`-status item and returns it with its id.
    pub fn add(&self, deadline: String, description: String) -> Todo {
        let mut table = self.table.lock();
        table.seq += 1;
        let todo = Todo {
            id: table.seq,
            deadline,
            description,
            status: Status::Todo,
        };
        table.rows.insert(todo.id, todo.clone());
        todo
    }

    /// Removes `id`, returning whether it was present.
    pub fn delete(&self, id: i64) -> bool {
        self.table.lock().rows.remove(&id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.lock().rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RpcService<Todos> {
    pub fn handle_get_todos(
        &self,
        handler: impl Fn(&CallContext, GetTodosRequest) -> Result<Vec<Todo>, HandlerError>
            + Send
            + Sync
            + 'static,
    ) -> &Self {
        self.handle::<GetTodos>(handler)
    }

    pub fn handle_get_todo(
        &self,
        handler: impl Fn(&CallContext, GetTodoRequest) -> Result<Todo, HandlerError>
            + Send
            + Sync
            + 'static,
    ) -> &Self {
        self.handle::<GetTodo>(handler)
    }

    pub fn handle_add_todo(
        &self,
        handler: impl Fn(&CallContext, AddTodoRequest) -> Result<Todo, HandlerError>
            + Send
            + Sync
            + 'static,
    ) -> &Self {
        self.handle::<AddTodo>(handler)
    }

    pub fn handle_delete_todo(
        &self,
        handler: impl Fn(&CallContext, DeleteTodoRequest) -> Result<Unit, HandlerError>
            + Send
            + Sync
            + 'static,
    ) -> &Self {
        self.handle::<DeleteTodo>(handler)
    }
}

/// Registers the four todo handlers on `service`, all backed by `store`.
pub fn register_todos(service: &RpcService<Todos>, store: Arc<TodoStore>) {
    let list = Arc::clone(&store);
    let get = Arc::clone(&store);
    let add = Arc::clone(&store);
    let delete = store;

    service
        .handle_get_todos(move |_ctx, _req| Ok(list.list()))
        .handle_get_todo(move |_ctx, req| {
            get.get(req.id).ok_or_else(|| HandlerError::new("todo not found"))
        })
        .handle_add_todo(move |ctx, req| {
            let todo = add.add(req.deadline, req.description);
            debug!(id = todo.id, request_id = ctx.request_id(), "todo added");
            Ok(todo)
        })
        .handle_delete_todo(move |_ctx, req| {
            delete.delete(req.id);
            Ok(Unit {})
        });
}

/// Builds a `Todos` service backed by `store`.
#[must_use]
pub fn todos_service(store: Arc<TodoStore>) -> RpcService<Todos> {
    let service = RpcService::new();
    register_todos(&service, store);
    service
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::service::error::DispatchError;

    use super::*;

    fn add_request(description: &str) -> AddTodoRequest {
        AddTodoRequest {
            deadline: "2024-01-01".to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn store_assigns_increasing_ids() {
        let store = TodoStore::new();
        assert!(store.is_empty());
        assert_eq!(store.add("d".into(), "a".into()).id, 1);
        assert_eq!(store.add("d".into(), "b".into()).id, 2);
        assert!(store.delete(1));
        assert!(!store.delete(1));
        assert_eq!(store.add("d".into(), "c".into()).id, 3);
        let ids: Vec<i64> = store.list().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn add_list_get_delete_scenario() {
        let store = Arc::new(TodoStore::new());
        let svc = todos_service(Arc::clone(&store));

        let first = svc
            .call::<AddTodo>(svc.local_context(), &add_request("x"))
            .await
            .unwrap();
        assert_eq!(
            first,
            Todo {
                id: 1,
                deadline: "2024-01-01".to_string(),
                description: "x".to_string(),
                status: Status::Todo,
            }
        );
        let second = svc
            .call::<AddTodo>(svc.local_context(), &add_request("y"))
            .await
            .unwrap();
        assert_eq!(second.id, 2);

        let all = svc
            .call::<GetTodos>(svc.local_context(), &GetTodosRequest {})
            .await
            .unwrap();
        assert_eq!(all, vec![first.clone(), second.clone()]);

        for expected in [&first, &second] {
            let fetched = svc
                .call::<GetTodo>(svc.local_context(), &GetTodoRequest { id: expected.id })
                .await
                .unwrap();
            assert_eq!(&fetched, expected);
        }

        svc.call::<DeleteTodo>(svc.local_context(), &DeleteTodoRequest { id: 1 })
            .await
            .unwrap();
        let err = svc
            .call::<GetTodo>(svc.local_context(), &GetTodoRequest { id: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Handler(_)));
        assert_eq!(err.to_string(), "todo not found");
        assert_eq!(store.len(), 1);

        let remaining = svc
            .call::<GetTodos>(svc.local_context(), &GetTodosRequest {})
            .await
            .unwrap();
        assert_eq!(remaining, vec![second]);
    }

    #[tokio::test]
    async fn delete_reply_is_an_empty_object() {
        let svc = todos_service(Arc::new(TodoStore::new()));
        let bytes = svc
            .dispatch(svc.local_context(), "deleteTodo", r#"{"id":99}"#)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"{}");
    }

    #[tokio::test]
    async fn add_todo_missing_description_is_bad_request() {
        let svc = todos_service(Arc::new(TodoStore::new()));
        let err = svc
            .dispatch(svc.local_context(), "addTodo", r#"{"deadline":"2024-01-01"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::BadRequest { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_get_distinct_ids() {
        const N: usize = 64;
        let store = Arc::new(TodoStore::new());
        let svc = todos_service(Arc::clone(&store));

        let mut tasks = Vec::with_capacity(N);
        for i in 0..N {
            let svc = svc.clone();
            tasks.push(tokio::spawn(async move {
                svc.call::<AddTodo>(svc.local_context(), &add_request(&format!("t{i}")))
                    .await
                    .unwrap()
                    .id
            }));
        }

        let mut ids = HashSet::new();
        for task in tasks {
            ids.insert(task.await.unwrap());
        }
        assert_eq!(ids.len(), N);
        assert_eq!(store.len(), N);
        assert_eq!(ids.iter().max(), Some(&i64::try_from(N).unwrap()));
    }

    #[test]
    fn all_operations_are_registered() {
        let svc = todos_service(Arc::new(TodoStore::new()));
        assert_eq!(
            svc.registry().registered(),
            vec!["addTodo", "deleteTodo", "getTodo", "getTodos"]
        );
    }
}
