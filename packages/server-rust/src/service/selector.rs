//! Operation selection from an inbound request.

use cedar_core::OperationSelector;
use serde_json::{Map, Value};

use super::context::CallContext;
use super::error::DispatchError;

/// Derives the operation name for a call.
///
/// For `Named` services the query parameter wins over the body envelope; the
/// body is only parsed when the query does not carry the name.
///
/// # Errors
///
/// `MissingOperation` when neither the query nor the envelope names an
/// operation, `BadRequest` when the envelope has to be read and is not a
/// JSON object.
pub fn select_operation(
    selector: OperationSelector,
    ctx: &CallContext,
    payload: &[u8],
) -> Result<String, DispatchError> {
    match selector {
        OperationSelector::Fixed { operation } => Ok(operation.to_string()),
        OperationSelector::Named { param } => {
            if let Some(name) = ctx.query_param(param) {
                return Ok(name);
            }
            let envelope: Map<String, Value> =
                serde_json::from_slice(payload).map_err(DispatchError::bad_request)?;
            match envelope.get(param) {
                Some(Value::String(name)) => Ok(name.clone()),
                Some(_) => Err(DispatchError::bad_request(format!(
                    "operation selector `{param}` must be a string"
                ))),
                None => Err(DispatchError::MissingOperation { param }),
            }
        }
    }
}
