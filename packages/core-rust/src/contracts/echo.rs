//! `Echo` service: a single operation bound to the whole endpoint.

use serde::{Deserialize, Serialize};

use crate::operation::{Operation, OperationSelector, ServiceContract};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoRequest {
    pub message: String,
}

pub struct Echo;

impl ServiceContract for Echo {
    const NAME: &'static str = "Echo";
    const SELECTOR: OperationSelector = OperationSelector::Fixed { operation: "echo" };
    const OPERATIONS: &'static [&'static str] = &["echo"];
}

/// Returns the request message.
pub struct EchoOp;

impl Operation for EchoOp {
    type Service = Echo;
    type Request = EchoRequest;
    type Response = String;
    const NAME: &'static str = "echo";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_selector_names_a_declared_operation() {
        let OperationSelector::Fixed { operation } = Echo::SELECTOR else {
            panic!("Echo is a single-operation service");
        };
        assert_eq!(Echo::declares(operation), Some(EchoOp::NAME));
    }

    #[test]
    fn message_is_required() {
        assert!(serde_json::from_str::<EchoRequest>("{}").is_err());
        assert!(serde_json::from_str::<EchoRequest>(r#"{"message": 3}"#).is_err());
    }
}
