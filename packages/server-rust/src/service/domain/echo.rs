use cedar_core::contracts::echo::{Echo, EchoOp, EchoRequest};

use crate::service::context::CallContext;
use crate::service::error::HandlerError;
use crate::service::rpc::RpcService;

impl RpcService<Echo> {
    pub fn handle_echo(
        &self,
        handler: impl Fn(&CallContext, EchoRequest) -> Result<String, HandlerError>
            + Send
            + Sync
            + 'static,
    ) -> &Self {
        self.handle::<EchoOp>(handler)
    }
}

/// Registers the handler that returns the message unchanged.
pub fn register_echo(service: &RpcService<Echo>) {
    service.handle_echo(|_ctx, req| Ok(req.message));
}

#[must_use]
pub fn echo_service() -> RpcService<Echo> {
    let service = RpcService::new();
    register_echo(&service);
    service
}
