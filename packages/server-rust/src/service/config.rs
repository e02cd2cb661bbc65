/// Per-service dispatch configuration.
///
/// Controls the transport-facing checks an `RpcService` performs before a
/// call reaches the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Largest request body accepted, in bytes. Larger bodies are rejected
    /// with 413 before any decoding.
    pub max_request_bytes: usize,
    /// Reject every method other than `POST` with 405.
    pub require_post: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_request_bytes: 1024 * 1024,
            require_post: true,
        }
    }
}
