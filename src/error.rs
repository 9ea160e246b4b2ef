/// Synchronous failures from the public API. Invalid arguments fail
/// before any side effect, and the caller's callback is never invoked.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("authParams must be a JSON object")]
    InvalidAuthParams,
    #[error("authenticate() is only callable while awaiting authentication")]
    NotAwaitingAuthentication,
    #[error("the connection is closed")]
    IsClosed,
}
