use thiserror::Error;

/// Failure of the initial event-log request.
///
/// Returned inside an `anyhow::Error`; callers that care can `downcast_ref`.
#[derive(Debug, Error, PartialEq)]
pub enum ProviderError {
    /// The provider answered with a JSON error body.
    #[error("provider rejected the request ({status}): {message}")]
    Api { status: u16, message: String },

    /// The provider answered with something we cannot interpret.
    #[error("unknown provider error (HTTP {status})")]
    Unknown { status: u16 },
}
