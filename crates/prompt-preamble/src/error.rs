use thiserror::Error;

/// Failure while injecting into an untyped request body.
///
/// The typed operations never fail; these only come out of [`crate::raw`].
#[derive(Debug, Error)]
pub enum InjectError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("body is neither a message array nor an object with a `messages` array")]
    NotAMessageList,
    #[error("message {index}: missing `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("message {index}: `{field}` must be {expected}")]
    WrongType {
        index: usize,
        field: &'static str,
        expected: &'static str,
    },
}
