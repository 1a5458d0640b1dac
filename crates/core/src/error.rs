#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Malformed controller response: {0}")]
    MalformedResponse(String),
}
