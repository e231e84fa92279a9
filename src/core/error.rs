use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Empty input: no projection records to summarize")]
    EmptyInput,
}

impl ProjectionError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ProjectionError::InvalidParameter(msg.into())
    }
}
