use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum KMeansError {
    /// Returned before any computation starts when shapes or parameters are unusable.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl KMeansError {
    pub fn invalid_argument(msg: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(KMeansError::InvalidArgument(msg.into()))
    }
}
