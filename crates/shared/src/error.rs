use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewportError {
    #[error("viewport container was not provided")]
    MissingContainer,

    #[error("viewport container `{0}` could not be resolved")]
    UnresolvableContainer(String),

    #[error("invalid viewport configuration: {0}")]
    Config(#[from] serde_json::Error),
}
