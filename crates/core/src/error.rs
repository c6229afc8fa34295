use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookmarkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("top-level document must be a sequence of bookmark mappings, found {0}")]
    NotASequence(&'static str),
    #[error("bookmark schema is invalid: {0}")]
    Schema(String),
}

pub type Result<T> = std::result::Result<T, BookmarkError>;
