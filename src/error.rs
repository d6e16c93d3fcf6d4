use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaneError {
    #[error("API error: {0}")]
    Api(String),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("Repository not found: {0}")]
    NotFound(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PaneError>;
