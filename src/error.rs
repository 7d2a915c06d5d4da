/// Failures surfaced to the user. Every variant renders as a readable message,
/// there is no error code scheme.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("Please sign in to {0}")]
    Unauthenticated(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Generated course data is incomplete")]
    IncompleteCourse,
    #[error("{0}")]
    Remote(String),
    #[error("{0}")]
    Storage(String),
}

impl Error {
    pub fn remote(e: impl std::fmt::Display) -> Self {
        Error::Remote(e.to_string())
    }

    pub fn storage(e: impl std::fmt::Display) -> Self {
        Error::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
