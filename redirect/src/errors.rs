use crate::config::ValidationError;
use std::io;

#[derive(thiserror::Error, Debug)]
pub enum RedirectError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("could not build chat link: {0}")]
    InvalidLink(#[from] url::ParseError),

    #[error("could not build response: {0}")]
    Http(#[from] http::Error),
}
