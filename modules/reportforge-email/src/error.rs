use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Email gateway error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, EmailError>;
