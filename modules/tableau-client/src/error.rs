use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableauError {
    #[error("Authentication failed for site {site}: {message}")]
    AuthFailed { site: String, message: String },

    #[error("Workbook not found: {0}")]
    WorkbookNotFound(String),

    #[error("Failed to list views: {0}")]
    ViewListingFailed(String),

    #[error("Failed to fetch view {view_key}: {message}")]
    ViewFetchFailed { view_key: String, message: String },

    #[error("Tableau API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, TableauError>;
