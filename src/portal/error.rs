use thiserror::Error;

use crate::browser::BrowserError;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("no beneficiaries found for query {query:?}")]
    NoResults { query: Option<String> },

    #[error("could not resolve benefit card {link}: {source}")]
    CardResolution {
        link: String,
        #[source]
        source: BrowserError,
    },

    #[error("could not assemble subject {url}: {source}")]
    SubjectResolution {
        url: String,
        #[source]
        source: BrowserError,
    },

    #[error("unrecognised benefit segment `{0}`")]
    UnknownSegment(String),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}
