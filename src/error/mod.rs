use std::time::Duration;
use thiserror::Error;

/// Faults raised by a [`PageDriver`](crate::driver::PageDriver).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    #[error("driver: {0}")]
    Backend(String),
}

/// Faults that make the listing itself unreachable and end the run.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("listing {url} unreachable: {source}")]
    ListingUnreachable {
        url: String,
        #[source]
        source: DriverError,
    },

    #[error("listing table never appeared on page {page}: {source}")]
    ListingNeverAppeared {
        page: u32,
        #[source]
        source: DriverError,
    },
}
