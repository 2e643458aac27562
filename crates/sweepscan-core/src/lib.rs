//! Recursive time-slicing search driver and credential-pool rate governor
//! for harvesting public code-platform search results within a date
//! window, streamed to a [`sink::Sink`] for downstream consumption.

pub mod config;
pub mod driver;
pub mod error;
pub mod gist;
pub mod governor;
pub mod sink;
pub mod transport;
pub mod types;

pub use config::ScanConfig;
pub use driver::SearchDriver;
pub use error::{DriverError, GovernorError, TransportError};
pub use gist::GistScraper;
pub use governor::{Directive, Governor};
pub use sink::{ScanState, Sink};
pub use transport::{Response, Transport};
pub use types::{
    Credential, Granularity, ResourceKind, ResultKind, ResultRecord, SearchQuery, TimeSlice,
};
