//! Remote text access
//!
//! - `text_client`: REST calls against the text API
//! - `latest`: cancellable, superseding requests for view state

pub mod latest;
pub mod text_client;

pub use latest::{FetchState, LatestRequest, Tracked};
pub use text_client::{find_book, TextClient, VerseComparison};
