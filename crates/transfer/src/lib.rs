//! FTP retrieval operations over an authenticated session.
//!
//! Three services on top of [`finfetch_client::Session`]: directory
//! name listing, whole-file fetching with local-conflict backup, and
//! chunked downloading with bounded transient-error retry. Progress is
//! observable through the [`TransferEvent`] channel owned by
//! [`Fetcher`] and [`Downloader`].

pub mod download;
pub mod error;
pub mod fetch;
pub mod list;
pub mod types;


pub use download::Downloader;
pub use error::TransferError;
pub use fetch::Fetcher;
pub use list::{list_names, split_name_list};
pub use types::{FetchOutcome, RetryPolicy, TransferEvent};

/// Capacity of the event channels owned by `Fetcher` and `Downloader`.
///
/// Emission is non-blocking; events beyond this buffer are dropped when
/// the receiver lags.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
