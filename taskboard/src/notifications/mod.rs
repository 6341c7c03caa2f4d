//! Notification cache and background poller.
//!
//! The cache keeps the last fetched list with local read flags laid on
//! top; the poller refreshes it on a fixed interval.

pub mod cache;
pub mod poller;

pub use cache::NotificationCache;
pub use poller::{DEFAULT_POLL_INTERVAL, NotificationPoller};
