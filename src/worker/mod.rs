//! Scheduled background jobs: grant expiration and expiry-lookahead
//! notification, run out-of-process via the `warden-worker` binary.

pub mod expiration;

pub use expiration::ExpirationWorker;
