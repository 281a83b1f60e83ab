//! arscan - read-side client for Arweave drives.
//!
//! Queries transactions through a GraphQL gateway, rebuilds ArFS drives,
//! folders and files from their tagged transactions, and verifies that every
//! file of a drive can be retrieved.
//!
//! - [`ledger`] - transaction entries, query construction and pagination
//! - [`arfs`] - entity ownership, state replay and history
//! - [`verify`] - per-file health and numeric gap detection
//! - [`gateway`] - transport traits and the HTTP implementation

pub mod arfs;
pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod reliability;
pub mod report;
pub mod utils;
pub mod verify;

pub use error::{Error, Result};
