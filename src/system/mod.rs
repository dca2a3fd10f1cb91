//! # System Interaction Layer
//!
//! The boundary between the engine and the outside world.
//!
//! ## Modules
//!
//! - **`storage`**: whole-document reads and atomic writes under the user config
//!   directory, plus the file listing and copying that backups need.
//! - **`downloader`**: fetches remote icons over HTTP(S) with a hard timeout,
//!   behind the `IconFetcher` trait so hosts and tests can replace the network.

pub mod downloader;
pub mod storage;
