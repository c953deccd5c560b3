//! # verge-core
//!
//! Core types and utilities for working with the VergeOS API.
//!
//! This crate provides foundational types, error handling, configuration and
//! the HTTP transport that resource clients (such as `verge-nas`) build on.
//!
//! ## Modules
//!
//! - [`error`] - Error types and HTTP status code mapping
//! - [`keys`] - Strongly-typed resource key wrappers
//! - [`config`] - Connection configuration and environment loading
//! - [`transport`] - The [`Transport`] request seam
//! - [`client`] - reqwest-backed transport, retry logic
//! - [`query`] - Query parameter builder

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod keys;
pub mod query;
pub mod transport;

// Re-export commonly used types
pub use client::{ServiceClient, ServiceClientBuilder};
pub use config::VergeClientConfig;
pub use error::{Error, Result};
pub use keys::{JobKey, VolumeKey};
pub use transport::{ApiRequest, Transport};
