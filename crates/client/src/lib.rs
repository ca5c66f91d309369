//! # docbridge client
//!
//! Resilient access layer for a document-oriented HTTP backend.
//!
//! The pieces compose bottom-up:
//! - [`transport`]: one-request-at-a-time HTTP contract and its reqwest
//!   implementation
//! - [`cache`]: request-signature keyed TTL cache with collection-scoped
//!   invalidation
//! - [`paginate`]: offset/limit driver that hides multi-page result sets
//! - [`batch`]: bulk creation with per-item failure isolation
//! - [`client`]: the public CRUD facade wiring the above together
//!
//! ```no_run
//! use docbridge_client::{DocBridgeClient, SearchOptions};
//! use docbridge_domain::{ClientConfig, Credentials};
//!
//! # async fn example() -> docbridge_domain::Result<()> {
//! let client = DocBridgeClient::new(
//!     Credentials::new("http://localhost:8000", "key", "secret"),
//!     ClientConfig::default(),
//! )?;
//!
//! let customers = client
//!     .search("Customer", SearchOptions::default().auto_paginate(true).limit(100))
//!     .await?;
//! println!("{} customers", customers.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod batch;
pub mod cache;
pub mod client;
pub mod paginate;
pub mod transport;

pub use cache::{CacheStore, RequestSignature};
pub use client::{DocBridgeClient, SearchOptions};
pub use transport::{ApiRequest, HttpTransport, Transport};
