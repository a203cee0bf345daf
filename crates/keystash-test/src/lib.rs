//! Keystash Test - shared test utilities for keystash crates.
//!
//! Provides a small blog schema with seeded data, storage doubles for the
//! fallback and failure paths, and logging helpers for tests.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! keystash-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use keystash_core::FindOptions;
//! use keystash_test::seeded_adapter;
//!
//! #[tokio::test]
//! async fn test_post_embeds_author() {
//!     let adapter = seeded_adapter().await;
//!     let payload = adapter
//!         .find_record("post", "p1", FindOptions::default())
//!         .await
//!         .unwrap();
//!     assert!(payload.embedded("author").is_some());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
