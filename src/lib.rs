#![deny(clippy::all, clippy::pedantic)]
#![deny(missing_docs)]
#![allow(clippy::must_use_candidate)]
//! # redrules
//!
//! redrules is a convenient wrapper library around Reddit's subreddit
//! rules API.
//!
//! This library can fetch and manage:
//! - [`SubredditRules`]: the ordered rule listing of a subreddit.
//! - [`Rule`]: a single rule, loaded lazily on first attribute access.
//!
//! While respecting:
//! - 1 second-per-request rate-limits.
//! - Reddit's `api_type=json` enveloped replies on write endpoints.
//!
//! ## Example: Printing the description of a rule.
//!
//! ```rust,no_run
//! # type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
//! use redrules::rules::SubredditRules;
//! use redrules::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::with_token("oauth-token");
//!     let rules = SubredditRules::new("rust");
//!
//!     // no request happens here..
//!     let rule = rules.get(&client, "No spam").await?;
//!
//!     // ..the listing is fetched on first attribute access
//!     println!("{}: {}", rule.short_name(), rule.description(&client).await?);
//!     Ok(())
//! }
//! ```
//!
//! [`SubredditRules`]: crate::rules::SubredditRules
//! [`Rule`]: crate::rule::Rule

/// Client module contains [`Client`] for dispatching API requests.
pub mod client;

/// Contains [`Error`]s that can be thrown by the library.
///
/// [`Error`]: crate::error::Error
pub mod error;

pub(crate) mod form;

pub(crate) mod models;

pub(crate) mod result;

pub use client::Client;
pub use models::*;
