use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by rule operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure from the underlying HTTP client.
    #[error("{0}")]
    Reqwest(#[from] reqwest::Error),

    /// The server answered with a status this library does not handle.
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(StatusCode),

    /// The API envelope reported an error triple.
    #[error("api error [{code}]: {message}")]
    Api {
        /// Error code reported by the server, e.g. `SUBREDDIT_NOEXIST`.
        code: String,
        /// Human readable message accompanying the code.
        message: String,
        /// Form field the error refers to, when the server names one.
        field: Option<String>,
    },

    /// The API reply parsed but did not carry the expected payload.
    #[error("malformed api reply: {0}")]
    MalformedReply(&'static str),

    /// A rule was constructed with both a name and full data, or neither.
    #[error("exactly one of short_name or data must be provided")]
    AmbiguousInit,

    /// No rule with the given name exists in the subreddit's listing.
    #[error("r/{subreddit} does not have the rule {short_name}")]
    RuleNotFound {
        /// Subreddit whose listing was scanned.
        subreddit: String,
        /// Name the lookup was keyed on.
        short_name: String,
    },

    /// The rule has no owning [`SubredditRules`] attached.
    ///
    /// This signals a construction defect, not a runtime condition: attach
    /// the collection with [`Rule::attach`] before fetching.
    ///
    /// [`SubredditRules`]: crate::rules::SubredditRules
    /// [`Rule::attach`]: crate::rule::Rule::attach
    #[error("rule {0} is not attached to a subreddit rule listing")]
    DetachedRule(String),

    /// Positional lookup outside the bounds of the cached listing.
    #[error("rule index {index} out of bounds for listing of length {len}")]
    OutOfBounds {
        /// Requested position, negative values count from the end.
        index: isize,
        /// Length of the listing at lookup time.
        len: usize,
    },

    /// Semaphore used by the rate limiter closed unexpectedly.
    #[error("{0}")]
    Acquire(#[from] tokio::sync::AcquireError),
}
