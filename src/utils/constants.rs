//! Shared configuration constants for patentscout
//!
//! Default values used by the manager configuration, the retry policy and
//! the reference HTTP layer. Kept in one place to avoid magic numbers.

use std::time::Duration;

/// Consecutive failures before a layer's circuit opens
pub const DEFAULT_MAX_FAILURES: u32 = 3;

/// Weight of a detected block when counting consecutive failures
pub const DEFAULT_BLOCK_PENALTY: u32 = 2;

/// Circuit cooldown for browser-style layers: 5 minutes
pub const BROWSER_CIRCUIT_COOLDOWN: Duration = Duration::from_secs(300);

/// Circuit cooldown for the lightweight HTTP layer: 2 minutes
pub const HTTP_CIRCUIT_COOLDOWN: Duration = Duration::from_secs(120);

/// Browser sessions are renewed after 10 minutes
pub const BROWSER_MAX_SESSION: Duration = Duration::from_secs(600);

/// HTTP sessions are renewed after 5 minutes
pub const HTTP_MAX_SESSION: Duration = Duration::from_secs(300);

/// HTTP sessions are renewed after this many requests
pub const HTTP_MAX_REQUESTS_PER_SESSION: u32 = 50;

/// Per-call timeout for browser layers
pub const BROWSER_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-call timeout for the fallback browser, which is the slowest layer
pub const FALLBACK_BROWSER_CALL_TIMEOUT: Duration = Duration::from_secs(90);

/// Per-call timeout for the HTTP layer
pub const HTTP_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Attempts per layer per query before falling through to the next layer
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// First retry backoff step
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(2);

/// Upper bound for any retry backoff
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(60);

/// Default number of identifiers requested per query
pub const DEFAULT_MAX_RESULTS: usize = 20;

/// Queries of one batch allowed in flight at the same time
pub const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 3;

/// Longest accepted query, in characters
pub const MAX_QUERY_LENGTH: usize = 500;

/// User agent sent by the HTTP layer
///
/// A single fixed desktop Chrome string. Header rotation is not done here.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
