//! Shared cache-control policies for HTTP handlers.

/// Probes and session-dependent JSON must never be cached.
pub const NO_STORE: &str = "no-store";

/// Snapshot images may be reused briefly by the requesting browser only.
pub const PRIVATE_SHORT_LIVED: &str = "private, max-age=300";

/// Build the cache-control header tuple for session-dependent responses.
pub const fn no_store_header() -> (&'static str, &'static str) {
    ("Cache-Control", NO_STORE)
}
