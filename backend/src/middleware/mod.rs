//! Request middleware.
//!
//! Purpose: request lifecycle concerns that sit outside individual handlers,
//! currently trace-id correlation.

pub mod trace;

pub use trace::Trace;
