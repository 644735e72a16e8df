//! Rating write-back to the prompt service.

mod client;
mod sink;

pub use client::{ApiClient, ApiError, DEFAULT_API_BASE};
pub use sink::{HttpRatingSink, NullRatingSink, RatingSink, WriteOutcome};
