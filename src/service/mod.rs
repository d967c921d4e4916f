//! REST client for the arbitrage job service.
//!
//! The job service owns every piece of state the client displays; this module only
//! knows how to ask for it.

mod client;
mod error;

pub use client::JobServiceClient;
pub use error::ServiceError;
