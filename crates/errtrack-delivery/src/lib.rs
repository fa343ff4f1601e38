//! errtrack Delivery - Collection endpoint client
//!
//! Provides the async HTTP client that posts fault reports to the
//! dashboard's collection endpoint with a bounded retry budget.
//!
//! ## Modules
//!
//! - [`client`] - Endpoint resolution and retrying delivery

pub mod client;

pub use client::DeliveryClient;

use thiserror::Error;

/// Errors raised while setting up a delivery client
///
/// Delivery itself never fails; see [`client::DeliveryClient::deliver`].
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The dashboard URL could not be turned into an endpoint
    #[error("Invalid collection endpoint: {0}")]
    InvalidEndpoint(String),

    /// The dashboard URL uses a scheme other than http or https
    #[error("Unsupported dashboard URL scheme: {0}")]
    UnsupportedScheme(String),

    /// The HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}
