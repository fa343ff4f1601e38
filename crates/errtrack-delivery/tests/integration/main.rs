//! Integration tests for errtrack-delivery
//!
//! Uses wiremock to simulate the collection endpoint and verifies the
//! request shape and the retry behaviour of the DeliveryClient.

mod common;

mod test_delivery;
mod test_retry;
