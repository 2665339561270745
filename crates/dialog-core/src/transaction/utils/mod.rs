//! Utility functions for the transaction layer
//!
//! - `message_extractors` - addressing data pulled from SIP messages
//! - `response_builders` - responses the transaction layer creates
//! - `request_builders` - requests the transaction layer creates

pub mod message_extractors;
pub mod request_builders;
pub mod response_builders;

pub use message_extractors::{extract_resolution_uri, extract_response_target};
pub use request_builders::create_ack_for_failure;
pub use response_builders::{create_response, create_trying_response};
