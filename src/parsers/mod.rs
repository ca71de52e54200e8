//! Lenient decoding of remote payloads
//!
//! The service is reached through an injected script, so every field may be missing or
//! malformed. Timestamps that cannot be read fall back to "now" instead of failing the
//! whole listing.

pub mod deserializers;

pub use deserializers::{deserialize_lenient_timestamp, parse_timestamp_value};
