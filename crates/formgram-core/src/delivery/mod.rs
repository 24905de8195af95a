//! Outbound Bot API protocol: request building, transport port, envelope
//! classification.

pub mod client;
pub mod port;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
