//! Webhook submission and response normalization.

pub mod client;
pub mod ids;
pub mod normalizer;
