//! This crate turns email provider feedback (bounces, complaints, deliveries) into
//! conditional writes against per-campaign recipient stores.
//!
//! It follows the hexagonal architecture pattern: [domain] holds the models, ports and
//! services, [outbound] holds the store adapters and [inbound] decodes the transport
//! envelopes the notifications arrive in.

pub mod domain;
#[cfg(feature = "inbound")]
pub mod inbound;
pub mod outbound;
