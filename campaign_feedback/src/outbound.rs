//! This module defines concrete implementations of the required outbound ports
//! Outbounds ports are things in the outside world that we reach out to

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

#[cfg(any(test, feature = "mock"))]
pub mod memory;
