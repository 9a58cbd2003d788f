//! The models of the feedback domain

mod config;
mod notification;
mod outcome;

pub use config::*;
pub use notification::*;
pub use outcome::*;
