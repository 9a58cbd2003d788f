//! This module defines all members of the feedback domain

pub mod classifier;
pub mod models;
pub mod ports;
pub mod resolver;
pub mod services;
