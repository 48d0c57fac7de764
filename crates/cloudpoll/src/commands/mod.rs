//! Command implementations

pub mod config;
pub mod kinds;
pub mod wait;
