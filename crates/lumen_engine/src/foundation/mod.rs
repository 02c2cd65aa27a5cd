//! Foundation module - core utilities shared by every subsystem
//!
//! - Math types and projection helpers
//! - RAII ownership for opaque native handles
//! - Logging setup

pub mod logging;
pub mod math;
pub mod resource;
