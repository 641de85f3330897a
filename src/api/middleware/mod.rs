//! Request middleware.
//!
//! A single layer: staff identity, rebuilt from gateway-forwarded headers.

pub mod staff;
