//! API endpoint handlers, one module per domain.
//!
//! Handlers are thin: extract, lock the database, delegate to the service
//! layer, serialize the updated entity. All business rules live below.

pub mod admissions;
pub mod bills;
pub mod claims;
pub mod encounters;
pub mod health;
pub mod laboratory;
pub mod pharmacy;
