//! Repository layer: entity-scoped database operations.
//!
//! One sub-module per domain aggregate. All public functions are re-exported
//! here so callers import from `db::repository` directly.

mod bills;
mod claims;
mod encounters;
mod investigations;
mod patients;
mod prescriptions;
mod prices;
mod wards;

pub use bills::*;
pub use claims::*;
pub use encounters::*;
pub use investigations::*;
pub use patients::*;
pub use prescriptions::*;
pub use prices::*;
pub use wards::*;
