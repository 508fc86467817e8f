//! Kanban Ledger - Gated, Transactional Position Ledger
//!
//! Every operation runs inside one store transaction:
//! authorize the caller against the owning user, check capacity on insert,
//! apply the position shifts, then commit. Any failure rolls the whole
//! transaction back before the error is returned.

pub mod capacity;
pub mod coordinator;
pub mod gate;
pub mod ledger;
pub mod service;

pub use capacity::{check_capacity, Limits};
pub use coordinator::UnitOfWork;
pub use gate::{authorize, owner_of};
pub use service::KanbanService;
