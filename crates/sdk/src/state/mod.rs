//! Local order tracking.

mod order;
mod registry;

pub use order::{OrderRecord, OrderRef, OrderState, Resolution};
pub use registry::OrderRegistry;
