//! Cross-process publish/subscribe bus (C2) for job log and status
//! fan-out, backed by Redis.

pub mod bus;
pub mod error;

pub use bus::{Bus, BusEvent};
pub use error::{BusError, BusResult};
