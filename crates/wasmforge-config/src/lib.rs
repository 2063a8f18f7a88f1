//! Environment-driven configuration for wasmforge services: broker and
//! store endpoints, worker concurrency and queue selection, payment
//! network, and CORS allow-list, all read once at process startup.

pub mod error;
pub mod system;

pub use error::{ConfigError, ConfigResult};
pub use system::{BrokerConfig, Config, WorkerType};
