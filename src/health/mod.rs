//! Connectivity pinging and per-endpoint health history.

pub mod pinger;
pub mod registry;

pub use pinger::Pinger;
pub use registry::HealthRegistry;
