pub mod error;
pub mod http;
pub mod reddit;
pub mod store;
pub mod telemetry;
