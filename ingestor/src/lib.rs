pub mod auth;
pub mod clock;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod query;
pub mod response;
pub mod rest;
pub mod status;
pub mod store;
pub mod validate;

pub use errors::{Error, Result};
pub use rest::{create_router, AppState};
pub use store::TelemetryStore;
