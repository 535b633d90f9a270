//! Bot binary support: configuration, logging, and application wiring.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod sink;
pub mod snapshot;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
