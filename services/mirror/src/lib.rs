pub mod adapters;
pub mod config;
pub mod error;
pub mod session;
pub mod web;

pub use config::Config;
pub use error::ApiError;
pub use session::SessionContext;
