//! HTTP API handlers for mangalib-import

pub mod config;
pub mod extract;
pub mod health;
pub mod history;
pub mod import;
pub mod libraries;
pub mod sessions;

pub use config::config_routes;
pub use health::health_routes;
pub use history::history_routes;
pub use import::import_routes;
pub use libraries::library_routes;
pub use sessions::session_routes;
