//! CLI command implementations

pub mod config;
pub mod inspect;
pub mod migrate;

pub use config::ConfigArgs;
pub use inspect::InspectArgs;
pub use migrate::MigrateArgs;
