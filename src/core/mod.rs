pub mod config;

pub use config::IngestConfig;
