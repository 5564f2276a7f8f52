//! CPSU Common Library
//!
//! Shared code for the department website backend including:
//! - Database supervision, row models and the repository
//! - Reference lookup-or-create and flat-row aggregation helpers
//! - Entity services used by the HTTP handlers
//! - Error types and handling
//! - Configuration management
//! - Object storage and citation clients
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod scopus;
pub mod services;
pub mod storage;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbSupervisor, Repository};
pub use errors::{AppError, Result};
pub use scopus::CitationSource;
pub use storage::BlobStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
