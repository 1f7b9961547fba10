//! Spark DWH ETL - Batch ETL into a MySQL warehouse
//!
//! A Rust library implementing a small batch ETL job: it pulls user, message
//! and subscription records from a mock REST API, strips or pseudonymizes
//! personally identifiable fields, loads the result into a relational
//! warehouse schema and builds a set of monitoring views.
//!
//! # Features
//!
//! - Fetch user and message collections from their JSON endpoints
//! - Mask PII via surrogate IDs held in access-restricted lookup tables
//! - Idempotent warehouse schema initialisation with a restricted analyst account
//! - Per-record batch loading with aggregate success reporting
//! - Monitoring views created from stored query files

/// Mock API client
pub mod api;
/// Configuration management
pub mod config;
/// Warehouse database gateway
pub mod db;
/// Error types
pub mod error;
/// Record mappers and batch loaders
pub mod load;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Pipeline orchestration
pub mod pipeline;
/// Warehouse schema definitions
pub mod schema;
/// PII sanitization and subscription derivation
pub mod transform;
/// Monitoring view creation
pub mod views;

// Re-export key components for easier access
pub use api::ApiClient;
pub use config::AppConfig;
pub use db::{DbGateway, InsertOutcome, MaskIdStore};
pub use error::{EtlError, Result};
pub use load::LoadReport;
pub use pipeline::PipelineSummary;
