//! Lead-Intake API Library
//!
//! This library provides the core functionality for the loan-application
//! lead-intake API: a resilient query-execution layer over a pooled MySQL
//! connection, typed repositories with schema-driven allow-lists, the
//! multi-step lead state-machine, and HTTP handlers.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `errors`: Error handling types.
//! - `executor`: Resilient query execution with retry and backoff.
//! - `handlers`: HTTP request handlers.
//! - `leads`: Lead step state-machine and repayment lookup.
//! - `models`: Core data models.
//! - `normalize`: Input normalization and name parsing.
//! - `schema`: Static per-entity storage schemas.
//! - `storage`: Repositories built atop the executor.

pub mod config;
pub mod db;
pub mod errors;
pub mod executor;
pub mod handlers;
pub mod leads;
pub mod models;
pub mod normalize;
pub mod schema;
pub mod storage;
