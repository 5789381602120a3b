//! # ITDESK Common Library
//!
//! Shared code for the ITDESK service-desk portal:
//! - Database schema, models and repositories
//! - Input validation and password hashing
//! - Rate limiting
//! - Locale bundles, fallback lookup and locale detection
//! - Unified search and dashboard aggregation
//! - Event bus and demo seed data

pub mod auth;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod events;
pub mod locale;
pub mod rate_limit;
pub mod search;
pub mod seed;
pub mod sse;
pub mod time;
pub mod validation;

pub use error::{Error, FieldError, Result};
