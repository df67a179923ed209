//! Shared types and configuration for Coffer.
//!
//! This crate provides common types used across all other crates:
//! - Integer minor-unit money types (`Money`, `SignedMoney`)
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Configuration management

pub mod config;
pub mod types;

pub use config::{AppConfig, WalletConfig};
pub use types::{Money, MoneyError, PageRequest, PageResponse, SignedMoney};
