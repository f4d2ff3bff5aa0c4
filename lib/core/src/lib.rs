//! Core domain types and utilities for the callflow platform.
//!
//! This crate provides the foundational types and error handling shared by
//! the callflow conversation-processing pipeline crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::RunId;
