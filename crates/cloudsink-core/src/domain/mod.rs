//! Domain entities
//!
//! This module contains the core domain types for cloudsink:
//! - Newtypes for remote identifiers, remote paths and fingerprints
//! - Remote nodes and local directory entries
//! - Run statistics
//! - The extension to MIME type table
//! - Domain-specific error types

pub mod entry;
pub mod errors;
pub mod mime;
pub mod newtypes;
pub mod node;
pub mod stats;

// Re-export commonly used types
pub use entry::{LocalEntry, SIDECAR_EXTENSION};
pub use errors::DomainError;
pub use mime::MimeTable;
pub use newtypes::*;
pub use node::{NodeKind, RemoteNode};
pub use stats::SyncStats;
