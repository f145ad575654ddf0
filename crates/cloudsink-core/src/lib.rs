//! cloudsink core - Domain types, configuration and port definitions
//!
//! This crate holds everything the reconciliation engine and the remote
//! store adapter agree on:
//! - **Domain types** - `RemoteNode`, `LocalEntry`, `SyncStats`, `MimeTable`
//! - **Port definitions** - the `IRemoteStore` trait implemented by the HTTPS adapter
//! - **Configuration** - YAML-backed settings with validation and a builder
//!
//! # Architecture
//!
//! The domain module has no I/O. Ports define the trait interfaces that
//! adapter crates implement; the sync engine only talks to those traits.

pub mod config;
pub mod domain;
pub mod ports;
