//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the sync engine depends on; their
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - Remote object store operations (listing, folders, uploads)
//! - [`RemoteError`] - Failures the engine must recognize across adapters

pub mod remote_store;

pub use remote_store::{
    ChildFilter, IRemoteStore, RemoteError, UploadRequest, UploadSource, UploadTarget,
};
