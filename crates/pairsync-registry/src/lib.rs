//! Server registry for PairSync.
//!
//! Holds the operator's list of synchronization servers. Each server is
//! described by a [`ServerDescriptor`] and identified by a stable
//! [`ServerIndex`](pairsync_protocol::ServerIndex) that is assigned in
//! registration order and never recycled, even after removal.
//!
//! # Key types
//!
//! - [`DescriptorConfig`]: what the operator writes (deserializable)
//! - [`ServerDescriptor`]: a validated, registered server
//! - [`ServerRegistry`]: the append-only, tombstoning list

mod descriptor;
mod error;
mod registry;

pub use descriptor::{CredentialRef, DescriptorConfig, EndpointOverrides, ServerDescriptor};
pub use error::RegistryError;
pub use registry::ServerRegistry;
