//! # Adapters Layer (Outer Hexagon)
//!
//! Implementations of the outbound ports for tests and single-process hosts.
//!
//! - `InMemoryDataService` - collections held in memory
//! - `StaticIdentityService` - a fixed caller identity
//! - `JsonArchiveLoader` - business networks packaged as a JSON manifest
//! - `HostBindings` - bundles the above into a `ChaincodeHost`

pub mod archive;
pub mod data_service;
pub mod host;
pub mod identity_service;

pub use archive::*;
pub use data_service::*;
pub use host::*;
pub use identity_service::*;
