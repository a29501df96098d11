//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions for the chaincode runtime.
//!
//! - **Driving Ports (Inbound)**: `TransactionExecutor`
//! - **Driven Ports (Outbound)**: `DataService`, `Collection`, `IdentityService`,
//!   `ArchiveLoader`, `ChaincodeHost`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
