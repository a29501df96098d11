//! # Domain Layer (Inner Hexagon)
//!
//! Business network model, resources, and the value types the context is
//! built from. No I/O and no async in here.

pub mod binding;
pub mod entities;
pub mod network;
pub mod value_objects;

pub use binding::*;
pub use entities::*;
pub use network::*;
pub use value_objects::*;
