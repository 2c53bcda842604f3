//! Core types for the storybook kernel.

pub mod node;
pub mod edge;
pub mod registry;
pub mod report;

pub use node::{NodeId, NodeRole, Node, Rgba};
pub use edge::Connection;
pub use registry::{CharacterMeta, LocationMeta, RegistryConfig, PLACEHOLDER_ATLAS};
pub use report::{Severity, Unit, Diagnostic, ValidationReport};
