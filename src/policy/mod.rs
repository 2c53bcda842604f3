//! Content policies.

pub mod alias;

pub use alias::{AliasPolicy, ALIAS_POLICY_VERSION};
