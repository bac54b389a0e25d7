//! Service Module
//!
//! Business logic layer for the deployment trigger.
//! The pipeline composes the other services into a single request decision.

pub mod declaration;
pub mod error;
pub mod executor;
pub mod locator;
pub mod locks;
pub mod pipeline;
pub mod registry;

pub use pipeline::DeployPipeline;
