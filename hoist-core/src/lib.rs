//! Hoist Core
//!
//! Core types and abstractions for the Hoist deployment trigger.
//!
//! This crate contains:
//! - Domain types: deployment requests, host descriptors, pipeline results
//! - DTOs: the wire body returned by the deploy endpoint
//! - Token signing and verification shared by the server and the CLI
//! - The image reference validator

pub mod domain;
pub mod dto;
pub mod image;
pub mod token;
