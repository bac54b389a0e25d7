//! Core domain types
//!
//! This module contains the structures that flow through a single deployment
//! request. They are shared between the server (which resolves and executes
//! them) and the CLI (which issues them).

pub mod deployment;
pub mod outcome;
