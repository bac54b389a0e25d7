//! Data Transfer Objects
//!
//! Bodies exchanged between the Hoist server and its callers.

pub mod deploy;
