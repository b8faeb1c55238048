//! Shared plumbing for the spyglass service binaries.

pub mod logging;
