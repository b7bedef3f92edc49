//! Crate-level tests spanning several modules.
mod helpers;
mod hierarchy;
mod resolution;
