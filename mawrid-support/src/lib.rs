//! # Mawrid Support
//!
//! Shared utilities for the Mawrid runtime crates.
//!
//! This crate provides:
//! - Rendering of cycle chains and snapshot trees
//! - "Did you mean?" suggestions for unknown port names

pub mod rendering;
