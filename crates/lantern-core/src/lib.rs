//! Lantern Core
//!
//! This crate contains the shared functionality for the Lantern rendering
//! workspace: logging and profiling setup, math helpers, and geometry
//! primitives.

pub mod geometry;
pub mod logging;
pub mod math;
pub mod profiling;
