//! Test utilities for the Lantern renderer.
//!
//! This crate provides the driver abstraction the renderer is written
//! against, plus a recording implementation that lets tests run without a
//! GPU.
//!
//! # Overview
//!
//! The main components are:
//!
//! - [`RenderDevice`] - Trait abstracting GPU driver operations
//! - [`RecordingDevice`] - Headless implementation that records every call
//!   for test verification
//! - Handle types ([`StageId`], [`ProgramId`], [`TextureId`], ...) - Plain
//!   copyable ids issued by the device
//!
//! # Example
//!
//! ```
//! use lantern_test_utils::{PrimitiveKind, RecordingDevice, RenderDevice};
//!
//! let device = RecordingDevice::new();
//!
//! // Use it like a real driver
//! let texture = device.create_texture(64, 64);
//! device.bind_texture(texture);
//! device.draw_arrays(PrimitiveKind::Triangles, 0, 6);
//!
//! // Verify operations in tests
//! assert_eq!(device.count_texture_binds(), 1);
//! assert_eq!(device.count_draw_calls(), 1);
//! ```
//!
//! # Design Philosophy
//!
//! This crate follows several key design principles:
//!
//! ## 1. No Lifetimes
//!
//! Handles are plain `Copy` ids rather than borrowed driver objects. This
//! eliminates lifetime parameters from propagating through the codebase.
//!
//! ## 2. Interior Mutability
//!
//! The recording implementation uses `Mutex` for interior mutability,
//! allowing `&self` methods to record calls.
//!
//! ## 3. Object Safety
//!
//! The `RenderDevice` trait is object-safe (`dyn RenderDevice`), allowing
//! for polymorphic usage with both real and recording devices.

pub mod device;
pub mod recording;

// Re-export main types at crate root
pub use device::*;
pub use recording::*;
