// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained-surface compositor and frame driver for stratum.
//!
//! This crate turns a validated [`SceneGraph`](stratum_core::node::SceneGraph)
//! into backend draw calls. It defines:
//!
//! - [`Canvas`] and [`SurfaceFactory`]: the backend contract
//! - [`Compositor`]: the draw pass, owning the pixel buffer of every
//!   retained surface and a pool of temporary canvases
//! - [`FrameDriver`]: playback state and the per-tick update/draw sequence
//! - [`RenderError`]: backend failures
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables [`Tracer`](stratum_core::trace::Tracer)
//!   dispatch in the driver.
//! - `trace-rich` (disabled by default, implies `trace`): Reports each
//!   frame's dirty rectangles.

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod canvas;
mod compositor;
mod driver;
mod error;
#[cfg(test)]
mod testing;

pub use canvas::{Canvas, CompositeOp, SurfaceFactory, render_content};
pub use compositor::{Compositor, CompositorConfig};
pub use driver::{DriverState, Entry, FrameDriver, Ticker};
pub use error::RenderError;
