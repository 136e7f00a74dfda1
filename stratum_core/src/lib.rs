// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene graph and invalidation engine for retained 2D compositing.
//!
//! `stratum_core` owns everything about a frame that is not pixels: the node
//! tree, its lazily cached transforms and bounds, the dirty-region
//! accumulator, and the bookkeeping half of each retained surface. It is
//! `no_std` compatible (with `alloc`) and stores nodes struct-of-arrays behind
//! generational handles.
//!
//! # Architecture
//!
//! ```text
//!   setter (set_x, set_alpha, add_child, ...)
//!       │  flags propagate up/down, entries queue on the enclosing surface
//!       ▼
//!   SceneGraph::update(surface) ──► per-entry validation ──► DirtyRegion
//!                                                              │
//!                 ┌────────────────────────────────────────────┘
//!                 ▼
//!   stratum_render::Compositor::draw ──► Canvas draw calls
//! ```
//!
//! **[`node`]**: [`SceneGraph`](node::SceneGraph), node kinds, flags,
//! transform setters, lazy accessors and hit-testing.
//!
//! **[`region`]** / **[`dirty`]**: pixel-snapped rectangles and the merging
//! accumulator that turns per-node regions into a handful of redraw rects.
//!
//! **[`surface`]**: retained-surface state (dirty queue, validation pass).
//!
//! **[`pool`]**: reusable object pool with reset-on-release.
//!
//! **[`matrix`]**: affine decomposition helpers.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame instrumentation, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates damage-rect
//!   events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod dirty;
pub mod matrix;
pub mod node;
pub mod pool;
pub mod region;
pub mod surface;
pub mod time;
pub mod trace;
