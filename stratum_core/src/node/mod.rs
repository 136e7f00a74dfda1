// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene graph data model.
//!
//! A *node* is an element of the retained tree. Each node has:
//!
//! - An identity ([`NodeId`]): a generational handle that becomes stale when
//!   the node is destroyed, so use-after-free is caught at the API level.
//! - Topology: parent, first-child and sibling links forming an ordered tree.
//!   Sibling order is paint order.
//! - **Local properties** set by the caller: the local matrix (with
//!   [`x`](SceneGraph::set_x), [`scale_x`](SceneGraph::set_scale_x),
//!   [`rotation`](SceneGraph::set_rotation) and friends as views of it),
//!   [`alpha`](SceneGraph::set_alpha), [`visible`](SceneGraph::set_visible),
//!   [`blend_mode`](SceneGraph::set_blend_mode),
//!   [`scroll_rect`](SceneGraph::set_scroll_rect) and
//!   [`mask`](SceneGraph::set_mask).
//! - **Cached properties** computed on demand: concatenated matrix and alpha,
//!   inverted concatenated matrix, content bounds and cumulative bounds.
//! - **Render state** written by [`SceneGraph::update`]: the on-screen
//!   region of content-bearing nodes.
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles.
//!
//! # Invalidation
//!
//! Setters never recompute anything. They set [`NodeFlags`] (see that type
//! for the propagation rules) and queue affected drawables on the retained
//! surface that paints them. Caches are rebuilt lazily by their accessors
//! (such as [`concatenated_matrix`](SceneGraph::concatenated_matrix)); a read
//! clears exactly the flag it depends on.

mod cache;
mod flags;
mod hit;
mod id;
mod invalidate;
mod kind;
mod props;
mod store;
mod transform;
mod traverse;

pub use flags::NodeFlags;
pub use hit::{BoundsSampler, PixelSampler};
pub use id::{INVALID, NodeId, SurfaceId};
pub use kind::{BitmapContent, BlendMode, Color, ImageId, NodeKind, ShapeContent};
pub use store::SceneGraph;
pub use traverse::Children;
