// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flag propagation and surface notification.
//!
//! Every mutation funnels into one of four entry points:
//!
//! - [`invalidate`](SceneGraph::invalidate): own pixels changed.
//! - [`invalidate_transform`](SceneGraph::invalidate_transform): placement
//!   changed, so the node and its subtree must be re-placed on screen.
//! - [`invalidate_position`](SceneGraph::invalidate_position): placement plus
//!   concatenated-matrix and ancestor-bounds caches.
//! - [`invalidate_content_bounds`](SceneGraph::invalidate_content_bounds):
//!   own pixels and own extent changed.

use super::flags::NodeFlags;
use super::id::{INVALID, SurfaceId};
use super::store::SceneGraph;
use crate::surface::DirtyEntry;

impl SceneGraph {
    /// Sets `flags` on `idx` and its descendants, stopping at nodes that
    /// already carry all of them.
    pub(crate) fn propagate_flags_down(&mut self, idx: u32, flags: NodeFlags) {
        if self.flags[idx as usize].contains(flags) {
            return;
        }
        self.flags[idx as usize].insert(flags);
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.propagate_flags_down(child, flags);
            child = self.next_sibling[child as usize];
        }
    }

    /// Sets `flags` on `idx` and its ancestors, stopping at the first node
    /// that already carries all of them.
    pub(crate) fn propagate_flags_up(&mut self, idx: u32, flags: NodeFlags) {
        let mut cur = idx;
        while cur != INVALID {
            if self.flags[cur as usize].contains(flags) {
                return;
            }
            self.flags[cur as usize].insert(flags);
            cur = self.parent[cur as usize];
        }
    }

    /// Clears `flags` on `idx` and its ancestors, stopping at the first node
    /// that carries none of them.
    pub(crate) fn remove_flags_up(&mut self, idx: u32, flags: NodeFlags) {
        let mut cur = idx;
        while cur != INVALID {
            if !self.flags[cur as usize].intersects(flags) {
                return;
            }
            self.flags[cur as usize].remove(flags);
            cur = self.parent[cur as usize];
        }
    }

    /// Marks the node's own pixels stale, and with `notify_children` every
    /// descendant's too.
    pub(crate) fn invalidate(&mut self, idx: u32, notify_children: bool) {
        let i = idx as usize;
        if self.render_region[i].is_some() && !self.flags[i].contains(NodeFlags::DIRTY_RENDER) {
            self.flags[i].insert(NodeFlags::DIRTY_RENDER);
            if let Some(target) = self.enclosing_surface(idx) {
                self.mark_dirty(target, DirtyEntry::Node(idx));
            }
        }
        if !notify_children {
            return;
        }
        let mut child = self.first_child[i];
        while child != INVALID {
            self.invalidate(child, true);
            child = self.next_sibling[child as usize];
        }
    }

    /// Queues the node and its subtree for re-placement on the surface that
    /// draws them. Nested retained surfaces are queued as a unit.
    pub(crate) fn invalidate_transform(&mut self, idx: u32) {
        let cache = self.parent_surface[idx as usize];
        self.mark_child_dirty(idx, cache);
    }

    fn mark_child_dirty(&mut self, idx: u32, parent_cache: Option<SurfaceId>) {
        let i = idx as usize;
        if self.flags[i].contains(NodeFlags::DIRTY_CHILDREN) {
            return;
        }
        self.flags[i].insert(NodeFlags::DIRTY_CHILDREN);
        let own = self.surface[i];
        if let Some(cache) = parent_cache {
            if let Some(own) = own {
                self.mark_dirty(cache, DirtyEntry::Surface(own.idx));
            } else if self.render_region[i].is_some() {
                self.mark_dirty(cache, DirtyEntry::Node(idx));
            }
        }
        if own.is_some() {
            return;
        }
        let mut child = self.first_child[i];
        while child != INVALID {
            self.mark_child_dirty(child, parent_cache);
            child = self.next_sibling[child as usize];
        }
    }

    /// Placement changed: re-place the subtree, invalidate inherited matrices
    /// below and aggregate bounds above.
    pub(crate) fn invalidate_position(&mut self, idx: u32) {
        self.invalidate_transform(idx);
        self.propagate_flags_down(
            idx,
            NodeFlags::INVALID_CONCATENATED_MATRIX | NodeFlags::INVALID_INVERTED_CONCATENATED_MATRIX,
        );
        let p = self.parent[idx as usize];
        if p != INVALID {
            self.propagate_flags_up(p, NodeFlags::INVALID_BOUNDS);
        }
    }

    /// Own content changed size or appearance.
    pub(crate) fn invalidate_content_bounds(&mut self, idx: u32) {
        self.invalidate(idx, false);
        self.flags[idx as usize].insert(NodeFlags::INVALID_CONTENT_BOUNDS);
        self.propagate_flags_up(idx, NodeFlags::INVALID_BOUNDS);
    }
}
