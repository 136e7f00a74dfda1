// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Appearance, masking, caching and interaction properties.

use alloc::vec;

use kurbo::Rect;

use super::flags::NodeFlags;
use super::id::{INVALID, NodeId};
use super::kind::BlendMode;
use super::store::SceneGraph;
use crate::surface::DirtyEntry;

impl SceneGraph {
    // -- Alpha and visibility --

    /// Returns the node's own alpha.
    #[must_use]
    pub fn alpha(&self, id: NodeId) -> f64 {
        self.validate(id);
        self.alpha[id.idx as usize]
    }

    /// Sets the node's alpha, clamped to `[0, 1]`.
    ///
    /// Alpha composites down the tree, so the node and every descendant are
    /// queued for repaint.
    pub fn set_alpha(&mut self, id: NodeId, alpha: f64) {
        self.validate(id);
        let alpha = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) };
        let i = id.idx as usize;
        if self.alpha[i] == alpha {
            return;
        }
        self.alpha[i] = alpha;
        self.propagate_flags_down(id.idx, NodeFlags::INVALID_CONCATENATED_ALPHA);
        self.invalidate(id.idx, true);
    }

    /// Returns whether the node is drawn.
    #[must_use]
    pub fn visible(&self, id: NodeId) -> bool {
        self.validate(id);
        self.visible[id.idx as usize]
    }

    /// Shows or hides the node and its subtree.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        self.validate(id);
        let i = id.idx as usize;
        if self.visible[i] == visible {
            return;
        }
        self.visible[i] = visible;
        self.invalidate_transform(id.idx);
    }

    /// Returns the node's blend mode.
    #[must_use]
    pub fn blend_mode(&self, id: NodeId) -> BlendMode {
        self.validate(id);
        self.blend_mode[id.idx as usize]
    }

    /// Sets how the node's subtree composites onto its surface.
    pub fn set_blend_mode(&mut self, id: NodeId, mode: BlendMode) {
        self.validate(id);
        let i = id.idx as usize;
        if self.blend_mode[i] == mode {
            return;
        }
        self.blend_mode[i] = mode;
        self.invalidate_transform(id.idx);
    }

    // -- Clipping --

    /// Returns the node's scroll rectangle, if any.
    #[must_use]
    pub fn scroll_rect(&self, id: NodeId) -> Option<Rect> {
        self.validate(id);
        self.scroll_rect[id.idx as usize]
    }

    /// Clips the node's subtree to `rect` (in local space) and scrolls its
    /// content so `rect`'s origin lands on the node's origin.
    pub fn set_scroll_rect(&mut self, id: NodeId, rect: Option<Rect>) {
        self.validate(id);
        let i = id.idx as usize;
        if self.scroll_rect[i] == rect {
            return;
        }
        self.scroll_rect[i] = rect;
        self.invalidate_position(id.idx);
    }

    /// Returns the node masking `id`, if any.
    #[must_use]
    pub fn mask(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let m = self.mask[id.idx as usize];
        (m != INVALID).then(|| self.id_at(m))
    }

    /// Returns the node that `id` masks, if any.
    #[must_use]
    pub fn masked_object(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let t = self.masked_object[id.idx as usize];
        (t != INVALID).then(|| self.id_at(t))
    }

    /// Masks `target` with `mask`, or clears its mask.
    ///
    /// A node masks at most one target: if `mask` already masks another
    /// node, that node loses its mask first. A node cannot mask itself, and
    /// reassigning the current mask does nothing. Mask nodes are not drawn
    /// in their own right.
    ///
    /// A mask that reaches `target` through its children or its own mask
    /// chain is refused and the graph is left unchanged.
    pub fn set_mask(&mut self, target: NodeId, mask: Option<NodeId>) {
        self.validate(target);
        if let Some(m) = mask {
            self.validate(m);
            if m == target {
                return;
            }
            if self.reaches(m.idx, target.idx) {
                tracing::warn!(?target, mask = ?m, "refusing mask that would contain its target");
                return;
            }
        }
        let t = target.idx;
        let new = mask.map_or(INVALID, |m| m.idx);
        let old = self.mask[t as usize];
        if old == new {
            return;
        }

        if new != INVALID {
            let previous = self.masked_object[new as usize];
            if previous != INVALID {
                self.mask[previous as usize] = INVALID;
                self.invalidate_transform(previous);
            }
            self.masked_object[new as usize] = t;
            self.invalidate_transform(new);
        }
        if old != INVALID {
            self.masked_object[old as usize] = INVALID;
            self.invalidate_transform(old);
        }
        self.mask[t as usize] = new;
        self.invalidate_transform(t);
    }

    /// Whether `target` is `from`, or lies under it through child or mask
    /// links.
    fn reaches(&self, from: u32, target: u32) -> bool {
        let mut seen = vec![false; self.mask.len()];
        let mut pending = vec![from];
        while let Some(idx) = pending.pop() {
            if idx == target {
                return true;
            }
            if core::mem::replace(&mut seen[idx as usize], true) {
                continue;
            }
            let m = self.mask[idx as usize];
            if m != INVALID {
                pending.push(m);
            }
            let mut child = self.first_child[idx as usize];
            while child != INVALID {
                pending.push(child);
                child = self.next_sibling[child as usize];
            }
        }
        false
    }

    // -- Bitmap caching --

    /// Returns whether the node renders its subtree through a retained
    /// surface.
    #[must_use]
    pub fn cache_as_bitmap(&self, id: NodeId) -> bool {
        self.validate(id);
        self.flags[id.idx as usize].contains(NodeFlags::CACHE_AS_BITMAP)
    }

    /// Enables or disables a retained surface for the node's subtree.
    ///
    /// Enabling acquires a surface state from the pool; disabling returns it.
    /// Either way descendants are re-homed onto whichever surface now draws
    /// them. Ignored for the stage, which always owns a surface.
    pub fn set_cache_as_bitmap(&mut self, id: NodeId, value: bool) {
        self.validate(id);
        if id == self.stage {
            return;
        }
        let idx = id.idx;
        let i = idx as usize;
        self.flags[i].set(NodeFlags::CACHE_AS_BITMAP, value);
        if self.surface[i].is_some() == value {
            return;
        }
        if value {
            let surface = self.acquire_surface(idx, false);
            self.surface[i] = Some(surface);
            if let Some(parent) = self.parent_surface[i] {
                self.mark_dirty(parent, DirtyEntry::Surface(surface.idx));
            }
        } else if let Some(surface) = self.surface[i].take() {
            self.release_surface(surface);
        }
        self.cache_as_bitmap_changed(idx);
    }

    fn cache_as_bitmap_changed(&mut self, idx: u32) {
        let cache = self.enclosing_surface(idx);
        if let Some(cache) = cache {
            if self.render_region[idx as usize].is_some() {
                self.mark_dirty(cache, DirtyEntry::Node(idx));
            }
        }
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.assign_parent_surface(child, cache, cache);
            child = self.next_sibling[child as usize];
        }
    }

    // -- Interaction --

    /// Returns whether the node itself can be hit.
    #[must_use]
    pub fn touch_enabled(&self, id: NodeId) -> bool {
        self.validate(id);
        self.flags[id.idx as usize].contains(NodeFlags::TOUCH_ENABLED)
    }

    /// Sets whether the node itself can be hit.
    pub fn set_touch_enabled(&mut self, id: NodeId, value: bool) {
        self.validate(id);
        self.flags[id.idx as usize].set(NodeFlags::TOUCH_ENABLED, value);
    }

    /// Returns whether hit-testing descends into the node's children.
    #[must_use]
    pub fn touch_children(&self, id: NodeId) -> bool {
        self.validate(id);
        self.flags[id.idx as usize].contains(NodeFlags::TOUCH_CHILDREN)
    }

    /// Sets whether hit-testing descends into the node's children.
    pub fn set_touch_children(&mut self, id: NodeId, value: bool) {
        self.validate(id);
        self.flags[id.idx as usize].set(NodeFlags::TOUCH_CHILDREN, value);
    }

    /// Returns whether hits on the node require an opaque pixel.
    #[must_use]
    pub fn pixel_hit_test(&self, id: NodeId) -> bool {
        self.validate(id);
        self.flags[id.idx as usize].contains(NodeFlags::PIXEL_HIT_TEST)
    }

    /// Sets whether hits on the node require an opaque pixel.
    pub fn set_pixel_hit_test(&mut self, id: NodeId, value: bool) {
        self.validate(id);
        self.flags[id.idx as usize].set(NodeFlags::PIXEL_HIT_TEST, value);
    }
}
