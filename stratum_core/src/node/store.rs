// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation and topology.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{Affine, Rect};

use super::flags::NodeFlags;
use super::id::{INVALID, NodeId, SurfaceId};
use super::kind::{BlendMode, NodeKind};
use super::traverse::Children;
use crate::dirty::DirtyRegionConfig;
use crate::matrix::Decomposed;
use crate::pool::Pool;
use crate::region::Region;
use crate::surface::{DirtyEntry, SurfaceState};

/// Number of released surface states kept for reuse.
const SURFACE_POOL_CAPACITY: usize = 16;

/// The retained scene: every node, the stage, and the bookkeeping half of
/// every retained surface.
///
/// Nodes are addressed by [`NodeId`] handles. Each node occupies a slot in
/// parallel arrays; destroyed nodes are recycled through a free list, and
/// generation counters reject stale handles.
///
/// A graph always contains exactly one [`NodeKind::Stage`] node, created
/// with the graph and permanently "on stage". Only nodes attached below it
/// are drawn.
#[derive(Debug)]
pub struct SceneGraph {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Local properties (set by callers) --
    pub(crate) kind: Vec<NodeKind>,
    pub(crate) name: Vec<String>,
    pub(crate) matrix: Vec<Affine>,
    pub(crate) decomposed: Vec<Decomposed>,
    pub(crate) alpha: Vec<f64>,
    pub(crate) visible: Vec<bool>,
    pub(crate) blend_mode: Vec<BlendMode>,
    pub(crate) scroll_rect: Vec<Option<Rect>>,
    pub(crate) mask: Vec<u32>,
    pub(crate) masked_object: Vec<u32>,
    pub(crate) flags: Vec<NodeFlags>,

    // -- Lazily cached properties --
    pub(crate) concatenated_matrix: Vec<Affine>,
    pub(crate) inverted_matrix: Vec<Affine>,
    pub(crate) concatenated_alpha: Vec<f64>,
    pub(crate) content_bounds: Vec<Rect>,
    pub(crate) bounds: Vec<Rect>,

    // -- Render state (written by the validation and draw passes) --
    pub(crate) render_region: Vec<Option<Region>>,
    pub(crate) render_alpha: Vec<f64>,
    pub(crate) is_dirty: Vec<bool>,
    pub(crate) on_stage: Vec<bool>,
    pub(crate) nest_level: Vec<u32>,
    pub(crate) surface: Vec<Option<SurfaceId>>,
    pub(crate) parent_surface: Vec<Option<SurfaceId>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Retained surfaces --
    pub(crate) surfaces: Vec<Option<SurfaceState>>,
    pub(crate) surface_generation: Vec<u32>,
    pub(crate) surface_free: Vec<u32>,
    pub(crate) surface_pool: Pool<SurfaceState>,
    pub(crate) pending_released: Vec<SurfaceId>,
    pub(crate) dirty_config: DirtyRegionConfig,

    // -- Hit-test scratch --
    pub(crate) active_masks: Vec<u32>,

    // -- Stage --
    pub(crate) stage: NodeId,
    pub(crate) stage_surface: SurfaceId,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Creates a graph holding only the stage, with default dirty-region
    /// thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DirtyRegionConfig::default())
    }

    /// Creates a graph whose surfaces use `config` for dirty-region merging.
    #[must_use]
    pub fn with_config(config: DirtyRegionConfig) -> Self {
        let placeholder = NodeId {
            idx: INVALID,
            generation: 0,
        };
        let mut graph = Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            kind: Vec::new(),
            name: Vec::new(),
            matrix: Vec::new(),
            decomposed: Vec::new(),
            alpha: Vec::new(),
            visible: Vec::new(),
            blend_mode: Vec::new(),
            scroll_rect: Vec::new(),
            mask: Vec::new(),
            masked_object: Vec::new(),
            flags: Vec::new(),
            concatenated_matrix: Vec::new(),
            inverted_matrix: Vec::new(),
            concatenated_alpha: Vec::new(),
            content_bounds: Vec::new(),
            bounds: Vec::new(),
            render_region: Vec::new(),
            render_alpha: Vec::new(),
            is_dirty: Vec::new(),
            on_stage: Vec::new(),
            nest_level: Vec::new(),
            surface: Vec::new(),
            parent_surface: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            surfaces: Vec::new(),
            surface_generation: Vec::new(),
            surface_free: Vec::new(),
            surface_pool: Pool::new(SURFACE_POOL_CAPACITY),
            pending_released: Vec::new(),
            dirty_config: config,
            active_masks: Vec::new(),
            stage: placeholder,
            stage_surface: SurfaceId {
                idx: INVALID,
                generation: 0,
            },
        };
        let stage = graph.create_node(NodeKind::Stage);
        graph.name[stage.idx as usize] = String::from("stage");
        graph.on_stage[stage.idx as usize] = true;
        let surface = graph.acquire_surface(stage.idx, true);
        graph.surface[stage.idx as usize] = Some(surface);
        graph.stage = stage;
        graph.stage_surface = surface;
        graph
    }

    // -- Allocation API --

    /// Creates a detached node of the given kind and returns its handle.
    ///
    /// The node starts with an identity matrix, full alpha, visible, normal
    /// blending, touch-enabled, and every cache invalid.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let region = kind.has_content().then_some(Region::EMPTY);
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.kind[i] = kind;
            self.name[i].clear();
            self.matrix[i] = Affine::IDENTITY;
            self.decomposed[i] = Decomposed::IDENTITY;
            self.alpha[i] = 1.0;
            self.visible[i] = true;
            self.blend_mode[i] = BlendMode::Normal;
            self.scroll_rect[i] = None;
            self.mask[i] = INVALID;
            self.masked_object[i] = INVALID;
            self.flags[i] = NodeFlags::INIT;
            self.concatenated_matrix[i] = Affine::IDENTITY;
            self.inverted_matrix[i] = Affine::IDENTITY;
            self.concatenated_alpha[i] = 1.0;
            self.content_bounds[i] = Rect::ZERO;
            self.bounds[i] = Rect::ZERO;
            self.render_region[i] = region;
            self.render_alpha[i] = 1.0;
            self.is_dirty[i] = false;
            self.on_stage[i] = false;
            self.nest_level[i] = 0;
            self.surface[i] = None;
            self.parent_surface[i] = None;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.kind.push(kind);
            self.name.push(String::new());
            self.matrix.push(Affine::IDENTITY);
            self.decomposed.push(Decomposed::IDENTITY);
            self.alpha.push(1.0);
            self.visible.push(true);
            self.blend_mode.push(BlendMode::Normal);
            self.scroll_rect.push(None);
            self.mask.push(INVALID);
            self.masked_object.push(INVALID);
            self.flags.push(NodeFlags::INIT);
            self.concatenated_matrix.push(Affine::IDENTITY);
            self.inverted_matrix.push(Affine::IDENTITY);
            self.concatenated_alpha.push(1.0);
            self.content_bounds.push(Rect::ZERO);
            self.bounds.push(Rect::ZERO);
            self.render_region.push(region);
            self.render_alpha.push(1.0);
            self.is_dirty.push(false);
            self.on_stage.push(false);
            self.nest_level.push(0);
            self.surface.push(None);
            self.parent_surface.push(None);
            self.generation.push(0);
            idx
        };
        self.id_at(idx)
    }

    /// Destroys a node, freeing its slot for reuse.
    ///
    /// A node still attached to a parent is detached first, so its vacated
    /// region is repainted. Mask links in either direction are cleared and an
    /// owned retained surface is released.
    ///
    /// # Panics
    ///
    /// Panics if the node has children (remove them first), if it is the
    /// stage, or if the handle is stale.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        assert!(id != self.stage, "cannot destroy the stage");
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy node with children"
        );

        let p = self.parent[idx as usize];
        if p != INVALID {
            self.remove_child(self.id_at(p), id);
        }

        let target = self.masked_object[idx as usize];
        if target != INVALID {
            self.set_mask(self.id_at(target), None);
        }
        if self.mask[idx as usize] != INVALID {
            self.set_mask(id, None);
        }

        if let Some(surface) = self.surface[idx as usize].take() {
            self.release_surface(surface);
        }
        self.forget_dirty_entry(DirtyEntry::Node(idx));

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;
        self.free_list.push(idx);
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Returns the stage node.
    #[must_use]
    pub fn stage(&self) -> NodeId {
        self.stage
    }

    /// Returns the surface that draws directly to the screen.
    #[must_use]
    pub fn stage_surface(&self) -> SurfaceId {
        self.stage_surface
    }

    // -- Topology API --

    /// Appends `child` to `parent`'s children, detaching it from any previous
    /// parent first.
    ///
    /// # Panics
    ///
    /// See [`add_child_at`](Self::add_child_at).
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.add_child_at(parent, child, usize::MAX);
    }

    /// Inserts `child` at `index` among `parent`'s children (clamped to the
    /// child count), detaching it from any previous parent first.
    ///
    /// If `child` already belongs to `parent` it is only reordered.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, if `parent` cannot hold children,
    /// if `child` is the stage, or if `child` is `parent` or one of its
    /// ancestors.
    pub fn add_child_at(&mut self, parent: NodeId, child: NodeId, index: usize) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.kind[p as usize].is_container(),
            "node kind cannot hold children"
        );
        assert!(child != self.stage, "the stage cannot be reparented");
        assert!(
            !self.contains(child, parent),
            "cannot add a node to its own subtree"
        );

        if self.parent[c as usize] == p {
            self.set_child_index(parent, child, index);
            return;
        }
        let old = self.parent[c as usize];
        if old != INVALID {
            self.remove_child(self.id_at(old), child);
        }

        self.link_at(p, c, index);
        if self.on_stage[p as usize] {
            self.on_add_to_stage(c, self.nest_level[p as usize] + 1);
        }
        let cache = self.enclosing_surface(p);
        if cache.is_some() {
            self.assign_parent_surface(c, cache, cache);
        }
        self.propagate_flags_down(c, NodeFlags::DOWN_ON_ADDED_OR_REMOVED);
        self.propagate_flags_up(p, NodeFlags::INVALID_BOUNDS);
    }

    /// Detaches `child` from `parent`.
    ///
    /// The surface that drew the child is told to repaint its old region.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale or `child` is not a child of
    /// `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == p,
            "node is not a child of this parent"
        );

        let cache = self.enclosing_surface(p);
        if cache.is_some() {
            self.assign_parent_surface(c, cache, None);
        }
        if self.on_stage[c as usize] {
            self.on_remove_from_stage(c);
        }
        self.unlink_from_parent(c);
        self.propagate_flags_down(c, NodeFlags::DOWN_ON_ADDED_OR_REMOVED);
        self.propagate_flags_up(p, NodeFlags::INVALID_BOUNDS);
    }

    /// Detaches and returns the child at `index`, or `None` if out of range.
    pub fn remove_child_at(&mut self, parent: NodeId, index: usize) -> Option<NodeId> {
        let child = self.child_at(parent, index)?;
        self.remove_child(parent, child);
        Some(child)
    }

    /// Moves `child` to `index` among its siblings (clamped).
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale or `child` is not a child of
    /// `parent`.
    pub fn set_child_index(&mut self, parent: NodeId, child: NodeId, index: usize) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == p,
            "node is not a child of this parent"
        );
        let last = self.num_children(parent) - 1;
        let index = index.min(last);
        if self.child_index(c) == Some(index) {
            return;
        }
        self.unlink_from_parent(c);
        self.link_at(p, c, index);
        self.invalidate_transform(c);
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns an iterator over the direct children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns the first child of a node, if any.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let c = self.first_child[id.idx as usize];
        (c != INVALID).then(|| self.id_at(c))
    }

    /// Returns the next sibling in paint order, if any.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let s = self.next_sibling[id.idx as usize];
        (s != INVALID).then(|| self.id_at(s))
    }

    /// Returns the number of direct children.
    #[must_use]
    pub fn num_children(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// Returns the child at `index`, if any.
    #[must_use]
    pub fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).nth(index)
    }

    /// Returns `true` if `node` is `ancestor` or one of its descendants.
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.validate(ancestor);
        self.validate(node);
        let mut cur = node.idx;
        while cur != INVALID {
            if cur == ancestor.idx {
                return true;
            }
            cur = self.parent[cur as usize];
        }
        false
    }

    // -- Property getters --

    /// Returns the kind of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        self.validate(id);
        &self.kind[id.idx as usize]
    }

    /// Replaces a node's content, invalidating its content bounds.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, if the change would add or remove
    /// content (or the ability to hold children) from the node, or if either
    /// kind is [`NodeKind::Stage`].
    pub fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        self.validate(id);
        let i = id.idx as usize;
        let old = self.kind[i];
        assert!(
            !matches!(old, NodeKind::Stage) && !matches!(kind, NodeKind::Stage),
            "the stage kind is fixed"
        );
        assert!(
            old.has_content() == kind.has_content() && old.is_container() == kind.is_container(),
            "set_kind cannot change the shape of a node"
        );
        if old == kind {
            return;
        }
        self.kind[i] = kind;
        self.invalidate_content_bounds(id.idx);
    }

    /// Returns a node's diagnostic name.
    #[must_use]
    pub fn name(&self, id: NodeId) -> &str {
        self.validate(id);
        &self.name[id.idx as usize]
    }

    /// Sets a node's diagnostic name.
    pub fn set_name(&mut self, id: NodeId, name: &str) {
        self.validate(id);
        let slot = &mut self.name[id.idx as usize];
        slot.clear();
        slot.push_str(name);
    }

    /// Returns `true` if the node is attached below the stage.
    #[must_use]
    pub fn is_on_stage(&self, id: NodeId) -> bool {
        self.validate(id);
        self.on_stage[id.idx as usize]
    }

    /// Depth below the stage (the stage is 0), or 0 when detached.
    #[must_use]
    pub fn nest_level(&self, id: NodeId) -> u32 {
        self.validate(id);
        self.nest_level[id.idx as usize]
    }

    /// Returns the flags of a node.
    #[must_use]
    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Returns the retained surface the node owns, if it caches as a bitmap.
    #[must_use]
    pub fn surface_of(&self, id: NodeId) -> Option<SurfaceId> {
        self.validate(id);
        self.surface[id.idx as usize]
    }

    /// Returns the retained surface the node is drawn into.
    #[must_use]
    pub fn parent_surface(&self, id: NodeId) -> Option<SurfaceId> {
        self.validate(id);
        self.parent_surface[id.idx as usize]
    }

    /// Returns the node's on-screen region as of the last validation pass.
    /// `None` for kinds without content.
    #[must_use]
    pub fn render_region(&self, id: NodeId) -> Option<Region> {
        self.validate(id);
        self.render_region[id.idx as usize]
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Builds the current handle for a live slot.
    #[inline]
    pub(crate) fn id_at(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Returns the surface that `idx`'s children are drawn into.
    #[inline]
    pub(crate) fn enclosing_surface(&self, idx: u32) -> Option<SurfaceId> {
        self.surface[idx as usize].or(self.parent_surface[idx as usize])
    }

    fn child_index(&self, idx: u32) -> Option<usize> {
        let p = self.parent[idx as usize];
        if p == INVALID {
            return None;
        }
        let mut cur = self.first_child[p as usize];
        let mut i = 0;
        while cur != INVALID {
            if cur == idx {
                return Some(i);
            }
            cur = self.next_sibling[cur as usize];
            i += 1;
        }
        None
    }

    /// Inserts `c` before the `index`-th child of `p`, or appends.
    fn link_at(&mut self, p: u32, c: u32, index: usize) {
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        let mut prev = INVALID;
        let mut next = self.first_child[p as usize];
        let mut i = 0;
        while next != INVALID && i < index {
            prev = next;
            next = self.next_sibling[next as usize];
            i += 1;
        }

        self.prev_sibling[c as usize] = prev;
        self.next_sibling[c as usize] = next;
        if prev == INVALID {
            self.first_child[p as usize] = c;
        } else {
            self.next_sibling[prev as usize] = c;
        }
        if next != INVALID {
            self.prev_sibling[next as usize] = c;
        }
    }

    /// Removes `idx` from its parent's child list without touching flags.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }
        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    fn on_add_to_stage(&mut self, idx: u32, nest_level: u32) {
        self.on_stage[idx as usize] = true;
        self.nest_level[idx as usize] = nest_level;
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.on_add_to_stage(child, nest_level + 1);
            child = self.next_sibling[child as usize];
        }
    }

    fn on_remove_from_stage(&mut self, idx: u32) {
        self.on_stage[idx as usize] = false;
        self.nest_level[idx as usize] = 0;
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.on_remove_from_stage(child);
            child = self.next_sibling[child as usize];
        }
    }

    /// Points `idx`'s subtree at `new_parent` and queues every drawable in
    /// it on `parent_cache`. Stops at nested retained surfaces, which are
    /// queued as a unit.
    pub(crate) fn assign_parent_surface(
        &mut self,
        idx: u32,
        parent_cache: Option<SurfaceId>,
        new_parent: Option<SurfaceId>,
    ) {
        self.parent_surface[idx as usize] = new_parent;
        let own = self.surface[idx as usize];
        if let Some(cache) = parent_cache {
            if let Some(own) = own {
                self.mark_dirty(cache, DirtyEntry::Surface(own.idx));
            } else if self.render_region[idx as usize].is_some() {
                self.mark_dirty(cache, DirtyEntry::Node(idx));
            }
        }
        if own.is_some() {
            return;
        }
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.assign_parent_surface(child, parent_cache, new_parent);
            child = self.next_sibling[child as usize];
        }
    }

    /// Returns the dedup set of a surface's dirty queue, for tests.
    #[cfg(test)]
    pub(crate) fn queued_entries(
        &self,
        surface: SurfaceId,
    ) -> alloc::collections::BTreeSet<DirtyEntry> {
        self.surface_state(surface).queued.clone()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::node::kind::{Color, ShapeContent};

    fn shape(graph: &mut SceneGraph, w: f64, h: f64) -> NodeId {
        graph.create_node(NodeKind::Shape(ShapeContent {
            width: w,
            height: h,
            color: Color::BLACK,
        }))
    }

    #[test]
    fn create_and_destroy() {
        let mut graph = SceneGraph::new();
        let id = graph.create_node(NodeKind::Group);
        assert!(graph.is_alive(id));
        graph.destroy_node(id);
        assert!(!graph.is_alive(id));
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut graph = SceneGraph::new();
        let id1 = graph.create_node(NodeKind::Group);
        graph.destroy_node(id1);
        let id2 = graph.create_node(NodeKind::Group);
        assert!(!graph.is_alive(id1));
        assert!(graph.is_alive(id2));
        assert_eq!(id1.idx, id2.idx);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn stale_handle_panics() {
        let mut graph = SceneGraph::new();
        let id = graph.create_node(NodeKind::Group);
        graph.destroy_node(id);
        let _ = graph.parent(id);
    }

    #[test]
    fn add_child_at_orders_siblings() {
        let mut graph = SceneGraph::new();
        let parent = graph.create_node(NodeKind::Group);
        let a = graph.create_node(NodeKind::Group);
        let b = graph.create_node(NodeKind::Group);
        let c = graph.create_node(NodeKind::Group);
        graph.add_child(parent, a);
        graph.add_child(parent, c);
        graph.add_child_at(parent, b, 1);
        let kids: Vec<_> = graph.children(parent).collect();
        assert_eq!(kids, vec![a, b, c]);
        assert_eq!(graph.child_at(parent, 2), Some(c));
        assert_eq!(graph.num_children(parent), 3);
    }

    #[test]
    fn adding_to_a_new_parent_detaches_first() {
        let mut graph = SceneGraph::new();
        let p1 = graph.create_node(NodeKind::Group);
        let p2 = graph.create_node(NodeKind::Group);
        let child = graph.create_node(NodeKind::Group);
        graph.add_child(p1, child);
        graph.add_child(p2, child);
        assert_eq!(graph.parent(child), Some(p2));
        assert!(graph.children(p1).next().is_none());
    }

    #[test]
    fn set_child_index_reorders() {
        let mut graph = SceneGraph::new();
        let parent = graph.create_node(NodeKind::Group);
        let a = graph.create_node(NodeKind::Group);
        let b = graph.create_node(NodeKind::Group);
        graph.add_child(parent, a);
        graph.add_child(parent, b);
        graph.set_child_index(parent, b, 0);
        let kids: Vec<_> = graph.children(parent).collect();
        assert_eq!(kids, vec![b, a]);
        // Re-adding an existing child reorders instead of duplicating.
        graph.add_child(parent, b);
        let kids: Vec<_> = graph.children(parent).collect();
        assert_eq!(kids, vec![a, b]);
    }

    #[test]
    fn remove_child_at_returns_the_child() {
        let mut graph = SceneGraph::new();
        let parent = graph.create_node(NodeKind::Group);
        let a = graph.create_node(NodeKind::Group);
        graph.add_child(parent, a);
        assert_eq!(graph.remove_child_at(parent, 3), None);
        assert_eq!(graph.remove_child_at(parent, 0), Some(a));
        assert_eq!(graph.parent(a), None);
    }

    #[test]
    fn stage_membership_tracks_attachment() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let group = graph.create_node(NodeKind::Group);
        let leaf = shape(&mut graph, 10.0, 10.0);
        graph.add_child(group, leaf);
        assert!(!graph.is_on_stage(leaf));

        graph.add_child(stage, group);
        assert!(graph.is_on_stage(leaf));
        assert_eq!(graph.nest_level(leaf), 2);
        assert_eq!(graph.parent_surface(leaf), Some(graph.stage_surface()));

        graph.remove_child(stage, group);
        assert!(!graph.is_on_stage(leaf));
        assert_eq!(graph.parent_surface(leaf), None);
    }

    #[test]
    fn attaching_queues_drawables_on_the_stage_surface() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let group = graph.create_node(NodeKind::Group);
        let leaf = shape(&mut graph, 10.0, 10.0);
        graph.add_child(group, leaf);
        graph.add_child(stage, group);
        let queued = graph.queued_entries(graph.stage_surface());
        assert!(queued.contains(&DirtyEntry::Node(leaf.idx)));
        assert!(
            !queued.contains(&DirtyEntry::Node(group.idx)),
            "groups have no region"
        );
    }

    #[test]
    #[should_panic(expected = "cannot add a node to its own subtree")]
    fn cycles_are_rejected() {
        let mut graph = SceneGraph::new();
        let a = graph.create_node(NodeKind::Group);
        let b = graph.create_node(NodeKind::Group);
        graph.add_child(a, b);
        graph.add_child(b, a);
    }

    #[test]
    #[should_panic(expected = "cannot destroy node with children")]
    fn destroy_with_children_panics() {
        let mut graph = SceneGraph::new();
        let parent = graph.create_node(NodeKind::Group);
        let child = graph.create_node(NodeKind::Group);
        graph.add_child(parent, child);
        graph.destroy_node(parent);
    }

    #[test]
    fn destroy_detaches_from_parent() {
        let mut graph = SceneGraph::new();
        let stage = graph.stage();
        let leaf = shape(&mut graph, 5.0, 5.0);
        graph.add_child(stage, leaf);
        graph.destroy_node(leaf);
        assert!(graph.children(stage).next().is_none());
        assert!(
            !graph
                .queued_entries(graph.stage_surface())
                .contains(&DirtyEntry::Node(leaf.idx)),
            "queue entry is flushed"
        );
    }

    #[test]
    fn set_kind_swaps_content() {
        let mut graph = SceneGraph::new();
        let leaf = shape(&mut graph, 5.0, 5.0);
        graph.set_kind(
            leaf,
            NodeKind::Shape(ShapeContent {
                width: 8.0,
                height: 2.0,
                color: Color::WHITE,
            }),
        );
        assert_eq!(graph.content_bounds(leaf), Rect::new(0.0, 0.0, 8.0, 2.0));
    }

    #[test]
    fn names_are_stored() {
        let mut graph = SceneGraph::new();
        let a = graph.create_node(NodeKind::Group);
        graph.set_name(a, "hud");
        assert_eq!(graph.name(a), "hud");
        assert_eq!(graph.name(graph.stage()), "stage");
    }
}
