// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained-surface bookkeeping and the per-frame validation pass.
//!
//! A retained surface is an offscreen image of one subtree. The stage owns
//! one that draws straight to the screen; every node with `cache_as_bitmap`
//! owns another. This module holds the non-pixel half of each surface: the
//! queue of drawables whose on-screen region may have changed, the dirty
//! accumulator they feed, and the region the flattened image occupies in
//! the enclosing surface. Pixel buffers live in the renderer, keyed by
//! [`SurfaceId`].
//!
//! # Validation
//!
//! [`SceneGraph::update`] drains a surface's queue in insertion order. For
//! every queued drawable the *old* region is added to the accumulator (the
//! pixels it used to cover), its caches are revalidated, and the *new*
//! region is added if it moved or the old one did not register. Nested
//! surfaces are queued in their parent's queue as a single entry and
//! validate their own queue when their entry is processed.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use kurbo::Affine;

use crate::dirty::DirtyRegion;
use crate::node::{INVALID, NodeFlags, NodeId, SceneGraph, SurfaceId};
use crate::pool::Reset;
use crate::region::Region;

/// A queued drawable. Nodes and surfaces are identified by slot index; the
/// queue is flushed whenever either is destroyed, so indices never go stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum DirtyEntry {
    Node(u32),
    Surface(u32),
}

/// Something the draw pass paints as one unit: a content node, or the
/// flattened image of a nested retained surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Drawable {
    /// A node with its own content.
    Node(NodeId),
    /// A nested retained surface, blitted as a single image.
    Surface(SurfaceId),
}

/// The core half of a retained surface.
#[derive(Clone, Debug)]
pub struct SurfaceState {
    pub(crate) root: u32,
    pub(crate) draw_to_stage: bool,
    pub(crate) needs_redraw: bool,
    pub(crate) queue: Vec<DirtyEntry>,
    pub(crate) queued: BTreeSet<DirtyEntry>,
    pub(crate) dirty_region: DirtyRegion,
    pub(crate) dirty_list: Vec<Region>,
    pub(crate) region: Region,
    pub(crate) render_alpha: f64,
    pub(crate) render_matrix: Affine,
    pub(crate) offset_x: f64,
    pub(crate) offset_y: f64,
    pub(crate) is_dirty: bool,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            root: INVALID,
            draw_to_stage: false,
            needs_redraw: false,
            queue: Vec::new(),
            queued: BTreeSet::new(),
            dirty_region: DirtyRegion::new(),
            dirty_list: Vec::new(),
            region: Region::EMPTY,
            render_alpha: 1.0,
            render_matrix: Affine::IDENTITY,
            offset_x: 0.0,
            offset_y: 0.0,
            is_dirty: false,
        }
    }
}

impl Reset for SurfaceState {
    fn reset(&mut self) {
        self.root = INVALID;
        self.draw_to_stage = false;
        self.needs_redraw = false;
        self.queue.clear();
        self.queued.clear();
        self.dirty_region.reset();
        self.dirty_list.clear();
        self.region = Region::EMPTY;
        self.render_alpha = 1.0;
        self.render_matrix = Affine::IDENTITY;
        self.offset_x = 0.0;
        self.offset_y = 0.0;
        self.is_dirty = false;
    }
}

impl SurfaceState {
    /// Returns `true` if something queued since the last draw.
    #[must_use]
    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Returns `true` for the surface that draws to the screen.
    #[must_use]
    pub fn draws_to_stage(&self) -> bool {
        self.draw_to_stage
    }

    /// Finalized dirty rectangles from the last validation pass.
    #[must_use]
    pub fn dirty_list(&self) -> &[Region] {
        &self.dirty_list
    }

    /// Region the flattened image covers in the enclosing surface.
    #[must_use]
    pub fn region(&self) -> Region {
        self.region
    }

    /// Root alpha as of the last validation pass.
    #[must_use]
    pub fn render_alpha(&self) -> f64 {
        self.render_alpha
    }

    /// Root concatenated matrix as of the last validation pass.
    #[must_use]
    pub fn render_matrix(&self) -> Affine {
        self.render_matrix
    }

    /// Position of the buffer's origin in the root's local space.
    #[must_use]
    pub fn offset(&self) -> (f64, f64) {
        (self.offset_x, self.offset_y)
    }

    /// Number of drawables waiting for validation.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

impl SceneGraph {
    // -- Allocation --

    pub(crate) fn acquire_surface(&mut self, root: u32, draw_to_stage: bool) -> SurfaceId {
        let mut state = self.surface_pool.acquire();
        state.root = root;
        state.draw_to_stage = draw_to_stage;
        state.dirty_region.set_config(self.dirty_config);
        state.region.moved = true;
        let idx = if let Some(idx) = self.surface_free.pop() {
            self.surfaces[idx as usize] = Some(state);
            idx
        } else {
            let idx = u32::try_from(self.surfaces.len()).unwrap_or(INVALID);
            assert!(idx != INVALID, "surface table exhausted");
            self.surfaces.push(Some(state));
            self.surface_generation.push(0);
            idx
        };
        let id = self.surface_id_at(idx);
        tracing::trace!(surface = ?id, root, draw_to_stage, "acquired retained surface");
        id
    }

    /// Returns the surface state to the pool and retires its id.
    pub(crate) fn release_surface(&mut self, id: SurfaceId) {
        self.validate_surface(id);
        self.forget_dirty_entry(DirtyEntry::Surface(id.idx));
        let i = id.idx as usize;
        if let Some(state) = self.surfaces[i].take() {
            self.surface_pool.release(state);
        }
        self.surface_generation[i] += 1;
        self.surface_free.push(id.idx);
        self.pending_released.push(id);
        tracing::trace!(surface = ?id, "released retained surface");
    }

    /// Drops `entry` from every queue. Where it was still pending, the
    /// pixels it last covered are added to that surface's accumulator so the
    /// vacated area is repainted.
    pub(crate) fn forget_dirty_entry(&mut self, entry: DirtyEntry) {
        let (old, alpha) = match entry {
            DirtyEntry::Node(idx) => (
                self.render_region[idx as usize],
                self.render_alpha[idx as usize],
            ),
            DirtyEntry::Surface(idx) => match &self.surfaces[idx as usize] {
                Some(state) => (Some(state.region), state.render_alpha),
                None => (None, 0.0),
            },
        };
        for state in self.surfaces.iter_mut().flatten() {
            if !state.queued.remove(&entry) {
                continue;
            }
            state.queue.retain(|e| *e != entry);
            if let Some(region) = &old {
                if alpha > 0.0 {
                    state.dirty_region.add_region(region);
                }
            }
        }
    }

    /// Ids of surfaces released since the last call, so renderers can free
    /// the matching pixel buffers.
    pub fn drain_released_surfaces(&mut self) -> alloc::vec::Drain<'_, SurfaceId> {
        self.pending_released.drain(..)
    }

    // -- Lookup --

    /// Returns `true` if the id refers to a live surface.
    #[must_use]
    pub fn is_surface_alive(&self, id: SurfaceId) -> bool {
        (id.idx as usize) < self.surfaces.len()
            && self.surface_generation[id.idx as usize] == id.generation
            && self.surfaces[id.idx as usize].is_some()
    }

    /// Returns the state of a live surface.
    ///
    /// # Panics
    ///
    /// Panics if the id is stale.
    #[must_use]
    pub fn surface_state(&self, id: SurfaceId) -> &SurfaceState {
        self.validate_surface(id);
        match &self.surfaces[id.idx as usize] {
            Some(state) => state,
            None => unreachable!("validated surface slot is occupied"),
        }
    }

    pub(crate) fn surface_state_mut(&mut self, id: SurfaceId) -> &mut SurfaceState {
        self.validate_surface(id);
        match &mut self.surfaces[id.idx as usize] {
            Some(state) => state,
            None => unreachable!("validated surface slot is occupied"),
        }
    }

    /// Returns the node whose subtree the surface holds.
    #[must_use]
    pub fn surface_root(&self, id: SurfaceId) -> NodeId {
        self.id_at(self.surface_state(id).root)
    }

    /// Records where the buffer origin sits in the root's local space.
    pub fn set_surface_offset(&mut self, id: SurfaceId, x: f64, y: f64) {
        let state = self.surface_state_mut(id);
        state.offset_x = x;
        state.offset_y = y;
    }

    fn validate_surface(&self, id: SurfaceId) {
        assert!(
            self.is_surface_alive(id),
            "stale SurfaceId: {id:?} (current gen: {})",
            self.surface_generation
                .get(id.idx as usize)
                .copied()
                .unwrap_or(u32::MAX)
        );
    }

    pub(crate) fn surface_id_at(&self, idx: u32) -> SurfaceId {
        SurfaceId {
            idx,
            generation: self.surface_generation[idx as usize],
        }
    }

    // -- Queueing --

    /// Queues `entry` for validation on `surface`. The first entry of a frame
    /// also queues the surface itself on its enclosing surface, so dirtiness
    /// crosses every cache boundary up to the stage.
    pub(crate) fn mark_dirty(&mut self, surface: SurfaceId, entry: DirtyEntry) {
        let state = self.surface_state_mut(surface);
        if !state.queued.insert(entry) {
            return;
        }
        state.queue.push(entry);
        if state.needs_redraw {
            return;
        }
        state.needs_redraw = true;
        let root = state.root;
        if let Some(parent) = self.parent_surface[root as usize] {
            self.mark_dirty(parent, DirtyEntry::Surface(surface.idx));
        }
    }

    /// Bounds the stage surface to `[0, 0, width, height]` and forces one
    /// full repaint.
    pub fn set_clip_rect(&mut self, surface: SurfaceId, width: f64, height: f64) {
        let state = self.surface_state_mut(surface);
        state.dirty_region.set_clip_rect(width, height);
        state.draw_to_stage = true;
    }

    // -- Validation pass --

    /// Validates a surface: refreshes the root's alpha, matrix and bounds,
    /// drains the dirty queue into the accumulator, and recomputes the
    /// region the flattened image occupies.
    ///
    /// Returns `true` if that region changed.
    pub fn update(&mut self, surface: SurfaceId) -> bool {
        let root = self.surface_state(surface).root;
        self.remove_flags_up(root, NodeFlags::DIRTY);
        let alpha = self.concat_alpha(root);
        let matrix = self.concat_matrix(root);
        let bounds = self.cumulative_bounds(root);
        let state = self.surface_state_mut(surface);
        state.render_alpha = alpha;
        state.render_matrix = matrix;
        if state.needs_redraw || state.draw_to_stage {
            self.update_dirty_regions(surface);
        }
        if !self.on_stage[root as usize] {
            return false;
        }
        let state = self.surface_state_mut(surface);
        if !state.region.moved {
            return false;
        }
        state.region.moved = false;
        state.region.update_region(bounds, matrix);
        if !state.draw_to_stage {
            self.refresh_render_regions(root, root);
        }
        true
    }

    /// Revalidates a content node. Returns `true` if its region changed.
    pub(crate) fn update_node(&mut self, idx: u32) -> bool {
        let i = idx as usize;
        self.remove_flags_up(idx, NodeFlags::DIRTY);
        self.render_alpha[i] = self.concat_alpha(idx);
        let matrix = self.concat_matrix(idx);
        let bounds = self.own_content_bounds(idx);
        if !self.on_stage[i] {
            return false;
        }
        let Some(region) = &mut self.render_region[i] else {
            return false;
        };
        if !region.moved {
            return false;
        }
        region.moved = false;
        region.update_region(bounds, matrix);
        true
    }

    /// A moved cache root drags every descendant's global region with it.
    fn refresh_render_regions(&mut self, idx: u32, root: u32) {
        let i = idx as usize;
        if self.render_region[i].is_some() {
            self.update_node(idx);
        }
        if idx != root {
            if let Some(nested) = self.surface[i] {
                let matrix = self.concat_matrix(idx);
                let bounds = self.cumulative_bounds(idx);
                let state = self.surface_state_mut(nested);
                state.render_matrix = matrix;
                state.region.moved = false;
                state.region.update_region(bounds, matrix);
            }
        }
        let mut child = self.first_child[i];
        while child != INVALID {
            self.refresh_render_regions(child, root);
            child = self.next_sibling[child as usize];
        }
    }

    fn update_dirty_regions(&mut self, surface: SurfaceId) {
        let state = self.surface_state_mut(surface);
        let mut queue = core::mem::take(&mut state.queue);
        state.queued.clear();

        for &entry in &queue {
            match entry {
                DirtyEntry::Node(idx) => {
                    let i = idx as usize;
                    let Some(old) = self.render_region[i] else {
                        continue;
                    };
                    if self.render_alpha[i] > 0.0
                        && self
                            .surface_state_mut(surface)
                            .dirty_region
                            .add_region(&old)
                    {
                        self.is_dirty[i] = true;
                    }
                    let moved = self.update_node(idx);
                    let Some(new) = self.render_region[i] else {
                        continue;
                    };
                    if self.render_alpha[i] > 0.0
                        && (moved || !self.is_dirty[i])
                        && self
                            .surface_state_mut(surface)
                            .dirty_region
                            .add_region(&new)
                    {
                        self.is_dirty[i] = true;
                    }
                }
                DirtyEntry::Surface(nested_idx) => {
                    let nested = self.surface_id_at(nested_idx);
                    let (old, old_alpha) = {
                        let n = self.surface_state(nested);
                        (n.region, n.render_alpha)
                    };
                    if old_alpha > 0.0
                        && self
                            .surface_state_mut(surface)
                            .dirty_region
                            .add_region(&old)
                    {
                        self.surface_state_mut(nested).is_dirty = true;
                    }
                    let moved = self.update(nested);
                    let n = self.surface_state(nested);
                    let (new, alpha, is_dirty) = (n.region, n.render_alpha, n.is_dirty);
                    if alpha > 0.0
                        && (moved || !is_dirty)
                        && self
                            .surface_state_mut(surface)
                            .dirty_region
                            .add_region(&new)
                    {
                        self.surface_state_mut(nested).is_dirty = true;
                    }
                }
            }
        }

        let state = self.surface_state_mut(surface);
        if state.queue.is_empty() {
            queue.clear();
            state.queue = queue;
        }
        let SurfaceState {
            dirty_region,
            dirty_list,
            ..
        } = state;
        dirty_list.clear();
        dirty_list.extend_from_slice(dirty_region.dirty_regions());
    }

    // -- Draw-pass support --

    /// Moves the finalized dirty list out for drawing. Hand it back with
    /// [`finish_draw`](Self::finish_draw).
    pub fn take_dirty_list(&mut self, surface: SurfaceId) -> Vec<Region> {
        core::mem::take(&mut self.surface_state_mut(surface).dirty_list)
    }

    /// Ends a surface's draw: resets its accumulator and clears
    /// `needs_redraw`. `list` is recycled as storage for the next frame.
    pub fn finish_draw(&mut self, surface: SurfaceId, mut list: Vec<Region>) {
        let state = self.surface_state_mut(surface);
        state.dirty_region.clear();
        state.needs_redraw = false;
        list.clear();
        state.dirty_list = list;
    }

    /// Region the drawable occupies on its surface.
    #[must_use]
    pub fn drawable_region(&self, drawable: Drawable) -> Option<Region> {
        match drawable {
            Drawable::Node(id) => self.render_region(id),
            Drawable::Surface(s) => Some(self.surface_state(s).region),
        }
    }

    /// Returns `true` if the drawable must be repainted this frame.
    #[must_use]
    pub fn is_drawable_dirty(&self, drawable: Drawable) -> bool {
        match drawable {
            Drawable::Node(id) => {
                self.validate(id);
                self.is_dirty[id.idx as usize]
            }
            Drawable::Surface(s) => self.surface_state(s).is_dirty,
        }
    }

    /// Sets or clears the drawable's repaint marker.
    pub fn set_drawable_dirty(&mut self, drawable: Drawable, dirty: bool) {
        match drawable {
            Drawable::Node(id) => {
                self.validate(id);
                self.is_dirty[id.idx as usize] = dirty;
            }
            Drawable::Surface(s) => self.surface_state_mut(s).is_dirty = dirty,
        }
    }

    /// Global transform the drawable paints with.
    pub fn drawable_matrix(&mut self, drawable: Drawable) -> Affine {
        match drawable {
            Drawable::Node(id) => self.concatenated_matrix(id),
            Drawable::Surface(s) => self.surface_state(s).render_matrix,
        }
    }
}
