// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The draw pass.
//!
//! [`Compositor::draw`] repaints a validated retained surface. It clears and
//! clips the surface to its dirty rectangles, then walks the subtree in
//! paint order. A drawable is painted only if it was flagged during
//! validation or its region touches a dirty rectangle. Children are drawn
//! with one of three strategies:
//!
//! - **Plain**: content is drawn with the node's global transform. A child
//!   that owns a retained surface is redrawn internally if needed and then
//!   blitted as one image.
//! - **Clip**: children with a scroll rect or mask are drawn into a
//!   temporary canvas covering the clip region, masked with
//!   `destination-in`, and blitted back.
//! - **Blend**: children with a non-normal blend mode are drawn into a
//!   temporary canvas and blitted with the matching composite operation.
//!
//! Temporary canvases are pooled. When the backend cannot allocate one, the
//! subtree is drawn straight into the current canvas instead.

use alloc::vec::Vec;
use core::fmt;

use kurbo::{Affine, Point};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use stratum_core::node::{BlendMode, NodeId, PixelSampler, SceneGraph, SurfaceId};
use stratum_core::pool::Pool;
use stratum_core::region::Region;
use stratum_core::surface::Drawable;

use crate::canvas::{Canvas, CompositeOp, SurfaceFactory, render_content};
use crate::RenderError;

/// Tuning for temporary canvases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompositorConfig {
    /// Minimum side length of a temporary canvas, so small clips of varying
    /// size can share pooled buffers.
    pub min_scratch_size: u32,
    /// Number of released canvases kept for reuse.
    pub scratch_pool_capacity: usize,
}

impl CompositorConfig {
    /// The default tuning.
    pub const DEFAULT: Self = Self {
        min_scratch_size: 257,
        scratch_pool_capacity: 4,
    };
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

struct Buffer<C> {
    id: SurfaceId,
    canvas: C,
}

/// Owns the pixel buffers of retained surfaces and paints them.
pub struct Compositor<F: SurfaceFactory> {
    factory: F,
    config: CompositorConfig,
    /// Indexed by surface slot.
    buffers: Vec<Option<Buffer<F::Canvas>>>,
    scratch: Pool<F::Canvas>,
}

impl<F: SurfaceFactory> fmt::Debug for Compositor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compositor")
            .field("config", &self.config)
            .field("buffers", &self.buffers.iter().flatten().count())
            .field("pooled", &self.scratch.len())
            .finish_non_exhaustive()
    }
}

/// Converts a length to a buffer dimension, at least one pixel.
#[expect(
    clippy::cast_possible_truncation,
    reason = "clamped to the u32 range before the cast"
)]
fn pixel_size(v: f64) -> u32 {
    if v.is_nan() || v <= 1.0 {
        return 1;
    }
    v.ceil().min(f64::from(u32::MAX)) as u32
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "out-of-range coordinates saturate and read as transparent"
)]
fn pixel_coord(v: f64) -> i32 {
    v.floor() as i32
}

/// Blits a temporary canvas whose origin sits at `(x, y)` in the target's
/// base space.
fn draw_with_surface<C: Canvas>(canvas: &mut C, source: &C, draw_to_stage: bool, x: f64, y: f64) {
    if draw_to_stage {
        canvas.set_transform(Affine::translate((x, y)));
        canvas.draw_canvas(source, 0.0, 0.0);
    } else {
        canvas.save();
        canvas.transform(Affine::translate((x, y)));
        canvas.draw_canvas(source, 0.0, 0.0);
        canvas.restore();
    }
}

impl<F: SurfaceFactory> Compositor<F> {
    /// Creates a compositor with the default configuration.
    pub fn new(factory: F) -> Self {
        Self::with_config(factory, CompositorConfig::DEFAULT)
    }

    /// Creates a compositor with the given configuration.
    pub fn with_config(factory: F, config: CompositorConfig) -> Self {
        Self {
            factory,
            config,
            buffers: Vec::new(),
            scratch: Pool::new(config.scratch_pool_capacity),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> CompositorConfig {
        self.config
    }

    /// Returns the surface factory.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Returns the surface factory mutably.
    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    /// Returns the pixel buffer of a surface, if one has been allocated.
    #[must_use]
    pub fn canvas(&self, surface: SurfaceId) -> Option<&F::Canvas> {
        match self.buffers.get(surface.index() as usize) {
            Some(Some(buffer)) if buffer.id == surface => Some(&buffer.canvas),
            _ => None,
        }
    }

    /// Sizes the screen buffer of a stage surface, allocating it on first
    /// use. Pair with [`SceneGraph::set_clip_rect`].
    pub fn resize_stage(
        &mut self,
        surface: SurfaceId,
        width: f64,
        height: f64,
    ) -> Result<(), RenderError> {
        let (width, height) = (pixel_size(width), pixel_size(height));
        if let Some(mut canvas) = self.take_buffer(surface) {
            let result = canvas.resize(width, height);
            self.put_buffer(surface, canvas);
            return result;
        }
        let canvas = self.factory.create(width, height)?;
        self.put_buffer(surface, canvas);
        Ok(())
    }

    /// Repaints the dirty rectangles of a validated surface and returns the
    /// number of draw operations issued.
    ///
    /// Call after [`SceneGraph::update`]. Buffers of surfaces released since
    /// the last draw are recycled first.
    pub fn draw(&mut self, graph: &mut SceneGraph, surface: SurfaceId) -> usize {
        for released in graph.drain_released_surfaces() {
            if let Some(canvas) = self.take_buffer(released) {
                self.scratch.release(canvas);
            }
        }
        self.draw_to_surface(graph, surface).unwrap_or(0)
    }

    // -- Buffers --

    fn take_buffer(&mut self, id: SurfaceId) -> Option<F::Canvas> {
        let slot = self.buffers.get_mut(id.index() as usize)?;
        match slot.take() {
            Some(buffer) if buffer.id == id => Some(buffer.canvas),
            Some(stale) => {
                self.scratch.release(stale.canvas);
                None
            }
            None => None,
        }
    }

    fn put_buffer(&mut self, id: SurfaceId, canvas: F::Canvas) {
        let i = id.index() as usize;
        if self.buffers.len() <= i {
            self.buffers.resize_with(i + 1, || None);
        }
        self.buffers[i] = Some(Buffer { id, canvas });
    }

    /// Pops a pooled canvas or allocates one of exactly `width × height`.
    fn create_canvas(&mut self, width: u32, height: u32) -> Option<F::Canvas> {
        if let Some(mut canvas) = self.scratch.try_acquire() {
            if canvas.width() == width && canvas.height() == height {
                return Some(canvas);
            }
            match canvas.resize(width, height) {
                Ok(()) => return Some(canvas),
                Err(err) => tracing::warn!(%err, "dropping pooled canvas that failed to resize"),
            }
        }
        match self.factory.create(width, height) {
            Ok(canvas) => Some(canvas),
            Err(err) => {
                tracing::warn!(%err, width, height, "surface allocation failed; drawing directly");
                None
            }
        }
    }

    fn acquire_scratch(&mut self, region: &Region) -> Option<F::Canvas> {
        let min = self.config.min_scratch_size;
        self.create_canvas(
            pixel_size(region.width()).max(min),
            pixel_size(region.height()).max(min),
        )
    }

    /// Fits a non-stage surface's buffer to its root's bounds, preserving
    /// the retained pixels, and sets the base transform that maps global
    /// coordinates into the buffer.
    fn change_surface_size(
        &mut self,
        graph: &mut SceneGraph,
        surface: SurfaceId,
    ) -> Option<F::Canvas> {
        let root = graph.surface_root(surface);
        let bounds = graph.bounds(root);
        let (old_x, old_y) = graph.surface_state(surface).offset();
        graph.set_surface_offset(surface, bounds.x0, bounds.y0);
        let width = pixel_size(bounds.width());
        let height = pixel_size(bounds.height());

        let mut canvas = match self.take_buffer(surface) {
            None => self.create_canvas(width, height)?,
            Some(old)
                if old.width() == width
                    && old.height() == height
                    && old_x == bounds.x0
                    && old_y == bounds.y0 =>
            {
                old
            }
            Some(old) => match self.create_canvas(width, height) {
                Some(mut fresh) => {
                    fresh.set_transform(Affine::IDENTITY);
                    fresh.draw_canvas(&old, old_x - bounds.x0, old_y - bounds.y0);
                    self.scratch.release(old);
                    fresh
                }
                None => {
                    self.put_buffer(surface, old);
                    return None;
                }
            },
        };
        let inverse = graph.inverted_concatenated_matrix(root);
        canvas.set_transform(Affine::translate((-bounds.x0, -bounds.y0)) * inverse);
        Some(canvas)
    }

    // -- Draw pass --

    /// Returns `None` if the surface has no buffer to draw into.
    fn draw_to_surface(&mut self, graph: &mut SceneGraph, surface: SurfaceId) -> Option<usize> {
        let draw_to_stage = graph.surface_state(surface).draws_to_stage();
        let canvas = if draw_to_stage {
            self.take_buffer(surface)
        } else {
            self.change_surface_size(graph, surface)
        };
        let list = graph.take_dirty_list(surface);
        let Some(mut canvas) = canvas else {
            tracing::warn!(?surface, "retained surface has no buffer");
            graph.finish_draw(surface, list);
            return None;
        };

        if draw_to_stage {
            canvas.set_transform(Affine::IDENTITY);
        }
        canvas.save();
        for region in &list {
            canvas.clear_rect(region.to_rect());
        }
        canvas.clip_rects(&list);
        let root = graph.surface_root(surface);
        let calls =
            self.draw_display_object(graph, root, &mut canvas, &list, draw_to_stage, None, None);
        canvas.restore();

        graph.finish_draw(surface, list);
        self.put_buffer(surface, canvas);
        Some(calls)
    }

    /// Draws `id` and its subtree. With `cache`, the node is represented by
    /// that retained surface and its children are not visited.
    fn draw_display_object(
        &mut self,
        graph: &mut SceneGraph,
        id: NodeId,
        canvas: &mut F::Canvas,
        dirty: &[Region],
        draw_to_stage: bool,
        cache: Option<SurfaceId>,
        clip: Option<Region>,
    ) -> usize {
        let mut calls = 0;
        let drawable = match cache {
            Some(surface) => {
                let redrawn = if graph.surface_state(surface).needs_redraw() {
                    self.draw_to_surface(graph, surface)
                } else if self.canvas(surface).is_some() {
                    Some(0)
                } else {
                    None
                };
                let Some(n) = redrawn else {
                    return self.draw_display_object(
                        graph,
                        id,
                        canvas,
                        dirty,
                        draw_to_stage,
                        None,
                        clip,
                    );
                };
                calls += n;
                // The surface already holds its root's alpha.
                Some((Drawable::Surface(surface), 1.0))
            }
            None if graph.render_region(id).is_some() => {
                Some((Drawable::Node(id), graph.render_alpha(id)))
            }
            None => None,
        };

        if let Some((drawable, alpha)) = drawable {
            let region = graph.drawable_region(drawable).unwrap_or(Region::EMPTY);
            if clip.is_some_and(|c| !c.intersects(&region)) {
                graph.set_drawable_dirty(drawable, false);
            } else if !graph.is_drawable_dirty(drawable)
                && dirty.iter().any(|d| region.intersects(d))
            {
                graph.set_drawable_dirty(drawable, true);
            }
            if graph.is_drawable_dirty(drawable) {
                calls += 1;
                canvas.set_alpha(alpha);
                let matrix = graph.drawable_matrix(drawable);
                if draw_to_stage {
                    canvas.set_transform(matrix);
                    self.render(graph, drawable, canvas);
                } else {
                    canvas.save();
                    canvas.transform(matrix);
                    self.render(graph, drawable, canvas);
                    canvas.restore();
                }
                graph.set_drawable_dirty(drawable, false);
            }
        }
        if cache.is_some() {
            return calls;
        }

        let mut next = graph.first_child(id);
        while let Some(child) = next {
            next = graph.next_sibling(child);
            if !graph.visible(child)
                || graph.alpha(child) <= 0.0
                || graph.masked_object(child).is_some()
            {
                continue;
            }
            calls += if graph.scroll_rect(child).is_some() || graph.mask(child).is_some() {
                self.draw_with_clip(graph, child, canvas, dirty, draw_to_stage, clip)
            } else if graph.blend_mode(child) != BlendMode::Normal {
                self.draw_with_blend_mode(graph, child, canvas, dirty, draw_to_stage, clip)
            } else {
                let cache = graph.surface_of(child);
                self.draw_display_object(graph, child, canvas, dirty, draw_to_stage, cache, clip)
            };
        }
        calls
    }

    fn render(&self, graph: &SceneGraph, drawable: Drawable, canvas: &mut F::Canvas) {
        match drawable {
            Drawable::Node(id) => render_content(canvas, graph.kind(id)),
            Drawable::Surface(surface) => {
                if let Some(buffer) = self.canvas(surface) {
                    let (x, y) = graph.surface_state(surface).offset();
                    canvas.draw_canvas(buffer, x, y);
                }
            }
        }
    }

    fn draw_with_blend_mode(
        &mut self,
        graph: &mut SceneGraph,
        id: NodeId,
        canvas: &mut F::Canvas,
        dirty: &[Region],
        draw_to_stage: bool,
        clip: Option<Region>,
    ) -> usize {
        let bounds = graph.bounds(id);
        let matrix = graph.concatenated_matrix(id);
        let mut region = Region::EMPTY;
        region.update_region(bounds, matrix);
        if region.is_empty() || clip.is_some_and(|c| !c.intersects(&region)) {
            return 0;
        }
        let cache = graph.surface_of(id);
        let Some(mut scratch) = self.acquire_scratch(&region) else {
            return self.draw_display_object(graph, id, canvas, dirty, draw_to_stage, cache, clip);
        };

        scratch.set_transform(Affine::translate((-region.min_x, -region.min_y)));
        let mut calls =
            self.draw_display_object(graph, id, &mut scratch, dirty, false, cache, Some(region));
        if calls > 0 {
            calls += 1;
            canvas.set_alpha(1.0);
            canvas.set_composite(CompositeOp::from(graph.blend_mode(id)));
            draw_with_surface(canvas, &scratch, draw_to_stage, region.min_x, region.min_y);
            canvas.set_composite(CompositeOp::SourceOver);
        }
        self.scratch.release(scratch);
        calls
    }

    fn draw_with_clip(
        &mut self,
        graph: &mut SceneGraph,
        id: NodeId,
        canvas: &mut F::Canvas,
        dirty: &[Region],
        draw_to_stage: bool,
        clip: Option<Region>,
    ) -> usize {
        let scroll_rect = graph
            .scroll_rect(id)
            .filter(|r| r.width() > 0.0 && r.height() > 0.0);
        let mask = graph.mask(id);
        let matrix = graph.concatenated_matrix(id);

        let mask_region = match mask {
            Some(mask) => {
                let bounds = graph.bounds(mask);
                let mask_matrix = graph.concatenated_matrix(mask);
                let mut r = Region::EMPTY;
                r.update_region(bounds, mask_matrix);
                (!r.is_empty()).then_some(r)
            }
            None => None,
        };
        let scroll_region = scroll_rect.map(|rect| {
            let mut r = Region::EMPTY;
            r.update_region(rect, matrix);
            r
        });
        let region = match (scroll_region, mask_region) {
            (Some(mut r), Some(m)) => {
                r.intersect(&m);
                r
            }
            (Some(r), None) | (None, Some(r)) => r,
            (None, None) => return 0,
        };
        if region.is_empty()
            || clip.is_some_and(|c| !c.intersects(&region))
            || !dirty.iter().any(|d| region.intersects(d))
        {
            return 0;
        }

        let cache = graph.surface_of(id);
        let Some(mut scratch) = self.acquire_scratch(&region) else {
            return self.draw_display_object(graph, id, canvas, dirty, draw_to_stage, cache, clip);
        };
        let to_scratch = Affine::translate((-region.min_x, -region.min_y));
        if let Some(rect) = scroll_rect {
            scratch.set_transform(to_scratch * matrix);
            scratch.clip_rects(&[Region::from_rect(rect)]);
        }
        scratch.set_transform(to_scratch);
        let mut calls =
            self.draw_display_object(graph, id, &mut scratch, dirty, false, cache, Some(region));

        if let Some(mask) = mask {
            let Some(mut mask_scratch) = self.acquire_scratch(&region) else {
                self.scratch.release(scratch);
                return calls
                    + self.draw_display_object(graph, id, canvas, dirty, draw_to_stage, cache, clip);
            };
            mask_scratch.set_transform(to_scratch);
            let mask_cache = graph.surface_of(mask);
            let mask_calls = self.draw_display_object(
                graph,
                mask,
                &mut mask_scratch,
                dirty,
                false,
                mask_cache,
                Some(region),
            );
            if mask_calls > 0 {
                calls += mask_calls;
                scratch.set_composite(CompositeOp::DestinationIn);
                scratch.set_transform(Affine::IDENTITY);
                scratch.set_alpha(1.0);
                scratch.draw_canvas(&mask_scratch, 0.0, 0.0);
            }
            self.scratch.release(mask_scratch);
        }

        if calls > 0 {
            calls += 1;
            canvas.set_alpha(1.0);
            draw_with_surface(canvas, &scratch, draw_to_stage, region.min_x, region.min_y);
        }
        self.scratch.release(scratch);
        calls
    }
}

impl<F: SurfaceFactory> PixelSampler for Compositor<F> {
    /// Reads the retained surface when the node owns one. Otherwise renders
    /// the node's content into a 3×3 probe centered on the point. Without a
    /// probe canvas every point inside the bounds counts as opaque.
    fn sample_alpha(&mut self, graph: &SceneGraph, node: NodeId, local: Point) -> u8 {
        if let Some(surface) = graph.surface_of(node) {
            if let Some(buffer) = self.canvas(surface) {
                let (x, y) = graph.surface_state(surface).offset();
                return buffer.alpha_at(pixel_coord(local.x - x), pixel_coord(local.y - y));
            }
        }
        let Some(mut probe) = self.create_canvas(3, 3) else {
            return u8::MAX;
        };
        probe.set_transform(Affine::translate((1.0 - local.x, 1.0 - local.y)));
        render_content(&mut probe, graph.kind(node));
        let alpha = probe.alpha_at(1, 1);
        self.scratch.release(probe);
        alpha
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use kurbo::{Affine, Rect};
    use stratum_core::node::{BlendMode, Color, NodeId, NodeKind, SceneGraph, ShapeContent};
    use stratum_core::region::Region;

    use super::Compositor;
    use crate::CompositeOp;
    use crate::testing::{Call, RecordingFactory};

    const STAGE: u32 = 1;

    fn shape(graph: &mut SceneGraph, parent: NodeId, w: f64, h: f64) -> NodeId {
        let id = graph.create_node(NodeKind::Shape(ShapeContent {
            width: w,
            height: h,
            color: Color::BLACK,
        }));
        graph.add_child(parent, id);
        id
    }

    fn setup() -> (SceneGraph, Compositor<RecordingFactory>) {
        let mut graph = SceneGraph::new();
        let mut compositor = Compositor::new(RecordingFactory::new());
        let s = graph.stage_surface();
        graph.set_clip_rect(s, 200.0, 200.0);
        compositor.resize_stage(s, 200.0, 200.0).unwrap();
        compositor.factory().take_log();
        (graph, compositor)
    }

    fn frame(graph: &mut SceneGraph, compositor: &mut Compositor<RecordingFactory>) -> usize {
        let s = graph.stage_surface();
        graph.update(s);
        if graph.surface_state(s).dirty_list().is_empty() {
            return 0;
        }
        compositor.draw(graph, s)
    }

    fn fills(log: &[(u32, Call)], serial: u32) -> usize {
        log.iter()
            .filter(|(s, c)| *s == serial && matches!(c, Call::Fill(..)))
            .count()
    }

    #[test]
    fn first_frame_paints_every_content_node() {
        let (mut graph, mut compositor) = setup();
        let stage = graph.stage();
        shape(&mut graph, stage, 10.0, 10.0);
        let b = shape(&mut graph, stage, 10.0, 10.0);
        graph.set_x(b, 100.0);

        assert_eq!(frame(&mut graph, &mut compositor), 2);
        let log = compositor.factory().take_log();
        assert_eq!(fills(&log, STAGE), 2);
        assert!(
            log.contains(&(STAGE, Call::Clear(Rect::new(0.0, 0.0, 200.0, 200.0)))),
            "the first frame clears the whole stage"
        );
    }

    #[test]
    fn one_dirty_leaf_costs_one_draw_call() {
        let (mut graph, mut compositor) = setup();
        let stage = graph.stage();
        let a = shape(&mut graph, stage, 10.0, 10.0);
        let b = shape(&mut graph, stage, 10.0, 10.0);
        graph.set_x(b, 100.0);
        frame(&mut graph, &mut compositor);
        compositor.factory().take_log();

        graph.set_y(a, 20.0);
        assert_eq!(frame(&mut graph, &mut compositor), 1);
        let log = compositor.factory().take_log();
        assert_eq!(fills(&log, STAGE), 1);
        assert!(log.contains(&(STAGE, Call::SetTransform(Affine::translate((0.0, 20.0))))));
    }

    #[test]
    fn settled_scene_draws_nothing() {
        let (mut graph, mut compositor) = setup();
        let stage = graph.stage();
        shape(&mut graph, stage, 10.0, 10.0);
        frame(&mut graph, &mut compositor);
        assert_eq!(frame(&mut graph, &mut compositor), 0);
    }

    #[test]
    fn hidden_and_transparent_children_are_skipped() {
        let (mut graph, mut compositor) = setup();
        let stage = graph.stage();
        let hidden = shape(&mut graph, stage, 10.0, 10.0);
        let clear = shape(&mut graph, stage, 10.0, 10.0);
        shape(&mut graph, stage, 10.0, 10.0);
        graph.set_visible(hidden, false);
        graph.set_alpha(clear, 0.0);
        assert_eq!(frame(&mut graph, &mut compositor), 1);
    }

    #[test]
    fn blend_mode_composites_through_a_temporary_canvas() {
        let (mut graph, mut compositor) = setup();
        let stage = graph.stage();
        let leaf = shape(&mut graph, stage, 10.0, 10.0);
        graph.set_blend_mode(leaf, BlendMode::Add);

        // Content into the temporary canvas, then one blit.
        assert_eq!(frame(&mut graph, &mut compositor), 2);
        let log = compositor.factory().take_log();
        assert_eq!(fills(&log, 2), 1);
        assert_eq!(fills(&log, STAGE), 0);
        let add = log
            .iter()
            .position(|c| *c == (STAGE, Call::Composite(CompositeOp::Add)))
            .unwrap();
        let blit = log
            .iter()
            .position(|c| *c == (STAGE, Call::Blit(2, 0.0, 0.0)))
            .unwrap();
        let reset = log
            .iter()
            .position(|c| *c == (STAGE, Call::Composite(CompositeOp::SourceOver)))
            .unwrap();
        assert!(add < blit && blit < reset, "composite wraps the blit");
        // The region is the padded bounds [-1, -1, 11, 11].
        assert!(log.contains(&(STAGE, Call::SetTransform(Affine::translate((-1.0, -1.0))))));
    }

    #[test]
    fn mask_is_applied_with_destination_in() {
        let (mut graph, mut compositor) = setup();
        let stage = graph.stage();
        let target = shape(&mut graph, stage, 100.0, 100.0);
        let mask = shape(&mut graph, stage, 20.0, 20.0);
        graph.set_mask(target, Some(mask));

        // Target, mask, and the final blit.
        assert_eq!(frame(&mut graph, &mut compositor), 3);
        let log = compositor.factory().take_log();
        assert_eq!(fills(&log, STAGE), 0, "nothing paints the stage directly");
        assert_eq!(fills(&log, 2), 1);
        assert_eq!(fills(&log, 3), 1);
        assert!(log.contains(&(2, Call::Composite(CompositeOp::DestinationIn))));
        assert!(log.contains(&(2, Call::Blit(3, 0.0, 0.0))));
        assert!(log.contains(&(STAGE, Call::Blit(2, 0.0, 0.0))));
    }

    #[test]
    fn scroll_rect_clips_the_temporary_canvas() {
        let (mut graph, mut compositor) = setup();
        let stage = graph.stage();
        let view = shape(&mut graph, stage, 100.0, 100.0);
        shape(&mut graph, view, 100.0, 100.0);
        let rect = Rect::new(10.0, 10.0, 40.0, 40.0);
        graph.set_scroll_rect(view, Some(rect));

        assert_eq!(frame(&mut graph, &mut compositor), 3);
        let log = compositor.factory().take_log();
        assert!(log.contains(&(2, Call::Clip(vec![Region::from_rect(rect)]))));
        assert_eq!(fills(&log, 2), 2);
    }

    #[test]
    fn nested_cache_redraws_before_one_blit() {
        let (mut graph, mut compositor) = setup();
        let stage = graph.stage();
        let outer = shape(&mut graph, stage, 50.0, 50.0);
        graph.set_x(outer, 10.0);
        graph.set_y(outer, 10.0);
        let leaf = shape(&mut graph, outer, 10.0, 10.0);
        graph.set_x(leaf, 5.0);
        graph.set_cache_as_bitmap(outer, true);

        // Two nodes into the cache, one blit of the cache.
        assert_eq!(frame(&mut graph, &mut compositor), 3);
        let log = compositor.factory().take_log();
        assert_eq!(fills(&log, 2), 2);
        assert!(log.contains(&(STAGE, Call::Blit(2, 0.0, 0.0))));

        graph.set_alpha(leaf, 0.5);
        frame(&mut graph, &mut compositor);
        let log = compositor.factory().take_log();
        let blits: Vec<_> = log
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, (STAGE, Call::Blit(2, ..))))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(blits.len(), 1);
        let redraw = log.iter().position(|c| matches!(c, (2, Call::Fill(..)))).unwrap();
        assert!(redraw < blits[0], "the cache is refreshed before it is blitted");

        // Moving the cache root only moves the image.
        graph.set_x(outer, 100.0);
        assert_eq!(frame(&mut graph, &mut compositor), 1);
        let log = compositor.factory().take_log();
        assert_eq!(fills(&log, 2), 0);
    }

    #[test]
    fn failed_allocation_draws_directly() {
        let (mut graph, mut compositor) = setup();
        compositor.factory_mut().budget = Some(0);
        let stage = graph.stage();
        let leaf = shape(&mut graph, stage, 10.0, 10.0);
        graph.set_blend_mode(leaf, BlendMode::Erase);

        assert_eq!(frame(&mut graph, &mut compositor), 1);
        let log = compositor.factory().take_log();
        assert_eq!(fills(&log, STAGE), 1);
        assert!(!log.iter().any(|(_, c)| matches!(c, Call::Composite(_))));
    }

    #[test]
    fn disabling_a_cache_recycles_its_buffer() {
        let (mut graph, mut compositor) = setup();
        let stage = graph.stage();
        let outer = shape(&mut graph, stage, 50.0, 50.0);
        graph.set_cache_as_bitmap(outer, true);
        let surface = graph.surface_of(outer).unwrap();
        frame(&mut graph, &mut compositor);
        assert!(compositor.canvas(surface).is_some());

        graph.set_cache_as_bitmap(outer, false);
        frame(&mut graph, &mut compositor);
        assert!(compositor.canvas(surface).is_none());
        assert_eq!(compositor.scratch.len(), 1);
    }

    #[test]
    fn cached_nodes_sample_their_buffer() {
        use kurbo::Point;
        use stratum_core::node::PixelSampler;

        let (mut graph, mut compositor) = setup();
        let stage = graph.stage();
        let outer = shape(&mut graph, stage, 50.0, 50.0);
        let plain = shape(&mut graph, stage, 50.0, 50.0);
        graph.set_cache_as_bitmap(outer, true);
        frame(&mut graph, &mut compositor);

        let p = Point::new(5.0, 5.0);
        assert_eq!(compositor.sample_alpha(&graph, outer, p), u8::MAX);
        assert_eq!(compositor.sample_alpha(&graph, plain, p), u8::MAX);
        assert_eq!(graph.hit_test(stage, 5.0, 5.0, true, &mut compositor), Some(plain));
    }
}
