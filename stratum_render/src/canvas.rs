// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend drawing contract.
//!
//! The compositor issues every pixel operation through [`Canvas`], modeled on
//! an immediate-mode 2D context: a current transform, clip, global alpha and
//! composite operation, saved and restored as a stack. Backends provide the
//! canvas type and a [`SurfaceFactory`] that allocates offscreen ones.

use kurbo::{Affine, Rect};
use stratum_core::node::{BlendMode, Color, ImageId, NodeKind};
use stratum_core::pool::Reset;
use stratum_core::region::Region;

use crate::RenderError;

/// How source pixels combine with the destination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompositeOp {
    /// Source over destination.
    #[default]
    SourceOver,
    /// Sum of source and destination ("lighter").
    Add,
    /// Destination alpha reduced by source alpha ("destination-out").
    Erase,
    /// Destination kept only where the source is opaque.
    DestinationIn,
}

impl From<BlendMode> for CompositeOp {
    fn from(mode: BlendMode) -> Self {
        match mode {
            BlendMode::Normal => Self::SourceOver,
            BlendMode::Add => Self::Add,
            BlendMode::Erase => Self::Erase,
        }
    }
}

/// A pixel buffer with a 2D drawing state.
///
/// Coordinates passed to drawing methods are mapped through the current
/// transform. [`clip_rects`](Self::clip_rects) captures its rectangles in
/// device space at the time of the call, so later transform changes do not
/// move the clip.
///
/// [`Reset`] must clear the pixels and return the state stack to its
/// initial values (identity transform, no clip, alpha 1, source-over).
pub trait Canvas: Reset {
    /// Width in pixels.
    fn width(&self) -> u32;

    /// Height in pixels.
    fn height(&self) -> u32;

    /// Reallocates the buffer. The pixels and drawing state are reset, even
    /// when the size is unchanged.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    /// Pushes the drawing state.
    fn save(&mut self);

    /// Pops the drawing state. Unbalanced calls are ignored.
    fn restore(&mut self);

    /// Replaces the current transform.
    fn set_transform(&mut self, transform: Affine);

    /// Post-multiplies the current transform by `transform`.
    fn transform(&mut self, transform: Affine);

    /// Intersects the clip with the union of `rects`.
    fn clip_rects(&mut self, rects: &[Region]);

    /// Makes `rect` fully transparent, ignoring alpha and composite state.
    fn clear_rect(&mut self, rect: Rect);

    /// Sets the global alpha applied to subsequent draws.
    fn set_alpha(&mut self, alpha: f64);

    /// Sets the composite operation applied to subsequent draws.
    fn set_composite(&mut self, op: CompositeOp);

    /// Fills `rect` with `color`.
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Draws the image `image` stretched over `dest`.
    fn draw_image(&mut self, image: ImageId, dest: Rect);

    /// Draws another canvas with its top-left corner at `(x, y)`.
    fn draw_canvas(&mut self, source: &Self, x: f64, y: f64);

    /// Reads the alpha of the pixel at `(x, y)`; 0 outside the buffer.
    fn alpha_at(&self, x: i32, y: i32) -> u8;
}

/// Allocates offscreen canvases.
pub trait SurfaceFactory {
    /// The canvas type produced.
    type Canvas: Canvas;

    /// Creates a transparent canvas of the given size.
    fn create(&mut self, width: u32, height: u32) -> Result<Self::Canvas, RenderError>;
}

/// Paints a node kind's own content in its local space.
pub fn render_content<C: Canvas>(canvas: &mut C, kind: &NodeKind) {
    match kind {
        NodeKind::Stage | NodeKind::Group => {}
        NodeKind::Shape(shape) => {
            canvas.fill_rect(Rect::new(0.0, 0.0, shape.width, shape.height), shape.color);
        }
        NodeKind::Bitmap(bitmap) => {
            canvas.draw_image(
                bitmap.image,
                Rect::new(0.0, 0.0, bitmap.width, bitmap.height),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_modes_map_to_composite_ops() {
        assert_eq!(CompositeOp::from(BlendMode::Normal), CompositeOp::SourceOver);
        assert_eq!(CompositeOp::from(BlendMode::Add), CompositeOp::Add);
        assert_eq!(CompositeOp::from(BlendMode::Erase), CompositeOp::Erase);
        assert_eq!(
            CompositeOp::from(BlendMode::from_name("multiply")),
            CompositeOp::SourceOver,
            "unknown names composite normally"
        );
    }
}
