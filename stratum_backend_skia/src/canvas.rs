// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A [`Canvas`] backed by a tiny-skia [`Pixmap`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use kurbo::{Affine, Rect};
use stratum_core::node::{Color, ImageId};
use stratum_core::pool::Reset;
use stratum_core::region::Region;
use stratum_render::{Canvas, CompositeOp, RenderError};
use tiny_skia::{
    BlendMode, FillRule, FilterQuality, Mask, Paint, PathBuilder, Pixmap, PixmapPaint, Transform,
};

/// Decoded images shared between a factory and the canvases it creates.
pub(crate) type ImageTable = Rc<RefCell<Vec<Pixmap>>>;

#[derive(Clone)]
struct DrawState {
    transform: Affine,
    /// Device-space coverage; `None` means unclipped.
    clip: Option<Rc<Mask>>,
    alpha: f32,
    composite: CompositeOp,
}

impl DrawState {
    fn initial() -> Self {
        Self {
            transform: Affine::IDENTITY,
            clip: None,
            alpha: 1.0,
            composite: CompositeOp::SourceOver,
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "tiny-skia geometry is f32"
)]
fn to_transform(affine: Affine) -> Transform {
    let [sx, ky, kx, sy, tx, ty] = affine.as_coeffs();
    Transform::from_row(
        sx as f32, ky as f32, kx as f32, sy as f32, tx as f32, ty as f32,
    )
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "tiny-skia geometry is f32"
)]
fn to_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_ltrb(
        rect.x0 as f32,
        rect.y0 as f32,
        rect.x1 as f32,
        rect.y1 as f32,
    )
}

fn blend_mode(op: CompositeOp) -> BlendMode {
    match op {
        CompositeOp::SourceOver => BlendMode::SourceOver,
        CompositeOp::Add => BlendMode::Plus,
        CompositeOp::Erase => BlendMode::DestinationOut,
        CompositeOp::DestinationIn => BlendMode::DestinationIn,
    }
}

/// Nearest sampling for whole-pixel translations keeps blits exact.
fn filter_for(affine: Affine) -> FilterQuality {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    let pixel_aligned =
        a == 1.0 && b == 0.0 && c == 0.0 && d == 1.0 && e.fract() == 0.0 && f.fract() == 0.0;
    if pixel_aligned {
        FilterQuality::Nearest
    } else {
        FilterQuality::Bilinear
    }
}

/// An RGBA pixel buffer with an HTML-canvas-like drawing state.
pub struct SkiaCanvas {
    pixmap: Pixmap,
    state: DrawState,
    stack: Vec<DrawState>,
    images: ImageTable,
}

impl fmt::Debug for SkiaCanvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkiaCanvas")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .field("depth", &self.stack.len())
            .finish_non_exhaustive()
    }
}

impl SkiaCanvas {
    pub(crate) fn new(width: u32, height: u32, images: ImageTable) -> Result<Self, RenderError> {
        Ok(Self {
            pixmap: allocate(width, height)?,
            state: DrawState::initial(),
            stack: Vec::new(),
            images,
        })
    }

    /// Returns the pixels.
    #[must_use]
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Reads the premultiplied RGBA value at `(x, y)`, or `None` outside the
    /// buffer.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let p = self.pixmap.pixel(x, y)?;
        Some([p.red(), p.green(), p.blue(), p.alpha()])
    }

    /// Issues one draw with the current transform, clip, and composite.
    ///
    /// `destination-in` also clears destination pixels the source does not
    /// cover, so the source is rendered into a full-size layer first and
    /// the layer is composited over the whole buffer.
    fn paint(
        &mut self,
        affine: Affine,
        draw: impl FnOnce(&mut Pixmap, BlendMode, Transform, Option<&Mask>),
    ) {
        let transform = to_transform(affine);
        let clip = self.state.clip.clone();
        if self.state.composite != CompositeOp::DestinationIn {
            let mode = blend_mode(self.state.composite);
            draw(&mut self.pixmap, mode, transform, clip.as_deref());
            return;
        }
        let Some(mut layer) = Pixmap::new(self.pixmap.width(), self.pixmap.height()) else {
            return;
        };
        draw(&mut layer, BlendMode::SourceOver, transform, None);
        let paint = PixmapPaint {
            blend_mode: BlendMode::DestinationIn,
            quality: FilterQuality::Nearest,
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            layer.as_ref(),
            &paint,
            Transform::identity(),
            clip.as_deref(),
        );
    }
}

fn allocate(width: u32, height: u32) -> Result<Pixmap, RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidSize);
    }
    Pixmap::new(width, height).ok_or(RenderError::SurfaceUnavailable { width, height })
}

impl Reset for SkiaCanvas {
    fn reset(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
        self.state = DrawState::initial();
        self.stack.clear();
    }
}

impl Canvas for SkiaCanvas {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.pixmap = allocate(width, height)?;
        self.state = DrawState::initial();
        self.stack.clear();
        Ok(())
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn set_transform(&mut self, transform: Affine) {
        self.state.transform = transform;
    }

    fn transform(&mut self, transform: Affine) {
        self.state.transform *= transform;
    }

    fn clip_rects(&mut self, rects: &[Region]) {
        let Some(mut mask) = Mask::new(self.pixmap.width(), self.pixmap.height()) else {
            return;
        };
        let mut builder = PathBuilder::new();
        for rect in rects.iter().filter_map(|r| to_rect(r.to_rect())) {
            builder.push_rect(rect);
        }
        let transform = to_transform(self.state.transform);
        // An empty path leaves the fresh mask zeroed, which clips everything.
        if let Some(path) = builder.finish() {
            match self.state.clip.take() {
                Some(existing) => {
                    mask = Rc::unwrap_or_clone(existing);
                    mask.intersect_path(&path, FillRule::Winding, false, transform);
                }
                None => mask.fill_path(&path, FillRule::Winding, false, transform),
            }
        }
        self.state.clip = Some(Rc::new(mask));
    }

    fn clear_rect(&mut self, rect: Rect) {
        let Some(rect) = to_rect(rect) else {
            return;
        };
        let paint = Paint {
            blend_mode: BlendMode::Clear,
            anti_alias: false,
            ..Paint::default()
        };
        self.pixmap.fill_rect(
            rect,
            &paint,
            to_transform(self.state.transform),
            self.state.clip.as_deref(),
        );
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "alpha is clamped to [0, 1]"
    )]
    fn set_alpha(&mut self, alpha: f64) {
        self.state.alpha = alpha.clamp(0.0, 1.0) as f32;
    }

    fn set_composite(&mut self, op: CompositeOp) {
        self.state.composite = op;
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some(rect) = to_rect(rect) else {
            return;
        };
        let mut fill = tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a);
        fill.apply_opacity(self.state.alpha);
        self.paint(self.state.transform, |target, blend_mode, transform, clip| {
            let mut paint = Paint {
                blend_mode,
                ..Paint::default()
            };
            paint.set_color(fill);
            target.fill_rect(rect, &paint, transform, clip);
        });
    }

    fn draw_image(&mut self, image: ImageId, dest: Rect) {
        let images = Rc::clone(&self.images);
        let images = images.borrow();
        let Some(pixels) = images.get(image.0 as usize) else {
            tracing::debug!(?image, "skipping unregistered image");
            return;
        };
        if dest.width() <= 0.0 || dest.height() <= 0.0 {
            return;
        }
        let fit = Affine::translate((dest.x0, dest.y0))
            * Affine::scale_non_uniform(
                dest.width() / f64::from(pixels.width()),
                dest.height() / f64::from(pixels.height()),
            );
        let affine = self.state.transform * fit;
        let paint = PixmapPaint {
            opacity: self.state.alpha,
            blend_mode: BlendMode::SourceOver,
            quality: filter_for(affine),
        };
        self.paint(affine, |target, blend_mode, transform, clip| {
            let paint = PixmapPaint { blend_mode, ..paint };
            target.draw_pixmap(0, 0, pixels.as_ref(), &paint, transform, clip);
        });
    }

    fn draw_canvas(&mut self, source: &Self, x: f64, y: f64) {
        let affine = self.state.transform * Affine::translate((x, y));
        let opacity = self.state.alpha;
        self.paint(affine, |target, blend_mode, transform, clip| {
            let paint = PixmapPaint {
                opacity,
                blend_mode,
                quality: filter_for(affine),
            };
            target.draw_pixmap(0, 0, source.pixmap.as_ref(), &paint, transform, clip);
        });
    }

    fn alpha_at(&self, x: i32, y: i32) -> u8 {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return 0;
        };
        self.pixmap.pixel(x, y).map_or(0, |p| p.alpha())
    }
}
