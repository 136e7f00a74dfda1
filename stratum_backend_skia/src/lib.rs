// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU raster backend for stratum, built on [tiny-skia].
//!
//! [`SkiaFactory`] allocates [`SkiaCanvas`] buffers for the compositor and
//! owns the table of decoded images that bitmap nodes reference by
//! [`ImageId`]. Composite operations map onto tiny-skia blend modes:
//!
//! | Composite            | tiny-skia        |
//! |----------------------|------------------|
//! | source-over          | `SourceOver`     |
//! | add ("lighter")      | `Plus`           |
//! | erase                | `DestinationOut` |
//! | destination-in       | `DestinationIn`  |
//!
//! [tiny-skia]: https://docs.rs/tiny-skia

#![cfg_attr(docsrs, feature(doc_cfg))]

mod canvas;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use stratum_core::node::ImageId;
use stratum_render::{RenderError, SurfaceFactory};
use tiny_skia::Pixmap;

pub use canvas::SkiaCanvas;
use canvas::ImageTable;

/// Allocates tiny-skia canvases and holds registered images.
pub struct SkiaFactory {
    images: ImageTable,
    max_side: u32,
}

impl fmt::Debug for SkiaFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkiaFactory")
            .field("images", &self.images.borrow().len())
            .field("max_side", &self.max_side)
            .finish()
    }
}

impl Default for SkiaFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SkiaFactory {
    /// Creates a factory with no size limit beyond what tiny-skia accepts.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_side(u32::MAX)
    }

    /// Creates a factory that refuses buffers wider or taller than
    /// `max_side` pixels.
    #[must_use]
    pub fn with_max_side(max_side: u32) -> Self {
        Self {
            images: Rc::new(RefCell::new(Vec::new())),
            max_side,
        }
    }

    /// Stores decoded pixels and returns the id bitmap nodes use to draw
    /// them.
    pub fn register_image(&mut self, pixels: Pixmap) -> ImageId {
        let mut images = self.images.borrow_mut();
        let id = ImageId(u32::try_from(images.len()).unwrap_or(u32::MAX));
        images.push(pixels);
        id
    }

    /// Number of registered images.
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.images.borrow().len()
    }
}

impl SurfaceFactory for SkiaFactory {
    type Canvas = SkiaCanvas;

    fn create(&mut self, width: u32, height: u32) -> Result<SkiaCanvas, RenderError> {
        if width > self.max_side || height > self.max_side {
            tracing::debug!(width, height, max_side = self.max_side, "buffer over size limit");
            return Err(RenderError::SurfaceUnavailable { width, height });
        }
        SkiaCanvas::new(width, height, Rc::clone(&self.images))
    }
}
