// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A canvas that records every call instead of drawing.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use kurbo::{Affine, Rect};
use stratum_core::node::{Color, ImageId};
use stratum_core::pool::Reset;
use stratum_core::region::Region;

use crate::{Canvas, CompositeOp, RenderError, SurfaceFactory};

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    Resize(u32, u32),
    Save,
    Restore,
    SetTransform(Affine),
    Transform(Affine),
    Clip(Vec<Region>),
    Clear(Rect),
    Alpha(f64),
    Composite(CompositeOp),
    Fill(Rect, Color),
    Image(ImageId, Rect),
    /// Blit of the canvas with the given serial.
    Blit(u32, f64, f64),
}

pub(crate) type Log = Rc<RefCell<Vec<(u32, Call)>>>;

/// Records calls tagged with a per-canvas serial number.
#[derive(Debug)]
pub(crate) struct RecordingCanvas {
    pub(crate) serial: u32,
    width: u32,
    height: u32,
    painted: bool,
    log: Log,
}

impl RecordingCanvas {
    fn push(&self, call: Call) {
        self.log.borrow_mut().push((self.serial, call));
    }
}

impl Reset for RecordingCanvas {
    fn reset(&mut self) {
        self.painted = false;
    }
}

impl Canvas for RecordingCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.width = width;
        self.height = height;
        self.painted = false;
        self.push(Call::Resize(width, height));
        Ok(())
    }

    fn save(&mut self) {
        self.push(Call::Save);
    }

    fn restore(&mut self) {
        self.push(Call::Restore);
    }

    fn set_transform(&mut self, transform: Affine) {
        self.push(Call::SetTransform(transform));
    }

    fn transform(&mut self, transform: Affine) {
        self.push(Call::Transform(transform));
    }

    fn clip_rects(&mut self, rects: &[Region]) {
        self.push(Call::Clip(rects.to_vec()));
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.push(Call::Clear(rect));
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.push(Call::Alpha(alpha));
    }

    fn set_composite(&mut self, op: CompositeOp) {
        self.push(Call::Composite(op));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.painted = true;
        self.push(Call::Fill(rect, color));
    }

    fn draw_image(&mut self, image: ImageId, dest: Rect) {
        self.painted = true;
        self.push(Call::Image(image, dest));
    }

    fn draw_canvas(&mut self, source: &Self, x: f64, y: f64) {
        self.painted |= source.painted;
        self.push(Call::Blit(source.serial, x, y));
    }

    fn alpha_at(&self, _x: i32, _y: i32) -> u8 {
        if self.painted { u8::MAX } else { 0 }
    }
}

/// Hands out recording canvases sharing one log. Creation fails once
/// `budget` reaches zero.
#[derive(Debug)]
pub(crate) struct RecordingFactory {
    pub(crate) log: Log,
    pub(crate) budget: Option<usize>,
    pub(crate) created: u32,
}

impl RecordingFactory {
    pub(crate) fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            budget: None,
            created: 0,
        }
    }

    /// Drains the log.
    pub(crate) fn take_log(&self) -> Vec<(u32, Call)> {
        core::mem::take(&mut *self.log.borrow_mut())
    }
}

impl SurfaceFactory for RecordingFactory {
    type Canvas = RecordingCanvas;

    fn create(&mut self, width: u32, height: u32) -> Result<RecordingCanvas, RenderError> {
        if let Some(budget) = &mut self.budget {
            if *budget == 0 {
                return Err(RenderError::SurfaceUnavailable { width, height });
            }
            *budget -= 1;
        }
        self.created += 1;
        Ok(RecordingCanvas {
            serial: self.created,
            width,
            height,
            painted: false,
            log: Rc::clone(&self.log),
        })
    }
}
