// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame diagnostics.
//!
//! The frame driver reports what each tick did through a [`TraceSink`]:
//!
//! ```text
//!   on_frame_tick ─► on_phase_begin(Update) ─► on_phase_end(Update)
//!                 ─► on_damage_rects          (trace-rich, dirty frames only)
//!                 ─► on_phase_begin(Draw)   ─► on_phase_end(Draw)
//!                 ─► on_frame_summary
//! ```
//!
//! Sinks override only the callbacks they need. Callers hold a [`Tracer`],
//! which forwards to an optional sink. Without the `trace` feature the
//! forwarding is a constant-false branch and compiles away.
//!
//! [`FrameSummaryBuilder`] accumulates phase timestamps and draw counts over
//! one tick and yields the [`FrameSummary`].

use crate::time::HostTime;

/// A measured section of a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Validation: dirty queues drained into dirty rectangles.
    Update,
    /// Compositing: dirty rectangles repainted.
    Draw,
}

/// A tick was delivered to the driver.
#[derive(Clone, Copy, Debug)]
pub struct FrameTickEvent {
    /// Monotonic frame counter, starting at 0.
    pub frame_index: u64,
    /// Host time carried by the tick.
    pub now: HostTime,
}

/// A phase started.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame the phase belongs to.
    pub frame_index: u64,
    /// The phase.
    pub phase: PhaseKind,
    /// Clock reading at the start.
    pub timestamp: HostTime,
}

/// A phase finished.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame the phase belongs to.
    pub frame_index: u64,
    /// The phase.
    pub phase: PhaseKind,
    /// Clock reading at the end.
    pub timestamp: HostTime,
}

/// What one tick cost.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Host time carried by the tick.
    pub now: HostTime,
    /// Draw operations issued, including blits of temporary and cached
    /// surfaces.
    pub draw_calls: usize,
    /// Number of dirty rectangles repainted on the stage.
    pub dirty_rects: usize,
    /// Dirty area as a percentage of the stage, to one decimal place.
    pub dirty_ratio: f64,
    /// Update phase length in ticks; 0 when not measured.
    pub update_ticks: u64,
    /// Draw phase length in ticks; 0 when not measured.
    pub draw_ticks: u64,
}

/// A repainted stage rectangle in whole pixels.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DamageRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

#[cfg(feature = "trace-rich")]
impl From<&crate::region::Region> for DamageRect {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "dirty regions are snapped to whole pixels within the stage"
    )]
    fn from(r: &crate::region::Region) -> Self {
        Self {
            x: r.min_x as i32,
            y: r.min_y as i32,
            width: r.width().max(0.0) as u32,
            height: r.height().max(0.0) as u32,
        }
    }
}

/// Receives frame diagnostics. Every callback defaults to doing nothing.
pub trait TraceSink {
    /// A tick arrived.
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        _ = e;
    }

    /// A phase started.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// A phase finished.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// The tick is complete.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }

    /// The stage rectangles about to be repainted.
    #[cfg(feature = "trace-rich")]
    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        _ = (frame_index, rects);
    }
}

/// Forwards events to an optional [`TraceSink`].
pub struct Tracer<'a> {
    sink: Option<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer")
            .field("attached", &self.sink.is_some())
            .finish()
    }
}

impl<'a> Tracer<'a> {
    /// Forwards to `sink`.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        Self { sink: Some(sink) }
    }

    /// Discards everything.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self { sink: None }
    }

    #[inline]
    fn emit(&mut self, event: impl FnOnce(&mut dyn TraceSink)) {
        if !cfg!(feature = "trace") {
            return;
        }
        if let Some(sink) = &mut self.sink {
            event(&mut **sink);
        }
    }

    /// Forwards a [`FrameTickEvent`].
    #[inline]
    pub fn frame_tick(&mut self, e: &FrameTickEvent) {
        self.emit(|s| s.on_frame_tick(e));
    }

    /// Forwards a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.emit(|s| s.on_phase_begin(e));
    }

    /// Forwards a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        self.emit(|s| s.on_phase_end(e));
    }

    /// Forwards a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, summary: &FrameSummary) {
        self.emit(|s| s.on_frame_summary(summary));
    }

    /// Forwards the frame's damage rectangles.
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        self.emit(|s| s.on_damage_rects(frame_index, rects));
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Span {
    start: Option<HostTime>,
    end: Option<HostTime>,
}

impl Span {
    fn ticks(self) -> u64 {
        match (self.start, self.end) {
            (Some(start), Some(end)) => end.ticks_since(start),
            _ => 0,
        }
    }
}

/// Accumulates one tick's measurements into a [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    tick: FrameTickEvent,
    update: Span,
    draw: Span,
    draw_calls: usize,
    dirty_rects: usize,
    dirty_ratio: f64,
}

impl FrameSummaryBuilder {
    /// Starts a summary for `tick`.
    #[must_use]
    pub fn new(tick: &FrameTickEvent) -> Self {
        Self {
            tick: *tick,
            update: Span::default(),
            draw: Span::default(),
            draw_calls: 0,
            dirty_rects: 0,
            dirty_ratio: 0.0,
        }
    }

    fn span(&mut self, phase: PhaseKind) -> &mut Span {
        match phase {
            PhaseKind::Update => &mut self.update,
            PhaseKind::Draw => &mut self.draw,
        }
    }

    /// Records when `phase` started.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: HostTime) {
        self.span(phase).start = Some(t);
    }

    /// Records when `phase` ended.
    pub fn phase_end(&mut self, phase: PhaseKind, t: HostTime) {
        self.span(phase).end = Some(t);
    }

    /// Records the draw pass output.
    pub fn set_draw_stats(&mut self, draw_calls: usize, dirty_rects: usize, dirty_ratio: f64) {
        self.draw_calls = draw_calls;
        self.dirty_rects = dirty_rects;
        self.dirty_ratio = dirty_ratio;
    }

    /// Produces the summary. Phases missing either end report 0 ticks.
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        FrameSummary {
            frame_index: self.tick.frame_index,
            now: self.tick.now,
            draw_calls: self.draw_calls,
            dirty_rects: self.dirty_rects,
            dirty_ratio: self.dirty_ratio,
            update_ticks: self.update.ticks(),
            draw_ticks: self.draw.ticks(),
        }
    }
}
