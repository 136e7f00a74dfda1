// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame driver.
//!
//! [`FrameDriver`] owns a scene graph and a compositor and runs exactly one
//! validate-then-draw pass per tick while playing. The host clock calls
//! [`FrameDriver::tick`]; the driver registers and unregisters itself with a
//! [`Ticker`] as playback starts and pauses.
//!
//! ```text
//!   Idle ──start──► Playing ──pause──► Paused ──start──► Playing
//!     │                │                  │
//!     └──────stop──────┴──────stop────────┴──► Stopped (terminal)
//! ```

use alloc::boxed::Box;
use core::fmt;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use stratum_core::node::{NodeId, SceneGraph};
use stratum_core::time::HostTime;
use stratum_core::trace::{
    FrameSummary, FrameSummaryBuilder, FrameTickEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    Tracer,
};

use crate::canvas::SurfaceFactory;
use crate::compositor::Compositor;

/// The host-side frame clock a driver subscribes to.
pub trait Ticker {
    /// Starts delivering ticks to the driver.
    fn add_player(&mut self);

    /// Stops delivering ticks to the driver.
    fn remove_player(&mut self);
}

/// Playback state of a [`FrameDriver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DriverState {
    /// Never started.
    Idle,
    /// Rendering on every tick.
    Playing,
    /// Registered content kept, ticks ignored.
    Paused,
    /// The scene graph has been dropped; the driver cannot restart.
    Stopped,
}

/// Builds the root content node the first time the driver starts.
pub type Entry = Box<dyn FnOnce(&mut SceneGraph) -> NodeId>;

/// Runs the per-tick update and draw passes.
pub struct FrameDriver<F: SurfaceFactory, T: Ticker> {
    graph: Option<SceneGraph>,
    compositor: Compositor<F>,
    ticker: T,
    entry: Option<Entry>,
    root: Option<NodeId>,
    state: DriverState,
    stage_width: f64,
    stage_height: f64,
    frame_index: u64,
}

impl<F: SurfaceFactory, T: Ticker + fmt::Debug> fmt::Debug for FrameDriver<F, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameDriver")
            .field("state", &self.state)
            .field("ticker", &self.ticker)
            .field("root", &self.root)
            .field("stage_width", &self.stage_width)
            .field("stage_height", &self.stage_height)
            .field("frame_index", &self.frame_index)
            .finish_non_exhaustive()
    }
}

impl<F: SurfaceFactory, T: Ticker> FrameDriver<F, T> {
    /// Creates an idle driver. `entry`, if given, builds the root content
    /// node on the first [`start`](Self::start); it is added to the stage.
    pub fn new(
        graph: SceneGraph,
        compositor: Compositor<F>,
        ticker: T,
        entry: Option<Entry>,
    ) -> Self {
        Self {
            graph: Some(graph),
            compositor,
            ticker,
            entry,
            root: None,
            state: DriverState::Idle,
            stage_width: 0.0,
            stage_height: 0.0,
            frame_index: 0,
        }
    }

    /// Returns the playback state.
    #[must_use]
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Returns the scene graph, or `None` once stopped.
    #[must_use]
    pub fn graph(&self) -> Option<&SceneGraph> {
        self.graph.as_ref()
    }

    /// Returns the scene graph mutably, or `None` once stopped.
    pub fn graph_mut(&mut self) -> Option<&mut SceneGraph> {
        self.graph.as_mut()
    }

    /// Returns the compositor.
    #[must_use]
    pub fn compositor(&self) -> &Compositor<F> {
        &self.compositor
    }

    /// Returns the ticker.
    #[must_use]
    pub fn ticker(&self) -> &T {
        &self.ticker
    }

    /// Returns the node built by the entry closure.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Returns the current stage size.
    #[must_use]
    pub fn stage_size(&self) -> (f64, f64) {
        (self.stage_width, self.stage_height)
    }

    /// Starts or resumes playback. Builds the root content on first start.
    /// Does nothing while playing or after [`stop`](Self::stop).
    pub fn start(&mut self) {
        if self.state == DriverState::Playing {
            return;
        }
        let Some(graph) = &mut self.graph else {
            return;
        };
        self.state = DriverState::Playing;
        if self.root.is_none() {
            if let Some(entry) = self.entry.take() {
                let root = entry(graph);
                let stage = graph.stage();
                graph.add_child(stage, root);
                self.root = Some(root);
            } else {
                tracing::debug!("no entry; starting with an empty stage");
            }
        }
        self.ticker.add_player();
        tracing::debug!(frame = self.frame_index, "playback started");
    }

    /// Suspends playback. Ticks are ignored until the next
    /// [`start`](Self::start).
    pub fn pause(&mut self) {
        if self.state != DriverState::Playing {
            return;
        }
        self.state = DriverState::Paused;
        self.ticker.remove_player();
        tracing::debug!(frame = self.frame_index, "playback paused");
    }

    /// Stops playback for good and drops the scene graph.
    pub fn stop(&mut self) {
        self.pause();
        if self.graph.take().is_some() {
            tracing::debug!(frame = self.frame_index, "playback stopped");
        }
        self.state = DriverState::Stopped;
    }

    /// Resizes the stage. Forces one full repaint when the size changed.
    pub fn update_stage_size(&mut self, width: f64, height: f64) {
        let Some(graph) = &mut self.graph else {
            return;
        };
        if width == self.stage_width && height == self.stage_height {
            return;
        }
        self.stage_width = width;
        self.stage_height = height;
        let surface = graph.stage_surface();
        graph.set_clip_rect(surface, width, height);
        if let Err(err) = self.compositor.resize_stage(surface, width, height) {
            tracing::warn!(%err, width, height, "cannot size the screen buffer");
        }
        tracing::debug!(width, height, "stage resized");
    }

    /// Runs one frame if playing: validates the stage, repaints it if
    /// anything is dirty, and reports a [`FrameSummary`].
    ///
    /// `clock` is read at phase boundaries; `now` is the tick's own time.
    pub fn tick(
        &mut self,
        now: HostTime,
        mut clock: impl FnMut() -> HostTime,
        tracer: &mut Tracer<'_>,
    ) -> Option<FrameSummary> {
        if self.state != DriverState::Playing {
            return None;
        }
        let graph = self.graph.as_mut()?;
        let tick = FrameTickEvent {
            frame_index: self.frame_index,
            now,
        };
        self.frame_index += 1;
        tracer.frame_tick(&tick);
        let mut summary = FrameSummaryBuilder::new(&tick);
        let surface = graph.stage_surface();

        let t = clock();
        phase_begin(tracer, &mut summary, tick.frame_index, PhaseKind::Update, t);
        graph.update(surface);
        let t = clock();
        phase_end(tracer, &mut summary, tick.frame_index, PhaseKind::Update, t);

        let dirty = graph.surface_state(surface).dirty_list();
        if dirty.is_empty() {
            let summary = summary.finish();
            tracer.frame_summary(&summary);
            return Some(summary);
        }
        let dirty_rects = dirty.len();
        let dirty_area: f64 = dirty.iter().map(|r| r.area()).sum();
        #[cfg(feature = "trace-rich")]
        {
            let rects: alloc::vec::Vec<_> = dirty
                .iter()
                .map(stratum_core::trace::DamageRect::from)
                .collect();
            tracer.damage_rects(tick.frame_index, &rects);
        }

        let t = clock();
        phase_begin(tracer, &mut summary, tick.frame_index, PhaseKind::Draw, t);
        let draw_calls = self.compositor.draw(graph, surface);
        let t = clock();
        phase_end(tracer, &mut summary, tick.frame_index, PhaseKind::Draw, t);

        let stage_area = self.stage_width * self.stage_height;
        let dirty_ratio = if draw_calls > 0 && stage_area > 0.0 {
            (dirty_area * 1000.0 / stage_area).ceil() / 10.0
        } else {
            0.0
        };
        summary.set_draw_stats(draw_calls, dirty_rects, dirty_ratio);
        let summary = summary.finish();
        tracer.frame_summary(&summary);
        Some(summary)
    }

    /// Hit-tests the stage, sampling pixels through the compositor for exact
    /// tests.
    pub fn hit_test(&mut self, x: f64, y: f64, exact: bool) -> Option<NodeId> {
        let graph = self.graph.as_mut()?;
        let stage = graph.stage();
        graph.hit_test(stage, x, y, exact, &mut self.compositor)
    }
}

fn phase_begin(
    tracer: &mut Tracer<'_>,
    summary: &mut FrameSummaryBuilder,
    frame_index: u64,
    phase: PhaseKind,
    timestamp: HostTime,
) {
    summary.phase_begin(phase, timestamp);
    tracer.phase_begin(&PhaseBeginEvent {
        frame_index,
        phase,
        timestamp,
    });
}

fn phase_end(
    tracer: &mut Tracer<'_>,
    summary: &mut FrameSummaryBuilder,
    frame_index: u64,
    phase: PhaseKind,
    timestamp: HostTime,
) {
    summary.phase_end(phase, timestamp);
    tracer.phase_end(&PhaseEndEvent {
        frame_index,
        phase,
        timestamp,
    });
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;

    use stratum_core::node::{Color, NodeKind, SceneGraph, ShapeContent};
    use stratum_core::time::HostTime;
    use stratum_core::trace::Tracer;

    use super::{DriverState, FrameDriver, Ticker};
    use crate::Canvas;
    use crate::compositor::Compositor;
    use crate::testing::RecordingFactory;

    #[derive(Debug, Default)]
    struct CountingTicker {
        added: u32,
        removed: u32,
    }

    impl Ticker for CountingTicker {
        fn add_player(&mut self) {
            self.added += 1;
        }

        fn remove_player(&mut self) {
            self.removed += 1;
        }
    }

    fn square() -> super::Entry {
        Box::new(|graph: &mut SceneGraph| {
            graph.create_node(NodeKind::Shape(ShapeContent {
                width: 10.0,
                height: 10.0,
                color: Color::BLACK,
            }))
        })
    }

    fn driver() -> FrameDriver<RecordingFactory, CountingTicker> {
        let mut driver = FrameDriver::new(
            SceneGraph::new(),
            Compositor::new(RecordingFactory::new()),
            CountingTicker::default(),
            Some(square()),
        );
        driver.update_stage_size(100.0, 100.0);
        driver
    }

    fn tick(
        driver: &mut FrameDriver<RecordingFactory, CountingTicker>,
    ) -> Option<super::FrameSummary> {
        let mut t = 0;
        let clock = move || {
            t += 10;
            HostTime(t)
        };
        driver.tick(HostTime(0), clock, &mut Tracer::none())
    }

    #[test]
    fn start_builds_the_entry_once() {
        let mut d = driver();
        assert_eq!(d.state(), DriverState::Idle);
        d.start();
        let root = d.root().unwrap();
        assert!(d.graph().unwrap().is_on_stage(root));
        d.start();
        assert_eq!(d.ticker().added, 1, "starting twice registers once");
        d.pause();
        d.start();
        assert_eq!(d.root(), Some(root));
        assert_eq!(d.ticker().added, 2);
        assert_eq!(d.ticker().removed, 1);
    }

    #[test]
    fn idle_and_paused_drivers_do_not_render() {
        let mut d = driver();
        assert!(tick(&mut d).is_none());
        d.start();
        d.pause();
        assert!(tick(&mut d).is_none());
        assert_eq!(d.state(), DriverState::Paused);
    }

    #[test]
    fn stop_is_terminal() {
        let mut d = driver();
        d.start();
        d.stop();
        assert_eq!(d.state(), DriverState::Stopped);
        assert!(d.graph().is_none());
        assert_eq!(d.ticker().removed, 1);
        d.start();
        assert_eq!(d.state(), DriverState::Stopped);
        assert!(tick(&mut d).is_none());
    }

    #[test]
    fn tick_reports_draw_stats() {
        let mut d = driver();
        d.start();
        let first = tick(&mut d).unwrap();
        assert_eq!(first.frame_index, 0);
        assert_eq!(first.draw_calls, 1);
        assert_eq!(first.dirty_rects, 1);
        assert_eq!(first.dirty_ratio, 100.0, "resizing repaints the whole stage");
        assert_eq!(first.update_ticks, 10);
        assert_eq!(first.draw_ticks, 10);

        let idle = tick(&mut d).unwrap();
        assert_eq!(idle.draw_calls, 0);
        assert_eq!(idle.dirty_ratio, 0.0);

        let root = d.root().unwrap();
        d.graph_mut().unwrap().set_x(root, 50.0);
        let moved = tick(&mut d).unwrap();
        assert_eq!(moved.draw_calls, 1);
        assert_eq!(moved.dirty_rects, 2);
        // Old footprint 11×11 plus new 12×11 over a 100×100 stage.
        assert_eq!(moved.dirty_ratio, 2.6);
    }

    #[test]
    fn resize_forces_a_full_repaint() {
        let mut d = driver();
        d.start();
        tick(&mut d);
        d.update_stage_size(100.0, 100.0);
        assert_eq!(tick(&mut d).unwrap().draw_calls, 0, "unchanged size is a no-op");
        d.update_stage_size(50.0, 50.0);
        let resized = tick(&mut d).unwrap();
        assert_eq!(resized.dirty_ratio, 100.0);
        let stage = d.graph().unwrap().stage_surface();
        assert_eq!(d.compositor().canvas(stage).unwrap().width(), 50);
    }

    #[test]
    fn hit_test_uses_the_stage() {
        let mut d = driver();
        d.start();
        tick(&mut d);
        let root = d.root();
        assert_eq!(d.hit_test(5.0, 5.0, true), root);
        assert_eq!(d.hit_test(50.0, 50.0, false), None);
    }
}
