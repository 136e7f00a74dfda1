// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated frame loop over a small retained scene.
//!
//! Builds a stage with a static backdrop, a cached card, a masked banner and
//! a sprite that moves every frame, then drives 60 frames through a
//! [`FrameDriver`] backed by tiny-skia. Trace events go to a
//! [`PrettyPrintSink`] on stdout and a [`ChromeTraceSink`].
//!
//! ```text
//! stage_demo [trace.json] [frame.png]
//! ```
//!
//! Set `RUST_LOG=debug` to see driver and compositor diagnostics.

use std::cell::Cell;
use std::fs::File;
use std::io::BufWriter;

use kurbo::Rect;
use stratum_backend_skia::SkiaFactory;
use stratum_core::node::{BlendMode, Color, NodeId, NodeKind, SceneGraph, ShapeContent};
use stratum_core::time::{HostTime, Timebase};
use stratum_core::trace::{
    DamageRect, FrameSummary, FrameTickEvent, PhaseBeginEvent, PhaseEndEvent, TraceSink, Tracer,
};
use stratum_debug::chrome::ChromeTraceSink;
use stratum_debug::pretty::PrettyPrintSink;
use stratum_render::{Compositor, Entry, FrameDriver, Ticker};
use tracing_subscriber::EnvFilter;

const FRAME_COUNT: u64 = 60;
/// 16.6ms refresh interval in nanoseconds (≈60 Hz).
const REFRESH_INTERVAL_NS: u64 = 16_666_667;
const STAGE_WIDTH: f64 = 320.0;
const STAGE_HEIGHT: f64 = 240.0;

/// Counts registered players; a real host would start its display link here.
#[derive(Debug, Default)]
struct ManualTicker {
    players: usize,
}

impl Ticker for ManualTicker {
    fn add_player(&mut self) {
        self.players += 1;
    }

    fn remove_player(&mut self) {
        self.players = self.players.saturating_sub(1);
    }
}

/// Forwards every event to two sinks.
struct Tee<'a> {
    a: &'a mut dyn TraceSink,
    b: &'a mut dyn TraceSink,
}

impl TraceSink for Tee<'_> {
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        self.a.on_frame_tick(e);
        self.b.on_frame_tick(e);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.a.on_phase_begin(e);
        self.b.on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.a.on_phase_end(e);
        self.b.on_phase_end(e);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.a.on_frame_summary(s);
        self.b.on_frame_summary(s);
    }

    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        self.a.on_damage_rects(frame_index, rects);
        self.b.on_damage_rects(frame_index, rects);
    }
}

fn shape(graph: &mut SceneGraph, parent: NodeId, w: f64, h: f64, color: Color) -> NodeId {
    let id = graph.create_node(NodeKind::Shape(ShapeContent {
        width: w,
        height: h,
        color,
    }));
    graph.add_child(parent, id);
    id
}

/// Builds the scene under a fresh group and names the sprite so the loop
/// can find it.
fn build_scene(graph: &mut SceneGraph) -> NodeId {
    let root = graph.create_node(NodeKind::Group);

    shape(graph, root, STAGE_WIDTH, STAGE_HEIGHT, Color::rgb(24, 28, 40));

    let card = shape(graph, root, 120.0, 80.0, Color::rgb(60, 120, 200));
    graph.set_x(card, 20.0);
    graph.set_y(card, 20.0);
    for i in 0..4 {
        let row = shape(graph, card, 100.0, 12.0, Color::rgba(255, 255, 255, 160));
        graph.set_x(row, 10.0);
        graph.set_y(row, 10.0 + f64::from(i) * 16.0);
    }
    graph.set_cache_as_bitmap(card, true);

    let banner = shape(graph, root, 200.0, 40.0, Color::rgb(220, 80, 60));
    graph.set_x(banner, 100.0);
    graph.set_y(banner, 170.0);
    let window = shape(graph, root, 120.0, 40.0, Color::WHITE);
    graph.set_x(window, 140.0);
    graph.set_y(window, 170.0);
    graph.set_mask(banner, Some(window));

    let glow = shape(graph, root, 60.0, 60.0, Color::rgba(40, 40, 0, 255));
    graph.set_x(glow, 200.0);
    graph.set_y(glow, 30.0);
    graph.set_blend_mode(glow, BlendMode::Add);

    let viewport = graph.create_node(NodeKind::Group);
    graph.add_child(root, viewport);
    graph.set_x(viewport, 180.0);
    graph.set_y(viewport, 110.0);
    shape(graph, viewport, 200.0, 200.0, Color::rgb(90, 200, 120));
    graph.set_scroll_rect(viewport, Some(Rect::new(0.0, 0.0, 100.0, 40.0)));

    let sprite = shape(graph, root, 16.0, 16.0, Color::rgb(250, 210, 60));
    graph.set_name(sprite, "sprite");
    graph.set_y(sprite, 130.0);

    root
}

fn find_named(graph: &SceneGraph, parent: NodeId, name: &str) -> Option<NodeId> {
    graph.children(parent).find(|&c| graph.name(c) == name)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let trace_path = args.next();
    let png_path = args.next();

    let timebase = Timebase::NANOS;
    let mut pretty = PrettyPrintSink::with_writer(std::io::stdout(), timebase);
    let mut chrome = ChromeTraceSink::new(timebase);

    let entry: Entry = Box::new(build_scene);
    let mut driver = FrameDriver::new(
        SceneGraph::new(),
        Compositor::new(SkiaFactory::new()),
        ManualTicker::default(),
        Some(entry),
    );
    driver.update_stage_size(STAGE_WIDTH, STAGE_HEIGHT);
    driver.start();

    let sprite = driver
        .root()
        .zip(driver.graph())
        .and_then(|(root, graph)| find_named(graph, root, "sprite"));

    // Simulated monotonic clock; each read advances it by 50µs.
    let clock = Cell::new(1_000_000_000_u64);
    let mut total_draws = 0;
    for frame in 0..FRAME_COUNT {
        let now = HostTime(clock.get());

        if let (Some(sprite), Some(graph)) = (sprite, driver.graph_mut()) {
            // Frames 20..30 leave the scene untouched to show idle frames.
            if !(20..30).contains(&frame) {
                let x = graph.x(sprite);
                graph.set_x(sprite, (x + 4.0) % STAGE_WIDTH);
            }
        }

        let mut tee = Tee {
            a: &mut pretty,
            b: &mut chrome,
        };
        let mut tracer = Tracer::new(&mut tee);
        let summary = driver.tick(
            now,
            || {
                clock.set(clock.get() + 50_000);
                HostTime(clock.get())
            },
            &mut tracer,
        );
        if let Some(summary) = summary {
            total_draws += summary.draw_calls;
        }

        if frame == 40 {
            driver.pause();
            tracing::info!(
                players = driver.ticker().players,
                "paused; the next tick is skipped"
            );
            driver.start();
        }

        clock.set(now.ticks() + REFRESH_INTERVAL_NS);
    }

    let hit = driver.hit_test(60.0, 40.0, true);
    tracing::info!(?hit, total_draws, "finished {FRAME_COUNT} frames");

    if let Some(path) = png_path {
        let stage = driver.graph().map(SceneGraph::stage_surface);
        match stage.and_then(|s| driver.compositor().canvas(s)) {
            Some(canvas) => match canvas.pixmap().save_png(&path) {
                Ok(()) => tracing::info!(%path, "wrote last frame"),
                Err(err) => tracing::error!(%err, %path, "cannot write frame"),
            },
            None => tracing::error!("no screen buffer to save"),
        }
    }

    if let Some(path) = trace_path {
        let written = File::create(&path).and_then(|file| {
            let mut writer = BufWriter::new(file);
            chrome.write_to(&mut writer)
        });
        match written {
            Ok(()) => tracing::info!(%path, events = chrome.len(), "wrote Chrome trace"),
            Err(err) => tracing::error!(%err, %path, "cannot write trace"),
        }
    }

    driver.stop();
}
