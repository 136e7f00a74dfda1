// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON export in the [Chrome Trace Event Format][format].
//!
//! The output opens in `chrome://tracing` and in
//! [Perfetto](https://ui.perfetto.dev/). Phases become duration slices,
//! ticks and summaries become global instant events, and damage rectangles
//! become process-scoped instants stamped with their frame's tick time.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Map, Value, json};

use stratum_core::time::Timebase;
use stratum_core::trace::{
    DamageRect, FrameSummary, FrameTickEvent, PhaseBeginEvent, PhaseEndEvent, TraceSink,
};

/// Records events in memory until [`write_to`](Self::write_to) is called.
#[derive(Debug)]
pub struct ChromeTraceSink {
    timebase: Timebase,
    events: Vec<Value>,
    /// Timestamp of the latest tick, in microseconds.
    tick_us: f64,
}

impl ChromeTraceSink {
    /// Creates a sink converting host ticks with `timebase`.
    #[must_use]
    pub fn new(timebase: Timebase) -> Self {
        Self {
            timebase,
            events: Vec::new(),
            tick_us: 0.0,
        }
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Serializes the recording as a JSON array.
    pub fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(writer, &self.events)?;
        Ok(())
    }

    fn record(&mut self, ph: &str, name: &str, cat: &str, ts: f64, args: Value) {
        let mut event = Map::new();
        event.insert("ph".into(), ph.into());
        event.insert("name".into(), name.into());
        event.insert("cat".into(), cat.into());
        event.insert("ts".into(), ts.into());
        event.insert("pid".into(), 0.into());
        event.insert("tid".into(), 0.into());
        if ph == "i" {
            let scope = if cat == "Damage" { "p" } else { "g" };
            event.insert("s".into(), scope.into());
        }
        event.insert("args".into(), args);
        self.events.push(Value::Object(event));
    }
}

impl TraceSink for ChromeTraceSink {
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        self.tick_us = self.timebase.ticks_to_micros(e.now.ticks());
        let args = json!({ "frame_index": e.frame_index });
        self.record("i", "FrameTick", "Driver", self.tick_us, args);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let ts = self.timebase.ticks_to_micros(e.timestamp.ticks());
        let name = format!("{:?}", e.phase);
        self.record("B", &name, "Frame", ts, json!({ "frame_index": e.frame_index }));
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let ts = self.timebase.ticks_to_micros(e.timestamp.ticks());
        let name = format!("{:?}", e.phase);
        self.record("E", &name, "Frame", ts, json!({ "frame_index": e.frame_index }));
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let tb = self.timebase;
        let args = json!({
            "frame_index": s.frame_index,
            "draw_calls": s.draw_calls,
            "dirty_rects": s.dirty_rects,
            "dirty_ratio": s.dirty_ratio,
            "update_us": tb.ticks_to_micros(s.update_ticks),
            "draw_us": tb.ticks_to_micros(s.draw_ticks),
        });
        let ts = tb.ticks_to_micros(s.now.ticks());
        self.record("i", "FrameSummary", "Summary", ts, args);
    }

    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        let rects: Vec<Value> = rects
            .iter()
            .map(|r| json!([r.x, r.y, r.width, r.height]))
            .collect();
        let args = json!({ "frame_index": frame_index, "rects": rects });
        self.record("i", "DamageRects", "Damage", self.tick_us, args);
    }
}
