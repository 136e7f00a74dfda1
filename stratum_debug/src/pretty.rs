// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Line-oriented trace output for terminals and logs.

use std::fmt;
use std::io::Write;

use stratum_core::time::{HostTime, Timebase};
use stratum_core::trace::{
    DamageRect, FrameSummary, FrameTickEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    TraceSink,
};

/// Prints one line per event, with times in microseconds.
///
/// Write errors are ignored; a broken pipe must not stall the frame loop.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    out: W,
    timebase: Timebase,
}

impl<W: Write> fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Prints to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self::with_writer(Box::new(std::io::stderr()), timebase)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Prints to `out`.
    #[must_use]
    pub fn with_writer(out: W, timebase: Timebase) -> Self {
        Self { out, timebase }
    }

    /// Returns the destination.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn us(&self, ticks: u64) -> Micros {
        Micros(self.timebase.ticks_to_micros(ticks))
    }

    fn at(&self, t: HostTime) -> Micros {
        self.us(t.ticks())
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        _ = self.out.write_fmt(args);
        _ = self.out.write_all(b"\n");
    }
}

struct Micros(f64);

impl fmt::Display for Micros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}µs", self.0)
    }
}

fn label(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Update => "update",
        PhaseKind::Draw => "draw",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        let now = self.at(e.now);
        self.line(format_args!("[tick] frame={} now={now}", e.frame_index));
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let at = self.at(e.timestamp);
        let phase = label(e.phase);
        self.line(format_args!("[{phase} >] frame={} at {at}", e.frame_index));
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let at = self.at(e.timestamp);
        let phase = label(e.phase);
        self.line(format_args!("[{phase} <] frame={} at {at}", e.frame_index));
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let update = self.us(s.update_ticks);
        let draw = self.us(s.draw_ticks);
        self.line(format_args!(
            "[summary] frame={} draws={} rects={} dirty={}% update={update} draw={draw}",
            s.frame_index, s.draw_calls, s.dirty_rects, s.dirty_ratio,
        ));
    }

    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        let listed: Vec<String> = rects
            .iter()
            .map(|r| format!("{}x{}+{}+{}", r.width, r.height, r.x, r.y))
            .collect();
        self.line(format_args!(
            "[damage] frame={frame_index} {}",
            listed.join(" ")
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printed(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn tick_and_phases() {
        let mut sink = PrettyPrintSink::with_writer(Vec::new(), Timebase::NANOS);
        sink.on_frame_tick(&FrameTickEvent {
            frame_index: 1,
            now: HostTime(1_000_000),
        });
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 1,
            phase: PhaseKind::Update,
            timestamp: HostTime(1_000_000),
        });
        sink.on_phase_end(&PhaseEndEvent {
            frame_index: 1,
            phase: PhaseKind::Update,
            timestamp: HostTime(1_002_500),
        });
        assert_eq!(
            printed(sink),
            "[tick] frame=1 now=1000.0µs\n\
             [update >] frame=1 at 1000.0µs\n\
             [update <] frame=1 at 1002.5µs\n"
        );
    }

    #[test]
    fn summary_line() {
        let mut sink = PrettyPrintSink::with_writer(Vec::new(), Timebase::MICROS);
        sink.on_frame_summary(&FrameSummary {
            frame_index: 3,
            now: HostTime(0),
            draw_calls: 4,
            dirty_rects: 2,
            dirty_ratio: 12.5,
            update_ticks: 2,
            draw_ticks: 40,
        });
        assert_eq!(
            printed(sink),
            "[summary] frame=3 draws=4 rects=2 dirty=12.5% update=2.0µs draw=40.0µs\n"
        );
    }

    #[test]
    fn damage_lists_each_rect() {
        let mut sink = PrettyPrintSink::with_writer(Vec::new(), Timebase::NANOS);
        let rects = [
            DamageRect {
                x: 0,
                y: 0,
                width: 11,
                height: 11,
            },
            DamageRect {
                x: 49,
                y: 0,
                width: 12,
                height: 11,
            },
        ];
        sink.on_damage_rects(7, &rects);
        assert_eq!(printed(sink), "[damage] frame=7 11x11+0+0 12x11+49+0\n");
    }
}
