// src/logging.rs
//
// Telemetry sinks for optimisation runs.
// - EventSink:  trait the optimizer reports progress through
// - NoopSink:   discards all events
// - FileSink:   JSONL, one object per generation / event
// - StderrSink: key=value progress lines for interactive runs

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde_json::{json, Value};

use crate::optimizer::GenerationRecord;

/// Abstract sink for run telemetry.
pub trait EventSink {
    /// Called once after every optimizer generation.
    fn log_generation(&mut self, record: &GenerationRecord);

    /// Free-form event (run start, sweep finished, ...).
    fn log_event(&mut self, kind: &str, payload: &Value);
}

/// Sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn log_generation(&mut self, _record: &GenerationRecord) {
        // intentionally no-op
    }

    fn log_event(&mut self, _kind: &str, _payload: &Value) {}
}

/// JSONL file sink.
///
/// Generations are written as `{"event":"generation", ...record}`; other
/// events as `{"event":<kind>, "payload":...}`.
pub struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn write_line(&mut self, line: &Value) {
        // Telemetry must never abort a run, so I/O errors are dropped.
        let _ = serde_json::to_writer(&mut self.writer, line);
        let _ = self.writer.write_all(b"\n");
        let _ = self.writer.flush();
    }
}

impl EventSink for FileSink {
    fn log_generation(&mut self, record: &GenerationRecord) {
        let mut line = serde_json::to_value(record).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut line {
            map.insert("event".to_string(), Value::from("generation"));
        }
        self.write_line(&line);
    }

    fn log_event(&mut self, kind: &str, payload: &Value) {
        self.write_line(&json!({ "event": kind, "payload": payload }));
    }
}

/// Prints a progress line every `every` generations.
#[derive(Debug, Clone, Copy)]
pub struct StderrSink {
    every: usize,
}

impl StderrSink {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl Default for StderrSink {
    fn default() -> Self {
        Self::new(10)
    }
}

impl EventSink for StderrSink {
    fn log_generation(&mut self, r: &GenerationRecord) {
        if r.generation % self.every != 0 {
            return;
        }
        eprintln!(
            "[opt] gen={} evals={} best_value={:.2} best_x={:?} spread={:.3e} elapsed_s={:.2}",
            r.generation, r.evaluations, r.best_value, r.best_x, r.spread, r.elapsed_s
        );
    }

    fn log_event(&mut self, kind: &str, payload: &Value) {
        eprintln!("[{kind}] {payload}");
    }
}

/// Forwards every event to each inner sink.
pub struct FanoutSink<'a> {
    sinks: Vec<&'a mut dyn EventSink>,
}

impl<'a> FanoutSink<'a> {
    pub fn new(sinks: Vec<&'a mut dyn EventSink>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink<'_> {
    fn log_generation(&mut self, record: &GenerationRecord) {
        for s in self.sinks.iter_mut() {
            s.log_generation(record);
        }
    }

    fn log_event(&mut self, kind: &str, payload: &Value) {
        for s in self.sinks.iter_mut() {
            s.log_event(kind, payload);
        }
    }
}
