//! JSON progress handler for structured progress output
//!
//! Writes one JSON object per line for every event, so a supervising process
//! can follow a run without parsing human-readable output.

use super::{Event, EventHandler};
use serde_json::json;
use std::io::{self, Write};
use std::sync::Mutex;

/// Event handler that writes events as newline-delimited JSON
pub struct JsonProgressHandler {
    output: Mutex<Box<dyn Write + Send>>,
}

impl JsonProgressHandler {
    /// Create a new JSON progress handler that writes to stdout
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    /// Create a new JSON progress handler with a custom writer
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            output: Mutex::new(writer),
        }
    }

    fn write_json(&self, value: serde_json::Value) {
        if let Ok(mut output) = self.output.lock() {
            if let Ok(json_str) = serde_json::to_string(&value) {
                let _ = writeln!(output, "{json_str}");
                let _ = output.flush();
            }
        }
    }
}

impl Default for JsonProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for JsonProgressHandler {
    fn handle(&self, event: &Event) {
        let timestamp = chrono::Utc::now().timestamp();

        let value = match event {
            Event::RunStarted {
                input,
                output,
                width,
                height,
                frame_rate,
                total_frames,
                skip_interval,
                max_inference_dimension,
                detector,
            } => json!({
                "type": "run_started",
                "input": input,
                "output": output,
                "width": width,
                "height": height,
                "frame_rate": frame_rate,
                "total_frames": total_frames,
                "skip_interval": skip_interval,
                "max_inference_dimension": max_inference_dimension,
                "detector": detector,
                "timestamp": timestamp
            }),

            Event::EncoderSelected {
                fourcc,
                fallback_used,
            } => json!({
                "type": "encoder_selected",
                "fourcc": fourcc,
                "fallback_used": fallback_used,
                "timestamp": timestamp
            }),

            Event::Progress {
                frames_read,
                total_frames,
                fraction,
                frames_inferred,
                total_detections,
                elapsed,
            } => json!({
                "type": "progress",
                "frames_read": frames_read,
                "total_frames": total_frames,
                "fraction": fraction,
                "frames_inferred": frames_inferred,
                "total_detections": total_detections,
                "elapsed_seconds": elapsed.as_secs_f64(),
                "timestamp": timestamp
            }),

            Event::FrameDecodeFailed {
                frame_index,
                message,
            } => json!({
                "type": "frame_decode_failed",
                "frame_index": frame_index,
                "message": message,
                "timestamp": timestamp
            }),

            Event::RunCompleted { stats } => json!({
                "type": "run_completed",
                "stats": stats,
                "reported_detections": stats.reported_detections(),
                "timestamp": timestamp
            }),
        };

        self.write_json(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    /// Writer sharing its buffer with the test
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn progress_event_is_one_json_line() {
        let buffer = SharedBuffer::default();
        let handler = JsonProgressHandler::with_writer(Box::new(buffer.clone()));

        handler.handle(&Event::Progress {
            frames_read: 60,
            total_frames: Some(120),
            fraction: Some(0.5),
            frames_inferred: 15,
            total_detections: 42,
            elapsed: Duration::from_millis(1500),
        });
        handler.handle(&Event::EncoderSelected {
            fourcc: "mp4v".into(),
            fallback_used: true,
        });

        let text = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let progress: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(progress["type"], "progress");
        assert_eq!(progress["frames_read"], 60);
        assert_eq!(progress["fraction"], 0.5);
        assert_eq!(progress["elapsed_seconds"], 1.5);

        let encoder: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(encoder["fallback_used"], true);
    }
}
