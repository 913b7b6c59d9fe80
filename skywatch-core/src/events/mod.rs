//! Run events and observers.
//!
//! The pipeline reports what it is doing through `Event`s sent to every
//! registered `EventHandler`. Handlers decide how to present them: a log
//! line, a progress bar, or a JSON object per event.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::pipeline::PipelineStats;

pub mod json_handler;

#[derive(Debug, Clone)]
pub enum Event {
    RunStarted {
        input: String,
        output: String,
        width: u32,
        height: u32,
        frame_rate: String,
        total_frames: Option<u64>,
        skip_interval: u32,
        max_inference_dimension: u32,
        detector: String,
    },

    EncoderSelected {
        fourcc: String,
        fallback_used: bool,
    },

    Progress {
        frames_read: u64,
        total_frames: Option<u64>,
        /// `frames_read / total_frames`, when the total is known
        fraction: Option<f64>,
        frames_inferred: u64,
        total_detections: u64,
        elapsed: Duration,
    },

    /// A frame could not be decoded; the run ends at this point
    FrameDecodeFailed {
        frame_index: u64,
        message: String,
    },

    RunCompleted {
        stats: PipelineStats,
    },
}

pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &Event);
}

pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn has_handlers(&self) -> bool {
        !self.handlers.is_empty()
    }

    pub fn emit(&self, event: Event) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Handler that writes events through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventHandler;

impl EventHandler for LogEventHandler {
    fn handle(&self, event: &Event) {
        match event {
            Event::RunStarted {
                input,
                width,
                height,
                frame_rate,
                total_frames,
                detector,
                ..
            } => {
                info!(
                    "Annotating {input} ({width}x{height} @ {frame_rate}, {} frames) with {detector}",
                    total_frames.map_or_else(|| "unknown".to_string(), |n| n.to_string())
                );
            }
            Event::EncoderSelected {
                fourcc,
                fallback_used,
            } => {
                if *fallback_used {
                    info!("Using fallback codec {fourcc}");
                } else {
                    info!("Using codec {fourcc}");
                }
            }
            Event::Progress {
                frames_read,
                fraction,
                ..
            } => match fraction {
                Some(f) => info!("Processed {frames_read} frames ({:.1}%)", f * 100.0),
                None => info!("Processed {frames_read} frames"),
            },
            Event::FrameDecodeFailed {
                frame_index,
                message,
            } => warn!("Stopping at frame {frame_index}: {message}"),
            Event::RunCompleted { stats } => info!(
                "Finished: {} frames, {} inferred, {} detections in {:.1}s",
                stats.frames_read,
                stats.frames_inferred,
                stats.reported_detections(),
                stats.elapsed.as_secs_f64()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl EventHandler for Recorder {
        fn handle(&self, event: &Event) {
            let name = match event {
                Event::RunStarted { .. } => "started",
                Event::EncoderSelected { .. } => "encoder",
                Event::Progress { .. } => "progress",
                Event::FrameDecodeFailed { .. } => "decode_failed",
                Event::RunCompleted { .. } => "completed",
            };
            self.0.lock().unwrap().push(name.to_string());
        }
    }

    #[test]
    fn dispatcher_fans_out_to_every_handler() {
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        let mut dispatcher = EventDispatcher::new();
        assert!(!dispatcher.has_handlers());
        dispatcher.add_handler(a.clone());
        dispatcher.add_handler(b.clone());

        dispatcher.emit(Event::EncoderSelected {
            fourcc: "avc1".into(),
            fallback_used: false,
        });

        assert_eq!(*a.0.lock().unwrap(), vec!["encoder"]);
        assert_eq!(*b.0.lock().unwrap(), vec!["encoder"]);
    }
}
