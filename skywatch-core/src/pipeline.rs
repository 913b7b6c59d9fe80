// ============================================================================
// skywatch-core/src/pipeline.rs
// ============================================================================
//
// PIPELINE DRIVER: Frame Loop from Source to Annotated Output
//
// Runs one annotation pass over a video:
//
//   open source -> open writer (primary codec, then fallback)
//   for each frame:
//     check cancellation -> read -> infer or reuse -> render -> write
//   release source -> finish writer -> stats
//
// Inference runs on a downscaled copy of the frame; drawing and encoding
// always use the original resolution. Detections from the last inferred
// frame are cached and redrawn on skipped frames, so the output keeps the
// source's frame count and frame rate.
//
// Source and writer are owned by the run and released on every exit path.
// A frame that fails to decode ends the stream; an inference or write
// failure aborts the run.
//
// AI-ASSISTANT-INFO: Main annotation loop, stats and cancellation

use crate::config::{DetectionCountMode, PipelineOptions, ProcessingConfig};
use crate::detection::{ClassNames, Detection, DetectionCache, Detector};
use crate::encoding::{FfmpegWriterBackend, Fourcc, WriterBackend, open_writer};
use crate::error::{CoreError, CoreResult};
use crate::events::{Event, EventDispatcher, EventHandler, LogEventHandler};
use crate::geometry::downscale_dimensions;
use crate::media::{FfmpegFrameSource, FrameSource};
use crate::render::AnnotationRenderer;
use crate::scheduler::{FrameAction, FrameScheduler};

use image::RgbImage;
use image::imageops::{self, FilterType};
use log::{debug, info, warn};
use serde::{Serialize, Serializer};

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Cooperative stop signal checked before each frame is read.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStats {
    pub frames_read: u64,
    pub frames_inferred: u64,
    pub frames_written: u64,
    /// Boxes drawn, summed over every written frame
    pub total_detections: u64,
    /// Detections returned by inference calls
    pub unique_detections: u64,
    #[serde(rename = "elapsed_seconds", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    pub cancelled: bool,
    pub count_mode: DetectionCountMode,
    pub output_codec: Option<Fourcc>,
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl PipelineStats {
    pub fn new(count_mode: DetectionCountMode) -> Self {
        Self {
            frames_read: 0,
            frames_inferred: 0,
            frames_written: 0,
            total_detections: 0,
            unique_detections: 0,
            elapsed: Duration::ZERO,
            cancelled: false,
            count_mode,
            output_codec: None,
        }
    }

    /// The detection count selected by `count_mode`.
    pub fn reported_detections(&self) -> u64 {
        match self.count_mode {
            DetectionCountMode::PerFrameDrawn => self.total_detections,
            DetectionCountMode::PerInference => self.unique_detections,
        }
    }

    /// Frames read per inference, or `None` when nothing was inferred.
    pub fn speedup(&self) -> Option<f64> {
        (self.frames_inferred > 0).then(|| self.frames_read as f64 / self.frames_inferred as f64)
    }

    /// Average frames processed per second of wall-clock time.
    pub fn processing_fps(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        (secs > 0.0).then(|| self.frames_read as f64 / secs)
    }
}

/// State for the frame currently moving through the loop.
#[derive(Debug)]
pub struct FrameContext {
    /// 1-based position in the source
    pub frame_index: u64,
    /// Decoded frame at original resolution; annotated in place
    pub frame: RgbImage,
    pub detections: Arc<[Detection]>,
}

/// A configured annotation run.
#[derive(Debug)]
pub struct AnnotationPipeline {
    config: ProcessingConfig,
    options: PipelineOptions,
    class_names: ClassNames,
    renderer: AnnotationRenderer,
    events: EventDispatcher,
}

impl AnnotationPipeline {
    pub fn new(
        config: ProcessingConfig,
        options: PipelineOptions,
        class_names: ClassNames,
    ) -> CoreResult<Self> {
        config.validate()?;
        let renderer = AnnotationRenderer::new(options.style.clone());
        Ok(Self {
            config,
            options,
            class_names,
            renderer,
            events: EventDispatcher::new(),
        })
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.events.add_handler(handler);
        self
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    fn is_cancelled(&self) -> bool {
        self.options
            .cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Decodes `source_path` with ffmpeg and encodes the result to
    /// `output_path`.
    pub fn run_file(
        &self,
        detector: &mut dyn Detector,
        source_path: &Path,
        output_path: &Path,
    ) -> CoreResult<PipelineStats> {
        let source = FfmpegFrameSource::open(source_path)?;
        let backend = FfmpegWriterBackend::new();
        self.run_labelled(
            detector,
            source,
            &backend,
            output_path,
            source_path.display().to_string(),
        )
    }

    /// Annotates every frame of `source` and writes it through `backend`.
    pub fn run<S: FrameSource>(
        &self,
        detector: &mut dyn Detector,
        source: S,
        backend: &dyn WriterBackend,
        output_path: &Path,
    ) -> CoreResult<PipelineStats> {
        self.run_labelled(detector, source, backend, output_path, "stream".to_string())
    }

    fn run_labelled<S: FrameSource>(
        &self,
        detector: &mut dyn Detector,
        mut source: S,
        backend: &dyn WriterBackend,
        output_path: &Path,
        input_label: String,
    ) -> CoreResult<PipelineStats> {
        let started = Instant::now();
        let properties = source.properties().clone();
        let dimensions = properties.dimensions();

        if dimensions.0 == 0 || dimensions.1 == 0 {
            return Err(CoreError::OperationFailed(format!(
                "source reports an invalid frame size {}x{}",
                dimensions.0, dimensions.1
            )));
        }

        self.events.emit(Event::RunStarted {
            input: input_label,
            output: output_path.display().to_string(),
            width: dimensions.0,
            height: dimensions.1,
            frame_rate: properties.frame_rate.to_string(),
            total_frames: properties.total_frames,
            skip_interval: self.config.skip_interval,
            max_inference_dimension: self.config.max_inference_dimension,
            detector: detector.name().to_string(),
        });

        let mut writer = match open_writer(
            backend,
            output_path,
            self.options.primary_codec,
            self.options.fallback_codec,
            properties.frame_rate,
            dimensions,
        ) {
            Ok(writer) => writer,
            Err(e) => {
                drop(source);
                return Err(e);
            }
        };

        let mut stats = PipelineStats::new(self.options.count_mode);
        stats.output_codec = Some(writer.fourcc());
        self.events.emit(Event::EncoderSelected {
            fourcc: writer.fourcc().to_string(),
            fallback_used: writer.fourcc() != self.options.primary_codec,
        });

        let scheduler = FrameScheduler::new(self.config.skip_interval);
        let mut cache = DetectionCache::new();
        let interval = self.options.progress_interval;

        loop {
            if self.is_cancelled() {
                info!("Cancelled after {} frames", stats.frames_read);
                stats.cancelled = true;
                break;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(CoreError::FrameDecode(message)) => {
                    let frame_index = stats.frames_read + 1;
                    warn!("Frame {frame_index} failed to decode, ending stream: {message}");
                    self.events.emit(Event::FrameDecodeFailed {
                        frame_index,
                        message,
                    });
                    break;
                }
                Err(e) => return Err(e),
            };

            stats.frames_read += 1;
            let mut context = FrameContext {
                frame_index: stats.frames_read,
                frame,
                detections: cache.read(),
            };

            if scheduler.decide(context.frame_index) == FrameAction::Infer {
                let detections = detect_frame(
                    detector,
                    &context.frame,
                    context.frame_index,
                    &self.config,
                    &self.class_names,
                )?;
                stats.frames_inferred += 1;
                stats.unique_detections += detections.len() as u64;
                cache.update(detections);
                context.detections = cache.read();
            }

            self.renderer
                .render_into(&mut context.frame, &context.detections);
            writer.write_frame(&context.frame)?;
            stats.frames_written += 1;
            stats.total_detections += context.detections.len() as u64;

            if interval > 0 && stats.frames_read % interval == 0 {
                self.emit_progress(&stats, properties.total_frames, started);
            }
        }

        drop(source);
        let frames_written = writer.finish()?;
        debug!("Writer closed with {frames_written} frames");

        stats.elapsed = started.elapsed();
        self.emit_progress(&stats, properties.total_frames, started);
        self.events.emit(Event::RunCompleted {
            stats: stats.clone(),
        });
        Ok(stats)
    }

    fn emit_progress(&self, stats: &PipelineStats, total_frames: Option<u64>, started: Instant) {
        let fraction = total_frames
            .filter(|total| *total > 0)
            .map(|total| (stats.frames_read as f64 / total as f64).min(1.0));
        self.events.emit(Event::Progress {
            frames_read: stats.frames_read,
            total_frames,
            fraction,
            frames_inferred: stats.frames_inferred,
            total_detections: stats.total_detections,
            elapsed: started.elapsed(),
        });
    }
}

/// Runs `detector` on one frame and returns detections in the frame's own
/// coordinates.
///
/// The frame is downscaled to at most `max_inference_dimension` pixels wide
/// before inference. Detector failures are reported as `Inference` errors for
/// `frame_index`.
pub fn detect_frame(
    detector: &mut dyn Detector,
    frame: &RgbImage,
    frame_index: u64,
    config: &ProcessingConfig,
    class_names: &ClassNames,
) -> CoreResult<Vec<Detection>> {
    let scale = downscale_dimensions(frame.width(), frame.height(), config.max_inference_dimension);
    let input: Cow<'_, RgbImage> = if scale.is_identity() {
        Cow::Borrowed(frame)
    } else {
        Cow::Owned(imageops::resize(
            frame,
            scale.width,
            scale.height,
            FilterType::Triangle,
        ))
    };

    let raw = detector
        .infer(&input, config.confidence_threshold, config.iou_threshold)
        .map_err(|e| match e {
            CoreError::Inference { .. } => e,
            other => CoreError::Inference {
                frame_index,
                reason: other.to_string(),
            },
        })?;

    debug!(
        "Frame {frame_index}: {} detections at {}x{}",
        raw.len(),
        scale.width,
        scale.height
    );

    Ok(raw
        .iter()
        .map(|r| Detection::from_raw(r, scale.scale_factor, class_names))
        .collect())
}

/// Annotates the video at `source_path` and writes it to `output_path` using
/// ffmpeg for decoding and encoding. Progress is logged.
pub fn run_pipeline(
    source_path: &Path,
    output_path: &Path,
    config: ProcessingConfig,
    detector: &mut dyn Detector,
    options: PipelineOptions,
) -> CoreResult<PipelineStats> {
    AnnotationPipeline::new(config, options, ClassNames::default())?
        .with_event_handler(Arc::new(LogEventHandler))
        .run_file(detector, source_path, output_path)
}
