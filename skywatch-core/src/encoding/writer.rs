// ============================================================================
// skywatch-core/src/encoding/writer.rs
// ============================================================================
//
// FRAME WRITERS: Output Video Writer Abstraction
//
// A `WriterBackend` opens `FrameWriter`s for a given codec, frame rate and
// frame size. The ffmpeg backend pipes packed RGB24 frames into an ffmpeg
// process that encodes them to the output file.
//
// KEY COMPONENTS:
// - FrameWriter: Accepts frames in order, finalized with `finish`
// - WriterBackend: Opens writers; fails when the codec is unusable
// - FfmpegWriterBackend / FfmpegFrameWriter: ffmpeg-sidecar implementation
//
// ARCHITECTURE:
// The ffmpeg process reads frames from stdin. Its log output is drained on a
// helper thread so the process never blocks on a full stderr pipe; error
// lines are kept and reported if the process exits unsuccessfully. Before
// the real encoder starts, a one-frame encode to the null muxer confirms the
// codec accepts the frame size and pixel format.

use super::Fourcc;
use crate::error::{
    CoreError, CoreResult, command_failed_error, command_start_error, command_wait_error,
};
use crate::media::FrameRate;
use crate::utils::format_command;

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use ffmpeg_sidecar::paths::ffmpeg_path;
use image::RgbImage;
use log::{debug, trace};
use once_cell::sync::OnceCell;

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ChildStdin, Command, ExitStatus};
use std::thread::{self, JoinHandle};

/// An open output video accepting frames in presentation order.
///
/// Dropping a writer without calling `finish` releases its resources but may
/// leave a truncated file behind.
pub trait FrameWriter {
    /// Appends one frame. Its dimensions must equal `dimensions()`.
    fn write_frame(&mut self, frame: &RgbImage) -> CoreResult<()>;

    /// Flushes and closes the output, returning the number of frames written.
    fn finish(self: Box<Self>) -> CoreResult<u64>;

    fn fourcc(&self) -> Fourcc;

    fn dimensions(&self) -> (u32, u32);

    fn frames_written(&self) -> u64;
}

/// Something that can open frame writers.
pub trait WriterBackend {
    fn name(&self) -> &str;

    /// Opens a writer; an error means this codec cannot be used.
    fn open(
        &self,
        path: &Path,
        fourcc: Fourcc,
        frame_rate: FrameRate,
        dimensions: (u32, u32),
    ) -> CoreResult<Box<dyn FrameWriter>>;
}

/// Writer backend that encodes with an ffmpeg process.
///
/// Opening a writer checks that the encoder is compiled in and then runs a
/// one-frame encode with the same settings. Encoders that are listed but
/// reject the frame size or pixel format are reported as unavailable, so
/// callers can move on to a fallback codec before the output file exists.
#[derive(Debug)]
pub struct FfmpegWriterBackend {
    program: PathBuf,
    encoders: OnceCell<HashSet<String>>,
}

impl Default for FfmpegWriterBackend {
    fn default() -> Self {
        Self::with_program(ffmpeg_path())
    }
}

impl FfmpegWriterBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the ffmpeg executable at `program` instead of the default lookup.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            encoders: OnceCell::new(),
        }
    }

    /// Encoder names compiled into the local ffmpeg, queried once.
    pub fn available_encoders(&self) -> CoreResult<&HashSet<String>> {
        self.encoders.get_or_try_init(|| {
            let output = Command::new(&self.program)
                .args(["-hide_banner", "-encoders"])
                .output()
                .map_err(|e| command_start_error("ffmpeg", e))?;
            if !output.status.success() {
                return Err(command_failed_error(
                    "ffmpeg -encoders",
                    output.status,
                    String::from_utf8_lossy(&output.stderr),
                ));
            }
            let encoders = parse_encoder_list(&String::from_utf8_lossy(&output.stdout));
            debug!("ffmpeg reports {} video encoders", encoders.len());
            Ok(encoders)
        })
    }

    /// Raw RGB24 on stdin, encoded with `encoder`. Output options follow.
    fn encoder_command(
        &self,
        encoder: &str,
        frame_rate: FrameRate,
        (width, height): (u32, u32),
    ) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new_with_path(&self.program);
        cmd.hide_banner()
            .overwrite()
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-s", &format!("{width}x{height}")])
            .args(["-r", &frame_rate.to_string()])
            .input("-")
            .args(["-an", "-c:v", encoder]);

        if let Some(pix_fmt) = output_pixel_format(encoder, (width, height)) {
            cmd.args(["-pix_fmt", pix_fmt]);
        }
        cmd
    }

    fn build_command(
        &self,
        path: &Path,
        encoder: &str,
        frame_rate: FrameRate,
        dimensions: (u32, u32),
    ) -> FfmpegCommand {
        let mut cmd = self.encoder_command(encoder, frame_rate, dimensions);

        let is_mp4_family = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_ascii_lowercase().as_str(), "mp4" | "m4v" | "mov"))
            .unwrap_or(false);
        if is_mp4_family {
            cmd.args(["-movflags", "+faststart"]);
        }

        cmd.output(path);
        cmd
    }

    fn check_command(
        &self,
        encoder: &str,
        frame_rate: FrameRate,
        dimensions: (u32, u32),
    ) -> FfmpegCommand {
        let mut cmd = self.encoder_command(encoder, frame_rate, dimensions);
        cmd.args(["-frames:v", "1"]).format("null").output("-");
        cmd
    }

    /// Encodes a single black frame to the null muxer.
    ///
    /// Returns the encoder's error output when ffmpeg exits unsuccessfully.
    fn verify_encoder(
        &self,
        encoder: &str,
        frame_rate: FrameRate,
        (width, height): (u32, u32),
    ) -> Result<(), String> {
        let mut cmd = self.check_command(encoder, frame_rate, (width, height));
        debug!("Encoder check: {}", format_command(&cmd));

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("could not start ffmpeg: {e}"))?;
        let stdin = child.take_stdin();
        let events = match child.iter() {
            Ok(events) => events,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(format!("could not read encoder output: {e}"));
            }
        };

        // The event channel is unbuffered; stdin gets its own thread
        let feeder = stdin.map(|mut stdin| {
            let blank = vec![0u8; width as usize * height as usize * 3];
            thread::spawn(move || {
                // A rejected encoder exits without reading its input
                let _ = stdin.write_all(&blank);
            })
        });

        let errors = collect_errors(events);
        if let Some(handle) = feeder {
            let _ = handle.join();
        }
        let status = child
            .wait()
            .map_err(|e| format!("could not wait for ffmpeg: {e}"))?;

        if status.success() {
            Ok(())
        } else if errors.is_empty() {
            Err(format!("encoder check exited with {status}"))
        } else {
            Err(errors.join("; "))
        }
    }
}

/// Output pixel format for `encoder`, or `None` to let the encoder choose.
fn output_pixel_format(encoder: &str, (width, height): (u32, u32)) -> Option<&'static str> {
    // 4:2:0 subsampling needs even dimensions
    if width % 2 != 0 || height % 2 != 0 {
        return None;
    }
    // mjpeg only accepts full-range YUV
    Some(if encoder == "mjpeg" { "yuvj420p" } else { "yuv420p" })
}

/// Error and fatal log lines from an ffmpeg event stream, read to the end.
fn collect_errors(events: impl Iterator<Item = FfmpegEvent>) -> Vec<String> {
    let mut errors = Vec::new();
    for event in events {
        match event {
            FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, message)
            | FfmpegEvent::Error(message) => {
                trace!("encoder: {message}");
                errors.push(message);
            }
            _ => {}
        }
    }
    errors
}

impl WriterBackend for FfmpegWriterBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn open(
        &self,
        path: &Path,
        fourcc: Fourcc,
        frame_rate: FrameRate,
        dimensions: (u32, u32),
    ) -> CoreResult<Box<dyn FrameWriter>> {
        let unavailable = |reason: String| CoreError::EncoderUnavailable {
            fourcc: fourcc.to_string(),
            reason,
        };

        if dimensions.0 == 0 || dimensions.1 == 0 {
            return Err(unavailable(format!(
                "invalid frame size {}x{}",
                dimensions.0, dimensions.1
            )));
        }

        let encoder = fourcc
            .ffmpeg_encoder()
            .ok_or_else(|| unavailable("no ffmpeg encoder is known for this code".to_string()))?;

        if !self.available_encoders()?.contains(encoder) {
            return Err(unavailable(format!(
                "encoder {encoder} is not available in this ffmpeg build"
            )));
        }

        self.verify_encoder(encoder, frame_rate, dimensions)
            .map_err(|reason| unavailable(format!("encoder {encoder} failed to start: {reason}")))?;

        let mut cmd = self.build_command(path, encoder, frame_rate, dimensions);
        debug!("Encoder command: {}", format_command(&cmd));

        let mut child = cmd
            .spawn()
            .map_err(|e| command_start_error("ffmpeg (encoder)", e))?;
        let Some(stdin) = child.take_stdin() else {
            let _ = child.kill();
            return Err(unavailable("encoder stdin was not captured".to_string()));
        };
        let events = match child.iter() {
            Ok(events) => events,
            Err(e) => {
                let _ = child.kill();
                return Err(unavailable(format!("could not read encoder output: {e}")));
            }
        };

        let drain = thread::spawn(move || collect_errors(events));

        Ok(Box::new(FfmpegFrameWriter {
            fourcc,
            dimensions,
            child: Some(child),
            stdin: Some(stdin),
            drain: Some(drain),
            frames_written: 0,
        }))
    }
}

/// Extracts video encoder names from `ffmpeg -encoders` output.
///
/// Listing lines look like ` V....D libx264    libx264 H.264 ...`; the
/// legend above the `------` separator is skipped.
pub fn parse_encoder_list(output: &str) -> HashSet<String> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("------"))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let flags = parts.next()?;
            let name = parts.next()?;
            flags.starts_with('V').then(|| name.to_string())
        })
        .collect()
}

/// Writer feeding an ffmpeg encoding process over stdin.
pub struct FfmpegFrameWriter {
    fourcc: Fourcc,
    dimensions: (u32, u32),
    child: Option<FfmpegChild>,
    stdin: Option<ChildStdin>,
    drain: Option<JoinHandle<Vec<String>>>,
    frames_written: u64,
}

impl FfmpegFrameWriter {
    fn wait_for_exit(&mut self) -> CoreResult<(ExitStatus, Vec<String>)> {
        // Closing stdin signals end of input
        drop(self.stdin.take());
        let errors = self
            .drain
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        let status = match self.child.as_mut() {
            Some(child) => child
                .wait()
                .map_err(|e| command_wait_error("ffmpeg (encoder)", e))?,
            None => {
                return Err(CoreError::OperationFailed(
                    "encoder process already finished".to_string(),
                ));
            }
        };
        self.child = None;
        Ok((status, errors))
    }
}

impl FrameWriter for FfmpegFrameWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> CoreResult<()> {
        if frame.dimensions() != self.dimensions {
            return Err(CoreError::FrameWrite(format!(
                "frame is {}x{}, writer expects {}x{}",
                frame.width(),
                frame.height(),
                self.dimensions.0,
                self.dimensions.1
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| CoreError::FrameWrite("encoder input already closed".to_string()))?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| CoreError::FrameWrite(format!("encoder pipe closed: {e}")))?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> CoreResult<u64> {
        let (status, errors) = self.wait_for_exit()?;
        if !status.success() {
            return Err(command_failed_error(
                "ffmpeg (encoder)",
                status,
                errors.join("\n"),
            ));
        }
        debug!("Encoder finished after {} frames", self.frames_written);
        Ok(self.frames_written)
    }

    fn fourcc(&self) -> Fourcc {
        self.fourcc
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl Drop for FfmpegFrameWriter {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.drain.take() {
            let _ = handle.join();
        }
    }
}
