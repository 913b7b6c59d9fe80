// ============================================================================
// skywatch-core/src/media/source.rs
// ============================================================================
//
// FFMPEG FRAME SOURCE
//
// Decodes the first video stream of a file into packed RGB24 frames using
// ffmpeg-sidecar. ffmpeg writes raw frames to stdout and ffmpeg-sidecar
// splits them into `OutputFrame` events; this source pulls one event at a
// time so only a single decoded frame is held in memory.
//
// Autorotation is disabled so decoded frames always match the coded
// dimensions reported by ffprobe.

use super::FrameSource;
use super::probe::{VideoProperties, probe_video};
use crate::error::{CoreError, CoreResult, command_start_error};
use crate::utils::format_command;

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use ffmpeg_sidecar::iter::FfmpegIterator;
use image::RgbImage;
use log::{debug, trace};

use std::path::{Path, PathBuf};

/// Frame source backed by an ffmpeg decoding process.
pub struct FfmpegFrameSource {
    path: PathBuf,
    properties: VideoProperties,
    child: FfmpegChild,
    events: Option<FfmpegIterator>,
    errors: Vec<String>,
    frames_read: u64,
}

impl FfmpegFrameSource {
    /// Probes `path` and starts decoding it.
    pub fn open(path: &Path) -> CoreResult<Self> {
        let properties = probe_video(path)?;
        Self::open_with_properties(path, properties)
    }

    /// Starts decoding `path` using already known properties.
    pub fn open_with_properties(path: &Path, properties: VideoProperties) -> CoreResult<Self> {
        let mut cmd = FfmpegCommand::new();
        cmd.hide_banner()
            .args(["-nostdin", "-noautorotate"])
            .input(path)
            .args(["-map", "0:v:0", "-an", "-sn", "-dn"])
            .rawvideo();
        debug!("Decoder command: {}", format_command(&cmd));

        let mut child = cmd
            .spawn()
            .map_err(|e| command_start_error("ffmpeg (decoder)", e))?;
        let events = child.iter().map_err(|e| CoreError::SourceOpen {
            path: path.to_path_buf(),
            reason: format!("could not read decoder output: {e}"),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            properties,
            child,
            events: Some(events),
            errors: Vec::new(),
            frames_read: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn end_of_stream(&mut self) -> CoreResult<Option<RgbImage>> {
        self.events = None;
        let status = self.child.wait().ok();
        match status {
            Some(status) if !status.success() => Err(CoreError::FrameDecode(format!(
                "decoder exited with {status} after {} frames: {}",
                self.frames_read,
                self.errors.last().map(String::as_str).unwrap_or("no error output")
            ))),
            _ => Ok(None),
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn properties(&self) -> &VideoProperties {
        &self.properties
    }

    fn next_frame(&mut self) -> CoreResult<Option<RgbImage>> {
        let Some(events) = self.events.as_mut() else {
            return Ok(None);
        };

        for event in events.by_ref() {
            match event {
                FfmpegEvent::OutputFrame(frame) => {
                    let frame_num = frame.frame_num;
                    let expected = frame.width as usize * frame.height as usize * 3;
                    if frame.data.len() != expected {
                        return Err(CoreError::FrameDecode(format!(
                            "frame {frame_num} has {} bytes, expected {expected}",
                            frame.data.len()
                        )));
                    }
                    let image = RgbImage::from_raw(frame.width, frame.height, frame.data)
                        .ok_or_else(|| {
                            CoreError::FrameDecode(format!(
                                "frame {frame_num} could not be wrapped as RGB"
                            ))
                        })?;
                    self.frames_read += 1;
                    return Ok(Some(image));
                }
                FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, message) => {
                    trace!("decoder: {message}");
                    self.errors.push(message);
                }
                FfmpegEvent::Error(message) => {
                    trace!("decoder: {message}");
                    self.errors.push(message);
                }
                FfmpegEvent::Done => break,
                _ => {}
            }
        }

        self.end_of_stream()
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        self.events = None;
        // Still running if the pipeline stopped before end of stream
        if self.child.kill().is_ok() {
            let _ = self.child.wait();
        }
    }
}
