//! FFmpeg-backed recorder and frame extractor
//!
//! Records the main display through avfoundation into a temporary MKV
//! (safe to interrupt while writing), then remuxes it to MP4. Input
//! timestamps are wall-clock based so the first frame's `start_time` can be
//! expressed relative to the engine origin.

use crate::recorder::channel::{
    FrameExtractor, RecordingError, RecordingResult, VideoRecorder, VideoTarget,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::time::Duration;

/// avfoundation input: display 1, no audio
pub const DEFAULT_INPUT_DEVICE: &str = "1:none";

const STOP_TIMEOUT: Duration = Duration::from_secs(10);

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Arguments for the live screen recording
pub fn record_args(target: &VideoTarget, temp_path: &Path, input_device: &str) -> Vec<String> {
    let mut args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-f",
        "avfoundation",
        "-framerate",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(target.fps.to_string());
    args.extend(
        ["-use_wallclock_as_timestamps", "1", "-i", input_device]
            .iter()
            .map(|s| s.to_string()),
    );

    if target.timer_overlay {
        args.push("-vf".to_string());
        args.push(timer_overlay_filter(target.origin_unix_secs));
    }

    args.extend(
        [
            "-vcodec",
            "libx264",
            "-preset",
            "ultrafast",
            "-pix_fmt",
            "yuv420p",
            "-copyts",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args.push(path_arg(temp_path));
    args
}

/// Running timer showing seconds since the engine origin
pub fn timer_overlay_filter(origin_unix_secs: f64) -> String {
    format!(
        "drawtext=text='%{{pts\\:hms\\:{:.3}}}':x=20:y=20:fontsize=36:fontcolor=white:box=1:boxcolor=black@0.5",
        -origin_unix_secs
    )
}

/// Fast remux MKV -> MP4 with fast-start for web players
pub fn remux_args(temp_path: &Path, out_path: &Path) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-i".to_string(),
        path_arg(temp_path),
        "-c".to_string(),
        "copy".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        path_arg(out_path),
    ]
}

pub fn probe_args(video: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-select_streams".to_string(),
        "v:0".to_string(),
        "-show_entries".to_string(),
        "stream=start_time".to_string(),
        "-of".to_string(),
        "default=noprint_wrappers=1:nokey=1".to_string(),
        path_arg(video),
    ]
}

pub fn extract_args(video: &Path, offset_secs: f64, dest: &Path) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-ss".to_string(),
        format!("{:.3}", offset_secs.max(0.0)),
        "-i".to_string(),
        path_arg(video),
        "-frames:v".to_string(),
        "1".to_string(),
        path_arg(dest),
    ]
}

/// First numeric line of ffprobe's `start_time` output (`N/A` yields None)
pub fn parse_probe_start_time(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// Screen recorder running an `ffmpeg` child process
pub struct FfmpegRecorder {
    ffmpeg: String,
    ffprobe: String,
    input_device: String,
    process: Option<Child>,
    target: Option<VideoTarget>,
    first_frame_unix: Option<f64>,
}

impl FfmpegRecorder {
    pub fn new() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            input_device: DEFAULT_INPUT_DEVICE.to_string(),
            process: None,
            target: None,
            first_frame_unix: None,
        }
    }

    pub fn with_input_device(mut self, device: impl Into<String>) -> Self {
        self.input_device = device.into();
        self
    }

    fn temp_path(target: &VideoTarget) -> PathBuf {
        target.path.with_extension("capture.mkv")
    }

    async fn probe_start_time(&self, video: &Path) -> RecordingResult<f64> {
        let output = Command::new(&self.ffprobe)
            .args(probe_args(video))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RecordingError::ProbeError(format!("Failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(RecordingError::ProbeError(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_probe_start_time(&stdout).ok_or_else(|| {
            RecordingError::ProbeError(format!("No start_time in ffprobe output: {:?}", stdout.trim()))
        })
    }

    async fn remux(&self, temp_path: &Path, out_path: &Path) -> RecordingResult<()> {
        let output = Command::new(&self.ffmpeg)
            .args(remux_args(temp_path, out_path))
            .stdin(Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            return Err(RecordingError::ProcessError(format!(
                "Remux failed with status {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl Default for FfmpegRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoRecorder for FfmpegRecorder {
    async fn start(&mut self, target: &VideoTarget) -> RecordingResult<()> {
        if self.process.is_some() {
            return Err(RecordingError::AlreadyRecording);
        }

        if let Some(parent) = target.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp_path = Self::temp_path(target);
        let process = Command::new(&self.ffmpeg)
            .args(record_args(target, &temp_path, &self.input_device))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RecordingError::ProcessError(format!(
                    "Failed to start ffmpeg (is it installed?): {}",
                    e
                ))
            })?;

        tracing::info!(
            "Started screen recording: {}fps, overlay={}, output: {:?}",
            target.fps,
            target.timer_overlay,
            temp_path
        );

        self.process = Some(process);
        self.target = Some(target.clone());
        self.first_frame_unix = None;
        Ok(())
    }

    async fn stop(&mut self) -> RecordingResult<()> {
        let mut process = self.process.take().ok_or(RecordingError::NotRecording)?;
        let target = self.target.clone().ok_or(RecordingError::NotRecording)?;

        // ffmpeg finishes the file cleanly on "q"
        if let Some(mut stdin) = process.stdin.take() {
            if let Err(e) = stdin.write_all(b"q\n").await {
                tracing::debug!("Could not send quit to ffmpeg: {}", e);
            }
            let _ = stdin.flush().await;
        }

        match tokio::time::timeout(STOP_TIMEOUT, process.wait()).await {
            Ok(Ok(status)) if !status.success() => {
                tracing::warn!("FFmpeg recorder exited with status {}", status);
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                tracing::warn!("FFmpeg recorder did not exit within {:?}, killing", STOP_TIMEOUT);
                process.kill().await?;
            }
        }

        let temp_path = Self::temp_path(&target);
        match self.probe_start_time(&temp_path).await {
            Ok(start_time) => self.first_frame_unix = Some(start_time),
            Err(e) => tracing::warn!("Could not probe first frame time: {}", e),
        }

        tracing::info!("Finalizing video {:?}", target.path);
        self.remux(&temp_path, &target.path).await?;
        if let Err(e) = std::fs::remove_file(&temp_path) {
            tracing::debug!("Could not remove {:?}: {}", temp_path, e);
        }
        Ok(())
    }

    async fn first_frame_offset(&self) -> Option<f64> {
        let origin = self.target.as_ref()?.origin_unix_secs;
        self.first_frame_unix.map(|start| start - origin)
    }

    fn output_path(&self) -> Option<&Path> {
        self.target.as_ref().map(|target| target.path.as_path())
    }
}

/// Frame extractor running one `ffmpeg` per frame
pub struct FfmpegFrameExtractor {
    ffmpeg: String,
}

impl FfmpegFrameExtractor {
    pub fn new() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}

impl Default for FfmpegFrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract(&self, video: &Path, offset_secs: f64, dest: &Path) -> RecordingResult<()> {
        let output = Command::new(&self.ffmpeg)
            .args(extract_args(video, offset_secs, dest))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RecordingError::ExtractionError(format!("Failed to run ffmpeg: {}", e)))?;

        if !output.status.success() {
            return Err(RecordingError::ExtractionError(format!(
                "ffmpeg exited with status {} for {:?}: {}",
                output.status,
                dest,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}
