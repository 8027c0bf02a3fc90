//! Recording session coordinator
//!
//! Ties one engine to the video recorder, the input tasks and the watchdog
//! for the lifetime of a session, then runs the post-recording steps:
//! alignment, frame extraction and writing the action log.

use crate::action::ActionLog;
use crate::capture::input::channel::{InputSender, InputTrackingChannel};
use crate::capture::screenshot::CaptureRequest;
use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::engine::{spawn_watchdog, ActionEngine};
use crate::processing::alignment::align_output;
use crate::recorder::channel::{FrameExtractor, RecordingResult, VideoRecorder, VideoTarget};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const VIDEO_FILE_NAME: &str = "recording.mp4";

/// What a finished session produced
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub actions: ActionLog,
    pub video_path: PathBuf,
    pub log_path: PathBuf,
    pub screenshots_dir: Option<PathBuf>,
    pub screenshots: Vec<PathBuf>,
    pub failed_screenshots: usize,
    pub dropped_gestures: usize,
    /// Offset applied during alignment (0 when the video's start was unknown)
    pub video_t0: f64,
}

impl SessionReport {
    /// Human-readable table of the recorded actions
    pub fn summary(&self) -> String {
        let mut out = String::from("High-level actions:\n");
        out.push_str(&self.actions.summary());
        let _ = writeln!(out, "\nSaved video        → {}", self.video_path.display());
        let _ = writeln!(out, "Saved action log   → {}", self.log_path.display());
        if let Some(dir) = &self.screenshots_dir {
            let _ = writeln!(out, "Screenshots folder → {}", dir.display());
        }
        out
    }
}

pub struct RecordingSession {
    config: SessionConfig,
    engine: Arc<ActionEngine>,
    recorder: Box<dyn VideoRecorder>,
    extractor: Box<dyn FrameExtractor>,
    input: InputTrackingChannel,
    watchdog_cancel: CancellationToken,
    watchdog: JoinHandle<()>,
    video_path: PathBuf,
}

impl RecordingSession {
    pub async fn start(
        config: SessionConfig,
        recorder: Box<dyn VideoRecorder>,
        extractor: Box<dyn FrameExtractor>,
    ) -> RecordingResult<(Self, InputSender)> {
        Self::start_with_clock(config, Arc::new(SystemClock), recorder, extractor).await
    }

    pub async fn start_with_clock(
        config: SessionConfig,
        clock: Arc<dyn Clock>,
        mut recorder: Box<dyn VideoRecorder>,
        extractor: Box<dyn FrameExtractor>,
    ) -> RecordingResult<(Self, InputSender)> {
        config.validate()?;

        std::fs::create_dir_all(&config.output_dir)?;
        if config.capture_screenshots {
            std::fs::create_dir_all(config.screenshots_dir())?;
        }

        let engine = Arc::new(ActionEngine::new(config.engine(), clock));
        let video_path = config.output_dir.join(VIDEO_FILE_NAME);
        let target = VideoTarget {
            path: video_path.clone(),
            fps: config.fps,
            timer_overlay: config.timer_overlay,
            origin_unix_secs: engine.origin().unix_secs(),
        };
        recorder.start(&target).await?;

        let watchdog_cancel = CancellationToken::new();
        let watchdog = spawn_watchdog(engine.clone(), watchdog_cancel.clone());
        let (input, sender) = InputTrackingChannel::start(engine.clone());

        tracing::info!("Recording to {:?}", config.output_dir);

        Ok((
            Self {
                config,
                engine,
                recorder,
                extractor,
                input,
                watchdog_cancel,
                watchdog,
                video_path,
            },
            sender,
        ))
    }

    pub fn engine(&self) -> &Arc<ActionEngine> {
        &self.engine
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Flush the engine, finalize the video, align and persist the log.
    ///
    /// Only failing to write the action log is an error; recorder, probe and
    /// frame extraction failures degrade the report instead.
    pub async fn stop(self) -> RecordingResult<SessionReport> {
        let Self {
            config,
            engine,
            mut recorder,
            extractor,
            input,
            watchdog_cancel,
            watchdog,
            video_path,
        } = self;

        input.stop().await;

        let mut output = engine.stop();
        watchdog_cancel.cancel();
        if let Err(e) = watchdog.await {
            tracing::warn!("Typing watchdog task failed: {}", e);
        }

        if let Err(e) = recorder.stop().await {
            tracing::warn!("Video recorder failed to stop cleanly: {}", e);
        }
        let video_t0 = recorder.first_frame_offset().await;
        let video_path = recorder
            .output_path()
            .map(Path::to_path_buf)
            .unwrap_or(video_path);

        let grid = align_output(&mut output, video_t0, config.fps);

        let screenshots_dir = config
            .capture_screenshots
            .then(|| config.screenshots_dir());
        let mut screenshots = Vec::new();
        let mut failed_screenshots = 0;
        if let Some(dir) = &screenshots_dir {
            for request in &output.captures {
                match extract_frame(extractor.as_ref(), &video_path, dir, request).await {
                    Ok(path) => screenshots.push(path),
                    Err(e) => {
                        tracing::warn!("Screenshot {} failed: {}", request.file_name(), e);
                        failed_screenshots += 1;
                    }
                }
            }
        }

        let log_path = video_path.with_extension("json");
        output.actions.write_json(&log_path)?;

        tracing::info!(
            "Session finished: {} actions, {} screenshots ({} failed), log {:?}",
            output.actions.len(),
            screenshots.len(),
            failed_screenshots,
            log_path
        );

        Ok(SessionReport {
            actions: output.actions,
            video_path,
            log_path,
            screenshots_dir,
            screenshots,
            failed_screenshots,
            dropped_gestures: output.dropped_gestures,
            video_t0: grid.video_t0,
        })
    }
}

async fn extract_frame(
    extractor: &dyn FrameExtractor,
    video: &Path,
    dir: &Path,
    request: &CaptureRequest,
) -> RecordingResult<PathBuf> {
    let dest = dir.join(request.file_name());
    extractor.extract(video, request.offset_secs, &dest).await?;
    Ok(dest)
}
