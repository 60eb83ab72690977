//! Playback recorder.
//!
//! Appends one snapshot line per recorded tick to an in-memory buffer. When
//! the buffer grows past the byte ceiling it is exported through the
//! configured [`RecordingSink`] and a fresh buffer is started, so arbitrarily
//! long runs stay bounded in memory.
//!
//! Exported artifacts are named
//! `"<scenario> Recording <start> - <end>.jsonl"` with UTC timestamps
//! formatted as `YYYY-MM-DD HHMMSS` (colons stripped). Path separators in
//! the scenario name are replaced with `_`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::DateTime;
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::scenario::Scenario;

/// Recording size ceiling in MiB.
pub const FILE_SIZE_LIMIT_MB: usize = 1000;
/// Recording size ceiling in bytes.
pub const DEFAULT_BYTE_LIMIT: usize = FILE_SIZE_LIMIT_MB * 1024 * 1024;
/// Default seconds between recorded snapshots.
pub const DEFAULT_RECORD_EVERY_SECONDS: i64 = 10;
/// Intervals cycled through by [`PlaybackRecorder::switch_recording_interval`].
pub const RECORDING_INTERVALS_SECONDS: [i64; 4] = [1, 10, 30, 60];
/// Name used before a scenario is attached.
pub const DEFAULT_SCENARIO_NAME: &str = "New Scenario";

/// A finished recording ready to be written somewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingArtifact {
    /// Suggested file name.
    pub file_name: String,
    /// Newline-delimited snapshots, without a trailing newline.
    pub contents: String,
}

/// Destination for exported recordings.
pub trait RecordingSink: Send {
    /// Store one artifact.
    ///
    /// # Errors
    /// Returns [`EngineError::Export`] if the artifact could not be stored.
    fn export(&mut self, artifact: RecordingArtifact) -> Result<()>;
}

/// Drops every artifact.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl RecordingSink for DiscardSink {
    fn export(&mut self, artifact: RecordingArtifact) -> Result<()> {
        debug!(file = %artifact.file_name, bytes = artifact.contents.len(), "Discarding recording");
        Ok(())
    }
}

/// Writes artifacts as files into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Sink writing into `dir`, created on first export.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RecordingSink for DirectorySink {
    fn export(&mut self, artifact: RecordingArtifact) -> Result<()> {
        let path = self.dir.join(sanitize_file_name(&artifact.file_name));
        fs::create_dir_all(&self.dir)
            .and_then(|()| fs::write(&path, artifact.contents.as_bytes()))
            .map_err(|source| EngineError::Export {
                file_name: artifact.file_name.clone(),
                source,
            })?;
        info!(path = %path.display(), "Recording exported");
        Ok(())
    }
}

/// Keeps artifacts in memory. Clones share the same store.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    artifacts: Arc<Mutex<Vec<RecordingArtifact>>>,
}

impl MemorySink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything exported so far.
    #[must_use]
    pub fn artifacts(&self) -> Vec<RecordingArtifact> {
        self.artifacts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RecordingSink for MemorySink {
    fn export(&mut self, artifact: RecordingArtifact) -> Result<()> {
        self.artifacts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(artifact);
        Ok(())
    }
}

/// First and last snapshot of a run, handed to the feature extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecourseLines {
    /// First recorded snapshot.
    pub first: String,
    /// Last recorded snapshot.
    pub last: String,
    /// Whether the run reached a termination condition.
    pub has_game_ended: bool,
    /// Recording start, unix seconds.
    pub start_time: i64,
    /// Recording end, unix seconds.
    pub end_time: i64,
}

/// Replace path separators so `name` stays a single path component.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    match name {
        "" | "." | ".." => "_".to_string(),
        _ => name.replace(['/', '\\'], "_"),
    }
}

/// Format a unix timestamp for file names: `YYYY-MM-DD HHMMSS`, UTC.
#[must_use]
pub fn format_recording_timestamp(unix_seconds: i64) -> String {
    DateTime::from_timestamp(unix_seconds, 0).map_or_else(
        || unix_seconds.to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string().replace(':', ""),
    )
}

/// Append-and-rotate snapshot recorder for one run at a time.
pub struct PlaybackRecorder {
    scenario_name: String,
    last_recording_time: i64,
    recording: String,
    recording_start_time: i64,
    record_every_seconds: i64,
    byte_limit: usize,
    auto_exports: usize,
    sink: Box<dyn RecordingSink>,
}

impl std::fmt::Debug for PlaybackRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackRecorder")
            .field("scenario_name", &self.scenario_name)
            .field("last_recording_time", &self.last_recording_time)
            .field("recording_bytes", &self.recording.len())
            .field("recording_start_time", &self.recording_start_time)
            .field("record_every_seconds", &self.record_every_seconds)
            .field("byte_limit", &self.byte_limit)
            .finish_non_exhaustive()
    }
}

impl Default for PlaybackRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_RECORD_EVERY_SECONDS)
    }
}

impl PlaybackRecorder {
    /// Recorder snapshotting every `record_every_seconds` (non-positive
    /// values fall back to the default interval). Exports are discarded
    /// until a sink is attached.
    #[must_use]
    pub fn new(record_every_seconds: i64) -> Self {
        let record_every_seconds = if record_every_seconds > 0 {
            record_every_seconds
        } else {
            DEFAULT_RECORD_EVERY_SECONDS
        };
        Self {
            scenario_name: DEFAULT_SCENARIO_NAME.to_string(),
            last_recording_time: 0,
            recording: String::new(),
            recording_start_time: 0,
            record_every_seconds,
            byte_limit: DEFAULT_BYTE_LIMIT,
            auto_exports: 0,
            sink: Box::new(DiscardSink),
        }
    }

    /// Export through `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: impl RecordingSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Override the rotation ceiling.
    #[must_use]
    pub fn with_byte_limit(mut self, byte_limit: usize) -> Self {
        self.byte_limit = byte_limit;
        self
    }

    /// Seconds between recorded snapshots.
    #[must_use]
    pub fn record_every_seconds(&self) -> i64 {
        self.record_every_seconds
    }

    /// Scenario name used for artifact names.
    #[must_use]
    pub fn scenario_name(&self) -> &str {
        &self.scenario_name
    }

    /// Time of the last recorded snapshot.
    #[must_use]
    pub fn last_recording_time(&self) -> i64 {
        self.last_recording_time
    }

    /// Start of the current buffer.
    #[must_use]
    pub fn recording_start_time(&self) -> i64 {
        self.recording_start_time
    }

    /// Current buffer contents.
    #[must_use]
    pub fn recording(&self) -> &str {
        &self.recording
    }

    /// Number of rotations performed since the last reset.
    #[must_use]
    pub fn auto_exports(&self) -> usize {
        self.auto_exports
    }

    /// Advance to the next entry of [`RECORDING_INTERVALS_SECONDS`].
    /// Intervals outside the cycle are left unchanged.
    pub fn switch_recording_interval(&mut self) {
        if let Some(i) = RECORDING_INTERVALS_SECONDS
            .iter()
            .position(|&s| s == self.record_every_seconds)
        {
            self.record_every_seconds =
                RECORDING_INTERVALS_SECONDS[(i + 1) % RECORDING_INTERVALS_SECONDS.len()];
            debug!(interval = self.record_every_seconds, "Recording interval switched");
        }
    }

    /// Whether a snapshot is due at `current_time`. Claims the slot when true.
    pub fn should_record(&mut self, current_time: i64) -> bool {
        if current_time - self.last_recording_time >= self.record_every_seconds {
            self.last_recording_time = current_time;
            return true;
        }
        false
    }

    /// Clear the buffer and forget the attached scenario.
    pub fn reset(&mut self) {
        self.scenario_name = DEFAULT_SCENARIO_NAME.to_string();
        self.recording.clear();
        self.last_recording_time = 0;
        self.recording_start_time = 0;
        self.auto_exports = 0;
    }

    /// Begin a fresh recording of `scenario`.
    pub fn start_recording(&mut self, scenario: &Scenario) {
        self.reset();
        self.scenario_name.clone_from(&scenario.name);
        self.last_recording_time = scenario.current_time;
        self.recording_start_time = scenario.current_time;
        debug!(scenario = %scenario.name, start = scenario.current_time, "Recording started");
    }

    /// Append one snapshot line, rotating when the buffer exceeds the ceiling.
    pub fn record_step(&mut self, line: &str, current_time: i64) {
        self.recording.push_str(line);
        self.recording.push('\n');
        self.last_recording_time = current_time;
        if self.recording.len() > self.byte_limit {
            info!(
                scenario = %self.scenario_name,
                bytes = self.recording.len(),
                "Recording size limit reached, rotating"
            );
            if let Err(err) = self.export_recording(current_time, None) {
                warn!(%err, "Rotation export failed, buffer dropped");
            }
            self.auto_exports += 1;
            self.recording_start_time = current_time;
            self.recording.clear();
        }
    }

    /// Artifact for the current buffer, or `None` when it is empty.
    #[must_use]
    pub fn build_artifact(&self, end_time: i64, start_time: Option<i64>) -> Option<RecordingArtifact> {
        if self.recording.is_empty() {
            return None;
        }
        let start = start_time.unwrap_or(self.recording_start_time);
        let file_name = format!(
            "{} Recording {} - {}.jsonl",
            sanitize_file_name(&self.scenario_name),
            format_recording_timestamp(start),
            format_recording_timestamp(end_time)
        );
        let contents = self
            .recording
            .strip_suffix('\n')
            .unwrap_or(&self.recording)
            .to_string();
        Some(RecordingArtifact {
            file_name,
            contents,
        })
    }

    /// Export the buffer through the sink. The buffer is kept.
    ///
    /// Returns the artifact file name, or `None` for an empty buffer.
    ///
    /// # Errors
    /// Propagates sink failures.
    pub fn export_recording(&mut self, end_time: i64, start_time: Option<i64>) -> Result<Option<String>> {
        let Some(artifact) = self.build_artifact(end_time, start_time) else {
            return Ok(None);
        };
        let file_name = artifact.file_name.clone();
        self.sink.export(artifact)?;
        Ok(Some(file_name))
    }

    /// First and last snapshot of the buffer, or `None` when it is empty.
    #[must_use]
    pub fn export_recourse_recording(
        &self,
        end_time: i64,
        start_time: Option<i64>,
        has_game_ended: bool,
    ) -> Option<RecourseLines> {
        let trimmed = self.recording.trim();
        let mut lines = trimmed.lines();
        let first = lines.next()?;
        let last = lines.next_back().unwrap_or(first);
        Some(RecourseLines {
            first: first.to_string(),
            last: last.to_string(),
            has_game_ended,
            start_time: start_time.unwrap_or(self.recording_start_time),
            end_time,
        })
    }
}
