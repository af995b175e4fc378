//! Live statistics ingestion.
//!
//! [`StatisticsIngestor`] watches the log a source port writes (selected
//! through its [`StatsFormat`]) and emits a [`NewStatistics`] event for
//! every record it has not reported before. Engines that rewrite their log
//! in place are handled by remembering, per source file, which records were
//! already emitted at which position.

pub mod formats;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use wadkeeper_core::StatRecord;

use crate::profile::SourcePortProfile;
use crate::watcher::{FileStamp, NewFileDetector};

pub use formats::{ParsedStats, StatsFormat, StatsSource};

/// One newly recognized record.
#[derive(Debug, Clone)]
pub struct NewStatistics {
    pub record: StatRecord,
    /// The record replaces an earlier one for the same map.
    pub is_update: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestorState {
    Stopped,
    Started,
}

/// Tails one port's statistics log.
pub struct StatisticsIngestor {
    format: &'static StatsFormat,
    directory: PathBuf,
    state: IngestorState,
    detector: Option<NewFileDetector>,
    baseline_stamps: HashMap<PathBuf, Option<FileStamp>>,
    last_stamps: HashMap<PathBuf, Option<FileStamp>>,
    emitted: HashMap<PathBuf, Vec<StatRecord>>,
    seen_maps: HashSet<String>,
    errors: Vec<String>,
    events: mpsc::Sender<NewStatistics>,
}

impl StatisticsIngestor {
    /// Ingestor for `format` reading under `directory`. Events arrive on the
    /// returned receiver, each at most once.
    pub fn new(
        format: &'static StatsFormat,
        directory: impl Into<PathBuf>,
    ) -> (Self, mpsc::Receiver<NewStatistics>) {
        let (tx, rx) = mpsc::channel();
        let ingestor = Self {
            format,
            directory: directory.into(),
            state: IngestorState::Stopped,
            detector: None,
            baseline_stamps: HashMap::new(),
            last_stamps: HashMap::new(),
            emitted: HashMap::new(),
            seen_maps: HashSet::new(),
            errors: Vec::new(),
            events: tx,
        };
        (ingestor, rx)
    }

    /// Ingestor for a profile's format, if it has one.
    pub fn for_profile(
        profile: &SourcePortProfile,
    ) -> Option<(Self, mpsc::Receiver<NewStatistics>)> {
        let format = profile.statistics_format()?;
        Some(Self::new(format, profile.directory()))
    }

    pub fn format(&self) -> &'static StatsFormat {
        self.format
    }

    pub fn state(&self) -> IngestorState {
        self.state
    }

    pub fn launch_parameters(&self) -> &'static [&'static str] {
        self.format.launch_args
    }

    pub fn read_on_close(&self) -> bool {
        self.format.read_on_close
    }

    /// Parse errors collected since `start`.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Begin a session. Logs that already exist are remembered as they are
    /// now, so only content written after this call is reported.
    pub fn start(&mut self) {
        self.baseline_stamps.clear();
        self.last_stamps.clear();
        self.emitted.clear();
        self.seen_maps.clear();
        self.errors.clear();
        self.detector = None;

        match self.format.source {
            StatsSource::File(name) => {
                let path = self.directory.join(name);
                let stamp = FileStamp::of(&path);
                self.baseline_stamps.insert(path, stamp);
            }
            StatsSource::Directory { extension } => {
                let mut detector = NewFileDetector::new(&self.directory, &[extension]);
                if let Err(e) = detector.start_detection() {
                    self.record_error(format!(
                        "Could not watch '{}': {}",
                        self.directory.display(),
                        e
                    ));
                }
                self.detector = Some(detector);
            }
        }
        self.state = IngestorState::Started;
        log::debug!(
            "Statistics ({}) started in '{}'",
            self.format.name,
            self.directory.display()
        );
    }

    /// Poll for changes. Formats read on close are left alone until `stop`.
    pub fn tick(&mut self) {
        if self.state == IngestorState::Started && !self.format.read_on_close {
            self.read(false);
        }
    }

    /// End the session with one final read.
    pub fn stop(&mut self) {
        if self.state == IngestorState::Stopped {
            return;
        }
        self.read(true);
        self.state = IngestorState::Stopped;
        log::debug!(
            "Statistics ({}) stopped with {} error(s)",
            self.format.name,
            self.errors.len()
        );
    }

    /// Read now regardless of `read_on_close`.
    pub fn read_now(&mut self) {
        if self.state == IngestorState::Started {
            self.read(true);
        }
    }

    fn candidate_files(&mut self) -> Vec<PathBuf> {
        match self.format.source {
            StatsSource::File(name) => vec![self.directory.join(name)],
            StatsSource::Directory { .. } => {
                let Some(detector) = self.detector.as_mut() else {
                    return Vec::new();
                };
                if let Err(e) = detector.tick() {
                    log::warn!("Could not poll '{}': {}", self.directory.display(), e);
                }
                let mut files = detector.new_files();
                files.extend(detector.modified_files());
                files
            }
        }
    }

    fn read(&mut self, final_pass: bool) {
        for path in self.candidate_files() {
            let stamp = FileStamp::of(&path);
            // Unchanged since start, or (while live) since the last read.
            if stamp.is_none()
                || self.baseline_stamps.get(&path) == Some(&stamp)
                || (!final_pass && self.last_stamps.get(&path) == Some(&stamp))
            {
                continue;
            }
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    self.record_error(format!("Could not read '{}': {}", path.display(), e));
                    continue;
                }
            };
            self.last_stamps.insert(path.clone(), stamp);
            let text = if final_pass {
                text.as_str()
            } else {
                complete_lines(&text)
            };
            let parsed = (self.format.parse)(text);
            self.ingest(&path, parsed);
        }
    }

    fn ingest(&mut self, path: &Path, parsed: ParsedStats) {
        for error in parsed.errors {
            self.record_error(format!("{}: {}", file_label(path), error));
        }

        let previous = self.emitted.entry(path.to_path_buf()).or_default();
        let mut events = Vec::new();
        for (idx, record) in parsed.records.into_iter().enumerate() {
            if previous.get(idx).is_some_and(|prev| prev.same_values(&record)) {
                continue;
            }
            if idx < previous.len() {
                previous[idx] = record.clone();
            } else {
                previous.push(record.clone());
            }
            let is_update = !self.seen_maps.insert(record.map_name.to_uppercase());
            events.push(NewStatistics { record, is_update });
        }

        for event in events {
            log::debug!(
                "New statistics for {} (update: {})",
                event.record.map_name,
                event.is_update
            );
            let _ = self.events.send(event);
        }
    }

    fn record_error(&mut self, error: String) {
        if !self.errors.contains(&error) {
            log::warn!("{}", error);
            self.errors.push(error);
        }
    }
}

/// Text up to and including the last newline. A live log may end in a
/// half-written line.
fn complete_lines(text: &str) -> &str {
    match text.rfind('\n') {
        Some(idx) => &text[..=idx],
        None => "",
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
#[path = "../tests/stats_tests.rs"]
mod tests;
