//! Size- and date-based rolling file sink.
//!
//! This module provides:
//! - [`FileSize`] - Byte sizes parsed from strings such as `10MB`
//! - [`RollingPolicy`] - Threshold, archive naming and retention
//! - [`RollingFileSink`] - A sink that writes to an active file and archives
//!   it when the size threshold or a date boundary is crossed
//!
//! Archives are named `<stem>.<yyyy-MM-dd>_<i>.log`. The index starts at 0 for
//! each date and continues past archives already on disk, so a restart never
//! overwrites history.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate};
use parking_lot::Mutex;

use crate::encoder::PatternEncoder;
use crate::error::{LoggingError, Result};
use crate::event::LogEvent;
use crate::filter::{FilterReply, LevelFilter};
use crate::sink::Sink;

/// Extension used for active and archived files.
pub const EXT: &str = ".log";

/// Default single-file size threshold.
pub const DEFAULT_MAX_FILE_SIZE: FileSize = FileSize::mb(10);

/// Default number of archives kept.
pub const DEFAULT_MAX_HISTORY: usize = 30;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// A size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileSize(u64);

impl FileSize {
    /// A size of `n` bytes.
    #[must_use]
    pub const fn bytes(n: u64) -> Self {
        Self(n)
    }

    /// A size of `n` kibibytes.
    #[must_use]
    pub const fn kb(n: u64) -> Self {
        Self(n * KB)
    }

    /// A size of `n` mebibytes.
    #[must_use]
    pub const fn mb(n: u64) -> Self {
        Self(n * MB)
    }

    /// Returns the size in bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> u64 {
        self.0
    }
}

impl FromStr for FileSize {
    type Err = LoggingError;

    /// Parses `<digits>[ ][KB|MB|GB]`, unit case-insensitive, 1024-based.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(split);

        let invalid = || LoggingError::InvalidFileSize(s.to_string());
        let count: u64 = digits.parse().map_err(|_| invalid())?;
        let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
            "" => 1,
            "KB" => KB,
            "MB" => MB,
            "GB" => GB,
            _ => return Err(invalid()),
        };

        count.checked_mul(multiplier).map(Self).ok_or_else(invalid)
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0;
        if n >= GB && n % GB == 0 {
            write!(f, "{}GB", n / GB)
        } else if n >= MB && n % MB == 0 {
            write!(f, "{}MB", n / MB)
        } else if n >= KB && n % KB == 0 {
            write!(f, "{}KB", n / KB)
        } else {
            write!(f, "{n}")
        }
    }
}

/// When and where a rolling file is archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingPolicy {
    /// Directory archives are written to.
    pub archive_dir: PathBuf,
    /// File stem shared by the active file and its archives.
    pub file_stem: String,
    /// Size threshold for a single file.
    pub max_file_size: FileSize,
    /// Number of archives kept; `0` keeps everything.
    pub max_history: usize,
}

impl RollingPolicy {
    /// Creates a policy with the default threshold and retention.
    #[must_use]
    pub fn new(archive_dir: impl Into<PathBuf>, file_stem: impl Into<String>) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            file_stem: file_stem.into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }

    /// Sets the size threshold.
    #[must_use]
    pub const fn with_max_file_size(mut self, size: FileSize) -> Self {
        self.max_file_size = size;
        self
    }

    /// Sets the retention count.
    #[must_use]
    pub const fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Archive naming pattern, for display.
    #[must_use]
    pub fn archive_pattern(&self) -> String {
        self.archive_dir
            .join(format!("{}.%d{{yyyy-MM-dd}}_%i{EXT}", self.file_stem))
            .display()
            .to_string()
    }

    /// Path of the archive for `date` and `index`.
    #[must_use]
    pub fn archive_path(&self, date: NaiveDate, index: u32) -> PathBuf {
        self.archive_dir.join(format!(
            "{}.{}_{index}{EXT}",
            self.file_stem,
            date.format("%Y-%m-%d")
        ))
    }

    /// Lists archives on disk, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive directory cannot be read.
    pub fn list_archives(&self) -> Result<Vec<(NaiveDate, u32, PathBuf)>> {
        if !self.archive_dir.exists() {
            return Ok(Vec::new());
        }
        let mut archives: Vec<(NaiveDate, u32, PathBuf)> = fs::read_dir(&self.archive_dir)?
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                let (date, index) = self.parse_archive_name(name)?;
                Some((date, index, path))
            })
            .collect();
        archives.sort();
        Ok(archives)
    }

    /// First unused index for `date`.
    fn next_index(&self, date: NaiveDate) -> Result<u32> {
        Ok(self
            .list_archives()?
            .iter()
            .filter(|(d, _, _)| *d == date)
            .map(|(_, i, _)| i + 1)
            .max()
            .unwrap_or(0))
    }

    fn parse_archive_name(&self, name: &str) -> Option<(NaiveDate, u32)> {
        let rest = name
            .strip_prefix(self.file_stem.as_str())?
            .strip_prefix('.')?
            .strip_suffix(EXT)?;
        let (date, index) = rest.rsplit_once('_')?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        let index = index.parse().ok()?;
        Some((date, index))
    }
}

/// State of a started sink.
struct ActiveFile {
    /// Open handle; `None` only between archiving and reopening.
    file: Option<File>,
    /// Bytes in the active file.
    size: u64,
    /// Date the active file's content belongs to.
    period: NaiveDate,
    /// Index the next archive for `period` will use.
    next_index: u32,
}

/// Writes encoded events to a file, archiving it per a [`RollingPolicy`].
pub struct RollingFileSink {
    name: String,
    path: PathBuf,
    policy: RollingPolicy,
    encoder: PatternEncoder,
    filters: Vec<LevelFilter>,
    state: Mutex<Option<ActiveFile>>,
}

impl RollingFileSink {
    /// Creates a sink for the active file at `path`. Nothing is opened until
    /// [`Sink::start`].
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        policy: RollingPolicy,
        encoder: PatternEncoder,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            policy,
            encoder,
            filters: Vec::new(),
            state: Mutex::new(None),
        }
    }

    /// Adds a filter; the first non-neutral verdict wins.
    #[must_use]
    pub fn with_filter(mut self, filter: LevelFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Path of the active file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The rolling policy.
    #[must_use]
    pub const fn policy(&self) -> &RollingPolicy {
        &self.policy
    }

    /// Filters attached to this sink.
    #[must_use]
    pub fn filters(&self) -> &[LevelFilter] {
        &self.filters
    }

    /// Bytes in the active file, or 0 before start.
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.state.lock().as_ref().map_or(0, |s| s.size)
    }

    /// Archives the active file now, regardless of size or date.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink is not started or the file cannot be
    /// moved.
    pub fn roll_over(&self) -> Result<()> {
        let mut guard = self.state.lock();
        let state = guard
            .as_mut()
            .ok_or_else(|| LoggingError::SinkNotStarted(self.name.clone()))?;
        self.archive_locked(state)?;
        self.prune()
    }

    fn open_active(&self) -> Result<File> {
        Ok(OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?)
    }

    fn write_locked(&self, state: &mut ActiveFile, date: NaiveDate, line: &[u8]) -> Result<()> {
        let line_bytes = line.len() as u64;
        let mut rolled = false;

        if date > state.period {
            if state.size > 0 {
                self.archive_locked(state)?;
                rolled = true;
            }
            state.period = date;
            state.next_index = self.policy.next_index(date)?;
        } else if state.size > 0
            && state.size + line_bytes > self.policy.max_file_size.as_bytes()
        {
            self.archive_locked(state)?;
            rolled = true;
        }

        if state.file.is_none() {
            state.file = Some(self.open_active()?);
        }
        if let Some(file) = state.file.as_mut() {
            file.write_all(line)?;
            file.flush()?;
            state.size += line_bytes;
        }

        // The line is on disk; a failed prune still surfaces to the caller.
        if rolled {
            self.prune()
        } else {
            Ok(())
        }
    }

    fn archive_locked(&self, state: &mut ActiveFile) -> Result<()> {
        // Close before renaming; some platforms refuse to move open files.
        state.file.take();

        let mut target = self.policy.archive_path(state.period, state.next_index);
        while target.exists() {
            state.next_index += 1;
            target = self.policy.archive_path(state.period, state.next_index);
        }
        if self.path.exists() {
            fs::rename(&self.path, &target)?;
        }
        state.next_index += 1;
        state.size = 0;
        state.file = Some(self.open_active()?);
        Ok(())
    }

    fn prune(&self) -> Result<()> {
        if self.policy.max_history == 0 {
            return Ok(());
        }
        let archives = self.policy.list_archives()?;
        let excess = archives.len().saturating_sub(self.policy.max_history);
        let mut first_error = None;
        for (_, _, path) in archives.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), |e| Err(e.into()))
    }
}

impl fmt::Debug for RollingFileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollingFileSink")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("policy", &self.policy)
            .field("filters", &self.filters)
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

impl Sink for RollingFileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<()> {
        let mut guard = self.state.lock();
        if guard.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir_all(&self.policy.archive_dir)?;

        let file = self.open_active()?;
        let metadata = file.metadata()?;
        let size = metadata.len();
        // Content left by a previous run belongs to the day it was written.
        let period = if size > 0 {
            metadata
                .modified()
                .map_or_else(|_| Local::now().date_naive(), |t| {
                    DateTime::<Local>::from(t).date_naive()
                })
        } else {
            Local::now().date_naive()
        };
        let next_index = self.policy.next_index(period)?;

        *guard = Some(ActiveFile {
            file: Some(file),
            size,
            period,
            next_index,
        });
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.state.lock().is_some()
    }

    fn decide(&self, event: &LogEvent) -> FilterReply {
        self.filters
            .iter()
            .map(|f| f.decide(event))
            .find(|reply| *reply != FilterReply::Neutral)
            .unwrap_or(FilterReply::Neutral)
    }

    fn append(&self, event: &LogEvent) -> Result<()> {
        let line = self.encoder.encode(event);
        let mut guard = self.state.lock();
        let state = guard
            .as_mut()
            .ok_or_else(|| LoggingError::SinkNotStarted(self.name.clone()))?;
        self.write_locked(state, event.timestamp.date_naive(), line.as_bytes())
    }
}
