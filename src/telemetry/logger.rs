//! JSONL link statistics logger with file rotation.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::link::{Clock, LinkStatistics, RcLink, Transport};

const FILE_PREFIX: &str = "link_stats_";
const FILE_SUFFIX: &str = ".jsonl";

/// One line of the statistics log
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatsRecord {
    /// RFC 3339 wall-clock time the snapshot was taken
    pub timestamp: String,
    pub role: String,
    pub link_active: bool,
    pub failsafe_engaged: bool,
    /// `None` until the first frame has been accepted
    pub time_since_rx_ms: Option<u32>,
    pub tx_sequence: u8,
    /// Absent when statistics are disabled
    pub stats: Option<LinkStatistics>,
}

impl StatsRecord {
    /// Snapshot the current state of `link`
    pub fn capture<T: Transport, C: Clock>(link: &RcLink<T, C>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            role: link.role().to_string(),
            link_active: link.is_active(),
            failsafe_engaged: link.failsafe_engaged(),
            time_since_rx_ms: link.time_since_rx(),
            tx_sequence: link.tx_sequence(),
            stats: link.stats().copied(),
        }
    }
}

/// Writes [`StatsRecord`]s to `link_stats_<session>_<index>.jsonl` files,
/// starting a new file every `max_records_per_file` records and keeping at
/// most `max_files_to_keep` files in the directory.
#[derive(Debug)]
pub struct StatsLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    session: String,
    file_index: u32,
    records_in_file: usize,
    writer: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
}

impl StatsLogger {
    /// Create a logger writing into `config.log_dir`, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        Self::with_limits(
            &config.log_dir,
            config.max_records_per_file,
            config.max_files_to_keep,
        )
    }

    pub fn with_limits<P: AsRef<Path>>(
        dir: P,
        max_records_per_file: usize,
        max_files_to_keep: usize,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            session: chrono::Local::now().format("%Y%m%d_%H%M%S").to_string(),
            file_index: 0,
            records_in_file: 0,
            writer: None,
            current_path: None,
        })
    }

    /// Append one record, rotating first if the current file is full
    pub fn log(&mut self, record: &StatsRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, record).map_err(std::io::Error::from)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            self.records_in_file += 1;
        }

        Ok(())
    }

    /// Path of the file currently being written, if any
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        self.file_index += 1;
        let path = self.dir.join(format!(
            "{}{}_{:04}{}",
            FILE_PREFIX, self.session, self.file_index, FILE_SUFFIX
        ));

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!("Logging link statistics to {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.current_path = Some(path);
        self.records_in_file = 0;

        self.prune()
    }

    /// Delete the oldest log files beyond `max_files_to_keep`
    fn prune(&self) -> Result<()> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX))
                    .unwrap_or(false)
            })
            .collect();

        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        // Names sort chronologically: session timestamp, then zero-padded index
        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed old statistics log {}", path.display()),
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }

        Ok(())
    }
}
