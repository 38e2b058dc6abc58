//! Persistence port for finished session logs.
//!
//! [`LogSubmitter`] is the seam the orchestrator submits through. The
//! bundled [`JsonlLogSink`] appends each submission to a JSONL outbox file
//! with file locking, so several processes can share one outbox.

use crate::{Result, SessionLog};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Destination for a finished session log
pub trait LogSubmitter {
    fn submit(&mut self, log: &SessionLog) -> Result<()>;
}

impl<L: LogSubmitter + ?Sized> LogSubmitter for Box<L> {
    fn submit(&mut self, log: &SessionLog) -> Result<()> {
        (**self).submit(log)
    }
}

/// One outbox line: the submitted log plus bookkeeping
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmittedLog {
    pub id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub log: SessionLog,
}

/// JSONL outbox with file locking
pub struct JsonlLogSink {
    path: PathBuf,
}

impl JsonlLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl LogSubmitter for JsonlLogSink {
    fn submit(&mut self, log: &SessionLog) -> Result<()> {
        self.ensure_parent_dir()?;

        let entry = SubmittedLog {
            id: Uuid::new_v4(),
            submitted_at: Utc::now(),
            log: log.clone(),
        };
        let line = serde_json::to_string(&entry)?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;

        // A torn earlier write leaves no trailing newline; start a fresh line
        let needs_newline = !ends_with_newline(&file)?;

        let mut writer = std::io::BufWriter::new(&file);
        if needs_newline {
            tracing::warn!("Outbox {:?} did not end in a newline, repairing", self.path);
            writer.write_all(b"\n")?;
        }
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.sync_all()?;
        file.unlock()?;

        tracing::info!("Submitted session log {} to {:?}", entry.id, self.path);
        Ok(())
    }
}

/// True for an empty file or one whose last byte is `\n`
fn ends_with_newline(mut file: &File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Read every submitted log from an outbox file, oldest first.
///
/// Lines that fail to parse are skipped with a warning.
pub fn read_submitted_logs(path: &Path) -> Result<Vec<SubmittedLog>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut logs = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<SubmittedLog>(&line) {
            Ok(entry) => logs.push(entry),
            Err(e) => {
                tracing::warn!("Skipping outbox line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} submitted logs from {:?}", logs.len(), path);
    Ok(logs)
}
