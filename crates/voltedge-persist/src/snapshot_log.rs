//! ---
//! ve_section: "03-persistence-logging"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Persistence abstractions and storage bindings."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
//! Append-only JSONL snapshot log: one header line, then one entry per
//! snapshot with a monotonically assigned sequence number.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Digest;

use voltedge_grid::Snapshot;

use crate::{PersistError, Result};

/// Format version stamped into every log header.
pub const SNAPSHOT_LOG_VERSION: u16 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotLogHeader {
    version: u16,
    created_at: DateTime<Utc>,
    hash: String,
}

impl SnapshotLogHeader {
    fn new() -> Self {
        let created_at = Utc::now();
        let hash = format!(
            "{:x}",
            sha2::Sha256::digest(created_at.to_rfc3339().as_bytes())
        );
        Self {
            version: SNAPSHOT_LOG_VERSION,
            created_at,
            hash,
        }
    }
}

/// One persisted snapshot record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotLogEntry {
    /// Sequential identifier assigned when appending.
    pub sequence: u64,
    /// Wall-clock time the record was written.
    pub recorded_at: DateTime<Utc>,
    /// The snapshot itself, with its deterministic simulation timestamp.
    pub snapshot: Snapshot,
}

/// Append-only writer; flushes after every record so tailing consumers see
/// entries promptly.
pub struct SnapshotLogWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    next_sequence: u64,
}

impl SnapshotLogWriter {
    /// Open a log for appending, writing a header when the file is new.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let exists = path.exists() && fs::metadata(path)?.len() > 0;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);

        if !exists {
            let header = SnapshotLogHeader::new();
            let line = serde_json::to_string(&header)?;
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            return Ok(Self {
                path: path.to_path_buf(),
                writer,
                next_sequence: 0,
            });
        }

        let next_sequence = last_sequence(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            next_sequence,
        })
    }

    /// Append one snapshot; returns its assigned sequence number.
    pub fn append(&mut self, snapshot: &Snapshot) -> Result<u64> {
        self.next_sequence += 1;
        let entry = SnapshotLogEntry {
            sequence: self.next_sequence,
            recorded_at: Utc::now(),
            snapshot: snapshot.clone(),
        };
        let line = serde_json::to_string(&entry)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(entry.sequence)
    }

    /// Path of the log on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn last_sequence(path: &Path) -> Result<u64> {
    let reader = SnapshotLogReader::open(path)?;
    let mut last = 0u64;
    for entry in reader {
        last = entry?.sequence;
    }
    Ok(last)
}

/// Streaming reader over a snapshot log.
pub struct SnapshotLogReader {
    lines: std::io::Lines<BufReader<File>>,
}

impl SnapshotLogReader {
    /// Open a log, validating the header line.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut lines = BufReader::new(file).lines();
        let header_line = lines
            .next()
            .ok_or_else(|| PersistError::MissingHeader(path.to_path_buf()))??;
        let _header: SnapshotLogHeader = serde_json::from_str(&header_line)?;
        Ok(Self { lines })
    }

    /// Read every entry into memory, in sequence order.
    pub fn read_all(path: &Path) -> Result<Vec<SnapshotLogEntry>> {
        Self::open(path)?.collect()
    }
}

impl Iterator for SnapshotLogReader {
    type Item = Result<SnapshotLogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => {
                    return Some(serde_json::from_str(&line).map_err(PersistError::from))
                }
                Err(err) => return Some(Err(PersistError::from(err))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot(tick: u64) -> Snapshot {
        Snapshot {
            simulation_id: 7,
            tick_number: tick,
            timestamp: DateTime::from_timestamp(1_735_689_600 + tick as i64, 0).unwrap(),
            total_generation_mw: 300.0,
            total_consumption_mw: 300.0,
            grid_frequency_hz: 50.0,
            grid_voltage_kv: 230.0,
            voltage_levels_kv: vec![230.0],
            efficiency_percentage: 100.0,
            fault_count: 0,
            active_failure_ids: Vec::new(),
            alerts: Vec::new(),
        }
    }

    #[test]
    fn roundtrips_entries_in_sequence_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim-7.jsonl");
        {
            let mut writer = SnapshotLogWriter::open(&path).unwrap();
            for tick in 1..=3 {
                writer.append(&sample_snapshot(tick)).unwrap();
            }
        }
        let entries = SnapshotLogReader::read_all(&path).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].sequence, 1);
        assert_eq!(entries[2].snapshot.tick_number, 3);
    }

    #[test]
    fn reopen_continues_the_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim-7.jsonl");
        {
            let mut writer = SnapshotLogWriter::open(&path).unwrap();
            writer.append(&sample_snapshot(1)).unwrap();
        }
        {
            let mut writer = SnapshotLogWriter::open(&path).unwrap();
            let seq = writer.append(&sample_snapshot(2)).unwrap();
            assert_eq!(seq, 2);
        }
        let entries = SnapshotLogReader::read_all(&path).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn missing_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jsonl");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            SnapshotLogReader::open(&path),
            Err(PersistError::MissingHeader(_))
        ));
    }
}
