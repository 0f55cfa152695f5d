//! Append-only write-ahead log of committed transactions.
//!
//! Each record is a 4-byte big-endian length followed by that many bytes
//! of a serialized [`LogRecord`]. The transaction coordinator is the sole
//! writer and appends strictly in commit order; replay streams records
//! back in the same order. A truncated trailing record is the footprint
//! of a crash mid-append and is silently ignored; a malformed complete
//! record is corruption and aborts replay.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GraphError, Result};
use crate::tx::{Op, TxId};

const LEN_PREFIX_SIZE: usize = 4;

/// One committed transaction as written to the log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Coordinator-issued transaction id; strictly increasing across the file.
    pub tx_id: TxId,
    /// Unix timestamp (seconds) captured at commit time.
    pub timestamp: i64,
    /// Forward operations in build order.
    pub ops: Vec<Op>,
}

/// Handle to the on-disk log at `<data_dir>/wal/wal.log`.
#[derive(Debug)]
pub struct Wal {
    file: File,
    path: PathBuf,
}

impl Wal {
    /// Opens (creating if absent) the log under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let dir = data_dir.join("wal");
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("wal.log");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        Ok(Self { file, path })
    }

    /// Appends one record and flushes it to stable storage before returning.
    pub fn append(&mut self, record: &LogRecord) -> Result<()> {
        let payload = serde_json::to_vec(record)
            .map_err(|err| GraphError::Serialization(err.to_string()))?;
        let len = u32::try_from(payload.len())
            .map_err(|_| GraphError::Serialization("log record exceeds u32 length".into()))?;

        self.file
            .seek(SeekFrom::End(0))
            .map_err(durability)?;
        self.file
            .write_all(&len.to_be_bytes())
            .map_err(durability)?;
        self.file.write_all(&payload).map_err(durability)?;
        self.file.sync_data().map_err(durability)?;
        debug!(tx_id = record.tx_id, bytes = payload.len(), "wal append");
        Ok(())
    }

    /// Streams every complete record from the beginning of the file.
    ///
    /// Stops cleanly at end-of-file or at an incomplete trailing record;
    /// partial writes never reach the callback. A complete record that
    /// fails to deserialize is fatal.
    pub fn replay<F>(&mut self, mut apply: F) -> Result<usize>
    where
        F: FnMut(LogRecord) -> Result<()>,
    {
        self.file.seek(SeekFrom::Start(0))?;
        let mut applied = 0usize;
        let mut len_buf = [0u8; LEN_PREFIX_SIZE];

        loop {
            match self.read_exact_or_eof(&mut len_buf)? {
                ReadOutcome::Eof => break,
                ReadOutcome::Partial => {
                    warn!("wal ends mid length prefix, ignoring tail");
                    break;
                }
                ReadOutcome::Complete => {}
            }
            let len = u32::from_be_bytes(len_buf) as usize;
            let mut payload = vec![0u8; len];
            match self.read_exact_or_eof(&mut payload)? {
                ReadOutcome::Complete => {}
                ReadOutcome::Eof | ReadOutcome::Partial => {
                    warn!(expected = len, "wal ends mid record, ignoring tail");
                    break;
                }
            }
            let record: LogRecord = serde_json::from_slice(&payload).map_err(|err| {
                GraphError::Corruption(format!("malformed WAL record: {err}"))
            })?;
            apply(record)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Reads every complete record into memory, in file order.
    pub fn read_all(&mut self) -> Result<Vec<LogRecord>> {
        let mut records = Vec::new();
        self.replay(|record| {
            records.push(record);
            Ok(())
        })?;
        Ok(records)
    }

    /// Drops all records whose tx id is less than or equal to `up_to_tx_id`.
    ///
    /// The survivors are rewritten to a temporary file which then replaces
    /// the log atomically.
    pub fn truncate(&mut self, up_to_tx_id: TxId) -> Result<()> {
        let records = self.read_all()?;
        let survivors: Vec<&LogRecord> =
            records.iter().filter(|r| r.tx_id > up_to_tx_id).collect();

        let dir = self
            .path
            .parent()
            .ok_or_else(|| GraphError::Corruption("wal path has no parent".into()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        for record in &survivors {
            let payload = serde_json::to_vec(record)
                .map_err(|err| GraphError::Serialization(err.to_string()))?;
            let len = payload.len() as u32;
            tmp.write_all(&len.to_be_bytes())?;
            tmp.write_all(&payload)?;
        }
        tmp.as_file().sync_data()?;
        tmp.persist(&self.path)
            .map_err(|err| GraphError::Io(err.error))?;

        self.file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)?;
        debug!(
            up_to_tx_id,
            kept = survivors.len(),
            dropped = records.len() - survivors.len(),
            "wal truncated"
        );
        Ok(())
    }

    /// Empties the log. Test and administrative use.
    pub fn reset(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Current file length in bytes.
    pub fn size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn read_exact_or_eof(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        let mut read = 0usize;
        while read < buf.len() {
            let bytes = self.file.read(&mut buf[read..])?;
            if bytes == 0 {
                if read == 0 {
                    return Ok(ReadOutcome::Eof);
                }
                return Ok(ReadOutcome::Partial);
            }
            read += bytes;
        }
        Ok(ReadOutcome::Complete)
    }
}

enum ReadOutcome {
    Complete,
    Eof,
    Partial,
}

fn durability(err: std::io::Error) -> GraphError {
    GraphError::Durability(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;
    use tempfile::tempdir;

    fn record(tx_id: TxId) -> LogRecord {
        LogRecord {
            tx_id,
            timestamp: 1_700_000_000,
            ops: vec![Op::PutNode(Node::new(format!("n{tx_id}")))],
        }
    }

    #[test]
    fn append_then_replay_round_trips() {
        let dir = tempdir().unwrap();
        let mut wal = Wal::open(dir.path()).unwrap();
        for tx_id in 1..=3 {
            wal.append(&record(tx_id)).unwrap();
        }

        let replayed = wal.read_all().unwrap();
        assert_eq!(replayed, vec![record(1), record(2), record(3)]);
    }

    #[test]
    fn replay_ignores_truncated_tail() {
        let dir = tempdir().unwrap();
        let mut wal = Wal::open(dir.path()).unwrap();
        for tx_id in 1..=3 {
            wal.append(&record(tx_id)).unwrap();
        }
        let full = wal.size().unwrap();
        wal.file.set_len(full - 3).unwrap();

        let replayed = wal.read_all().unwrap();
        assert_eq!(replayed, vec![record(1), record(2)]);
    }

    #[test]
    fn replay_rejects_malformed_complete_record() {
        let dir = tempdir().unwrap();
        let mut wal = Wal::open(dir.path()).unwrap();
        let garbage = b"not json at all";
        wal.file
            .write_all(&(garbage.len() as u32).to_be_bytes())
            .unwrap();
        wal.file.write_all(garbage).unwrap();

        let err = wal.read_all().unwrap_err();
        assert!(matches!(err, GraphError::Corruption(_)));
    }

    #[test]
    fn truncate_keeps_newer_records_in_order() {
        let dir = tempdir().unwrap();
        let mut wal = Wal::open(dir.path()).unwrap();
        for tx_id in 1..=5 {
            wal.append(&record(tx_id)).unwrap();
        }

        wal.truncate(3).unwrap();
        let replayed = wal.read_all().unwrap();
        assert_eq!(replayed, vec![record(4), record(5)]);

        wal.truncate(5).unwrap();
        assert_eq!(wal.size().unwrap(), 0);
    }

    #[test]
    fn reset_empties_the_log() {
        let dir = tempdir().unwrap();
        let mut wal = Wal::open(dir.path()).unwrap();
        wal.append(&record(1)).unwrap();
        wal.reset().unwrap();
        assert_eq!(wal.size().unwrap(), 0);
        assert!(wal.read_all().unwrap().is_empty());
    }
}
