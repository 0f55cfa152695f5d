//! Atomic on-disk dumps of the whole graph.
//!
//! A snapshot is two files under `<data_dir>/snapshots/`: `snapshot.bin`
//! holds every live node and edge behind a checksummed header, and
//! `snapshot.meta` records the last committed transaction id at dump
//! time. Both are written to temporary names and renamed into place, and
//! both carry the same `last_tx_id` stamp; replay either sees a
//! consistent pair or no snapshot at all. A crash between the two
//! renames leaves a fresh data file next to a stale meta file, which
//! load detects by the stamp mismatch and ignores.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{GraphError, Result};
use crate::model::{Edge, Node};
use crate::store::Store;
use crate::tx::TxId;

const SNAPSHOT_MAGIC: &[u8; 8] = b"GRFSNAP\0";
const SNAPSHOT_VERSION: u16 = 1;
const HEADER_SIZE: usize = 8 + 2 + 8 + 4;

/// Serialized graph contents.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotData {
    /// Every live node at dump time.
    pub nodes: Vec<Node>,
    /// Every live edge at dump time.
    pub edges: Vec<Edge>,
}

/// Sidecar metadata describing a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Format version of the pair of files.
    pub version: u16,
    /// Id of the most recently committed transaction at dump time.
    pub last_tx_id: TxId,
    /// Unix timestamp (seconds) of the dump.
    pub timestamp: i64,
}

fn snapshot_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("snapshots")
}

fn data_path(data_dir: &Path) -> PathBuf {
    snapshot_dir(data_dir).join("snapshot.bin")
}

fn meta_path(data_dir: &Path) -> PathBuf {
    snapshot_dir(data_dir).join("snapshot.meta")
}

/// Dumps the store and `last_tx_id` to disk, replacing any prior snapshot.
pub fn create(data_dir: &Path, store: &Store, last_tx_id: TxId) -> Result<()> {
    let dir = snapshot_dir(data_dir);
    std::fs::create_dir_all(&dir)?;

    let data = SnapshotData {
        nodes: store.all_nodes().cloned().collect(),
        edges: store.all_edges().cloned().collect(),
    };
    let payload =
        serde_json::to_vec(&data).map_err(|err| GraphError::Serialization(err.to_string()))?;
    let checksum = crc32fast::hash(&payload);

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(SNAPSHOT_MAGIC)?;
    tmp.write_all(&SNAPSHOT_VERSION.to_le_bytes())?;
    tmp.write_all(&last_tx_id.to_le_bytes())?;
    tmp.write_all(&checksum.to_le_bytes())?;
    tmp.write_all(&payload)?;
    tmp.as_file().sync_data()?;
    tmp.persist(data_path(data_dir))
        .map_err(|err| GraphError::Io(err.error))?;

    let meta = SnapshotMeta {
        version: SNAPSHOT_VERSION,
        last_tx_id,
        timestamp: time::OffsetDateTime::now_utc().unix_timestamp(),
    };
    let meta_payload =
        serde_json::to_vec(&meta).map_err(|err| GraphError::Serialization(err.to_string()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(&meta_payload)?;
    tmp.as_file().sync_data()?;
    tmp.persist(meta_path(data_dir))
        .map_err(|err| GraphError::Io(err.error))?;

    info!(
        nodes = data.nodes.len(),
        edges = data.edges.len(),
        last_tx_id,
        "snapshot written"
    );
    Ok(())
}

/// Loads the snapshot pair, or reports that none exists.
///
/// Both files must be present, intact, and stamped with the same
/// `last_tx_id`; a mismatched pair is the footprint of a crash between
/// the two renames and counts as no snapshot. A format version newer
/// than the engine understands is an explicit mismatch error rather
/// than a guess.
pub fn load(data_dir: &Path) -> Result<Option<(SnapshotData, SnapshotMeta)>> {
    let data_path = data_path(data_dir);
    let meta_path = meta_path(data_dir);
    if !data_path.exists() || !meta_path.exists() {
        return Ok(None);
    }

    let mut raw = Vec::new();
    std::fs::File::open(&data_path)?.read_to_end(&mut raw)?;
    if raw.len() < HEADER_SIZE || &raw[..8] != SNAPSHOT_MAGIC {
        return Err(GraphError::Snapshot(
            "snapshot data file has invalid header".into(),
        ));
    }
    let version = u16::from_le_bytes([raw[8], raw[9]]);
    if version > SNAPSHOT_VERSION {
        return Err(GraphError::VersionMismatch {
            found: version,
            supported: SNAPSHOT_VERSION,
        });
    }
    let stamped_tx_id = u64::from_le_bytes([
        raw[10], raw[11], raw[12], raw[13], raw[14], raw[15], raw[16], raw[17],
    ]);
    let stored_checksum = u32::from_le_bytes([raw[18], raw[19], raw[20], raw[21]]);
    let payload = &raw[HEADER_SIZE..];
    if crc32fast::hash(payload) != stored_checksum {
        return Err(GraphError::Snapshot(
            "snapshot data checksum mismatch".into(),
        ));
    }
    let data: SnapshotData = serde_json::from_slice(payload)
        .map_err(|err| GraphError::Snapshot(format!("snapshot data unreadable: {err}")))?;

    let meta_raw = std::fs::read(&meta_path)?;
    let meta: SnapshotMeta = serde_json::from_slice(&meta_raw)
        .map_err(|err| GraphError::Snapshot(format!("snapshot metadata unreadable: {err}")))?;
    if meta.version > SNAPSHOT_VERSION {
        return Err(GraphError::VersionMismatch {
            found: meta.version,
            supported: SNAPSHOT_VERSION,
        });
    }
    if meta.last_tx_id != stamped_tx_id {
        warn!(
            data_tx_id = stamped_tx_id,
            meta_tx_id = meta.last_tx_id,
            "snapshot pair disagrees on last tx id, ignoring it"
        );
        return Ok(None);
    }

    Ok(Some((data, meta)))
}
