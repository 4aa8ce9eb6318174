//! # Snapshot Journal
//!
//! **Crash-Safe Ledger Store**
//!
//! Every save appends a full snapshot record and syncs it to disk. On open,
//! the journal is scanned and the last record with a valid CRC wins; a torn
//! tail from a crash mid-write is cut off and the previous snapshot stands.
//!
//! Compaction writes a sibling `.compact` file and renames it over the
//! journal. Until the rename the old journal is untouched, and a leftover
//! `.compact` file found on open is discarded.
//!
//! ## Format
//!
//! ```text
//! [4 bytes: magic "TLDG"]
//! [4 bytes: version]
//!
//! Record format:
//! [8 bytes: sequence number]
//! [4 bytes: payload length]
//! [N bytes: payload (encoded snapshot)]
//! [4 bytes: CRC32 of above]
//!
//! Snapshot payload:
//! [4 bytes: coins][4 bytes: tickets][4 bytes: gems]
//! [4 bytes: entry count] then per entry [1 byte: item id][4 bytes: quantity]
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::currency::ItemId;
use crate::error::{EconomyError, EconomyResult};
use crate::store::{LedgerSnapshot, LedgerStore};

/// Magic bytes identifying a journal file.
const JOURNAL_MAGIC: &[u8; 4] = b"TLDG";

/// Current journal format version.
const JOURNAL_VERSION: u32 = 1;

/// Header size in bytes.
const HEADER_LEN: u64 = 8;

/// Sequence + length prefix of a record.
const RECORD_PREFIX_LEN: usize = 8 + 4;

/// Trailing CRC of a record.
const RECORD_CRC_LEN: usize = 4;

fn io_error(context: &str, e: &std::io::Error) -> EconomyError {
    EconomyError::Persistence(format!("{context}: {e}"))
}

/// Magic followed by the version.
fn header_bytes() -> [u8; 8] {
    let mut header = [0u8; 8];
    header[0..4].copy_from_slice(JOURNAL_MAGIC);
    header[4..8].copy_from_slice(&JOURNAL_VERSION.to_le_bytes());
    header
}

/// Sibling file a compaction is staged in.
fn compact_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".compact");
    PathBuf::from(name)
}

/// Frames a snapshot as one record.
fn encode_record(seq: u64, snapshot: &LedgerSnapshot) -> Vec<u8> {
    let payload = encode_snapshot(snapshot);

    let mut record = Vec::with_capacity(RECORD_PREFIX_LEN + payload.len() + RECORD_CRC_LEN);
    record.extend_from_slice(&seq.to_le_bytes());
    #[allow(clippy::cast_possible_truncation)]
    record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    record.extend_from_slice(&payload);
    let crc = crc32fast::hash(&record);
    record.extend_from_slice(&crc.to_le_bytes());
    record
}

/// Encodes a snapshot as a record payload.
fn encode_snapshot(snapshot: &LedgerSnapshot) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16 + snapshot.owned.len() * 5);
    buf.extend_from_slice(&snapshot.coins.to_le_bytes());
    buf.extend_from_slice(&snapshot.tickets.to_le_bytes());
    buf.extend_from_slice(&snapshot.gems.to_le_bytes());
    #[allow(clippy::cast_possible_truncation)]
    buf.extend_from_slice(&(snapshot.owned.len() as u32).to_le_bytes());
    for (item, quantity) in &snapshot.owned {
        buf.push(*item as u8);
        buf.extend_from_slice(&quantity.to_le_bytes());
    }
    buf
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

/// Decodes a record payload. `None` on any malformed field.
fn decode_snapshot(data: &[u8]) -> Option<LedgerSnapshot> {
    let mut snapshot = LedgerSnapshot {
        coins: read_u32(data, 0)?,
        tickets: read_u32(data, 4)?,
        gems: read_u32(data, 8)?,
        ..LedgerSnapshot::default()
    };

    let count = read_u32(data, 12)? as usize;
    let mut at = 16;
    for _ in 0..count {
        let item = ItemId::from_u8(*data.get(at)?)?;
        let quantity = read_u32(data, at + 1)?;
        snapshot.owned.insert(item, quantity);
        at += 5;
    }

    (at == data.len()).then_some(snapshot)
}

/// Result of scanning a journal file.
struct Scan {
    latest: Option<LedgerSnapshot>,
    next_seq: u64,
    records: u64,
    valid_len: u64,
}

/// Walks the records after the header, stopping at the first bad one.
fn scan_records(data: &[u8]) -> Scan {
    let mut scan = Scan {
        latest: None,
        next_seq: 0,
        records: 0,
        valid_len: HEADER_LEN,
    };

    #[allow(clippy::cast_possible_truncation)]
    let mut at = HEADER_LEN as usize;

    loop {
        let Some(prefix) = data.get(at..at + RECORD_PREFIX_LEN) else {
            break;
        };
        let Some(seq) = prefix[0..8].try_into().ok().map(u64::from_le_bytes) else {
            break;
        };
        let Some(len) = read_u32(prefix, 8) else {
            break;
        };

        let payload_start = at + RECORD_PREFIX_LEN;
        let payload_end = payload_start + len as usize;
        let Some(payload) = data.get(payload_start..payload_end) else {
            break;
        };
        let Some(stored_crc) = read_u32(data, payload_end) else {
            break;
        };

        let computed_crc = crc32fast::hash(&data[at..payload_end]);
        if stored_crc != computed_crc {
            break;
        }
        let Some(snapshot) = decode_snapshot(payload) else {
            break;
        };

        scan.latest = Some(snapshot);
        scan.next_seq = seq.wrapping_add(1);
        scan.records += 1;
        at = payload_end + RECORD_CRC_LEN;
        scan.valid_len = at as u64;
    }

    scan
}

/// Append-only snapshot journal on disk.
pub struct JournalStore {
    /// Path to the journal file.
    path: PathBuf,
    /// File handle, positioned at the end.
    file: BufWriter<File>,
    /// Sequence number of the next record.
    next_seq: u64,
    /// Valid records currently in the file.
    records: u64,
    /// Last snapshot written or recovered.
    latest: Option<LedgerSnapshot>,
}

impl JournalStore {
    /// Opens or creates a journal file.
    ///
    /// If the file exists it is recovered: the last valid snapshot is kept and
    /// anything after it is truncated. A file holding only part of the header
    /// (a crash during creation) starts over as a new journal.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Persistence` if the file cannot be opened, has
    /// a foreign header, or an unsupported version.
    pub fn open(path: impl AsRef<Path>) -> EconomyResult<Self> {
        let path = path.as_ref().to_path_buf();

        let staged = compact_path(&path);
        if staged.exists() {
            tracing::warn!(path = %staged.display(), "discarding unfinished journal compaction");
            std::fs::remove_file(&staged)
                .map_err(|e| io_error("failed to remove staged compaction", &e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| io_error("failed to open journal", &e))?;

        let data = std::fs::read(&path).map_err(|e| io_error("failed to read journal", &e))?;

        let mut store = Self {
            path,
            file: BufWriter::new(file),
            next_seq: 0,
            records: 0,
            latest: None,
        };

        if data.is_empty() {
            store.write_header()?;
            return Ok(store);
        }

        if (data.len() as u64) < HEADER_LEN && header_bytes().starts_with(&data) {
            tracing::warn!(
                path = %store.path.display(),
                len = data.len(),
                "journal recovery: partial header rewritten"
            );
            store
                .file
                .get_ref()
                .set_len(0)
                .map_err(|e| io_error("failed to truncate journal", &e))?;
            store
                .file
                .seek(SeekFrom::Start(0))
                .map_err(|e| io_error("failed to seek journal", &e))?;
            store.write_header()?;
            return Ok(store);
        }

        if data.len() < 8 || &data[0..4] != JOURNAL_MAGIC {
            return Err(EconomyError::Persistence("invalid journal magic".to_string()));
        }
        let version = read_u32(&data, 4).unwrap_or(0);
        if version != JOURNAL_VERSION {
            return Err(EconomyError::Persistence(format!(
                "unsupported journal version: {version}"
            )));
        }

        let scan = scan_records(&data);
        if scan.valid_len < data.len() as u64 {
            tracing::warn!(
                path = %store.path.display(),
                discarded_bytes = data.len() as u64 - scan.valid_len,
                "journal recovery: torn tail discarded"
            );
            store
                .file
                .get_ref()
                .set_len(scan.valid_len)
                .map_err(|e| io_error("failed to truncate journal", &e))?;
        }

        store
            .file
            .seek(SeekFrom::End(0))
            .map_err(|e| io_error("failed to seek journal", &e))?;

        store.next_seq = scan.next_seq;
        store.records = scan.records;
        store.latest = scan.latest;

        Ok(store)
    }

    /// Path of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of valid records in the file.
    #[must_use]
    pub const fn record_count(&self) -> u64 {
        self.records
    }

    /// Rewrites the file with only the latest snapshot.
    ///
    /// The new contents are staged in a sibling file, synced, and renamed
    /// over the journal, so a crash leaves either the old or the new file.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Persistence` if the rewrite fails.
    pub fn compact(&mut self) -> EconomyResult<()> {
        self.file
            .flush()
            .map_err(|e| io_error("flush failed", &e))?;

        let mut contents = header_bytes().to_vec();
        let mut records = 0;
        if let Some(snapshot) = &self.latest {
            contents.extend_from_slice(&encode_record(self.next_seq, snapshot));
            records = 1;
        }

        let staged = compact_path(&self.path);
        {
            let mut file = File::create(&staged)
                .map_err(|e| io_error("failed to create staged compaction", &e))?;
            file.write_all(&contents)
                .map_err(|e| io_error("failed to write staged compaction", &e))?;
            file.sync_data()
                .map_err(|e| io_error("failed to sync staged compaction", &e))?;
        }

        std::fs::rename(&staged, &self.path)
            .map_err(|e| io_error("failed to replace journal", &e))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| io_error("failed to reopen journal", &e))?;
        self.file = BufWriter::new(file);
        self.file
            .seek(SeekFrom::End(0))
            .map_err(|e| io_error("failed to seek journal", &e))?;

        let before = self.records;
        self.records = records;
        self.next_seq = self.next_seq.wrapping_add(records);

        tracing::info!(before, after = self.records, "journal compacted");
        Ok(())
    }

    fn write_header(&mut self) -> EconomyResult<()> {
        self.file
            .write_all(&header_bytes())
            .map_err(|e| io_error("failed to write header", &e))?;
        self.sync()
    }

    fn append(&mut self, snapshot: &LedgerSnapshot) -> EconomyResult<()> {
        let record = encode_record(self.next_seq, snapshot);

        self.file
            .write_all(&record)
            .map_err(|e| io_error("journal write failed", &e))?;
        self.sync()?;

        self.next_seq = self.next_seq.wrapping_add(1);
        self.records += 1;
        Ok(())
    }

    fn sync(&mut self) -> EconomyResult<()> {
        self.file
            .flush()
            .map_err(|e| io_error("journal sync failed", &e))?;
        self.file
            .get_ref()
            .sync_data()
            .map_err(|e| io_error("journal sync failed", &e))
    }
}

impl LedgerStore for JournalStore {
    fn load(&mut self) -> EconomyResult<Option<LedgerSnapshot>> {
        Ok(self.latest.clone())
    }

    fn save(&mut self, snapshot: &LedgerSnapshot) -> EconomyResult<()> {
        self.append(snapshot)?;
        self.latest = Some(snapshot.clone());
        Ok(())
    }
}

impl std::fmt::Debug for JournalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalStore")
            .field("path", &self.path)
            .field("next_seq", &self.next_seq)
            .field("records", &self.records)
            .finish_non_exhaustive()
    }
}
