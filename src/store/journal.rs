//! Append-only stage journal
//!
//! Every batch of effects is written as one frame:
//!
//! ```text
//! +------------------+
//! | Frame Length     | (u32 LE, includes length and checksum)
//! +------------------+
//! | Effects          | (JSON array)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 over length + effects)
//! +------------------+
//! ```
//!
//! Frames are fsynced before the effects are applied in memory. On open the
//! journal is replayed from the start; a short, oversized or mismatching
//! frame is reported as corruption and the store does not open.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use crc32fast::Hasher;

use super::engine::{Journal, TableStageStore};
use super::errors::{StoreError, StoreResult};
use super::tables::{Effect, StageTables};
use crate::observability::{log_event_with_fields, Event};

/// Journal file name inside `<data_dir>/stages/`.
pub const JOURNAL_FILE: &str = "journal.dat";

/// Length prefix + checksum.
const FRAME_OVERHEAD: u64 = 4 + 4;

fn checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Encodes one batch of effects into a checksummed frame.
fn encode_frame(effects: &[Effect]) -> StoreResult<Vec<u8>> {
    let body = serde_json::to_vec(effects).map_err(|e| {
        StoreError::write_failed_no_source(format!("failed to encode journal frame: {}", e))
    })?;

    let frame_length = (FRAME_OVERHEAD as usize + body.len()) as u32;

    let mut frame = Vec::with_capacity(frame_length as usize);
    frame.extend_from_slice(&frame_length.to_le_bytes());
    frame.extend_from_slice(&body);
    let crc = checksum(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());

    Ok(frame)
}

/// Sequential frame reader used for replay.
struct JournalReader {
    reader: BufReader<File>,
    current_offset: u64,
    file_size: u64,
}

impl JournalReader {
    fn open(path: &Path) -> StoreResult<Self> {
        let file = File::open(path).map_err(|e| {
            StoreError::read_failed(format!("failed to open journal: {}", path.display()), e)
        })?;
        let file_size = file
            .metadata()
            .map_err(|e| StoreError::read_failed("failed to read journal metadata", e))?
            .len();

        Ok(Self {
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
        })
    }

    /// Reads the next frame, verifying length and checksum.
    fn read_next(&mut self) -> StoreResult<Option<Vec<Effect>>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.current_offset;
        if remaining < FRAME_OVERHEAD {
            return Err(StoreError::corruption_at_offset(
                self.current_offset,
                format!("truncated journal: {} bytes remaining", remaining),
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).map_err(|e| {
            StoreError::corruption_at_offset(
                self.current_offset,
                format!("failed to read frame length: {}", e),
            )
        })?;
        let frame_length = u32::from_le_bytes(len_buf) as u64;

        if frame_length < FRAME_OVERHEAD || frame_length > remaining {
            return Err(StoreError::corruption_at_offset(
                self.current_offset,
                format!(
                    "invalid frame length {} with {} bytes remaining",
                    frame_length, remaining
                ),
            ));
        }

        let mut frame = vec![0u8; frame_length as usize];
        frame[0..4].copy_from_slice(&len_buf);
        self.reader.read_exact(&mut frame[4..]).map_err(|e| {
            StoreError::corruption_at_offset(
                self.current_offset,
                format!("failed to read frame body: {}", e),
            )
        })?;

        let body_end = frame.len() - 4;
        let stored = u32::from_le_bytes([
            frame[body_end],
            frame[body_end + 1],
            frame[body_end + 2],
            frame[body_end + 3],
        ]);
        if checksum(&frame[..body_end]) != stored {
            return Err(StoreError::corruption_at_offset(
                self.current_offset,
                "frame checksum mismatch",
            ));
        }

        let effects: Vec<Effect> = serde_json::from_slice(&frame[4..body_end]).map_err(|e| {
            StoreError::corruption_at_offset(
                self.current_offset,
                format!("undecodable frame: {}", e),
            )
        })?;

        self.current_offset += frame_length;
        Ok(Some(effects))
    }
}

/// Durable journal of stage effects.
pub struct FileJournal {
    path: PathBuf,
    file: File,
    frames_written: u64,
}

impl FileJournal {
    /// Opens `<data_dir>/stages/journal.dat`, replaying it into fresh tables.
    ///
    /// Creates the directory and file if missing.
    pub fn open(data_dir: &Path) -> StoreResult<(Self, StageTables)> {
        let dir = data_dir.join("stages");
        let path = dir.join(JOURNAL_FILE);

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| {
                StoreError::write_failed(
                    format!("failed to create journal directory: {}", dir.display()),
                    e,
                )
            })?;
        }

        let tables = Self::replay(&path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                StoreError::write_failed(
                    format!("failed to open journal: {}", path.display()),
                    e,
                )
            })?;

        Ok((
            Self {
                path,
                file,
                frames_written: 0,
            },
            tables,
        ))
    }

    fn replay(path: &Path) -> StoreResult<StageTables> {
        let mut tables = StageTables::new();

        match fs::metadata(path) {
            Ok(m) if m.len() == 0 => return Ok(tables),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(tables),
            Err(e) => return Err(StoreError::io_error("failed to stat journal", e)),
        }

        let mut reader = JournalReader::open(path)?;
        let mut frames = 0u64;
        loop {
            let effects = match reader.read_next() {
                Ok(Some(effects)) => effects,
                Ok(None) => break,
                Err(e) => {
                    log_event_with_fields(
                        Event::JournalCorruption,
                        &[
                            ("error", &e.to_string()),
                            ("path", &path.display().to_string()),
                        ],
                    );
                    return Err(e);
                }
            };
            for effect in &effects {
                tables.apply(effect);
            }
            frames += 1;
        }

        log_event_with_fields(
            Event::JournalReplayed,
            &[
                ("frames", &frames.to_string()),
                ("path", &path.display().to_string()),
            ],
        );

        Ok(tables)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames appended since this journal was opened.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn write_frame(&mut self, frame: &[u8]) -> StoreResult<()> {
        self.file
            .write_all(frame)
            .map_err(|e| StoreError::write_failed("failed to append journal frame", e))?;
        self.file
            .sync_all()
            .map_err(|e| StoreError::write_failed("fsync failed after journal append", e))
    }

    /// Cuts the file back to `len` bytes, dropping a partially written frame.
    fn truncate_to(&mut self, len: u64) -> StoreResult<()> {
        self.file
            .set_len(len)
            .and_then(|()| self.file.sync_all())
            .map_err(|e| {
                StoreError::write_failed(
                    format!("failed to truncate torn journal frame at offset {}", len),
                    e,
                )
            })
    }
}

impl Journal for FileJournal {
    fn append(&mut self, effects: &[Effect]) -> StoreResult<()> {
        let frame = encode_frame(effects)?;
        let offset = self
            .file
            .metadata()
            .map_err(|e| StoreError::io_error("failed to read journal metadata", e))?
            .len();

        if let Err(e) = self.write_frame(&frame) {
            // Later frames must not land behind a torn one.
            self.truncate_to(offset)?;
            return Err(e);
        }

        self.frames_written += 1;
        Ok(())
    }
}

/// Stage store persisted in an append-only journal.
pub type FileStageStore = TableStageStore<FileJournal>;

impl FileStageStore {
    /// Opens the store under `data_dir`, replaying its journal.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        let (journal, tables) = FileJournal::open(data_dir)?;
        Ok(Self::with_journal(tables, journal))
    }
}
