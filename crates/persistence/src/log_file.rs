// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-Only Entry Log File
//!
//! Durable backing for `VerifiableLog`.
//! - Every append is written, flushed and fsync'd before returning
//! - No rewriting: the only mutation besides appending is cutting off a
//!   torn tail left by a crash mid-write
//! - Every frame carries a CRC64 of its payload
//!
//! # File Format
//! ```text
//! [Header: 16 bytes][Frame][Frame][Frame]...
//! ```
//!
//! Header:
//! - magic: [u8; 8] = "LPLOG\0\0\0"
//! - version: u32 (1)
//! - reserved: u32 (0)
//!
//! Frame:
//! - len: u32 LE
//! - crc64: u64 LE over the payload
//! - payload: canonical entry bytes

use byteorder::{ByteOrder, LittleEndian};
use crc64fast::Digest;
use ledgerpost_kernel::{Entry, LogResult, LogStorage};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{PersistenceError, Result};

const MAGIC: &[u8; 8] = b"LPLOG\0\0\0";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 16;
const FRAME_HEADER_SIZE: usize = 4 + 8;

fn header_bytes() -> [u8; HEADER_SIZE] {
    let mut bytes = [0u8; HEADER_SIZE];
    bytes[0..8].copy_from_slice(MAGIC);
    LittleEndian::write_u32(&mut bytes[8..12], VERSION);
    LittleEndian::write_u32(&mut bytes[12..16], 0);
    bytes
}

fn validate_header(bytes: &[u8]) -> Result<()> {
    if bytes.len() < HEADER_SIZE || &bytes[0..8] != MAGIC {
        return Err(PersistenceError::InvalidMagic);
    }
    let version = LittleEndian::read_u32(&bytes[8..12]);
    if version != VERSION {
        return Err(PersistenceError::UnsupportedVersion(version));
    }
    Ok(())
}

pub fn checksum(payload: &[u8]) -> u64 {
    let mut digest = Digest::new();
    digest.write(payload);
    digest.sum64()
}

/// Encode one frame.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![0u8; FRAME_HEADER_SIZE];
    LittleEndian::write_u32(&mut frame[0..4], payload.len() as u32);
    LittleEndian::write_u64(&mut frame[4..12], checksum(payload));
    frame.extend_from_slice(payload);
    frame
}

/// Outcome of scanning a log file body.
#[derive(Debug)]
pub struct Scan {
    pub entries: Vec<Entry>,
    /// Byte length of the valid prefix (header + whole frames).
    pub valid_len: u64,
    /// True when trailing bytes did not form a complete frame.
    pub torn_tail: bool,
}

/// Parse a whole file image.
///
/// A short final frame is a torn write and is reported, not an error.
/// A complete frame whose checksum does not match is corruption.
pub fn scan(bytes: &[u8]) -> Result<Scan> {
    validate_header(bytes)?;

    let mut offset = HEADER_SIZE;
    let mut entries = Vec::new();

    while offset < bytes.len() {
        let rest = &bytes[offset..];
        if rest.len() < FRAME_HEADER_SIZE {
            break;
        }
        let len = LittleEndian::read_u32(&rest[0..4]) as usize;
        let expected = LittleEndian::read_u64(&rest[4..12]);
        if rest.len() < FRAME_HEADER_SIZE + len {
            break;
        }

        let payload = &rest[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + len];
        let found = checksum(payload);
        if found != expected {
            return Err(PersistenceError::ChecksumMismatch {
                offset: offset as u64,
                expected,
                found,
            });
        }

        let entry = Entry::from_bytes(payload)
            .map_err(|e| PersistenceError::InvalidFormat(format!("frame at {}: {}", offset, e)))?;
        entries.push(entry);
        offset += FRAME_HEADER_SIZE + len;
    }

    Ok(Scan {
        entries,
        valid_len: offset as u64,
        torn_tail: offset < bytes.len(),
    })
}

/// File-backed `LogStorage`.
///
/// A failed append is cut back off the file before the error is returned, so
/// the file only ever holds what callers were told succeeded. If that cut
/// fails too, the handle refuses every later append.
pub struct FileLogStorage {
    path: PathBuf,
    file: File,
    frame_count: u64,
    disabled: bool,
    #[cfg(test)]
    fault: Option<(u64, Fault)>,
    #[cfg(test)]
    fail_rollback: bool,
}

/// Write failures injected by tests, keyed on the frame they hit.
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    /// Half the frame reaches the file, then the write errors.
    TornWrite,
    /// The whole frame reaches the file, then `sync_data` errors.
    SyncFails,
    /// As `SyncFails`, and cutting the frame back off fails too.
    RollbackFails,
}

#[cfg(test)]
fn injected() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "injected fault")
}

impl FileLogStorage {
    /// Open or create a log file.
    ///
    /// If the file exists its header is validated; otherwise it is created
    /// with a header and fsync'd.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file_exists = path.exists();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;

        if file_exists && file.metadata()?.len() > 0 {
            let mut header = [0u8; HEADER_SIZE];
            file.read_exact(&mut header)
                .map_err(|_| PersistenceError::InvalidMagic)?;
            validate_header(&header)?;
        } else {
            file.write_all(&header_bytes())?;
            file.sync_all()?;
        }

        Ok(Self {
            path,
            file,
            frame_count: 0,
            disabled: false,
            #[cfg(test)]
            fault: None,
            #[cfg(test)]
            fail_rollback: false,
        })
    }

    /// Read every entry, cutting off a torn tail if one is found.
    pub fn read_all(&mut self) -> Result<Vec<Entry>> {
        let mut bytes = Vec::new();
        File::open(&self.path)?.read_to_end(&mut bytes)?;

        let scan = scan(&bytes)?;
        if scan.torn_tail {
            tracing::warn!(
                "Torn tail in {:?}: truncating {} bytes",
                self.path,
                bytes.len() as u64 - scan.valid_len
            );
            self.file.set_len(scan.valid_len)?;
            self.file.sync_all()?;
        }

        self.frame_count = scan.entries.len() as u64;
        Ok(scan.entries)
    }

    /// Append one entry. Only returns Ok() after durable write.
    ///
    /// On error the file is back at its previous length.
    pub fn append_entry(&mut self, entry: &Entry) -> Result<()> {
        if self.disabled {
            return Err(PersistenceError::Disabled(self.path.clone()));
        }
        let payload = entry
            .to_bytes()
            .map_err(|e| PersistenceError::InvalidFormat(e.to_string()))?;
        let frame = encode_frame(&payload);

        let committed_len = self.file.metadata()?.len();
        if let Err(e) = self.write_frame(&frame) {
            tracing::error!("Append to {:?} failed: {}. Rolling back to {} bytes", self.path, e, committed_len);
            if let Err(rollback) = self.rollback(committed_len) {
                tracing::error!("Rollback of {:?} failed: {}. Refusing further appends", self.path, rollback);
                self.disabled = true;
            }
            return Err(e.into());
        }

        self.frame_count += 1;
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        #[cfg(test)]
        if let Some((at, fault)) = self.fault {
            if at == self.frame_count {
                self.fault = None;
                match fault {
                    Fault::TornWrite => self.file.write_all(&frame[..frame.len() / 2])?,
                    Fault::SyncFails => self.file.write_all(frame)?,
                    Fault::RollbackFails => {
                        self.file.write_all(frame)?;
                        self.fail_rollback = true;
                    }
                }
                self.file.flush()?;
                return Err(injected());
            }
        }

        self.file.write_all(frame)?;
        self.file.flush()?;
        self.file.sync_data()
    }

    /// Cut the file back to `len` bytes.
    fn rollback(&mut self, len: u64) -> io::Result<()> {
        #[cfg(test)]
        if self.fail_rollback {
            return Err(injected());
        }

        self.file.set_len(len)?;
        self.file.sync_all()
    }

    /// True once a failed append could not be rolled back.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Frames read or written through this handle.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogStorage for FileLogStorage {
    fn load(&mut self) -> LogResult<Vec<Entry>> {
        Ok(self.read_all()?)
    }

    fn append(&mut self, entry: &Entry) -> LogResult<()> {
        Ok(self.append_entry(entry)?)
    }
}
