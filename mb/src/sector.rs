//! Sector-granular reads and writes

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{MailboxError, SECTOR_SIZE};

/// A flat file addressed as fixed 512-byte sectors
///
/// Holds only the path: every operation opens and closes the file, so
/// no handle is kept across polls and another process never contends
/// with a long-lived descriptor. Writes are flushed to durable storage
/// before returning - the other side must be able to trust what it
/// reads on its next poll.
#[derive(Debug, Clone)]
pub struct SectorFile {
    path: PathBuf,
}

impl SectorFile {
    /// Create a handle for the given backing file (does not touch disk)
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read exactly one sector
    ///
    /// Fails with [`MailboxError::TooShort`] if the file exists but does
    /// not cover the requested sector, and with [`MailboxError::Io`] if
    /// the file is missing or unreadable.
    pub fn read_sector(&self, sector: u32) -> Result<[u8; SECTOR_SIZE], MailboxError> {
        let mut file = OpenOptions::new().read(true).open(&self.path)?;

        let file_len = file.metadata()?.len();
        let needed = (u64::from(sector) + 1) * SECTOR_SIZE as u64;
        if file_len < needed {
            debug!(sector, file_len, needed, "read_sector: file too short");
            return Err(MailboxError::TooShort { sector, file_len });
        }

        file.seek(SeekFrom::Start(u64::from(sector) * SECTOR_SIZE as u64))?;
        let mut buf = [0u8; SECTOR_SIZE];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Write exactly one sector and flush it to durable storage
    ///
    /// Input shorter than a sector is zero-padded on the right; longer
    /// input is truncated. The file must already exist (mailbox files
    /// are provisioned externally, not grown by writes).
    pub fn write_sector(&self, sector: u32, data: &[u8]) -> Result<(), MailboxError> {
        let mut buf = [0u8; SECTOR_SIZE];
        let len = data.len().min(SECTOR_SIZE);
        buf[..len].copy_from_slice(&data[..len]);

        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(u64::from(sector) * SECTOR_SIZE as u64))?;
        file.write_all(&buf)?;
        file.sync_all()?;

        debug!(sector, len = data.len(), "write_sector: wrote and synced");
        Ok(())
    }

    /// Read a sector as text
    ///
    /// Decodes UTF-8 up to (not including) the first NUL byte; anything
    /// after the first NUL is padding and discarded. Decoding is lossy -
    /// invalid byte sequences are replaced, never a hard failure.
    pub fn read_text(&self, sector: u32) -> Result<String, MailboxError> {
        let buf = self.read_sector(sector)?;
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
    }

    /// Write text into a sector (UTF-8, truncated/zero-padded to fit)
    pub fn write_text(&self, sector: u32, text: &str) -> Result<(), MailboxError> {
        self.write_sector(sector, text.as_bytes())
    }
}
