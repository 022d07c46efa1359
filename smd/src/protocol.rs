//! Wire format of the sector mailbox protocol
//!
//! Three sectors of the shared file are given fixed roles by
//! convention: sector 0 carries the request text (written by the
//! requester), sector 1 the response text (written by the responder),
//! and sector 2 a short status token that both sides poll. The status
//! token is the only synchronization signal - payload sectors are
//! trusted only after the status transition announcing them has been
//! observed.

use std::fmt;
use std::path::Path;

use mailbox::{MailboxError, SectorFile, SECTOR_SIZE};
use tracing::debug;

/// Sector carrying the request text (requester-owned)
pub const REQUEST_SECTOR: u32 = 0;

/// Sector carrying the response text (responder-owned)
pub const RESPONSE_SECTOR: u32 = 1;

/// Sector carrying the status token (write-shared, transition-owned)
pub const STATUS_SECTOR: u32 = 2;

/// Minimum number of sectors a mailbox file must span
pub const MIN_SECTORS: u32 = 3;

/// Status token held in the status sector
///
/// Exactly three tokens are legal on the wire. Anything else (empty
/// before first use, or garbage) is carried as `Unknown` and treated
/// as neither `RequestSent` nor `ResponseReady`.
///
/// Transition ownership: the requester writes `Idle -> RequestSent`
/// and `ResponseReady -> Idle`; the responder writes
/// `RequestSent -> ResponseReady`. No other writes are legal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Idle,
    RequestSent,
    ResponseReady,
    Unknown(String),
}

impl Status {
    /// Parse a wire token
    pub fn parse(token: &str) -> Self {
        match token {
            "idle" => Status::Idle,
            "request_sent" => Status::RequestSent,
            "response_ready" => Status::ResponseReady,
            other => Status::Unknown(other.to_string()),
        }
    }

    /// Wire form of the token
    ///
    /// `Unknown` has no wire form - only legal tokens are ever written.
    pub fn as_wire(&self) -> Option<&str> {
        match self {
            Status::Idle => Some("idle"),
            Status::RequestSent => Some("request_sent"),
            Status::ResponseReady => Some("response_ready"),
            Status::Unknown(_) => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Unknown(raw) if raw.is_empty() => write!(f, "(empty)"),
            Status::Unknown(raw) => write!(f, "unknown({raw})"),
            other => write!(f, "{}", other.as_wire().unwrap_or("?")),
        }
    }
}

/// Typed access to the three protocol sectors of a mailbox file
///
/// Both sides of the protocol are expressible through this type; the
/// responder daemon uses only its side (read request, write response,
/// read/write status), while the requester-side writers serve the
/// inspect command and the test harness.
#[derive(Debug, Clone)]
pub struct Channel {
    file: SectorFile,
}

impl Channel {
    /// Open a channel over an existing mailbox file (does not touch disk)
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file: SectorFile::new(path),
        }
    }

    /// Path of the backing mailbox file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read the request text (sector 0)
    pub fn read_request(&self) -> Result<String, MailboxError> {
        self.file.read_text(REQUEST_SECTOR)
    }

    /// Write the request text (sector 0, requester side)
    pub fn write_request(&self, text: &str) -> Result<(), MailboxError> {
        self.file.write_text(REQUEST_SECTOR, text)
    }

    /// Read the response text (sector 1)
    pub fn read_response(&self) -> Result<String, MailboxError> {
        self.file.read_text(RESPONSE_SECTOR)
    }

    /// Write the response text (sector 1, responder side)
    ///
    /// Must happen strictly before the matching `response_ready` status
    /// write - the requester only trusts this sector after observing
    /// that transition.
    pub fn write_response(&self, text: &str) -> Result<(), MailboxError> {
        self.file.write_text(RESPONSE_SECTOR, text)
    }

    /// Read the status token (sector 2)
    pub fn read_status(&self) -> Result<Status, MailboxError> {
        let token = self.file.read_text(STATUS_SECTOR)?;
        Ok(Status::parse(&token))
    }

    /// Write a status token (sector 2)
    pub fn write_status(&self, status: &Status) -> Result<(), MailboxError> {
        // Unknown never goes on the wire
        let Some(token) = status.as_wire() else {
            debug!(?status, "write_status: refusing to write non-wire token");
            return Ok(());
        };
        self.file.write_text(STATUS_SECTOR, token)
    }
}

/// Create or extend a zeroed mailbox file spanning `sectors` sectors
///
/// Provisioning is external to the protocol core: the daemon never
/// creates the file, only the `init` command does. An existing file
/// that is already large enough is left untouched.
pub fn provision<P: AsRef<Path>>(path: P, sectors: u32) -> Result<u64, MailboxError> {
    let sectors = sectors.max(MIN_SECTORS);
    let len = u64::from(sectors) * SECTOR_SIZE as u64;

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path.as_ref())?;

    let current = file.metadata()?.len();
    if current < len {
        file.set_len(len)?;
        file.sync_all()?;
        debug!(path = %path.as_ref().display(), from = current, to = len, "provision: extended mailbox file");
    } else {
        debug!(path = %path.as_ref().display(), len = current, "provision: file already large enough");
    }

    Ok(len.max(current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn channel() -> (TempDir, Channel) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mailbox.img");
        provision(&path, MIN_SECTORS).unwrap();
        (temp, Channel::new(path))
    }

    #[test]
    fn test_status_parse_legal_tokens() {
        assert_eq!(Status::parse("idle"), Status::Idle);
        assert_eq!(Status::parse("request_sent"), Status::RequestSent);
        assert_eq!(Status::parse("response_ready"), Status::ResponseReady);
    }

    #[test]
    fn test_status_parse_garbage_is_unknown() {
        assert_eq!(Status::parse(""), Status::Unknown(String::new()));
        assert_eq!(Status::parse("REQUEST_SENT"), Status::Unknown("REQUEST_SENT".to_string()));
    }

    #[test]
    fn test_status_wire_round_trip() {
        for status in [Status::Idle, Status::RequestSent, Status::ResponseReady] {
            let token = status.as_wire().unwrap();
            assert_eq!(Status::parse(token), status);
        }
        assert_eq!(Status::Unknown("x".to_string()).as_wire(), None);
    }

    #[test]
    fn test_channel_request_response_status() {
        let (_temp, chan) = channel();

        chan.write_request("hello").unwrap();
        chan.write_response("world").unwrap();
        chan.write_status(&Status::RequestSent).unwrap();

        assert_eq!(chan.read_request().unwrap(), "hello");
        assert_eq!(chan.read_response().unwrap(), "world");
        assert_eq!(chan.read_status().unwrap(), Status::RequestSent);
    }

    #[test]
    fn test_fresh_mailbox_status_is_unknown_empty() {
        let (_temp, chan) = channel();
        assert_eq!(chan.read_status().unwrap(), Status::Unknown(String::new()));
    }

    #[test]
    fn test_write_status_skips_unknown() {
        let (_temp, chan) = channel();

        chan.write_status(&Status::Idle).unwrap();
        chan.write_status(&Status::Unknown("garbage".to_string())).unwrap();

        // Unknown write is a no-op; the sector still holds idle
        assert_eq!(chan.read_status().unwrap(), Status::Idle);
    }

    #[test]
    fn test_provision_creates_minimum_size() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mailbox.img");

        let len = provision(&path, 0).unwrap();
        assert_eq!(len, u64::from(MIN_SECTORS) * SECTOR_SIZE as u64);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), len);
    }

    #[test]
    fn test_provision_leaves_larger_file_alone() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mailbox.img");
        std::fs::write(&path, vec![7u8; 10 * SECTOR_SIZE]).unwrap();

        let len = provision(&path, 3).unwrap();
        assert_eq!(len, 10 * SECTOR_SIZE as u64);

        // Contents untouched
        let data = std::fs::read(&path).unwrap();
        assert!(data.iter().all(|&b| b == 7));
    }
}
