//! Mailbox - fixed-size sector I/O over a shared flat file
//!
//! Two processes that share nothing but a flat file can still exchange
//! messages if both treat the file as a block device: a sequence of
//! fixed 512-byte sectors, each read and written as an exact unit.
//! This crate is that storage layer and nothing more - sectors carry
//! no types; interpretation belongs to the caller.
//!
//! # Layout
//!
//! ```text
//! mailbox.img
//! ├── sector 0  [    0,  512)
//! ├── sector 1  [  512, 1024)
//! ├── sector 2  [ 1024, 1536)
//! └── ...
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mailbox::SectorFile;
//!
//! let file = SectorFile::new("mailbox.img");
//! file.write_text(0, "hello")?;
//! assert_eq!(file.read_text(0)?, "hello");
//! ```

mod error;
mod sector;

pub use error::MailboxError;
pub use sector::SectorFile;

/// Size of one sector in bytes
pub const SECTOR_SIZE: usize = 512;
