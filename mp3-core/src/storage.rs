//! The narrow seam to the file storage backing the player.
//!
//! `read` returning `Ok(0)` means end-of-file and nothing else; every
//! failure is an `Err`. The reader task relies on this to tell a fully
//! drained file apart from a broken one.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// No file with the requested name exists.
    NotFound,
    /// The file exists but could not be opened.
    OpenFailed,
    /// A read or seek failed mid-stream.
    Io,
}

pub trait File {
    /// Read up to `buf.len()` bytes from the current position.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Move the read position to `offset` bytes from the file start.
    async fn seek(&mut self, offset: u32) -> Result<(), StorageError>;

    fn size(&self) -> u32;

    async fn close(self) -> Result<(), StorageError>;
}

pub trait Storage {
    /// Open files may borrow the backend, so the file type carries its
    /// lifetime (the SD card adapter's files hold on to the volume
    /// manager).
    type File<'a>: File
    where
        Self: 'a;

    async fn open(&mut self, name: &str) -> Result<Self::File<'_>, StorageError>;
}
