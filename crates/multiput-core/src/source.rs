//! Positioned, read-only access to the local source file

use bytes::{Bytes, BytesMut};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A local file opened once for concurrent positioned reads
///
/// Every read names its own absolute offset, so the handle can be shared by
/// all workers without a shared cursor. The descriptor is closed when the last
/// owner drops it.
#[derive(Debug)]
pub struct SourceFile {
    file: File,
    path: PathBuf,
}

impl SourceFile {
    /// Open `path` for reading
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        debug!("opened {}", path.display());

        Ok(Self { file, path })
    }

    /// Read up to `len` bytes starting at `offset`
    ///
    /// Keeps reading until `len` bytes are collected or the file ends, so a
    /// result shorter than `len` always means end of file. An offset at or past
    /// the end yields an empty buffer.
    pub fn read_at(&self, offset: u64, len: usize) -> io::Result<Bytes> {
        let mut buf = BytesMut::zeroed(len);
        let mut filled = 0;

        while filled < len {
            let n = match read_at(&self.file, &mut buf[filled..], offset + filled as u64) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if n == 0 {
                break;
            }
            filled += n;
        }

        buf.truncate(filled);
        Ok(buf.freeze())
    }
}

impl Drop for SourceFile {
    fn drop(&mut self) {
        debug!("closing {}", self.path.display());
    }
}

#[cfg(unix)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(windows)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}
