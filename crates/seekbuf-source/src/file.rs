#![forbid(unsafe_code)]

//! Creators backed by local files.
//!
//! Mostly useful for tests and tools: a local file is already randomly
//! addressable, but routing it through the cache exercises the same paths a
//! slow transport would.

use std::{
    fs::{self, File},
    io::{self, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use crate::creator::{ReadOutcome, SeekableCreator, StreamCreator};

/// Forward-only reads of a local file; every open starts at byte 0.
#[derive(Clone, Debug)]
pub struct FileStreamCreator {
    path: PathBuf,
    chunk_size: Option<usize>,
}

impl FileStreamCreator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            chunk_size: None,
        }
    }

    /// Advertise a preferred transfer size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StreamCreator for FileStreamCreator {
    type Stream = File;

    fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }

    fn length(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    fn type_name(&self) -> &str {
        "file"
    }

    fn preferred_chunk_size(&self) -> Option<usize> {
        self.chunk_size
    }
}

/// Seekable reads of a local file through one shared [`File`].
#[derive(Clone, Debug)]
pub struct FileSeekableCreator {
    path: PathBuf,
    chunk_size: Option<usize>,
}

impl FileSeekableCreator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            chunk_size: None,
        }
    }

    /// Advertise a preferred transfer size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SeekableCreator for FileSeekableCreator {
    type Handle = File;

    fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }

    fn length(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    fn seek(&self, handle: &mut File, position: u64) -> io::Result<()> {
        handle.seek(SeekFrom::Start(position)).map(|_| ())
    }

    fn read(&self, handle: &mut File, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        ReadOutcome::from_read(handle.read(buf))
    }

    fn type_name(&self) -> &str {
        "file-seekable"
    }

    fn preferred_chunk_size(&self) -> Option<usize> {
        self.chunk_size
    }
}
