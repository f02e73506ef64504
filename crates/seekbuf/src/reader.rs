#![forbid(unsafe_code)]

//! `Read + Seek` over a shared [`BufferedSource`].

use std::{
    io::{self, Read, Seek, SeekFrom},
    sync::Arc,
};

use seekbuf_core::CacheError;

use crate::buffered::BufferedSource;

/// Cursor over a [`BufferedSource`].
///
/// Several readers may share one source; each keeps its own position.
/// Reading past the end yields `Ok(0)` like a file does.
#[derive(Debug)]
pub struct SourceReader {
    source: Arc<BufferedSource>,
    pos: u64,
}

impl SourceReader {
    pub fn new(source: Arc<BufferedSource>) -> Self {
        Self { source, pos: 0 }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn source(&self) -> &Arc<BufferedSource> {
        &self.source
    }

    pub fn into_inner(self) -> Arc<BufferedSource> {
        self.source
    }
}

fn to_io(err: CacheError) -> io::Error {
    match err {
        CacheError::Io(inner) => io::Error::new(inner.kind(), CacheError::Io(inner)),
        CacheError::UnexpectedEof { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
        CacheError::InvalidConfig(_) => io::Error::new(io::ErrorKind::InvalidInput, err),
        CacheError::Closed | CacheError::Abandoned { .. } => {
            io::Error::new(io::ErrorKind::BrokenPipe, err)
        }
        CacheError::PastEnd { .. } | CacheError::Spawn(_) => io::Error::other(err),
    }
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = match self.source.read_at(self.pos, buf) {
            Ok(n) => n,
            Err(CacheError::PastEnd { .. }) => 0,
            Err(e) => return Err(to_io(e)),
        };
        self.pos = self.pos.saturating_add(n as u64);
        Ok(n)
    }
}

impl Seek for SourceReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos: i128 = match pos {
            SeekFrom::Start(p) => i128::from(p),
            SeekFrom::Current(delta) => i128::from(self.pos) + i128::from(delta),
            SeekFrom::End(delta) => {
                let len = self.source.size().map_err(to_io)?;
                i128::from(len) + i128::from(delta)
            }
        };

        let new_pos = u64::try_from(new_pos).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "negative seek position")
        })?;
        self.pos = new_pos;
        Ok(new_pos)
    }
}
