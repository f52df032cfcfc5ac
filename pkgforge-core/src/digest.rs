//! Streaming checksum helpers backed by a shared scratch-buffer pool.

use crate::error::PackagingError;
use crate::Result;

use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Mutex;

/// Size of the pooled scratch buffers used on the copy and hashing hot paths.
pub const BUF_SIZE: usize = 32 * 1024;

const POOL_LIMIT: usize = 8;

lazy_static! {
    static ref BUFFER_POOL: Mutex<Vec<Vec<u8>>> = Mutex::new(Vec::new());
}

/// A scratch buffer borrowed from the shared pool. Returned to the pool on
/// drop, on every exit path.
pub struct PooledBuffer(Option<Vec<u8>>);

impl PooledBuffer {
    pub fn acquire() -> Self {
        let buf = BUFFER_POOL
            .lock()
            .ok()
            .and_then(|mut pool| pool.pop())
            .unwrap_or_else(|| vec![0u8; BUF_SIZE]);
        Self(Some(buf))
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.0.as_deref().unwrap_or(&[])
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.0.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.0.take() {
            if let Ok(mut pool) = BUFFER_POOL.lock() {
                if pool.len() < POOL_LIMIT {
                    pool.push(buf);
                }
            }
        }
    }
}

/// Hex-encoded SHA-256 of the file at `path`, streamed.
pub fn sha256_file(path: &Path) -> Result<String> {
    hash_file::<Sha256>(path)
}

/// Hex-encoded SHA-1 of the file at `path`, streamed.
pub fn sha1_file(path: &Path) -> Result<String> {
    hash_file::<Sha1>(path)
}

/// Hex-encoded SHA-256 of an in-memory byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hash_file<D: Digest>(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).map_err(|e| PackagingError::fs("opening for checksum", path, e))?;
    let mut hasher = D::new();
    let mut buf = PooledBuffer::acquire();
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| PackagingError::fs("reading for checksum", path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Copies `reader` into `writer` through a pooled buffer, returning the number
/// of bytes moved.
pub fn copy<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> std::io::Result<u64> {
    let mut buf = PooledBuffer::acquire();
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(total);
        }
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
}
