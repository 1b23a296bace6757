//! Common source-file fixtures for multiput testing

use crate::TestDir;
use anyhow::Result;
use rand::RngCore;
use std::path::PathBuf;

/// Deterministic bytes where every offset is recognisable: `offset % 251`
pub fn patterned_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Random bytes of the given length
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

/// Writes a patterned source file of `len` bytes and returns its path and contents
pub fn create_source_file(test_dir: &TestDir, name: &str, len: usize) -> Result<(PathBuf, Vec<u8>)> {
    let data = patterned_bytes(len);
    let path = test_dir.create_file(name, &data)?;
    Ok((path, data))
}

/// Writes a random source file of `len` bytes and returns its path and contents
pub fn create_random_source_file(
    test_dir: &TestDir,
    name: &str,
    len: usize,
) -> Result<(PathBuf, Vec<u8>)> {
    let data = random_bytes(len);
    let path = test_dir.create_file(name, &data)?;
    Ok((path, data))
}
