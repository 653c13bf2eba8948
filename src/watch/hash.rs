// src/watch/hash.rs

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use blake3::Hasher;
use tracing::debug;

use crate::errors::Result;

/// Compute the hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = File::open(path)
        .with_context(|| format!("opening file for hashing: {}", path.display()))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Compute a deterministic hash over the contents of the given files.
///
/// Order of `paths` does not matter; they are sorted first. Each file's
/// path takes part in the hash, so renaming a file changes it.
pub fn compute_hash_for_paths<I, P>(paths: I) -> Result<String>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut hasher = Hasher::new();

    let mut paths_vec: Vec<PathBuf> = paths
        .into_iter()
        .map(|p| p.as_ref().to_path_buf())
        .collect();
    paths_vec.sort();

    for path in paths_vec {
        if path.is_file() {
            let file_hash = compute_file_hash(&path)?;
            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update(file_hash.as_bytes());
        }
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(hash = %hash, "computed aggregate hash");
    Ok(hash)
}

/// Last seen aggregate hash per watch rule, for the lifetime of a session.
#[derive(Debug, Default)]
pub struct HashCache {
    map: HashMap<String, String>,
}

impl HashCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.map.get(label).map(String::as_str)
    }

    /// Record `hash` for `label`; returns `false` when it equals the stored
    /// one.
    pub fn update(&mut self, label: &str, hash: String) -> bool {
        match self.map.get(label) {
            Some(prev) if *prev == hash => false,
            _ => {
                self.map.insert(label.to_string(), hash);
                true
            }
        }
    }
}
