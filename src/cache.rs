//! Response cache for data endpoints.
//!
//! [`FileCache`] keeps one gzip file per day and query under
//! `<dir>/<name>/<endpoint>/<method>/<params-hash>/<YYYYMMDD>.txt.gz`.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::util::Params;

const EXTENSION: &str = ".txt.gz";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub name: String,
    pub endpoint: String,
    pub method: String,
    pub params_hash: String,
}

impl CacheKey {
    /// `params` must not contain credentials.
    pub fn new(name: &str, endpoint: &str, method: &str, params: &Params) -> Self {
        let mut hasher = crc32fast::Hasher::new();
        for (k, v) in params {
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
            hasher.update(b"&");
        }
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            params_hash: format!("{:08x}", hasher.finalize()),
        }
    }
}

pub trait Cache {
    fn has(&self, key: &CacheKey) -> bool;
    fn get(&self, key: &CacheKey) -> io::Result<String>;
    fn put(&self, key: &CacheKey, text: &str) -> io::Result<()>;
}

/// Caches nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl Cache for NoCache {
    fn has(&self, _key: &CacheKey) -> bool {
        false
    }

    fn get(&self, key: &CacheKey) -> io::Result<String> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not cached", key.name),
        ))
    }

    fn put(&self, _key: &CacheKey, _text: &str) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_dir(&self, key: &CacheKey) -> PathBuf {
        self.dir
            .join(sanitize(&key.name))
            .join(sanitize(&key.endpoint))
            .join(sanitize(&key.method))
            .join(&key.params_hash)
    }

    /// Cached versions of `key`, oldest first.
    fn versions(&self, key: &CacheKey) -> io::Result<Vec<PathBuf>> {
        let mut versions: Vec<(u32, PathBuf)> = fs::read_dir(self.key_dir(key))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter_map(|path| {
                let stamp = path
                    .file_name()?
                    .to_str()?
                    .strip_suffix(EXTENSION)?
                    .parse::<u32>()
                    .ok()?;
                Some((stamp, path))
            })
            .collect();
        versions.sort();
        Ok(versions.into_iter().map(|(_, p)| p).collect())
    }

    /// Removes one dataset, or everything below the cache directory.
    pub fn clear(&self, name: Option<&str>) -> io::Result<()> {
        let targets: Vec<PathBuf> = match name {
            Some(name) => vec![self.dir.join(sanitize(name))],
            None if self.dir.exists() => fs::read_dir(&self.dir)?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .collect(),
            None => Vec::new(),
        };

        for path in &targets {
            let result = if path.is_dir() {
                fs::remove_dir_all(path)
            } else if path.exists() {
                fs::remove_file(path)
            } else {
                Ok(())
            };
            if let Err(e) = result {
                tracing::warn!("failed to delete {}: {}", path.display(), e);
            }
        }
        tracing::info!("removed {} cache path(s)", targets.len());
        Ok(())
    }
}

impl Cache for FileCache {
    fn has(&self, key: &CacheKey) -> bool {
        self.versions(key).map(|v| !v.is_empty()).unwrap_or(false)
    }

    fn get(&self, key: &CacheKey) -> io::Result<String> {
        let latest = self.versions(key)?.pop().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not cached", key.name),
            )
        })?;

        let mut text = String::new();
        GzDecoder::new(fs::File::open(&latest)?).read_to_string(&mut text)?;
        tracing::debug!("read {} from cache", latest.display());
        Ok(text)
    }

    fn put(&self, key: &CacheKey, text: &str) -> io::Result<()> {
        let dir = self.key_dir(key);
        fs::create_dir_all(&dir)?;

        let stamp = chrono::Local::now().format("%Y%m%d");
        let path = dir.join(format!("{}{}", stamp, EXTENSION));

        let mut encoder = GzEncoder::new(fs::File::create(&path)?, Compression::best());
        encoder.write_all(text.as_bytes())?;
        encoder.finish()?.flush()?;

        tracing::info!("data was cached under {}", path.display());
        Ok(())
    }
}

fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
