use std::fmt::{Debug, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use crate::FetchError;

/// Where the key pool comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Line-delimited file, one key per line.
    File(PathBuf),
    /// Keys supplied directly, one per entry.
    Inline(Vec<String>),
}

/// One API key. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

struct KeyPool {
    keys: Vec<Credential>,
    cursor: usize,
}

/// Round-robin API key issuer with lazy, one-time loading.
///
/// The pool is read from its source on the first [`KeyRotator::next_credential`]
/// call and held for the life of the rotator. A failed load leaves the rotator
/// empty, so the next call tries again.
pub struct KeyRotator {
    source: CredentialSource,
    pool: Mutex<Option<KeyPool>>,
}

impl KeyRotator {
    pub fn new(source: CredentialSource) -> Self {
        Self {
            source,
            pool: Mutex::new(None),
        }
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(CredentialSource::File(path.into()))
    }

    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(CredentialSource::Inline(
            keys.into_iter().map(Into::into).collect(),
        ))
    }

    /// Return the key at the cursor and advance it, wrapping after the last key.
    pub fn next_credential(&self) -> Result<Credential, FetchError> {
        let mut guard = self.pool.lock().unwrap_or_else(PoisonError::into_inner);

        if guard.is_none() {
            let keys = self.load()?;
            info!(keys = keys.len(), "api key pool loaded");
            *guard = Some(KeyPool { keys, cursor: 0 });
        }

        let Some(pool) = guard.as_mut() else {
            return Err(FetchError::configuration("api key pool is not loaded"));
        };
        let credential = pool.keys[pool.cursor].clone();
        debug!(slot = pool.cursor, "issuing api key");
        pool.cursor = (pool.cursor + 1) % pool.keys.len();
        Ok(credential)
    }

    /// Number of keys once loaded; `None` before the first successful load.
    pub fn loaded_len(&self) -> Option<usize> {
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|pool| pool.keys.len())
    }

    fn load(&self) -> Result<Vec<Credential>, FetchError> {
        let keys = match &self.source {
            CredentialSource::File(path) => {
                let contents = fs::read_to_string(path).map_err(|error| {
                    if error.kind() == ErrorKind::NotFound {
                        FetchError::configuration(format!(
                            "api key file not found at {}",
                            path.display()
                        ))
                    } else {
                        FetchError::configuration(format!(
                            "api key file {} could not be read: {error}",
                            path.display()
                        ))
                    }
                })?;
                collect_keys(contents.lines())
            }
            CredentialSource::Inline(lines) => collect_keys(lines.iter().map(String::as_str)),
        };

        if keys.is_empty() {
            return Err(FetchError::configuration(match &self.source {
                CredentialSource::File(path) => {
                    format!("api key file {} contains no keys", path.display())
                }
                CredentialSource::Inline(_) => String::from("no api keys were supplied"),
            }));
        }
        Ok(keys)
    }
}

impl Debug for KeyRotator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let source = match &self.source {
            CredentialSource::File(path) => format!("File({})", path.display()),
            CredentialSource::Inline(lines) => format!("Inline({} entries)", lines.len()),
        };
        f.debug_struct("KeyRotator")
            .field("source", &source)
            .field("loaded", &self.loaded_len())
            .finish()
    }
}

fn collect_keys<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<Credential> {
    lines
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| Credential(line.to_owned()))
        .collect()
}
