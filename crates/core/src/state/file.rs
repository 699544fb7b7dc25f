//! File-backed state store.
//!
//! Each entry lives in `<directory>/<state-id>.json` and is replaced
//! atomically through a temporary file in the same directory. Resume leases
//! are stored beside it as `<state-id>.lease`, holding the lease deadline.
//! Every operation that reads or changes a lease runs under an exclusive
//! lock on `<directory>/.lock`, so separate processes serving the same
//! directory see each other's leases.

use super::error::{StateError, StateResult};
use super::store::{StateEntry, StateStore};
use ac_protocol::{AuthContext, ChainId, StateId};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use fs2::FileExt;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const LOCK_FILE: &str = ".lock";

/// [`StateStore`] persisting one JSON file per entry.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    directory: PathBuf,
    lease_ttl: Duration,
}

impl FileStateStore {
    /// Open a store rooted at `directory`, creating it if needed.
    pub fn open(directory: impl Into<PathBuf>, lease_ttl: Duration) -> StateResult<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory).map_err(|source| StateError::Io {
            path: directory.clone(),
            source,
        })?;
        Ok(Self {
            directory,
            lease_ttl,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Run `op` on a blocking thread while holding the directory lock.
    async fn locked<T, F>(&self, op: F) -> StateResult<T>
    where
        F: FnOnce(&Path) -> StateResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let directory = self.directory.clone();
        tokio::task::spawn_blocking(move || {
            let lock_path = directory.join(LOCK_FILE);
            let lock_file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&lock_path)
                .map_err(|source| StateError::Io {
                    path: lock_path.clone(),
                    source,
                })?;
            FileExt::lock_exclusive(&lock_file).map_err(|source| StateError::Io {
                path: lock_path.clone(),
                source,
            })?;
            let result = op(&directory);
            drop(lock_file);
            result
        })
        .await
        .map_err(|e| StateError::Io {
            path: self.directory.clone(),
            source: std::io::Error::new(ErrorKind::Other, e),
        })?
    }
}

fn entry_path(directory: &Path, id: &StateId) -> PathBuf {
    directory.join(format!("{id}.json"))
}

fn lease_path(directory: &Path, id: &StateId) -> PathBuf {
    directory.join(format!("{id}.lease"))
}

fn remove_if_present(path: &Path) -> StateResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StateError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn read_entry(directory: &Path, id: &StateId) -> StateResult<Option<StateEntry>> {
    let path = entry_path(directory, id);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(StateError::Io { path, source }),
    };
    let entry = serde_json::from_str(&content).map_err(|source| StateError::Serialization {
        id: id.clone(),
        source,
    })?;
    Ok(Some(entry))
}

/// Read the live entry for `id`, removing the files if it has expired.
fn live_entry(directory: &Path, id: &StateId) -> StateResult<StateEntry> {
    match read_entry(directory, id)? {
        Some(entry) if !entry.is_expired() => Ok(entry),
        Some(_) => {
            remove_if_present(&entry_path(directory, id))?;
            remove_if_present(&lease_path(directory, id))?;
            Err(StateError::NotFound(id.clone()))
        }
        None => Err(StateError::NotFound(id.clone())),
    }
}

fn write_atomic(directory: &Path, target: &Path, bytes: &[u8]) -> StateResult<()> {
    let written = (|| -> std::io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(directory)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(target).map_err(|e| e.error)?;
        Ok(())
    })();
    written.map_err(|source| StateError::Io {
        path: target.to_path_buf(),
        source,
    })
}

/// Deadline of the lease on `id`, if one was written.
fn read_lease(directory: &Path, id: &StateId) -> StateResult<Option<DateTime<Utc>>> {
    let path = lease_path(directory, id);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(StateError::Io { path, source }),
    };
    match DateTime::parse_from_rfc3339(content.trim()) {
        Ok(deadline) => Ok(Some(deadline.with_timezone(&Utc))),
        Err(e) => {
            tracing::warn!(state_id = %id, error = %e, "Ignoring unreadable resume lease");
            Ok(None)
        }
    }
}

fn acquire_lease(directory: &Path, id: &StateId, ttl: Duration) -> StateResult<()> {
    let now = Utc::now();
    if let Some(deadline) = read_lease(directory, id)? {
        if deadline > now {
            return Err(StateError::ConcurrentResumption(id.clone()));
        }
        tracing::warn!(state_id = %id, "Taking over expired resume lease");
    }
    let deadline = TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    write_atomic(directory, &lease_path(directory, id), deadline.to_rfc3339().as_bytes())
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn save(&self, context: &AuthContext, ttl: Duration) -> StateResult<()> {
        let entry = StateEntry::new(context, ttl)?;
        let json = serde_json::to_vec_pretty(&entry).map_err(|source| StateError::Serialization {
            id: entry.identifier.clone(),
            source,
        })?;
        self.locked(move |dir| {
            write_atomic(dir, &entry_path(dir, &entry.identifier), &json)?;
            remove_if_present(&lease_path(dir, &entry.identifier))
        })
        .await
    }

    async fn load(&self, id: &StateId, expected: &ChainId) -> StateResult<AuthContext> {
        let (id, expected, ttl) = (id.clone(), expected.clone(), self.lease_ttl);
        self.locked(move |dir| {
            let entry = live_entry(dir, &id)?;
            entry.check_chain(&expected)?;
            let context = entry.decode()?;
            acquire_lease(dir, &id, ttl)?;
            Ok(context)
        })
        .await
    }

    async fn peek(&self, id: &StateId, expected: &ChainId) -> StateResult<AuthContext> {
        let (id, expected) = (id.clone(), expected.clone());
        self.locked(move |dir| {
            let entry = live_entry(dir, &id)?;
            entry.check_chain(&expected)?;
            entry.decode()
        })
        .await
    }

    async fn release(&self, id: &StateId) -> StateResult<()> {
        let id = id.clone();
        self.locked(move |dir| remove_if_present(&lease_path(dir, &id)))
            .await
    }

    async fn delete(&self, id: &StateId) -> StateResult<()> {
        let id = id.clone();
        self.locked(move |dir| {
            remove_if_present(&entry_path(dir, &id))?;
            remove_if_present(&lease_path(dir, &id))
        })
        .await
    }

    async fn purge_expired(&self) -> StateResult<usize> {
        self.locked(|dir| {
            let listing = std::fs::read_dir(dir).map_err(|source| StateError::Io {
                path: dir.to_path_buf(),
                source,
            })?;

            let mut removed = 0;
            for file in listing {
                let file = file.map_err(|source| StateError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?;
                let path = file.path();
                let extension = path.extension().and_then(|e| e.to_str());
                let Some(id) = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| stem.parse::<StateId>().ok())
                else {
                    continue;
                };

                match extension {
                    Some("json") => match read_entry(dir, &id) {
                        Ok(Some(entry)) if entry.is_expired() => {
                            remove_if_present(&path)?;
                            remove_if_present(&lease_path(dir, &id))?;
                            removed += 1;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(
                                state_id = %id,
                                error = %e,
                                "Skipping unreadable state entry"
                            );
                        }
                    },
                    // Leases outliving their entry are dropped.
                    Some("lease") if !entry_path(dir, &id).exists() => remove_if_present(&path)?,
                    _ => {}
                }
            }
            Ok(removed)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn chain() -> ChainId {
        "idp-sso".parse().unwrap()
    }

    #[tokio::test]
    async fn test_save_writes_one_file_per_entry() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::open(dir.path(), Duration::from_secs(30)).unwrap();
        let ctx = AuthContext::new(chain());
        store.save(&ctx, Duration::from_secs(60)).await.unwrap();

        let path = dir.path().join(format!("{}.json", ctx.identifier));
        assert!(path.exists());
        let loaded = store.load(&ctx.identifier, &chain()).await.unwrap();
        assert_eq!(loaded, ctx);
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempdir().unwrap();
        let ctx = AuthContext::new(chain());
        {
            let store = FileStateStore::open(dir.path(), Duration::from_secs(30)).unwrap();
            store.save(&ctx, Duration::from_secs(60)).await.unwrap();
        }
        let store = FileStateStore::open(dir.path(), Duration::from_secs(30)).unwrap();
        assert_eq!(store.peek(&ctx.identifier, &chain()).await.unwrap(), ctx);
    }

    #[tokio::test]
    async fn test_expired_file_is_removed_on_read() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::open(dir.path(), Duration::from_secs(30)).unwrap();
        let ctx = AuthContext::new(chain());
        store.save(&ctx, Duration::ZERO).await.unwrap();

        assert!(matches!(
            store.load(&ctx.identifier, &chain()).await,
            Err(StateError::NotFound(_))
        ));
        assert!(!dir.path().join(format!("{}.json", ctx.identifier)).exists());
    }

    #[tokio::test]
    async fn test_purge_skips_foreign_files() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::open(dir.path(), Duration::from_secs(30)).unwrap();
        std::fs::write(dir.path().join("README.txt"), "not state").unwrap();
        let dead = AuthContext::new(chain());
        let live = AuthContext::new(chain());
        store.save(&dead, Duration::ZERO).await.unwrap();
        store.save(&live, Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(dir.path().join("README.txt").exists());
        assert!(store.peek(&live.identifier, &chain()).await.is_ok());
    }

    #[tokio::test]
    async fn test_garbage_file_is_a_serialization_error() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::open(dir.path(), Duration::from_secs(30)).unwrap();
        let id = StateId::generate();
        std::fs::write(dir.path().join(format!("{id}.json")), "{ nope").unwrap();
        assert!(matches!(
            store.peek(&id, &chain()).await,
            Err(StateError::Serialization { .. })
        ));
    }

    #[tokio::test]
    async fn test_lease_is_shared_between_store_instances() {
        let dir = tempdir().unwrap();
        let first = FileStateStore::open(dir.path(), Duration::from_secs(30)).unwrap();
        let second = FileStateStore::open(dir.path(), Duration::from_secs(30)).unwrap();
        let ctx = AuthContext::new(chain());
        first.save(&ctx, Duration::from_secs(60)).await.unwrap();

        first.load(&ctx.identifier, &chain()).await.unwrap();
        assert!(dir.path().join(format!("{}.lease", ctx.identifier)).exists());
        assert!(matches!(
            second.load(&ctx.identifier, &chain()).await,
            Err(StateError::ConcurrentResumption(_))
        ));

        first.release(&ctx.identifier).await.unwrap();
        assert!(second.load(&ctx.identifier, &chain()).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_lease_file_is_taken_over() {
        let dir = tempdir().unwrap();
        let first = FileStateStore::open(dir.path(), Duration::ZERO).unwrap();
        let second = FileStateStore::open(dir.path(), Duration::from_secs(30)).unwrap();
        let ctx = AuthContext::new(chain());
        first.save(&ctx, Duration::from_secs(60)).await.unwrap();

        first.load(&ctx.identifier, &chain()).await.unwrap();
        assert!(second.load(&ctx.identifier, &chain()).await.is_ok());
        assert!(matches!(
            first.load(&ctx.identifier, &chain()).await,
            Err(StateError::ConcurrentResumption(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_and_purge_drop_lease_files() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::open(dir.path(), Duration::from_secs(30)).unwrap();
        let ctx = AuthContext::new(chain());
        store.save(&ctx, Duration::from_secs(60)).await.unwrap();
        store.load(&ctx.identifier, &chain()).await.unwrap();
        store.delete(&ctx.identifier).await.unwrap();
        assert!(!dir.path().join(format!("{}.lease", ctx.identifier)).exists());

        let orphan = StateId::generate();
        std::fs::write(dir.path().join(format!("{orphan}.lease")), "2000-01-01T00:00:00Z").unwrap();
        assert_eq!(store.purge_expired().await.unwrap(), 0);
        assert!(!dir.path().join(format!("{orphan}.lease")).exists());
    }
}
