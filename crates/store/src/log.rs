use std::{
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::PathBuf,
};

use fd_lock::RwLock;

use crate::{
    entry::LogEntry,
    error::{Error, Result},
};

/// Append-only JSONL log of [`LogEntry`] values with file locking.
///
/// Entries are stored one JSON object per line in arrival order. Malformed
/// lines are skipped on read rather than failing the whole file.
pub struct LogStore {
    path: PathBuf,
    /// When set, the file is trimmed to this many most-recent entries after
    /// an append pushes it over the limit.
    max_entries: Option<usize>,
}

impl LogStore {
    pub fn new(path: PathBuf, max_entries: Option<usize>) -> Self {
        Self { path, max_entries }
    }

    /// Append one entry as a single line.
    pub async fn append(&self, entry: &LogEntry) -> Result<()> {
        let path = self.path.clone();
        let line = serde_json::to_string(entry)?;
        let max_entries = self.max_entries;

        tokio::task::spawn_blocking(move || -> Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            let mut lock = RwLock::new(file);
            let mut guard = lock
                .write()
                .map_err(|e| Error::Message(format!("lock failed: {e}")))?;
            writeln!(*guard, "{line}")?;
            drop(guard);

            if let Some(max) = max_entries {
                trim_blocking(&path, max)?;
            }
            Ok(())
        })
        .await??;

        Ok(())
    }

    /// Read every entry in append order.
    pub async fn read_all(&self) -> Result<Vec<LogEntry>> {
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<LogEntry>> {
            if !path.exists() {
                return Ok(vec![]);
            }
            let file = File::open(&path)?;
            let reader = BufReader::new(file);
            let mut entries = Vec::new();
            for line in reader.lines() {
                let line = line?;
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str(trimmed) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => {
                        tracing::warn!("skipping malformed log line: {e}");
                    },
                }
            }
            Ok(entries)
        })
        .await?
    }

    /// Read the last `n` entries in append order.
    pub async fn tail(&self, n: usize) -> Result<Vec<LogEntry>> {
        let mut all = self.read_all().await?;
        let start = all.len().saturating_sub(n);
        Ok(all.split_off(start))
    }

    /// Count entries without deserializing them.
    pub async fn count(&self) -> Result<usize> {
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> Result<usize> {
            if !path.exists() {
                return Ok(0);
            }
            let file = File::open(&path)?;
            let reader = BufReader::new(file);
            let count = reader
                .lines()
                .map_while(std::result::Result::ok)
                .filter(|l| !l.trim().is_empty())
                .count();
            Ok(count)
        })
        .await?
    }

    /// Delete the log file.
    pub async fn clear(&self) -> Result<()> {
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            if path.exists() {
                fs::remove_file(&path)?;
            }
            Ok(())
        })
        .await??;

        Ok(())
    }
}

/// Rewrite the file keeping only the last `max` lines.
fn trim_blocking(path: &std::path::Path, max: usize) -> Result<()> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let lines: Vec<String> = reader
        .lines()
        .map_while(std::result::Result::ok)
        .filter(|l| !l.trim().is_empty())
        .collect();
    if lines.len() <= max {
        return Ok(());
    }

    let keep = &lines[lines.len() - max..];
    let file = OpenOptions::new().write(true).truncate(true).open(path)?;
    let mut lock = RwLock::new(file);
    let mut guard = lock
        .write()
        .map_err(|e| Error::Message(format!("lock failed: {e}")))?;
    for line in keep {
        writeln!(*guard, "{line}")?;
    }
    Ok(())
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(max: Option<usize>) -> (LogStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::new(dir.path().join("logs.jsonl"), max);
        (store, dir)
    }

    fn entry(i: usize) -> LogEntry {
        LogEntry::new(format!("user{i}"), "general", format!("msg {i}"), "")
    }

    #[tokio::test]
    async fn append_preserves_order() {
        let (store, _dir) = temp_store(None);

        for i in 0..5 {
            store.append(&entry(i)).await.unwrap();
        }

        let all = store.read_all().await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].user, "user0");
        assert_eq!(all[4].user, "user4");
    }

    #[tokio::test]
    async fn read_missing_file_is_empty() {
        let (store, _dir) = temp_store(None);
        assert!(store.read_all().await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn tail_returns_most_recent() {
        let (store, _dir) = temp_store(None);

        for i in 0..10 {
            store.append(&entry(i)).await.unwrap();
        }

        let last3 = store.tail(3).await.unwrap();
        assert_eq!(last3.len(), 3);
        assert_eq!(last3[0].user, "user7");
        assert_eq!(last3[2].user, "user9");
    }

    #[tokio::test]
    async fn tail_larger_than_log() {
        let (store, _dir) = temp_store(None);
        store.append(&entry(0)).await.unwrap();

        let tail = store.tail(20).await.unwrap();
        assert_eq!(tail.len(), 1);
    }

    #[tokio::test]
    async fn trims_to_max_entries() {
        let (store, _dir) = temp_store(Some(4));

        for i in 0..7 {
            store.append(&entry(i)).await.unwrap();
        }

        let all = store.read_all().await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].user, "user3");
        assert_eq!(all[3].user, "user6");
    }

    #[tokio::test]
    async fn skips_malformed_lines() {
        let (store, dir) = temp_store(None);
        store.append(&entry(0)).await.unwrap();
        let path = dir.path().join("logs.jsonl");
        let mut raw = fs::read_to_string(&path).unwrap();
        raw.push_str("{not json\n");
        fs::write(&path, raw).unwrap();
        store.append(&entry(1)).await.unwrap();

        let all = store.read_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(store.count().await.unwrap(), 3); // count is line-based
    }

    #[tokio::test]
    async fn clear_removes_file() {
        let (store, _dir) = temp_store(None);
        store.append(&entry(0)).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.read_all().await.unwrap().is_empty());
    }
}
