//! Filesystem-backed content source
//!
//! Serves a directory tree as an ordered entry list: every regular file
//! becomes one entry, addressed by its slash-separated path relative to
//! the root. Scanning is explicit: call [`DirSource::scan`] (or
//! [`DirSource::spawn_scan`]) after construction; it publishes the entry
//! list and signals readiness, or signals an error on a filesystem
//! failure.

use std::collections::HashSet;
use std::io::{self, SeekFrom};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::watch;

use streamer::{ByteRange, ByteStream, ContentSource, Entry, EntryReader, SourceSignal};

/// [`ContentSource`] over a directory tree
pub struct DirSource {
    root: PathBuf,
    signals: watch::Sender<SourceSignal>,
    entries: RwLock<Vec<Entry>>,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let (signals, _) = watch::channel(SourceSignal::Pending);
        Self {
            root: root.into(),
            signals,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Walk the root, publish the entry list, and signal readiness.
    ///
    /// May be called again to pick up new files. Entry indices are
    /// positional and already issued in playlist URLs, so a rescan keeps
    /// known entries at their index and appends newly discovered files.
    pub async fn scan(&self) -> io::Result<()> {
        match self.walk().await {
            Ok(files) => {
                self.publish(files);
                self.signals.send_replace(SourceSignal::Ready);
                Ok(())
            }
            Err(err) => {
                tracing::warn!("scan of {} failed: {}", self.root.display(), err);
                self.signals
                    .send_replace(SourceSignal::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Run [`DirSource::scan`] on a background task
    pub fn spawn_scan(self: &Arc<Self>) {
        let source = self.clone();
        tokio::spawn(async move {
            let _ = source.scan().await;
        });
    }

    async fn walk(&self) -> io::Result<Vec<(String, u64)>> {
        let mut files = Vec::new();
        let mut dirs = vec![self.root.clone()];

        while let Some(dir) = dirs.pop() {
            let mut reader = fs::read_dir(&dir).await?;
            while let Some(dirent) = reader.next_entry().await? {
                let metadata = dirent.metadata().await?;
                let path = dirent.path();
                if metadata.is_dir() {
                    dirs.push(path);
                } else if metadata.is_file() {
                    files.push((self.relative(&path), metadata.len()));
                }
            }
        }

        // Directory read order is platform-dependent; sort for a
        // deterministic entry sequence.
        files.sort();
        Ok(files)
    }

    fn relative(&self, path: &std::path::Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn publish(&self, files: Vec<(String, u64)>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let known: HashSet<String> = entries.iter().map(|entry| entry.path.clone()).collect();

        for (rel, length) in files {
            if known.contains(&rel) {
                continue;
            }
            let name = rel.rsplit('/').next().unwrap_or(&rel).to_string();
            let reader = Arc::new(FileReader {
                path: self.root.join(&rel),
            });
            entries.push(Entry::new(name, rel, length, reader));
        }

        tracing::debug!(
            "published {} entries from {}",
            entries.len(),
            self.root.display()
        );
    }
}

impl ContentSource for DirSource {
    fn subscribe(&self) -> watch::Receiver<SourceSignal> {
        self.signals.subscribe()
    }

    fn entries(&self) -> Vec<Entry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

struct FileReader {
    path: PathBuf,
}

#[async_trait]
impl EntryReader for FileReader {
    async fn open(&self, range: Option<ByteRange>) -> io::Result<ByteStream> {
        let mut file = File::open(&self.path).await?;
        match range {
            Some(range) => {
                file.seek(SeekFrom::Start(range.start)).await?;
                Ok(Box::new(file.take(range.byte_len())))
            }
            None => Ok(Box::new(file)),
        }
    }
}
