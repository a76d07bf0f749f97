//! Collaborator interface consumed from the underlying content engine
//!
//! A source (torrent engine, directory scanner, ...) exposes an ordered,
//! index-stable list of file-like entries plus readiness/error signals.
//! The signals travel on a `tokio::sync::watch` channel: a single-slot
//! state cell, so late subscribers observe the current state immediately
//! and recurring signals overwrite one another.

use std::fmt;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio::sync::watch;

use crate::range::ByteRange;

/// Boxed readable byte stream produced by an [`EntryReader`]
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// Range-bounded readable-stream factory for one entry
#[async_trait]
pub trait EntryReader: Send + Sync {
    /// Open a stream over the entry's bytes, bounded by `range` when present
    async fn open(&self, range: Option<ByteRange>) -> io::Result<ByteStream>;
}

/// One addressable content item exposed by a content source
///
/// Entries are immutable once listed; identity is positional (the index
/// into the source's ordered sequence).
#[derive(Clone)]
pub struct Entry {
    /// Display label, used for MIME lookup
    pub name: String,
    /// Human-readable path emitted in the playlist text
    pub path: String,
    /// Total byte size
    pub length: u64,
    /// Capability to open the entry's byte stream
    pub reader: Arc<dyn EntryReader>,
}

impl Entry {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        length: u64,
        reader: Arc<dyn EntryReader>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            length,
            reader,
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("length", &self.length)
            .finish()
    }
}

/// State signal published by a content source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SourceSignal {
    /// No signal yet; entries are not available
    #[default]
    Pending,
    /// Entries are finalized and readable
    Ready,
    /// The source failed; carries the error message
    Error(String),
}

/// An ordered, index-stable list of entries with readiness signalling
pub trait ContentSource: Send + Sync {
    /// Subscribe to readiness/error signals
    fn subscribe(&self) -> watch::Receiver<SourceSignal>;

    /// Current ordered entry sequence. Meaningful once [`SourceSignal::Ready`]
    /// has been observed; must not reorder for the lifetime of the source.
    fn entries(&self) -> Vec<Entry>;
}
