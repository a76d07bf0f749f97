//! Stream providers translate a content source into HTTP-servable artifacts
//!
//! A provider watches its source's signal channel from a background task:
//! on `Ready` it captures the (optionally filtered) entry sequence and on
//! `Error` it records the failure. Signals may recur; each transition
//! overwrites the previous state, so a later `Ready` clears an earlier
//! error. Request handlers only ever take short read locks on that state.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::playlist;
use crate::range::{self, ByteRange};
use crate::source::{ByteStream, ContentSource, Entry, SourceSignal};
use crate::Error;

/// Content type served when MIME lookup has no answer for an entry name
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Result of resolving one segment request
pub struct SegmentContent {
    /// Entry bytes, bounded by `range` when present
    pub stream: ByteStream,
    /// Total length of the entry (not of the range)
    pub length: u64,
    pub content_type: String,
    /// Present only when the request carried a satisfiable `Range` header
    pub range: Option<ByteRange>,
}

/// Capability set consumed by the HTTP dispatcher
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Report current provider state: an errored source fails, otherwise
    /// `Ok(ready)`. Non-blocking; never triggers fetching.
    fn exists(&self) -> Result<bool, Error>;

    /// Render the playlist for the current entry sequence with URLs rooted
    /// at `http://<host>`. The playlist is empty before readiness.
    fn manifest(&self, host: &str) -> Result<String, Error>;

    /// Resolve one segment request: entry index from the request path,
    /// `Range` header against the entry length, MIME type, bounded stream.
    async fn segment(
        &self,
        path: &str,
        range_header: Option<&str>,
    ) -> Result<SegmentContent, Error>;
}

/// Predicate applied to source entries when readiness is captured
pub type EntryFilter = Arc<dyn Fn(&Entry) -> bool + Send + Sync>;

/// Pluggable entry-name-to-MIME-type lookup
pub type MimeLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Default)]
struct ProviderState {
    ready: bool,
    error: Option<String>,
    entries: Vec<Entry>,
}

/// [`StreamProvider`] over any [`ContentSource`]
///
/// One parameterized implementation covers both the unfiltered and the
/// filtered variants; the unfiltered default predicate accepts everything.
pub struct SourceProvider {
    state: Arc<RwLock<ProviderState>>,
    mime: MimeLookup,
}

impl SourceProvider {
    /// Unfiltered provider over `source`. Must be called within a tokio
    /// runtime: the provider spawns a task watching the source's signals.
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self::builder().build(source)
    }

    pub fn builder() -> SourceProviderBuilder {
        SourceProviderBuilder::default()
    }
}

/// Configures and builds a [`SourceProvider`]
pub struct SourceProviderBuilder {
    filter: EntryFilter,
    mime: MimeLookup,
}

impl Default for SourceProviderBuilder {
    fn default() -> Self {
        Self {
            filter: Arc::new(|_| true),
            mime: Arc::new(|name| mime_guess::from_path(name).first().map(|m| m.to_string())),
        }
    }
}

impl SourceProviderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain only entries matching `filter`, applied once per readiness
    /// signal. Filtering changes segment indices: the playlist and the
    /// `entry:<index>` URLs address the retained sub-sequence.
    pub fn with_filter(mut self, filter: impl Fn(&Entry) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Replace the default `mime_guess`-backed MIME lookup
    pub fn with_mime_lookup(
        mut self,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.mime = Arc::new(lookup);
        self
    }

    /// Build the provider and spawn its signal watcher task.
    ///
    /// Must be called within a tokio runtime.
    pub fn build(self, source: Arc<dyn ContentSource>) -> SourceProvider {
        let state = Arc::new(RwLock::new(ProviderState::default()));

        let watcher_state = state.clone();
        let filter = self.filter;
        let mut signals = source.subscribe();

        tokio::spawn(async move {
            loop {
                let signal = signals.borrow_and_update().clone();
                apply_signal(&watcher_state, source.as_ref(), &filter, signal);

                // Ends when the source (and its sender) is dropped.
                if signals.changed().await.is_err() {
                    break;
                }
            }
        });

        SourceProvider {
            state,
            mime: self.mime,
        }
    }
}

fn apply_signal(
    state: &RwLock<ProviderState>,
    source: &dyn ContentSource,
    filter: &EntryFilter,
    signal: SourceSignal,
) {
    match signal {
        SourceSignal::Pending => {}
        SourceSignal::Ready => {
            let entries: Vec<Entry> = source
                .entries()
                .into_iter()
                .filter(|entry| filter(entry))
                .collect();

            tracing::info!("content source ready with {} entries", entries.len());

            let mut state = state.write().unwrap_or_else(|e| e.into_inner());
            state.entries = entries;
            state.ready = true;
            state.error = None;
        }
        SourceSignal::Error(message) => {
            tracing::warn!("content source error: {}", message);

            let mut state = state.write().unwrap_or_else(|e| e.into_inner());
            state.error = Some(message);
            state.ready = false;
        }
    }
}

#[async_trait]
impl StreamProvider for SourceProvider {
    fn exists(&self) -> Result<bool, Error> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        match &state.error {
            Some(message) => Err(Error::SourceUnavailable(message.clone())),
            None => Ok(state.ready),
        }
    }

    fn manifest(&self, host: &str) -> Result<String, Error> {
        let entries = {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            state.entries.clone()
        };

        Ok(playlist::render(&entries, &format!("http://{}", host)))
    }

    async fn segment(
        &self,
        path: &str,
        range_header: Option<&str>,
    ) -> Result<SegmentContent, Error> {
        let index = playlist::parse_entry_index(path)?;

        // Clone the entry out so no lock is held across the open await.
        let entry = {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            state.entries.get(index).cloned()
        }
        .ok_or(Error::NotFound(index))?;

        // An unsatisfiable Range header degrades to serving the full body.
        let range = match range::resolve(entry.length, range_header) {
            Ok(range) => range,
            Err(err) => {
                tracing::debug!("ignoring range header for {}: {}", entry.name, err);
                None
            }
        };

        let stream = entry.reader.open(range).await?;
        let content_type =
            (self.mime)(&entry.name).unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

        Ok(SegmentContent {
            stream,
            length: entry.length,
            content_type,
            range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::entry_with_bytes;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::sync::watch;

    struct StubSource {
        signals: watch::Sender<SourceSignal>,
        entries: Mutex<Vec<Entry>>,
    }

    impl StubSource {
        fn new(entries: Vec<Entry>) -> Arc<Self> {
            let (signals, _) = watch::channel(SourceSignal::Pending);
            Arc::new(Self {
                signals,
                entries: Mutex::new(entries),
            })
        }

        fn signal(&self, signal: SourceSignal) {
            self.signals.send_replace(signal);
        }
    }

    impl ContentSource for StubSource {
        fn subscribe(&self) -> watch::Receiver<SourceSignal> {
            self.signals.subscribe()
        }

        fn entries(&self) -> Vec<Entry> {
            self.entries.lock().unwrap().clone()
        }
    }

    fn media_entries() -> Vec<Entry> {
        vec![
            entry_with_bytes("a.mp4", "a.mp4", vec![1; 1000]),
            entry_with_bytes("b.mp4", "b.mp4", (0..2000).map(|i| (i % 256) as u8).collect()),
        ]
    }

    /// Wait until the watcher task has applied enough signals for `check`
    /// to hold.
    async fn wait_for(provider: &SourceProvider, check: impl Fn(&SourceProvider) -> bool) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while !check(provider) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("provider never reached expected state");
    }

    async fn ready_provider(entries: Vec<Entry>) -> (Arc<StubSource>, SourceProvider) {
        let source = StubSource::new(entries);
        let provider = SourceProvider::new(source.clone());
        source.signal(SourceSignal::Ready);
        wait_for(&provider, |p| matches!(p.exists(), Ok(true))).await;
        (source, provider)
    }

    #[tokio::test]
    async fn test_not_ready_before_signal() {
        let source = StubSource::new(media_entries());
        let provider = SourceProvider::new(source.clone());

        assert!(matches!(provider.exists(), Ok(false)));
        assert_eq!(provider.manifest("host").unwrap(), "#EXTM3U\n");
        assert!(matches!(
            provider.segment("/entry:0", None).await,
            Err(Error::NotFound(0))
        ));
    }

    #[tokio::test]
    async fn test_ready_captures_entries() {
        let (_source, provider) = ready_provider(media_entries()).await;

        assert_eq!(
            provider.manifest("host:1337").unwrap(),
            "#EXTM3U\n\
             #EXTINF:-1,a.mp4\n\
             http://host:1337/entry:0\n\
             #EXTINF:-1,b.mp4\n\
             http://host:1337/entry:1"
        );
    }

    #[tokio::test]
    async fn test_manifest_is_idempotent() {
        let (_source, provider) = ready_provider(media_entries()).await;

        assert_eq!(
            provider.manifest("host:1337").unwrap(),
            provider.manifest("host:1337").unwrap()
        );
    }

    #[tokio::test]
    async fn test_full_segment() {
        let (_source, provider) = ready_provider(media_entries()).await;

        let mut content = provider.segment("/entry:1", None).await.unwrap();
        assert_eq!(content.length, 2000);
        assert_eq!(content.content_type, "video/mp4");
        assert_eq!(content.range, None);

        let mut body = Vec::new();
        content.stream.read_to_end(&mut body).await.unwrap();
        assert_eq!(body.len(), 2000);
    }

    #[tokio::test]
    async fn test_ranged_segment() {
        let (_source, provider) = ready_provider(media_entries()).await;

        let mut content = provider
            .segment("/entry:1", Some("bytes=500-999"))
            .await
            .unwrap();
        assert_eq!(content.length, 2000);
        assert_eq!(content.range, Some(ByteRange { start: 500, end: 999 }));

        let mut body = Vec::new();
        content.stream.read_to_end(&mut body).await.unwrap();
        let expected: Vec<u8> = (500..1000).map(|i| (i % 256) as u8).collect();
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn test_malformed_range_serves_full_body() {
        let (_source, provider) = ready_provider(media_entries()).await;

        let mut content = provider
            .segment("/entry:0", Some("bytes=oops"))
            .await
            .unwrap();
        assert_eq!(content.range, None);

        let mut body = Vec::new();
        content.stream.read_to_end(&mut body).await.unwrap();
        assert_eq!(body.len(), 1000);
    }

    #[tokio::test]
    async fn test_segment_errors() {
        let (_source, provider) = ready_provider(media_entries()).await;

        assert!(matches!(
            provider.segment("/entry:abc", None).await,
            Err(Error::InvalidPath)
        ));
        assert!(matches!(
            provider.segment("/entry:99", None).await,
            Err(Error::NotFound(99))
        ));
        assert!(matches!(
            provider.segment("/other", None).await,
            Err(Error::InvalidPath)
        ));
    }

    #[tokio::test]
    async fn test_filter_keeps_relative_order() {
        let entries = vec![
            entry_with_bytes("a.mp4", "a.mp4", vec![0; 10]),
            entry_with_bytes("notes.txt", "notes.txt", vec![0; 20]),
            entry_with_bytes("c.mp4", "c.mp4", vec![0; 30]),
        ];
        let source = StubSource::new(entries);
        let provider = SourceProvider::builder()
            .with_filter(|entry| entry.name.ends_with(".mp4"))
            .build(source.clone());

        source.signal(SourceSignal::Ready);
        wait_for(&provider, |p| matches!(p.exists(), Ok(true))).await;

        assert_eq!(
            provider.manifest("host").unwrap(),
            "#EXTM3U\n\
             #EXTINF:-1,a.mp4\n\
             http://host/entry:0\n\
             #EXTINF:-1,c.mp4\n\
             http://host/entry:1"
        );

        // Index 1 addresses the second retained entry.
        let content = provider.segment("/entry:1", None).await.unwrap();
        assert_eq!(content.length, 30);
    }

    #[tokio::test]
    async fn test_error_signal_then_recovery() {
        let source = StubSource::new(media_entries());
        let provider = SourceProvider::new(source.clone());

        source.signal(SourceSignal::Error("tracker down".to_string()));
        wait_for(&provider, |p| p.exists().is_err()).await;
        assert!(matches!(
            provider.exists(),
            Err(Error::SourceUnavailable(_))
        ));

        // A later ready signal overwrites the error state.
        source.signal(SourceSignal::Ready);
        wait_for(&provider, |p| matches!(p.exists(), Ok(true))).await;
    }

    #[tokio::test]
    async fn test_unknown_extension_falls_back_to_octet_stream() {
        let entries = vec![entry_with_bytes("blob.zzz", "blob.zzz", vec![0; 5])];
        let (_source, provider) = ready_provider(entries).await;

        let content = provider.segment("/entry:0", None).await.unwrap();
        assert_eq!(content.content_type, FALLBACK_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_custom_mime_lookup() {
        let entries = vec![entry_with_bytes("a.mp4", "a.mp4", vec![0; 5])];
        let source = StubSource::new(entries);
        let provider = SourceProvider::builder()
            .with_mime_lookup(|_| Some("video/x-custom".to_string()))
            .build(source.clone());

        source.signal(SourceSignal::Ready);
        wait_for(&provider, |p| matches!(p.exists(), Ok(true))).await;

        let content = provider.segment("/entry:0", None).await.unwrap();
        assert_eq!(content.content_type, "video/x-custom");
    }
}
