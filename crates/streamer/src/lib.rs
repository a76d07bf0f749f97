//! HTTP pseudo-streaming middleware for indexed binary content
//!
//! This crate serves any ordered list of file-like entries (torrent files,
//! a directory on disk, ...) as a playlist manifest plus byte-range
//! addressable segment endpoints. The content engine sits behind the
//! [`ContentSource`] trait; the HTTP layer talks only to a
//! [`StreamProvider`].

mod error;
pub mod playlist;
pub mod provider;
pub mod range;
pub mod server;
pub mod source;

pub use error::Error;
pub use provider::{SegmentContent, SourceProvider, SourceProviderBuilder, StreamProvider};
pub use range::ByteRange;
pub use server::{StreamServer, MANIFEST_CONTENT_TYPE};
pub use source::{ByteStream, ContentSource, Entry, EntryReader, SourceSignal};

/// Result type alias for server lifecycle operations
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
