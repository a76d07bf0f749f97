//! Extended playlist rendering and the `entry:<index>` path mapping
//!
//! The playlist is consumed verbatim by media players (VLC opens it as a
//! network stream), so the output format is byte-exact: `#EXTM3U`, then one
//! `#EXTINF:-1,<path>` / `<origin>/entry:<index>` record per entry, joined
//! by single newlines. Duration is always `-1` (unknown).

use crate::source::Entry;
use crate::Error;

/// Stable path segment for the entry at `index`
pub fn entry_path(index: usize) -> String {
    format!("entry:{}", index)
}

/// Render the playlist for `entries` with URLs rooted at `origin`
/// (scheme + host, e.g. `http://host:1337`).
///
/// An empty sequence renders the bare `#EXTM3U` header line.
pub fn render(entries: &[Entry], origin: &str) -> String {
    let records: Vec<String> = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            format!("#EXTINF:-1,{}\n{}/{}", entry.path, origin, entry_path(index))
        })
        .collect();

    format!("#EXTM3U\n{}", records.join("\n"))
}

/// Extract the entry index from a request path.
///
/// Looks for the first `/entry:` token and takes the decimal digits that
/// follow it. A missing token, no digits, or digits that do not fit a
/// `usize` fail with [`Error::InvalidPath`].
pub fn parse_entry_index(path: &str) -> Result<usize, Error> {
    let at = path.find("/entry:").ok_or(Error::InvalidPath)?;
    let digits: String = path[at + "/entry:".len()..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse().map_err(|_| Error::InvalidPath)
}
