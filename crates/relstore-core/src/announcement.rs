//! Parser for pasted release announcements.
//!
//! The expected shape is a directory URL, one blank line, then the
//! output of `sha256sum` over the distributable archives:
//!
//! ```text
//! http://example.com/1.55.0/
//!
//! <64 hex chars> project_1_55_0.tar.bz2
//! <64 hex chars> project_1_55_0.zip
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

use relstore_version::{VersionLike, VersionParseError};

use crate::record::{ArchiveKind, Download};

#[derive(Debug, Error)]
pub enum AnnouncementError {
    #[error("Announcement does not match the expected URL + checksum list shape")]
    Format,

    #[error("Download page must be a directory URL ending in '/': {url}")]
    InvalidDownloadPage { url: String },

    #[error("Invalid checksum line: {line}")]
    InvalidChecksumLine { line: String },

    #[error("No known archive kind for extension of: {filename}")]
    UnknownExtension { filename: String },

    #[error(transparent)]
    Version(#[from] VersionParseError),
}

/// The structured result of parsing an announcement: a partial release
/// record plus the version derived from the download page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement<V> {
    pub version: V,
    pub download_page: String,
    /// Keyed by archive filename extension, as in the stored record.
    pub downloads: BTreeMap<String, Download>,
}

impl<V: VersionLike> Announcement<V> {
    /// Parses a pasted announcement block. Nothing is returned unless
    /// the whole block is well formed, so callers can merge the result
    /// into a store without risking a partial update.
    pub fn parse(text: &str) -> Result<Self, AnnouncementError> {
        let mut lines = text.trim_start().lines();

        let download_page = lines.next().ok_or(AnnouncementError::Format)?.trim();
        if download_page.is_empty() || download_page.contains(char::is_whitespace) {
            return Err(AnnouncementError::Format);
        }
        let separator = lines.next().ok_or(AnnouncementError::Format)?;
        if !separator.trim().is_empty() {
            return Err(AnnouncementError::Format);
        }

        if !download_page.ends_with('/') {
            return Err(AnnouncementError::InvalidDownloadPage {
                url: download_page.to_string(),
            });
        }

        let version = V::parse(download_page)?;

        let checksum_block = lines.collect::<Vec<_>>().join("\n");
        let checksum_lines: Vec<&str> = checksum_block.trim().lines().collect();
        if checksum_lines.is_empty() {
            return Err(AnnouncementError::Format);
        }

        let mut downloads = BTreeMap::new();
        for line in checksum_lines {
            let (sha256, filename) = parse_checksum_line(line)?;
            let extension = filename
                .rsplit_once('.')
                .map(|(_, extension)| extension)
                .unwrap_or_default();
            let Some(line_endings) = ArchiveKind::from_extension(extension) else {
                return Err(AnnouncementError::UnknownExtension {
                    filename: filename.to_string(),
                });
            };
            downloads.insert(
                extension.to_string(),
                Download {
                    line_endings,
                    url: format!("{download_page}{filename}"),
                    sha256: sha256.to_string(),
                },
            );
        }

        Ok(Self {
            version,
            download_page: download_page.to_string(),
            downloads,
        })
    }
}

/// One `sha256sum` output line: exactly 64 lowercase hex characters,
/// whitespace, then a filename from a conservative character set.
fn parse_checksum_line(line: &str) -> Result<(&str, &str), AnnouncementError> {
    let invalid = || AnnouncementError::InvalidChecksumLine {
        line: line.to_string(),
    };

    let trimmed = line.trim();
    let (sha256, rest) = trimmed.split_once(' ').ok_or_else(invalid)?;
    if sha256.len() != 64
        || !sha256
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    {
        return Err(invalid());
    }

    let filename = rest.trim_start_matches(' ');
    if filename.is_empty()
        || !filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(invalid());
    }

    Ok((sha256, filename))
}
