//! Per-version release metadata and its mapping onto the flat state
//! file shape.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::flat::Tree;

/// Whether a version is a finished release or still in development.
///
/// The state file encodes this as an optional-field convention
/// (`release_status=dev` present only for dev records, `release_date`
/// present only for released ones). In memory the two are a single
/// enum, so a record can never carry both a dev marker and a release
/// date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseStatus {
    Released { date: Option<DateTime<Utc>> },
    Dev,
}

impl ReleaseStatus {
    #[must_use]
    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }
}

/// Archive kind, named `line_endings` in the persisted record because
/// that is what distinguishes the two families of archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    Windows,
    Unix,
}

impl ArchiveKind {
    /// Maps an archive filename extension to its kind. Returns `None`
    /// for extensions no release has ever shipped with.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "7z" | "zip" => Some(Self::Windows),
            "gz" | "bz2" => Some(Self::Unix),
            _ => None,
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windows => write!(f, "windows"),
            Self::Unix => write!(f, "unix"),
        }
    }
}

impl FromStr for ArchiveKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "windows" => Ok(Self::Windows),
            "unix" => Ok(Self::Unix),
            _ => Err(()),
        }
    }
}

/// One distributable archive of a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Download {
    pub line_endings: ArchiveKind,
    pub url: String,
    pub sha256: String,
}

/// Everything recorded about one published (or in-development) version.
///
/// The version itself is not persisted as a field; it is implicit in
/// the store key, attached after decode and stripped before encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRecord<V> {
    pub version: V,
    pub status: ReleaseStatus,
    pub documentation: Option<String>,
    pub download_page: Option<String>,
    /// Keyed by archive filename extension (`bz2`, `zip`, ...).
    pub downloads: BTreeMap<String, Download>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordDecodeError {
    #[error("Unexpected release_status value: {value}")]
    BadStatus { value: String },

    #[error("Unparseable release_date: {value}")]
    BadDate { value: String },

    #[error("Unknown line_endings value for download {extension}: {value}")]
    BadArchiveKind { extension: String, value: String },

    #[error("Field {field} has the wrong shape")]
    WrongShape { field: String },
}

impl<V> ReleaseRecord<V> {
    /// A bare released record: the default for old versions that
    /// predate this store.
    #[must_use]
    pub fn released(version: V) -> Self {
        Self {
            version,
            status: ReleaseStatus::Released { date: None },
            documentation: None,
            download_page: None,
            downloads: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn is_dev(&self) -> bool {
        self.status.is_dev()
    }

    /// Encodes the record (minus its version) into the nested form that
    /// [`crate::flat::flatten`] turns into state-file entries.
    #[must_use]
    pub fn to_tree(&self) -> BTreeMap<String, Tree> {
        let mut tree = BTreeMap::new();
        match &self.status {
            ReleaseStatus::Dev => {
                tree.insert("release_status".to_string(), Tree::leaf("dev"));
            }
            ReleaseStatus::Released { date: Some(date) } => {
                tree.insert(
                    "release_date".to_string(),
                    Tree::leaf(date.to_rfc3339_opts(SecondsFormat::Secs, true)),
                );
            }
            ReleaseStatus::Released { date: None } => {}
        }
        if let Some(documentation) = &self.documentation {
            tree.insert("documentation".to_string(), Tree::leaf(documentation));
        }
        if let Some(download_page) = &self.download_page {
            tree.insert("download_page".to_string(), Tree::leaf(download_page));
        }
        if !self.downloads.is_empty() {
            let mut downloads = BTreeMap::new();
            for (extension, download) in &self.downloads {
                let mut entry = BTreeMap::new();
                entry.insert(
                    "line_endings".to_string(),
                    Tree::leaf(download.line_endings.to_string()),
                );
                entry.insert("url".to_string(), Tree::leaf(&download.url));
                entry.insert("sha256".to_string(), Tree::leaf(&download.sha256));
                downloads.insert(extension.clone(), Tree::Branch(entry));
            }
            tree.insert("downloads".to_string(), Tree::Branch(downloads));
        }
        tree
    }

    /// Decodes a record from its nested state-file form, attaching the
    /// version recovered from the store key.
    ///
    /// Unknown fields are dropped with a warning rather than rejected;
    /// malformed known fields are errors.
    pub fn from_tree(version: V, tree: &BTreeMap<String, Tree>) -> Result<Self, RecordDecodeError>
    where
        V: fmt::Display,
    {
        let mut record = Self::released(version);
        let mut release_date = None;

        for (key, value) in tree {
            match key.as_str() {
                "release_status" => {
                    let value = leaf(key, value)?;
                    if value != "dev" {
                        return Err(RecordDecodeError::BadStatus {
                            value: value.to_string(),
                        });
                    }
                    record.status = ReleaseStatus::Dev;
                }
                "release_date" => {
                    let value = leaf(key, value)?;
                    let date = DateTime::parse_from_rfc3339(value).map_err(|_| {
                        RecordDecodeError::BadDate {
                            value: value.to_string(),
                        }
                    })?;
                    release_date = Some(date.with_timezone(&Utc));
                }
                "documentation" => record.documentation = Some(leaf(key, value)?.to_string()),
                "download_page" => record.download_page = Some(leaf(key, value)?.to_string()),
                "downloads" => {
                    let downloads = value.as_branch().ok_or_else(|| {
                        RecordDecodeError::WrongShape {
                            field: key.clone(),
                        }
                    })?;
                    for (extension, entry) in downloads {
                        record
                            .downloads
                            .insert(extension.clone(), decode_download(extension, entry)?);
                    }
                }
                other => {
                    log::warn!(
                        "Dropping unknown field {other:?} in release data for {}",
                        record.version
                    );
                }
            }
        }

        if let Some(date) = release_date {
            if record.status.is_dev() {
                // Both markers in the file break the exclusivity
                // invariant; dev wins and the stale date is dropped.
                log::warn!(
                    "Release data for {} is marked dev but has a release_date; ignoring the date",
                    record.version
                );
            } else {
                record.status = ReleaseStatus::Released { date: Some(date) };
            }
        }

        Ok(record)
    }
}

fn leaf<'t>(field: &str, value: &'t Tree) -> Result<&'t str, RecordDecodeError> {
    value.as_leaf().ok_or_else(|| RecordDecodeError::WrongShape {
        field: field.to_string(),
    })
}

fn decode_download(extension: &str, entry: &Tree) -> Result<Download, RecordDecodeError> {
    let fields = entry
        .as_branch()
        .ok_or_else(|| RecordDecodeError::WrongShape {
            field: format!("downloads.{extension}"),
        })?;
    let field = |name: &str| {
        fields
            .get(name)
            .and_then(Tree::as_leaf)
            .ok_or_else(|| RecordDecodeError::WrongShape {
                field: format!("downloads.{extension}.{name}"),
            })
    };

    let kind_text = field("line_endings")?;
    let line_endings =
        kind_text
            .parse()
            .map_err(|()| RecordDecodeError::BadArchiveKind {
                extension: extension.to_string(),
                value: kind_text.to_string(),
            })?;

    Ok(Download {
        line_endings,
        url: field("url")?.to_string(),
        sha256: field("sha256")?.to_string(),
    })
}
