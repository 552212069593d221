//! Release-record store for the project's published versions.
//!
//! This crate holds the logic the website generator relies on to decide
//! what to show as "latest" and where downloads live:
//! - The flatten/unflatten codec between nested records and the flat
//!   key/value form the state file uses.
//! - The per-version release record and its default policy.
//! - The release-announcement parser (directory URL plus sha256sum
//!   output) used when importing a new release.
//! - The store itself: grouping by release series, latest-release
//!   selection, status transitions, explicit load/save.

pub mod announcement;
pub mod flat;
pub mod record;
pub mod state;
pub mod store;

/// Announcement block parser and its error taxonomy.
pub use announcement::{Announcement, AnnouncementError};
/// Nested/flat codec over dot-joined key paths.
pub use flat::Tree;
/// Per-version release metadata model.
pub use record::{ArchiveKind, Download, RecordDecodeError, ReleaseRecord, ReleaseStatus};
/// Persistence collaborator seam and the JSON file implementation.
pub use state::{FlatRecord, FlatState, JsonStateFile, StateStore, StorageError};
/// The release store and its typed operations.
pub use store::{RecordUpdate, ReleaseStore, StatusChange, StoreError, StorePolicy};
