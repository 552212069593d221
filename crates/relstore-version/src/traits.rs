use std::fmt::{Debug, Display};

use crate::error::VersionParseError;

/// The version capability the release store is written against.
///
/// The store only needs parsing, a total order, a canonical textual
/// form, a coarse grouping key and the trunk sentinel; keeping that
/// behind a trait lets the selection and default logic be tested with a
/// simplified scheme instead of the full [`ProjectVersion`] grammar.
///
/// [`ProjectVersion`]: crate::ProjectVersion
pub trait VersionLike: Clone + Ord + Display + Debug {
    /// Parses a version from a short token or from URL-like text that
    /// embeds one.
    fn parse(text: &str) -> Result<Self, VersionParseError>;

    /// The release series this version belongs to. Records are grouped
    /// under this key, and "latest" is resolved within one group.
    fn base_version(&self) -> String;

    /// The distinguished version for the unreleased development trunk.
    /// Compares greater than any concrete release.
    fn master() -> Self;
}
