//! Version grammar for the release-record store.
//!
//! Provides the concrete [`ProjectVersion`] type (numbered releases plus
//! the `master` trunk sentinel) and the [`VersionLike`] trait that the
//! store core is written against, so selection and default logic can be
//! exercised with a simplified version scheme in tests.

mod error;
mod traits;
mod types;

pub use error::{VersionComponent, VersionParseError};
pub use traits::VersionLike;
pub use types::ProjectVersion;
