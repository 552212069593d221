use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{VersionComponent, VersionParseError};
use crate::traits::VersionLike;

/// A published version of the project, or the unreleased development
/// trunk.
///
/// The canonical textual form (`"1.55.0"`, `"master"`) is what the
/// release store uses as a map key, so `Display` and `FromStr` must
/// stay inverses of each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectVersion {
    Release { major: u32, minor: u32, patch: u32 },
    Master,
}

impl ProjectVersion {
    #[must_use]
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self::Release {
            major,
            minor,
            patch,
        }
    }

    #[must_use]
    pub fn is_master(&self) -> bool {
        matches!(self, Self::Master)
    }

    /// Finds a version embedded in URL-like text, covering both
    /// `http://host/1.55.0/` and `project_1_55_0.tar.bz2` forms.
    ///
    /// The text is scanned for maximal `digits (sep digits)*` chains
    /// (sep is `.` or `_`); within a chain the trailing window of three
    /// runs wins, so prefixed tokens such as `x86_64_1_55_0` resolve to
    /// the version they end with rather than to the prefix.
    fn extract(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        let mut at = 0;
        while at < bytes.len() {
            if !bytes[at].is_ascii_digit() {
                at += 1;
                continue;
            }
            let (runs, chain_end) = Self::digit_chain(bytes, at);
            if let Some(version) = Self::from_chain(&runs) {
                return Some(version);
            }
            at = chain_end;
        }
        None
    }

    /// Collects the maximal chain of separator-joined digit runs
    /// starting at `start`. Runs too large for a component are kept as
    /// `None` so they still take part in window placement.
    fn digit_chain(bytes: &[u8], start: usize) -> (Vec<Option<u32>>, usize) {
        let mut runs = Vec::new();
        let mut at = start;
        loop {
            let run_start = at;
            while at < bytes.len() && bytes[at].is_ascii_digit() {
                at += 1;
            }
            let run = std::str::from_utf8(&bytes[run_start..at])
                .ok()
                .and_then(|digits| digits.parse().ok());
            runs.push(run);
            let continues = at + 1 < bytes.len()
                && (bytes[at] == b'.' || bytes[at] == b'_')
                && bytes[at + 1].is_ascii_digit();
            if continues {
                at += 1;
            } else {
                break;
            }
        }
        (runs, at)
    }

    fn from_chain(runs: &[Option<u32>]) -> Option<Self> {
        runs.windows(3).rev().find_map(|window| match window {
            [Some(major), Some(minor), Some(patch)] => Some(Self::new(*major, *minor, *patch)),
            _ => None,
        })
    }
}

impl Ord for ProjectVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // The trunk is newer than any numbered release.
            (Self::Master, Self::Master) => Ordering::Equal,
            (Self::Master, Self::Release { .. }) => Ordering::Greater,
            (Self::Release { .. }, Self::Master) => Ordering::Less,
            (
                Self::Release {
                    major: a1,
                    minor: b1,
                    patch: c1,
                },
                Self::Release {
                    major: a2,
                    minor: b2,
                    patch: c2,
                },
            ) => a1.cmp(a2).then(b1.cmp(b2)).then(c1.cmp(c2)),
        }
    }
}

impl PartialOrd for ProjectVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ProjectVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Release {
                major,
                minor,
                patch,
            } => write!(f, "{major}.{minor}.{patch}"),
            Self::Master => write!(f, "master"),
        }
    }
}

impl FromStr for ProjectVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "master" {
            return Ok(Self::Master);
        }

        let mut parts = s.split('.');
        let invalid_format = || VersionParseError::InvalidFormat {
            input: s.to_string(),
        };
        let major_str = parts.next().ok_or_else(invalid_format)?;
        let minor_str = parts.next().ok_or_else(invalid_format)?;
        let patch_str = parts.next().ok_or_else(invalid_format)?;
        if parts.next().is_some() {
            return Err(invalid_format());
        }

        let component = |component: VersionComponent, value: &str| -> Result<u32, Self::Err> {
            value
                .parse()
                .map_err(|_| VersionParseError::InvalidComponent {
                    component,
                    value: value.to_string(),
                })
        };
        Ok(Self::new(
            component(VersionComponent::Major, major_str)?,
            component(VersionComponent::Minor, minor_str)?,
            component(VersionComponent::Patch, patch_str)?,
        ))
    }
}

impl VersionLike for ProjectVersion {
    fn parse(text: &str) -> Result<Self, VersionParseError> {
        if let Ok(version) = text.parse() {
            return Ok(version);
        }
        Self::extract(text).ok_or_else(|| VersionParseError::NotFound {
            input: text.to_string(),
        })
    }

    fn base_version(&self) -> String {
        match self {
            Self::Release { major, .. } => major.to_string(),
            Self::Master => "master".to_string(),
        }
    }

    fn master() -> Self {
        Self::Master
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_release_token() {
        let v: ProjectVersion = "1.55.0".parse().expect("valid version");
        assert_eq!(v, ProjectVersion::new(1, 55, 0));
    }

    #[test]
    fn parse_master_token() {
        let v: ProjectVersion = "master".parse().expect("valid version");
        assert!(v.is_master());
    }

    #[test]
    fn parse_token_with_whitespace() {
        let v: ProjectVersion = "  1.55.0  ".parse().expect("valid version");
        assert_eq!(v, ProjectVersion::new(1, 55, 0));
    }

    #[test]
    fn parse_rejects_two_components() {
        let result: Result<ProjectVersion, _> = "1.55".parse();
        assert!(result.is_err());
    }

    #[test]
    fn parse_rejects_four_components() {
        let result: Result<ProjectVersion, _> = "1.55.0.1".parse();
        assert!(result.is_err());
    }

    #[test]
    fn parse_rejects_non_numeric_component() {
        let result: Result<ProjectVersion, _> = "1.x.0".parse();
        assert!(matches!(
            result,
            Err(VersionParseError::InvalidComponent {
                component: VersionComponent::Minor,
                ..
            })
        ));
    }

    #[test]
    fn parse_extracts_from_directory_url() {
        let v = ProjectVersion::parse("http://example.com/release/1.55.0/").expect("extracted");
        assert_eq!(v, ProjectVersion::new(1, 55, 0));
    }

    #[test]
    fn parse_extracts_underscore_separated_filename() {
        let v = ProjectVersion::parse("project_1_55_0.tar.bz2").expect("extracted");
        assert_eq!(v, ProjectVersion::new(1, 55, 0));
    }

    #[test]
    fn parse_skips_incomplete_digit_runs() {
        // The port number is not a version.
        let v = ProjectVersion::parse("http://example.com:8080/dist/1.60.3/").expect("extracted");
        assert_eq!(v, ProjectVersion::new(1, 60, 3));
    }

    #[test]
    fn parse_resolves_the_version_at_the_end_of_a_digit_chain() {
        // The architecture prefix joins the same digit chain as the
        // version; the trailing triple is the version.
        let v = ProjectVersion::parse("package_x86_64_1_55_0.tar.gz").expect("extracted");
        assert_eq!(v, ProjectVersion::new(1, 55, 0));
    }

    #[test]
    fn parse_fails_without_any_version() {
        let result = ProjectVersion::parse("http://example.com/latest/");
        assert!(matches!(result, Err(VersionParseError::NotFound { .. })));
    }

    #[test]
    fn display_round_trips_canonical_form() {
        assert_eq!(ProjectVersion::new(1, 55, 0).to_string(), "1.55.0");
        assert_eq!(ProjectVersion::Master.to_string(), "master");
    }

    #[test]
    fn ordering_by_components() {
        let older = ProjectVersion::new(1, 50, 0);
        let newer = ProjectVersion::new(1, 51, 0);
        assert!(newer > older);
        assert!(ProjectVersion::new(2, 0, 0) > newer);
    }

    #[test]
    fn master_orders_above_every_release() {
        assert!(ProjectVersion::Master > ProjectVersion::new(999, 0, 0));
    }

    #[test]
    fn base_version_groups_by_series() {
        assert_eq!(ProjectVersion::new(1, 50, 0).base_version(), "1");
        assert_eq!(ProjectVersion::new(1, 51, 0).base_version(), "1");
        assert_eq!(ProjectVersion::new(2, 0, 1).base_version(), "2");
        assert_eq!(ProjectVersion::Master.base_version(), "master");
    }
}
