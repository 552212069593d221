//! The release store: records grouped by release series, "latest"
//! selection, defaults, typed mutation and explicit persistence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{SubsecRound as _, Utc};
use thiserror::Error;

use relstore_version::{VersionLike, VersionParseError};

use crate::announcement::Announcement;
use crate::flat;
use crate::record::{Download, RecordDecodeError, ReleaseRecord, ReleaseStatus};
use crate::state::{FlatState, StateStore, StorageError};

/// Policy knobs for versions the store has no data about. The
/// threshold and trunk documentation path are deployment facts, not
/// code facts, so they are configuration rather than literals in the
/// default logic.
#[derive(Debug, Clone)]
pub struct StorePolicy<V> {
    /// Versions below this are assumed released even with no record;
    /// versions at or above it default to in-development trunk data.
    pub dev_default_threshold: V,
    /// Documentation path handed out for defaulted trunk records.
    pub master_documentation: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No release record for {version}")]
    NoReleaseRecord { version: String },

    #[error("State file key {key:?} is not a version: {source}")]
    InvalidStoredKey {
        key: String,
        #[source]
        source: VersionParseError,
    },

    #[error("Release data for {version} is corrupt: {source}")]
    CorruptRecord {
        version: String,
        #[source]
        source: RecordDecodeError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A partial update of one record: only the fields that are `Some`
/// are overwritten, everything else is preserved.
#[derive(Debug, Clone, Default)]
pub struct RecordUpdate {
    pub documentation: Option<String>,
    pub download_page: Option<String>,
    pub downloads: Option<BTreeMap<String, Download>>,
}

/// A requested status transition. Being an enum rather than free text,
/// an invalid status is unrepresentable instead of a runtime contract
/// violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Released,
    Dev,
}

/// In-memory store of every release record, keyed twice: by release
/// series (base version) and, within a series, by the canonical text of
/// the full version.
///
/// Loaded once from the state file, mutated in memory, and written back
/// only by an explicit [`save`](Self::save).
#[derive(Debug)]
pub struct ReleaseStore<V> {
    path: PathBuf,
    policy: StorePolicy<V>,
    releases: BTreeMap<String, BTreeMap<String, ReleaseRecord<V>>>,
}

impl<V: VersionLike> ReleaseStore<V> {
    /// Loads the store from the backing state. Duplicate keys that
    /// normalize to the same canonical version are reported and the
    /// later one wins; they never abort the load.
    pub fn load(
        state: &impl StateStore,
        path: impl Into<PathBuf>,
        policy: StorePolicy<V>,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let mut store = Self {
            releases: BTreeMap::new(),
            policy,
            path: path.clone(),
        };

        for (key, flat_record) in state.load(&path)? {
            let version = V::parse(&key).map_err(|source| StoreError::InvalidStoredKey {
                key: key.clone(),
                source,
            })?;
            let tree = flat::unflatten(&flat_record);
            let record = ReleaseRecord::from_tree(version.clone(), &tree).map_err(|source| {
                StoreError::CorruptRecord {
                    version: version.to_string(),
                    source,
                }
            })?;

            let base = version.base_version();
            let canonical = version.to_string();
            let series = store.releases.entry(base).or_default();
            if series.insert(canonical.clone(), record).is_some() {
                log::warn!("Duplicate release data for {canonical}");
            }
        }

        log::debug!(
            "Loaded release data for {} versions from {}",
            store.releases.values().map(BTreeMap::len).sum::<usize>(),
            store.path.display()
        );
        Ok(store)
    }

    /// Writes every record back to the backing state, replacing the
    /// previous contents wholesale.
    pub fn save(&self, state: &impl StateStore) -> Result<(), StoreError> {
        let mut flat_state = FlatState::new();
        for (canonical, record) in self.releases.values().flatten() {
            // The version is implicit in the key; records encode
            // without it.
            flat_state.insert(canonical.clone(), flat::flatten(&record.to_tree()));
        }
        state.save(&flat_state, &self.path)?;
        Ok(())
    }

    /// The record to show for `version`'s release series.
    ///
    /// Within the series, a released record always beats a dev record;
    /// among records of equal status the greater version wins. A series
    /// with no records at all falls back to
    /// [`default_release_data`](Self::default_release_data).
    #[must_use]
    pub fn latest_release(&self, version: &V) -> ReleaseRecord<V> {
        self.releases
            .get(&version.base_version())
            .and_then(|series| Self::select_latest(series))
            .cloned()
            .unwrap_or_else(|| self.default_release_data(version))
    }

    fn select_latest(
        series: &BTreeMap<String, ReleaseRecord<V>>,
    ) -> Option<&ReleaseRecord<V>> {
        // Series maps are created on first insert and never left empty.
        debug_assert!(!series.is_empty(), "empty release series in store");

        let mut chosen: Option<&ReleaseRecord<V>> = None;
        for candidate in series.values() {
            let replace = match chosen {
                None => true,
                Some(current) => {
                    (current.is_dev() && !candidate.is_dev())
                        || (current.is_dev() == candidate.is_dev()
                            && candidate.version > current.version)
                }
            };
            if replace {
                chosen = Some(candidate);
            }
        }
        chosen
    }

    /// The record assumed for a version with no stored data: old
    /// versions are taken to be released with nothing else known, while
    /// versions past the policy threshold have simply not been recorded
    /// yet and default to the in-development trunk.
    #[must_use]
    pub fn default_release_data(&self, version: &V) -> ReleaseRecord<V> {
        if *version < self.policy.dev_default_threshold {
            ReleaseRecord::released(version.clone())
        } else {
            let mut record = ReleaseRecord::released(V::master());
            record.status = ReleaseStatus::Dev;
            record.documentation = Some(self.policy.master_documentation.clone());
            record
        }
    }

    /// Overwrites the given fields of `version`'s record, creating it
    /// first from the default policy if nothing was recorded yet.
    pub fn update(&mut self, version: &V, update: RecordUpdate) {
        let record = self.record_entry(version);
        if let Some(documentation) = update.documentation {
            record.documentation = Some(documentation);
        }
        if let Some(download_page) = update.download_page {
            record.download_page = Some(download_page);
        }
        if let Some(downloads) = update.downloads {
            record.downloads = downloads;
        }
    }

    /// Merges a parsed release announcement, creating the record if
    /// needed.
    pub fn apply_announcement(&mut self, announcement: Announcement<V>) {
        let version = announcement.version.clone();
        log::debug!(
            "Recording downloads for {version} from {}",
            announcement.download_page
        );
        self.update(
            &version,
            RecordUpdate {
                download_page: Some(announcement.download_page),
                downloads: Some(announcement.downloads),
                ..RecordUpdate::default()
            },
        );
    }

    /// Points `version`'s record at its hosted documentation.
    pub fn set_documentation(&mut self, version: &V, path: impl Into<String>) {
        self.update(
            version,
            RecordUpdate {
                documentation: Some(path.into()),
                ..RecordUpdate::default()
            },
        );
    }

    /// Transitions `version`'s record between dev and released.
    ///
    /// Only versions that were deliberately recorded beforehand may
    /// transition; there is no default seeding here. Marking released
    /// stamps the current time as the release date; marking dev drops
    /// any date, so the two markers stay mutually exclusive in both
    /// directions.
    pub fn set_release_status(
        &mut self,
        version: &V,
        status: StatusChange,
    ) -> Result<(), StoreError> {
        let canonical = version.to_string();
        let record = self
            .releases
            .get_mut(&version.base_version())
            .and_then(|series| series.get_mut(&canonical))
            .ok_or(StoreError::NoReleaseRecord { version: canonical })?;

        record.status = match status {
            StatusChange::Released => ReleaseStatus::Released {
                // Whole seconds only: the state file stores dates at
                // second precision, and a finer stamp would not survive
                // a save/load cycle.
                date: Some(Utc::now().trunc_subsecs(0)),
            },
            StatusChange::Dev => ReleaseStatus::Dev,
        };
        Ok(())
    }

    /// Read-only view of every record, grouped by release series.
    #[must_use]
    pub fn all(&self) -> &BTreeMap<String, BTreeMap<String, ReleaseRecord<V>>> {
        &self.releases
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record_entry(&mut self, version: &V) -> &mut ReleaseRecord<V> {
        // A defaulted trunk record carries the master sentinel; seeded
        // under a concrete version key, the version field must match
        // the key.
        let mut seed = self.default_release_data(version);
        seed.version = version.clone();
        self.releases
            .entry(version.base_version())
            .or_default()
            .entry(version.to_string())
            .or_insert(seed)
    }
}
