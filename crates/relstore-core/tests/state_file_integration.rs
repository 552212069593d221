use tempfile::tempdir;

use relstore_core::{
    Announcement, JsonStateFile, ReleaseStore, StateStore, StatusChange, StorePolicy,
};
use relstore_version::ProjectVersion;

fn policy() -> StorePolicy<ProjectVersion> {
    StorePolicy {
        dev_default_threshold: ProjectVersion::new(1, 50, 0),
        master_documentation: "/doc/libs/master/".to_string(),
    }
}

#[test]
fn import_release_then_publish_persists_to_disk() {
    let temp_dir = tempdir().expect("create temp dir");
    let path = temp_dir.path().join("release-data.json");
    let state = JsonStateFile;

    let mut store = ReleaseStore::load(&state, &path, policy()).expect("load empty store");
    assert!(store.all().is_empty());

    let sha: String = "c".repeat(64);
    let announcement: Announcement<ProjectVersion> = Announcement::parse(&format!(
        "http://example.com/1.55.0/\n\n\
         {sha} project_1_55_0.tar.bz2\n\
         {sha} project_1_55_0.zip\n"
    ))
    .expect("announcement parses");
    let version = announcement.version.clone();

    store.apply_announcement(announcement);
    store.set_documentation(&version, "/doc/1.55.0/");
    store
        .set_release_status(&version, StatusChange::Released)
        .expect("record was just created");
    store.save(&state).expect("save succeeds");

    let reloaded = ReleaseStore::load(&state, &path, policy()).expect("reload store");
    assert_eq!(reloaded.all(), store.all());

    let latest = reloaded.latest_release(&version);
    assert_eq!(latest.version, version);
    assert!(!latest.is_dev());
    assert_eq!(latest.documentation.as_deref(), Some("/doc/1.55.0/"));
    assert_eq!(latest.downloads.len(), 2);
}

#[test]
fn state_file_uses_flat_dotted_keys_without_a_version_field() {
    let temp_dir = tempdir().expect("create temp dir");
    let path = temp_dir.path().join("release-data.json");
    let state = JsonStateFile;

    let mut store = ReleaseStore::load(&state, &path, policy()).expect("load empty store");
    let sha: String = "d".repeat(64);
    store.apply_announcement(
        Announcement::parse(&format!(
            "http://example.com/1.55.0/\n\n{sha} project_1_55_0.tar.bz2\n"
        ))
        .expect("announcement parses"),
    );
    store.save(&state).expect("save succeeds");

    let flat = state.load(&path).expect("raw state loads");
    let record = flat.get("1.55.0").expect("record keyed by version");
    assert_eq!(record.get("downloads.bz2.sha256"), Some(&sha));
    assert_eq!(
        record.get("downloads.bz2.line_endings").map(String::as_str),
        Some("unix")
    );
    assert!(!record.contains_key("version"));
}

#[test]
fn save_load_is_idempotent_for_a_store_of_well_formed_records() {
    let temp_dir = tempdir().expect("create temp dir");
    let path = temp_dir.path().join("release-data.json");
    let state = JsonStateFile;

    let mut store = ReleaseStore::load(&state, &path, policy()).expect("load empty store");
    let sha: String = "e".repeat(64);
    store.apply_announcement(
        Announcement::parse(&format!(
            "http://example.com/1.56.0/\n\n{sha} project_1_56_0.7z\n"
        ))
        .expect("announcement parses"),
    );
    store.save(&state).expect("first save");

    let first = state.load(&path).expect("first raw state");
    let reloaded = ReleaseStore::load(&state, &path, policy()).expect("reload");
    reloaded.save(&state).expect("second save");
    let second = state.load(&path).expect("second raw state");

    assert_eq!(first, second);
}
