//! Space accounting against a real directory tree

use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use volkeeper::volume::Admission;
use volkeeper::{SpacePolicy, Volume};

const MB: u64 = 1024 * 1024;

/// Create a scratch directory for a test, removed when dropped.
///
/// Volume paths are case-folded, so the whole path must already be
/// lower-case for the volume to find its directories again.
fn scratch_dir(name: &str) -> TempDir {
    let dir = tempfile::Builder::new()
        .prefix(&format!("volkeeper-{}", name))
        .rand_bytes(0)
        .tempdir()
        .unwrap();
    let path = dir.path().to_str().unwrap();
    assert_eq!(
        path,
        path.to_lowercase(),
        "temporary directory must be lower-case for case-folded volume paths; set TMPDIR to a lower-case directory"
    );
    dir
}

fn layout(dir: &Path) -> (String, String) {
    let store = dir.join("store");
    let index = dir.join("index");
    fs::create_dir_all(store.join("2024/01")).unwrap();
    fs::create_dir_all(&index).unwrap();
    (
        store.to_str().unwrap().to_string(),
        index.to_str().unwrap().to_string(),
    )
}

#[test]
fn test_refresh_measures_used_space() {
    let tmp = scratch_dir("refresh-measures-used-space");
    let dir = tmp.path();
    let (store, index) = layout(dir);
    fs::write(dir.join("store/2024/01/a.blob"), vec![0u8; 4096]).unwrap();
    fs::write(dir.join("store/b.blob"), vec![0u8; 1000]).unwrap();
    fs::write(dir.join("index/segments_1"), vec![0u8; 24]).unwrap();

    let volume = Volume::new(Arc::new(SpacePolicy::new(true, MB, MB)), &store, &index, 100).unwrap();
    volume.refresh_space();

    let snapshot = volume.snapshot();
    assert!(snapshot.space_check_performed);
    assert!(snapshot.disk_space_checking);
    assert_eq!(snapshot.used_archive_space, 5096);
    assert_eq!(snapshot.used_index_space, 24);
    assert!(snapshot.free_index_space > 0);
    assert!(snapshot.free_archive_space > 0);
}

#[test]
fn test_refresh_twice_is_stable() {
    let tmp = scratch_dir("refresh-twice-is-stable");
    let dir = tmp.path();
    let (store, index) = layout(dir);
    fs::write(dir.join("store/b.blob"), b"archived message").unwrap();

    let volume = Volume::new(Arc::new(SpacePolicy::new(true, MB, MB)), &store, &index, 100).unwrap();
    volume.refresh_space();
    let first = volume.snapshot();
    volume.refresh_space();
    let second = volume.snapshot();

    assert_eq!(first.used_archive_space, second.used_archive_space);
    assert_eq!(first.used_index_space, second.used_index_space);
}

#[test]
fn test_capacity_denial_on_disk() {
    let tmp = scratch_dir("capacity-denial-on-disk");
    let dir = tmp.path();
    let (store, index) = layout(dir);
    fs::write(dir.join("store/big.blob"), vec![0u8; MB as usize]).unwrap();

    // One megabyte volume with a hard threshold of 1 KB
    let volume = Volume::new(Arc::new(SpacePolicy::new(true, 2048, 1024)), &store, &index, 1).unwrap();
    assert!(volume.has_sufficient_space());

    volume.refresh_space();
    assert!(matches!(
        volume.admission().decision,
        Admission::CapacityExceeded { .. }
    ));
    assert!(!volume.has_sufficient_space());
}

#[test]
fn test_missing_directories_are_not_ready() {
    let tmp = scratch_dir("missing-directories-are-not-ready");
    let dir = tmp.path();
    let store = dir.join("not-yet/store");
    let index = dir.join("not-yet/index");

    let volume = Volume::new(
        Arc::new(SpacePolicy::new(true, MB, MB)),
        store.to_str().unwrap(),
        index.to_str().unwrap(),
        100,
    )
    .unwrap();
    volume.refresh_space();

    let snapshot = volume.snapshot();
    assert!(snapshot.disk_space_checking);
    assert_eq!(snapshot.free_index_space, volkeeper::volume::UNMEASURED_FREE_SPACE);
    assert_eq!(snapshot.used_space(), 0);
    assert!(volume.has_sufficient_space());
}
