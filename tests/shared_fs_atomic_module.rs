use foldercreate::shared::fs_atomic::{
    atomic_write_file, replace_file, temp_sibling_path, write_file_synced,
};
use std::fs;
use std::path::Path;

#[test]
fn atomic_write_replaces_existing_content() {
    let temp = tempfile::tempdir().expect("tempdir");
    let target = temp.path().join("config.yaml");

    atomic_write_file(&target, b"first").expect("write first");
    atomic_write_file(&target, b"second").expect("write second");
    assert_eq!(fs::read_to_string(&target).expect("read"), "second");

    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .expect("list")
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn temp_sibling_inserts_suffix_before_extension() {
    assert_eq!(
        temp_sibling_path(Path::new("/srv/fc/Status.xml")),
        Path::new("/srv/fc/Status_Temp.xml")
    );
    assert_eq!(
        temp_sibling_path(Path::new("Status")),
        Path::new("Status_Temp")
    );
}

#[test]
fn synced_write_then_replace_moves_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let target = temp.path().join("Status.xml");
    let staging = temp_sibling_path(&target);

    write_file_synced(&staging, b"<Root/>").expect("stage");
    replace_file(&staging, &target).expect("replace");

    assert!(!staging.exists());
    assert_eq!(fs::read_to_string(&target).expect("read"), "<Root/>");
}
