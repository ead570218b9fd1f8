use super::*;
use tempfile::TempDir;

#[test]
fn rename_moves_file_within_same_device() {
    let tmp = TempDir::new().unwrap();
    let from = tmp.path().join("a.bin");
    let to = tmp.path().join("sub").join("b.bin");
    fs::write(&from, b"payload").unwrap();
    fs::create_dir_all(to.parent().unwrap()).unwrap();

    rename_cross_drive_fallback(&from, &to).unwrap();

    assert!(!from.exists());
    assert_eq!(fs::read(&to).unwrap(), b"payload");
}

#[test]
fn missing_source_reports_not_found() {
    let tmp = TempDir::new().unwrap();
    let err = rename_cross_drive_fallback(&tmp.path().join("ghost"), &tmp.path().join("out"))
        .unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}
