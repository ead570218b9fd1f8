use super::*;
use std::path::PathBuf;

fn domains() -> PathDomains {
    PathDomains {
        sandbox_roots: vec![PathBuf::from("/storage/self/app")],
        shared_writable_roots: vec![PathBuf::from("/storage/shared/Download")],
        foreign_data_root: Some(PathBuf::from("/storage/shared/appdata")),
    }
}

fn scoped(
    broad: bool,
    trees: Vec<PathBuf>,
    privileged: PrivilegedState,
) -> PermissionSnapshot {
    PermissionSnapshot {
        generation: PlatformGeneration::Scoped,
        broad_storage_granted: broad,
        granted_tree_roots: trees,
        privileged,
    }
}

#[test]
fn legacy_generation_collapses_to_direct_file() {
    let perms = PermissionSnapshot {
        generation: PlatformGeneration::Legacy,
        broad_storage_granted: false,
        granted_tree_roots: vec![],
        privileged: PrivilegedState::NotInstalled,
    };
    let tier = resolve(
        Path::new("/storage/shared/appdata/com.game/files/x.dat"),
        &perms,
        &domains(),
    );
    assert_eq!(tier, AccessTier::DirectFile);
}

#[test]
fn unmanaged_generation_collapses_to_none() {
    let perms = PermissionSnapshot {
        generation: PlatformGeneration::Unmanaged,
        broad_storage_granted: true,
        granted_tree_roots: vec![PathBuf::from("/")],
        privileged: PrivilegedState::Ready,
    };
    assert_eq!(
        resolve(Path::new("/anything"), &perms, &domains()),
        AccessTier::None
    );
}

#[test]
fn sandbox_paths_are_always_direct() {
    let perms = scoped(false, vec![], PrivilegedState::NotInstalled);
    assert_eq!(
        resolve(Path::new("/storage/self/app/cache/tmp.zip"), &perms, &domains()),
        AccessTier::DirectFile
    );
}

#[test]
fn shared_folder_requires_broad_grant_for_direct() {
    let with = scoped(true, vec![], PrivilegedState::NotInstalled);
    let without = scoped(false, vec![], PrivilegedState::NotInstalled);
    let path = Path::new("/storage/shared/Download/mod.zip");
    assert_eq!(resolve(path, &with, &domains()), AccessTier::DirectFile);
    assert_eq!(resolve(path, &without, &domains()), AccessTier::None);
}

#[test]
fn privileged_outranks_document_tree() {
    let perms = scoped(
        false,
        vec![PathBuf::from("/storage/shared/appdata/com.game")],
        PrivilegedState::Ready,
    );
    let tier = resolve(
        Path::new("/storage/shared/appdata/com.game/files/x.dat"),
        &perms,
        &domains(),
    );
    assert_eq!(tier, AccessTier::PrivilegedIpc);
}

#[test]
fn tree_grant_covers_paths_under_its_boundary() {
    let perms = scoped(
        false,
        vec![PathBuf::from("/storage/shared/appdata/com.game")],
        PrivilegedState::NotRunning,
    );
    let tier = resolve(
        Path::new("/storage/shared/appdata/com.game/files/deep/x.dat"),
        &perms,
        &domains(),
    );
    assert_eq!(tier, AccessTier::DocumentTree);

    let other = resolve(
        Path::new("/storage/shared/appdata/com.other/files/x.dat"),
        &perms,
        &domains(),
    );
    assert_eq!(other, AccessTier::None);
}

#[test]
fn deep_foreign_grant_normalizes_to_app_data_root() {
    // The platform only ever grants at the per-app boundary, so a grant
    // recorded deeper than it still covers the whole app data root.
    let perms = scoped(
        false,
        vec![PathBuf::from("/storage/shared/appdata/com.game/files/Mods")],
        PrivilegedState::NotInstalled,
    );
    let tier = resolve(
        Path::new("/storage/shared/appdata/com.game/other/x.dat"),
        &perms,
        &domains(),
    );
    assert_eq!(tier, AccessTier::DocumentTree);
}

#[test]
fn grant_boundary_identity_outside_foreign_root() {
    let d = domains();
    let p = Path::new("/storage/shared/Download/pack.zip");
    assert_eq!(grant_boundary(p, &d), p.to_path_buf());
}

#[test]
fn resolution_is_pure_and_repeatable() {
    let perms = scoped(true, vec![], PrivilegedState::Ready);
    let path = Path::new("/storage/shared/appdata/com.game/files/x.dat");
    let first = resolve(path, &perms, &domains());
    for _ in 0..10 {
        assert_eq!(resolve(path, &perms, &domains()), first);
    }
}

#[test]
fn denial_names_the_missing_grant() {
    let perms = scoped(false, vec![], PrivilegedState::NotInstalled);
    let shared = describe_denial(
        Path::new("/storage/shared/Download/mod.zip"),
        &perms,
        &domains(),
    );
    assert!(matches!(shared, PermissionError::StoragePermissionDenied(_)));

    let foreign = describe_denial(
        Path::new("/storage/shared/appdata/com.game/files/x.dat"),
        &perms,
        &domains(),
    );
    match foreign {
        PermissionError::UriPermissionNotGranted(boundary) => {
            assert_eq!(boundary, "/storage/shared/appdata/com.game");
        }
        other => panic!("unexpected denial: {other:?}"),
    }
}
