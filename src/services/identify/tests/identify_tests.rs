use super::snapshot::{DirListing, DirectorySnapshot};
use super::*;
use crate::services::archive::ArchiveGateway;
use crate::test_utils::{build_zip, init_test_logging, png_bytes};
use crate::types::game_spec::GameDirectory;
use std::fs;
use tempfile::TempDir;

struct IdentifyFixture {
    tmp: TempDir,
    engine: ModIdentificationEngine,
}

impl IdentifyFixture {
    fn new() -> Self {
        init_test_logging();
        let tmp = TempDir::new().unwrap();
        let gateway = Arc::new(FileGateway::direct_only());
        let archives = Arc::new(ArchiveGateway::new(
            gateway.clone(),
            tmp.path().join("staging"),
        ));
        let layout = StorageLayout {
            staging_root: tmp.path().join("staging"),
            icon_cache_root: tmp.path().join("icons"),
            image_cache_root: tmp.path().join("images"),
            backup_root: tmp.path().join("backup"),
        };
        let engine = ModIdentificationEngine::new(gateway, archives, layout);
        Self { tmp, engine }
    }

    /// Build game directories with the given live file names.
    fn game_spec(&self, dirs: &[(&str, &[&str])], repeated: bool) -> GameDirectorySpec {
        let mut game_directories = Vec::new();
        for (name, files) in dirs {
            let path = self.tmp.path().join("game").join(name);
            fs::create_dir_all(&path).unwrap();
            for file in *files {
                fs::write(path.join(file), b"original").unwrap();
            }
            game_directories.push(GameDirectory {
                path,
                mod_type: name.to_string(),
            });
        }
        GameDirectorySpec {
            package_name: "com.example.game".to_string(),
            game_directories,
            repeated_file_names: repeated,
            mod_root: self.tmp.path().join("mods"),
        }
    }

    fn identify(&self, source: &Path, spec: &GameDirectorySpec) -> Vec<ModUnit> {
        let flag = crate::types::events::new_cancel_flag();
        match self
            .engine
            .identify_source(source, spec, &Reporter::disabled(), &flag)
        {
            BatchOutcome::Completed(units) => units,
            other => panic!("identification did not complete: {other:?}"),
        }
    }
}

#[test]
fn mode_a_matches_parent_folder_and_live_file() {
    let fx = IdentifyFixture::new();
    let spec = fx.game_spec(
        &[("CharacterA", &["tex.dat"]), ("CharacterB", &[])],
        true,
    );

    let source = fx.tmp.path().join("Pack");
    fs::create_dir_all(source.join("CharacterA")).unwrap();
    fs::create_dir_all(source.join("CharacterB")).unwrap();
    fs::write(source.join("CharacterA/tex.dat"), b"mod tex").unwrap();
    fs::write(source.join("CharacterB/tex.dat"), b"mod tex").unwrap();

    let units = fx.identify(&source, &spec);
    assert_eq!(units.len(), 1);
    let unit = &units[0];
    assert_eq!(unit.mod_files.len(), 1);
    assert!(unit.mod_files[0].ends_with("tex.dat"));
    assert!(unit.mod_files[0].contains("CharacterA"));
    assert_eq!(
        unit.game_files_path[0],
        spec.game_directories[0].path.join("tex.dat")
    );
    assert_eq!(unit.mod_type, "CharacterA");
}

#[test]
fn mode_a_integrated_pack_yields_sibling_units() {
    let fx = IdentifyFixture::new();
    let spec = fx.game_spec(
        &[("CharacterA", &["tex.dat"]), ("CharacterB", &["body.dat"])],
        true,
    );

    let source = fx.tmp.path().join("BigPack");
    fs::create_dir_all(source.join("CharacterA")).unwrap();
    fs::create_dir_all(source.join("CharacterB")).unwrap();
    fs::write(source.join("CharacterA/tex.dat"), b"a").unwrap();
    fs::write(source.join("CharacterB/body.dat"), b"b").unwrap();

    let mut units = fx.identify(&source, &spec);
    units.sort_by(|a, b| a.group_key.cmp(&b.group_key));
    assert_eq!(units.len(), 2);

    assert_eq!(units[0].group_key, "CharacterA");
    assert_eq!(units[1].group_key, "CharacterB");
    for unit in &units {
        let virtual_path = unit.virtual_path.as_ref().unwrap();
        assert!(virtual_path.starts_with(&source));
        assert!(unit.name.starts_with("BigPack("));
    }
}

#[test]
fn mode_b_archive_with_readme_scenario() {
    let fx = IdentifyFixture::new();
    let spec = fx.game_spec(&[("data", &["a.dat"])], false);

    let archive = fx.tmp.path().join("mod.zip");
    build_zip(
        &archive,
        &[("a.dat", b"mod bytes".as_slice()), ("readme.txt", b"about")],
    );

    let units = fx.identify(&archive, &spec);
    assert_eq!(units.len(), 1);
    let unit = &units[0];
    assert!(unit.is_archive);
    assert_eq!(unit.mod_files, vec!["a.dat".to_string()]);
    assert_eq!(
        unit.game_files_path,
        vec![spec.game_directories[0].path.join("a.dat")]
    );
    assert_eq!(unit.readme.as_deref(), Some("readme.txt"));
    assert!(unit.icon.is_none());
    assert_eq!(unit.name, "mod");
}

#[test]
fn mode_b_tie_break_is_first_configured_directory() {
    let fx = IdentifyFixture::new();
    let spec = fx.game_spec(&[("alpha", &["x.dat"]), ("beta", &["x.dat"])], false);

    let archive = fx.tmp.path().join("tie.zip");
    build_zip(&archive, &[("x.dat", b"x".as_slice())]);

    for _ in 0..5 {
        let units = fx.identify(&archive, &spec);
        assert_eq!(units.len(), 1);
        assert_eq!(
            units[0].game_files_path[0],
            spec.game_directories[0].path.join("x.dat")
        );
    }
}

#[test]
fn pairing_invariant_holds_for_all_units() {
    let fx = IdentifyFixture::new();
    let spec = fx.game_spec(
        &[("CharacterA", &["tex.dat", "mesh.dat"])],
        true,
    );

    let source = fx.tmp.path().join("Pack");
    fs::create_dir_all(source.join("CharacterA")).unwrap();
    fs::write(source.join("CharacterA/tex.dat"), b"t").unwrap();
    fs::write(source.join("CharacterA/mesh.dat"), b"m").unwrap();

    let units = fx.identify(&source, &spec);
    for unit in &units {
        assert!(unit.has_valid_pairing());
        for (mod_file, game_path) in unit.mod_files.iter().zip(&unit.game_files_path) {
            let base = crate::services::fs_utils::path_utils::entry_basename(
                &mod_file.replace('\\', "/"),
            )
            .to_lowercase();
            assert!(game_path
                .file_name()
                .unwrap()
                .to_string_lossy()
                .to_lowercase()
                .ends_with(&base));
        }
    }
}

#[test]
fn cosmetic_entries_never_become_mod_files() {
    let fx = IdentifyFixture::new();
    let spec = fx.game_spec(&[("data", &["a.dat"])], false);

    let archive = fx.tmp.path().join("mod.zip");
    build_zip(
        &archive,
        &[
            ("a.dat", b"m".as_slice()),
            ("shot.png", &png_bytes()),
            ("readme.txt", b"r"),
        ],
    );

    let units = fx.identify(&archive, &spec);
    assert_eq!(units.len(), 1);
    let unit = &units[0];
    assert_eq!(unit.mod_files, vec!["a.dat".to_string()]);
    // Unencrypted source: icon recompressed into the cache as WebP.
    let icon = unit.icon.as_ref().expect("icon extracted");
    assert!(icon.ends_with(".webp"));
    assert!(Path::new(icon).is_file());
    assert_eq!(unit.images.len(), 1);
    assert_eq!(unit.description.as_deref(), Some("r"));
}

#[test]
fn source_without_matches_is_discarded_and_probe_fails() {
    let fx = IdentifyFixture::new();
    let spec = fx.game_spec(&[("data", &["a.dat"])], false);

    let archive = fx.tmp.path().join("junk.zip");
    build_zip(&archive, &[("unrelated.bin", b"u".as_slice())]);

    assert!(fx.identify(&archive, &spec).is_empty());
    assert!(!fx.engine.probe(&archive, &spec).unwrap());
}

#[test]
fn probe_accepts_valid_source() {
    let fx = IdentifyFixture::new();
    let spec = fx.game_spec(&[("data", &["a.dat"])], false);

    let archive = fx.tmp.path().join("ok.zip");
    build_zip(&archive, &[("a.dat", b"m".as_slice())]);
    assert!(fx.engine.probe(&archive, &spec).unwrap());
}

#[test]
fn repeated_strategy_rejects_names_missing_from_live_snapshot() {
    let snap = DirectorySnapshot::from_listings(vec![DirListing::synthetic(
        "/game/CharacterA".into(),
        "CharacterA",
        &["tex.dat"],
    )]);
    let entries = vec![
        SourceEntry {
            raw: "Pack/CharacterA/tex.dat".into(),
            rel: "Pack/CharacterA/tex.dat".into(),
        },
        SourceEntry {
            raw: "Pack/CharacterA/extra.dat".into(),
            rel: "Pack/CharacterA/extra.dat".into(),
        },
        SourceEntry {
            raw: "rootfile.dat".into(),
            rel: "rootfile.dat".into(),
        },
    ];

    let groups = repeated::group_entries(&entries, &snap);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key, "Pack/CharacterA");
    assert_eq!(groups[0].files.len(), 1);
    assert_eq!(groups[0].files[0].rel, "Pack/CharacterA/tex.dat");
}

#[test]
fn repeated_strategy_matches_case_insensitively() {
    let snap = DirectorySnapshot::from_listings(vec![DirListing::synthetic(
        "/game/CharacterA".into(),
        "CharacterA",
        &["Tex.DAT"],
    )]);
    let entries = vec![SourceEntry {
        raw: "pack/charactera/TEX.dat".into(),
        rel: "pack/charactera/TEX.dat".into(),
    }];

    let groups = repeated::group_entries(&entries, &snap);
    assert_eq!(groups.len(), 1);
    assert_eq!(
        groups[0].files[0].dest,
        Path::new("/game/CharacterA").join("TEX.dat")
    );
}

#[test]
fn unique_strategy_groups_by_source_parent_folder() {
    let snap = DirectorySnapshot::from_listings(vec![
        DirListing::synthetic("/game/data".into(), "data", &["a.dat", "b.dat"]),
    ]);
    let entries = vec![
        SourceEntry {
            raw: "a.dat".into(),
            rel: "a.dat".into(),
        },
        SourceEntry {
            raw: "variant/b.dat".into(),
            rel: "variant/b.dat".into(),
        },
    ];

    let groups = unique::group_entries(&entries, &snap);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].key, "");
    assert_eq!(groups[1].key, "variant");
}

#[test]
fn rescan_drops_missing_sources_but_surfaces_enabled_ones() {
    let fx = IdentifyFixture::new();
    let spec = fx.game_spec(&[("data", &["a.dat"])], false);

    let present = fx.tmp.path().join("present.zip");
    build_zip(&present, &[("a.dat", b"m".as_slice())]);
    let units = fx.identify(&present, &spec);

    let kept = units[0].clone();
    let mut gone_disabled = units[0].clone();
    gone_disabled.source_path = fx.tmp.path().join("gone1.zip");
    let mut gone_enabled = units[0].clone();
    gone_enabled.source_path = fx.tmp.path().join("gone2.zip");
    gone_enabled.is_enabled = true;

    let report = fx
        .engine
        .reconcile_units(vec![kept, gone_disabled, gone_enabled]);

    assert_eq!(report.retained.len(), 1);
    assert_eq!(report.removed.len(), 1);
    assert_eq!(report.missing_enabled.len(), 1);
    assert!(report.missing_enabled[0].is_enabled);
}

#[test]
fn display_name_joins_relative_parts_with_pipes() {
    assert_eq!(
        display_name(Path::new("/mods/Pack.zip"), "Pack/CharacterA"),
        "Pack(Pack|CharacterA)"
    );
    assert_eq!(display_name(Path::new("/mods/Pack.zip"), ""), "Pack");
}
