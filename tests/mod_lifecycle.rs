mod common;

use common::{init_context, md5_of, write_zip};
use modkeeper::types::events::{new_cancel_flag, BatchOutcome, ProgressEvent, Reporter};
use std::collections::HashMap;
use std::fs;

#[test]
fn transfer_identify_enable_backup_restore_round_trip() {
    let ctx = init_context();
    let game_file = ctx.spec.game_directories[0].path.join("a.dat");
    fs::write(&game_file, b"original game bytes").unwrap();
    let original_hash = md5_of(&game_file);

    // An archive lands in an external downloads folder.
    let downloads = ctx.tmp.path().join("downloads");
    write_zip(
        &downloads.join("skin.zip"),
        &[("a.dat", b"modded bytes".as_slice()), ("readme.txt", b"hi")],
    );

    // Transfer moves it into the managed mod root.
    let flag = new_cancel_flag();
    let report = match ctx.transfer.scan_and_transfer(
        &[downloads.clone()],
        &ctx.spec,
        &Reporter::disabled(),
        &flag,
    ) {
        BatchOutcome::Completed(report) => report,
        other => panic!("transfer failed: {other:?}"),
    };
    let staged_archive = ctx.spec.mod_root.join("skin.zip");
    assert_eq!(report.moved, vec![staged_archive.clone()]);
    assert!(!downloads.join("skin.zip").exists());

    // Identification maps the archive onto the live game directory.
    let units = match ctx.identifier.identify_source(
        &staged_archive,
        &ctx.spec,
        &Reporter::disabled(),
        &flag,
    ) {
        BatchOutcome::Completed(units) => units,
        other => panic!("identify failed: {other:?}"),
    };
    assert_eq!(units.len(), 1);
    let unit = &units[0];
    assert_eq!(unit.game_files_path, vec![game_file.clone()]);

    // Backup snapshots the original before activation.
    let records = match ctx
        .backup
        .backup(unit, &ctx.spec, &Reporter::disabled(), &flag)
    {
        BatchOutcome::Completed(records) => records,
        other => panic!("backup failed: {other:?}"),
    };
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].original_md5, original_hash);

    // Activation overwrites the game file, hashing in the same pass.
    let hashes = match ctx.activation.enable(unit, &Reporter::disabled(), &flag) {
        BatchOutcome::Completed(hashes) => hashes,
        other => panic!("enable failed: {other:?}"),
    };
    assert_eq!(fs::read(&game_file).unwrap(), b"modded bytes");
    assert_eq!(hashes.get(&game_file).unwrap(), &md5_of(&game_file));

    // Disable is a pass-through; restore puts the original back.
    ctx.activation.disable(unit).unwrap();
    let summary = match ctx
        .backup
        .restore(&records, &hashes, unit, &Reporter::disabled(), &flag)
    {
        BatchOutcome::Completed(summary) => summary,
        other => panic!("restore failed: {other:?}"),
    };
    assert_eq!(summary.restored, vec![game_file.clone()]);
    assert_eq!(md5_of(&game_file), original_hash);
    assert!(!records[0].backup_path.exists());

    // Nothing lingers in the staging area.
    let staging_leftovers = fs::read_dir(&ctx.layout.staging_root)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(staging_leftovers, 0);
}

#[test]
fn game_update_after_activation_blocks_restore() {
    let ctx = init_context();
    let game_file = ctx.spec.game_directories[0].path.join("a.dat");
    fs::write(&game_file, b"v1 game bytes").unwrap();

    let archive = ctx.spec.mod_root.join("skin.zip");
    write_zip(&archive, &[("a.dat", b"modded bytes".as_slice())]);

    let flag = new_cancel_flag();
    let units = match ctx
        .identifier
        .identify_source(&archive, &ctx.spec, &Reporter::disabled(), &flag)
    {
        BatchOutcome::Completed(units) => units,
        other => panic!("identify failed: {other:?}"),
    };
    let unit = &units[0];

    let records = match ctx
        .backup
        .backup(unit, &ctx.spec, &Reporter::disabled(), &flag)
    {
        BatchOutcome::Completed(records) => records,
        other => panic!("backup failed: {other:?}"),
    };
    let hashes = match ctx.activation.enable(unit, &Reporter::disabled(), &flag) {
        BatchOutcome::Completed(hashes) => hashes,
        other => panic!("enable failed: {other:?}"),
    };

    // A game update ships a new version of the modded file.
    fs::write(&game_file, b"v2 game bytes").unwrap();

    let summary = match ctx
        .backup
        .restore(&records, &hashes, unit, &Reporter::disabled(), &flag)
    {
        BatchOutcome::Completed(summary) => summary,
        other => panic!("restore failed: {other:?}"),
    };
    assert!(summary.restored.is_empty());
    assert_eq!(summary.skipped, vec![game_file.clone()]);
    assert_eq!(fs::read(&game_file).unwrap(), b"v2 game bytes");
    assert!(records[0].backup_path.exists());
}

#[tokio::test]
async fn async_enable_streams_progress_events() {
    let ctx = init_context();
    let game_file = ctx.spec.game_directories[0].path.join("a.dat");
    fs::write(&game_file, b"original").unwrap();

    let archive = ctx.spec.mod_root.join("skin.zip");
    write_zip(&archive, &[("a.dat", b"modded".as_slice())]);

    let flag = new_cancel_flag();
    let units = match ctx
        .identifier
        .identify_source(&archive, &ctx.spec, &Reporter::disabled(), &flag)
    {
        BatchOutcome::Completed(units) => units,
        other => panic!("identify failed: {other:?}"),
    };

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let outcome = modkeeper::services::activation::enable_async(
        ctx.activation.clone(),
        units[0].clone(),
        tx,
        flag,
    )
    .await;

    let hashes = match outcome {
        BatchOutcome::Completed(hashes) => hashes,
        other => panic!("enable failed: {other:?}"),
    };
    assert_eq!(hashes.len(), 1);

    let mut saw_progress = false;
    while let Ok(event) = rx.try_recv() {
        if let ProgressEvent::Progress { step, total, .. } = event {
            assert_eq!(step, "enable");
            assert_eq!(total, 1);
            saw_progress = true;
        }
    }
    assert!(saw_progress, "enable must report per-file progress");
}
