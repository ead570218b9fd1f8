use modkeeper::services::archive::ArchiveGateway;
use modkeeper::services::identify::ModIdentificationEngine;
use modkeeper::types::game_spec::{GameDirectory, GameDirectorySpec};
use modkeeper::{
    ActivationEngine, BackupEngine, FileGateway, SourceTransferService, StorageLayout,
};
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::{Arc, Once};
use tempfile::TempDir;

static INIT: Once = Once::new();

pub struct TestContext {
    pub tmp: TempDir,
    pub spec: GameDirectorySpec,
    pub layout: StorageLayout,
    pub gateway: Arc<FileGateway>,
    pub archives: Arc<ArchiveGateway>,
    pub identifier: Arc<ModIdentificationEngine>,
    pub activation: Arc<ActivationEngine>,
    pub backup: Arc<BackupEngine>,
    pub transfer: Arc<SourceTransferService>,
}

pub fn init_context() -> TestContext {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });

    let tmp = TempDir::new().expect("temp dir");
    let game_dir = tmp.path().join("game/data");
    fs::create_dir_all(&game_dir).expect("game dir");

    let layout = StorageLayout {
        staging_root: tmp.path().join("staging"),
        icon_cache_root: tmp.path().join("icons"),
        image_cache_root: tmp.path().join("images"),
        backup_root: tmp.path().join("backup"),
    };
    let spec = GameDirectorySpec {
        package_name: "com.example.game".to_string(),
        game_directories: vec![GameDirectory {
            path: game_dir,
            mod_type: "data".to_string(),
        }],
        repeated_file_names: false,
        mod_root: tmp.path().join("mods"),
    };

    let gateway = Arc::new(FileGateway::direct_only());
    let archives = Arc::new(ArchiveGateway::new(
        gateway.clone(),
        layout.staging_root.clone(),
    ));
    let identifier = Arc::new(ModIdentificationEngine::new(
        gateway.clone(),
        archives.clone(),
        layout.clone(),
    ));
    let activation = Arc::new(ActivationEngine::new(gateway.clone(), archives.clone()));
    let backup = Arc::new(BackupEngine::new(gateway.clone(), layout.clone()));
    let transfer = Arc::new(SourceTransferService::new(
        gateway.clone(),
        identifier.clone(),
    ));

    TestContext {
        tmp,
        spec,
        layout,
        gateway,
        archives,
        identifier,
        activation,
        backup,
        transfer,
    }
}

pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("archive parent");
    }
    let file = fs::File::create(path).expect("archive file");
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        writer.start_file(*name, options).expect("zip entry");
        writer.write_all(data).expect("zip data");
    }
    writer.finish().expect("zip finish");
}

pub fn md5_of(path: &Path) -> String {
    format!("{:x}", md5::compute(fs::read(path).expect("readable file")))
}
