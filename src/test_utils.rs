//! Shared test doubles for the tiered storage seams.

use crate::services::access::{
    PathDomains, PermissionProbe, PermissionSnapshot, PlatformGeneration, PrivilegedState,
};
use crate::services::gateway::backend::DirEntryInfo;
use crate::services::gateway::privileged::PrivilegedTransport;
use crate::services::gateway::tree::DocumentTreeProvider;
use crate::services::gateway::FileGateway;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::SystemTime;
use tempfile::TempDir;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

fn list_local(dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        out.push(DirEntryInfo {
            name: entry.file_name().to_string_lossy().to_string(),
            path: entry.path(),
            is_dir: meta.is_dir(),
            size: if meta.is_dir() { 0 } else { meta.len() },
        });
    }
    Ok(out)
}

fn delete_local(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn create_local(path: &Path) -> io::Result<Box<dyn io::Write + Send>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(Box::new(fs::File::create(path)?))
}

/// Document-tree double backed by plain local I/O.
pub struct LocalTreeProvider;

impl DocumentTreeProvider for LocalTreeProvider {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        Ok(path.exists())
    }
    fn is_file(&self, path: &Path) -> io::Result<bool> {
        Ok(path.is_file())
    }
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        list_local(dir)
    }
    fn delete(&self, path: &Path) -> io::Result<()> {
        delete_local(path)
    }
    fn mkdir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
    fn last_modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }
    fn size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn io::Read + Send>> {
        Ok(Box::new(fs::File::open(path)?))
    }
    fn create_write(&self, path: &Path) -> io::Result<Box<dyn io::Write + Send>> {
        create_local(path)
    }
}

/// Privileged-channel double whose liveness can be flipped mid-test.
pub struct LocalPrivilegedTransport {
    pub alive: AtomicBool,
}

impl LocalPrivilegedTransport {
    pub fn new() -> Self {
        Self {
            alive: AtomicBool::new(true),
        }
    }
}

impl Default for LocalPrivilegedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl PrivilegedTransport for LocalPrivilegedTransport {
    fn state(&self) -> PrivilegedState {
        if self.alive.load(Ordering::Relaxed) {
            PrivilegedState::Ready
        } else {
            PrivilegedState::NotRunning
        }
    }
    fn exists(&self, path: &Path) -> io::Result<bool> {
        Ok(path.exists())
    }
    fn is_file(&self, path: &Path) -> io::Result<bool> {
        Ok(path.is_file())
    }
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        list_local(dir)
    }
    fn delete(&self, path: &Path) -> io::Result<()> {
        delete_local(path)
    }
    fn mkdir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
    fn last_modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }
    fn size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn io::Read + Send>> {
        Ok(Box::new(fs::File::open(path)?))
    }
    fn create_write(&self, path: &Path) -> io::Result<Box<dyn io::Write + Send>> {
        create_local(path)
    }
}

/// Probe whose snapshot can be swapped between calls.
pub struct MutableProbe {
    pub snapshot: Mutex<PermissionSnapshot>,
}

impl MutableProbe {
    pub fn new(snapshot: PermissionSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }
}

impl PermissionProbe for MutableProbe {
    fn snapshot(&self) -> PermissionSnapshot {
        self.snapshot.lock().unwrap().clone()
    }
}

/// Tiered-device fixture: sandbox, shared folder, and a foreign app-data
/// root, all under one temp directory.
pub struct TieredFixture {
    pub tmp: TempDir,
    pub domains: PathDomains,
}

impl TieredFixture {
    pub fn new() -> Self {
        init_test_logging();
        let tmp = TempDir::new().unwrap();
        let domains = PathDomains {
            sandbox_roots: vec![tmp.path().join("app")],
            shared_writable_roots: vec![tmp.path().join("shared")],
            foreign_data_root: Some(tmp.path().join("appdata")),
        };
        fs::create_dir_all(tmp.path().join("app")).unwrap();
        fs::create_dir_all(tmp.path().join("shared")).unwrap();
        fs::create_dir_all(tmp.path().join("appdata/com.game/files")).unwrap();
        Self { tmp, domains }
    }

    pub fn scoped_snapshot(&self, privileged: PrivilegedState) -> PermissionSnapshot {
        PermissionSnapshot {
            generation: PlatformGeneration::Scoped,
            broad_storage_granted: true,
            granted_tree_roots: vec![self.tmp.path().join("appdata/com.game")],
            privileged,
        }
    }

    pub fn gateway_with(&self, snapshot: PermissionSnapshot) -> FileGateway {
        FileGateway::new(
            self.domains.clone(),
            Arc::new(crate::services::access::FixedProbe::new(snapshot)),
            Arc::new(LocalPrivilegedTransport::new()),
            Arc::new(LocalTreeProvider),
        )
    }
}

impl Default for TieredFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a zip archive with the given `(entry name, bytes)` pairs. Names
/// ending in `/` become directory entries.
pub fn build_zip(path: &Path, entries: &[(&str, &[u8])]) {
    build_zip_with_options(path, entries, zip::write::SimpleFileOptions::default());
}

/// Same, but every entry is protected with legacy zip encryption.
pub fn build_zip_encrypted(path: &Path, entries: &[(&str, &[u8])], password: &str) {
    use zip::unstable::write::FileOptionsExt;
    let options =
        zip::write::SimpleFileOptions::default().with_deprecated_encryption(password.as_bytes());
    build_zip_with_options(path, entries, options);
}

fn build_zip_with_options(
    path: &Path,
    entries: &[(&str, &[u8])],
    options: zip::write::SimpleFileOptions,
) {
    use io::Write as _;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let file = fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    for (name, data) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(name.trim_end_matches('/'), options)
                .unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap();
}

/// Tiny valid PNG for cosmetic-entry fixtures.
pub fn png_bytes() -> Vec<u8> {
    let image = image::DynamicImage::new_rgba8(8, 8);
    let mut bytes = Vec::new();
    image
        .write_to(&mut io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}
