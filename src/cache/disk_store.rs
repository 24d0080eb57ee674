use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::{
    fs::{self, File, FileTimes},
    io::ErrorKind,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::{debug, info, warn};

use crate::error::StoreError;

/// Límites del directorio de descargas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLimits {
    pub max_files: usize,
    pub max_total_bytes: u64,
    /// Lower-case extensions without the leading dot.
    pub allowed_extensions: Vec<String>,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_files: 10,
            max_total_bytes: 500 * 1024 * 1024,
            allowed_extensions: vec!["mp3".into(), "webm".into(), "m4a".into()],
        }
    }
}

impl StoreLimits {
    pub fn allows_extension(&self, ext: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}

/// Metadata of one qualifying file, read straight from the filesystem.
#[derive(Debug, Clone)]
pub struct ArtifactRecord {
    pub path: PathBuf,
    pub size: u64,
    pub accessed: SystemTime,
    pub modified: SystemTime,
}

/// Resultado de un barrido de desalojo
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub evicted: Vec<PathBuf>,
    pub failed: usize,
    pub remaining_files: usize,
    pub remaining_bytes: u64,
}

/// Disk-backed cache of extracted audio files.
///
/// The directory is the only state: nothing is remembered between calls, so
/// files added or removed behind the store's back are picked up on the next
/// scan. Sweeps and lookups are serialized by a process-wide lock.
#[derive(Debug)]
pub struct DiskArtifactStore {
    dir: PathBuf,
    limits: StoreLimits,
    lock: Mutex<()>,
}

impl DiskArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, limits: StoreLimits) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create artifact dir {}", dir.display()))?;

        info!("📁 Caché de audio en: {}", dir.display());

        Ok(Self {
            dir,
            limits,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn limits(&self) -> &StoreLimits {
        &self.limits
    }

    /// Returns the path of `{identifier}.{format}` if it is present, and
    /// refreshes its access time so recently requested files survive sweeps.
    pub fn exists(&self, identifier: &str, format: &str) -> Option<PathBuf> {
        let filename = format!("{identifier}.{format}");
        if !is_plain_file_name(&filename) {
            return None;
        }
        let path = self.dir.join(filename);

        let _guard = self.lock.lock();
        if !path.is_file() {
            return None;
        }

        if let Err(e) = touch(&path) {
            warn!("⚠️ No se pudo actualizar acceso de {}: {}", path.display(), e);
        }
        debug!("💾 Hit en caché de disco: {}", path.display());

        Some(path)
    }

    /// Maps a requested file name to a managed file, if there is one.
    ///
    /// Only bare names with an allowed extension resolve, so nothing outside
    /// the store (or ignored by it) can be served.
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        if !is_plain_file_name(filename) {
            return None;
        }
        let path = self.dir.join(filename);
        if !self.is_qualifying(&path) || !path.is_file() {
            return None;
        }
        Some(path)
    }

    fn is_qualifying(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.limits.allows_extension(ext))
    }

    /// Lists qualifying files. Directories and other extensions are skipped.
    pub fn scan(&self) -> Result<Vec<ArtifactRecord>, StoreError> {
        let scan_err = |source| StoreError::Scan {
            path: self.dir.clone(),
            source,
        };

        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(scan_err)? {
            let entry = entry.map_err(scan_err)?;
            let path = entry.path();
            if !self.is_qualifying(&path) {
                continue;
            }

            // Puede desaparecer entre read_dir y metadata
            let metadata = match entry.metadata() {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    debug!("Ignorando {}: {}", path.display(), e);
                    continue;
                }
            };

            let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
            records.push(ArtifactRecord {
                path,
                size: metadata.len(),
                accessed: metadata.accessed().unwrap_or(modified),
                modified,
            });
        }

        // read_dir order is arbitrary; sort by name so ties are stable.
        records.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(records)
    }

    /// Rescans the directory and evicts least recently accessed files until
    /// both the file count and the byte total are within limits.
    ///
    /// Must run after every write into the directory. Never fails: scan and
    /// delete errors are logged and the sweep carries on.
    pub fn after_write(&self) -> SweepReport {
        let _guard = self.lock.lock();

        let records = match self.scan() {
            Ok(records) => records,
            Err(e) => {
                warn!("⚠️ {}", e);
                return SweepReport::default();
            }
        };

        let report = evict(records, &self.limits, delete_artifact);

        if !report.evicted.is_empty() || report.failed > 0 {
            info!(
                "🧹 Barrido: {} archivos desalojados, {} fallidos, quedan {} ({} bytes)",
                report.evicted.len(),
                report.failed,
                report.remaining_files,
                report.remaining_bytes
            );
        }
        if report.remaining_files > self.limits.max_files
            || report.remaining_bytes > self.limits.max_total_bytes
        {
            warn!(
                "⚠️ Caché de disco sobre el límite tras el barrido: {} archivos, {} bytes",
                report.remaining_files, report.remaining_bytes
            );
        }

        report
    }
}

/// Oldest access time first. The sort is stable, so ties keep their input
/// order.
pub fn eviction_order(mut records: Vec<ArtifactRecord>) -> Vec<ArtifactRecord> {
    records.sort_by_key(|r| r.accessed);
    records
}

/// Deletes candidates in eviction order while either limit is exceeded.
///
/// Totals only shrink for files that are actually gone; a failed delete is
/// logged and the next-oldest candidate is tried instead.
fn evict<F>(records: Vec<ArtifactRecord>, limits: &StoreLimits, mut delete: F) -> SweepReport
where
    F: FnMut(&Path) -> Result<bool, StoreError>,
{
    let mut report = SweepReport {
        scanned: records.len(),
        remaining_files: records.len(),
        remaining_bytes: records.iter().map(|r| r.size).sum(),
        ..SweepReport::default()
    };

    for record in eviction_order(records) {
        if report.remaining_files <= limits.max_files
            && report.remaining_bytes <= limits.max_total_bytes
        {
            break;
        }

        match delete(&record.path) {
            Ok(deleted) => {
                if deleted {
                    info!(
                        "🗑️ Desalojado {} ({} bytes, modificado hace {})",
                        record.path.display(),
                        record.size,
                        age(record.modified)
                    );
                } else {
                    debug!("Ya no existía: {}", record.path.display());
                }
                report.remaining_files -= 1;
                report.remaining_bytes = report.remaining_bytes.saturating_sub(record.size);
                report.evicted.push(record.path);
            }
            Err(e) => {
                warn!("⚠️ {}", e);
                report.failed += 1;
            }
        }
    }

    report
}

fn age(time: SystemTime) -> String {
    match time.elapsed() {
        Ok(elapsed) => {
            humantime::format_duration(Duration::from_secs(elapsed.as_secs())).to_string()
        }
        Err(_) => "0s".to_string(),
    }
}

/// `Ok(false)` when the file was already gone.
fn delete_artifact(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(StoreError::EvictionDeleteFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// Owning the file is enough to set its times; no write access needed.
fn touch(path: &Path) -> std::io::Result<()> {
    let now = SystemTime::now();
    File::open(path)?.set_times(FileTimes::new().set_accessed(now).set_modified(now))
}

/// A single path component that is not `.` or `..`.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
